//! Named task spawning with panic propagation.

use std::{
    borrow::Cow,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::task::{JoinError, JoinHandle};
use tracing::{error, Instrument};

/// A thin wrapper around [`tokio::task::JoinHandle`] that:
///
/// 1. propagates panics instead of swallowing them, and
/// 2. carries a task name for debuggability, and
/// 3. adds `#[must_use]` so spawned tasks are joined or explicitly
///    [`detach`](NamedTask::detach)ed.
///
/// Background workers (the credit pipeline, the expiry sweeper) are spawned
/// as [`NamedTask`]s and joined on shutdown so a panicking worker takes the
/// process down loudly rather than dying silently.
#[must_use]
pub struct NamedTask<T> {
    handle: JoinHandle<T>,
    name: Cow<'static, str>,
}

impl<T> NamedTask<T> {
    /// Spawns a named task which inherits the current tracing span.
    pub fn spawn<F>(
        name: impl Into<Cow<'static, str>>,
        future: F,
    ) -> NamedTask<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let span = tracing::Span::current();
        Self {
            handle: tokio::spawn(future.instrument(span)),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Drop the handle, letting the task run unsupervised. Use sparingly;
    /// detached tasks lose panic propagation.
    pub fn detach(self) {
        drop(self);
    }
}

impl<T> Future for NamedTask<T> {
    type Output = Result<T, JoinError>;

    fn poll(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Self::Output> {
        let result = match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(result) => result,
            Poll::Pending => return Poll::Pending,
        };

        let result = match result {
            Ok(value) => Ok(value),
            Err(join_err) => match join_err.try_into_panic() {
                Ok(panic_reason) => {
                    error!("task '{name}' panicked", name = self.name());
                    std::panic::resume_unwind(panic_reason)
                }
                Err(join_err) => Err(join_err),
            },
        };

        Poll::Ready(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn join_returns_value() {
        let task = NamedTask::spawn("forty-two", async { 42 });
        assert_eq!(task.name(), "forty-two");
        assert_eq!(task.await.unwrap(), 42);
    }

    #[tokio::test]
    #[should_panic(expected = "boom")]
    async fn panic_propagates_to_joiner() {
        let task = NamedTask::spawn("bomb", async { panic!("boom") });
        let _ = task.await;
    }
}
