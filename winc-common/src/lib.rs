//! Shared primitives for the winc credit accounting service: money newtypes,
//! address and identifier types, timestamps, backoff, shutdown signalling, and
//! named task spawning.

/// Address and token types for the supported chains.
pub mod address;
/// Exponential backoff iterators.
pub mod backoff;
/// Byte counts and chunk rounding.
pub mod bytes;
/// Service-wide constants.
pub mod constants;
/// Identifier newtypes for ledger entities.
pub mod ids;
/// Multi-producer multi-consumer shutdown signal.
pub mod shutdown;
/// Named task spawning with panic propagation.
pub mod task;
/// Millisecond unix timestamps.
pub mod time;
/// The winston credit money types.
pub mod winc;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
