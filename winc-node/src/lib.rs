//! The assembled winc payment service: configuration, the public service
//! surface consumed by the HTTP layer, and the background workers (crypto
//! credit pipeline, expiry sweeper).

/// Request signature verification.
pub mod auth;
/// Process configuration from the environment.
pub mod config;
/// Gateway map construction.
pub mod gateways;
/// Global `tracing` logger setup.
pub mod logger;
/// Best-effort event sinks (Slack, email are fed from here).
pub mod notify;
/// The crypto credit pipeline worker.
pub mod pipeline;
/// The pricing oracle seam.
pub mod pricing;
/// The public payment service surface.
pub mod service;
/// The expiry sweeper worker.
pub mod sweeper;
/// Process-local TTL caches.
pub mod ttl_cache;

pub use config::Config;
pub use service::PaymentService;
