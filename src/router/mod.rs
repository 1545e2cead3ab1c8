//! Multi-backend HTTP routing
//!
//! This module contains the failover router, the backend health model and
//! the transport seam it sends requests through.

pub mod backend;
pub mod failover;
pub mod health;
pub mod transport;

pub use backend::{BackendConfig, BackendSnapshot, FailureReason};
pub use failover::{FailoverRouter, RouterConfig, RouterError, RouterEvent};
pub use health::HealthCheckConfig;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
