//! Middleware
//!
//! Tower middleware for request processing.

pub mod auth;
pub mod cors;
pub mod logging;
pub mod rate_limit;

pub use auth::{auth_middleware, device_auth_middleware, AuthUser};
pub use logging::{create_trace_layer, http_metrics_middleware};
pub use rate_limit::{rate_limit_auth, rate_limit_device, RateLimitInfo, RateLimitScope, RateLimiter};
