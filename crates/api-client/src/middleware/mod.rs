//! Middleware components for request/response processing
//!
//! This module re-exports the resilience components from `zerobyte-core`.

pub use zerobyte_core::rate_limit::{RateLimitConfig, RateLimitStatus, RateLimiter};
pub use zerobyte_core::retry::{CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryConfig};
