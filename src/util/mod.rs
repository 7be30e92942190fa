//! Utility modules: reconnect backoff, timeout.

pub mod backoff;
pub mod timeout;
