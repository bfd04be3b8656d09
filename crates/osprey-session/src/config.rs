//! Session-level configuration.

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Request timeout in whole seconds. One second equals one sweep
    /// tick under the default sweep interval.
    ///
    /// Zero disables sweep-based expiry: calls then wait indefinitely,
    /// subject only to waiter-supplied deadlines.
    pub request_timeout_secs: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

impl SessionConfig {
    /// Configuration with the given request timeout in seconds.
    pub fn with_request_timeout(secs: u32) -> Self {
        Self {
            request_timeout_secs: secs,
        }
    }
}
