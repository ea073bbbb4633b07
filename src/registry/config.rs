//! Registry configuration

use std::time::Duration;

/// How a status record's login is compared with a stream's channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginMatch {
    /// Byte-for-byte comparison
    #[default]
    Exact,
    /// ASCII case-insensitive comparison
    IgnoreAsciiCase,
}

impl LoginMatch {
    /// Compare a record login with a channel identifier
    pub fn matches(self, login: &str, channel: &str) -> bool {
        match self {
            LoginMatch::Exact => login == channel,
            LoginMatch::IgnoreAsciiCase => login.eq_ignore_ascii_case(channel),
        }
    }
}

/// Registry configuration options
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Upper bound for a single batched status fetch
    pub fetch_timeout: Duration,

    /// Login comparison used during reconciliation
    pub login_match: LoginMatch,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            login_match: LoginMatch::Exact,
        }
    }
}

impl RegistryConfig {
    /// Set the fetch timeout
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the login comparison mode
    pub fn login_match(mut self, mode: LoginMatch) -> Self {
        self.login_match = mode;
        self
    }
}
