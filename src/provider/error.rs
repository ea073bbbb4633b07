//! Provider error types

use std::time::Duration;

/// Error type for status lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transport failed (connection refused, DNS, non-success status)
    Transport(String),
    /// Remote source returned no data
    EmptyResponse,
    /// Response body could not be decoded
    Decode(String),
    /// Lookup did not finish in time
    Timeout(Duration),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ProviderError::EmptyResponse => write!(f, "Empty response from status API"),
            ProviderError::Decode(msg) => write!(f, "Failed to decode status list: {}", msg),
            ProviderError::Timeout(after) => {
                write!(f, "Status lookup timed out after {}ms", after.as_millis())
            }
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Decode(err.to_string())
    }
}
