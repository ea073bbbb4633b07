//! Registry error types
//!
//! Error types for stream identity and reconciliation.

use super::identity::ChannelId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// URL does not point at the streaming platform
    InvalidIdentifier(String),
    /// Status record applied to a stream with a different channel
    ChannelMismatch {
        /// Channel of the stream being reconciled
        expected: ChannelId,
        /// Login carried by the status record
        actual: String,
    },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::InvalidIdentifier(url) => {
                write!(f, "Only twitch.tv URLs are permitted: {}", url)
            }
            RegistryError::ChannelMismatch { expected, actual } => {
                write!(f, "Channel mismatch: expected {}, got {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
