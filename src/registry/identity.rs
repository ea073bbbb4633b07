//! Channel identity types
//!
//! This module defines the canonical channel identifier and the identity
//! (channel + URL) of a tracked stream.

use super::error::RegistryError;

/// Base URL every canonical stream URL is built from
pub const BASE_URL: &str = "http://www.twitch.tv";

/// Substring a stream URL must contain to be accepted
pub const HOST_MARKER: &str = "twitch.tv";

/// Canonical channel identifier (e.g., "somechannel")
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    /// Create a channel identifier, stored exactly as given
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is empty (URL had no channel segment)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChannelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Channel identifier plus the canonical URL derived from it
///
/// The URL is always `BASE_URL/<channel>`; the two fields cannot be set
/// independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamIdentity {
    channel: ChannelId,
    url: String,
}

impl StreamIdentity {
    /// Build an identity from a raw channel name, without case folding
    pub fn from_channel(name: impl Into<String>) -> Self {
        let channel = ChannelId::new(name);
        let url = canonical_url(&channel);
        Self { channel, url }
    }

    /// Parse an identity from a stream URL
    ///
    /// The segment following the first segment that contains the host marker
    /// is lowercased and used as the channel. Anything after it (language
    /// codes, trailing paths) is dropped from the canonical URL. When the
    /// marker segment is the last one, the channel is left empty.
    pub fn from_url(url: &str) -> Result<Self, RegistryError> {
        if !url.contains(HOST_MARKER) {
            return Err(RegistryError::InvalidIdentifier(url.to_string()));
        }

        let channel = url
            .split('/')
            .skip_while(|segment| !segment.contains(HOST_MARKER))
            .nth(1)
            .map(str::to_lowercase)
            .unwrap_or_default();

        Ok(Self::from_channel(channel))
    }

    /// Get the channel identifier
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Get the canonical URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Display for StreamIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

fn canonical_url(channel: &ChannelId) -> String {
    format!("{}/{}", BASE_URL, channel)
}
