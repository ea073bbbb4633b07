//! JSON stream list adapter
//!
//! Builds the batched stream list query, hands it to a [`Transport`] and
//! decodes the JSON array it returns.

use std::future::Future;

use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::registry::ChannelId;

use super::error::ProviderError;
use super::record::StatusRecord;
use super::StatusProvider;

/// Default stream list endpoint
pub const DEFAULT_API_URL: &str = "http://api.justin.tv/api/stream/list.json";

/// Characters escaped inside a channel name; `,` separates channels
const CHANNEL_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'-').remove(b'.');

/// Byte-level GET used by [`JsonStatusProvider`]
pub trait Transport: Send + Sync + 'static {
    /// Fetch the body at `url`
    fn get(&self, url: &str) -> impl Future<Output = Result<Bytes, ProviderError>> + Send;
}

/// Provider configuration options
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Stream list endpoint, without query string
    pub api_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl ProviderConfig {
    /// Set the stream list endpoint
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

/// Status provider backed by the JSON stream list API
pub struct JsonStatusProvider<T> {
    transport: T,
    config: ProviderConfig,
}

impl<T: Transport> JsonStatusProvider<T> {
    /// Create a provider with the default endpoint
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ProviderConfig::default())
    }

    /// Create a provider with custom configuration
    pub fn with_config(transport: T, config: ProviderConfig) -> Self {
        Self { transport, config }
    }

    /// Get the provider configuration
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Build the batched query URL, channels comma-joined in order
    ///
    /// Each channel name is percent-encoded, so a name containing `,` or `&`
    /// stays a single channel.
    pub fn query_url(&self, channels: &[ChannelId]) -> String {
        let list = channels
            .iter()
            .map(|c| utf8_percent_encode(c.as_str(), CHANNEL_ESCAPE).to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!("{}?channel={}", self.config.api_url, list)
    }
}

impl<T: Transport> StatusProvider for JsonStatusProvider<T> {
    async fn fetch_statuses(
        &self,
        channels: &[ChannelId],
    ) -> Result<Vec<StatusRecord>, ProviderError> {
        let url = self.query_url(channels);
        tracing::debug!(url = %url, channels = channels.len(), "Fetching stream list");

        let body = self.transport.get(&url).await?;
        decode_status_list(&body)
    }
}

/// Decode a stream list response body
///
/// An empty (or whitespace-only) body is reported as
/// [`ProviderError::EmptyResponse`] rather than as zero live channels.
pub fn decode_status_list(body: &[u8]) -> Result<Vec<StatusRecord>, ProviderError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ProviderError::EmptyResponse);
    }

    Ok(serde_json::from_slice(body)?)
}
