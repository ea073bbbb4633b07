//! Live status providers
//!
//! A [`StatusProvider`] answers one batched question: which of these channels
//! are live right now? The registry calls it at most once per staleness
//! window, with every registered channel in the request.
//!
//! [`JsonStatusProvider`] adapts any byte-level [`Transport`] to the stream
//! list JSON API; plugging in an HTTP client is left to the caller.

pub mod error;
pub mod json;
pub mod record;

#[cfg(test)]
pub(crate) mod mock;

use std::future::Future;

use crate::registry::ChannelId;

pub use error::ProviderError;
pub use json::{decode_status_list, JsonStatusProvider, ProviderConfig, Transport};
pub use record::{ChannelInfo, StatusRecord};

/// Batched live-status lookup
///
/// Implementations must accept an empty channel list. `Ok(vec![])` means no
/// requested channel is live and is distinct from a failed lookup.
pub trait StatusProvider: Send + Sync + 'static {
    /// Fetch status records for the live subset of `channels`
    fn fetch_statuses(
        &self,
        channels: &[ChannelId],
    ) -> impl Future<Output = Result<Vec<StatusRecord>, ProviderError>> + Send;
}
