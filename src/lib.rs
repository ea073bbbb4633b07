//! Batched live-status lookups for Twitch.tv channels
//!
//! Register any number of channels with a [`StreamRegistry`]; the first
//! `is_live()` on any of them fetches the status of all of them in one call.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use twitch_live::provider::{JsonStatusProvider, ProviderError, Transport};
//! use twitch_live::StreamRegistry;
//!
//! struct MyHttp;
//!
//! impl Transport for MyHttp {
//!     async fn get(&self, url: &str) -> Result<Bytes, ProviderError> {
//!         // Plug in an HTTP client here
//!         Err(ProviderError::Transport(format!("not wired: {}", url)))
//!     }
//! }
//!
//! # async fn run() -> Result<(), twitch_live::RegistryError> {
//! let registry = Arc::new(StreamRegistry::new(JsonStatusProvider::new(MyHttp)));
//!
//! let day9 = registry.track_url("http://www.twitch.tv/Day9tv/en").await?;
//! let other = registry.track_channel("someone").await;
//!
//! // One request covers both channels
//! if day9.is_live().await? {
//!     println!("{:?}", day9.get("stream_title").await);
//! }
//!
//! // Answered from the same snapshot, no second request
//! let status = if other.is_live().await? { "live" } else { "offline" };
//! println!("someone is {}", status);
//! # Ok(())
//! # }
//! ```

pub mod provider;
pub mod registry;

pub use provider::{ProviderError, StatusProvider, StatusRecord};
pub use registry::{
    ChannelId, LiveState, LoginMatch, Metadata, RegistryConfig, RegistryError, Stream,
    StreamHandle, StreamIdentity, StreamRegistry,
};
