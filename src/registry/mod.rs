//! Stream registry with a batched live status cache
//!
//! The registry tracks every registered stream and keeps one shared snapshot
//! of live status records. The snapshot is refetched, in a single batched
//! provider call, only when a stream has been registered since the last
//! successful fetch.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<StreamRegistry<P>>
//!                   ┌───────────────────────────┐
//!                   │ streams: Vec<Stream>      │
//!                   │ snapshot: [StatusRecord]  │
//!                   │ stale: bool               │
//!                   └─────────────┬─────────────┘
//!                                 │
//!        register() ──► stale = true
//!                                 │
//!        handle.is_live() ──► stale? ──► provider.fetch_statuses(all channels)
//!                                 │
//!                                 ▼
//!                     stream.reconcile(snapshot)
//!                     ├─ match:    Live + stream_* metadata
//!                     └─ no match: NotLive
//! ```
//!
//! # Staleness
//!
//! Staleness is driven purely by registrations, never by time. A stream that
//! has resolved its state answers from that state until it next observes a
//! stale registry.

pub mod config;
pub mod entry;
pub mod error;
pub mod identity;
pub mod store;

pub use config::{LoginMatch, RegistryConfig};
pub use entry::{LiveState, Metadata, Stream};
pub use error::RegistryError;
pub use identity::{ChannelId, StreamIdentity, BASE_URL, HOST_MARKER};
pub use store::{StreamHandle, StreamRegistry};
