//! Stream registry implementation
//!
//! The central registry that tracks every registered stream and owns the
//! shared live status snapshot.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use crate::provider::{ProviderError, StatusProvider, StatusRecord};

use super::config::RegistryConfig;
use super::entry::{LiveState, Metadata, Stream};
use super::error::RegistryError;
use super::identity::ChannelId;

/// Mutable registry state, guarded as one unit
#[derive(Default)]
struct RegistryState {
    /// All registered streams, in registration order
    streams: Vec<Arc<RwLock<Stream>>>,

    /// Last successfully fetched status records
    snapshot: Option<Arc<Vec<StatusRecord>>>,

    /// Snapshot does not cover every registered stream
    stale: bool,

    /// Bumped on every registration and identity change
    generation: u64,
}

impl RegistryState {
    fn needs_refresh(&self) -> bool {
        self.stale || self.snapshot.is_none()
    }
}

/// Central registry for all tracked streams
///
/// Thread-safe via `RwLock`. Refreshes are serialized: a caller that finds a
/// refresh in flight waits for it and then reuses its result instead of
/// issuing another provider call.
pub struct StreamRegistry<P> {
    /// Batched status lookup
    provider: P,

    /// Streams, snapshot and staleness
    state: RwLock<RegistryState>,

    /// Held for the duration of a refresh
    refresh_gate: Mutex<()>,

    /// Configuration
    config: RegistryConfig,
}

impl<P: StatusProvider> StreamRegistry<P> {
    /// Create a new stream registry with default configuration
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, RegistryConfig::default())
    }

    /// Create a new stream registry with custom configuration
    pub fn with_config(provider: P, config: RegistryConfig) -> Self {
        Self {
            provider,
            state: RwLock::new(RegistryState::default()),
            refresh_gate: Mutex::new(()),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Get the status provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Register a stream
    ///
    /// The snapshot is marked stale so that the next lookup includes the new
    /// channel.
    pub async fn register(self: &Arc<Self>, stream: Stream) -> StreamHandle<P> {
        let channel = stream.channel().cloned();
        let stream = Arc::new(RwLock::new(stream));

        let mut state = self.state.write().await;
        state.streams.push(Arc::clone(&stream));
        state.stale = true;
        state.generation += 1;

        tracing::info!(
            channel = ?channel.as_ref().map(ChannelId::as_str),
            streams = state.streams.len(),
            "Stream registered"
        );

        StreamHandle {
            stream,
            registry: Arc::clone(self),
        }
    }

    /// Create a stream from seed data and register it
    ///
    /// Nothing is registered if the seed carries an invalid URL.
    pub async fn track(
        self: &Arc<Self>,
        seed: Option<Metadata>,
    ) -> Result<StreamHandle<P>, RegistryError> {
        let stream = Stream::new(seed)?;
        Ok(self.register(stream).await)
    }

    /// Register a stream for a channel name
    pub async fn track_channel(self: &Arc<Self>, name: impl Into<String>) -> StreamHandle<P> {
        self.register(Stream::from_channel(name)).await
    }

    /// Register a stream for a URL
    pub async fn track_url(self: &Arc<Self>, url: &str) -> Result<StreamHandle<P>, RegistryError> {
        let stream = Stream::from_url(url)?;
        Ok(self.register(stream).await)
    }

    /// Mark the snapshot stale after a registered stream changed channel
    async fn invalidate(&self, channel: Option<&ChannelId>) {
        let mut state = self.state.write().await;
        state.stale = true;
        state.generation += 1;

        tracing::info!(
            channel = ?channel.map(ChannelId::as_str),
            "Stream identity changed"
        );
    }

    /// Check if the snapshot must be refetched before use
    pub async fn is_stale(&self) -> bool {
        self.state.read().await.needs_refresh()
    }

    /// Check if a snapshot has ever been fetched
    pub async fn has_snapshot(&self) -> bool {
        self.state.read().await.snapshot.is_some()
    }

    /// Get the current snapshot, if any
    pub async fn snapshot(&self) -> Option<Arc<Vec<StatusRecord>>> {
        self.state.read().await.snapshot.clone()
    }

    /// Get total number of registered streams
    pub async fn stream_count(&self) -> usize {
        self.state.read().await.streams.len()
    }

    /// Get handles to every registered stream, in registration order
    pub async fn streams(self: &Arc<Self>) -> Vec<StreamHandle<P>> {
        let state = self.state.read().await;
        state
            .streams
            .iter()
            .map(|stream| StreamHandle {
                stream: Arc::clone(stream),
                registry: Arc::clone(self),
            })
            .collect()
    }

    /// Refetch the snapshot if it is stale
    ///
    /// Issues one provider call covering every registered channel. On
    /// failure or timeout the previous snapshot is kept and the registry
    /// stays stale, so the next lookup retries. If streams were registered
    /// or changed channel while the call was in flight, the new records are stored but the
    /// registry stays stale.
    ///
    /// Returns whether the snapshot is fresh afterwards.
    pub async fn refresh(&self) -> bool {
        let _gate = self.refresh_gate.lock().await;

        let (streams, generation) = {
            let state = self.state.read().await;
            if !state.needs_refresh() {
                return true;
            }
            (state.streams.clone(), state.generation)
        };

        let mut channels = Vec::with_capacity(streams.len());
        for stream in &streams {
            if let Some(channel) = stream.read().await.channel() {
                if !channel.is_empty() {
                    channels.push(channel.clone());
                }
            }
        }

        let timeout = self.config.fetch_timeout;
        let result = tokio::time::timeout(timeout, self.provider.fetch_statuses(&channels))
            .await
            .unwrap_or(Err(ProviderError::Timeout(timeout)));

        let records = match result {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    channels = channels.len(),
                    "Status refresh failed, snapshot stays stale"
                );
                return false;
            }
        };

        let live = records.len();
        let mut state = self.state.write().await;
        state.snapshot = Some(Arc::new(records));

        if state.generation != generation {
            tracing::warn!(
                registered = state.generation - generation,
                "Streams changed during refresh, snapshot stays stale"
            );
            return false;
        }

        state.stale = false;
        tracing::info!(channels = channels.len(), live = live, "Status snapshot refreshed");
        true
    }

    /// Refresh if needed and return every stream found live
    ///
    /// Each stream is reconciled against the snapshot, regardless of any
    /// state it resolved earlier.
    pub async fn live_streams(self: &Arc<Self>) -> Result<Vec<StreamHandle<P>>, RegistryError> {
        self.refresh().await;
        let snapshot = self.snapshot().await.unwrap_or_default();

        let mut live = Vec::new();
        for handle in self.streams().await {
            let is_live = handle
                .stream
                .write()
                .await
                .reconcile(&snapshot, self.config.login_match)?;
            if is_live {
                live.push(handle);
            }
        }

        Ok(live)
    }
}

/// Handle to a registered stream
///
/// Cheap to clone; all clones refer to the same stream.
pub struct StreamHandle<P> {
    stream: Arc<RwLock<Stream>>,
    registry: Arc<StreamRegistry<P>>,
}

impl<P> Clone for StreamHandle<P> {
    fn clone(&self) -> Self {
        Self {
            stream: Arc::clone(&self.stream),
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<P: StatusProvider> StreamHandle<P> {
    /// Check if the stream is live
    ///
    /// Refreshes the registry snapshot first when it is stale and then
    /// reconciles this stream against it. Otherwise an already resolved
    /// state is returned without scanning the snapshot again.
    ///
    /// Provider failures are not reported here; the stream reads as not live
    /// and the next call retries the fetch.
    pub async fn is_live(&self) -> Result<bool, RegistryError> {
        if self.registry.is_stale().await {
            self.registry.refresh().await;
        } else {
            let stream = self.stream.read().await;
            if let Some(live) = stream.live_state().resolved() {
                tracing::debug!(
                    channel = ?stream.channel().map(ChannelId::as_str),
                    live = live,
                    "Live state cached"
                );
                return Ok(live);
            }
        }

        let snapshot = self.registry.snapshot().await.unwrap_or_default();
        let mut stream = self.stream.write().await;
        let live = stream.reconcile(&snapshot, self.registry.config.login_match)?;

        tracing::debug!(
            channel = ?stream.channel().map(ChannelId::as_str),
            live = live,
            snapshot = snapshot.len(),
            "Live state reconciled"
        );

        Ok(live)
    }

    /// Get the registry this stream belongs to
    pub fn registry(&self) -> &Arc<StreamRegistry<P>> {
        &self.registry
    }

    /// Get the channel identifier
    pub async fn channel(&self) -> Option<ChannelId> {
        self.stream.read().await.channel().cloned()
    }

    /// Get the canonical URL
    pub async fn url(&self) -> Option<String> {
        self.stream.read().await.url().map(str::to_string)
    }

    /// Get the resolved live state without triggering a lookup
    pub async fn live_state(&self) -> LiveState {
        self.stream.read().await.live_state()
    }

    /// Get a copy of the metadata bag
    pub async fn metadata(&self) -> Metadata {
        self.stream.read().await.metadata().clone()
    }

    /// Read a field (see [`Stream::get`])
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.stream.read().await.get(key)
    }

    /// Write a field (see [`Stream::set`])
    ///
    /// A new channel or URL also marks the registry stale, so the next
    /// lookup fetches the new channel's status.
    pub async fn set(&self, key: &str, value: impl Into<Value>) -> Result<(), RegistryError> {
        let (before, after) = {
            let mut stream = self.stream.write().await;
            let before = stream.channel().cloned();
            stream.set(key, value)?;
            (before, stream.channel().cloned())
        };

        if before != after {
            self.registry.invalidate(after.as_ref()).await;
        }
        Ok(())
    }

    /// Apply a status record to this stream (see [`Stream::add_stream_data`])
    pub async fn add_stream_data(&self, record: &StatusRecord) -> Result<(), RegistryError> {
        self.stream
            .write()
            .await
            .add_stream_data(record, self.registry.config.login_match)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::provider::mock::MockProvider;
    use crate::registry::LoginMatch;

    fn registry(provider: MockProvider) -> Arc<StreamRegistry<MockProvider>> {
        Arc::new(StreamRegistry::new(provider))
    }

    #[tokio::test]
    async fn test_register_marks_stale() {
        let registry = registry(MockProvider::live(vec![]));
        assert!(registry.is_stale().await);

        registry.track_channel("foo").await;

        assert!(registry.is_stale().await);
        assert!(!registry.has_snapshot().await);
        assert_eq!(registry.stream_count().await, 1);
    }

    #[tokio::test]
    async fn test_single_batched_call() {
        let registry = registry(MockProvider::live(vec![StatusRecord::new("bar")]));

        let foo = registry.track_channel("foo").await;
        let bar = registry.track_channel("bar").await;
        let baz = registry.track_url("http://www.twitch.tv/Baz/en").await.unwrap();

        assert!(!baz.is_live().await.unwrap());
        assert!(bar.is_live().await.unwrap());
        assert!(!foo.is_live().await.unwrap());

        assert_eq!(registry.provider().calls(), vec![vec!["foo", "bar", "baz"]]);
        assert!(!registry.is_stale().await);
    }

    #[tokio::test]
    async fn test_resolved_state_is_cached() {
        let registry = registry(MockProvider::live(vec![StatusRecord::new("foo")]));
        let foo = registry.track_channel("foo").await;

        assert!(foo.is_live().await.unwrap());
        assert!(foo.is_live().await.unwrap());

        assert_eq!(registry.provider().call_count(), 1);
        assert_eq!(foo.live_state().await, LiveState::Live);
    }

    #[tokio::test]
    async fn test_cached_state_survives_other_refreshes() {
        // Once resolved, a stream keeps its answer until it itself sees a
        // stale registry
        let provider = MockProvider::live(vec![]).then(Ok(vec![StatusRecord::new("foo")]));
        let registry = registry(provider);

        let foo = registry.track_channel("foo").await;
        assert!(foo.is_live().await.unwrap());

        registry.track_channel("bar").await;
        registry.refresh().await;

        assert!(foo.is_live().await.unwrap());
        assert_eq!(registry.provider().call_count(), 2);
    }

    #[tokio::test]
    async fn test_registration_after_refresh_restales() {
        let provider = MockProvider::live(vec![StatusRecord::new("foo"), StatusRecord::new("bar")])
            .then(Ok(vec![StatusRecord::new("foo")]));
        let registry = registry(provider);

        let foo = registry.track_channel("foo").await;
        assert!(foo.is_live().await.unwrap());

        let bar = registry.track_channel("bar").await;
        assert!(registry.is_stale().await);

        // The old stream sees the stale registry and triggers the refetch
        assert!(foo.is_live().await.unwrap());
        assert!(bar.is_live().await.unwrap());

        assert_eq!(
            registry.provider().calls(),
            vec![vec!["foo"], vec!["foo", "bar"]]
        );
    }

    #[tokio::test]
    async fn test_provider_failure_stays_stale() {
        let registry = registry(MockProvider::failing());
        let foo = registry.track_channel("foo").await;

        assert!(!foo.is_live().await.unwrap());
        assert!(registry.is_stale().await);
        assert!(!registry.has_snapshot().await);
        assert_eq!(foo.live_state().await, LiveState::NotLive);

        // Every lookup retries while stale
        assert!(!foo.is_live().await.unwrap());
        assert_eq!(registry.provider().call_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_snapshot() {
        let provider = MockProvider::failing().then(Ok(vec![StatusRecord::new("foo")]));
        let registry = registry(provider);

        let foo = registry.track_channel("foo").await;
        assert!(foo.is_live().await.unwrap());

        let bar = registry.track_channel("bar").await;
        assert!(!bar.is_live().await.unwrap());

        let snapshot = registry.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].login(), "foo");
        assert!(registry.is_stale().await);
    }

    #[tokio::test]
    async fn test_recovers_after_failure() {
        let provider = MockProvider::live(vec![StatusRecord::new("foo")])
            .then(Err(ProviderError::EmptyResponse));
        let registry = registry(provider);
        let foo = registry.track_channel("foo").await;

        assert!(!foo.is_live().await.unwrap());
        assert!(foo.is_live().await.unwrap());
        assert!(!registry.is_stale().await);
    }

    #[tokio::test]
    async fn test_empty_snapshot_is_fresh() {
        let registry = registry(MockProvider::live(vec![]));
        let foo = registry.track_channel("foo").await;

        assert!(!foo.is_live().await.unwrap());
        assert!(!registry.is_stale().await);
        assert!(registry.has_snapshot().await);

        assert!(!foo.is_live().await.unwrap());
        assert_eq!(registry.provider().call_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_with_no_streams() {
        let registry = registry(MockProvider::live(vec![]));

        assert!(registry.refresh().await);
        assert!(registry.refresh().await);

        assert_eq!(registry.provider().calls(), vec![Vec::<String>::new()]);
    }

    #[tokio::test]
    async fn test_streams_without_channel_are_skipped() {
        let registry = registry(MockProvider::live(vec![]));

        registry.track(None).await.unwrap();
        registry.track_url("http://www.twitch.tv").await.unwrap();
        registry.track_channel("foo").await;
        registry.refresh().await;

        assert_eq!(registry.provider().calls(), vec![vec!["foo"]]);
    }

    #[tokio::test]
    async fn test_track_invalid_url_not_registered() {
        let registry = registry(MockProvider::live(vec![]));

        let result = registry.track(Some(Metadata::from([(
            "url".to_string(),
            json!("http://example.com/foo"),
        )])));

        assert!(matches!(
            result.await,
            Err(RegistryError::InvalidIdentifier(_))
        ));
        assert_eq!(registry.stream_count().await, 0);
    }

    #[tokio::test]
    async fn test_null_channel_seed_uses_url() {
        let registry = registry(MockProvider::live(vec![StatusRecord::new("foo")]));

        let handle = registry
            .track(Some(Metadata::from([
                ("channel".to_string(), Value::Null),
                ("url".to_string(), json!("http://www.twitch.tv/Foo")),
            ])))
            .await
            .unwrap();

        assert_eq!(handle.channel().await, Some(ChannelId::new("foo")));
        assert!(handle.is_live().await.unwrap());
        assert_eq!(registry.provider().calls(), vec![vec!["foo"]]);
    }

    #[tokio::test]
    async fn test_live_metadata_through_handle() {
        let mut record = StatusRecord::new("foo");
        record.title = Some("Marathon".to_string());
        record.channel.meta_game = Some("Zelda".to_string());
        let registry = registry(MockProvider::live(vec![record]));

        let foo = registry
            .track(Some(Metadata::from([
                ("channel".to_string(), json!("foo")),
                ("featured".to_string(), json!(true)),
            ])))
            .await
            .unwrap();

        assert!(foo.is_live().await.unwrap());
        assert_eq!(foo.get("stream_title").await, Some(json!("Marathon")));
        assert_eq!(foo.get("stream_game").await, Some(json!("Zelda")));
        assert_eq!(foo.get("stream_viewers").await, Some(Value::Null));
        assert_eq!(foo.get("featured").await, Some(json!(true)));
        assert_eq!(foo.metadata().await.len(), 16);
    }

    #[tokio::test]
    async fn test_handle_field_access() {
        let registry = registry(MockProvider::live(vec![]));
        let handle = registry.track_channel("foo").await;

        handle.set("url", "http://www.twitch.tv/Bar").await.unwrap();
        handle.set("note", "hello").await.unwrap();

        assert_eq!(handle.channel().await, Some(ChannelId::new("bar")));
        assert_eq!(handle.url().await.as_deref(), Some("http://www.twitch.tv/bar"));
        assert_eq!(handle.get("note").await, Some(json!("hello")));
        assert_eq!(handle.get("nothing").await, None);
    }

    #[tokio::test]
    async fn test_channel_change_looks_up_new_channel() {
        let provider = MockProvider::live(vec![]).then(Ok(vec![StatusRecord::new("foo")]));
        let registry = registry(provider);
        let handle = registry.track_channel("foo").await;
        assert!(handle.is_live().await.unwrap());

        handle.set("channel", "bar").await.unwrap();

        assert!(registry.is_stale().await);
        assert_eq!(handle.live_state().await, LiveState::Unknown);
        assert!(!handle.is_live().await.unwrap());
        assert_eq!(registry.provider().calls(), vec![vec!["foo"], vec!["bar"]]);
    }

    #[tokio::test]
    async fn test_metadata_write_keeps_snapshot_fresh() {
        let registry = registry(MockProvider::live(vec![StatusRecord::new("foo")]));
        let handle = registry.track_channel("foo").await;
        assert!(handle.is_live().await.unwrap());

        handle.set("note", "hello").await.unwrap();
        handle.set("url", "http://www.twitch.tv/Foo").await.unwrap();

        assert!(!registry.is_stale().await);
        assert!(handle.is_live().await.unwrap());
        assert_eq!(registry.provider().call_count(), 1);
    }

    #[tokio::test]
    async fn test_add_stream_data_mismatch() {
        let registry = registry(MockProvider::live(vec![]));
        let handle = registry.track_channel("foo").await;

        let result = handle.add_stream_data(&StatusRecord::new("bar")).await;

        assert!(matches!(result, Err(RegistryError::ChannelMismatch { .. })));
        assert_eq!(handle.live_state().await, LiveState::Unknown);
    }

    #[tokio::test]
    async fn test_ignore_case_login_match() {
        let config = RegistryConfig::default().login_match(LoginMatch::IgnoreAsciiCase);
        let registry = Arc::new(StreamRegistry::with_config(
            MockProvider::live(vec![StatusRecord::new("Foo")]),
            config,
        ));
        let foo = registry.track_channel("foo").await;

        assert!(foo.is_live().await.unwrap());
    }

    #[tokio::test]
    async fn test_live_streams() {
        let registry = registry(MockProvider::live(vec![
            StatusRecord::new("bar"),
            StatusRecord::new("baz"),
        ]));
        for name in ["foo", "bar", "baz"] {
            registry.track_channel(name).await;
        }

        let live = registry.live_streams().await.unwrap();
        let mut names = Vec::new();
        for handle in &live {
            names.push(handle.channel().await.unwrap().to_string());
        }

        assert_eq!(names, vec!["bar", "baz"]);
        assert_eq!(registry.provider().call_count(), 1);
        assert_eq!(registry.streams().await[0].live_state().await, LiveState::NotLive);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_call() {
        let provider = MockProvider::live(vec![StatusRecord::new("s3")])
            .with_delay(Duration::from_millis(50));
        let registry = registry(provider);

        let mut handles = Vec::new();
        for i in 0..8 {
            handles.push(registry.track_channel(format!("s{}", i)).await);
        }

        let tasks: Vec<_> = handles
            .into_iter()
            .map(|handle| tokio::spawn(async move { handle.is_live().await.unwrap() }))
            .collect();

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap());
        }

        assert_eq!(results.iter().filter(|live| **live).count(), 1);
        assert!(results[3]);
        assert_eq!(registry.provider().call_count(), 1);
    }

    #[tokio::test]
    async fn test_registration_during_refresh_keeps_stale() {
        let provider = MockProvider::live(vec![StatusRecord::new("foo")])
            .with_delay(Duration::from_millis(100));
        let registry = registry(provider);
        registry.track_channel("foo").await;

        let in_flight = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.refresh().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        registry.track_channel("bar").await;

        assert!(!in_flight.await.unwrap());
        assert!(registry.is_stale().await);
        assert!(registry.has_snapshot().await);

        assert!(registry.refresh().await);
        assert_eq!(
            registry.provider().calls(),
            vec![vec!["foo"], vec!["foo", "bar"]]
        );
    }

    #[tokio::test]
    async fn test_fetch_timeout_counts_as_failure() {
        let config = RegistryConfig::default().fetch_timeout(Duration::from_millis(10));
        let provider = MockProvider::live(vec![StatusRecord::new("foo")])
            .with_delay(Duration::from_millis(200));
        let registry = Arc::new(StreamRegistry::with_config(provider, config));
        let foo = registry.track_channel("foo").await;

        assert!(!foo.is_live().await.unwrap());
        assert!(registry.is_stale().await);
        assert!(!registry.has_snapshot().await);
    }
}
