//! Stream entity and live state types
//!
//! This module defines the per-stream state tracked by the registry and the
//! reconciliation of a stream against a status snapshot.

use std::collections::HashMap;

use serde_json::Value;

use crate::provider::StatusRecord;

use super::config::LoginMatch;
use super::error::RegistryError;
use super::identity::{ChannelId, StreamIdentity};

/// Arbitrary key/value data attached to a stream
pub type Metadata = HashMap<String, Value>;

const CHANNEL_KEY: &str = "channel";
const URL_KEY: &str = "url";

/// Resolved live state of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiveState {
    /// Not yet checked against a snapshot
    #[default]
    Unknown,
    /// Present in the snapshot
    Live,
    /// Absent from the snapshot
    NotLive,
}

impl LiveState {
    /// Cached answer, if the state has been resolved
    pub fn resolved(self) -> Option<bool> {
        match self {
            LiveState::Unknown => None,
            LiveState::Live => Some(true),
            LiveState::NotLive => Some(false),
        }
    }
}

/// A single tracked channel
#[derive(Debug, Clone, Default)]
pub struct Stream {
    identity: Option<StreamIdentity>,
    metadata: Metadata,
    live: LiveState,
}

impl Stream {
    /// Create a stream from optional seed data
    ///
    /// A `channel` field sets the identity directly; otherwise a `url` field
    /// is parsed. Every other field is kept as metadata.
    pub fn new(seed: Option<Metadata>) -> Result<Self, RegistryError> {
        let mut stream = Stream::default();
        let Some(mut seed) = seed else {
            return Ok(stream);
        };

        let channel = seed.remove(CHANNEL_KEY).filter(|v| !v.is_null());
        let url = seed.remove(URL_KEY).filter(|v| !v.is_null());
        stream.metadata = seed;

        if let Some(channel) = channel {
            stream.set_channel(value_to_string(&channel));
        } else if let Some(url) = url {
            stream.set_url(&value_to_string(&url))?;
        }

        Ok(stream)
    }

    /// Create a stream for a channel name
    pub fn from_channel(name: impl Into<String>) -> Self {
        Self {
            identity: Some(StreamIdentity::from_channel(name)),
            ..Default::default()
        }
    }

    /// Create a stream from a URL
    pub fn from_url(url: &str) -> Result<Self, RegistryError> {
        Ok(Self {
            identity: Some(StreamIdentity::from_url(url)?),
            ..Default::default()
        })
    }

    /// Get the identity, if one has been assigned
    pub fn identity(&self) -> Option<&StreamIdentity> {
        self.identity.as_ref()
    }

    /// Get the channel identifier
    pub fn channel(&self) -> Option<&ChannelId> {
        self.identity.as_ref().map(StreamIdentity::channel)
    }

    /// Get the canonical URL
    pub fn url(&self) -> Option<&str> {
        self.identity.as_ref().map(StreamIdentity::url)
    }

    /// Set the channel, regenerating the URL
    ///
    /// Any resolved live state belonged to the previous channel and is reset.
    pub fn set_channel(&mut self, name: impl Into<String>) {
        self.identity = Some(StreamIdentity::from_channel(name));
        self.live = LiveState::Unknown;
    }

    /// Set the URL, parsing the channel out of it
    ///
    /// The current identity and live state are left untouched when the URL
    /// is rejected; otherwise the live state is reset.
    pub fn set_url(&mut self, url: &str) -> Result<(), RegistryError> {
        self.identity = Some(StreamIdentity::from_url(url)?);
        self.live = LiveState::Unknown;
        Ok(())
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn live_state(&self) -> LiveState {
        self.live
    }

    /// Read a field
    ///
    /// `channel` and `url` come from the identity; everything else from the
    /// metadata bag. Unknown keys read as `None`.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            CHANNEL_KEY => self.channel().map(|c| Value::String(c.to_string())),
            URL_KEY => self.url().map(|u| Value::String(u.to_string())),
            _ => self.metadata.get(key).cloned(),
        }
    }

    /// Write a field
    ///
    /// `channel` and `url` update the identity (a URL is parsed and may be
    /// rejected) and reset the live state; everything else goes into the
    /// metadata bag.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), RegistryError> {
        let value = value.into();
        match key {
            CHANNEL_KEY => self.set_channel(value_to_string(&value)),
            URL_KEY => self.set_url(&value_to_string(&value))?,
            _ => {
                self.metadata.insert(key.to_string(), value);
            }
        }
        Ok(())
    }

    /// Resolve the live state against a snapshot
    ///
    /// The first record whose login matches this stream's channel marks it
    /// live and has its presentation fields merged into the metadata. If no
    /// record matches, the stream is marked not live and its metadata is left
    /// alone.
    pub fn reconcile(
        &mut self,
        snapshot: &[StatusRecord],
        login_match: LoginMatch,
    ) -> Result<bool, RegistryError> {
        let found = self.channel().filter(|c| !c.is_empty()).and_then(|channel| {
            snapshot
                .iter()
                .find(|record| login_match.matches(record.login(), channel.as_str()))
        });

        match found {
            Some(record) => {
                self.add_stream_data(record, login_match)?;
                Ok(true)
            }
            None => {
                self.live = LiveState::NotLive;
                Ok(false)
            }
        }
    }

    /// Apply a live status record to this stream
    ///
    /// Fails with [`RegistryError::ChannelMismatch`] if the record belongs to
    /// another channel.
    pub fn add_stream_data(
        &mut self,
        record: &StatusRecord,
        login_match: LoginMatch,
    ) -> Result<(), RegistryError> {
        let channel = self.channel().cloned().unwrap_or_default();
        if channel.is_empty() || !login_match.matches(record.login(), channel.as_str()) {
            return Err(RegistryError::ChannelMismatch {
                expected: channel,
                actual: record.login().to_string(),
            });
        }

        self.live = LiveState::Live;
        for (key, value) in record.presentation_fields() {
            self.metadata.insert(key.to_string(), value);
        }

        Ok(())
    }
}

/// String rendering used when a non-string value is assigned to an identity
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
