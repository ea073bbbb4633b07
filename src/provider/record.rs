//! Raw status records returned by a status provider

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One live channel as reported by the status API
///
/// Only the channel login is required; presentation fields are optional and
/// anything unrecognized is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Stream title
    #[serde(default)]
    pub title: Option<String>,

    /// Current viewer count
    #[serde(default)]
    pub channel_count: Option<u64>,

    /// Video height in pixels
    #[serde(default)]
    pub video_height: Option<u32>,

    /// Video width in pixels
    #[serde(default)]
    pub video_width: Option<u32>,

    /// Video bitrate (kbps)
    #[serde(default)]
    pub video_bitrate: Option<f64>,

    /// Channel the stream belongs to
    pub channel: ChannelInfo,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Channel section of a status record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Channel login (lowercase name)
    pub login: String,

    /// Game being played
    #[serde(default)]
    pub meta_game: Option<String>,

    #[serde(default)]
    pub screen_cap_url_huge: Option<String>,
    #[serde(default)]
    pub screen_cap_url_large: Option<String>,
    #[serde(default)]
    pub screen_cap_url_medium: Option<String>,
    #[serde(default)]
    pub screen_cap_url_small: Option<String>,

    #[serde(default)]
    pub image_url_huge: Option<String>,
    #[serde(default)]
    pub image_url_large: Option<String>,
    #[serde(default)]
    pub image_url_medium: Option<String>,
    #[serde(default)]
    pub image_url_small: Option<String>,
    #[serde(default)]
    pub image_url_tiny: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl StatusRecord {
    /// Create a record carrying only a channel login
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            channel: ChannelInfo {
                login: login.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Get the channel login
    pub fn login(&self) -> &str {
        &self.channel.login
    }

    /// Presentation fields keyed by the metadata name they are stored under
    pub fn presentation_fields(&self) -> [(&'static str, Value); 15] {
        let channel = &self.channel;
        [
            ("stream_title", to_value(&self.title)),
            ("stream_viewers", to_value(&self.channel_count)),
            ("stream_res_height", to_value(&self.video_height)),
            ("stream_res_width", to_value(&self.video_width)),
            ("stream_bitrate", to_value(&self.video_bitrate)),
            ("stream_game", to_value(&channel.meta_game)),
            ("stream_thumb_huge", to_value(&channel.screen_cap_url_huge)),
            ("stream_thumb_large", to_value(&channel.screen_cap_url_large)),
            ("stream_thumb_medium", to_value(&channel.screen_cap_url_medium)),
            ("stream_thumb_small", to_value(&channel.screen_cap_url_small)),
            ("stream_avatar_huge", to_value(&channel.image_url_huge)),
            ("stream_avatar_large", to_value(&channel.image_url_large)),
            ("stream_avatar_medium", to_value(&channel.image_url_medium)),
            ("stream_avatar_small", to_value(&channel.image_url_small)),
            ("stream_avatar_tiny", to_value(&channel.image_url_tiny)),
        ]
    }
}

fn to_value<T: Serialize>(field: &Option<T>) -> Value {
    // Plain strings and numbers always serialize; fall back to null otherwise
    serde_json::to_value(field).unwrap_or(Value::Null)
}
