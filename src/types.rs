//! Type definitions for vidlearn
//!
//! Source of truth for all data structures shared between the API client,
//! persistence, and the player session.

use serde::{Deserialize, Serialize};

// ============================================
// Catalog Types
// ============================================

/// A video as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub video_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Payload for creating a new video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVideoPayload {
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub video_url: String,
}

/// A comment on a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub video_id: String,
    pub user_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Payload for posting a comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCommentPayload {
    pub video_id: String,
    pub user_id: String,
    pub content: String,
}

/// `GET /videos` response wrapper
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideosResponse {
    #[serde(default)]
    pub videos: Vec<Video>,
}

/// `GET /videos/single` response wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct VideoResponse {
    pub video: Video,
}

/// `GET /videos/comments` response wrapper
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentsResponse {
    #[serde(default)]
    pub comments: Vec<Comment>,
}

// ============================================
// Local Persistence Types
// ============================================

/// A timestamped note attached to a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoNote {
    pub id: String,
    pub video_id: String,
    /// At most 150 characters
    pub content: String,
    /// Seconds into the video
    pub timestamp: f64,
    /// Decay radius in seconds, used for the scrub bar visualization
    pub estimated_duration: f64,
    /// RFC 3339
    pub created_at: String,
}

/// Watch progress for a single video
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoProgress {
    pub current_time: f64,
    pub duration: f64,
    /// Unix timestamp in milliseconds
    pub last_watched: i64,
    pub completed: bool,
}

// ============================================
// Player Types
// ============================================

/// How the playback session is currently presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerMode {
    /// Full-size in-page player bound to the video route
    Theater,
    /// Small draggable overlay that persists across routes
    Floating,
    /// No video loaded
    #[default]
    Hidden,
}

/// Screen rectangle in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A slot that has not been laid out yet measures zero in one dimension
    pub fn is_usable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

// ============================================
// Config Types
// ============================================

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the REST API, without trailing slash
    pub api_base_url: String,
    /// User id used when creating videos and comments
    pub user_id: String,
    /// Embedded player time polling cadence
    pub poll_interval_ms: u64,
    /// Seconds skipped by the arrow keys
    pub seek_step: f64,
    /// Volume change per arrow key press, 0..1
    pub volume_step: f64,
    /// Editor command (default: "nvim")
    pub editor: String,
    /// Default tracing filter
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".into(),
            user_id: "pitom_saha1".into(),
            poll_interval_ms: 250,
            seek_step: 10.0,
            volume_step: 0.1,
            editor: "nvim".into(),
            log_level: "info".into(),
        }
    }
}

// ============================================
// Selector Types
// ============================================

/// Item displayed in selector menu
#[derive(Debug, Clone)]
pub struct MenuItem<T> {
    /// Display text
    pub label: String,
    /// Underlying value
    pub value: T,
}

// ============================================
// Cache Types
// ============================================

/// Cached data with TTL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: i64,
    /// Time-to-live in seconds
    pub ttl: u64,
}
