//! Video URL classification
//!
//! Turns a raw URL string into something a playback engine can be built for.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Watch, short-link, embed, legacy `/v/` and shorts forms all carry the id
/// as the first path segment or the `v` query parameter.
static EMBED_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:youtube\.com/watch\?(?:[^#]*&)?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)([A-Za-z0-9_-]+)",
    )
    .expect("Invalid regex")
});

/// Build the embed URL for a platform video id
pub fn build_embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{}", video_id)
}

/// Classified playable source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Hosted on the embeddable platform, played through its iframe player
    Embedded { id: String, embed_url: String },
    /// Plain media file played by a native media element
    Direct { url: String },
    Invalid { reason: String },
}

/// Which engine family a source needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Embedded,
    Direct,
    Invalid,
}

impl VideoSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Embedded { .. } => SourceKind::Embedded,
            Self::Direct { .. } => SourceKind::Direct,
            Self::Invalid { .. } => SourceKind::Invalid,
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid { .. })
    }

    /// URL a player can load, `None` for invalid sources
    pub fn playable_url(&self) -> Option<&str> {
        match self {
            Self::Embedded { embed_url, .. } => Some(embed_url),
            Self::Direct { url } => Some(url),
            Self::Invalid { .. } => None,
        }
    }

    /// Short label for display
    pub fn label(&self) -> &'static str {
        match self {
            Self::Embedded { .. } => "YouTube",
            Self::Direct { .. } => "Direct Link",
            Self::Invalid { .. } => "Invalid",
        }
    }
}

/// Extract the platform video id from any of the recognized link shapes
pub fn embedded_video_id(url: &str) -> Option<&str> {
    EMBED_ID_PATTERN
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Classify a URL. Pure and total.
pub fn resolve(url: &str) -> VideoSource {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return VideoSource::Invalid {
            reason: "URL is required".into(),
        };
    }

    if Url::parse(trimmed).is_err() {
        return VideoSource::Invalid {
            reason: "Please enter a valid URL".into(),
        };
    }

    if let Some(id) = embedded_video_id(trimmed) {
        return VideoSource::Embedded {
            id: id.to_string(),
            embed_url: build_embed_url(id),
        };
    }

    VideoSource::Direct {
        url: trimmed.to_string(),
    }
}
