//! Watch progress and resume offsets

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use super::kv::{KeyValueStore, read_json, write_json};
use crate::types::VideoProgress;

pub const PROGRESS_KEY: &str = "video_progress";
/// Fraction watched at which a video counts as completed
pub const COMPLETION_THRESHOLD: f64 = 0.9;
/// Never resume closer than this to the end
pub const END_GUARD_SECS: f64 = 5.0;

type ProgressMap = BTreeMap<String, VideoProgress>;

impl VideoProgress {
    pub fn new(current_time: f64, duration: f64) -> Self {
        Self {
            current_time,
            duration,
            last_watched: Utc::now().timestamp_millis(),
            completed: current_time / duration >= COMPLETION_THRESHOLD,
        }
    }

    /// Offset to seek to when playback restarts, 0 for "from the start"
    pub fn resume_time(&self) -> f64 {
        if self.completed || self.duration - self.current_time < END_GUARD_SECS {
            return 0.0;
        }
        self.current_time
    }

    pub fn watched_percent(&self) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        (self.current_time / self.duration * 100.0).min(100.0)
    }
}

#[derive(Clone)]
pub struct ProgressStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ProgressStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn all_progress(&self) -> ProgressMap {
        read_json(self.kv.as_ref(), PROGRESS_KEY)
    }

    pub fn progress(&self, video_id: &str) -> Option<VideoProgress> {
        self.all_progress().remove(video_id)
    }

    /// Ignored until the duration is known
    pub fn save_progress(
        &self,
        video_id: &str,
        current_time: f64,
        duration: f64,
    ) -> Option<VideoProgress> {
        if video_id.is_empty() || duration <= 0.0 {
            return None;
        }
        let progress = VideoProgress::new(current_time, duration);
        let mut all = self.all_progress();
        all.insert(video_id.to_string(), progress);
        write_json(self.kv.as_ref(), PROGRESS_KEY, &all);
        Some(progress)
    }

    pub fn resume_time(&self, video_id: &str) -> f64 {
        self.progress(video_id).map_or(0.0, |p| p.resume_time())
    }
}
