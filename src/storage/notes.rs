//! Timestamped video notes

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;

use super::kv::{KeyValueStore, read_json, write_json};
use crate::error::{Result, VidlearnError};
use crate::types::VideoNote;

pub const NOTES_KEY: &str = "video_notes";
pub const MAX_NOTE_LENGTH: usize = 150;
/// Seconds a note influences around its timestamp
pub const DEFAULT_ESTIMATED_DURATION: f64 = 30.0;

type NotesMap = BTreeMap<String, Vec<VideoNote>>;

/// `<millis>-<7 base36 chars>`
fn generate_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::rng();
    let suffix: String = (0..7)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

fn validate_content(content: &str) -> Result<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(VidlearnError::invalid_input("content", "Note cannot be empty"));
    }
    if content.chars().count() > MAX_NOTE_LENGTH {
        return Err(VidlearnError::invalid_input(
            "content",
            format!("Note must be at most {} characters", MAX_NOTE_LENGTH),
        ));
    }
    Ok(content.to_string())
}

/// Notes keyed by video id, each list kept sorted by timestamp
#[derive(Clone)]
pub struct NotesStore {
    kv: Arc<dyn KeyValueStore>,
}

impl NotesStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn load(&self) -> NotesMap {
        read_json(self.kv.as_ref(), NOTES_KEY)
    }

    fn store(&self, video_id: &str, notes: Vec<VideoNote>) {
        let mut all = self.load();
        all.insert(video_id.to_string(), notes);
        write_json(self.kv.as_ref(), NOTES_KEY, &all);
    }

    pub fn notes(&self, video_id: &str) -> Vec<VideoNote> {
        self.load().remove(video_id).unwrap_or_default()
    }

    pub fn add_note(&self, video_id: &str, content: &str, timestamp: f64) -> Result<VideoNote> {
        if video_id.is_empty() {
            return Err(VidlearnError::invalid_input("video_id", "No video selected"));
        }
        let note = VideoNote {
            id: generate_id(),
            video_id: video_id.to_string(),
            content: validate_content(content)?,
            timestamp: timestamp.max(0.0),
            estimated_duration: DEFAULT_ESTIMATED_DURATION,
            created_at: Utc::now().to_rfc3339(),
        };

        let mut notes = self.notes(video_id);
        notes.push(note.clone());
        notes.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        self.store(video_id, notes);
        Ok(note)
    }

    pub fn delete_note(&self, video_id: &str, note_id: &str) {
        let mut notes = self.notes(video_id);
        let before = notes.len();
        notes.retain(|n| n.id != note_id);
        if notes.len() != before {
            self.store(video_id, notes);
        }
    }

    /// Content is the only mutable field
    pub fn update_note(&self, video_id: &str, note_id: &str, content: &str) -> Result<()> {
        let content = validate_content(content)?;
        let mut notes = self.notes(video_id);
        let Some(note) = notes.iter_mut().find(|n| n.id == note_id) else {
            return Err(VidlearnError::invalid_input("note_id", "No such note"));
        };
        note.content = content;
        self.store(video_id, notes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::kv::MemoryStore;

    fn store() -> NotesStore {
        NotesStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_notes_stay_sorted_by_timestamp() {
        let notes = store();
        for ts in [90.0, 5.0, 42.5, 0.0, 300.0, 42.0] {
            notes.add_note("v1", &format!("at {ts}"), ts).unwrap();
        }
        let stamps: Vec<f64> = notes.notes("v1").iter().map(|n| n.timestamp).collect();
        assert_eq!(stamps, vec![0.0, 5.0, 42.0, 42.5, 90.0, 300.0]);
        assert!(notes.notes("v2").is_empty());
    }

    #[test]
    fn test_rejects_empty_and_overlong_content() {
        let notes = store();
        assert!(notes.add_note("v1", "   ", 1.0).is_err());
        assert!(notes.add_note("v1", &"x".repeat(151), 1.0).is_err());
        assert!(notes.add_note("v1", &"x".repeat(150), 1.0).is_ok());
        assert!(notes.add_note("", "hello", 1.0).is_err());
    }

    #[test]
    fn test_update_and_delete() {
        let notes = store();
        let first = notes.add_note("v1", "Key definition", 12.0).unwrap();
        let second = notes.add_note("v1", "Example", 20.0).unwrap();
        assert_eq!(first.estimated_duration, DEFAULT_ESTIMATED_DURATION);
        assert_ne!(first.id, second.id);

        notes.update_note("v1", &first.id, "Key definition (revisit)").unwrap();
        notes.delete_note("v1", &second.id);

        let remaining = notes.notes("v1");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].content, "Key definition (revisit)");
        assert_eq!(remaining[0].timestamp, 12.0);
        assert!(notes.update_note("v1", "missing", "x").is_err());
    }

    #[test]
    fn test_storage_failure_does_not_fail_add() {
        let notes = NotesStore::new(Arc::new(MemoryStore::with_quota(1)));
        let note = notes.add_note("v1", "still returned", 3.0).unwrap();
        assert_eq!(note.content, "still returned");
        assert!(notes.notes("v1").is_empty());
    }
}
