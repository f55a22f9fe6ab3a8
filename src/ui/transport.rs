//! Transport controls shared by both player surfaces
//!
//! Only the mounted surface drives the live engine; it does so through a
//! `Transport`, which routes every command through the session store so the
//! settings outlive the surface.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;

use super::viewport::{Key, KeyPress};
use crate::core::engine::{EngineEvent, EngineEvents, EngineState};
use crate::core::session::PlaybackSessionStore;
use crate::error::{Result, VidlearnError};
use crate::storage::progress::ProgressStore;
use crate::types::Config;

pub const PLAYBACK_SPEEDS: [f64; 8] = [0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 1.75, 2.0];

/// Keyboard step sizes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSettings {
    pub seek_step: f64,
    pub volume_step: f64,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            seek_step: 10.0,
            volume_step: 0.1,
        }
    }
}

impl From<&Config> for ControlSettings {
    fn from(config: &Config) -> Self {
        Self {
            seek_step: config.seek_step,
            volume_step: config.volume_step,
        }
    }
}

/// What a surface renders in its control bar.
///
/// Volume, mute and rate come from the session and follow it between
/// surfaces; the rest belongs to the mounted surface.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportState {
    pub volume: f64,
    pub muted: bool,
    pub rate: f64,
    pub fullscreen: bool,
    pub duration: f64,
    pub buffering: bool,
}

#[derive(Debug, Default)]
struct SurfaceState {
    fullscreen: bool,
    duration: f64,
    buffering: bool,
}

#[derive(Clone)]
pub struct Transport {
    store: PlaybackSessionStore,
    local: Arc<Mutex<SurfaceState>>,
    settings: ControlSettings,
}

impl Transport {
    pub fn new(store: PlaybackSessionStore, settings: ControlSettings) -> Self {
        let duration = store
            .with_engine(|e| e.duration())
            .filter(|d| *d > 0.0)
            .unwrap_or(0.0);
        Self {
            store,
            local: Arc::new(Mutex::new(SurfaceState {
                duration,
                ..SurfaceState::default()
            })),
            settings,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.local.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn state(&self) -> TransportState {
        let preferences = self.store.preferences();
        let local = self.lock();
        TransportState {
            volume: preferences.volume,
            muted: preferences.muted,
            rate: preferences.rate,
            fullscreen: local.fullscreen,
            duration: local.duration,
            buffering: local.buffering,
        }
    }

    pub fn duration(&self) -> f64 {
        self.lock().duration
    }

    /// Played fraction as a bar percentage
    pub fn progress_pct(&self) -> f64 {
        let duration = self.duration();
        if duration <= 0.0 {
            return 0.0;
        }
        (self.store.snapshot().current_time / duration * 100.0).clamp(0.0, 100.0)
    }

    pub fn toggle_play(&self) {
        let playing = self.store.is_playing();
        self.store.set_playing(!playing);
    }

    /// Relative seek, clamped to the video
    pub fn skip(&self, seconds: f64) {
        let current = self.store.snapshot().current_time;
        let duration = self.duration();
        let mut target = (current + seconds).max(0.0);
        if duration > 0.0 {
            target = target.min(duration);
        }
        self.store.seek(target);
    }

    /// Seek to a fraction of the duration, e.g. from a scrub bar click
    pub fn seek_fraction(&self, fraction: f64) {
        let duration = self.duration();
        if duration <= 0.0 {
            return;
        }
        self.store.seek(fraction.clamp(0.0, 1.0) * duration);
    }

    pub fn set_volume(&self, volume: f64) {
        let volume = volume.clamp(0.0, 1.0);
        self.store.update_preferences(|p| {
            p.volume = volume;
            p.muted = volume == 0.0;
        });
    }

    pub fn change_volume(&self, delta: f64) {
        let volume = self.store.preferences().volume;
        self.set_volume(volume + delta);
    }

    pub fn toggle_mute(&self) {
        self.store.update_preferences(|p| p.muted = !p.muted);
    }

    pub fn set_speed(&self, rate: f64) -> Result<()> {
        if !PLAYBACK_SPEEDS.contains(&rate) {
            return Err(VidlearnError::invalid_input(
                "speed",
                format!("Unsupported playback speed {}", rate),
            ));
        }
        self.store.update_preferences(|p| p.rate = rate);
        Ok(())
    }

    pub fn toggle_fullscreen(&self) {
        let mut state = self.lock();
        state.fullscreen = !state.fullscreen;
    }

    /// Apply a keyboard shortcut. Returns whether the key was consumed.
    pub fn handle_key(&self, press: KeyPress) -> bool {
        if press.in_text_field {
            return false;
        }
        match press.key {
            Key::Space | Key::Char('k') | Key::Char('K') => self.toggle_play(),
            Key::Char('f') | Key::Char('F') => self.toggle_fullscreen(),
            Key::Char('m') | Key::Char('M') => self.toggle_mute(),
            Key::ArrowLeft => self.skip(-self.settings.seek_step),
            Key::ArrowRight => self.skip(self.settings.seek_step),
            Key::ArrowUp => self.change_volume(self.settings.volume_step),
            Key::ArrowDown => self.change_volume(-self.settings.volume_step),
            _ => return false,
        }
        true
    }

    /// Fold an engine notification into the surface state
    pub fn observe(&self, event: &EngineEvent) {
        let mut state = self.lock();
        match event {
            EngineEvent::Ready { duration } | EngineEvent::DurationChanged { duration }
                if *duration > 0.0 =>
            {
                state.duration = *duration;
            }
            EngineEvent::StateChanged { state: s, .. } => {
                state.buffering = *s == EngineState::Buffering;
            }
            _ => {}
        }
    }
}

/// Keep the transport and saved progress in step with the live engine.
///
/// Ends by itself when the engine is destroyed.
pub fn follow_playback(
    mut events: EngineEvents,
    transport: Transport,
    progress: ProgressStore,
    video_id: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            transport.observe(&event);
            let duration = transport.duration();
            match event {
                EngineEvent::TimeUpdate { current_time }
                | EngineEvent::StateChanged {
                    state: EngineState::Paused,
                    current_time,
                } => {
                    progress.save_progress(&video_id, current_time, duration);
                }
                EngineEvent::StateChanged {
                    state: EngineState::Ended,
                    ..
                } => {
                    progress.save_progress(&video_id, duration, duration);
                }
                _ => {}
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::testing::*;
    use crate::core::engine::MediaEvent;
    use crate::core::session::{ActiveMode, SessionVideo};
    use crate::storage::kv::MemoryStore;

    async fn playing_store() -> (PlaybackSessionStore, std::sync::Arc<FakeMediaProvider>) {
        let (factory, native, _) = factory();
        let store = PlaybackSessionStore::new();
        let video = SessionVideo::new("a", "https://cdn.example.com/a.mp4", "A");
        store.start_or_resume(&video, ActiveMode::Theater, None, None);
        store.ensure_engine(&factory).unwrap();
        (store, native)
    }

    #[tokio::test]
    async fn test_keyboard_shortcuts() {
        let (store, native) = playing_store().await;
        let transport = Transport::new(store.clone(), ControlSettings::default());
        assert_eq!(transport.duration(), 120.0);
        store.record_observed_playback(50.0, true);

        assert!(transport.handle_key(KeyPress::new(Key::Space)));
        assert!(!store.is_playing());
        assert!(transport.handle_key(KeyPress::new(Key::ArrowRight)));
        assert_eq!(store.snapshot().current_time, 60.0);
        transport.handle_key(KeyPress::new(Key::ArrowLeft));
        transport.handle_key(KeyPress::new(Key::ArrowLeft));
        assert_eq!(store.snapshot().current_time, 40.0);

        transport.handle_key(KeyPress::new(Key::ArrowDown));
        assert!((transport.state().volume - 0.9).abs() < 1e-9);
        let (element, _) = native.last();
        assert!((element.lock().unwrap().volume - 0.9).abs() < 1e-9);

        transport.handle_key(KeyPress::new(Key::Char('m')));
        assert!(transport.state().muted);
        transport.handle_key(KeyPress::new(Key::Char('f')));
        assert!(transport.state().fullscreen);

        let typing = KeyPress {
            key: Key::Space,
            in_text_field: true,
        };
        assert!(!transport.handle_key(typing));
        assert!(!store.is_playing());
        assert!(!transport.handle_key(KeyPress::new(Key::Char('z'))));
    }

    #[tokio::test]
    async fn test_skip_and_scrub_clamp_to_duration() {
        let (store, _) = playing_store().await;
        let transport = Transport::new(store.clone(), ControlSettings::default());
        store.record_observed_playback(115.0, true);
        transport.skip(10.0);
        assert_eq!(store.snapshot().current_time, 120.0);
        transport.skip(-500.0);
        assert_eq!(store.snapshot().current_time, 0.0);
        transport.seek_fraction(1.5);
        assert_eq!(store.snapshot().current_time, 120.0);
        transport.seek_fraction(0.25);
        assert_eq!(transport.progress_pct(), 25.0);
    }

    #[tokio::test]
    async fn test_speed_restricted_to_menu() {
        let (store, native) = playing_store().await;
        let transport = Transport::new(store, ControlSettings::default());
        transport.set_speed(1.5).unwrap();
        assert_eq!(native.last().0.lock().unwrap().rate, 1.5);
        assert!(transport.set_speed(3.0).is_err());
        assert_eq!(transport.state().rate, 1.5);
    }

    #[tokio::test]
    async fn test_settings_carry_over_to_next_surface() {
        let (store, native) = playing_store().await;
        let theater = Transport::new(store.clone(), ControlSettings::default());
        theater.set_volume(0.4);
        theater.toggle_mute();
        theater.set_speed(0.75).unwrap();
        theater.toggle_fullscreen();

        store.switch_mode(ActiveMode::Floating, None);
        let floating = Transport::new(store.clone(), ControlSettings::default());
        let state = floating.state();
        assert_eq!(state.volume, 0.4);
        assert!(state.muted);
        assert_eq!(state.rate, 0.75);
        assert!(!state.fullscreen);

        floating.toggle_mute();
        let element = native.last().0;
        assert!(!element.lock().unwrap().muted);
        assert!(!theater.state().muted);
    }

    #[tokio::test]
    async fn test_progress_saved_on_ticks_and_end() {
        let (store, native) = playing_store().await;
        let transport = Transport::new(store.clone(), ControlSettings::default());
        let progress = ProgressStore::new(std::sync::Arc::new(MemoryStore::new()));
        let events = store.subscribe_engine().unwrap();
        let follower = follow_playback(events, transport, progress.clone(), "a".into());
        let (element, tx) = native.last();

        element.lock().unwrap().time = 30.0;
        tx.send(MediaEvent::TimeUpdate).unwrap();
        settle().await;
        assert_eq!(progress.resume_time("a"), 30.0);

        tx.send(MediaEvent::Ended).unwrap();
        settle().await;
        assert!(progress.progress("a").unwrap().completed);

        store.close();
        settle().await;
        assert!(follower.is_finished());
    }
}
