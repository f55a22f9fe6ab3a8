//! Playback session store
//!
//! Exactly one session exists per application. It records which video is
//! loaded, the last observed playback facts, and how the session is presented.
//! The store also owns the single live engine: switching presentation between
//! theater and floating keeps it, switching videos replaces it.
//!
//! The store is constructed once at startup and handed to every surface; it
//! is cheap to clone and all clones share the same session.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::engine::{Engine, EngineEvent, EngineEvents, EngineFactory, EngineInit, EngineState};
use crate::core::source;
use crate::error::Result;
use crate::types::{PlayerMode, Rect};

/// Presentation of a loaded session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveMode {
    Theater,
    Floating,
}

impl From<ActiveMode> for PlayerMode {
    fn from(mode: ActiveMode) -> Self {
        match mode {
            ActiveMode::Theater => PlayerMode::Theater,
            ActiveMode::Floating => PlayerMode::Floating,
        }
    }
}

/// Catalog video a session plays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionVideo {
    pub id: String,
    pub src: String,
    pub title: String,
}

impl SessionVideo {
    pub fn new(id: impl Into<String>, src: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            src: src.into(),
            title: title.into(),
        }
    }
}

impl From<&crate::types::Video> for SessionVideo {
    fn from(video: &crate::types::Video) -> Self {
        Self::new(&video.id, &video.video_url, &video.title)
    }
}

/// Snapshot of the shared session
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackSession {
    pub video_id: String,
    pub video_src: String,
    pub video_title: String,
    /// Seconds, as last reported by the live engine
    pub current_time: f64,
    pub is_playing: bool,
    pub mode: PlayerMode,
    /// Theater slot on screen; only used to position the surface
    pub slot_rect: Option<Rect>,
}

impl PlaybackSession {
    pub fn is_loaded(&self) -> bool {
        !self.video_src.is_empty()
    }

    pub fn holds(&self, video_id: &str, video_src: &str) -> bool {
        self.is_loaded() && self.video_id == video_id && self.video_src == video_src
    }
}

/// What `start_or_resume` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Same video already loaded; only the presentation changed
    ModeSwitch,
    NewSession,
    /// The video has no playable source; the session was closed
    NoSource,
}

/// Listener settings that follow the session across surfaces
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackPreferences {
    pub volume: f64,
    pub muted: bool,
    pub rate: f64,
}

impl Default for PlaybackPreferences {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
            rate: 1.0,
        }
    }
}

impl PlaybackPreferences {
    fn apply(&self, engine: &Engine) {
        engine.set_volume(self.volume);
        engine.set_muted(self.muted);
        engine.set_rate(self.rate);
    }
}

/// Engine availability for the current session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    /// No video, or no surface has mounted an engine yet
    Detached,
    Loading,
    Ready,
    /// Backend failed; surfaces show a "video unavailable" fallback
    Unavailable(String),
}

#[derive(Default)]
struct EngineSlot {
    engine: Option<Engine>,
    pump: Option<JoinHandle<()>>,
    /// Bumped whenever the engine is torn down; stale pumps compare against it
    generation: u64,
    unavailable: Option<String>,
    preferences: PlaybackPreferences,
}

impl EngineSlot {
    fn teardown(&mut self) {
        if let Some(engine) = self.engine.take() {
            engine.destroy();
            debug!(generation = self.generation, "engine torn down");
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.unavailable = None;
        self.preferences = PlaybackPreferences::default();
        self.generation += 1;
    }
}

struct Shared {
    slot: Mutex<EngineSlot>,
    session: watch::Sender<PlaybackSession>,
}

/// Handle to the process-wide playback session
#[derive(Clone)]
pub struct PlaybackSessionStore {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for PlaybackSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSessionStore")
            .field("session", &*self.shared.session.borrow())
            .finish()
    }
}

impl Default for PlaybackSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSessionStore {
    pub fn new() -> Self {
        let (session, _) = watch::channel(PlaybackSession::default());
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(EngineSlot::default()),
                session,
            }),
        }
    }

    fn slot(&self) -> MutexGuard<'_, EngineSlot> {
        self.shared
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn downgrade(&self) -> Weak<Shared> {
        Arc::downgrade(&self.shared)
    }

    /// Current session facts
    pub fn snapshot(&self) -> PlaybackSession {
        self.shared.session.borrow().clone()
    }

    /// Re-render feed for surfaces
    pub fn watch(&self) -> watch::Receiver<PlaybackSession> {
        self.shared.session.subscribe()
    }

    pub fn mode(&self) -> PlayerMode {
        self.shared.session.borrow().mode
    }

    pub fn is_playing(&self) -> bool {
        self.shared.session.borrow().is_playing
    }

    /// Load a video, or only change presentation when it is already loaded.
    ///
    /// A new video tears down the previous engine and always begins playing.
    /// The replacement engine is built by the next surface that mounts. A
    /// video without a source closes the session instead.
    pub fn start_or_resume(
        &self,
        video: &SessionVideo,
        mode: ActiveMode,
        start_time: Option<f64>,
        slot_rect: Option<Rect>,
    ) -> StartOutcome {
        if video.src.trim().is_empty() {
            warn!(video_id = %video.id, "video has no source");
            self.close();
            return StartOutcome::NoSource;
        }

        let mut slot = self.slot();
        let same = self.shared.session.borrow().holds(&video.id, &video.src);

        if same {
            self.shared.session.send_modify(|s| {
                s.mode = mode.into();
                if slot_rect.is_some() {
                    s.slot_rect = slot_rect;
                }
            });
            debug!(video_id = %video.id, ?mode, "session mode switch");
            return StartOutcome::ModeSwitch;
        }

        slot.teardown();
        self.shared.session.send_modify(|s| {
            *s = PlaybackSession {
                video_id: video.id.clone(),
                video_src: video.src.clone(),
                video_title: video.title.clone(),
                current_time: start_time.unwrap_or(0.0).max(0.0),
                is_playing: true,
                mode: mode.into(),
                slot_rect: slot_rect.or(s.slot_rect),
            };
        });
        info!(video_id = %video.id, ?mode, start_time = start_time.unwrap_or(0.0), "session started");
        StartOutcome::NewSession
    }

    /// Change presentation without touching the engine or playback position
    pub fn switch_mode(&self, target: ActiveMode, slot_rect: Option<Rect>) {
        let _slot = self.slot();
        let changed = self.shared.session.send_if_modified(|s| {
            if !s.is_loaded() {
                return false;
            }
            s.mode = target.into();
            if target == ActiveMode::Theater && slot_rect.is_some() {
                s.slot_rect = slot_rect;
            }
            true
        });
        if changed {
            debug!(?target, "session mode switched");
        }
    }

    /// Tear down the engine and return to the empty hidden state
    pub fn close(&self) {
        let mut slot = self.slot();
        slot.teardown();
        let was_loaded = self.shared.session.send_if_modified(|s| {
            let loaded = s.is_loaded();
            *s = PlaybackSession::default();
            loaded
        });
        if was_loaded {
            info!("session closed");
        }
    }

    /// Overwrite the observed facts. Called on every engine tick.
    pub fn record_observed_playback(&self, current_time: f64, is_playing: bool) {
        let _slot = self.slot();
        self.apply_observed(current_time, is_playing);
    }

    fn apply_observed(&self, current_time: f64, is_playing: bool) {
        self.shared.session.send_if_modified(|s| {
            if !s.is_loaded() || (s.current_time == current_time && s.is_playing == is_playing) {
                return false;
            }
            s.current_time = current_time;
            s.is_playing = is_playing;
            true
        });
    }

    /// Only applies while `generation` still names the live engine
    fn record_if_current(&self, generation: u64, current_time: f64, is_playing: Option<bool>) -> bool {
        let slot = self.slot();
        if slot.generation != generation {
            return false;
        }
        let playing = is_playing.unwrap_or_else(|| self.is_playing());
        self.apply_observed(current_time, playing);
        true
    }

    pub fn seek(&self, time: f64) {
        let slot = self.slot();
        if !self.shared.session.borrow().is_loaded() {
            return;
        }
        let time = time.max(0.0);
        if let Some(engine) = slot.engine.as_ref() {
            engine.seek(time);
        }
        let playing = self.is_playing();
        self.apply_observed(time, playing);
    }

    pub fn set_playing(&self, playing: bool) {
        let slot = self.slot();
        if !self.shared.session.borrow().is_loaded() {
            return;
        }
        if let Some(engine) = slot.engine.as_ref() {
            if playing {
                engine.play();
            } else {
                engine.pause();
            }
        }
        self.shared.session.send_if_modified(|s| {
            let changed = s.is_playing != playing;
            s.is_playing = playing;
            changed
        });
    }

    /// Cosmetic bookkeeping from the slot tracker
    pub fn set_slot_rect(&self, rect: Option<Rect>) {
        self.shared.session.send_if_modified(|s| {
            let changed = s.slot_rect != rect;
            s.slot_rect = rect;
            changed
        });
    }

    /// Build the engine for the loaded video unless one is already live.
    ///
    /// Returns whether an engine was constructed. A construction failure
    /// leaves the session as it is with no engine.
    pub fn ensure_engine(&self, factory: &EngineFactory) -> Result<bool> {
        let mut slot = self.slot();
        let session = self.snapshot();
        if !session.is_loaded() || slot.engine.is_some() {
            return Ok(false);
        }

        let init = EngineInit {
            start_time: session.current_time,
            autoplay: session.is_playing,
        };
        let engine = match factory.create(&source::resolve(&session.video_src), init) {
            Ok(engine) => engine,
            Err(e) => {
                warn!(video_id = %session.video_id, error = %e, "engine construction failed");
                slot.unavailable = Some(e.to_string());
                return Err(e);
            }
        };

        if slot.preferences != PlaybackPreferences::default() {
            slot.preferences.apply(&engine);
        }
        let events = engine.subscribe();
        let generation = slot.generation;
        slot.engine = Some(engine);
        slot.unavailable = None;
        slot.pump = Some(tokio::spawn(follow_engine(self.downgrade(), generation, events)));
        info!(video_id = %session.video_id, generation, "engine attached");
        Ok(true)
    }

    pub fn engine_status(&self) -> EngineStatus {
        let slot = self.slot();
        match (&slot.engine, &slot.unavailable) {
            (_, Some(reason)) => EngineStatus::Unavailable(reason.clone()),
            (Some(engine), None) if engine.is_ready() => EngineStatus::Ready,
            (Some(_), None) => EngineStatus::Loading,
            (None, None) => EngineStatus::Detached,
        }
    }

    pub fn preferences(&self) -> PlaybackPreferences {
        self.slot().preferences
    }

    /// Change the session's listener settings and push them to the live engine
    pub fn update_preferences(
        &self,
        update: impl FnOnce(&mut PlaybackPreferences),
    ) -> PlaybackPreferences {
        let mut slot = self.slot();
        update(&mut slot.preferences);
        let preferences = slot.preferences;
        if let Some(engine) = slot.engine.as_ref() {
            preferences.apply(engine);
        }
        preferences
    }

    /// Extra subscription to the live engine (progress saving, duration)
    pub fn subscribe_engine(&self) -> Option<EngineEvents> {
        self.slot().engine.as_ref().map(Engine::subscribe)
    }

    /// Run a control call against the live engine, if any
    pub fn with_engine<R>(&self, f: impl FnOnce(&Engine) -> R) -> Option<R> {
        self.slot().engine.as_ref().map(f)
    }

    fn engine_failed(&self, generation: u64, message: String) {
        let mut slot = self.slot();
        if slot.generation != generation {
            return;
        }
        if let Some(engine) = slot.engine.take() {
            engine.destroy();
        }
        warn!(%message, "engine unavailable");
        slot.unavailable = Some(message);
    }
}

async fn follow_engine(store: Weak<Shared>, generation: u64, mut events: EngineEvents) {
    while let Some(event) = events.recv().await {
        let Some(shared) = store.upgrade() else {
            break;
        };
        let store = PlaybackSessionStore { shared };
        let applied = match event {
            EngineEvent::TimeUpdate { current_time } => {
                store.record_if_current(generation, current_time, None)
            }
            EngineEvent::StateChanged {
                state: EngineState::Playing,
                current_time,
            } => store.record_if_current(generation, current_time, Some(true)),
            EngineEvent::StateChanged {
                state: EngineState::Paused | EngineState::Ended,
                current_time,
            } => store.record_if_current(generation, current_time, Some(false)),
            EngineEvent::Error { message } => {
                store.engine_failed(generation, message);
                false
            }
            EngineEvent::StateChanged {
                state: EngineState::Buffering,
                ..
            }
            | EngineEvent::Ready { .. }
            | EngineEvent::DurationChanged { .. } => true,
        };
        if !applied {
            break;
        }
    }
}
