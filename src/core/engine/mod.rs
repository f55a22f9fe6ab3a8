//! Playback engines
//!
//! One control surface over two backends: a native media element for direct
//! file URLs, and the platform's embedded iframe player for hosted videos.
//! The embedded backend initializes asynchronously; callers never see that,
//! control calls made before it is ready are deferred.

pub mod embedded;
pub mod headless;
pub mod native;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::core::source::{SourceKind, VideoSource};
use crate::error::{Result, VidlearnError};

pub use embedded::{
    EmbedBackend, EmbedPlayer, EmbedPlayerOptions, EmbedSignal, EmbedStateCode, EmbeddedEngine,
    ScriptFuture, ScriptLoader,
};
pub use native::{MediaElement, MediaElementProvider, MediaEvent, NativeEngine};

/// Default cadence for synthesizing time updates from the embedded player
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Discrete playback transitions reported by every engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Playing,
    Paused,
    Buffering,
    Ended,
}

/// Notification emitted by an engine to its subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Backend finished initializing, control calls now reach it directly
    Ready { duration: f64 },
    StateChanged { state: EngineState, current_time: f64 },
    TimeUpdate { current_time: f64 },
    DurationChanged { duration: f64 },
    /// Backend reported a failure; the engine stays constructed but unusable
    Error { message: String },
}

/// Receiving end of an engine subscription
pub type EngineEvents = UnboundedReceiver<EngineEvent>;

/// Where playback should begin once the backend can take commands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineInit {
    pub start_time: f64,
    pub autoplay: bool,
}

impl Default for EngineInit {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            autoplay: true,
        }
    }
}

/// Subscriber list shared by both engine implementations
#[derive(Debug, Default)]
pub(crate) struct Listeners {
    senders: Vec<UnboundedSender<EngineEvent>>,
}

impl Listeners {
    pub(crate) fn subscribe(&mut self) -> EngineEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.push(tx);
        rx
    }

    /// Drops subscribers whose receiver is gone
    pub(crate) fn emit(&mut self, event: EngineEvent) {
        self.senders.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub(crate) fn clear(&mut self) {
        self.senders.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.senders.len()
    }
}

/// Backend-independent engine handle
pub enum Engine {
    Native(NativeEngine),
    Embedded(EmbeddedEngine),
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Engine::Native(_) => f.write_str("Engine::Native"),
            Engine::Embedded(_) => f.write_str("Engine::Embedded"),
        }
    }
}

impl Engine {
    pub fn kind(&self) -> SourceKind {
        match self {
            Engine::Native(_) => SourceKind::Direct,
            Engine::Embedded(_) => SourceKind::Embedded,
        }
    }

    pub fn play(&self) {
        match self {
            Engine::Native(e) => e.play(),
            Engine::Embedded(e) => e.play(),
        }
    }

    pub fn pause(&self) {
        match self {
            Engine::Native(e) => e.pause(),
            Engine::Embedded(e) => e.pause(),
        }
    }

    pub fn seek(&self, seconds: f64) {
        match self {
            Engine::Native(e) => e.seek(seconds),
            Engine::Embedded(e) => e.seek(seconds),
        }
    }

    /// `volume` is clamped to 0..=1
    pub fn set_volume(&self, volume: f64) {
        let volume = volume.clamp(0.0, 1.0);
        match self {
            Engine::Native(e) => e.set_volume(volume),
            Engine::Embedded(e) => e.set_volume(volume),
        }
    }

    pub fn set_muted(&self, muted: bool) {
        match self {
            Engine::Native(e) => e.set_muted(muted),
            Engine::Embedded(e) => e.set_muted(muted),
        }
    }

    pub fn set_rate(&self, rate: f64) {
        match self {
            Engine::Native(e) => e.set_rate(rate),
            Engine::Embedded(e) => e.set_rate(rate),
        }
    }

    pub fn current_time(&self) -> f64 {
        match self {
            Engine::Native(e) => e.current_time(),
            Engine::Embedded(e) => e.current_time(),
        }
    }

    pub fn duration(&self) -> f64 {
        match self {
            Engine::Native(e) => e.duration(),
            Engine::Embedded(e) => e.duration(),
        }
    }

    pub fn is_ready(&self) -> bool {
        match self {
            Engine::Native(e) => e.is_ready(),
            Engine::Embedded(e) => e.is_ready(),
        }
    }

    pub fn subscribe(&self) -> EngineEvents {
        match self {
            Engine::Native(e) => e.subscribe(),
            Engine::Embedded(e) => e.subscribe(),
        }
    }

    /// Idempotent. No event reaches any subscriber after this returns.
    pub fn destroy(&self) {
        match self {
            Engine::Native(e) => e.destroy(),
            Engine::Embedded(e) => e.destroy(),
        }
    }
}

/// Builds the right engine for a resolved source
#[derive(Clone)]
pub struct EngineFactory {
    native: Arc<dyn MediaElementProvider>,
    embedded: Arc<dyn EmbedBackend>,
    scripts: ScriptLoader,
    poll_interval: Duration,
}

impl EngineFactory {
    pub fn new(native: Arc<dyn MediaElementProvider>, embedded: Arc<dyn EmbedBackend>) -> Self {
        Self {
            native,
            embedded,
            scripts: ScriptLoader::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn script_loader(&self) -> &ScriptLoader {
        &self.scripts
    }

    /// Construct an engine. Must be called from within a tokio runtime.
    pub fn create(&self, source: &VideoSource, init: EngineInit) -> Result<Engine> {
        match source {
            VideoSource::Direct { url } => {
                debug!(%url, "creating native engine");
                NativeEngine::open(self.native.as_ref(), url, init).map(Engine::Native)
            }
            VideoSource::Embedded { id, .. } => {
                debug!(video_id = %id, "creating embedded engine");
                let options = EmbedPlayerOptions::for_video(id, init.autoplay);
                Ok(Engine::Embedded(EmbeddedEngine::spawn(
                    self.embedded.clone(),
                    self.scripts.clone(),
                    options,
                    init,
                    self.poll_interval,
                )))
            }
            VideoSource::Invalid { reason } => {
                Err(VidlearnError::PlaybackUnavailable(reason.clone()))
            }
        }
    }
}
