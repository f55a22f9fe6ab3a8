//! Native media element engine
//!
//! Control calls go straight to the element. Element events arrive on a
//! channel and are translated one-to-one into engine events.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::debug;

use super::{EngineEvent, EngineEvents, EngineInit, EngineState, Listeners};
use crate::error::Result;

/// Events a media element fires, named after their DOM counterparts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    Play,
    Pause,
    Waiting,
    CanPlay,
    Ended,
    TimeUpdate,
    DurationChange,
    LoadedMetadata,
}

/// A host media element (a `<video>` tag or equivalent)
pub trait MediaElement: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn set_current_time(&mut self, seconds: f64);
    fn current_time(&self) -> f64;
    /// NaN or 0 until metadata is loaded
    fn duration(&self) -> f64;
    fn set_volume(&mut self, volume: f64);
    fn set_muted(&mut self, muted: bool);
    fn set_playback_rate(&mut self, rate: f64);
    fn is_paused(&self) -> bool;
}

/// Creates media elements for a URL and wires their events to `events`
pub trait MediaElementProvider: Send + Sync {
    fn open(&self, url: &str, events: UnboundedSender<MediaEvent>)
    -> Result<Box<dyn MediaElement>>;
}

struct NativeInner {
    element: Option<Box<dyn MediaElement>>,
    listeners: Listeners,
    init: EngineInit,
    initial_applied: bool,
}

impl NativeInner {
    fn time(&self) -> f64 {
        self.element.as_ref().map_or(0.0, |e| e.current_time())
    }

    fn duration(&self) -> f64 {
        self.element
            .as_ref()
            .map(|e| e.duration())
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(0.0)
    }

    fn state_changed(&mut self, state: EngineState) {
        let current_time = self.time();
        self.listeners.emit(EngineEvent::StateChanged {
            state,
            current_time,
        });
    }

    fn handle(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::Play => self.state_changed(EngineState::Playing),
            MediaEvent::Pause => self.state_changed(EngineState::Paused),
            MediaEvent::Waiting => self.state_changed(EngineState::Buffering),
            MediaEvent::CanPlay => {
                let paused = self.element.as_ref().is_none_or(|e| e.is_paused());
                self.state_changed(if paused {
                    EngineState::Paused
                } else {
                    EngineState::Playing
                });
            }
            MediaEvent::Ended => self.state_changed(EngineState::Ended),
            MediaEvent::TimeUpdate => {
                // The element reports 0 until the resume seek lands on metadata
                if !self.initial_applied && self.init.start_time > 0.0 {
                    return;
                }
                let current_time = self.time();
                self.listeners.emit(EngineEvent::TimeUpdate { current_time });
            }
            MediaEvent::DurationChange => {
                let duration = self.duration();
                if duration > 0.0 {
                    self.listeners.emit(EngineEvent::DurationChanged { duration });
                }
            }
            MediaEvent::LoadedMetadata => {
                let duration = self.duration();
                if duration > 0.0 {
                    self.listeners.emit(EngineEvent::DurationChanged { duration });
                }
                if !self.initial_applied && duration > 0.0 {
                    self.initial_applied = true;
                    let start = self.init.start_time;
                    if start > 0.0 {
                        if let Some(element) = self.element.as_mut() {
                            element.set_current_time(start.min(duration));
                        }
                    }
                    self.listeners.emit(EngineEvent::Ready { duration });
                }
            }
        }
    }
}

fn lock(inner: &Mutex<NativeInner>) -> MutexGuard<'_, NativeInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Engine wrapping a native media element
pub struct NativeEngine {
    inner: Arc<Mutex<NativeInner>>,
    pump: JoinHandle<()>,
}

impl NativeEngine {
    pub fn open(provider: &dyn MediaElementProvider, url: &str, init: EngineInit) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut element = provider.open(url, tx)?;
        if init.autoplay {
            element.play();
        }

        let inner = Arc::new(Mutex::new(NativeInner {
            element: Some(element),
            listeners: Listeners::default(),
            init,
            initial_applied: false,
        }));
        let pump = tokio::spawn(pump_media_events(Arc::downgrade(&inner), rx));

        Ok(Self { inner, pump })
    }

    fn with_element(&self, f: impl FnOnce(&mut dyn MediaElement)) {
        if let Some(element) = lock(&self.inner).element.as_deref_mut() {
            f(element);
        }
    }

    pub fn play(&self) {
        self.with_element(|e| e.play());
    }

    pub fn pause(&self) {
        self.with_element(|e| e.pause());
    }

    pub fn seek(&self, seconds: f64) {
        let mut inner = lock(&self.inner);
        if !inner.initial_applied {
            // Metadata not loaded yet; keep the latest target for load time
            inner.init.start_time = seconds;
        }
        if let Some(element) = inner.element.as_mut() {
            element.set_current_time(seconds.max(0.0));
        }
    }

    pub fn set_volume(&self, volume: f64) {
        self.with_element(|e| e.set_volume(volume));
    }

    pub fn set_muted(&self, muted: bool) {
        self.with_element(|e| e.set_muted(muted));
    }

    pub fn set_rate(&self, rate: f64) {
        self.with_element(|e| e.set_playback_rate(rate));
    }

    pub fn current_time(&self) -> f64 {
        lock(&self.inner).time()
    }

    pub fn duration(&self) -> f64 {
        lock(&self.inner).duration()
    }

    pub fn is_ready(&self) -> bool {
        lock(&self.inner).element.is_some()
    }

    pub fn subscribe(&self) -> EngineEvents {
        lock(&self.inner).listeners.subscribe()
    }

    pub fn destroy(&self) {
        let mut inner = lock(&self.inner);
        if let Some(mut element) = inner.element.take() {
            element.pause();
            debug!("native engine destroyed");
        }
        inner.listeners.clear();
        self.pump.abort();
    }
}

impl Drop for NativeEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

async fn pump_media_events(inner: Weak<Mutex<NativeInner>>, mut rx: UnboundedReceiver<MediaEvent>) {
    while let Some(event) = rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let mut guard = lock(&inner);
        if guard.element.is_none() {
            break;
        }
        guard.handle(event);
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;

    fn open(provider: &FakeMediaProvider, start_time: f64) -> NativeEngine {
        NativeEngine::open(
            provider,
            "https://cdn.example.com/a.mp4",
            EngineInit {
                start_time,
                autoplay: true,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_media_events_map_to_engine_events() {
        let provider = FakeMediaProvider::default();
        let engine = open(&provider, 0.0);
        let mut events = engine.subscribe();
        let (state, tx) = provider.last();

        state.lock().unwrap().time = 3.5;
        tx.send(MediaEvent::Play).unwrap();
        tx.send(MediaEvent::TimeUpdate).unwrap();
        tx.send(MediaEvent::Waiting).unwrap();
        tx.send(MediaEvent::Ended).unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            EngineEvent::StateChanged {
                state: EngineState::Playing,
                current_time: 3.5
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            EngineEvent::TimeUpdate { current_time: 3.5 }
        );
        assert!(matches!(
            events.recv().await.unwrap(),
            EngineEvent::StateChanged {
                state: EngineState::Buffering,
                ..
            }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            EngineEvent::StateChanged {
                state: EngineState::Ended,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_initial_seek_applied_once_on_metadata() {
        let provider = FakeMediaProvider::default();
        let engine = open(&provider, 42.0);
        let mut events = engine.subscribe();
        let (state, tx) = provider.last();
        assert!(!state.lock().unwrap().paused, "autoplay starts the element");

        tx.send(MediaEvent::LoadedMetadata).unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            EngineEvent::DurationChanged { duration: 120.0 }
        );
        assert_eq!(events.recv().await.unwrap(), EngineEvent::Ready { duration: 120.0 });
        assert_eq!(engine.current_time(), 42.0);

        engine.seek(10.0);
        tx.send(MediaEvent::LoadedMetadata).unwrap();
        settle().await;
        assert_eq!(engine.current_time(), 10.0);
    }

    #[tokio::test]
    async fn test_time_updates_wait_for_resume_seek() {
        let provider = FakeMediaProvider::default();
        let engine = open(&provider, 42.0);
        let mut events = engine.subscribe();
        let (_, tx) = provider.last();

        tx.send(MediaEvent::TimeUpdate).unwrap();
        tx.send(MediaEvent::LoadedMetadata).unwrap();
        tx.send(MediaEvent::TimeUpdate).unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            EngineEvent::DurationChanged { duration: 120.0 }
        );
        assert_eq!(events.recv().await.unwrap(), EngineEvent::Ready { duration: 120.0 });
        assert_eq!(
            events.recv().await.unwrap(),
            EngineEvent::TimeUpdate { current_time: 42.0 }
        );
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent_and_detaches() {
        let provider = FakeMediaProvider::default();
        let engine = open(&provider, 0.0);
        let mut events = engine.subscribe();
        let (_, tx) = provider.last();

        engine.destroy();
        engine.destroy();
        let _ = tx.send(MediaEvent::Play);
        settle().await;

        assert!(events.recv().await.is_none());
        assert!(!engine.is_ready());
        engine.play();
        assert_eq!(engine.current_time(), 0.0);
    }
}
