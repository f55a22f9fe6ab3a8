//! Counting backends and a wired-up player context for integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;

use vidlearn::core::engine::{
    EmbedBackend, EmbedPlayer, EmbedPlayerOptions, EmbedSignal, EmbedStateCode, EngineFactory,
    MediaElement, MediaElementProvider, MediaEvent, ScriptFuture,
};
use vidlearn::core::session::{PlaybackSessionStore, SessionVideo};
use vidlearn::error::Result;
use vidlearn::storage::kv::MemoryStore;
use vidlearn::storage::notes::NotesStore;
use vidlearn::storage::progress::ProgressStore;
use vidlearn::types::Rect;
use vidlearn::ui::PlayerContext;
use vidlearn::ui::slot::SlotElement;
use vidlearn::ui::transport::ControlSettings;
use vidlearn::ui::viewport::Viewport;

#[derive(Debug, Default)]
pub struct Playhead {
    pub time: f64,
    pub paused: bool,
}

/// Test-side handle on one opened media element
#[derive(Clone)]
pub struct ElementHandle {
    pub playhead: Arc<Mutex<Playhead>>,
    pub events: UnboundedSender<MediaEvent>,
}

impl ElementHandle {
    /// Move the playhead and fire a time update
    pub fn tick(&self, time: f64) {
        self.playhead.lock().unwrap().time = time;
        let _ = self.events.send(MediaEvent::TimeUpdate);
    }
}

struct CountingElement {
    playhead: Arc<Mutex<Playhead>>,
    dropped: Arc<AtomicUsize>,
}

impl Drop for CountingElement {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

impl MediaElement for CountingElement {
    fn play(&mut self) {
        self.playhead.lock().unwrap().paused = false;
    }
    fn pause(&mut self) {
        self.playhead.lock().unwrap().paused = true;
    }
    fn set_current_time(&mut self, seconds: f64) {
        self.playhead.lock().unwrap().time = seconds;
    }
    fn current_time(&self) -> f64 {
        self.playhead.lock().unwrap().time
    }
    fn duration(&self) -> f64 {
        600.0
    }
    fn set_volume(&mut self, _volume: f64) {}
    fn set_muted(&mut self, _muted: bool) {}
    fn set_playback_rate(&mut self, _rate: f64) {}
    fn is_paused(&self) -> bool {
        self.playhead.lock().unwrap().paused
    }
}

/// Counts element construction and disposal
#[derive(Default)]
pub struct CountingMedia {
    opened: AtomicUsize,
    dropped: Arc<AtomicUsize>,
    elements: Mutex<Vec<ElementHandle>>,
}

impl CountingMedia {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    pub fn element(&self, index: usize) -> ElementHandle {
        self.elements.lock().unwrap()[index].clone()
    }
}

impl MediaElementProvider for CountingMedia {
    fn open(&self, _url: &str, events: UnboundedSender<MediaEvent>) -> Result<Box<dyn MediaElement>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let playhead = Arc::new(Mutex::new(Playhead {
            time: 0.0,
            paused: true,
        }));
        self.elements.lock().unwrap().push(ElementHandle {
            playhead: playhead.clone(),
            events,
        });
        Ok(Box::new(CountingElement {
            playhead,
            dropped: self.dropped.clone(),
        }))
    }
}

struct CountingPlayer {
    playhead: Arc<Mutex<Playhead>>,
    signals: UnboundedSender<EmbedSignal>,
    destroyed: Arc<AtomicUsize>,
}

impl EmbedPlayer for CountingPlayer {
    fn play_video(&mut self) {
        self.playhead.lock().unwrap().paused = false;
        let _ = self
            .signals
            .send(EmbedSignal::StateChange(EmbedStateCode::Playing as i32));
    }
    fn pause_video(&mut self) {
        self.playhead.lock().unwrap().paused = true;
        let _ = self
            .signals
            .send(EmbedSignal::StateChange(EmbedStateCode::Paused as i32));
    }
    fn seek_to(&mut self, seconds: f64, _allow_seek_ahead: bool) {
        self.playhead.lock().unwrap().time = seconds;
    }
    fn set_volume(&mut self, _volume: u8) {}
    fn mute(&mut self) {}
    fn un_mute(&mut self) {}
    fn set_playback_rate(&mut self, _rate: f64) {}
    fn current_time(&self) -> f64 {
        self.playhead.lock().unwrap().time
    }
    fn duration(&self) -> f64 {
        900.0
    }
    fn destroy(&mut self) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Embedded players that become ready as soon as they are created
#[derive(Default)]
pub struct CountingEmbeds {
    script_loads: AtomicUsize,
    created: AtomicUsize,
    destroyed: Arc<AtomicUsize>,
    playheads: Mutex<Vec<Arc<Mutex<Playhead>>>>,
}

impl CountingEmbeds {
    pub fn script_loads(&self) -> usize {
        self.script_loads.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn set_time(&self, index: usize, time: f64) {
        self.playheads.lock().unwrap()[index].lock().unwrap().time = time;
    }
}

impl EmbedBackend for CountingEmbeds {
    fn load_script(&self) -> ScriptFuture {
        self.script_loads.fetch_add(1, Ordering::SeqCst);
        Box::pin(async {
            tokio::task::yield_now().await;
            Ok(())
        })
    }

    fn create_player(
        &self,
        _options: EmbedPlayerOptions,
        signals: UnboundedSender<EmbedSignal>,
    ) -> Result<()> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let playhead = Arc::new(Mutex::new(Playhead::default()));
        self.playheads.lock().unwrap().push(playhead.clone());
        let player = CountingPlayer {
            playhead,
            signals: signals.clone(),
            destroyed: self.destroyed.clone(),
        };
        let _ = signals.send(EmbedSignal::Ready(Box::new(player)));
        Ok(())
    }
}

pub struct FixedSlot;

impl SlotElement for FixedSlot {
    fn bounding_rect(&self) -> Rect {
        Rect::new(0.0, 64.0, 960.0, 540.0)
    }
}

pub struct Harness {
    pub ctx: PlayerContext,
    pub media: Arc<CountingMedia>,
    pub embeds: Arc<CountingEmbeds>,
}

impl Harness {
    pub fn store(&self) -> &PlaybackSessionStore {
        &self.ctx.store
    }
}

pub fn harness() -> Harness {
    let media = Arc::new(CountingMedia::default());
    let embeds = Arc::new(CountingEmbeds::default());
    let kv = Arc::new(MemoryStore::new());
    let ctx = PlayerContext {
        store: PlaybackSessionStore::new(),
        engines: EngineFactory::new(media.clone(), embeds.clone()),
        viewport: Viewport::new(1280.0, 720.0),
        progress: ProgressStore::new(kv.clone()),
        notes: NotesStore::new(kv),
        controls: ControlSettings::default(),
    };
    Harness { ctx, media, embeds }
}

pub fn lecture(id: &str) -> SessionVideo {
    SessionVideo::new(id, format!("https://cdn.example.com/{id}.mp4"), format!("Lecture {id}"))
}

pub fn hosted(id: &str) -> SessionVideo {
    SessionVideo::new(id, format!("https://www.youtube.com/watch?v={id}"), format!("Talk {id}"))
}

/// Let spawned tasks drain their queues
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
