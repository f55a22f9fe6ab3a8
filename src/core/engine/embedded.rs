//! Embedded platform player engine
//!
//! The platform's player API arrives as a script that is fetched once per
//! process and shared by every engine. A player object only exists after its
//! ready callback; until then control calls are parked (last write wins) and
//! applied at ready time. The platform pushes discrete state changes only, so
//! continuous time is synthesized by polling while playing.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::OnceCell;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{EngineEvent, EngineEvents, EngineInit, EngineState, Listeners};
use crate::error::Result;

/// Future returned by [`EmbedBackend::load_script`]
pub type ScriptFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Player state codes reported through the platform's state-change callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum EmbedStateCode {
    Unstarted = -1,
    Ended = 0,
    Playing = 1,
    Paused = 2,
    Buffering = 3,
    Cued = 5,
}

impl EmbedStateCode {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Unstarted),
            0 => Some(Self::Ended),
            1 => Some(Self::Playing),
            2 => Some(Self::Paused),
            3 => Some(Self::Buffering),
            5 => Some(Self::Cued),
            _ => None,
        }
    }
}

/// Player object handed over by the platform once it is ready
pub trait EmbedPlayer: Send {
    fn play_video(&mut self);
    fn pause_video(&mut self);
    fn seek_to(&mut self, seconds: f64, allow_seek_ahead: bool);
    /// 0..=100
    fn set_volume(&mut self, volume: u8);
    fn mute(&mut self);
    fn un_mute(&mut self);
    fn set_playback_rate(&mut self, rate: f64);
    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
    fn destroy(&mut self);
}

/// Callbacks from the platform player
pub enum EmbedSignal {
    Ready(Box<dyn EmbedPlayer>),
    StateChange(i32),
    Error(i32),
}

/// Construction options passed to the platform player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedPlayerOptions {
    /// Host element id the iframe replaces
    pub container_id: String,
    pub video_id: String,
    pub autoplay: bool,
    /// Platform chrome is hidden, the surfaces draw their own controls
    pub controls: bool,
    pub keyboard: bool,
    pub related_videos: bool,
    pub plays_inline: bool,
}

impl EmbedPlayerOptions {
    pub fn for_video(video_id: &str, autoplay: bool) -> Self {
        Self {
            container_id: format!("youtube-player-{}", video_id),
            video_id: video_id.to_string(),
            autoplay,
            controls: false,
            keyboard: false,
            related_videos: false,
            plays_inline: true,
        }
    }
}

/// The platform's player library
pub trait EmbedBackend: Send + Sync {
    /// Insert the API script and resolve when it is usable
    fn load_script(&self) -> ScriptFuture;

    /// Start building a player; readiness and state changes arrive on `signals`
    fn create_player(
        &self,
        options: EmbedPlayerOptions,
        signals: UnboundedSender<EmbedSignal>,
    ) -> Result<()>;
}

/// Process-wide guard so the API script is inserted at most once.
///
/// A failed load is not cached; the next engine retries.
#[derive(Debug, Clone, Default)]
pub struct ScriptLoader {
    loaded: Arc<OnceCell<()>>,
}

impl ScriptLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    pub async fn ensure_loaded(&self, backend: &dyn EmbedBackend) -> Result<()> {
        self.loaded
            .get_or_try_init(|| backend.load_script())
            .await
            .map(|_| ())
    }
}

/// Control calls issued before the player is ready
#[derive(Debug, Default)]
struct Pending {
    seek: Option<f64>,
    playing: Option<bool>,
    volume: Option<f64>,
    muted: Option<bool>,
    rate: Option<f64>,
}

struct EmbeddedInner {
    player: Option<Box<dyn EmbedPlayer>>,
    listeners: Listeners,
    pending: Pending,
    init: EngineInit,
    initial_applied: bool,
    last_time: f64,
    duration: f64,
    poller: Option<JoinHandle<()>>,
    poll_interval: Duration,
}

impl EmbeddedInner {
    fn time(&self) -> f64 {
        self.player
            .as_ref()
            .map_or(self.last_time, |p| p.current_time())
    }

    fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }

    fn state_changed(&mut self, state: EngineState) {
        let current_time = self.time();
        self.last_time = current_time;
        self.listeners.emit(EngineEvent::StateChanged {
            state,
            current_time,
        });
    }

    fn refresh_duration(&mut self) {
        let duration = self.player.as_ref().map_or(0.0, |p| p.duration());
        if duration > 0.0 && duration != self.duration {
            self.duration = duration;
            self.listeners.emit(EngineEvent::DurationChanged { duration });
        }
    }
}

fn lock(inner: &Mutex<EmbeddedInner>) -> MutexGuard<'_, EmbeddedInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Engine wrapping the platform's embedded player
pub struct EmbeddedEngine {
    inner: Arc<Mutex<EmbeddedInner>>,
    /// Cleared on destroy; every deferred callback checks it first
    mounted: Arc<AtomicBool>,
    driver: JoinHandle<()>,
}

impl EmbeddedEngine {
    /// Begin loading. Returns immediately; the player becomes ready later.
    pub fn spawn(
        backend: Arc<dyn EmbedBackend>,
        scripts: ScriptLoader,
        options: EmbedPlayerOptions,
        init: EngineInit,
        poll_interval: Duration,
    ) -> Self {
        let inner = Arc::new(Mutex::new(EmbeddedInner {
            player: None,
            listeners: Listeners::default(),
            pending: Pending::default(),
            init,
            initial_applied: false,
            last_time: init.start_time,
            duration: 0.0,
            poller: None,
            poll_interval,
        }));
        let mounted = Arc::new(AtomicBool::new(true));
        let driver = tokio::spawn(drive(
            Arc::downgrade(&inner),
            mounted.clone(),
            backend,
            scripts,
            options,
        ));

        Self {
            inner,
            mounted,
            driver,
        }
    }

    pub fn play(&self) {
        let mut guard = lock(&self.inner);
        let inner = &mut *guard;
        match inner.player.as_mut() {
            Some(player) => player.play_video(),
            None => inner.pending.playing = Some(true),
        }
    }

    pub fn pause(&self) {
        let mut guard = lock(&self.inner);
        let inner = &mut *guard;
        match inner.player.as_mut() {
            Some(player) => player.pause_video(),
            None => inner.pending.playing = Some(false),
        }
    }

    pub fn seek(&self, seconds: f64) {
        let seconds = seconds.max(0.0);
        let mut guard = lock(&self.inner);
        let inner = &mut *guard;
        match inner.player.as_mut() {
            Some(player) => player.seek_to(seconds, true),
            None => inner.pending.seek = Some(seconds),
        }
        inner.last_time = seconds;
    }

    pub fn set_volume(&self, volume: f64) {
        let mut guard = lock(&self.inner);
        let inner = &mut *guard;
        match inner.player.as_mut() {
            Some(player) => player.set_volume(to_platform_volume(volume)),
            None => inner.pending.volume = Some(volume),
        }
    }

    pub fn set_muted(&self, muted: bool) {
        let mut guard = lock(&self.inner);
        let inner = &mut *guard;
        match inner.player.as_mut() {
            Some(player) if muted => player.mute(),
            Some(player) => player.un_mute(),
            None => inner.pending.muted = Some(muted),
        }
    }

    pub fn set_rate(&self, rate: f64) {
        let mut guard = lock(&self.inner);
        let inner = &mut *guard;
        match inner.player.as_mut() {
            Some(player) => player.set_playback_rate(rate),
            None => inner.pending.rate = Some(rate),
        }
    }

    pub fn current_time(&self) -> f64 {
        lock(&self.inner).time()
    }

    pub fn duration(&self) -> f64 {
        let inner = lock(&self.inner);
        inner
            .player
            .as_ref()
            .map(|p| p.duration())
            .filter(|d| *d > 0.0)
            .unwrap_or(inner.duration)
    }

    pub fn is_ready(&self) -> bool {
        lock(&self.inner).player.is_some()
    }

    pub fn subscribe(&self) -> EngineEvents {
        lock(&self.inner).listeners.subscribe()
    }

    pub fn destroy(&self) {
        let was_mounted = self.mounted.swap(false, Ordering::SeqCst);
        let mut inner = lock(&self.inner);
        inner.stop_polling();
        if let Some(mut player) = inner.player.take() {
            player.destroy();
        }
        inner.listeners.clear();
        self.driver.abort();
        if was_mounted {
            debug!("embedded engine destroyed");
        }
    }
}

impl Drop for EmbeddedEngine {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn to_platform_volume(volume: f64) -> u8 {
    (volume.clamp(0.0, 1.0) * 100.0).round() as u8
}

async fn drive(
    inner: Weak<Mutex<EmbeddedInner>>,
    mounted: Arc<AtomicBool>,
    backend: Arc<dyn EmbedBackend>,
    scripts: ScriptLoader,
    options: EmbedPlayerOptions,
) {
    if let Err(e) = scripts.ensure_loaded(backend.as_ref()).await {
        fail(&inner, &mounted, e.to_string());
        return;
    }
    if !mounted.load(Ordering::SeqCst) {
        return;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    if let Err(e) = backend.create_player(options, tx) {
        fail(&inner, &mounted, e.to_string());
        return;
    }

    while let Some(signal) = rx.recv().await {
        let live = inner
            .upgrade()
            .filter(|_| mounted.load(Ordering::SeqCst));
        match (signal, live) {
            (EmbedSignal::Ready(mut player), None) => {
                debug!("ignoring ready callback from a stale embedded player");
                player.destroy();
                break;
            }
            (_, None) => break,
            (EmbedSignal::Ready(player), Some(inner)) => on_ready(&inner, player),
            (EmbedSignal::StateChange(code), Some(inner)) => {
                on_state_change(&inner, &mounted, code)
            }
            (EmbedSignal::Error(code), Some(inner)) => {
                warn!(code, "embedded player error");
                lock(&inner).listeners.emit(EngineEvent::Error {
                    message: format!("embedded player error {}", code),
                });
            }
        }
    }
}

fn fail(inner: &Weak<Mutex<EmbeddedInner>>, mounted: &AtomicBool, message: String) {
    warn!(%message, "embedded player unavailable");
    if !mounted.load(Ordering::SeqCst) {
        return;
    }
    if let Some(inner) = inner.upgrade() {
        lock(&inner).listeners.emit(EngineEvent::Error { message });
    }
}

fn on_ready(inner: &Arc<Mutex<EmbeddedInner>>, player: Box<dyn EmbedPlayer>) {
    let mut guard = lock(inner);
    if guard.player.is_some() {
        return;
    }
    guard.player = Some(player);
    let pending = std::mem::take(&mut guard.pending);
    let init = guard.init;

    if !guard.initial_applied {
        guard.initial_applied = true;
        let target = pending.seek.or(Some(init.start_time).filter(|t| *t > 0.0));
        if let Some(target) = target {
            if let Some(player) = guard.player.as_mut() {
                player.seek_to(target, true);
            }
            guard.last_time = target;
        }
    }

    let autoplay = pending.playing.unwrap_or(init.autoplay);
    if let Some(player) = guard.player.as_mut() {
        if let Some(volume) = pending.volume {
            player.set_volume(to_platform_volume(volume));
        }
        match pending.muted {
            Some(true) => player.mute(),
            Some(false) => player.un_mute(),
            None => {}
        }
        if let Some(rate) = pending.rate {
            player.set_playback_rate(rate);
        }
        if autoplay {
            player.play_video();
        } else {
            player.pause_video();
        }
    }

    guard.refresh_duration();
    let duration = guard.duration;
    guard.listeners.emit(EngineEvent::Ready { duration });
    debug!(duration, "embedded player ready");
}

fn on_state_change(inner: &Arc<Mutex<EmbeddedInner>>, mounted: &Arc<AtomicBool>, code: i32) {
    let mut guard = lock(inner);
    match EmbedStateCode::from_code(code) {
        Some(EmbedStateCode::Playing) => {
            guard.state_changed(EngineState::Playing);
            guard.stop_polling();
            let period = guard.poll_interval;
            guard.poller = Some(tokio::spawn(poll_time(
                Arc::downgrade(inner),
                mounted.clone(),
                period,
            )));
        }
        Some(EmbedStateCode::Paused) => {
            guard.stop_polling();
            guard.state_changed(EngineState::Paused);
        }
        Some(EmbedStateCode::Buffering) => {
            guard.stop_polling();
            guard.state_changed(EngineState::Buffering);
        }
        Some(EmbedStateCode::Ended) => {
            guard.stop_polling();
            guard.state_changed(EngineState::Ended);
        }
        Some(EmbedStateCode::Unstarted | EmbedStateCode::Cued) | None => {}
    }
    guard.refresh_duration();
}

async fn poll_time(inner: Weak<Mutex<EmbeddedInner>>, mounted: Arc<AtomicBool>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    // First tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if !mounted.load(Ordering::SeqCst) {
            break;
        }
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let mut guard = lock(&inner);
        let Some(current_time) = guard.player.as_ref().map(|p| p.current_time()) else {
            break;
        };
        guard.last_time = current_time;
        guard.listeners.emit(EngineEvent::TimeUpdate { current_time });
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use std::sync::atomic::Ordering;

    fn spawn(backend: &Arc<FakeEmbedBackend>, scripts: &ScriptLoader, init: EngineInit) -> EmbeddedEngine {
        EmbeddedEngine::spawn(
            backend.clone(),
            scripts.clone(),
            EmbedPlayerOptions::for_video("abc123", init.autoplay),
            init,
            Duration::from_millis(250),
        )
    }

    #[tokio::test]
    async fn test_controls_before_ready_are_deferred() {
        let backend = Arc::new(FakeEmbedBackend::default());
        let engine = spawn(&backend, &ScriptLoader::new(), EngineInit::default());
        let mut events = engine.subscribe();

        engine.seek(5.0);
        engine.seek(30.0);
        engine.pause();
        engine.set_volume(0.5);
        assert!(!engine.is_ready());
        assert_eq!(engine.current_time(), 30.0);

        settle().await;
        let pending = backend.pending(0);
        assert_eq!(pending.options.container_id, "youtube-player-abc123");
        assert!(pending.ready());
        settle().await;

        let state = pending.state.lock().unwrap();
        assert_eq!(state.seeks, vec![30.0]);
        assert!(!state.playing);
        assert_eq!(state.volume, 50);
        drop(state);
        assert!(engine.is_ready());
        assert_eq!(events.recv().await.unwrap(), EngineEvent::DurationChanged { duration: 300.0 });
        assert_eq!(events.recv().await.unwrap(), EngineEvent::Ready { duration: 300.0 });
    }

    #[tokio::test]
    async fn test_initial_seek_applied_exactly_once() {
        let backend = Arc::new(FakeEmbedBackend::default());
        let engine = spawn(
            &backend,
            &ScriptLoader::new(),
            EngineInit {
                start_time: 12.0,
                autoplay: true,
            },
        );
        settle().await;
        let pending = backend.pending(0);
        pending.ready();
        pending.ready();
        settle().await;

        let state = pending.state.lock().unwrap();
        assert_eq!(state.seeks, vec![12.0]);
        assert!(state.playing);
        drop(state);
        engine.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_runs_only_while_playing() {
        let backend = Arc::new(FakeEmbedBackend::default());
        let engine = spawn(&backend, &ScriptLoader::new(), EngineInit::default());
        let mut events = engine.subscribe();
        settle().await;
        let pending = backend.pending(0);
        pending.ready();
        settle().await;
        while events.try_recv().is_ok() {}

        pending.state.lock().unwrap().time = 7.0;
        pending.state_change(EmbedStateCode::Playing);
        settle().await;
        assert!(matches!(
            events.try_recv().unwrap(),
            EngineEvent::StateChanged { state: EngineState::Playing, .. }
        ));

        tokio::time::advance(Duration::from_millis(260)).await;
        settle().await;
        assert_eq!(events.try_recv().unwrap(), EngineEvent::TimeUpdate { current_time: 7.0 });

        pending.state_change(EmbedStateCode::Paused);
        settle().await;
        assert!(matches!(
            events.try_recv().unwrap(),
            EngineEvent::StateChanged { state: EngineState::Paused, .. }
        ));
        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert!(events.try_recv().is_err(), "no ticks after pause");
        engine.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_stops_polling_and_listeners() {
        let backend = Arc::new(FakeEmbedBackend::default());
        let engine = spawn(&backend, &ScriptLoader::new(), EngineInit::default());
        let mut events = engine.subscribe();
        settle().await;
        let pending = backend.pending(0);
        pending.ready();
        pending.state_change(EmbedStateCode::Playing);
        settle().await;

        engine.destroy();
        engine.destroy();
        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;

        while let Ok(event) = events.try_recv() {
            assert!(!matches!(event, EngineEvent::TimeUpdate { .. }));
        }
        assert!(events.recv().await.is_none());
        assert_eq!(pending.state.lock().unwrap().destroyed, 1);
    }

    #[tokio::test]
    async fn test_stale_ready_after_destroy_is_ignored() {
        let backend = Arc::new(FakeEmbedBackend::default());
        let engine = spawn(
            &backend,
            &ScriptLoader::new(),
            EngineInit {
                start_time: 40.0,
                autoplay: true,
            },
        );
        let mut events = engine.subscribe();
        settle().await;
        let pending = backend.pending(0);

        engine.destroy();
        pending.ready();
        settle().await;

        let state = pending.state.lock().unwrap();
        assert!(state.seeks.is_empty());
        assert!(!state.playing);
        drop(state);
        assert!(!engine.is_ready());
        assert!(events.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_script_inserted_once_for_all_engines() {
        let backend = Arc::new(FakeEmbedBackend::default());
        let scripts = ScriptLoader::new();
        let a = spawn(&backend, &scripts, EngineInit::default());
        let b = spawn(&backend, &scripts, EngineInit::default());
        settle().await;

        assert_eq!(backend.script_loads.load(Ordering::SeqCst), 1);
        assert!(scripts.is_loaded());
        assert_eq!(backend.created_count(), 2);
        a.destroy();
        b.destroy();
    }

    #[tokio::test]
    async fn test_script_failure_reports_error_without_panicking() {
        let backend = Arc::new(FakeEmbedBackend::default());
        backend.fail_script.store(true, Ordering::SeqCst);
        let scripts = ScriptLoader::new();
        let engine = spawn(&backend, &scripts, EngineInit::default());
        let mut events = engine.subscribe();
        settle().await;

        assert!(matches!(events.recv().await.unwrap(), EngineEvent::Error { .. }));
        assert!(!scripts.is_loaded());
        assert_eq!(backend.created_count(), 0);
        engine.play();
        engine.seek(3.0);
        assert!(!engine.is_ready());
    }
}
