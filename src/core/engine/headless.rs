//! Clock-driven backends for running sessions without a display
//!
//! Both backends pretend to play a video of a fixed length in real time.
//! The CLI uses them to drive a session from the terminal.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

use super::embedded::{
    EmbedBackend, EmbedPlayer, EmbedPlayerOptions, EmbedSignal, EmbedStateCode, ScriptFuture,
};
use super::native::{MediaElement, MediaElementProvider, MediaEvent};
use crate::error::Result;

const TICK: Duration = Duration::from_millis(250);

/// Wall-clock playback position
#[derive(Debug)]
struct Clock {
    started: Option<Instant>,
    offset: f64,
    rate: f64,
    duration: f64,
}

impl Clock {
    fn new(duration: f64) -> Self {
        Self {
            started: None,
            offset: 0.0,
            rate: 1.0,
            duration,
        }
    }

    fn time(&self) -> f64 {
        let elapsed = self
            .started
            .map_or(0.0, |s| s.elapsed().as_secs_f64() * self.rate);
        (self.offset + elapsed).min(self.duration)
    }

    fn playing(&self) -> bool {
        self.started.is_some()
    }

    fn play(&mut self) -> bool {
        if self.playing() {
            return false;
        }
        if self.time() >= self.duration {
            self.offset = 0.0;
        }
        self.started = Some(Instant::now());
        true
    }

    fn pause(&mut self) -> bool {
        if !self.playing() {
            return false;
        }
        self.offset = self.time();
        self.started = None;
        true
    }

    fn seek(&mut self, seconds: f64) {
        self.offset = seconds.clamp(0.0, self.duration);
        if self.playing() {
            self.started = Some(Instant::now());
        }
    }

    fn set_rate(&mut self, rate: f64) {
        self.offset = self.time();
        if self.playing() {
            self.started = Some(Instant::now());
        }
        self.rate = rate;
    }

    /// Stops the clock at the end. Returns whether it just ended.
    fn check_end(&mut self) -> bool {
        if self.playing() && self.time() >= self.duration {
            self.offset = self.duration;
            self.started = None;
            return true;
        }
        false
    }
}

type SharedClock = Arc<Mutex<Clock>>;

fn lock(clock: &SharedClock) -> MutexGuard<'_, Clock> {
    clock.lock().unwrap_or_else(|p| p.into_inner())
}

/// Media elements of a fixed length
#[derive(Debug, Clone)]
pub struct HeadlessMedia {
    duration: f64,
}

impl HeadlessMedia {
    pub fn new(duration: f64) -> Self {
        Self { duration }
    }
}

struct HeadlessElement {
    clock: SharedClock,
    events: UnboundedSender<MediaEvent>,
}

impl MediaElementProvider for HeadlessMedia {
    fn open(&self, _url: &str, events: UnboundedSender<MediaEvent>) -> Result<Box<dyn MediaElement>> {
        let clock = Arc::new(Mutex::new(Clock::new(self.duration)));
        let _ = events.send(MediaEvent::LoadedMetadata);
        let _ = events.send(MediaEvent::CanPlay);

        let ticker_clock = clock.clone();
        let ticker_events = events.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(TICK);
            loop {
                tick.tick().await;
                let (playing, ended) = {
                    let mut clock = lock(&ticker_clock);
                    let ended = clock.check_end();
                    (clock.playing(), ended)
                };
                let event = if ended {
                    MediaEvent::Ended
                } else if playing {
                    MediaEvent::TimeUpdate
                } else {
                    continue;
                };
                if ticker_events.send(event).is_err() {
                    break;
                }
            }
        });

        Ok(Box::new(HeadlessElement { clock, events }))
    }
}

impl MediaElement for HeadlessElement {
    fn play(&mut self) {
        if lock(&self.clock).play() {
            let _ = self.events.send(MediaEvent::Play);
        }
    }

    fn pause(&mut self) {
        if lock(&self.clock).pause() {
            let _ = self.events.send(MediaEvent::Pause);
        }
    }

    fn set_current_time(&mut self, seconds: f64) {
        lock(&self.clock).seek(seconds);
        let _ = self.events.send(MediaEvent::TimeUpdate);
    }

    fn current_time(&self) -> f64 {
        lock(&self.clock).time()
    }

    fn duration(&self) -> f64 {
        lock(&self.clock).duration
    }

    fn set_volume(&mut self, _volume: f64) {}

    fn set_muted(&mut self, _muted: bool) {}

    fn set_playback_rate(&mut self, rate: f64) {
        lock(&self.clock).set_rate(rate);
    }

    fn is_paused(&self) -> bool {
        !lock(&self.clock).playing()
    }
}

/// Embedded players of a fixed length; the script "loads" instantly
#[derive(Debug, Clone)]
pub struct HeadlessEmbeds {
    duration: f64,
}

impl HeadlessEmbeds {
    pub fn new(duration: f64) -> Self {
        Self { duration }
    }
}

struct HeadlessEmbedPlayer {
    clock: SharedClock,
    signals: UnboundedSender<EmbedSignal>,
}

impl HeadlessEmbedPlayer {
    fn signal(&self, code: EmbedStateCode) {
        let _ = self.signals.send(EmbedSignal::StateChange(code as i32));
    }
}

impl EmbedBackend for HeadlessEmbeds {
    fn load_script(&self) -> ScriptFuture {
        Box::pin(async { Ok(()) })
    }

    fn create_player(
        &self,
        _options: EmbedPlayerOptions,
        signals: UnboundedSender<EmbedSignal>,
    ) -> Result<()> {
        let clock = Arc::new(Mutex::new(Clock::new(self.duration)));
        let player = HeadlessEmbedPlayer {
            clock: clock.clone(),
            signals: signals.clone(),
        };
        let _ = signals.send(EmbedSignal::Ready(Box::new(player)));

        tokio::spawn(async move {
            let mut tick = tokio::time::interval(TICK);
            loop {
                tick.tick().await;
                if signals.is_closed() {
                    break;
                }
                if lock(&clock).check_end() {
                    let _ = signals.send(EmbedSignal::StateChange(EmbedStateCode::Ended as i32));
                }
            }
        });
        Ok(())
    }
}

impl EmbedPlayer for HeadlessEmbedPlayer {
    fn play_video(&mut self) {
        if lock(&self.clock).play() {
            self.signal(EmbedStateCode::Playing);
        }
    }

    fn pause_video(&mut self) {
        if lock(&self.clock).pause() {
            self.signal(EmbedStateCode::Paused);
        }
    }

    fn seek_to(&mut self, seconds: f64, _allow_seek_ahead: bool) {
        lock(&self.clock).seek(seconds);
    }

    fn set_volume(&mut self, _volume: u8) {}

    fn mute(&mut self) {}

    fn un_mute(&mut self) {}

    fn set_playback_rate(&mut self, rate: f64) {
        lock(&self.clock).set_rate(rate);
    }

    fn current_time(&self) -> f64 {
        lock(&self.clock).time()
    }

    fn duration(&self) -> f64 {
        lock(&self.clock).duration
    }

    fn destroy(&mut self) {
        lock(&self.clock).pause();
    }
}
