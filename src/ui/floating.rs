//! Floating surface: the small draggable player shown off the video page

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::PlayerContext;
use super::navigation::Route;
use super::theater::UNAVAILABLE_MESSAGE;
use super::transport::{Transport, follow_playback};
use super::viewport::{ListenerGuard, ListenerKind, Viewport, ViewportEvent};
use crate::core::session::{EngineStatus, PlaybackSession};

pub const FLOATING_WIDTH: f64 = 320.0;
pub const FLOATING_HEIGHT: f64 = 180.0;
pub const FLOATING_MARGIN: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Bottom-right corner with a margin
    pub fn default_for(viewport: (f64, f64)) -> Self {
        clamp_to(
            viewport,
            viewport.0 - FLOATING_WIDTH - FLOATING_MARGIN,
            viewport.1 - FLOATING_HEIGHT - FLOATING_MARGIN,
        )
    }
}

/// Keep the whole window inside the viewport
fn clamp_to((width, height): (f64, f64), x: f64, y: f64) -> Position {
    Position {
        x: x.clamp(0.0, (width - FLOATING_WIDTH).max(0.0)),
        y: y.clamp(0.0, (height - FLOATING_HEIGHT).max(0.0)),
    }
}

type DragGuards = Arc<Mutex<Option<[ListenerGuard; 2]>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

pub struct FloatingSurface {
    ctx: PlayerContext,
    transport: Transport,
    position: Arc<Mutex<Position>>,
    drag: DragGuards,
    follower: Option<JoinHandle<()>>,
}

impl FloatingSurface {
    pub fn mount(ctx: &PlayerContext) -> Self {
        let session = ctx.store.snapshot();
        if let Err(e) = ctx.store.ensure_engine(&ctx.engines) {
            warn!(video_id = %session.video_id, error = %e, "floating player has no engine");
        }

        let transport = Transport::new(ctx.store.clone(), ctx.controls);
        let follower = ctx.store.subscribe_engine().map(|events| {
            follow_playback(
                events,
                transport.clone(),
                ctx.progress.clone(),
                session.video_id.clone(),
            )
        });
        debug!(video_id = %session.video_id, "floating surface mounted");

        Self {
            position: Arc::new(Mutex::new(Position::default_for(ctx.viewport.size()))),
            ctx: ctx.clone(),
            transport,
            drag: Arc::default(),
            follower,
        }
    }

    pub fn session(&self) -> PlaybackSession {
        self.ctx.store.snapshot()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn position(&self) -> Position {
        *lock(&self.position)
    }

    pub fn is_dragging(&self) -> bool {
        lock(&self.drag).is_some()
    }

    pub fn unavailable(&self) -> Option<&'static str> {
        matches!(self.ctx.store.engine_status(), EngineStatus::Unavailable(_))
            .then_some(UNAVAILABLE_MESSAGE)
    }

    /// Start dragging from a pointer press on the title bar.
    ///
    /// Pointer listeners exist only until the matching pointer up.
    pub fn begin_drag(&self, pointer_x: f64, pointer_y: f64) {
        let mut drag = lock(&self.drag);
        if drag.is_some() {
            return;
        }
        let start = *lock(&self.position);
        let offset = (pointer_x - start.x, pointer_y - start.y);

        let on_move = {
            let position = self.position.clone();
            let viewport = self.ctx.viewport.clone();
            self.ctx
                .viewport
                .listen(ListenerKind::PointerMove, false, move |event| {
                    if let ViewportEvent::PointerMove { x, y } = event {
                        move_to(&position, &viewport, x - offset.0, y - offset.1);
                    }
                })
        };
        let on_up = {
            let guards = Arc::downgrade(&self.drag);
            self.ctx
                .viewport
                .listen(ListenerKind::PointerUp, false, move |_| {
                    if let Some(guards) = guards.upgrade() {
                        // Drop outside the lock: removal touches the viewport
                        let ended = lock(&guards).take();
                        drop(ended);
                    }
                })
        };
        *drag = Some([on_move, on_up]);
    }

    /// Navigation intent back to the theater page. The session is untouched;
    /// the page switches modes once its slot is measured.
    pub fn expand(&self) -> Option<Route> {
        let session = self.ctx.store.snapshot();
        session.is_loaded().then(|| Route::Theater {
            video_id: session.video_id,
        })
    }

    pub fn close(&self) {
        self.ctx.store.close();
    }
}

fn move_to(position: &Mutex<Position>, viewport: &Viewport, x: f64, y: f64) {
    *lock(position) = clamp_to(viewport.size(), x, y);
}

impl Drop for FloatingSurface {
    fn drop(&mut self) {
        let drag = lock(&self.drag).take();
        drop(drag);
        if let Some(follower) = self.follower.take() {
            follower.abort();
        }
    }
}
