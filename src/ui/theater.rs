//! Theater surface: the full-size player on the video page

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::PlayerContext;
use super::density::{self, NoteDensity};
use super::transport::{Transport, follow_playback};
use super::viewport::{ListenerGuard, ListenerKind, ViewportEvent};
use crate::core::session::{EngineStatus, PlaybackSession};
use crate::types::{PlayerMode, VideoNote};

pub const UNAVAILABLE_MESSAGE: &str = "This video can't be played right now.";

/// Drives the shared engine while the session is in theater mode.
///
/// Owns the keyboard shortcuts and the progress follower. Both go away when
/// the surface is dropped; the engine does not.
pub struct TheaterSurface {
    video_id: String,
    transport: Transport,
    ctx: PlayerContext,
    _keys: ListenerGuard,
    follower: Option<JoinHandle<()>>,
}

impl TheaterSurface {
    pub fn mount(ctx: &PlayerContext) -> Self {
        let session = ctx.store.snapshot();
        if let Err(e) = ctx.store.ensure_engine(&ctx.engines) {
            warn!(video_id = %session.video_id, error = %e, "theater has no engine");
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

        let keys = {
            let transport = transport.clone();
            ctx.viewport.listen(ListenerKind::KeyDown, false, move |event| {
                if let ViewportEvent::KeyDown(press) = event {
                    transport.handle_key(*press);
                }
            })
        };
        debug!(video_id = %session.video_id, "theater surface mounted");

        Self {
            video_id: session.video_id,
            transport,
            ctx: ctx.clone(),
            _keys: keys,
            follower,
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn session(&self) -> PlaybackSession {
        self.ctx.store.snapshot()
    }

    /// Whether this surface is the one the session is showing
    pub fn is_active(&self) -> bool {
        self.ctx.store.mode() == PlayerMode::Theater
    }

    /// Fallback message in place of the player when the engine is gone
    pub fn unavailable(&self) -> Option<&'static str> {
        matches!(self.ctx.store.engine_status(), EngineStatus::Unavailable(_))
            .then_some(UNAVAILABLE_MESSAGE)
    }

    pub fn notes(&self) -> Vec<VideoNote> {
        self.ctx.notes.notes(&self.video_id)
    }

    /// Note density curve for the scrub bar
    pub fn density(&self) -> NoteDensity {
        NoteDensity::compute(&self.notes(), self.transport.duration())
    }

    /// Played note ranges to highlight on the scrub bar
    pub fn highlights(&self) -> Vec<(f64, f64)> {
        density::highlight_zones(
            &self.notes(),
            self.transport.duration(),
            self.transport.progress_pct(),
        )
    }

    /// Jump to a note's timestamp
    pub fn seek_to_note(&self, note: &VideoNote) {
        self.ctx.store.seek(note.timestamp);
    }
}

impl Drop for TheaterSurface {
    fn drop(&mut self) {
        if let Some(follower) = self.follower.take() {
            follower.abort();
        }
    }
}
