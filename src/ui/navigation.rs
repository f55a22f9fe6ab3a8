//! Page routing and the session hand-offs between pages
//!
//! The session store outlives every page. Pages only decide which surface is
//! mounted and when the session changes mode:
//!
//! - entering the theater page adopts a floating session for the same video,
//!   or closes one for a different video before starting fresh
//! - leaving the theater page while playing shrinks to the floating surface,
//!   otherwise the session is closed

use std::sync::Arc;

use tracing::{debug, info};

use super::PlayerContext;
use super::floating::FloatingSurface;
use super::slot::{PresentationSlotTracker, SlotElement};
use super::theater::{TheaterSurface, UNAVAILABLE_MESSAGE};
use crate::core::session::{ActiveMode, SessionVideo, StartOutcome};
use crate::types::PlayerMode;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Catalog,
    Theater {
        video_id: String,
    },
    Create,
}

/// The video page: reserved slot, theater surface and notes panel
pub struct TheaterPage {
    video: SessionVideo,
    tracker: PresentationSlotTracker,
    surface: Option<TheaterSurface>,
    outcome: Option<StartOutcome>,
}

impl TheaterPage {
    /// Mount the page and bring the session onto its slot.
    ///
    /// The floating hand-off is decided once, from the session as it was when
    /// the page mounted.
    pub async fn mount(
        ctx: &PlayerContext,
        video: SessionVideo,
        slot: Arc<dyn SlotElement>,
    ) -> Self {
        let session = ctx.store.snapshot();
        let adopting = session.holds(&video.id, &video.src);
        if session.is_loaded() && !adopting {
            debug!(previous = %session.video_id, next = %video.id, "closing session for another video");
            ctx.store.close();
        }

        let start_time = if adopting {
            None
        } else {
            Some(ctx.progress.resume_time(&video.id))
        };

        let mut tracker = PresentationSlotTracker::mount(ctx.store.clone(), &ctx.viewport, slot);
        let outcome = tracker.activate(&video, start_time).await;
        let surface =
            (outcome != Some(StartOutcome::NoSource)).then(|| TheaterSurface::mount(ctx));
        info!(video_id = %video.id, ?outcome, "theater page mounted");

        Self {
            video,
            tracker,
            surface,
            outcome,
        }
    }

    pub fn video(&self) -> &SessionVideo {
        &self.video
    }

    pub fn surface(&self) -> Option<&TheaterSurface> {
        self.surface.as_ref()
    }

    pub fn outcome(&self) -> Option<StartOutcome> {
        self.outcome
    }

    /// Fallback message shown in the slot instead of a player
    pub fn unavailable(&self) -> Option<&'static str> {
        match &self.surface {
            Some(surface) => surface.unavailable(),
            None => Some(UNAVAILABLE_MESSAGE),
        }
    }

    pub fn remeasure(&self) -> bool {
        self.tracker.remeasure()
    }

    /// Unmount, handing a playing session to the floating surface
    pub fn leave(mut self, ctx: &PlayerContext) {
        self.surface.take();
        let session = ctx.store.snapshot();
        if !session.holds(&self.video.id, &self.video.src) {
            return;
        }
        if session.is_playing {
            ctx.store.switch_mode(ActiveMode::Floating, None);
        } else {
            ctx.store.close();
        }
    }
}

/// Top-level app shell: current route, the theater page if shown, and the
/// floating surface whenever the session is floating.
pub struct App {
    ctx: PlayerContext,
    route: Route,
    page: Option<TheaterPage>,
    floating: Option<FloatingSurface>,
}

impl App {
    pub fn new(ctx: PlayerContext) -> Self {
        Self {
            ctx,
            route: Route::Catalog,
            page: None,
            floating: None,
        }
    }

    pub fn context(&self) -> &PlayerContext {
        &self.ctx
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn page(&self) -> Option<&TheaterPage> {
        self.page.as_ref()
    }

    pub fn floating(&self) -> Option<&FloatingSurface> {
        self.floating.as_ref()
    }

    /// Open a video's theater page from anywhere
    pub async fn open_video(&mut self, video: SessionVideo, slot: Arc<dyn SlotElement>) {
        if let Some(page) = self.page.take() {
            page.leave(&self.ctx);
        }
        // The theater surface takes over from here
        self.floating.take();

        self.route = Route::Theater {
            video_id: video.id.clone(),
        };
        self.page = Some(TheaterPage::mount(&self.ctx, video, slot).await);
        self.sync_floating();
    }

    /// Expand the floating player back to its theater page
    pub async fn expand(&mut self, slot: Arc<dyn SlotElement>) -> bool {
        let session = self.ctx.store.snapshot();
        let Some(Route::Theater { .. }) = self.floating.as_ref().and_then(|f| f.expand()) else {
            return false;
        };
        let video = SessionVideo::new(session.video_id, session.video_src, session.video_title);
        self.open_video(video, slot).await;
        true
    }

    /// Leave the current page for a non-theater route
    pub fn navigate(&mut self, route: Route) {
        if matches!(route, Route::Theater { .. }) {
            return;
        }
        if let Some(page) = self.page.take() {
            page.leave(&self.ctx);
        }
        self.route = route;
        self.sync_floating();
    }

    pub fn close_floating(&mut self) {
        if let Some(floating) = self.floating.take() {
            floating.close();
        }
    }

    /// Mount the floating surface exactly while the session is floating
    fn sync_floating(&mut self) {
        let floating = self.ctx.store.mode() == PlayerMode::Floating;
        match (floating, self.floating.is_some()) {
            (true, false) => self.floating = Some(FloatingSurface::mount(&self.ctx)),
            (false, true) => self.floating = None,
            _ => {}
        }
    }
}
