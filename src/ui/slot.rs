//! Theater slot tracking
//!
//! The theater page reserves an area for the player. The tracker keeps the
//! session informed of where that area is on screen so the surface can move
//! onto it when returning from floating mode without rebuilding the engine.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::viewport::{ListenerGuard, ListenerKind, Viewport};
use crate::core::session::{ActiveMode, PlaybackSessionStore, SessionVideo, StartOutcome};
use crate::types::Rect;

/// One display frame
pub const FRAME: Duration = Duration::from_millis(16);

/// The reserved page element
pub trait SlotElement: Send + Sync {
    fn bounding_rect(&self) -> Rect;
}

/// Publishes the theater slot rectangle while the theater page is mounted
pub struct PresentationSlotTracker {
    store: PlaybackSessionStore,
    element: Arc<dyn SlotElement>,
    listeners: Vec<ListenerGuard>,
    activated: bool,
}

fn publish(store: &PlaybackSessionStore, element: &dyn SlotElement) -> bool {
    let rect = element.bounding_rect();
    if rect.is_usable() {
        store.set_slot_rect(Some(rect));
        true
    } else {
        false
    }
}

impl PresentationSlotTracker {
    /// Measure once synchronously, then follow resize, scroll and reflow
    pub fn mount(
        store: PlaybackSessionStore,
        viewport: &Viewport,
        element: Arc<dyn SlotElement>,
    ) -> Self {
        publish(&store, element.as_ref());

        let listeners = [
            (ListenerKind::Resize, false),
            // Capture phase: nested scroll containers do not bubble
            (ListenerKind::Scroll, true),
            (ListenerKind::ElementResize, false),
        ]
        .into_iter()
        .map(|(kind, capture)| {
            let store = store.clone();
            let element = element.clone();
            viewport.listen(kind, capture, move |_| {
                publish(&store, element.as_ref());
            })
        })
        .collect();

        Self {
            store,
            element,
            listeners,
            activated: false,
        }
    }

    pub fn remeasure(&self) -> bool {
        publish(&self.store, self.element.as_ref())
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    /// Put the session into theater mode on this page's slot.
    ///
    /// Waits frame by frame until the slot has a non-zero size. Runs once per
    /// mount; later calls return `None`.
    pub async fn activate(
        &mut self,
        video: &SessionVideo,
        start_time: Option<f64>,
    ) -> Option<StartOutcome> {
        if self.activated {
            return None;
        }

        let rect = loop {
            let rect = self.element.bounding_rect();
            if rect.is_usable() {
                break rect;
            }
            tokio::time::sleep(FRAME).await;
        };
        self.activated = true;

        if self.store.snapshot().holds(&video.id, &video.src) {
            self.store.switch_mode(ActiveMode::Theater, Some(rect));
            debug!(video_id = %video.id, "theater slot adopted running session");
            Some(StartOutcome::ModeSwitch)
        } else {
            Some(
                self.store
                    .start_or_resume(video, ActiveMode::Theater, start_time, Some(rect)),
            )
        }
    }
}

impl Drop for PresentationSlotTracker {
    fn drop(&mut self) {
        self.listeners.clear();
        self.store.set_slot_rect(None);
    }
}
