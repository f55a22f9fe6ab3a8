//! Presentation layer: viewport events, player surfaces, routing and menus

pub mod density;
pub mod floating;
pub mod navigation;
pub mod selector;
pub mod slot;
pub mod theater;
pub mod transport;
pub mod viewport;

use crate::core::engine::EngineFactory;
use crate::core::session::PlaybackSessionStore;
use crate::storage::notes::NotesStore;
use crate::storage::progress::ProgressStore;
use transport::ControlSettings;
use viewport::Viewport;

/// Everything a page or surface needs, shared across the app
#[derive(Clone)]
pub struct PlayerContext {
    pub store: PlaybackSessionStore,
    pub engines: EngineFactory,
    pub viewport: Viewport,
    pub progress: ProgressStore,
    pub notes: NotesStore,
    pub controls: ControlSettings,
}
