//! Host window event target
//!
//! Surfaces register listeners here the way page components register DOM
//! listeners on `window`/`document`. Every registration returns a guard that
//! removes the listener when dropped, so unmounting a surface cannot leak one.

use std::sync::{Arc, Mutex, MutexGuard};

/// Keys the player surfaces react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Space,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Escape,
    Other,
}

/// A key press with its focus context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    /// Focus is in an input or textarea; shortcuts must not fire
    pub in_text_field: bool,
}

impl KeyPress {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            in_text_field: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportEvent {
    Resize { width: f64, height: f64 },
    /// `bubbles` is false for scrolls inside nested scroll containers, which
    /// only capture-phase listeners observe at the window level
    Scroll { bubbles: bool },
    /// An observed element changed size
    ElementResize,
    KeyDown(KeyPress),
    PointerMove { x: f64, y: f64 },
    PointerUp { x: f64, y: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Resize,
    Scroll,
    ElementResize,
    KeyDown,
    PointerMove,
    PointerUp,
}

impl ViewportEvent {
    pub fn kind(&self) -> ListenerKind {
        match self {
            Self::Resize { .. } => ListenerKind::Resize,
            Self::Scroll { .. } => ListenerKind::Scroll,
            Self::ElementResize => ListenerKind::ElementResize,
            Self::KeyDown(_) => ListenerKind::KeyDown,
            Self::PointerMove { .. } => ListenerKind::PointerMove,
            Self::PointerUp { .. } => ListenerKind::PointerUp,
        }
    }
}

type Callback = Arc<dyn Fn(&ViewportEvent) + Send + Sync>;

struct Registered {
    id: u64,
    kind: ListenerKind,
    capture: bool,
    callback: Callback,
}

struct ViewportInner {
    width: f64,
    height: f64,
    next_id: u64,
    listeners: Vec<Registered>,
}

/// Shared handle to the host window
#[derive(Clone)]
pub struct Viewport {
    inner: Arc<Mutex<ViewportInner>>,
}

impl std::fmt::Debug for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Viewport")
            .field("width", &inner.width)
            .field("height", &inner.height)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ViewportInner {
                width,
                height,
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ViewportInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn size(&self) -> (f64, f64) {
        let inner = self.lock();
        (inner.width, inner.height)
    }

    pub fn listen(
        &self,
        kind: ListenerKind,
        capture: bool,
        callback: impl Fn(&ViewportEvent) + Send + Sync + 'static,
    ) -> ListenerGuard {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push(Registered {
            id,
            kind,
            capture,
            callback: Arc::new(callback),
        });
        ListenerGuard {
            viewport: self.clone(),
            id,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn listeners_of(&self, kind: ListenerKind) -> usize {
        self.lock().listeners.iter().filter(|l| l.kind == kind).count()
    }

    /// Deliver an event. Callbacks run without the registry locked, so they
    /// may add or remove listeners.
    pub fn dispatch(&self, event: ViewportEvent) {
        let callbacks: Vec<Callback> = {
            let mut inner = self.lock();
            if let ViewportEvent::Resize { width, height } = event {
                inner.width = width;
                inner.height = height;
            }
            let kind = event.kind();
            inner
                .listeners
                .iter()
                .filter(|l| l.kind == kind)
                .filter(|l| match event {
                    ViewportEvent::Scroll { bubbles: false } => l.capture,
                    _ => true,
                })
                .map(|l| l.callback.clone())
                .collect()
        };
        for callback in callbacks {
            callback(&event);
        }
    }

    fn remove(&self, id: u64) {
        self.lock().listeners.retain(|l| l.id != id);
    }
}

/// Removes its listener on drop
#[must_use = "dropping the guard removes the listener"]
pub struct ListenerGuard {
    viewport: Viewport,
    id: u64,
}

impl std::fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerGuard").field("id", &self.id).finish()
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.viewport.remove(self.id);
    }
}
