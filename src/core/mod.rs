//! Playback core: URL classification, engines, the session store and the
//! backend client

pub mod api;
pub mod engine;
pub mod session;
pub mod source;
