//! vidlearn library
//!
//! Video catalog client, local notes and progress, and the persistent
//! cross-page player session.

pub mod core;
pub mod error;
pub mod storage;
pub mod types;
pub mod ui;
pub mod utils;
