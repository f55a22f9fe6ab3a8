//! Storage modules: config, catalog cache, notes and progress

pub mod cache;
pub mod config;
pub mod kv;
pub mod notes;
pub mod progress;
