//! Core library for mikazuki, an episodic release tracker.
//!
//! The pipeline runs feed ingestion, title parsing and series matching,
//! torrent identity resolution, and download dispatch; the program module
//! sequences startup and drives the poll loop.

pub mod config;
pub mod downloader;
pub mod feed;
pub mod identity;
pub mod parser;
pub mod program;
pub mod search;
pub mod store;
pub mod testing;

pub use config::{load_config, load_config_from_str, Config, ConfigError, SanitizedConfig};
pub use program::{Context, LifecycleOrchestrator, LifecycleState};
