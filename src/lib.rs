//! telarr — acquisition state machine and naming engine for a TV-show
//! library.
//!
//! The crate tracks, per show, which episodes exist, what acquisition
//! state each is in (and at what quality), and where the files belong on
//! disk under a user naming pattern. Remote indexers, download clients
//! and the surrounding application are external collaborators reached
//! through the traits in [`metadata`] and [`services::rename`].

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod models;
pub mod naming;
pub mod parser;
pub mod quality;
pub mod services;

pub use config::Config;
pub use db::Store;
pub use error::MediaError;
pub use models::{EpisodeRecord, ShowRecord};
