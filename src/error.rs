//! Error taxonomy shared across the crate.

use thiserror::Error;

/// Errors surfaced by record lifecycle and collaborator operations.
///
/// The decision and naming engines are pure and never return these;
/// everything here originates at a persistence, metadata or filesystem
/// boundary.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Show or episode absent in persistence or on the indexer.
    /// Recoverable; callers log and skip.
    #[error("{0} not found")]
    NotFound(String),

    /// Control signal, not a failure: the record was deleted and every
    /// in-flight reference to it must be discarded.
    #[error("episode no longer exists, discard this reference")]
    EpisodeDeleted,

    /// Unparseable air date or metadata source. The affected load fails;
    /// the bad source is preserved, never silently dropped.
    #[error("malformed data: {0}")]
    MalformedData(String),

    /// More than one persisted row for the same identity. Fatal for the
    /// show; never auto-resolved.
    #[error("ambiguous state: multiple rows for {0}")]
    AmbiguousState(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn malformed(what: impl Into<String>) -> Self {
        Self::MalformedData(what.into())
    }

    /// Whether the error is the deletion control signal rather than a
    /// real failure.
    pub const fn is_deleted(&self) -> bool {
        matches!(self, Self::EpisodeDeleted)
    }
}
