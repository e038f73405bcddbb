//! Metadata/indexer collaborator boundary.
//!
//! The core never talks to a remote indexer itself; it consumes episode
//! and show fields through this trait. Air dates arrive as ISO
//! `YYYY-MM-DD` strings or a sentinel meaning unknown; a malformed date
//! is a fatal parse condition for that load.

use crate::error::MediaError;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Show-level fields as the indexer reports them.
#[derive(Debug, Clone, Default)]
pub struct ShowMetadata {
    pub name: String,
    /// "Continuing", "Ended", or empty when unknown.
    pub status: String,
    pub air_by_date: bool,
}

/// Episode-level fields as the indexer reports them.
#[derive(Debug, Clone, Default)]
pub struct EpisodeMetadata {
    pub title: Option<String>,
    pub overview: Option<String>,
    /// ISO `YYYY-MM-DD`; `None` or `0000-00-00` mean unknown.
    pub first_aired: Option<String>,
}

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn show(&self, show_id: i64) -> Result<Option<ShowMetadata>, MediaError>;

    /// `Ok(None)` means the indexer no longer lists the episode; the
    /// caller deletes the local record in response.
    async fn episode(
        &self,
        show_id: i64,
        season: i32,
        episode: i32,
    ) -> Result<Option<EpisodeMetadata>, MediaError>;

    /// Resolves an air date to indexer `(season, episode)` numbering for
    /// air-by-date shows.
    async fn episode_by_airdate(
        &self,
        show_id: i64,
        date: NaiveDate,
    ) -> Result<Option<(i32, i32)>, MediaError>;
}

/// The sentinel date standing in for "air date unknown".
#[must_use]
pub fn unknown_airdate() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).expect("valid sentinel date")
}

/// Parses an indexer air date, mapping the unknown sentinels to
/// [`unknown_airdate`] and anything unparseable to `MalformedData`.
pub fn parse_airdate(raw: Option<&str>) -> Result<NaiveDate, MediaError> {
    match raw {
        None | Some("" | "0000-00-00") => Ok(unknown_airdate()),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| MediaError::malformed(format!("air date {s:?}"))),
    }
}
