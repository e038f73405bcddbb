//! The mutable per-episode entity.
//!
//! Every mutator funnels through one set-if-changed path that flips the
//! `dirty` flag exactly when a value actually changed; saves are skipped
//! while the record is clean. The owning show wraps each record in its
//! own lock — any read-then-write sequence that must be atomic holds
//! that lock for the whole sequence.

use crate::db::Store;
use crate::entities::tv_episode;
use crate::error::MediaError;
use crate::metadata::{self, EpisodeMetadata, unknown_airdate};
use crate::naming::NamingView;
use crate::quality::{self, Quality, Status};
use chrono::NaiveDate;
use std::path::Path;
use tracing::debug;

/// `(season, episode)` — the key of a record inside its owning show.
pub type EpisodeKey = (i32, i32);

/// What an indexer refresh did to the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated,
    /// The indexer no longer lists the episode; the record must be
    /// deleted and every reference to it discarded.
    Gone,
}

#[derive(Debug, Clone)]
pub struct EpisodeRecord {
    show_id: i64,
    season: i32,
    episode: i32,
    name: String,
    description: String,
    airdate: NaiveDate,
    /// Composite status; see [`crate::quality::composite`].
    status: i64,
    location: String,
    file_size: i64,
    release_name: String,
    is_proper: bool,
    subtitles: Vec<String>,
    subtitles_searchcount: i32,
    subtitles_lastsearch: String,
    /// Keys of sibling episodes living in the same file. Non-owning;
    /// the show's map owns every record.
    related: Vec<EpisodeKey>,
    dirty: bool,
}

/// The one place a field assignment may flip the dirty flag.
fn assign<T: PartialEq>(field: &mut T, value: T, dirty: &mut bool) {
    if *field != value {
        *field = value;
        *dirty = true;
    }
}

impl EpisodeRecord {
    #[must_use]
    pub fn new(show_id: i64, season: i32, episode: i32) -> Self {
        Self {
            show_id,
            season,
            episode,
            name: String::new(),
            description: String::new(),
            airdate: unknown_airdate(),
            status: quality::encode(Status::Unknown, Quality::Unknown),
            location: String::new(),
            file_size: 0,
            release_name: String::new(),
            is_proper: false,
            subtitles: Vec::new(),
            subtitles_searchcount: 0,
            subtitles_lastsearch: String::new(),
            related: Vec::new(),
            // a brand-new record has never been saved
            dirty: true,
        }
    }

    pub const fn show_id(&self) -> i64 {
        self.show_id
    }

    pub const fn season(&self) -> i32 {
        self.season
    }

    pub const fn episode(&self) -> i32 {
        self.episode
    }

    pub const fn key(&self) -> EpisodeKey {
        (self.season, self.episode)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub const fn airdate(&self) -> NaiveDate {
        self.airdate
    }

    pub fn has_airdate(&self) -> bool {
        self.airdate != unknown_airdate()
    }

    pub const fn status(&self) -> i64 {
        self.status
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn has_file(&self) -> bool {
        !self.location.is_empty()
    }

    pub const fn file_size(&self) -> i64 {
        self.file_size
    }

    pub fn release_name(&self) -> &str {
        &self.release_name
    }

    pub const fn is_proper(&self) -> bool {
        self.is_proper
    }

    pub fn subtitles(&self) -> &[String] {
        &self.subtitles
    }

    pub const fn subtitles_searchcount(&self) -> i32 {
        self.subtitles_searchcount
    }

    pub fn subtitles_lastsearch(&self) -> &str {
        &self.subtitles_lastsearch
    }

    pub fn related(&self) -> &[EpisodeKey] {
        &self.related
    }

    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_name(&mut self, value: impl Into<String>) {
        assign(&mut self.name, value.into(), &mut self.dirty);
    }

    pub fn set_description(&mut self, value: impl Into<String>) {
        assign(&mut self.description, value.into(), &mut self.dirty);
    }

    pub fn set_airdate(&mut self, value: NaiveDate) {
        assign(&mut self.airdate, value, &mut self.dirty);
    }

    pub fn set_status(&mut self, value: i64) {
        assign(&mut self.status, value, &mut self.dirty);
    }

    /// Changing the location re-reads the file size from disk; a missing
    /// or empty location zeroes it.
    pub fn set_location(&mut self, value: impl Into<String>) {
        let value = value.into();
        let size = if value.is_empty() {
            0
        } else {
            std::fs::metadata(&value).map_or(0, |m| i64::try_from(m.len()).unwrap_or(0))
        };
        assign(&mut self.location, value, &mut self.dirty);
        assign(&mut self.file_size, size, &mut self.dirty);
    }

    pub fn set_release_name(&mut self, value: impl Into<String>) {
        assign(&mut self.release_name, value.into(), &mut self.dirty);
    }

    pub fn set_is_proper(&mut self, value: bool) {
        assign(&mut self.is_proper, value, &mut self.dirty);
    }

    pub fn set_subtitles(&mut self, value: Vec<String>) {
        assign(&mut self.subtitles, value, &mut self.dirty);
    }

    pub fn set_subtitles_searchcount(&mut self, value: i32) {
        assign(&mut self.subtitles_searchcount, value, &mut self.dirty);
    }

    pub fn set_subtitles_lastsearch(&mut self, value: impl Into<String>) {
        assign(&mut self.subtitles_lastsearch, value.into(), &mut self.dirty);
    }

    pub fn set_related(&mut self, mut keys: Vec<EpisodeKey>) {
        keys.sort_unstable();
        keys.dedup();
        // related keys are in-memory wiring, not a persisted column
        self.related = keys;
    }

    pub fn add_related(&mut self, key: EpisodeKey) {
        if key != self.key() && !self.related.contains(&key) {
            self.related.push(key);
            self.related.sort_unstable();
        }
    }

    /// Copies a persisted row into the record. The record is clean
    /// afterwards.
    pub fn apply_row(&mut self, row: &tv_episode::Model) -> Result<(), MediaError> {
        self.name = row.name.clone();
        self.description = row.description.clone();
        self.airdate = metadata::parse_airdate(Some(row.airdate.as_str()))?;
        self.status = row.status;
        self.location = row.location.clone();
        self.file_size = row.file_size;
        self.release_name = row.release_name.clone();
        self.is_proper = row.is_proper;
        self.subtitles = if row.subtitles.is_empty() {
            Vec::new()
        } else {
            row.subtitles.split(',').map(str::to_string).collect()
        };
        self.subtitles_searchcount = row.subtitles_searchcount;
        self.subtitles_lastsearch = row.subtitles_lastsearch.clone();
        self.dirty = false;
        Ok(())
    }

    #[must_use]
    pub fn to_row(&self) -> tv_episode::Model {
        tv_episode::Model {
            id: 0,
            show_id: self.show_id,
            season: self.season,
            episode: self.episode,
            name: self.name.clone(),
            description: self.description.clone(),
            airdate: self.airdate.format("%Y-%m-%d").to_string(),
            status: self.status,
            location: self.location.clone(),
            file_size: self.file_size,
            release_name: self.release_name.clone(),
            is_proper: self.is_proper,
            subtitles: self.subtitles.join(","),
            subtitles_searchcount: self.subtitles_searchcount,
            subtitles_lastsearch: self.subtitles_lastsearch.clone(),
        }
    }

    /// Loads the record from persistence. `Ok(false)` means no row
    /// exists for this identity.
    pub async fn load(&mut self, store: &Store) -> Result<bool, MediaError> {
        let Some(row) = store
            .get_episode_row(self.show_id, self.season, self.episode)
            .await?
        else {
            debug!(
                show_id = self.show_id,
                season = self.season,
                episode = self.episode,
                "episode not in the database"
            );
            return Ok(false);
        };
        self.apply_row(&row)?;
        Ok(true)
    }

    /// Saves the record if anything changed since the last load/save,
    /// or unconditionally when `force` is set.
    pub async fn save(&mut self, store: &Store, force: bool) -> Result<(), MediaError> {
        if !self.dirty && !force {
            debug!(
                show_id = self.show_id,
                season = self.season,
                episode = self.episode,
                "not saving episode, record is not dirty"
            );
            return Ok(());
        }
        store.upsert_episode_row(self.to_row()).await?;
        self.dirty = false;
        Ok(())
    }

    /// Applies indexer metadata and recomputes the status. Pure apart
    /// from a file-existence check on the current location.
    pub fn apply_indexer_data(
        &mut self,
        meta: &EpisodeMetadata,
        today: NaiveDate,
    ) -> Result<RefreshOutcome, MediaError> {
        let Some(title) = meta.title.as_deref().filter(|t| !t.is_empty()) else {
            debug!(
                season = self.season,
                episode = self.episode,
                "episode has no name on the indexer"
            );
            return Ok(RefreshOutcome::Gone);
        };

        let airdate = metadata::parse_airdate(meta.first_aired.as_deref())?;

        self.set_name(title);
        self.set_description(meta.overview.clone().unwrap_or_default());
        self.set_airdate(airdate);

        self.recompute_status(today);
        Ok(RefreshOutcome::Updated)
    }

    /// Status transitions driven by the air date and the on-disk file.
    fn recompute_status(&mut self, today: NaiveDate) {
        let (status, _) = quality::decode(self.status);
        let file_exists = !self.location.is_empty() && Path::new(&self.location).is_file();

        if !file_exists {
            if self.airdate >= today && !status.is_snatched() {
                // hasn't aired yet
                self.set_status(quality::encode(Status::Unaired, Quality::Unknown));
            } else if !self.has_airdate() {
                if status == Status::Ignored {
                    debug!("episode has no air date but is already ignored");
                } else {
                    self.set_status(quality::encode(Status::Skipped, Quality::Unknown));
                }
            } else if status == Status::Unaired {
                self.set_status(quality::encode(Status::Wanted, Quality::Unknown));
            } else if status == Status::Unknown {
                self.set_status(quality::encode(Status::Skipped, Quality::Unknown));
            } else {
                debug!(status = %status, "aired without a file, leaving status alone");
            }
            return;
        }

        if crate::services::import::is_media_file(&self.location) {
            // propers stay untouched until post-processing confirms them
            if !status.is_held() {
                self.set_status(quality::status_from_name(&self.location));
            }
        } else {
            self.set_status(quality::encode(Status::Unknown, Quality::Unknown));
        }
    }

    /// Rescans the location's directory for subtitle sidecars and
    /// refreshes the language set.
    pub fn refresh_subtitles(&mut self) {
        if self.location.is_empty() {
            return;
        }
        self.set_subtitles(sidecar_languages(Path::new(&self.location)));
    }

    /// Read-only view handed to the naming engine.
    #[must_use]
    pub fn naming_view(&self, show_name: &str) -> NamingView {
        let (_, quality) = quality::decode(self.status);
        NamingView {
            show_name: show_name.to_string(),
            season: self.season,
            episode: self.episode,
            title: self.name.clone(),
            quality,
            airdate: self.airdate,
            release_name: self.release_name.clone(),
            is_proper: self.is_proper,
        }
    }

    /// Human-readable name for logs and notifications.
    #[must_use]
    pub fn pretty_name(&self, show_name: &str) -> String {
        format!(
            "{} - {}x{:02} - {}",
            show_name, self.season, self.episode, self.name
        )
    }
}

const SUBTITLE_EXTENSIONS: [&str; 5] = ["srt", "sub", "ass", "ssa", "vtt"];

/// Languages of `<stem>.<lang>.<ext>` subtitle files next to an episode
/// file; a bare `<stem>.<ext>` sidecar counts as an unknown language.
fn sidecar_languages(location: &Path) -> Vec<String> {
    let Some(dir) = location.parent() else {
        return Vec::new();
    };
    let Some(stem) = location.file_stem().and_then(|s| s.to_str()) else {
        return Vec::new();
    };
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut langs = Vec::new();
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some(ext) = name.rsplit('.').next() else {
            continue;
        };
        if !SUBTITLE_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
            continue;
        }
        let Some(without_ext) = name.strip_suffix(&format!(".{ext}")) else {
            continue;
        };
        if without_ext == stem {
            langs.push("und".to_string());
        } else if let Some(lang) = without_ext
            .strip_prefix(stem)
            .and_then(|rest| rest.strip_prefix('.'))
            && !lang.is_empty()
            && lang.len() <= 3
        {
            langs.push(lang.to_lowercase());
        }
    }
    langs.sort();
    langs.dedup();
    langs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::encode;

    fn record() -> EpisodeRecord {
        EpisodeRecord::new(1, 1, 2)
    }

    #[test]
    fn test_new_record_is_dirty() {
        assert!(record().is_dirty());
    }

    #[test]
    fn test_set_if_changed_flips_dirty_only_on_change() {
        let mut ep = record();
        ep.dirty = false;

        ep.set_name("Pilot");
        assert!(ep.is_dirty());

        ep.dirty = false;
        ep.set_name("Pilot");
        assert!(!ep.is_dirty());
    }

    #[test]
    fn test_row_round_trip() {
        let mut ep = record();
        ep.set_name("Pilot");
        ep.set_description("The one that starts it");
        ep.set_airdate(NaiveDate::from_ymd_opt(2011, 3, 9).unwrap());
        ep.set_status(encode(Status::Downloaded, Quality::Hd720p));
        ep.set_release_name("Demo.Show.S01E02.720p.HDTV.x264-LOL");
        ep.set_is_proper(true);
        ep.set_subtitles(vec!["en".to_string(), "fr".to_string()]);
        ep.set_subtitles_searchcount(3);

        let row = ep.to_row();
        let mut restored = record();
        restored.apply_row(&row).unwrap();

        assert_eq!(restored.name(), "Pilot");
        assert_eq!(restored.status(), ep.status());
        assert_eq!(restored.airdate(), ep.airdate());
        assert_eq!(restored.subtitles(), ep.subtitles());
        assert!(restored.is_proper());
        assert!(!restored.is_dirty());
    }

    #[test]
    fn test_apply_row_rejects_malformed_airdate() {
        let mut row = record().to_row();
        row.airdate = "garbage".to_string();
        let mut ep = record();
        assert!(matches!(
            ep.apply_row(&row),
            Err(MediaError::MalformedData(_))
        ));
    }

    #[test]
    fn test_indexer_refresh_gone_without_title() {
        let mut ep = record();
        let meta = EpisodeMetadata::default();
        let outcome = ep
            .apply_indexer_data(&meta, NaiveDate::from_ymd_opt(2011, 6, 1).unwrap())
            .unwrap();
        assert_eq!(outcome, RefreshOutcome::Gone);
    }

    #[test]
    fn test_indexer_refresh_unaired_future_episode() {
        let mut ep = record();
        let meta = EpisodeMetadata {
            title: Some("Pilot".to_string()),
            overview: None,
            first_aired: Some("2011-09-01".to_string()),
        };
        let today = NaiveDate::from_ymd_opt(2011, 6, 1).unwrap();
        assert_eq!(
            ep.apply_indexer_data(&meta, today).unwrap(),
            RefreshOutcome::Updated
        );
        assert_eq!(quality::decode_status(ep.status()), Status::Unaired);
    }

    #[test]
    fn test_indexer_refresh_aired_unaired_becomes_wanted() {
        let mut ep = record();
        ep.set_status(encode(Status::Unaired, Quality::Unknown));
        let meta = EpisodeMetadata {
            title: Some("Pilot".to_string()),
            overview: None,
            first_aired: Some("2011-03-09".to_string()),
        };
        let today = NaiveDate::from_ymd_opt(2011, 6, 1).unwrap();
        ep.apply_indexer_data(&meta, today).unwrap();
        assert_eq!(quality::decode_status(ep.status()), Status::Wanted);
    }

    #[test]
    fn test_indexer_refresh_no_airdate_skips() {
        let mut ep = record();
        let meta = EpisodeMetadata {
            title: Some("Pilot".to_string()),
            overview: None,
            first_aired: None,
        };
        let today = NaiveDate::from_ymd_opt(2011, 6, 1).unwrap();
        ep.apply_indexer_data(&meta, today).unwrap();
        assert_eq!(quality::decode_status(ep.status()), Status::Skipped);
    }

    #[test]
    fn test_indexer_refresh_respects_ignored() {
        let mut ep = record();
        ep.set_status(encode(Status::Ignored, Quality::Unknown));
        let meta = EpisodeMetadata {
            title: Some("Pilot".to_string()),
            overview: None,
            first_aired: None,
        };
        let today = NaiveDate::from_ymd_opt(2011, 6, 1).unwrap();
        ep.apply_indexer_data(&meta, today).unwrap();
        assert_eq!(quality::decode_status(ep.status()), Status::Ignored);
    }

    #[test]
    fn test_indexer_refresh_malformed_airdate_fails_load() {
        let mut ep = record();
        let meta = EpisodeMetadata {
            title: Some("Pilot".to_string()),
            overview: None,
            first_aired: Some("09/03/2011".to_string()),
        };
        let today = NaiveDate::from_ymd_opt(2011, 6, 1).unwrap();
        assert!(matches!(
            ep.apply_indexer_data(&meta, today),
            Err(MediaError::MalformedData(_))
        ));
    }

    #[test]
    fn test_related_keys_sorted_and_deduped() {
        let mut ep = record();
        ep.add_related((1, 4));
        ep.add_related((1, 3));
        ep.add_related((1, 4));
        // never relates to itself
        ep.add_related((1, 2));
        assert_eq!(ep.related(), [(1, 3), (1, 4)]);
    }
}
