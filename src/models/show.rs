//! The owning show entity.
//!
//! A show owns the map from `(season, episode)` to episode records; each
//! record sits behind its own async lock, the map itself behind a plain
//! mutex that is never held across an await. Related-episode lists store
//! keys into this map, so deleting a record has exactly one owner to
//! update.

use crate::db::Store;
use crate::entities::tv_show;
use crate::error::MediaError;
use crate::metadata::{MetadataProvider, unknown_airdate};
use crate::models::episode::{EpisodeKey, EpisodeRecord, RefreshOutcome};
use crate::quality::{self, Quality, QualityPreference};
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub type EpisodeHandle = Arc<tokio::sync::Mutex<EpisodeRecord>>;

pub struct ShowRecord {
    pub id: i64,
    pub name: String,
    /// Root directory of the show on disk.
    pub location: String,
    pub preference: QualityPreference,
    pub flatten_folders: bool,
    pub air_by_date: bool,
    pub paused: bool,
    pub subtitles: bool,
    /// Airing status from the indexer ("Continuing", "Ended", "").
    pub status: String,
    pub last_refreshed: NaiveDate,
    episodes: Mutex<HashMap<EpisodeKey, EpisodeHandle>>,
}

impl ShowRecord {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            location: String::new(),
            preference: QualityPreference::default(),
            flatten_folders: false,
            air_by_date: false,
            paused: false,
            subtitles: false,
            status: String::new(),
            last_refreshed: unknown_airdate(),
            episodes: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_row(row: &tv_show::Model) -> Result<Self, MediaError> {
        let mut show = Self::new(row.id, row.name.clone());
        show.location = row.location.clone();
        show.preference = quality::composite::split_preference(row.quality);
        show.flatten_folders = row.flatten_folders;
        show.air_by_date = row.air_by_date;
        show.paused = row.paused;
        show.subtitles = row.subtitles;
        show.status = row.status.clone();
        show.last_refreshed =
            crate::metadata::parse_airdate(Some(row.last_refreshed.as_str()))?;
        Ok(show)
    }

    #[must_use]
    pub fn to_row(&self) -> tv_show::Model {
        tv_show::Model {
            id: self.id,
            name: self.name.clone(),
            location: self.location.clone(),
            quality: quality::composite::combine_preference(&self.preference),
            flatten_folders: self.flatten_folders,
            air_by_date: self.air_by_date,
            paused: self.paused,
            subtitles: self.subtitles,
            status: self.status.clone(),
            last_refreshed: self.last_refreshed.format("%Y-%m-%d").to_string(),
        }
    }

    pub async fn load(store: &Store, id: i64) -> Result<Self, MediaError> {
        let row = store
            .get_show(id)
            .await?
            .ok_or_else(|| MediaError::not_found(format!("show {id}")))?;
        Self::from_row(&row)
    }

    pub async fn save(&self, store: &Store) -> Result<(), MediaError> {
        store.upsert_show(self.to_row()).await
    }

    /// The episode handle if it already exists in the map.
    pub fn episode(&self, season: i32, episode: i32) -> Option<EpisodeHandle> {
        self.episodes
            .lock()
            .expect("episode map lock poisoned")
            .get(&(season, episode))
            .cloned()
    }

    #[must_use]
    pub fn episode_keys(&self) -> Vec<EpisodeKey> {
        let mut keys: Vec<EpisodeKey> = self
            .episodes
            .lock()
            .expect("episode map lock poisoned")
            .keys()
            .copied()
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Fetches or lazily creates the record for `(season, episode)`.
    ///
    /// The row is loaded outside the map lock; insertion re-checks the
    /// map so two racing callers end up sharing one record instead of
    /// creating duplicates.
    pub async fn get_or_create_episode(
        &self,
        store: &Store,
        season: i32,
        episode: i32,
    ) -> Result<EpisodeHandle, MediaError> {
        if let Some(existing) = self.episode(season, episode) {
            return Ok(existing);
        }

        debug!(
            show_id = self.id,
            season, episode, "episode record not cached, creating it"
        );
        let mut record = EpisodeRecord::new(self.id, season, episode);
        record.load(store).await?;

        let mut map = self.episodes.lock().expect("episode map lock poisoned");
        let handle = map
            .entry((season, episode))
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(record)));
        Ok(handle.clone())
    }

    /// Loads every persisted episode of the show into the map and wires
    /// up related-episode groups from rows sharing one file.
    pub async fn load_episodes(&self, store: &Store) -> Result<usize, MediaError> {
        let rows = store.list_episode_rows(self.id).await?;
        let count = rows.len();

        let mut by_location: HashMap<String, Vec<EpisodeKey>> = HashMap::new();
        for row in &rows {
            if !row.location.is_empty() {
                by_location
                    .entry(row.location.clone())
                    .or_default()
                    .push((row.season, row.episode));
            }
        }

        let mut map = self.episodes.lock().expect("episode map lock poisoned");
        for row in rows {
            let mut record = EpisodeRecord::new(self.id, row.season, row.episode);
            record.apply_row(&row)?;

            if let Some(group) = by_location.get(&row.location)
                && group.len() > 1
            {
                record.set_related(
                    group
                        .iter()
                        .copied()
                        .filter(|k| *k != (row.season, row.episode))
                        .collect(),
                );
            }

            map.entry((row.season, row.episode))
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(record)));
        }
        Ok(count)
    }

    /// Deletes an episode everywhere: database row, owning map entry.
    /// In-flight holders of the record learn about it through the
    /// `EpisodeDeleted` signal of the operation they were part of.
    pub async fn delete_episode(
        &self,
        store: &Store,
        season: i32,
        episode: i32,
    ) -> Result<(), MediaError> {
        info!(
            show_id = self.id,
            season, episode, "deleting episode from the database"
        );
        store.delete_episode_row(self.id, season, episode).await?;
        self.episodes
            .lock()
            .expect("episode map lock poisoned")
            .remove(&(season, episode));
        Ok(())
    }

    /// Refreshes one episode from the indexer. Returns the
    /// `EpisodeDeleted` signal when the indexer dropped the episode; the
    /// record is deleted before the signal propagates.
    pub async fn refresh_episode(
        &self,
        store: &Store,
        provider: &dyn MetadataProvider,
        season: i32,
        episode: i32,
    ) -> Result<(), MediaError> {
        let handle = self.get_or_create_episode(store, season, episode).await?;

        let meta = provider.episode(self.id, season, episode).await?;
        let Some(meta) = meta else {
            warn!(
                show = %self.name,
                season, episode, "episode vanished from the indexer, deleting it"
            );
            self.delete_episode(store, season, episode).await?;
            return Err(MediaError::EpisodeDeleted);
        };

        let today = chrono::Local::now().date_naive();
        let mut record = handle.lock().await;
        match record.apply_indexer_data(&meta, today)? {
            RefreshOutcome::Updated => {
                record.save(store, false).await?;
                Ok(())
            }
            RefreshOutcome::Gone => {
                drop(record);
                self.delete_episode(store, season, episode).await?;
                Err(MediaError::EpisodeDeleted)
            }
        }
    }

    /// Whether a found release for `(season, episode)` at `found`
    /// quality should be taken. Consults the persisted status so the
    /// answer survives restarts; unknown episodes are never wanted.
    pub async fn want_episode(
        &self,
        store: &Store,
        season: i32,
        episode: i32,
        found: Quality,
        manual_search: bool,
    ) -> Result<bool, MediaError> {
        debug!(
            show = %self.name,
            season, episode, quality = %found, manual_search,
            "checking if found episode is wanted"
        );

        let Some(row) = store.get_episode_row(self.id, season, episode).await? else {
            debug!("no matching episode in database, ignoring found episode");
            return Ok(false);
        };

        let wanted = self
            .preference
            .want_episode(row.status, found, manual_search);
        debug!(wanted, current_status = row.status, "acquisition decision");
        Ok(wanted)
    }

    /// Display category of an episode's composite status under this
    /// show's preference.
    #[must_use]
    pub fn overview(&self, composite: i64) -> crate::quality::Overview {
        self.preference.overview(composite)
    }

    /// Whether an indexer refresh is due. Non-ended shows always update;
    /// ended shows only while airdates are near the grace window, or on
    /// a 30-day cadence during the first ~15 months after the finale.
    pub async fn should_update(
        &self,
        store: &Store,
        today: NaiveDate,
    ) -> Result<bool, MediaError> {
        if self.status != "Ended" {
            return Ok(true);
        }

        let grace = Duration::days(30);
        let rows = store.list_episode_rows(self.id).await?;

        let mut last_airdate = unknown_airdate();
        let mut next_unaired: Option<NaiveDate> = None;
        for row in &rows {
            let airdate = crate::metadata::parse_airdate(Some(row.airdate.as_str()))?;
            if airdate == unknown_airdate() || row.season == 0 {
                continue;
            }
            if airdate <= today && airdate > last_airdate {
                last_airdate = airdate;
            }
            if quality::decode_status(row.status) == crate::quality::Status::Unaired
                && airdate > today
                && next_unaired.is_none_or(|d| airdate < d)
            {
                next_unaired = Some(airdate);
            }
        }

        if last_airdate != unknown_airdate()
            && last_airdate >= today - grace
            && last_airdate <= today + grace
        {
            return Ok(true);
        }
        if let Some(next) = next_unaired
            && next <= today + grace
        {
            return Ok(true);
        }
        // in the first year-and-a-bit after the finale, refresh monthly
        if last_airdate != unknown_airdate()
            && today - last_airdate < Duration::days(450)
            && today - self.last_refreshed > Duration::days(30)
        {
            return Ok(true);
        }

        Ok(false)
    }

    /// Deletes the show and all of its episodes.
    pub async fn delete(&self, store: &Store) -> Result<(), MediaError> {
        info!(show = %self.name, "removing show and episodes from the database");
        store.delete_show(self.id).await?;
        self.episodes
            .lock()
            .expect("episode map lock poisoned")
            .clear();
        Ok(())
    }

    /// Drops every cached episode record; the database rows stay.
    pub fn flush_episodes(&self) {
        self.episodes
            .lock()
            .expect("episode map lock poisoned")
            .clear();
    }
}

impl std::fmt::Debug for ShowRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShowRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("location", &self.location)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}
