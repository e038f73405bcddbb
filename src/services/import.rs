//! Media-file import.
//!
//! Turns a freshly discovered or replaced media file into episode
//! records: parses the filename, resolves air-by-date numbering through
//! the metadata collaborator, chains bundled episodes onto the first
//! (root) record, and runs the status/quality transitions.

use crate::db::Store;
use crate::error::MediaError;
use crate::metadata::MetadataProvider;
use crate::models::show::{EpisodeHandle, ShowRecord};
use crate::parser::filename::parse_release;
use crate::quality::{self, Quality, Status};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

const VIDEO_EXTENSIONS: [&str; 7] = ["mkv", "mp4", "avi", "m4v", "wmv", "mpg", "ts"];

/// Whether a path looks like a playable media file.
#[must_use]
pub fn is_media_file(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

pub struct ImportService {
    store: Store,
    provider: Arc<dyn MetadataProvider>,
}

impl ImportService {
    #[must_use]
    pub fn new(store: Store, provider: Arc<dyn MetadataProvider>) -> Self {
        Self { store, provider }
    }

    /// Creates or updates episode records for a media file belonging to
    /// `show`. Returns the root episode of the file, or `None` when the
    /// file cannot be attributed to any episode.
    pub async fn import_file(
        &self,
        show: &ShowRecord,
        file: &Path,
    ) -> Result<Option<EpisodeHandle>, MediaError> {
        if !file.is_file() {
            debug!(show_id = show.id, file = %file.display(), "not an existing file, skipping");
            return Ok(None);
        }

        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let Some(parsed) = parse_release(file_name) else {
            warn!(file = %file_name, "unable to parse the filename into an episode");
            return Ok(None);
        };

        let (season, episodes) = if let Some(date) = parsed.air_date {
            match self.provider.episode_by_airdate(show.id, date).await? {
                Some((season, episode)) => (season, vec![episode]),
                None => {
                    warn!(
                        show = %show.name,
                        date = %date,
                        "no episode with this air date on the indexer, skipping"
                    );
                    return Ok(None);
                }
            }
        } else if parsed.episodes.is_empty() {
            warn!(file = %file_name, "no episode numbers found, ignoring it");
            return Ok(None);
        } else {
            (parsed.season.unwrap_or(1), parsed.episodes.clone())
        };

        let location = file.to_string_lossy().to_string();
        let mut root: Option<EpisodeHandle> = None;
        let mut root_key = None;

        for episode in episodes {
            debug!(
                show = %show.name,
                season, episode, file = %file_name, "attributing file to episode"
            );
            let handle = self
                .store_file_into_episode(show, season, episode, &location)
                .await?;

            if let Some(root_handle) = &root {
                let mut root_record = root_handle.lock().await;
                root_record.add_related((season, episode));
                drop(root_record);
                if let Some(key) = root_key {
                    let mut record = handle.lock().await;
                    record.add_related(key);
                }
            } else {
                root_key = Some((season, episode));
                root = Some(handle);
            }
        }

        Ok(root)
    }

    /// Attaches the file to one episode record and reruns the
    /// status/quality transitions for it.
    async fn store_file_into_episode(
        &self,
        show: &ShowRecord,
        season: i32,
        episode: i32,
        location: &str,
    ) -> Result<EpisodeHandle, MediaError> {
        let handle = show.get_or_create_episode(&self.store, season, episode).await?;

        let mut record = handle.lock().await;

        // a new file on an episode that already had one re-checks quality
        let check_quality_again =
            record.has_file() && !same_path(record.location(), location);

        let old_size = record.file_size();
        record.set_location(location);
        let same_file = old_size > 0 && record.file_size() == old_size;

        if !same_file {
            record.set_release_name("");
        }

        if check_quality_again && !same_file {
            let new_quality = quality::classify_filename(location);
            debug!(quality = %new_quality, "file was replaced, re-checked quality");
            if new_quality != Quality::Unknown {
                record.set_status(quality::encode(Status::Downloaded, new_quality));
            }
        } else if !same_file && is_media_file(location) {
            let (old_status, old_quality) = quality::decode(record.status());
            if !matches!(
                old_status,
                Status::Downloaded | Status::Archived | Status::Ignored
            ) {
                let mut new_quality = quality::classify_filename(location);
                if new_quality == Quality::Unknown {
                    new_quality = quality::assume_quality(location);
                }

                // a snatch is confirmed by a file of matching quality; a
                // snatched proper only by a strictly better one
                let confirm = match old_status {
                    Status::Snatched => old_quality <= new_quality,
                    Status::SnatchedProper => old_quality < new_quality,
                    _ => true,
                };

                if confirm {
                    info!(
                        season, episode,
                        old_status = %old_status,
                        quality = %new_quality,
                        "file exists, marking episode downloaded"
                    );
                    record.set_status(quality::encode(Status::Downloaded, new_quality));
                }
            }
        }

        record.save(&self.store, false).await?;
        drop(record);
        Ok(handle)
    }
}

fn same_path(a: &str, b: &str) -> bool {
    Path::new(a) == Path::new(b)
}
