//! Bulk rename of episode files to the configured naming pattern.
//!
//! The naming engine computes target paths; the physical moves go
//! through the [`FileMover`] collaborator. Sidecar files (subtitles,
//! thumbnails, nfo) follow the primary file, and a sidecar failure never
//! rolls back a move that already happened. In-memory locations of a
//! multi-episode group update only after the move succeeded, each under
//! its own lock.

use crate::config::Config;
use crate::db::Store;
use crate::error::MediaError;
use crate::models::episode::EpisodeKey;
use crate::models::show::{EpisodeHandle, ShowRecord};
use crate::naming::{self, NamingContext, NamingView};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Concurrent existence checks during preview.
const PREVIEW_CONCURRENCY: usize = 8;

/// File-operations collaborator: performs the actual moves.
#[async_trait]
pub trait FileMover: Send + Sync {
    async fn move_file(&self, from: &Path, to: &Path) -> std::io::Result<()>;
}

/// Default mover backed by `tokio::fs`.
pub struct TokioFileMover;

#[async_trait]
impl FileMover for TokioFileMover {
    async fn move_file(&self, from: &Path, to: &Path) -> std::io::Result<()> {
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(from, to).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    /// The file already sits at its computed path; nothing to do.
    AlreadyNamed,
    /// The source file is gone; nothing was changed.
    SourceMissing,
}

#[derive(Debug, Clone)]
pub struct RenamePreviewItem {
    pub season: i32,
    pub episode: i32,
    pub current_path: String,
    pub new_path: String,
    pub new_filename: String,
}

#[derive(Debug, Default)]
pub struct RenameResult {
    pub renamed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<String>,
}

pub struct RenameService {
    store: Store,
    config: Arc<RwLock<Config>>,
    mover: Arc<dyn FileMover>,
}

impl RenameService {
    #[must_use]
    pub fn new(store: Store, config: Arc<RwLock<Config>>, mover: Arc<dyn FileMover>) -> Self {
        Self {
            store,
            config,
            mover,
        }
    }

    /// Proposed renames for every located episode of the show, no-ops
    /// filtered out. Does not touch any file.
    pub async fn preview(&self, show: &ShowRecord) -> Result<Vec<RenamePreviewItem>, MediaError> {
        let naming = self.config.read().await.naming.clone();

        // bundled episodes are proposed once, under their group's
        // lowest-numbered episode
        let mut handled: std::collections::HashSet<EpisodeKey> = std::collections::HashSet::new();
        let mut keys = Vec::new();
        for key in show.episode_keys() {
            if handled.contains(&key) {
                continue;
            }
            if let Some(handle) = show.episode(key.0, key.1) {
                for related in handle.lock().await.related() {
                    handled.insert(*related);
                }
            }
            keys.push(key);
        }

        let items = stream::iter(keys)
            .map(|key| {
                let naming = naming.clone();
                async move {
                    let handle = show.episode(key.0, key.1)?;
                    let (location, ctx) = self.snapshot_views(show, &handle).await?;

                    if !Path::new(&location).is_file() {
                        return None;
                    }

                    let target =
                        target_path(show, &ctx, &naming, &location);
                    if Path::new(&location) == target.as_path() {
                        return None;
                    }

                    Some(RenamePreviewItem {
                        season: key.0,
                        episode: key.1,
                        current_path: location,
                        new_path: target.to_string_lossy().to_string(),
                        new_filename: target
                            .file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_default(),
                    })
                }
            })
            .buffer_unordered(PREVIEW_CONCURRENCY)
            .filter_map(|x| async move { x })
            .collect::<Vec<_>>()
            .await;

        let mut items = items;
        items.sort_by_key(|i| (i.season, i.episode));
        Ok(items)
    }

    /// Renames every located episode of the show. Episodes bundled into
    /// an earlier episode's file are handled with it, not on their own —
    /// the lowest-numbered episode of a group names the file.
    pub async fn execute(&self, show: &ShowRecord) -> Result<RenameResult, MediaError> {
        let mut result = RenameResult::default();
        let mut handled: std::collections::HashSet<EpisodeKey> = std::collections::HashSet::new();

        for (season, episode) in show.episode_keys() {
            if handled.contains(&(season, episode)) {
                result.skipped += 1;
                continue;
            }
            if let Some(handle) = show.episode(season, episode) {
                for key in handle.lock().await.related() {
                    handled.insert(*key);
                }
            }

            match self.rename_episode(show, season, episode).await {
                Ok(RenameOutcome::Renamed) => result.renamed += 1,
                Ok(RenameOutcome::AlreadyNamed | RenameOutcome::SourceMissing) => {
                    result.skipped += 1;
                }
                Err(e) => {
                    result.failed += 1;
                    result
                        .failures
                        .push(format!("{season}x{episode:02}: {e}"));
                }
            }
        }

        info!(
            show = %show.name,
            renamed = result.renamed,
            skipped = result.skipped,
            failed = result.failed,
            "rename pass finished"
        );
        Ok(result)
    }

    /// Renames one episode file (and its bundled siblings' bookkeeping)
    /// to the computed path.
    pub async fn rename_episode(
        &self,
        show: &ShowRecord,
        season: i32,
        episode: i32,
    ) -> Result<RenameOutcome, MediaError> {
        let primary = show
            .get_or_create_episode(&self.store, season, episode)
            .await?;

        // the whole related group locks in ascending key order, and the
        // read-compute-move-write sequence happens under those locks
        let related_keys = { primary.lock().await.related().to_vec() };
        let mut group: Vec<(EpisodeKey, EpisodeHandle)> = vec![((season, episode), primary)];
        for key in related_keys {
            let handle = show.get_or_create_episode(&self.store, key.0, key.1).await?;
            group.push((key, handle));
        }
        group.sort_by_key(|(key, _)| *key);
        group.dedup_by_key(|(key, _)| *key);

        let mut guards = Vec::with_capacity(group.len());
        for (key, handle) in &group {
            guards.push((*key, handle.clone().lock_owned().await));
        }

        let primary_idx = guards
            .iter()
            .position(|(key, _)| *key == (season, episode))
            .expect("primary episode is part of its own group");

        let location = guards[primary_idx].1.location().to_string();
        if location.is_empty() || !Path::new(&location).is_file() {
            warn!(
                show = %show.name,
                season, episode,
                "can't rename a file that doesn't exist, skipping"
            );
            return Ok(RenameOutcome::SourceMissing);
        }

        let naming = self.config.read().await.naming.clone();
        let primary_view = guards[primary_idx].1.naming_view(&show.name);
        let related_views: Vec<NamingView> = guards
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != primary_idx)
            .map(|(_, (_, guard))| guard.naming_view(&show.name))
            .collect();
        let ctx = NamingContext {
            primary: primary_view,
            related: related_views,
            air_by_date: show.air_by_date,
        };

        let target = target_path(show, &ctx, &naming, &location);

        if Path::new(&location) == target.as_path() {
            debug!(
                show = %show.name,
                season, episode, path = %location,
                "file is already named correctly, skipping"
            );
            return Ok(RenameOutcome::AlreadyNamed);
        }

        debug!(
            from = %location,
            to = %target.display(),
            "renaming episode file"
        );

        let sidecars = list_associated_files(Path::new(&location));

        self.mover.move_file(Path::new(&location), &target).await?;

        // sidecars follow the primary; one failing does not undo the
        // move that already happened
        let target_no_ext = strip_extension(&target);
        let source_stem = Path::new(&location)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        for sidecar in sidecars {
            let Some(name) = sidecar.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(suffix) = name.strip_prefix(source_stem.as_str()) else {
                continue;
            };
            let sidecar_target = PathBuf::from(format!("{}{suffix}", target_no_ext.display()));
            if let Err(e) = self.mover.move_file(&sidecar, &sidecar_target).await {
                warn!(
                    sidecar = %sidecar.display(),
                    error = %e,
                    "unable to move sidecar file"
                );
            }
        }

        // only after the physical move: update the whole group's
        // locations, each record under its (held) lock, and persist
        let new_location = target.to_string_lossy().to_string();
        for (_, guard) in &mut guards {
            guard.set_location(new_location.clone());
        }
        if let Some((_, guard)) = guards.get_mut(primary_idx) {
            guard.refresh_subtitles();
        }
        for (_, guard) in &mut guards {
            guard.save(&self.store, false).await?;
        }

        Ok(RenameOutcome::Renamed)
    }

    /// Snapshots the naming views of an episode and its related group
    /// without ever holding two locks at once.
    async fn snapshot_views(
        &self,
        show: &ShowRecord,
        handle: &EpisodeHandle,
    ) -> Option<(String, NamingContext)> {
        let (location, primary_view, related_keys) = {
            let record = handle.lock().await;
            if !record.has_file() {
                return None;
            }
            (
                record.location().to_string(),
                record.naming_view(&show.name),
                record.related().to_vec(),
            )
        };

        let mut related_views = Vec::with_capacity(related_keys.len());
        for key in related_keys {
            if let Some(rel) = show.episode(key.0, key.1) {
                related_views.push(rel.lock().await.naming_view(&show.name));
            }
        }

        Some((
            location,
            NamingContext {
                primary: primary_view,
                related: related_views,
                air_by_date: show.air_by_date,
            },
        ))
    }
}

/// Absolute target path for an episode file: show dir + compiled pattern
/// + the source file's extension.
fn target_path(
    show: &ShowRecord,
    ctx: &NamingContext,
    naming: &crate::config::NamingConfig,
    current_location: &str,
) -> PathBuf {
    let relative = naming::proper_path(ctx, naming, show.flatten_folders);
    let base = Path::new(&show.location).join(relative);
    match Path::new(current_location).extension().and_then(|e| e.to_str()) {
        // appended manually: the compiled name may legitimately contain dots
        Some(ext) => PathBuf::from(format!("{}.{ext}", base.display())),
        None => base,
    }
}

fn strip_extension(path: &Path) -> PathBuf {
    path.with_extension("")
}

/// Files sitting next to the episode with the same stem (subtitles,
/// thumbnails, nfo).
fn list_associated_files(location: &Path) -> Vec<PathBuf> {
    let Some(dir) = location.parent() else {
        return Vec::new();
    };
    let Some(stem) = location.file_stem().and_then(|s| s.to_str()) else {
        return Vec::new();
    };
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p != location && p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.strip_prefix(stem).is_some_and(|rest| rest.starts_with('.')))
        })
        .collect()
}
