//! Per-show quality preference and the acquisition decision logic.

use super::composite::{Status, decode};
use super::definition::Quality;
use serde::{Deserialize, Serialize};

/// Which qualities a show wants.
///
/// `any` holds the qualities acceptable as a first acquisition, `best`
/// the ones worth upgrading to. The sets may overlap; a quality in
/// neither is never wanted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityPreference {
    pub any: Vec<Quality>,
    pub best: Vec<Quality>,
}

impl Default for QualityPreference {
    fn default() -> Self {
        Self {
            any: vec![Quality::SdTv, Quality::Hd720p],
            best: vec![Quality::Hd1080p, Quality::HdBluRay],
        }
    }
}

impl QualityPreference {
    #[must_use]
    pub fn new(any: Vec<Quality>, best: Vec<Quality>) -> Self {
        Self { any, best }
    }

    #[must_use]
    pub fn is_wanted_at_all(&self, quality: Quality) -> bool {
        self.any.contains(&quality) || self.best.contains(&quality)
    }

    #[must_use]
    pub fn max_best(&self) -> Option<Quality> {
        self.best.iter().copied().max()
    }

    /// Decides whether a newly found release should be taken, given the
    /// episode's current composite status. Pure; callers log the outcome.
    ///
    /// A manual search overrides the skip/ignore/archive gate and the
    /// upgrade gating, but never the preference sets themselves.
    #[must_use]
    pub fn want_episode(&self, current_composite: i64, found: Quality, manual_search: bool) -> bool {
        if !self.is_wanted_at_all(found) {
            return false;
        }

        let (cur_status, cur_quality) = decode(current_composite);

        if matches!(cur_status, Status::Skipped | Status::Ignored | Status::Archived)
            && !manual_search
        {
            return false;
        }

        // first acquisition
        if matches!(cur_status, Status::Wanted | Status::Unaired | Status::Skipped) {
            return true;
        }

        if manual_search {
            return true;
        }

        // re-acquisition of an already-owned episode: only upgrades from
        // the `best` set count. A plain snatch also accepts equal quality
        // so the eventual download can confirm it even when the snatch
        // and the file report quality independently; a proper that was
        // already snatched is not improved by an equal-quality repack.
        if !self.best.contains(&found) {
            return false;
        }
        match cur_status {
            Status::Snatched => found >= cur_quality,
            Status::SnatchedProper | Status::SnatchedBest | Status::Downloaded => {
                found > cur_quality
            }
            _ => false,
        }
    }

    /// Coarse display category for an episode given its composite status.
    #[must_use]
    pub fn overview(&self, composite: i64) -> Overview {
        let (status, quality) = decode(composite);
        match status {
            Status::Wanted => Overview::Wanted,
            Status::Unaired | Status::Unknown => Overview::Unaired,
            Status::Skipped | Status::Ignored => Overview::Skipped,
            Status::Archived => Overview::Good,
            Status::Failed => Overview::Wanted,
            Status::Snatched | Status::SnatchedProper | Status::SnatchedBest => Overview::Snatched,
            Status::Downloaded => match self.max_best() {
                // no upgrade wishes: anything held is good
                None => Overview::Good,
                Some(max_best) if quality < max_best => Overview::Qualified,
                Some(_) => Overview::Good,
            },
        }
    }
}

/// Display category an episode falls into on show overview pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Overview {
    Wanted,
    Unaired,
    Skipped,
    Good,
    Snatched,
    /// Held, but below the best quality the show asks for.
    Qualified,
}
