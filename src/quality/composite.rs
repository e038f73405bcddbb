//! Composite status codec.
//!
//! An episode's lifecycle status and, for held/snatched episodes, the
//! quality it was acquired at are persisted as one integer: the status in
//! the low byte, the quality bit flag shifted above it. This is the value
//! external collaborators see and the column stored in the database, so
//! encode/decode must round-trip exactly.

use super::definition::Quality;

const STATUS_BITS: u32 = 8;
const STATUS_MASK: i64 = (1 << STATUS_BITS) - 1;

/// Lifecycle state of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Unknown,
    Unaired,
    Skipped,
    Wanted,
    Snatched,
    SnatchedProper,
    SnatchedBest,
    Downloaded,
    Archived,
    Ignored,
    Failed,
}

impl Status {
    const fn code(self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::Unaired => 1,
            Self::Skipped => 2,
            Self::Wanted => 3,
            Self::Snatched => 4,
            Self::SnatchedProper => 5,
            Self::SnatchedBest => 6,
            Self::Downloaded => 7,
            Self::Archived => 8,
            Self::Ignored => 9,
            Self::Failed => 10,
        }
    }

    const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Unaired,
            2 => Self::Skipped,
            3 => Self::Wanted,
            4 => Self::Snatched,
            5 => Self::SnatchedProper,
            6 => Self::SnatchedBest,
            7 => Self::Downloaded,
            8 => Self::Archived,
            9 => Self::Ignored,
            10 => Self::Failed,
            _ => Self::Unknown,
        }
    }

    /// Whether this status carries an associated quality in its composite
    /// form. `Failed` keeps the quality the acquisition failed at; the
    /// remaining statuses never pack one.
    #[must_use]
    pub const fn is_quality_bearing(self) -> bool {
        matches!(
            self,
            Self::Snatched
                | Self::SnatchedProper
                | Self::SnatchedBest
                | Self::Downloaded
                | Self::Failed
        )
    }

    /// Any of the snatched variants.
    #[must_use]
    pub const fn is_snatched(self) -> bool {
        matches!(self, Self::Snatched | Self::SnatchedProper | Self::SnatchedBest)
    }

    /// Statuses meaning a file is (or was) held for the episode.
    #[must_use]
    pub const fn is_held(self) -> bool {
        matches!(self, Self::Downloaded | Self::Archived) || self.is_snatched()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Unaired => "Unaired",
            Self::Skipped => "Skipped",
            Self::Wanted => "Wanted",
            Self::Snatched => "Snatched",
            Self::SnatchedProper => "Snatched (Proper)",
            Self::SnatchedBest => "Snatched (Best)",
            Self::Downloaded => "Downloaded",
            Self::Archived => "Archived",
            Self::Ignored => "Ignored",
            Self::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Packs a `(Status, Quality)` pair into the persisted integer form.
///
/// Non-quality-bearing statuses are forced to `Quality::Unknown` before
/// packing; callers never supply a meaningful quality for e.g. `Wanted`.
#[must_use]
pub fn encode(status: Status, quality: Quality) -> i64 {
    let quality = if status.is_quality_bearing() {
        quality
    } else {
        Quality::Unknown
    };
    (quality.flag() << STATUS_BITS) | status.code()
}

/// Inverse of [`encode`]. A bare legacy status value (one that was never
/// packed) has no quality bits and decodes to `(status, Unknown)`.
#[must_use]
pub fn decode(composite: i64) -> (Status, Quality) {
    let status = Status::from_code(composite & STATUS_MASK);
    let quality = Quality::from_flag(composite >> STATUS_BITS);
    if status.is_quality_bearing() {
        (status, quality)
    } else {
        (status, Quality::Unknown)
    }
}

/// Just the status half of a composite value.
#[must_use]
pub fn decode_status(composite: i64) -> Status {
    decode(composite).0
}

/// Composite `Downloaded` at the quality classified from a filename.
#[must_use]
pub fn status_from_name(filename: &str) -> i64 {
    encode(Status::Downloaded, super::classify_filename(filename))
}

/// Packs a show's quality preference into one integer column: the `any`
/// flags in the low half, the `best` flags shifted above them.
#[must_use]
pub fn combine_preference(pref: &super::profile::QualityPreference) -> i64 {
    let any: i64 = pref.any.iter().map(|q| q.flag()).sum();
    let best: i64 = pref.best.iter().map(|q| q.flag()).sum();
    any | (best << 16)
}

/// Inverse of [`combine_preference`].
#[must_use]
pub fn split_preference(combined: i64) -> super::profile::QualityPreference {
    let unpack = |flags: i64| -> Vec<Quality> {
        Quality::all()
            .into_iter()
            .filter(|q| flags & q.flag() != 0)
            .collect()
    };
    super::profile::QualityPreference::new(unpack(combined & 0xFFFF), unpack(combined >> 16))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [Status; 11] = [
        Status::Unknown,
        Status::Unaired,
        Status::Skipped,
        Status::Wanted,
        Status::Snatched,
        Status::SnatchedProper,
        Status::SnatchedBest,
        Status::Downloaded,
        Status::Archived,
        Status::Ignored,
        Status::Failed,
    ];

    #[test]
    fn test_round_trip_quality_bearing() {
        for status in ALL_STATUSES.into_iter().filter(|s| s.is_quality_bearing()) {
            for quality in Quality::all() {
                assert_eq!(decode(encode(status, quality)), (status, quality));
            }
        }
    }

    #[test]
    fn test_plain_status_forces_unknown_quality() {
        for status in ALL_STATUSES.into_iter().filter(|s| !s.is_quality_bearing()) {
            for quality in Quality::all() {
                assert_eq!(decode(encode(status, quality)), (status, Quality::Unknown));
            }
        }
    }

    #[test]
    fn test_legacy_unpacked_value_decodes() {
        // a raw status code stored before quality packing existed
        let (status, quality) = decode(Status::Downloaded.code());
        assert_eq!(status, Status::Downloaded);
        assert_eq!(quality, Quality::Unknown);
    }

    #[test]
    fn test_status_from_name() {
        let composite = status_from_name("Show.S01E02.720p.HDTV.x264-GRP.mkv");
        assert_eq!(decode(composite), (Status::Downloaded, Quality::Hd720p));
    }

    #[test]
    fn test_preference_round_trip() {
        let pref = crate::quality::QualityPreference::new(
            vec![Quality::SdTv, Quality::Hd720p],
            vec![Quality::Hd1080p, Quality::HdBluRay],
        );
        let combined = combine_preference(&pref);
        let split = split_preference(combined);
        assert_eq!(split.any, pref.any);
        assert_eq!(split.best, pref.best);
    }

    #[test]
    fn test_preference_overlap_allowed() {
        let pref = crate::quality::QualityPreference::new(
            vec![Quality::Hd720p],
            vec![Quality::Hd720p, Quality::Hd1080p],
        );
        let split = split_preference(combine_preference(&pref));
        assert!(split.any.contains(&Quality::Hd720p));
        assert!(split.best.contains(&Quality::Hd720p));
    }
}
