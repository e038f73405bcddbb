use serde::{Deserialize, Serialize};

/// Resolution/source tier of an episode file.
///
/// Variants are declared in ascending desirability so the derived `Ord`
/// is the upgrade order. `Unknown` sorts below everything.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Quality {
    #[default]
    Unknown,
    SdTv,
    SdDvd,
    Hd720p,
    Hd1080p,
    HdBluRay,
    Uhd4k,
}

impl Quality {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::SdTv => "SD TV",
            Self::SdDvd => "SD DVD",
            Self::Hd720p => "720p HDTV",
            Self::Hd1080p => "1080p HDTV",
            Self::HdBluRay => "1080p BluRay",
            Self::Uhd4k => "2160p UHD",
        }
    }

    /// Bit flag used by the composite status packing. `Unknown` carries
    /// no bit so a composite without quality bits decodes back to it.
    #[must_use]
    pub const fn flag(self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::SdTv => 1,
            Self::SdDvd => 1 << 1,
            Self::Hd720p => 1 << 2,
            Self::Hd1080p => 1 << 3,
            Self::HdBluRay => 1 << 4,
            Self::Uhd4k => 1 << 5,
        }
    }

    #[must_use]
    pub const fn from_flag(flag: i64) -> Self {
        match flag {
            1 => Self::SdTv,
            2 => Self::SdDvd,
            4 => Self::Hd720p,
            8 => Self::Hd1080p,
            16 => Self::HdBluRay,
            32 => Self::Uhd4k,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn all() -> [Self; 6] {
        [
            Self::SdTv,
            Self::SdDvd,
            Self::Hd720p,
            Self::Hd1080p,
            Self::HdBluRay,
            Self::Uhd4k,
        ]
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
