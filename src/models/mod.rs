pub mod episode;
pub mod show;

pub use episode::{EpisodeKey, EpisodeRecord, RefreshOutcome};
pub use show::ShowRecord;
