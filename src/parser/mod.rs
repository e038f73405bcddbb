pub mod filename;

pub use filename::{ParsedRelease, parse_release};
