pub mod import;
pub mod rename;

pub use import::ImportService;
pub use rename::{FileMover, RenameService, TokioFileMover};
