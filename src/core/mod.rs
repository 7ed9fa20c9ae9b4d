pub mod config;
pub mod pipeline;

pub use config::{RemediConfig, REMEDI_DIR};
pub use pipeline::{Recognizer, ScanReport};
