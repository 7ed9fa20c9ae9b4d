pub mod google;

pub use google::GoogleVisionOcr;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Seam for the cloud OCR call so the pipeline can run against a stub.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Full label text of the image, empty when the label is blank.
    async fn extract_text(&self, image: &Path) -> Result<String>;
}
