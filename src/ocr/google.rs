//! Google Cloud Vision OCR client (`images:annotate`, TEXT_DETECTION).

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};
use std::env;
use std::path::Path;

use super::OcrEngine;

const VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

pub struct GoogleVisionOcr {
    api_key: String,
    client: reqwest::Client,
}

impl GoogleVisionOcr {
    pub fn new() -> Result<Self> {
        let api_key = env::var("GOOGLE_VISION_API_KEY")
            .context("CRITICAL: GOOGLE_VISION_API_KEY not found in .env or environment")?;

        Ok(Self {
            api_key,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl OcrEngine for GoogleVisionOcr {
    async fn extract_text(&self, image: &Path) -> Result<String> {
        let bytes = std::fs::read(image)
            .with_context(|| format!("Image not found: {}", image.display()))?;
        let content = STANDARD.encode(&bytes);

        let url = format!("{}?key={}", VISION_ENDPOINT, self.api_key);
        let payload = json!({
            "requests": [{
                "image": { "content": content },
                "features": [{ "type": "TEXT_DETECTION" }]
            }]
        });

        let res = self.client.post(&url).json(&payload).send().await?;
        let status = res.status();
        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            return Err(anyhow!("Vision API request failed: {} - {}", status, err_text));
        }

        let body: Value = res.json().await?;
        parse_annotation(&body)
    }
}

/// Walks `responses[0]`. A per-image error is fatal; a missing annotation
/// just means the label carried no readable text.
fn parse_annotation(body: &Value) -> Result<String> {
    let response = body
        .get("responses")
        .and_then(|r| r.get(0))
        .context("Vision API returned no responses")?;

    if let Some(message) = response
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
    {
        return Err(anyhow!("Vision API error: {}", message));
    }

    Ok(response
        .get("fullTextAnnotation")
        .and_then(|t| t.get("text"))
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .to_string())
}
