//! Label Text Tokenization
//!
//! Thin wrapper over the `tokenizers` crate. The vocabulary comes from a
//! local `tokenizer.json` when one is configured, otherwise the
//! `bert-base-uncased` tokenizer is pulled from the HF Hub.

use anyhow::{anyhow, Result};
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;

const HUB_TOKENIZER_ID: &str = "bert-base-uncased";

pub struct LabelTokenizer {
    tokenizer: Tokenizer,
}

impl LabelTokenizer {
    pub fn new(local: Option<&Path>) -> Result<Self> {
        let tokenizer_file = match local {
            Some(path) => path.to_path_buf(),
            None => fetch_hub_tokenizer()?,
        };

        let tokenizer = Tokenizer::from_file(tokenizer_file).map_err(|e| anyhow!(e))?;
        Ok(Self { tokenizer })
    }

    pub fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let encoding = self.tokenizer.encode(text, false).map_err(|e| anyhow!(e))?;
        Ok(encoding.get_tokens().to_vec())
    }
}

fn fetch_hub_tokenizer() -> Result<PathBuf> {
    let api = Api::new()?;
    let repo = api.repo(Repo::new(HUB_TOKENIZER_ID.to_string(), RepoType::Model));
    Ok(repo.get("tokenizer.json")?)
}
