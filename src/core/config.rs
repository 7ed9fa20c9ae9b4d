use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const REMEDI_DIR: &str = ".remedi";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RemediConfig {
    /// Fine-tuned packaging model (safetensors export).
    pub model_path: String,
    /// Local tokenizer.json; unset means fetch from the HF Hub.
    #[serde(default)]
    pub tokenizer_path: Option<String>,
    pub class_names: Vec<String>,
    pub db_path: String,
    pub inbox_dir: String,
}

impl Default for RemediConfig {
    fn default() -> Self {
        Self {
            model_path: format!("{}/mobilenetv2_medicine.safetensors", REMEDI_DIR),
            tokenizer_path: None,
            class_names: vec![
                "Tablet".to_string(),
                "Syrup".to_string(),
                "Injection".to_string(),
            ],
            db_path: format!("{}/remedi.db", REMEDI_DIR),
            inbox_dir: format!("{}/inbox", REMEDI_DIR),
        }
    }
}

impl RemediConfig {
    /// Read `.remedi/config.toml`; a missing or unparseable file falls back
    /// to defaults so the assistant stays usable before `remedi init`.
    pub fn load_or_default() -> Self {
        let path = Path::new(REMEDI_DIR).join("config.toml");
        let raw = fs::read_to_string(path).unwrap_or_default();
        toml::from_str(&raw).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrips_through_toml() {
        let config = RemediConfig::default();
        let raw = toml::to_string_pretty(&config).unwrap();
        let parsed: RemediConfig = toml::from_str(&raw).unwrap();
        assert_eq!(parsed.class_names, config.class_names);
        assert_eq!(parsed.db_path, config.db_path);
        assert!(parsed.tokenizer_path.is_none());
    }

    #[test]
    fn test_garbage_config_falls_back_to_defaults() {
        let parsed: RemediConfig = toml::from_str("not toml at all [").unwrap_or_default();
        assert_eq!(parsed.class_names.len(), 3);
    }
}
