use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment};
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::ocr::headers::{HeaderPolicy, DEFAULT_MAX_CANDIDATES, DEFAULT_MIN_TOKENS_EXCLUSIVE};
use crate::pages::DEFAULT_PER_PAGE;

const ENV_PREFIX: &str = "JADWAL";

/// Runtime settings, read from `JADWAL_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Feed URL or local JSON path
    pub feed: Option<String>,
    /// Scheme + host used to absolutize relative image references
    pub origin: Option<String>,
    pub ocr_language: String,
    pub tesseract_bin: String,
    pub header_min_tokens: usize,
    pub header_max_lines: usize,
    pub per_page: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feed: None,
            origin: None,
            ocr_language: "ind".to_string(),
            tesseract_bin: "tesseract".to_string(),
            header_min_tokens: DEFAULT_MIN_TOKENS_EXCLUSIVE,
            header_max_lines: DEFAULT_MAX_CANDIDATES,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_builder(
            Config::builder().add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true)),
        )
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Settings = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;
        if settings.per_page == 0 {
            return Err(PipelineError::Configuration("per_page must be at least 1".into()));
        }
        Ok(settings)
    }

    pub fn header_policy(&self) -> HeaderPolicy {
        HeaderPolicy {
            min_tokens_exclusive: self.header_min_tokens,
            max_candidates: self.header_max_lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_sources() {
        let s = Settings::from_builder(Config::builder()).unwrap();
        assert_eq!(s.ocr_language, "ind");
        assert_eq!(s.per_page, 9);
        assert_eq!(s.header_policy(), HeaderPolicy::default());
        assert!(s.origin.is_none());
    }

    #[test]
    fn overrides_apply() {
        let builder = Config::builder()
            .set_override("origin", "https://akademik.example.ac.id")
            .unwrap()
            .set_override("header_min_tokens", 3)
            .unwrap();
        let s = Settings::from_builder(builder).unwrap();
        assert_eq!(s.origin.as_deref(), Some("https://akademik.example.ac.id"));
        assert_eq!(s.header_policy().min_tokens_exclusive, 3);
        assert_eq!(s.header_policy().max_candidates, 2);
    }

    #[test]
    fn zero_page_size_rejected() {
        let builder = Config::builder().set_override("per_page", 0).unwrap();
        assert!(matches!(
            Settings::from_builder(builder),
            Err(PipelineError::Configuration(_))
        ));
    }
}
