use crate::classification::{ChangeBands, SimilarityBands};
use crate::consts::{
    DEFAULT_MARK_PATH, DEFAULT_REFERENCE_DIR, MIN_REGION_AREA, OCR_SPACE_URL, OCR_TIMEOUT_SECS,
    REFERENCE_MARK_THRESHOLD, SUBMITTED_MARK_THRESHOLD, WORKING_SCALE,
};
use crate::error::{Result, VerifyError};
use crate::text::{MatchParams, TemplateVariant};
use crate::vision::ScaleSearch;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const API_KEY_ENV: &str = "OCR_SPACE_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub text: TextConfig,
    pub logo: LogoConfig,
    pub ocr: OcrConfig,
    pub prefilter: PrefilterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub variants: Vec<TemplateVariant>,
    pub params: MatchParams,
    pub bands: SimilarityBands,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            variants: TemplateVariant::builtin(),
            params: MatchParams::default(),
            bands: SimilarityBands::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkSource {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogoConfig {
    pub marks: Vec<MarkSource>,
    pub reference_dir: String,
    /// Both submitted and reference receipts are resized by this factor before measuring.
    pub working_scale: f64,
    pub search: ScaleSearch,
    pub submitted_threshold: f64,
    pub reference_threshold: f64,
    pub min_region_area: f64,
    pub bands: ChangeBands,
}

impl Default for LogoConfig {
    fn default() -> Self {
        Self {
            marks: vec![MarkSource {
                name: "plin".to_string(),
                path: DEFAULT_MARK_PATH.to_string(),
            }],
            reference_dir: DEFAULT_REFERENCE_DIR.to_string(),
            working_scale: WORKING_SCALE,
            search: ScaleSearch::default(),
            submitted_threshold: SUBMITTED_MARK_THRESHOLD,
            reference_threshold: REFERENCE_MARK_THRESHOLD,
            min_region_area: MIN_REGION_AREA,
            bands: ChangeBands::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub language: String,
    pub engine: u8,
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: OCR_SPACE_URL.to_string(),
            api_key: None,
            language: "spa".to_string(),
            engine: 2,
            timeout_secs: OCR_TIMEOUT_SECS,
        }
    }
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Inclusive HSV range as used by OpenCV (hue 0..180).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [f64; 3],
    pub upper: [f64; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefilterConfig {
    pub turquoise: HsvRange,
    pub white: HsvRange,
    pub min_turquoise_ratio: f64,
    pub min_white_ratio: f64,
    /// Turquoise ratio above which the brand layout is reported with high confidence.
    pub high_confidence_ratio: f64,
    /// Laplacian variance that maps to a sharpness score of 100.
    pub sharpness_normalizer: f64,
    pub sharpness_bands: SimilarityBands,
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self {
            turquoise: HsvRange {
                lower: [75.0, 40.0, 50.0],
                upper: [105.0, 255.0, 255.0],
            },
            white: HsvRange {
                lower: [0.0, 0.0, 200.0],
                upper: [180.0, 30.0, 255.0],
            },
            min_turquoise_ratio: 0.15,
            min_white_ratio: 0.25,
            high_confidence_ratio: 0.25,
            sharpness_normalizer: 400.0,
            sharpness_bands: SimilarityBands {
                authentic_min: 70.0,
                suspicious_min: 50.0,
            },
        }
    }
}

impl VerifierConfig {
    /// Read the configuration from `path`, falling back to defaults when no file is given
    /// or the file does not exist. The API key environment variable always wins.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)?;
                let config: VerifierConfig = serde_json::from_str(&content)?;
                info!("Loaded configuration from {}", path.display());
                config
            }
            Some(path) => {
                info!("No configuration at {}, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                debug!("Using API key from {}", API_KEY_ENV);
                config.ocr.api_key = Some(key);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.text.variants.is_empty() {
            return Err(VerifyError::Config("at least one template variant is required".into()));
        }
        for variant in &self.text.variants {
            if let Some(field) = variant.fields.iter().find(|f| f.weight <= 0.0) {
                return Err(VerifyError::Config(format!(
                    "field '{}' of variant '{}' must have a positive weight",
                    field.key, variant.name
                )));
            }
        }
        if self.logo.marks.is_empty() {
            return Err(VerifyError::Config("at least one mark image is required".into()));
        }
        if self.logo.working_scale <= 0.0 {
            return Err(VerifyError::Config("working scale must be positive".into()));
        }
        if self.prefilter.sharpness_normalizer <= 0.0 {
            return Err(VerifyError::Config("sharpness normalizer must be positive".into()));
        }
        Ok(())
    }

    pub fn api_key(&self) -> Result<&str> {
        self.ocr
            .api_key
            .as_deref()
            .ok_or_else(|| VerifyError::Config(format!("{} is not set", API_KEY_ENV)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = VerifierConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.text.variants.len(), 2);
        assert_eq!(config.logo.working_scale, 0.6);
        assert_eq!(config.ocr.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: VerifierConfig =
            serde_json::from_str(r#"{"logo": {"reference_dir": "refs"}}"#).unwrap();
        assert_eq!(config.logo.reference_dir, "refs");
        assert_eq!(config.logo.submitted_threshold, 0.60);
        assert_eq!(config.text.bands.authentic_min, 85.0);
    }

    #[test]
    fn test_rejects_zero_weight() {
        let mut config = VerifierConfig::default();
        config.text.variants[0].fields[0].weight = 0.0;
        assert!(matches!(config.validate(), Err(VerifyError::Config(_))));
    }

    #[test]
    fn test_rejects_empty_variants() {
        let mut config = VerifierConfig::default();
        config.text.variants.clear();
        assert!(config.validate().is_err());
    }
}
