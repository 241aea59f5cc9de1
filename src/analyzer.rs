use crate::classification::{Breakdown, Classification, VerificationReport};
use crate::config::VerifierConfig;
use crate::consts::MAX_OCR_SIDE;
use crate::error::{Result, VerifyError};
use crate::geometry::LogoVerifier;
use crate::ocr::{RecognizerWrapper, TextRecognizer};
use crate::prefilter::{ColorGateOutcome, color_gate, sharpness};
use crate::text::{
    ReceiptFields, TemplateMatcher, check_line_layout, extract_fields, is_sent_layout,
};
use crate::vision::{crop_white_box, decode_image, encode_png, limit_longest_side};
use chrono::Local;
use log::{debug, info, warn};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Structured fields of a receipt plus the layout check.
#[derive(Debug, Clone, Serialize)]
pub struct FieldReport {
    pub sent_layout: bool,
    pub words_detected: usize,
    pub fields: ReceiptFields,
    pub full_text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrefilterReport {
    pub color: ColorGateOutcome,
    pub sharpness: VerificationReport,
}

/// Entry point for every check. Built once, then shared read-only.
pub struct ReceiptAnalyzer {
    config: VerifierConfig,
    matcher: TemplateMatcher,
    recognizer: RecognizerWrapper,
    logo: Option<LogoVerifier>,
}

impl ReceiptAnalyzer {
    pub fn new(config: VerifierConfig, recognizer: RecognizerWrapper) -> Self {
        let matcher = TemplateMatcher::new(config.text.variants.clone(), config.text.params);
        Self {
            config,
            matcher,
            recognizer,
            logo: None,
        }
    }

    /// Load the mark images and the reference library for the logo check.
    pub fn load_logo_verifier(mut self) -> Result<Self> {
        let now = Instant::now();
        let verifier = LogoVerifier::new(self.config.logo.clone())?;
        info!(
            "Logo verifier ready with {} references in {:?}",
            verifier.library().len(),
            now.elapsed()
        );
        self.logo = Some(verifier);
        Ok(self)
    }

    pub fn with_logo_verifier(mut self, verifier: LogoVerifier) -> Self {
        self.logo = Some(verifier);
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Score the recognized words of the receipt against every template variant.
    pub async fn verify_text(&self, bytes: &[u8]) -> Result<VerificationReport> {
        let now = Instant::now();
        let img = decode_image(bytes)?;
        let png = encode_png(&img)?;
        let decode_time = now.elapsed();

        let recognition = self.recognizer.recognize(&png).await?;
        let recognize_time = now.elapsed() - decode_time;

        if recognition.words.is_empty() {
            info!("Text check: no words recognized");
            return Ok(VerificationReport::no_match(
                0.0,
                Breakdown::Fields {
                    fields: Vec::new(),
                    words_detected: 0,
                    fields_found: 0,
                },
                "no text detected",
            ));
        }

        let outcome = self.matcher.best_match(&recognition.words).ok_or_else(|| {
            VerifyError::Config("no template variant is configured".to_string())
        })?;
        let classification =
            Classification::from_similarity(outcome.percentage, &self.config.text.bands);

        let match_time = now.elapsed() - recognize_time - decode_time;
        if match_time > Duration::from_millis(100) {
            warn!("Template matching took too long: {:?}", match_time);
        }
        info!(
            "Text check: variant '{}' scored {:.2}% -> {:?} (decode/recognize/match: {}/{}/{} ms)",
            outcome.template_variant_used,
            outcome.percentage,
            classification,
            decode_time.as_millis(),
            recognize_time.as_millis(),
            match_time.as_millis()
        );

        let breakdown = Breakdown::Fields {
            fields_found: outcome.fields_found(),
            words_detected: recognition.words.len(),
            fields: outcome.details,
        };
        Ok(VerificationReport::new(
            outcome.percentage,
            classification,
            Some(outcome.template_variant_used),
            breakdown,
        ))
    }

    /// Compare the mark's position with the reference receipts.
    pub fn verify_logo(&self, bytes: &[u8]) -> Result<VerificationReport> {
        let verifier = self
            .logo
            .as_ref()
            .ok_or_else(|| VerifyError::Config("logo verifier is not loaded".to_string()))?;

        let now = Instant::now();
        let img = decode_image(bytes)?;
        let report = verifier.verify(&img)?;
        debug!("Logo check finished in {:?}", now.elapsed());
        Ok(report)
    }

    /// Recognize the receipt's white box and extract its structured fields.
    pub async fn extract_fields(&self, bytes: &[u8]) -> Result<FieldReport> {
        let img = decode_image(bytes)?;
        let img = limit_longest_side(&img, MAX_OCR_SIDE)?;
        let img = match crop_white_box(&img)? {
            Some(cropped) => cropped,
            None => {
                debug!("White box not found or too small, recognizing the whole image");
                img
            }
        };
        let png = encode_png(&img)?;

        let recognition = self.recognizer.recognize(&png).await?;
        let sent_layout = is_sent_layout(&recognition.full_text);
        let mut fields = extract_fields(&recognition.full_text, Local::now().date_naive());
        check_line_layout(&mut fields, &recognition.full_text, &recognition.line_centers);
        if !sent_layout {
            fields
                .warnings
                .insert(0, "receipt layout not recognized".to_string());
        }
        info!(
            "Field extraction: {} words, {} warnings",
            recognition.words.len(),
            fields.warnings.len()
        );

        Ok(FieldReport {
            sent_layout,
            words_detected: recognition.words.len(),
            fields,
            full_text: recognition.full_text,
        })
    }

    /// Brand color gate and sharpness estimate.
    pub fn prefilter(&self, bytes: &[u8]) -> Result<PrefilterReport> {
        let img = decode_image(bytes)?;
        let color = color_gate(&img, &self.config.prefilter)?;
        let sharpness = sharpness(&img, &self.config.prefilter)?;
        Ok(PrefilterReport { color, sharpness })
    }
}
