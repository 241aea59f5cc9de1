// OCR.space HTTP client

use super::{Recognition, TextRecognizer};
use crate::config::OcrConfig;
use crate::error::{Result, VerifyError};
use crate::text::RecognizedWord;
use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::{Duration, Instant};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OcrSpaceResponse {
    #[serde(default)]
    parsed_results: Option<Vec<ParsedResult>>,
    #[serde(default)]
    is_errored_on_processing: bool,
    #[serde(default)]
    error_message: Option<ErrorMessage>,
}

/// The service sends either a single message or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorMessage {
    One(String),
    Many(Vec<String>),
}

impl ErrorMessage {
    fn joined(&self) -> String {
        match self {
            ErrorMessage::One(message) => message.clone(),
            ErrorMessage::Many(messages) => messages.join("; "),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: String,
    #[serde(default)]
    text_overlay: Option<TextOverlay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TextOverlay {
    #[serde(default)]
    lines: Vec<OverlayLine>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OverlayLine {
    #[serde(default)]
    words: Vec<OverlayWord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OverlayWord {
    word_text: String,
    left: f64,
    top: f64,
    #[serde(default)]
    height: f64,
    #[serde(default)]
    width: f64,
}

impl OverlayLine {
    /// Topmost word edge plus half the mean word height, `None` for an empty line.
    fn center(&self) -> Option<f64> {
        let top = self.words.iter().map(|w| w.top).reduce(f64::min)?;
        let mean_height =
            self.words.iter().map(|w| w.height).sum::<f64>() / self.words.len() as f64;
        Some(top + mean_height / 2.0)
    }
}

impl From<OverlayWord> for RecognizedWord {
    fn from(word: OverlayWord) -> Self {
        RecognizedWord {
            text: word.word_text,
            left: word.left.round() as i32,
            top: word.top.round() as i32,
            height: word.height.round() as i32,
            width: word.width.round() as i32,
        }
    }
}

/// Turn a raw OCR.space response body into a [`Recognition`].
///
/// Words are flattened across results and lines in the order listed, and
/// every non-empty line contributes its vertical center. The parsed texts of
/// all results are joined with a line break.
pub fn parse_response(body: &str) -> Result<Recognition> {
    let response: OcrSpaceResponse =
        serde_json::from_str(body).map_err(|e| VerifyError::MalformedResponse(e.to_string()))?;

    if response.is_errored_on_processing {
        let message = response
            .error_message
            .map(|m| m.joined())
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(VerifyError::RecognitionFailed(message));
    }

    let results = response
        .parsed_results
        .ok_or_else(|| VerifyError::MalformedResponse("missing ParsedResults".to_string()))?;

    let mut texts = Vec::new();
    let mut words = Vec::new();
    let mut line_centers = Vec::new();
    for result in results {
        if !result.parsed_text.is_empty() {
            texts.push(result.parsed_text);
        }
        let Some(overlay) = result.text_overlay else {
            continue;
        };
        for line in overlay.lines {
            line_centers.extend(line.center());
            words.extend(line.words.into_iter().map(RecognizedWord::from));
        }
    }

    Ok(Recognition {
        full_text: texts.join("\n"),
        words,
        line_centers,
    })
}

/// Recognizer backed by the OCR.space REST API.
pub struct OcrSpaceClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    language: String,
    engine: u8,
    timeout: Duration,
}

impl OcrSpaceClient {
    pub fn new(config: &OcrConfig, api_key: &str) -> Result<Self> {
        let timeout = config.timeout();
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: api_key.to_string(),
            language: config.language.clone(),
            engine: config.engine,
            timeout,
        })
    }

    fn map_transport_error(&self, e: reqwest::Error) -> VerifyError {
        if e.is_timeout() {
            VerifyError::RecognitionTimeout(self.timeout)
        } else {
            VerifyError::Http(e)
        }
    }
}

impl TextRecognizer for OcrSpaceClient {
    async fn recognize(&self, png: &[u8]) -> Result<Recognition> {
        let now = Instant::now();
        let file = Part::bytes(png.to_vec())
            .file_name("receipt.png")
            .mime_str("image/png")?;
        let form = Form::new()
            .text("apikey", self.api_key.clone())
            .text("language", self.language.clone())
            .text("isOverlayRequired", "true")
            .text("scale", "true")
            .text("OCREngine", self.engine.to_string())
            .part("file", file);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Recognition service answered with HTTP {}", status);
            return Err(VerifyError::RecognitionStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        debug!("Recognition response: {} bytes", body.len());

        let recognition = parse_response(&body)?;
        let elapsed = now.elapsed();
        if elapsed > Duration::from_secs(10) {
            warn!("Recognition took too long: {:?}", elapsed);
        }
        info!(
            "Recognized {} words in {:?}",
            recognition.words.len(),
            elapsed
        );
        Ok(recognition)
    }
}
