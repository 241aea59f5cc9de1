// Text recognizer trait and implementations

use crate::error::Result;
use crate::text::RecognizedWord;

pub mod fixture;
pub mod ocr_space;

pub use fixture::FixtureRecognizer;
pub use ocr_space::{OcrSpaceClient, parse_response};

/// Output of one recognition call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recognition {
    /// Plain text as returned by the service, line breaks preserved.
    pub full_text: String,
    /// Positioned words in the order the service listed them.
    pub words: Vec<RecognizedWord>,
    /// Vertical center of every overlay line, in listing order. Empty when
    /// the recognizer reports no line geometry.
    pub line_centers: Vec<f64>,
}

/// Trait for services that turn an encoded image into positioned words
#[allow(async_fn_in_trait)]
pub trait TextRecognizer {
    /// Recognize the text of a PNG-encoded image.
    async fn recognize(&self, png: &[u8]) -> Result<Recognition>;
}

/// Wrapper enum for the available recognizers
/// This allows picking a recognizer at runtime without boxing an async trait
pub enum RecognizerWrapper {
    OcrSpace(OcrSpaceClient),
    Fixture(FixtureRecognizer),
}

impl TextRecognizer for RecognizerWrapper {
    async fn recognize(&self, png: &[u8]) -> Result<Recognition> {
        match self {
            RecognizerWrapper::OcrSpace(recognizer) => recognizer.recognize(png).await,
            RecognizerWrapper::Fixture(recognizer) => recognizer.recognize(png).await,
        }
    }
}
