// Offline recognizer replaying words saved on disk

use super::{Recognition, TextRecognizer, parse_response};
use crate::error::Result;
use crate::text::RecognizedWord;
use log::debug;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FixtureFile {
    Words(Vec<RecognizedWord>),
    Transcript {
        #[serde(default)]
        full_text: String,
        words: Vec<RecognizedWord>,
        #[serde(default)]
        line_centers: Vec<f64>,
    },
}

/// Returns the same recognition for every image.
///
/// Accepts a plain word list (`[{"text", "left", "top", ...}]`), an object
/// with `full_text`, `words` and optional `line_centers`, or a raw OCR.space
/// response body.
#[derive(Debug, Clone, Default)]
pub struct FixtureRecognizer {
    recognition: Recognition,
}

impl FixtureRecognizer {
    pub fn new(recognition: Recognition) -> Self {
        Self { recognition }
    }

    pub fn from_words(words: Vec<RecognizedWord>) -> Self {
        let full_text = words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self::new(Recognition {
            full_text,
            words,
            line_centers: Vec::new(),
        })
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(content)?;
        let is_service_response = value
            .as_object()
            .is_some_and(|o| o.contains_key("ParsedResults") || o.contains_key("IsErroredOnProcessing"));
        if is_service_response {
            return Ok(Self::new(parse_response(content)?));
        }

        Ok(match serde_json::from_value(value)? {
            FixtureFile::Words(words) => Self::from_words(words),
            FixtureFile::Transcript {
                full_text,
                words,
                line_centers,
            } => Self::new(Recognition {
                full_text,
                words,
                line_centers,
            }),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let fixture = Self::from_json(&content)?;
        debug!(
            "Loaded {} recognized words from {}",
            fixture.recognition.words.len(),
            path.display()
        );
        Ok(fixture)
    }
}

impl TextRecognizer for FixtureRecognizer {
    async fn recognize(&self, _png: &[u8]) -> Result<Recognition> {
        Ok(self.recognition.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_list() {
        let fixture =
            FixtureRecognizer::from_json(r#"[{"text": "Yape", "left": 1, "top": 2}]"#).unwrap();
        assert_eq!(fixture.recognition.words, vec![RecognizedWord::new("Yape", 1, 2)]);
        assert_eq!(fixture.recognition.full_text, "Yape");
    }

    #[test]
    fn test_transcript() {
        let fixture = FixtureRecognizer::from_json(
            r#"{"full_text": "Pago exitoso", "words": [{"WordText": "Pago", "Left": 3, "Top": 4}]}"#,
        )
        .unwrap();
        assert_eq!(fixture.recognition.full_text, "Pago exitoso");
        assert_eq!(fixture.recognition.words[0].position(), (3, 4));
    }
}
