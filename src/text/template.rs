// Greedy alignment of a word template against recognized words

use super::similarity::{position_similarity, text_similarity};
use crate::consts::{
    ACCEPT_THRESHOLD, CANDIDATE_TEXT_THRESHOLD, FieldSpec, MAX_POSITION_DISTANCE,
    POSITION_WEIGHT, RECEIVED_TEMPLATE, RECEIVED_VARIANT, SENT_TEMPLATE, SENT_VARIANT, TEXT_WEIGHT,
};
use crate::utils::round2;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Expected keyword of a receipt layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateField {
    pub key: String,
    pub expected_text: String,
    pub reference_position: (i32, i32),
    pub weight: f64,
}

impl TemplateField {
    pub fn new(expected_text: &str, reference_position: (i32, i32), weight: f64) -> Self {
        Self {
            key: expected_text.to_string(),
            expected_text: expected_text.to_string(),
            reference_position,
            weight,
        }
    }
}

impl From<&FieldSpec> for TemplateField {
    fn from(spec: &FieldSpec) -> Self {
        Self::new(spec.text, (spec.left, spec.top), spec.weight)
    }
}

/// Named, ordered list of template fields describing one receipt layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateVariant {
    pub name: String,
    pub fields: Vec<TemplateField>,
}

impl TemplateVariant {
    pub fn from_specs(name: &str, specs: &[FieldSpec]) -> Self {
        Self {
            name: name.to_string(),
            fields: specs.iter().map(TemplateField::from).collect(),
        }
    }

    /// The "sent" and "received" layouts, in that order.
    pub fn builtin() -> Vec<TemplateVariant> {
        vec![
            Self::from_specs(SENT_VARIANT, &SENT_TEMPLATE),
            Self::from_specs(RECEIVED_VARIANT, &RECEIVED_TEMPLATE),
        ]
    }

    pub fn total_weight(&self) -> f64 {
        self.fields.iter().map(|f| f.weight).sum()
    }
}

/// A word returned by the text-recognition service, positioned by its top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedWord {
    #[serde(alias = "WordText")]
    pub text: String,
    #[serde(alias = "Left")]
    pub left: i32,
    #[serde(alias = "Top")]
    pub top: i32,
    #[serde(alias = "Height", default)]
    pub height: i32,
    #[serde(alias = "Width", default)]
    pub width: i32,
}

impl RecognizedWord {
    pub fn new(text: &str, left: i32, top: i32) -> Self {
        Self {
            text: text.to_string(),
            left,
            top,
            height: 0,
            width: 0,
        }
    }

    pub fn position(&self) -> (i32, i32) {
        (self.left, self.top)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMatchResult {
    pub field_key: String,
    pub matched_text: Option<String>,
    pub confidence: f64,
    /// Index of the assigned word in the recognizer's output.
    #[serde(skip)]
    pub word_index: Option<usize>,
}

impl FieldMatchResult {
    fn unmatched(field_key: &str) -> Self {
        Self {
            field_key: field_key.to_string(),
            matched_text: None,
            confidence: 0.0,
            word_index: None,
        }
    }

    pub fn is_matched(&self) -> bool {
        self.matched_text.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextMatchOutcome {
    pub percentage: f64,
    pub details: Vec<FieldMatchResult>,
    pub template_variant_used: String,
}

impl TextMatchOutcome {
    pub fn fields_found(&self) -> usize {
        self.details.iter().filter(|d| d.is_matched()).count()
    }
}

/// Thresholds and weights of the assignment pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Minimum text similarity before a word is considered at all.
    pub candidate_text_threshold: f64,
    /// Minimum combined score for a word to be assigned.
    pub accept_threshold: f64,
    pub text_weight: f64,
    pub position_weight: f64,
    pub max_position_distance: f64,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            candidate_text_threshold: CANDIDATE_TEXT_THRESHOLD,
            accept_threshold: ACCEPT_THRESHOLD,
            text_weight: TEXT_WEIGHT,
            position_weight: POSITION_WEIGHT,
            max_position_distance: MAX_POSITION_DISTANCE,
        }
    }
}

/// Scores recognized words against a set of template variants.
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    variants: Vec<TemplateVariant>,
    params: MatchParams,
}

impl TemplateMatcher {
    pub fn new(variants: Vec<TemplateVariant>, params: MatchParams) -> Self {
        Self { variants, params }
    }

    pub fn variants(&self) -> &[TemplateVariant] {
        &self.variants
    }

    /// Align one variant against `words`.
    ///
    /// Fields are visited in template order and words in the order supplied;
    /// each field takes the best unused word, and a word claimed by an earlier
    /// field is never offered to a later one. Only a strictly better score
    /// replaces the current best, so on exact ties the earliest word wins.
    pub fn score_variant(&self, variant: &TemplateVariant, words: &[RecognizedWord]) -> TextMatchOutcome {
        let params = &self.params;
        let total_weight = variant.total_weight();

        if variant.fields.is_empty() || words.is_empty() || total_weight <= 0.0 {
            return TextMatchOutcome {
                percentage: 0.0,
                details: Vec::new(),
                template_variant_used: variant.name.clone(),
            };
        }

        let mut used = vec![false; words.len()];
        let mut accumulated = 0.0;
        let mut details = Vec::with_capacity(variant.fields.len());

        for field in &variant.fields {
            let mut best_score = 0.0;
            let mut best_index: Option<usize> = None;

            for (i, word) in words.iter().enumerate() {
                if used[i] {
                    continue;
                }
                let text_score = text_similarity(&field.expected_text, &word.text);
                if text_score <= params.candidate_text_threshold {
                    continue;
                }
                let position_score = position_similarity(
                    field.reference_position,
                    word.position(),
                    params.max_position_distance,
                );
                let score = params.text_weight * text_score + params.position_weight * position_score;
                if score > best_score {
                    best_score = score;
                    best_index = Some(i);
                }
            }

            match best_index {
                Some(i) if best_score > params.accept_threshold => {
                    used[i] = true;
                    accumulated += field.weight * best_score;
                    details.push(FieldMatchResult {
                        field_key: field.key.clone(),
                        matched_text: Some(words[i].text.clone()),
                        confidence: best_score,
                        word_index: Some(i),
                    });
                }
                _ => details.push(FieldMatchResult::unmatched(&field.key)),
            }
        }

        let percentage = round2((100.0 * accumulated / total_weight).clamp(0.0, 100.0));
        debug!(
            "Variant '{}': {:.2}% ({} of {} fields)",
            variant.name,
            percentage,
            details.iter().filter(|d| d.is_matched()).count(),
            details.len()
        );

        TextMatchOutcome {
            percentage,
            details,
            template_variant_used: variant.name.clone(),
        }
    }

    /// Score every variant and keep the highest percentage; ties keep the
    /// variant listed first. Percentages are already rounded to 2 decimals, so
    /// variants that only differ past the second decimal tie. `None` only when
    /// no variant is configured.
    pub fn best_match(&self, words: &[RecognizedWord]) -> Option<TextMatchOutcome> {
        let outcomes: Vec<TextMatchOutcome> = self
            .variants
            .par_iter()
            .map(|variant| self.score_variant(variant, words))
            .collect();

        outcomes
            .into_iter()
            .reduce(|best, outcome| if outcome.percentage > best.percentage { outcome } else { best })
    }
}
