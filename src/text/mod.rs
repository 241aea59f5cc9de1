// Text axis: normalization, fuzzy scores, template assignment, field extraction

pub mod fields;
pub mod similarity;
pub mod template;

pub use fields::{
    ReceiptFields, SpacingAnomaly, check_line_layout, extract_fields, is_sent_layout,
    spacing_anomaly,
};
pub use similarity::{normalize, position_similarity, text_similarity};
pub use template::{
    FieldMatchResult, MatchParams, RecognizedWord, TemplateField, TemplateMatcher,
    TemplateVariant, TextMatchOutcome,
};
