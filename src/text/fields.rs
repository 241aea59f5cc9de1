// Structured fields pulled out of the recognized full text of a receipt

use crate::consts::KNOWN_DESTINATIONS;
use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[sS]/\s*(\d+(?:[.,]\d{2})?)").unwrap());
static RECEIVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Enviado a:\s*[\r\n]+\s*([A-ZÁÉÍÓÚÑ][A-Za-záéíóúñ\s\.]+)").unwrap()
});
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{3})\s+(\d{3})\s+(\d{3})").unwrap());
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})\s+([A-Za-záéíóúñÑ]{3,10})\.?\s+(\d{4})\s+(\d{1,2}:\d{2})\s+([APap][Mm])")
        .unwrap()
});
static COMMISSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Comisi[oó]n:\s*[\r\n]+\s*([A-Z]+|[sS]/\s*\d+(?:[.,]\d{2})?)").unwrap()
});
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:C[oó]digo de operaci[oó]n:|operaci[eé]n:)\s*[\r\n]+\s*(\d{8})").unwrap()
});
static ANY_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{8})\b").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

const SENT_MARKERS: [&str; 3] = ["¡pago exitoso!", "pago exitoso", "enviado a:"];

const SYSTEM_FIELDS: [&str; 10] = [
    "código",
    "codigo",
    "operación",
    "operacion",
    "destino",
    "comisión",
    "comision",
    "gratis",
    "interbank",
    "plin",
];

/// Words that never appear on a genuine receipt, matched case-insensitively anywhere.
const FLAGGED_WORDS: [&str; 7] = [
    "PELIGRO",
    "BLOQUEADA",
    "ESTAFA",
    "FRAUDE",
    "ANULADO",
    "REEMBOLSO",
    "ERROR",
];

const MAX_EXPECTED_AMOUNT: f64 = 500.0;
const MAX_AGE_DAYS: i64 = 365;
const MAX_LINE_COUNT_GAP: usize = 3;
const SPACING_OUTLIER_FACTOR: f64 = 3.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReceiptFields {
    pub amount: Option<f64>,
    pub receiver: Option<String>,
    pub phone: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub destination: Option<String>,
    pub commission: Option<String>,
    pub operation_code: Option<String>,
    pub comment: Option<String>,
    pub flagged_words: Vec<String>,
    pub warnings: Vec<String>,
}

/// Gaps between consecutive overlay lines that break the receipt's rhythm.
#[derive(Debug, Clone, PartialEq)]
pub struct SpacingAnomaly {
    pub outliers: Vec<f64>,
    pub median_gap: f64,
}

/// True when the text carries the markers of a "payment sent" receipt.
pub fn is_sent_layout(text: &str) -> bool {
    let lower = text.to_lowercase();
    SENT_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().trim_matches('.') {
        "ene" | "enero" | "jan" => 1,
        "feb" | "febrero" => 2,
        "mar" | "marzo" => 3,
        "abr" | "abril" | "apr" => 4,
        "may" | "mayo" => 5,
        "jun" | "junio" => 6,
        "jul" | "julio" => 7,
        "ago" | "agosto" | "aug" => 8,
        "sep" | "sept" | "septiembre" => 9,
        "oct" | "octubre" => 10,
        "nov" | "noviembre" => 11,
        "dic" | "diciembre" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Line following the first `Destino:` line, if it names a known destination.
fn destination_after_label(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    for (i, line) in lines.iter().enumerate() {
        if !(line.to_lowercase().contains("destino") && line.contains(':')) {
            continue;
        }
        let Some(next) = lines.get(i + 1) else {
            continue;
        };
        let candidate = next.trim();
        if let Some(known) = KNOWN_DESTINATIONS
            .iter()
            .find(|d| **d == candidate || d.to_lowercase() == candidate.to_lowercase())
        {
            return Some(known.to_string());
        }
    }
    None
}

fn comment_after_date(text: &str, date: &str) -> Option<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    let date_parts: Vec<&str> = date.split_whitespace().collect();

    let (i, _) = lines
        .iter()
        .enumerate()
        .find(|(_, line)| date_parts.iter().any(|part| line.contains(part)))?;
    let candidate = lines.get(i + 1)?.trim();
    if candidate.chars().count() <= 3 {
        return None;
    }
    let lower = candidate.to_lowercase();
    if SYSTEM_FIELDS.iter().any(|field| lower.contains(field)) {
        return None;
    }
    Some(candidate.to_string())
}

fn check_date(fields: &mut ReceiptFields, day: &str, month: &str, year: &str, today: NaiveDate) {
    let Some(month_num) = month_number(month) else {
        fields.warnings.push(format!("Unrecognized month: {}", month));
        return;
    };
    let parsed = match (year.parse::<i32>(), day.parse::<u32>()) {
        (Ok(y), Ok(d)) => NaiveDate::from_ymd_opt(y, month_num, d),
        _ => None,
    };
    let Some(date) = parsed else {
        fields.warnings.push("Date does not exist in the calendar".to_string());
        return;
    };
    if date > today {
        fields.warnings.push("Date is in the future".to_string());
    }
    if (today - date).num_days() > MAX_AGE_DAYS {
        fields.warnings.push("Date is older than one year".to_string());
    }
}

/// Extract the known receipt fields from recognized text.
///
/// Missing or implausible values never fail the extraction; they are noted in
/// `warnings`. `today` anchors the date plausibility checks.
pub fn extract_fields(text: &str, today: NaiveDate) -> ReceiptFields {
    let mut fields = ReceiptFields::default();

    match AMOUNT_RE.captures(text) {
        Some(caps) => match caps[1].replace(',', ".").parse::<f64>() {
            Ok(amount) => {
                fields.amount = Some(amount);
                if amount <= 0.0 {
                    fields.warnings.push("Amount must be greater than 0".to_string());
                } else if amount > MAX_EXPECTED_AMOUNT {
                    fields.warnings.push(format!("Amount is unusually high (over S/ {})", MAX_EXPECTED_AMOUNT));
                }
            }
            Err(_) => fields.warnings.push("Amount could not be parsed".to_string()),
        },
        None => fields.warnings.push("Amount not detected".to_string()),
    }

    match RECEIVER_RE.captures(text) {
        Some(caps) => {
            let raw = caps[1].trim();
            let first_line = raw.split('\n').next().unwrap_or_default().trim();
            fields.receiver = Some(WHITESPACE_RE.replace_all(first_line, " ").to_string());
        }
        None => fields.warnings.push("Receiver name not detected".to_string()),
    }

    match PHONE_RE.captures(text) {
        Some(caps) => fields.phone = Some(format!("{} {} {}", &caps[1], &caps[2], &caps[3])),
        None => fields.warnings.push("Phone number not detected".to_string()),
    }

    match DATE_RE.captures(text) {
        Some(caps) => {
            fields.date = Some(format!("{} {} {}", &caps[1], &caps[2], &caps[3]));
            fields.time = Some(format!("{} {}", &caps[4], caps[5].to_uppercase()));
            check_date(&mut fields, &caps[1], &caps[2], &caps[3], today);
        }
        None => fields.warnings.push("Date or time not detected".to_string()),
    }

    match destination_after_label(text) {
        Some(destination) => fields.destination = Some(destination),
        None => fields.warnings.push("Destination not detected".to_string()),
    }

    match COMMISSION_RE.captures(text) {
        Some(caps) => fields.commission = Some(caps[1].trim().to_uppercase()),
        None => fields.warnings.push("Commission not detected".to_string()),
    }

    fields.operation_code = CODE_RE
        .captures(text)
        .or_else(|| ANY_CODE_RE.captures(text))
        .map(|caps| caps[1].to_string());
    if fields.operation_code.is_none() {
        fields.warnings.push("Operation code not detected".to_string());
    }

    if let Some(date) = fields.date.clone() {
        fields.comment = comment_after_date(text, &date);
    }

    let upper = text.to_uppercase();
    for word in FLAGGED_WORDS.iter().filter(|w| upper.contains(**w)) {
        fields.flagged_words.push(word.to_string());
        fields
            .warnings
            .push(format!("Suspicious word detected: {}", word));
    }

    fields
}

/// Gaps larger than three times the median gap between consecutive line
/// centers.
pub fn spacing_anomaly(line_centers: &[f64]) -> Option<SpacingAnomaly> {
    if line_centers.len() < 2 {
        return None;
    }
    let gaps: Vec<f64> = line_centers
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .collect();

    let mut sorted = gaps.clone();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median_gap = if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    };

    let outliers: Vec<f64> = gaps
        .into_iter()
        .filter(|gap| *gap > median_gap * SPACING_OUTLIER_FACTOR)
        .collect();
    if outliers.is_empty() {
        return None;
    }
    Some(SpacingAnomaly {
        outliers,
        median_gap,
    })
}

/// Check the overlay line geometry against the recognized text lines.
///
/// Does nothing when the recognizer reported no line geometry.
pub fn check_line_layout(fields: &mut ReceiptFields, text: &str, line_centers: &[f64]) {
    if line_centers.is_empty() {
        return;
    }

    let text_lines = text.lines().filter(|l| !l.trim().is_empty()).count();
    if line_centers.len().abs_diff(text_lines) > MAX_LINE_COUNT_GAP {
        fields.warnings.push(format!(
            "Overlay has {} lines but the text has {}",
            line_centers.len(),
            text_lines
        ));
    }

    if let Some(anomaly) = spacing_anomaly(line_centers) {
        fields.warnings.push(format!(
            "Irregular vertical spacing: gaps {:?} against a median of {:.1}",
            anomaly.outliers, anomaly.median_gap
        ));
    }
}
