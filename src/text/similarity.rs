// Fuzzy text and position scores used by the template matcher

use std::collections::HashSet;

const ACCENT_FOLDS: [(char, char); 18] = [
    ('ö', 'o'),
    ('ü', 'u'),
    ('á', 'a'),
    ('é', 'e'),
    ('í', 'i'),
    ('ó', 'o'),
    ('ú', 'u'),
    ('ñ', 'n'),
    ('ä', 'a'),
    ('ë', 'e'),
    ('ï', 'i'),
    ('ô', 'o'),
    ('û', 'u'),
    ('à', 'a'),
    ('è', 'e'),
    ('ì', 'i'),
    ('ò', 'o'),
    ('ù', 'u'),
];

const STRIPPED_PUNCTUATION: [char; 3] = [':', '¡', '!'];

const CONTAINMENT_SCORE: f64 = 0.85;
const JACCARD_WEIGHT: f64 = 0.6;
const POSITIONAL_WEIGHT: f64 = 0.4;

fn fold_accent(c: char) -> char {
    ACCENT_FOLDS
        .iter()
        .find(|(accented, _)| *accented == c)
        .map(|(_, plain)| *plain)
        .unwrap_or(c)
}

/// Canonical form used for every text comparison: lower case, accents folded,
/// `:` `¡` `!` removed, surrounding whitespace trimmed.
///
/// Trimming runs last, so whitespace left in front of stripped punctuation
/// goes too: `"S/ :"` becomes `"s/"` and compares equal to `"S/"`.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .map(fold_accent)
        .collect();
    folded.trim().to_string()
}

/// Character-level similarity in `[0, 1]`.
///
/// Exact match scores 1.0 and containment 0.85. Otherwise the score blends
/// the Jaccard index of the two character sets with the share of characters
/// that agree position by position. This is not an edit distance; it is meant
/// to be forgiving toward short, noisy recognition output.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(b.as_str()) || b.contains(a.as_str()) {
        return CONTAINMENT_SCORE;
    }

    let set_a: HashSet<char> = a.chars().collect();
    let set_b: HashSet<char> = b.chars().collect();
    let common = set_a.intersection(&set_b).count();
    if common == 0 {
        return 0.0;
    }
    let jaccard = common as f64 / set_a.union(&set_b).count() as f64;

    let chars_a: Vec<char> = a.chars().collect();
    let chars_b: Vec<char> = b.chars().collect();
    let aligned = chars_a
        .iter()
        .zip(chars_b.iter())
        .filter(|(x, y)| x == y)
        .count();
    let positional = aligned as f64 / chars_a.len().max(chars_b.len()) as f64;

    JACCARD_WEIGHT * jaccard + POSITIONAL_WEIGHT * positional
}

/// Proximity of two points in `[0, 1]`: 1.0 when they coincide, falling
/// linearly to 0.0 at `max_distance` and staying there beyond it.
pub fn position_similarity(a: (i32, i32), b: (i32, i32), max_distance: f64) -> f64 {
    if max_distance <= 0.0 {
        return 0.0;
    }
    let dx = (a.0 - b.0) as f64;
    let dy = (a.1 - b.1) as f64;
    let distance = dx.hypot(dy);
    if distance >= max_distance {
        return 0.0;
    }
    ((max_distance - distance) / max_distance).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: [&str; 12] = [
        "Interbank",
        "lnterbank",
        "exitoso",
        "¡Pago exitoso!",
        "S/",
        "S/ 25.00",
        "Comisión:",
        "Comision",
        "GRATIS",
        "Código",
        "operación",
        "",
    ];

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  ¡Pago Exitoso!  "), "pago exitoso");
        assert_eq!(normalize("Comisión:"), "comision");
        assert_eq!(normalize("CÓDIGO DE OPERACIÓN"), "codigo de operacion");
        assert_eq!(normalize("Ñandú"), "nandu");
        assert_eq!(normalize("Destino :"), "destino");
        assert_eq!(normalize("S/ :"), "s/");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  "), "");
    }

    #[test]
    fn test_similarity_tiers() {
        assert_eq!(text_similarity("Comisión:", "comision"), 1.0);
        assert_eq!(text_similarity("S/", "S/25.00"), 0.85);
        assert_eq!(text_similarity("S/", "S/ :"), 1.0);
        assert_eq!(text_similarity("abc", "xyz"), 0.0);
        assert_eq!(text_similarity("", "abc"), 0.0);
        assert_eq!(text_similarity("!!", "abc"), 0.0);
    }

    #[test]
    fn test_similarity_blend() {
        // {i,n,t,e,r,b,a,k} vs {l,n,t,e,r,b,a,k}: 7 common of 9, 8 of 9 aligned
        let score = text_similarity("Interbank", "lnterbank");
        let expected = 0.6 * (7.0 / 9.0) + 0.4 * (8.0 / 9.0);
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_similarity_symmetric() {
        for a in SAMPLES {
            for b in SAMPLES {
                assert_eq!(text_similarity(a, b), text_similarity(b, a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_similarity_reflexive() {
        for a in SAMPLES.iter().filter(|s| !normalize(s).is_empty()) {
            assert_eq!(text_similarity(a, a), 1.0, "{a:?}");
        }
    }

    #[test]
    fn test_position_similarity() {
        assert_eq!(position_similarity((10, 10), (10, 10), 250.0), 1.0);
        assert_eq!(position_similarity((0, 0), (150, 200), 250.0), 0.0);
        assert_eq!(position_similarity((0, 0), (300, 0), 250.0), 0.0);
        assert!((position_similarity((0, 0), (30, 40), 250.0) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_position_similarity_monotonic() {
        let mut previous = f64::INFINITY;
        for d in 0..400 {
            let score = position_similarity((0, 0), (d, 0), 250.0);
            assert!(score <= previous);
            assert!((0.0..=1.0).contains(&score));
            if d >= 250 {
                assert_eq!(score, 0.0);
            }
            previous = score;
        }
    }
}
