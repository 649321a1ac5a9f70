use rust_decimal::Decimal;

use crate::domain::catalog::Unit;

pub const UNIT_PATTERN_CONFIDENCE: f64 = 0.9;
pub const BARE_NUMBER_CONFIDENCE: f64 = 0.5;

#[derive(Clone, Debug, PartialEq)]
pub struct QuantityMatch {
    pub quantity: Decimal,
    pub unit: Unit,
    pub confidence: f64,
}

// Keyword phrases per unit, pre-split on whitespace. Unit-specific patterns
// are tried in this order before the bare-number fallback, so "2 coats"
// stays a bare number instead of becoming "2 each".
const SQFT_KEYWORDS: &[&[&str]] = &[
    &["sqft"],
    &["sq", "ft"],
    &["square", "feet"],
    &["square", "foot"],
    &["sf"],
];
const LF_KEYWORDS: &[&[&str]] = &[
    &["lf"],
    &["lin", "ft"],
    &["linear", "feet"],
    &["linear", "foot"],
    &["linear", "ft"],
];
const EACH_KEYWORDS: &[&[&str]] =
    &[&["each"], &["ea"], &["units"], &["unit"], &["pieces"], &["pcs"]];
const HOUR_KEYWORDS: &[&[&str]] = &[&["hours"], &["hour"], &["hrs"], &["hr"]];
const DAY_KEYWORDS: &[&[&str]] = &[&["days"], &["day"]];

const UNIT_PATTERNS: &[(Unit, &[&[&str]])] = &[
    (Unit::Sqft, SQFT_KEYWORDS),
    (Unit::Lf, LF_KEYWORDS),
    (Unit::Each, EACH_KEYWORDS),
    (Unit::Hour, HOUR_KEYWORDS),
    (Unit::Day, DAY_KEYWORDS),
];

/// Scan a description for a quantity paired with a unit.
///
/// The first unit-specific pattern with a numeric literal immediately before
/// one of its keywords wins (confidence 0.9). Joined forms like "800sf"
/// count as adjacent. If no unit pattern matches, the first bare numeric
/// literal is taken with unit "each" (confidence 0.5). No numeral at all
/// means no match.
pub fn extract_quantity(text: &str) -> Option<QuantityMatch> {
    let tokens = tokenize(text);

    for (unit, keywords) in UNIT_PATTERNS {
        for index in 0..tokens.len() {
            let Some(quantity) = parse_number(&tokens[index]) else {
                continue;
            };
            let adjacent = keywords.iter().any(|phrase| phrase_at(&tokens, index + 1, phrase));
            if adjacent {
                return Some(QuantityMatch {
                    quantity,
                    unit: *unit,
                    confidence: UNIT_PATTERN_CONFIDENCE,
                });
            }
        }
    }

    tokens.iter().find_map(parse_number_ref).map(|quantity| QuantityMatch {
        quantity,
        unit: Unit::Each,
        confidence: BARE_NUMBER_CONFIDENCE,
    })
}

fn phrase_at(tokens: &[String], start: usize, phrase: &[&str]) -> bool {
    tokens.len() >= start + phrase.len()
        && phrase.iter().enumerate().all(|(offset, word)| tokens[start + offset] == *word)
}

fn parse_number_ref(token: &String) -> Option<Decimal> {
    parse_number(token)
}

fn parse_number(token: &str) -> Option<Decimal> {
    let trimmed = token.trim_end_matches('.');
    if trimmed.is_empty() || !trimmed.chars().next().is_some_and(|ch| ch.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<Decimal>().ok()
}

/// Lowercased word/number tokens. Digit and letter runs are split apart so
/// joined forms like "800sf" become ["800", "sf"]; a decimal point inside a
/// digit run stays part of the number.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut numeric = false;

    for ch in text.chars() {
        if ch.is_ascii_digit() {
            if !current.is_empty() && !numeric {
                tokens.push(std::mem::take(&mut current));
            }
            numeric = true;
            current.push(ch);
        } else if ch == '.' && numeric && !current.is_empty() {
            current.push(ch);
        } else if ch.is_alphabetic() {
            if !current.is_empty() && numeric {
                tokens.push(std::mem::take(&mut current));
            }
            numeric = false;
            current.extend(ch.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::catalog::Unit;

    use super::{extract_quantity, BARE_NUMBER_CONFIDENCE, UNIT_PATTERN_CONFIDENCE};

    #[test]
    fn recognizes_square_footage() {
        let matched = extract_quantity("800 sf of plank flooring").expect("match");
        assert_eq!(matched.quantity, Decimal::from(800));
        assert_eq!(matched.unit, Unit::Sqft);
        assert_eq!(matched.confidence, UNIT_PATTERN_CONFIDENCE);
    }

    #[test]
    fn recognizes_joined_number_and_unit() {
        let matched = extract_quantity("install 120lf of baseboard").expect("match");
        assert_eq!(matched.quantity, Decimal::from(120));
        assert_eq!(matched.unit, Unit::Lf);
        assert_eq!(matched.confidence, UNIT_PATTERN_CONFIDENCE);
    }

    #[test]
    fn recognizes_decimal_hours() {
        let matched = extract_quantity("about 4.5 hours of demo work").expect("match");
        assert_eq!(matched.quantity, Decimal::new(45, 1));
        assert_eq!(matched.unit, Unit::Hour);
    }

    #[test]
    fn recognizes_multiword_unit_keyword() {
        let matched = extract_quantity("1200 square feet of drywall").expect("match");
        assert_eq!(matched.quantity, Decimal::from(1200));
        assert_eq!(matched.unit, Unit::Sqft);
    }

    #[test]
    fn bare_number_falls_back_to_each() {
        let matched = extract_quantity("we need 12").expect("match");
        assert_eq!(matched.quantity, Decimal::from(12));
        assert_eq!(matched.unit, Unit::Each);
        assert_eq!(matched.confidence, BARE_NUMBER_CONFIDENCE);
    }

    #[test]
    fn unknown_unit_word_is_not_promoted_past_fallback() {
        let matched = extract_quantity("paint the living room, 2 coats").expect("match");
        assert_eq!(matched.quantity, Decimal::from(2));
        assert_eq!(matched.unit, Unit::Each);
        assert_eq!(matched.confidence, BARE_NUMBER_CONFIDENCE);
    }

    #[test]
    fn no_numeral_means_no_match() {
        assert_eq!(extract_quantity("repaint the hallway ceiling"), None);
    }

    #[test]
    fn unit_pattern_wins_over_earlier_bare_number() {
        let matched = extract_quantity("2 rooms, 600 sqft total").expect("match");
        assert_eq!(matched.quantity, Decimal::from(600));
        assert_eq!(matched.unit, Unit::Sqft);
        assert_eq!(matched.confidence, UNIT_PATTERN_CONFIDENCE);
    }
}
