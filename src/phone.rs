// src/phone.rs
//! Phone-number normalization.
//!
//! All matching and caching keys on the canonical digit-only form produced
//! here; formatting noise (spaces, dashes, parentheses) and international
//! prefixes never reach the rest of the pipeline.

use crate::config::PhoneRule;

/// Reduce a raw caller-ID string to its canonical comparable form.
///
/// Strips non-digits, then the `00` international prefix or a single trunk
/// `0`, then the configured country prefix, and finally keeps the trailing
/// significant digits. Prefixes are only stripped while the number is longer
/// than the significant-digit count, so short local numbers pass through
/// unchanged.
pub fn canonicalize(raw: &str, rule: &PhoneRule) -> String {
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() > rule.significant_digits {
        if let Some(rest) = digits.strip_prefix("00") {
            digits = rest.to_string();
        } else if let Some(rest) = digits.strip_prefix('0') {
            digits = rest.to_string();
        }
    }

    if let Some(prefix) = &rule.country_prefix {
        if digits.len() > rule.significant_digits {
            if let Some(rest) = digits.strip_prefix(prefix.as_str()) {
                digits = rest.to_string();
            }
        }
    }

    if digits.len() > rule.significant_digits {
        digits.split_off(digits.len() - rule.significant_digits)
    } else {
        digits
    }
}

/// Whether two canonical numbers refer to the same line.
///
/// Containment covers a stored number that still carries a country code;
/// the last-9-digits comparison covers differing codes on both sides.
pub fn numbers_match(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.contains(b) || b.contains(a) {
        return true;
    }
    a.len() >= 9 && b.len() >= 9 && a[a.len() - 9..] == b[b.len() - 9..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn us_rule() -> PhoneRule {
        PhoneRule {
            country_prefix: Some("1".to_string()),
            significant_digits: 10,
        }
    }

    #[test]
    fn formatted_us_number_canonicalizes() {
        assert_eq!(canonicalize("+1 (555) 123-4567", &us_rule()), "5551234567");
    }

    #[test]
    fn plain_ten_digit_number_passes_through() {
        assert_eq!(canonicalize("5551234567", &us_rule()), "5551234567");
    }

    #[test]
    fn international_double_zero_prefix_stripped() {
        let rule = PhoneRule {
            country_prefix: Some("359".to_string()),
            significant_digits: 9,
        };
        assert_eq!(canonicalize("00359888123456", &rule), "888123456");
        assert_eq!(canonicalize("0888123456", &rule), "888123456");
    }

    #[test]
    fn short_number_kept_whole() {
        assert_eq!(canonicalize("1034", &us_rule()), "1034");
    }

    #[test]
    fn non_digit_only_input_yields_empty() {
        assert_eq!(canonicalize("<unknown>", &us_rule()), "");
    }

    #[test]
    fn matching_handles_country_code_differences() {
        assert!(numbers_match("5551234567", "15551234567"));
        assert!(numbers_match("888123456", "359888123456"));
        assert!(!numbers_match("5551234567", "5559876543"));
        assert!(!numbers_match("", "5551234567"));
    }

    proptest! {
        // Formatting variants of the same number canonicalize identically.
        #[test]
        fn formatting_is_irrelevant(
            digits in "[2-9][0-9]{9}",
            use_plus_one in any::<bool>(),
            spaces in any::<bool>(),
        ) {
            let rule = us_rule();
            let plain = canonicalize(&digits, &rule);

            let mut decorated = String::new();
            if use_plus_one {
                decorated.push_str("+1 ");
            }
            decorated.push('(');
            decorated.push_str(&digits[..3]);
            decorated.push_str(") ");
            decorated.push_str(&digits[3..6]);
            if spaces {
                decorated.push(' ');
            } else {
                decorated.push('-');
            }
            decorated.push_str(&digits[6..]);

            prop_assert_eq!(canonicalize(&decorated, &rule), plain);
        }
    }
}
