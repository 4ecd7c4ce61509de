//! Primary account number validation and brand resolution.

use crate::luhn::luhn_valid;
use crate::rules::{CardBrand, CardConfiguration, CardValidationRule};

use super::{ValidationResult, apply_rule, is_digits};

/// A brand together with the sub-rule that selected it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrandMatch<'a> {
    pub brand: &'a CardBrand,
    pub rule: &'a CardValidationRule,
}

/// Finds the brand for a (possibly partial) PAN.
///
/// Brands are tried in declaration order and, within a brand, sub-rules from
/// most to least specific. The first sub-rule whose matcher accepts `pan`
/// decides. Callers are expected to pass digit-only input.
pub fn resolve_brand<'a>(pan: &str, config: &'a CardConfiguration) -> Option<BrandMatch<'a>> {
    config.brands.iter().find_map(|brand| {
        brand
            .matching_pan_rule(pan)
            .map(|rule| BrandMatch { brand, rule })
    })
}

/// Validates a PAN against `config`.
///
/// - Empty input is a valid prefix: `(true, false)` when a default PAN rule
///   exists, `(true, true)` otherwise.
/// - Any non-digit character rejects the input before brand matching.
/// - A matched brand's sub-rule is authoritative; the defaults are only used
///   when no brand matches.
/// - With no applicable rule at all the result is `partial`, and `complete`
///   exactly when the Luhn check passes.
/// - A result that would be `complete` is downgraded when the Luhn check
///   fails; `partial` is never affected by Luhn.
pub fn validate_pan<'a>(
    pan: &str,
    config: &'a CardConfiguration,
) -> (ValidationResult, Option<&'a CardBrand>) {
    if pan.is_empty() {
        let complete = config.defaults.pan.is_none();
        return (ValidationResult::new(true, complete), None);
    }
    if !is_digits(pan) {
        return (ValidationResult::REJECTED, None);
    }

    let (result, brand) = match resolve_brand(pan, config) {
        Some(matched) => (apply_rule(pan, matched.rule), Some(matched.brand)),
        None => match config.defaults.pan.as_ref() {
            Some(rule) => (apply_rule(pan, rule), None),
            None => return (ValidationResult::new(true, luhn_valid(pan)), None),
        },
    };

    if result.complete && !luhn_valid(pan) {
        (result.incomplete(), brand)
    } else {
        (result, brand)
    }
}
