//! Card verification value validation.

use crate::rules::{CardBrand, CardConfiguration};

use super::{ValidationResult, apply_rule, is_digits, resolve_brand};

/// Validates a CVV, using `pan` only to pick the brand whose CVV rule applies.
///
/// The rule is the matched brand's CVV rule, else the default CVV rule. A
/// brand without a CVV rule falls back to the default and is still reported.
/// Non-digit input is rejected; with no applicable rule any digit string,
/// including the empty one, is fully valid.
pub fn validate_cvv<'a>(
    cvv: &str,
    pan: Option<&str>,
    config: &'a CardConfiguration,
) -> (ValidationResult, Option<&'a CardBrand>) {
    let brand = pan
        .filter(|p| !p.is_empty() && is_digits(p))
        .and_then(|p| resolve_brand(p, config))
        .map(|matched| matched.brand);

    if !is_digits(cvv) {
        return (ValidationResult::REJECTED, brand);
    }

    let rule = brand
        .and_then(CardBrand::cvv)
        .or(config.defaults.cvv.as_ref());
    let result = match rule {
        Some(rule) => apply_rule(cvv, rule),
        None => ValidationResult::new(true, true),
    };
    (result, brand)
}
