/// Card-detail validation engine.
///
/// Every validator is a pure function over a [`CardConfiguration`] snapshot
/// and returns a [`ValidationResult`] for every input, malformed or not. The
/// shared length combinator [`apply_rule`] is used for PAN, CVV, month and
/// year alike; Luhn checking and brand resolution are PAN-specific layers on
/// top of it.
///
/// [`ValidationCoordinator`] ties the three validators to one atomically
/// replaceable configuration and reports overall submit readiness.
///
/// [`CardConfiguration`]: crate::rules::CardConfiguration
pub mod coordinator;
pub mod cvv;
pub mod date;
pub mod pan;

use std::fmt;

use serde::Serialize;

use crate::rules::CardValidationRule;

pub use coordinator::{CardFields, ValidationCoordinator, ValidationReport};
pub use cvv::validate_cvv;
pub use date::{Clock, SystemClock, can_update_date, validate_date};
pub use pan::{BrandMatch, resolve_brand, validate_pan};


// ---------------------------------------------------------------------------
// ValidationResult
// ---------------------------------------------------------------------------

/// Outcome of validating one field.
///
/// `partial` means the current input is a valid prefix of some acceptable
/// value; `complete` means the input is itself acceptable. The flags are
/// independent and all four combinations occur:
///
/// | partial | complete | meaning                                   |
/// |---------|----------|-------------------------------------------|
/// | true    | true     | valid and may still grow                  |
/// | true    | false    | valid prefix, needs more input            |
/// | false   | true     | valid, no further input accepted          |
/// | false   | false    | rejected                                  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ValidationResult {
    pub partial: bool,
    pub complete: bool,
}

impl ValidationResult {
    /// Both flags cleared.
    pub const REJECTED: Self = Self::new(false, false);

    pub const fn new(partial: bool, complete: bool) -> Self {
        Self { partial, complete }
    }

    /// Returns `true` when neither flag is set.
    pub fn is_rejected(&self) -> bool {
        !self.partial && !self.complete
    }

    /// Clears `complete`, keeping `partial` as is.
    #[must_use]
    pub fn incomplete(self) -> Self {
        Self {
            complete: false,
            ..self
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match (self.partial, self.complete) {
            (true, true) => "complete (extendable)",
            (false, true) => "complete",
            (true, false) => "partial",
            (false, false) => "invalid",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Shared combinator
// ---------------------------------------------------------------------------

/// Applies `rule`'s matcher and length constraint to `value`.
///
/// A matcher mismatch rejects the value outright. With `valid_lengths` set,
/// `complete` means the length is one of them and `partial` means it does not
/// exceed the largest. Otherwise `complete` requires both `min_length` and
/// `max_length` to hold and `partial` requires only `max_length`; an absent
/// bound holds trivially.
///
/// # Examples
///
/// ```
/// use access_checkout_core::rules::CardValidationRule;
/// use access_checkout_core::validation::{ValidationResult, apply_rule};
///
/// let cvv = CardValidationRule::any().with_bounds(Some(3), Some(4));
/// assert_eq!(apply_rule("12", &cvv), ValidationResult::new(true, false));
/// assert_eq!(apply_rule("1234", &cvv), ValidationResult::new(true, true));
/// assert_eq!(apply_rule("12345", &cvv), ValidationResult::new(false, false));
/// ```
pub fn apply_rule(value: &str, rule: &CardValidationRule) -> ValidationResult {
    if !rule.matches(value) {
        return ValidationResult::REJECTED;
    }
    let len = value.chars().count();

    let lengths = rule.valid_lengths();
    if let Some(&longest) = lengths.iter().max() {
        return ValidationResult::new(len <= longest, lengths.contains(&len));
    }

    let below_max = rule.max_length().is_none_or(|max| len <= max);
    let above_min = rule.min_length().is_none_or(|min| len >= min);
    ValidationResult::new(below_max, below_max && above_min)
}

/// Returns `true` when `value` consists only of ASCII digits (an empty string
/// qualifies).
pub(crate) fn is_digits(value: &str) -> bool {
    value.bytes().all(|b| b.is_ascii_digit())
}
