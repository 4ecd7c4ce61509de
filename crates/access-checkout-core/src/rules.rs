/// Card rule-set data model.
///
/// A [`CardConfiguration`] holds an ordered list of [`CardBrand`] records and
/// a set of [`CardDefaults`]. Every validator in [`crate::validation`] reads a
/// configuration snapshot and never mutates it; replacing the rule set means
/// building a new value and swapping it in.
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Built-in patterns
// ---------------------------------------------------------------------------

/// Matcher applied to any field whose rule omits a pattern in a remote
/// document.
pub const DEFAULT_MATCHER: &str = "^[0-9]*$";

/// Matcher for the two-digit expiry month, accepting valid prefixes (`0`,
/// `1`) as well as `01`–`12`.
pub const MONTH_MATCHER: &str = "^0[1-9]{0,1}$|^1[0-2]{0,1}$";

/// Matcher for the two-digit expiry year.
pub const YEAR_MATCHER: &str = r"^\d{0,2}$";

/// Shortest PAN accepted by the built-in defaults.
pub const DEFAULT_PAN_MIN_LENGTH: usize = 12;

/// Longest PAN accepted by the built-in defaults.
pub const DEFAULT_PAN_MAX_LENGTH: usize = 19;

/// Compiles one of the constant patterns above.
#[allow(clippy::expect_used)]
fn builtin_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern compiles")
}

static BUILTIN_DEFAULTS: LazyLock<CardDefaults> = LazyLock::new(|| {
    let digits = builtin_regex(DEFAULT_MATCHER);
    CardDefaults {
        pan: Some(
            CardValidationRule::from_regex(digits.clone())
                .with_valid_lengths((DEFAULT_PAN_MIN_LENGTH..=DEFAULT_PAN_MAX_LENGTH).collect::<Vec<_>>()),
        ),
        cvv: Some(CardValidationRule::from_regex(digits).with_valid_lengths([3, 4])),
        month: Some(CardValidationRule::from_regex(builtin_regex(MONTH_MATCHER)).with_valid_lengths([2])),
        year: Some(CardValidationRule::from_regex(builtin_regex(YEAR_MATCHER)).with_valid_lengths([2])),
    }
});

// ---------------------------------------------------------------------------
// RuleError
// ---------------------------------------------------------------------------

/// Error raised while building a rule from untrusted input.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// The matcher is not a valid regular expression.
    #[error("invalid matcher pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The offending pattern text.
        pattern: String,
        /// The regex compiler's diagnosis.
        #[source]
        source: regex::Error,
    },

    /// `minLength` is greater than `maxLength`.
    #[error("minimum length {min} exceeds maximum length {max}")]
    InvertedBounds {
        /// Configured lower bound.
        min: usize,
        /// Configured upper bound.
        max: usize,
    },

    /// A length of zero appears in `validLengths`.
    #[error("valid lengths must be positive")]
    ZeroLength,
}

// ---------------------------------------------------------------------------
// CardValidationRule
// ---------------------------------------------------------------------------

/// Matcher plus length constraints for a single card field.
///
/// When `valid_lengths` is non-empty it takes precedence over the min/max
/// bounds. An absent matcher accepts any digit string.
#[derive(Debug, Clone, Default)]
pub struct CardValidationRule {
    matcher: Option<Regex>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    valid_lengths: Vec<usize>,
}

impl CardValidationRule {
    /// A rule with no matcher and no length constraint.
    pub fn any() -> Self {
        Self::default()
    }

    /// Compiles `pattern` into a rule with no length constraint.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidPattern`] when `pattern` does not compile.
    pub fn with_pattern(pattern: &str) -> Result<Self, RuleError> {
        let matcher = Regex::new(pattern).map_err(|source| RuleError::InvalidPattern {
            pattern: pattern.to_owned(),
            source,
        })?;
        Ok(Self::from_regex(matcher))
    }

    /// Wraps an already compiled matcher.
    pub fn from_regex(matcher: Regex) -> Self {
        Self {
            matcher: Some(matcher),
            ..Self::default()
        }
    }

    /// Replaces the exact set of accepted lengths. Order is preserved.
    #[must_use]
    pub fn with_valid_lengths(mut self, lengths: impl Into<Vec<usize>>) -> Self {
        self.valid_lengths = lengths.into();
        self
    }

    /// Sets inclusive min/max bounds, used only when no valid lengths are set.
    #[must_use]
    pub fn with_bounds(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    /// Checks the structural constraints a hand-built rule cannot enforce at
    /// construction time.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] for inverted bounds or a zero valid length.
    pub fn checked(self) -> Result<Self, RuleError> {
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(RuleError::InvertedBounds { min, max });
            }
        }
        if self.valid_lengths.contains(&0) {
            return Err(RuleError::ZeroLength);
        }
        Ok(self)
    }

    /// The matcher's source text, if any.
    pub fn pattern(&self) -> Option<&str> {
        self.matcher.as_ref().map(Regex::as_str)
    }

    pub fn min_length(&self) -> Option<usize> {
        self.min_length
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    pub fn valid_lengths(&self) -> &[usize] {
        &self.valid_lengths
    }

    /// Returns `true` when the matcher accepts `value` (always `true` without
    /// a matcher).
    pub fn matches(&self, value: &str) -> bool {
        self.matcher.as_ref().is_none_or(|m| m.is_match(value))
    }

    /// The longest input this rule can ever accept: the largest valid length,
    /// else `max_length`. `None` means unbounded.
    pub fn max_accepted_length(&self) -> Option<usize> {
        self.valid_lengths
            .iter()
            .copied()
            .max()
            .or(self.max_length)
    }

    /// Length of the literal digit run immediately after a leading `^`.
    ///
    /// `^493698\d*$` has specificity 6, `^4\d*$` has 1, and a pattern that
    /// starts with a group or class has 0. A rule without a matcher has 0.
    pub fn specificity(&self) -> usize {
        self.pattern()
            .and_then(|p| p.strip_prefix('^'))
            .map_or(0, |rest| rest.bytes().take_while(u8::is_ascii_digit).count())
    }
}

impl PartialEq for CardValidationRule {
    fn eq(&self, other: &Self) -> bool {
        self.pattern() == other.pattern()
            && self.min_length == other.min_length
            && self.max_length == other.max_length
            && self.valid_lengths == other.valid_lengths
    }
}

impl Eq for CardValidationRule {}

impl fmt::Display for CardValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pattern().unwrap_or("*"))?;
        if !self.valid_lengths.is_empty() {
            let lengths: Vec<String> = self.valid_lengths.iter().map(ToString::to_string).collect();
            write!(f, " lengths [{}]", lengths.join(","))
        } else {
            match (self.min_length, self.max_length) {
                (None, None) => Ok(()),
                (min, max) => write!(
                    f,
                    " lengths {}..={}",
                    min.map_or_else(String::new, |v| v.to_string()),
                    max.map_or_else(String::new, |v| v.to_string()),
                ),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// CardBrand
// ---------------------------------------------------------------------------

/// Image associated with a card brand, e.g. an SVG logo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardBrandImage {
    /// MIME type of the image, e.g. `image/svg+xml`.
    #[serde(rename = "type")]
    pub image_type: String,
    /// Where the image can be fetched from.
    pub url: String,
}

/// A card network identified by one or more PAN sub-rules.
///
/// Sub-rules are stored most specific first (see
/// [`CardValidationRule::specificity`]); rules of equal specificity keep their
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardBrand {
    name: String,
    pan_rules: Vec<CardValidationRule>,
    cvv: Option<CardValidationRule>,
    images: Vec<CardBrandImage>,
}

impl CardBrand {
    /// Creates a brand, ordering `pan_rules` by descending specificity.
    pub fn new(
        name: impl Into<String>,
        mut pan_rules: Vec<CardValidationRule>,
        cvv: Option<CardValidationRule>,
    ) -> Self {
        // sort_by_key is stable, so ties keep declaration order
        pan_rules.sort_by_key(|rule| std::cmp::Reverse(rule.specificity()));
        Self {
            name: name.into(),
            pan_rules,
            cvv,
            images: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_images(mut self, images: Vec<CardBrandImage>) -> Self {
        self.images = images;
        self
    }

    /// A copy of this brand under another name, keeping its rules and images.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pan_rules(&self) -> &[CardValidationRule] {
        &self.pan_rules
    }

    pub fn cvv(&self) -> Option<&CardValidationRule> {
        self.cvv.as_ref()
    }

    pub fn images(&self) -> &[CardBrandImage] {
        &self.images
    }

    /// The most specific sub-rule whose matcher accepts `pan`.
    pub fn matching_pan_rule(&self, pan: &str) -> Option<&CardValidationRule> {
        self.pan_rules.iter().find(|rule| rule.matches(pan))
    }
}

// ---------------------------------------------------------------------------
// CardDefaults / CardConfiguration
// ---------------------------------------------------------------------------

/// Fallback rules used when no brand matches or a brand omits a rule.
///
/// An absent field means no rule applies to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardDefaults {
    pub pan: Option<CardValidationRule>,
    pub cvv: Option<CardValidationRule>,
    pub month: Option<CardValidationRule>,
    pub year: Option<CardValidationRule>,
}

impl CardDefaults {
    /// The defaults shipped with the library: digit-only fields, PAN of 12 to
    /// 19 digits, CVV of 3 or 4 digits, two-digit month and year.
    pub fn builtin() -> Self {
        BUILTIN_DEFAULTS.clone()
    }

    /// The built-in month rule, used when a configuration has none.
    pub fn builtin_month() -> CardValidationRule {
        BUILTIN_DEFAULTS.month.clone().unwrap_or_default()
    }

    /// The built-in year rule, used when a configuration has none.
    pub fn builtin_year() -> CardValidationRule {
        BUILTIN_DEFAULTS.year.clone().unwrap_or_default()
    }
}

/// Complete rule set consumed by the validators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardConfiguration {
    /// Brands in declaration order; the first match wins.
    pub brands: Vec<CardBrand>,
    pub defaults: CardDefaults,
}

impl CardConfiguration {
    pub fn new(brands: Vec<CardBrand>, defaults: CardDefaults) -> Self {
        Self { brands, defaults }
    }

    /// No brands, built-in defaults only.
    pub fn builtin() -> Self {
        Self::new(Vec::new(), CardDefaults::builtin())
    }

    /// Looks up a brand by name, ignoring ASCII case.
    pub fn brand(&self, name: &str) -> Option<&CardBrand> {
        self.brands
            .iter()
            .find(|brand| brand.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    fn rule(pattern: &str) -> CardValidationRule {
        CardValidationRule::with_pattern(pattern).expect("valid pattern")
    }

    #[test]
    fn specificity_counts_literal_prefix_digits() {
        assert_eq!(rule(r"^493698\d*$").specificity(), 6);
        assert_eq!(rule(r"^4\d*$").specificity(), 1);
        assert_eq!(rule(r"^3[47]\d{0,13}$").specificity(), 1);
        assert_eq!(rule(r"^(5[1-5]|2[2-7])\d*$").specificity(), 0);
        assert_eq!(rule(r"4\d*").specificity(), 0);
        assert_eq!(CardValidationRule::any().specificity(), 0);
    }

    /// Sub-rules are tried from the longest literal prefix down.
    #[test]
    fn brand_orders_sub_rules_by_specificity() {
        let brand = CardBrand::new(
            "visa",
            vec![
                rule(r"^4\d*$").with_valid_lengths([16, 18, 19]),
                rule(r"^413600\d*$").with_valid_lengths([13]),
            ],
            None,
        );
        assert_eq!(brand.pan_rules()[0].pattern(), Some(r"^413600\d*$"));
        let matched = brand.matching_pan_rule("4136000000000").expect("rule");
        assert_eq!(matched.valid_lengths(), &[13]);
        let general = brand.matching_pan_rule("4111").expect("rule");
        assert_eq!(general.valid_lengths(), &[16, 18, 19]);
    }

    /// Rules with equal specificity keep their declaration order.
    #[test]
    fn brand_sub_rule_ties_are_stable() {
        let brand = CardBrand::new(
            "amex",
            vec![rule(r"^34\d*$"), rule(r"^37\d*$"), rule(r"^3\d*$")],
            None,
        );
        let patterns: Vec<_> = brand.pan_rules().iter().filter_map(CardValidationRule::pattern).collect();
        assert_eq!(patterns, vec![r"^34\d*$", r"^37\d*$", r"^3\d*$"]);
    }

    #[test]
    fn rule_without_matcher_matches_anything() {
        assert!(CardValidationRule::any().matches("123"));
        assert!(CardValidationRule::any().matches(""));
    }

    #[test]
    fn max_accepted_length_prefers_valid_lengths() {
        let r = CardValidationRule::any()
            .with_valid_lengths([16, 19, 18])
            .with_bounds(Some(1), Some(30));
        assert_eq!(r.max_accepted_length(), Some(19));
        let bounded = CardValidationRule::any().with_bounds(Some(3), Some(4));
        assert_eq!(bounded.max_accepted_length(), Some(4));
        assert_eq!(CardValidationRule::any().max_accepted_length(), None);
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = CardValidationRule::with_pattern("^[0-9").expect_err("should not compile");
        assert!(matches!(err, RuleError::InvalidPattern { .. }));
        assert!(err.to_string().contains("^[0-9"));
    }

    #[test]
    fn checked_rejects_inverted_bounds() {
        let err = CardValidationRule::any()
            .with_bounds(Some(5), Some(3))
            .checked()
            .expect_err("inverted bounds");
        assert!(matches!(err, RuleError::InvertedBounds { min: 5, max: 3 }));
    }

    #[test]
    fn checked_rejects_zero_length() {
        let err = CardValidationRule::any()
            .with_valid_lengths([0, 3])
            .checked()
            .expect_err("zero length");
        assert!(matches!(err, RuleError::ZeroLength));
    }

    #[test]
    fn builtin_defaults_cover_every_field() {
        let defaults = CardDefaults::builtin();
        let pan = defaults.pan.expect("pan default");
        assert_eq!(pan.valid_lengths(), &[12, 13, 14, 15, 16, 17, 18, 19]);
        assert_eq!(pan.pattern(), Some(DEFAULT_MATCHER));
        assert_eq!(defaults.cvv.expect("cvv default").valid_lengths(), &[3, 4]);
        assert_eq!(defaults.month.expect("month default").pattern(), Some(MONTH_MATCHER));
        assert_eq!(defaults.year.expect("year default").pattern(), Some(YEAR_MATCHER));
    }

    #[test]
    fn builtin_patterns_compile_and_match() {
        for pattern in [DEFAULT_MATCHER, MONTH_MATCHER, YEAR_MATCHER] {
            assert!(Regex::new(pattern).is_ok(), "{pattern}");
        }
        let month = CardDefaults::builtin_month();
        assert!(month.matches("1"));
        assert!(month.matches("12"));
        assert!(!month.matches("13"));
        assert!(CardDefaults::builtin_year().matches("29"));
    }

    #[test]
    fn renamed_brand_keeps_rules() {
        let visa = CardBrand::new("visa", vec![rule(r"^4\d*$")], Some(CardValidationRule::any()));
        let cobrand = visa.renamed("cartesBancaires");
        assert_eq!(cobrand.name(), "cartesBancaires");
        assert_eq!(cobrand.pan_rules(), visa.pan_rules());
        assert_eq!(cobrand.cvv(), visa.cvv());
    }

    #[test]
    fn rule_equality_compares_pattern_text() {
        assert_eq!(rule(r"^4\d*$"), rule(r"^4\d*$"));
        assert_ne!(rule(r"^4\d*$"), rule(r"^5\d*$"));
        assert_ne!(rule(r"^4\d*$"), rule(r"^4\d*$").with_valid_lengths([16]));
    }

    #[test]
    fn brand_lookup_ignores_case() {
        let config = CardConfiguration::new(
            vec![CardBrand::new("Visa", vec![rule(r"^4\d*$")], None)],
            CardDefaults::default(),
        );
        assert!(config.brand("visa").is_some());
        assert!(config.brand("VISA").is_some());
        assert!(config.brand("amex").is_none());
    }

    #[test]
    fn rule_display_lists_lengths() {
        let r = rule(r"^4\d*$").with_valid_lengths([16, 19]);
        assert_eq!(r.to_string(), r"^4\d*$ lengths [16,19]");
        let bounded = CardValidationRule::any().with_bounds(Some(3), None);
        assert_eq!(bounded.to_string(), "* lengths 3..=");
    }
}
