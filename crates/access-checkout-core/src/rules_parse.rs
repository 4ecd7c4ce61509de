//! Parsing of card rule-set documents into [`CardConfiguration`].
//!
//! Two JSON shapes are accepted:
//!
//! - the structured form `{ "brands": [...], "defaults": {...} }`, where a
//!   brand's `pan` is a single rule or a list of sub-rules;
//! - the flat array published by the remote card-type feed,
//!   `[{ "name", "pattern", "panLengths", "cvvLength", "images" }]`, which is
//!   combined with [`CardDefaults::builtin`].
//!
//! Fetching the document is the caller's concern; this module only turns text
//! into a validated rule set.

use serde::Deserialize;

use crate::rules::{
    CardBrand, CardBrandImage, CardConfiguration, CardDefaults, CardValidationRule,
    DEFAULT_MATCHER, RuleError,
};

/// Error produced by [`parse_card_configuration`].
#[derive(Debug, thiserror::Error)]
pub enum CardConfigurationError {
    /// The document is empty or whitespace.
    #[error("card configuration document is empty")]
    Empty,

    /// The document is not JSON, or does not have either accepted shape.
    #[error("card configuration is not valid: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level value is neither an object nor an array.
    #[error("card configuration must be a JSON object or array, found {found}")]
    UnexpectedShape {
        /// JSON type name of the value found.
        found: &'static str,
    },

    /// A rule inside the document could not be built.
    #[error("invalid {field} rule for {owner}: {source}")]
    Rule {
        /// Brand name, or `defaults`.
        owner: String,
        /// Which field the rule belongs to (`pan`, `cvv`, `month`, `year`).
        field: &'static str,
        #[source]
        source: RuleError,
    },
}

// ---------------------------------------------------------------------------
// Raw document shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRule {
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    min_length: Option<usize>,
    #[serde(default)]
    max_length: Option<usize>,
    #[serde(default)]
    valid_lengths: Vec<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRules {
    One(RawRule),
    Many(Vec<RawRule>),
}

#[derive(Debug, Deserialize)]
struct RawBrand {
    name: String,
    pan: RawRules,
    #[serde(default)]
    cvv: Option<RawRule>,
    #[serde(default)]
    images: Vec<CardBrandImage>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDefaults {
    #[serde(default)]
    pan: Option<RawRule>,
    #[serde(default)]
    cvv: Option<RawRule>,
    #[serde(default)]
    month: Option<RawRule>,
    #[serde(default)]
    year: Option<RawRule>,
}

#[derive(Debug, Deserialize)]
struct RawConfiguration {
    #[serde(default)]
    brands: Vec<RawBrand>,
    #[serde(default)]
    defaults: RawDefaults,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFeedBrand {
    name: String,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    pan_lengths: Vec<usize>,
    #[serde(default)]
    cvv_length: Option<usize>,
    #[serde(default)]
    images: Vec<CardBrandImage>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parses a rule-set document in either accepted shape.
///
/// # Errors
///
/// Returns [`CardConfigurationError`] when the text is empty, is not JSON,
/// has neither shape, or contains a rule that does not compile.
pub fn parse_card_configuration(json: &str) -> Result<CardConfiguration, CardConfigurationError> {
    if json.trim().is_empty() {
        return Err(CardConfigurationError::Empty);
    }
    let value: serde_json::Value = serde_json::from_str(json)?;
    match value {
        serde_json::Value::Object(_) => {
            let raw: RawConfiguration = serde_json::from_value(value)?;
            build_structured(raw)
        }
        serde_json::Value::Array(_) => {
            let raw: Vec<RawFeedBrand> = serde_json::from_value(value)?;
            build_feed(raw)
        }
        serde_json::Value::Null => Err(CardConfigurationError::UnexpectedShape { found: "null" }),
        serde_json::Value::Bool(_) => {
            Err(CardConfigurationError::UnexpectedShape { found: "boolean" })
        }
        serde_json::Value::Number(_) => {
            Err(CardConfigurationError::UnexpectedShape { found: "number" })
        }
        serde_json::Value::String(_) => {
            Err(CardConfigurationError::UnexpectedShape { found: "string" })
        }
    }
}

/// Parses a rule-set document, falling back to
/// [`CardConfiguration::builtin`] when it cannot be used.
///
/// The failure is logged at `warn` level; validation keeps working with the
/// built-in rules.
pub fn parse_card_configuration_or_builtin(json: &str) -> CardConfiguration {
    match parse_card_configuration(json) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "falling back to built-in card configuration");
            CardConfiguration::builtin()
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

fn build_rule(
    raw: RawRule,
    owner: &str,
    field: &'static str,
) -> Result<CardValidationRule, CardConfigurationError> {
    let wrap = |source| CardConfigurationError::Rule {
        owner: owner.to_owned(),
        field,
        source,
    };
    let rule = match raw.pattern.as_deref() {
        Some(pattern) => CardValidationRule::with_pattern(pattern).map_err(wrap)?,
        None => CardValidationRule::any(),
    };
    rule.with_valid_lengths(raw.valid_lengths)
        .with_bounds(raw.min_length, raw.max_length)
        .checked()
        .map_err(wrap)
}

fn build_optional(
    raw: Option<RawRule>,
    owner: &str,
    field: &'static str,
) -> Result<Option<CardValidationRule>, CardConfigurationError> {
    raw.map(|r| build_rule(r, owner, field)).transpose()
}

fn build_structured(raw: RawConfiguration) -> Result<CardConfiguration, CardConfigurationError> {
    let mut brands = Vec::with_capacity(raw.brands.len());
    for brand in raw.brands {
        let pan_raw = match brand.pan {
            RawRules::One(rule) => vec![rule],
            RawRules::Many(rules) => rules,
        };
        let pan_rules = pan_raw
            .into_iter()
            .map(|r| build_rule(r, &brand.name, "pan"))
            .collect::<Result<Vec<_>, _>>()?;
        let cvv = build_optional(brand.cvv, &brand.name, "cvv")?;
        brands.push(CardBrand::new(brand.name, pan_rules, cvv).with_images(brand.images));
    }

    let defaults = CardDefaults {
        pan: build_optional(raw.defaults.pan, "defaults", "pan")?,
        cvv: build_optional(raw.defaults.cvv, "defaults", "cvv")?,
        month: build_optional(raw.defaults.month, "defaults", "month")?,
        year: build_optional(raw.defaults.year, "defaults", "year")?,
    };
    Ok(CardConfiguration::new(brands, defaults))
}

fn build_feed(raw: Vec<RawFeedBrand>) -> Result<CardConfiguration, CardConfigurationError> {
    let mut brands = Vec::with_capacity(raw.len());
    for entry in raw {
        let pan = build_rule(
            RawRule {
                pattern: Some(entry.pattern.unwrap_or_else(|| DEFAULT_MATCHER.to_owned())),
                min_length: None,
                max_length: None,
                valid_lengths: entry.pan_lengths,
            },
            &entry.name,
            "pan",
        )?;
        let cvv = entry
            .cvv_length
            .map(|length| {
                build_rule(
                    RawRule {
                        pattern: Some(DEFAULT_MATCHER.to_owned()),
                        min_length: None,
                        max_length: None,
                        valid_lengths: vec![length],
                    },
                    &entry.name,
                    "cvv",
                )
            })
            .transpose()?;
        brands.push(CardBrand::new(entry.name, vec![pan], cvv).with_images(entry.images));
    }
    Ok(CardConfiguration::new(brands, CardDefaults::builtin()))
}
