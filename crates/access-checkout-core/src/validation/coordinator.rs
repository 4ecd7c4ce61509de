//! Aggregation of per-field results into a submit-readiness signal.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::rules::{CardBrand, CardConfiguration};

use super::{
    Clock, SystemClock, ValidationResult, can_update_date, validate_cvv, validate_date,
    validate_pan,
};

/// Raw values of the card form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFields {
    pub pan: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub cvc: String,
}

/// Result of validating every card field against one configuration snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub pan: ValidationResult,
    pub expiry: ValidationResult,
    pub cvc: ValidationResult,
    /// Name of the brand detected from the PAN.
    pub brand: Option<String>,
    /// `false` when a brand was detected that is not on the accepted list.
    pub brand_accepted: bool,
    /// Whether the expiry fields may take more characters.
    pub can_update_expiry: bool,
}

impl ValidationReport {
    /// Every field is complete; the details can be submitted.
    pub fn is_ready(&self) -> bool {
        self.pan.complete && self.expiry.complete && self.cvc.complete
    }
}

/// Runs the validators against an atomically replaceable configuration.
///
/// Each call loads one snapshot and uses it for every field, so a concurrent
/// [`replace_configuration`](Self::replace_configuration) is observed either
/// entirely or not at all.
pub struct ValidationCoordinator {
    config: ArcSwap<CardConfiguration>,
    clock: Arc<dyn Clock>,
    accepted_brands: Vec<String>,
}

impl ValidationCoordinator {
    pub fn new(config: CardConfiguration) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            clock: Arc::new(SystemClock),
            accepted_brands: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Restricts the brands whose PANs may be complete. Names are compared
    /// ignoring ASCII case; an empty list accepts every brand.
    #[must_use]
    pub fn with_accepted_brands<I, S>(mut self, brands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted_brands = brands.into_iter().map(Into::into).collect();
        self
    }

    /// Swaps in a new rule set for all subsequent validations.
    pub fn replace_configuration(&self, config: CardConfiguration) {
        self.config.store(Arc::new(config));
        tracing::debug!("card configuration replaced");
    }

    /// The snapshot currently in use.
    pub fn configuration(&self) -> Arc<CardConfiguration> {
        self.config.load_full()
    }

    /// Whether a brand with this name may complete.
    pub fn accepts(&self, brand_name: &str) -> bool {
        self.accepted_brands.is_empty()
            || self
                .accepted_brands
                .iter()
                .any(|name| name.eq_ignore_ascii_case(brand_name))
    }

    fn is_accepted(&self, brand: Option<&CardBrand>) -> bool {
        brand.is_none_or(|brand| self.accepts(brand.name()))
    }

    /// Validates a PAN and returns the detected brand name.
    pub fn validate_pan(&self, pan: &str) -> (ValidationResult, Option<String>) {
        let config = self.config.load();
        let (result, brand) = validate_pan(pan, &config);
        let result = if self.is_accepted(brand) {
            result
        } else {
            result.incomplete()
        };
        (result, brand.map(|b| b.name().to_owned()))
    }

    pub fn validate_cvc(&self, cvc: &str, pan: Option<&str>) -> ValidationResult {
        let config = self.config.load();
        validate_cvv(cvc, pan, &config).0
    }

    pub fn validate_expiry(&self, month: &str, year: &str) -> ValidationResult {
        let config = self.config.load();
        validate_date(Some(month), Some(year), &config, self.clock.as_ref())
    }

    /// Validates every field of `fields` against a single snapshot.
    pub fn validate_card(&self, fields: &CardFields) -> ValidationReport {
        let config = self.config.load_full();
        let (mut pan, brand) = validate_pan(&fields.pan, &config);
        let brand_accepted = self.is_accepted(brand);
        if !brand_accepted {
            pan = pan.incomplete();
        }
        let (cvc, _) = validate_cvv(&fields.cvc, Some(&fields.pan), &config);
        let month = Some(fields.expiry_month.as_str());
        let year = Some(fields.expiry_year.as_str());
        let expiry = validate_date(month, year, &config, self.clock.as_ref());

        ValidationReport {
            pan,
            expiry,
            cvc,
            brand: brand.map(|b| b.name().to_owned()),
            brand_accepted,
            can_update_expiry: can_update_date(month, year, &config),
        }
    }
}
