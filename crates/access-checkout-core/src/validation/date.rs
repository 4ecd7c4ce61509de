//! Expiry date validation.
//!
//! Month and year are validated as separate fields with the shared
//! combinator, then combined: the date is complete only when both fields are
//! complete and the last second of the expiry month has not passed.

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};

use crate::rules::{CardConfiguration, CardDefaults, CardValidationRule};

use super::{ValidationResult, apply_rule, is_digits};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the current instant, injected so expiry checks are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A fixed instant acts as a clock that never moves.
impl Clock for DateTime<Utc> {
    fn now(&self) -> DateTime<Utc> {
        *self
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn month_rule(config: &CardConfiguration) -> CardValidationRule {
    config
        .defaults
        .month
        .clone()
        .unwrap_or_else(CardDefaults::builtin_month)
}

fn year_rule(config: &CardConfiguration) -> CardValidationRule {
    config
        .defaults
        .year
        .clone()
        .unwrap_or_else(CardDefaults::builtin_year)
}

/// A missing or empty field is a valid prefix that still needs input.
fn field_result(value: Option<&str>, rule: &CardValidationRule) -> ValidationResult {
    match value {
        None | Some("") => ValidationResult::new(true, false),
        Some(v) if !is_digits(v) => ValidationResult::REJECTED,
        Some(v) => apply_rule(v, rule),
    }
}

/// Expands a two-digit year into the current century of `now`. Longer inputs
/// are taken as written.
pub(crate) fn inflate_year(year: &str, now: DateTime<Utc>) -> Option<i32> {
    let parsed: i32 = year.parse().ok()?;
    if year.len() <= 2 {
        Some(now.year() / 100 * 100 + parsed)
    } else {
        Some(parsed)
    }
}

/// The last second of `month` in `year`.
fn end_of_month(year: i32, month: u32) -> Option<DateTime<Utc>> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .and_hms_opt(0, 0, 0)?
        .and_utc();
    first_of_next.checked_sub_signed(TimeDelta::seconds(1))
}

/// Validates an expiry date given as separate month and year fields.
///
/// Each field is checked against the configured month/year rule (falling back
/// to the built-in rules). The result is rejected when either field fails its
/// rule; otherwise it is `partial`, and `complete` once both fields are
/// complete, the year is not in the past, and the end of the expiry month is
/// at or after `clock.now()`.
///
/// # Examples
///
/// ```
/// use access_checkout_core::rules::CardConfiguration;
/// use access_checkout_core::validation::{ValidationResult, validate_date};
/// use chrono::{TimeZone, Utc};
///
/// let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
/// let config = CardConfiguration::builtin();
/// assert_eq!(validate_date(Some("06"), Some("25"), &config, &now), ValidationResult::new(true, true));
/// assert!(!validate_date(Some("13"), Some("25"), &config, &now).complete);
/// ```
pub fn validate_date(
    month: Option<&str>,
    year: Option<&str>,
    config: &CardConfiguration,
    clock: &dyn Clock,
) -> ValidationResult {
    let month_result = field_result(month, &month_rule(config));
    let year_result = field_result(year, &year_rule(config));
    if month_result.is_rejected() || year_result.is_rejected() {
        return ValidationResult::REJECTED;
    }

    let partial = month_result.partial && year_result.partial;
    if !(month_result.complete && year_result.complete) {
        return ValidationResult::new(partial, false);
    }

    let now = clock.now();
    let (Some(month), Some(year)) = (month, year) else {
        return ValidationResult::new(partial, false);
    };
    let expiry = month
        .parse::<u32>()
        .ok()
        .filter(|m| (1..=12).contains(m))
        .zip(inflate_year(year, now))
        .filter(|(_, full_year)| *full_year >= now.year())
        .and_then(|(m, full_year)| end_of_month(full_year, m));

    let complete = expiry.is_some_and(|instant| instant >= now);
    ValidationResult::new(partial, complete)
}

/// Returns `false` once both fields have reached their rule's maximum length,
/// meaning no further characters should be accepted.
///
/// A rule without any length bound never blocks input.
pub fn can_update_date(month: Option<&str>, year: Option<&str>, config: &CardConfiguration) -> bool {
    let reached = |value: Option<&str>, rule: &CardValidationRule| {
        rule.max_accepted_length()
            .is_some_and(|max| value.map_or(0, |v| v.chars().count()) >= max)
    };
    !(reached(month, &month_rule(config)) && reached(year, &year_rule(config)))
}
