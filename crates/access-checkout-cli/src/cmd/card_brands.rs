//! Implementation of `access-checkout card-brands`.
//!
//! Matches the PAN against the card configuration, then asks the BIN service
//! which networks the card belongs to. A failed lookup leaves the locally
//! matched brand as the answer.
//!
//! Exit codes: 0 = brands printed (possibly none), 2 = bad arguments.
use std::sync::mpsc;

use access_checkout_core::{AccessCheckoutClient, CardBrand, CardConfiguration, resolve_brand};
use serde::Serialize;

use super::discover::timeouts;
use crate::cli::ServiceArgs;
use crate::error::{CliError, stream_error};
use crate::format::{FormatMode, write_json_line};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CardBrandsOutput<'a> {
    matched: Option<&'a str>,
    brands: Vec<&'a str>,
    looked_up: bool,
}

/// Runs the `card-brands` command.
///
/// # Errors
///
/// Returns [`CliError::InvalidArgument`] for an unusable base URL or
/// merchant id.
pub async fn run(
    service: &ServiceArgs,
    merchant_id: &str,
    pan: &str,
    config: &CardConfiguration,
    mode: FormatMode,
) -> Result<(), CliError> {
    let client = AccessCheckoutClient::builder()
        .base_url(service.base_url.as_str())
        .merchant_id(merchant_id)
        .timeouts(timeouts(service))
        .build()?;
    let matched = resolve_brand(pan, config).map(|m| m.brand);

    let (tx, rx) = mpsc::channel();
    let lookup = client
        .card_bin_service()
        .card_brands(matched, pan, move |brands| {
            drop(tx.send(brands));
        });
    let finished = match lookup.pending {
        Some(pending) => pending.await,
        None => Ok(()),
    };
    if let Err(e) = finished {
        tracing::warn!(error = %e, "card BIN task did not finish");
    }
    let delivered = rx.try_recv().ok();
    let looked_up = delivered.is_some();
    let brands: Vec<CardBrand> = delivered.unwrap_or(lookup.brands);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match mode {
        FormatMode::Human => {
            use std::io::Write as _;
            brands
                .iter()
                .try_for_each(|brand| writeln!(out, "{}", brand.name()))
        }
        FormatMode::Json => write_json_line(
            &mut out,
            &CardBrandsOutput {
                matched: matched.map(CardBrand::name),
                brands: brands.iter().map(CardBrand::name).collect(),
                looked_up,
            },
        ),
    }
    .map_err(|e| stream_error("stdout", &e))
}
