//! Implementation of `access-checkout discover`.
//!
//! Walks the discovery links from `--base-url` to the endpoint named by
//! `--target` and prints the resolved URL.
//!
//! Exit codes: 0 = resolved, 1 = discovery failed, 2 = bad base URL.
use std::sync::Arc;

use access_checkout_core::{
    DiscoveryCache, DiscoveryClient, HttpTimeouts, ReqwestHttpClient,
};
use serde::Serialize;

use crate::cli::{DiscoveryTarget, ServiceArgs};
use crate::error::{CliError, stream_error};
use crate::format::{FormatMode, write_json_line};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscoverOutput<'a> {
    target: &'static str,
    relations: &'a [String],
    media_type: &'a str,
    url: &'a str,
}

pub fn timeouts(service: &ServiceArgs) -> HttpTimeouts {
    HttpTimeouts {
        connect: service.connect_timeout,
        request: service.timeout,
    }
}

/// Runs the `discover` command.
///
/// # Errors
///
/// Returns [`CliError::SessionFailed`] wrapping the discovery error when any
/// hop fails.
pub async fn run(
    service: &ServiceArgs,
    target: DiscoveryTarget,
    mode: FormatMode,
) -> Result<(), CliError> {
    let http = ReqwestHttpClient::new(timeouts(service))?;
    let client = DiscoveryClient::new(Arc::new(http), Arc::new(DiscoveryCache::new()));
    let links = target.links();
    let url = client.discover(&service.base_url, &links).await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match mode {
        FormatMode::Human => {
            use std::io::Write as _;
            writeln!(out, "{url}")
        }
        FormatMode::Json => write_json_line(
            &mut out,
            &DiscoverOutput {
                target: target.name(),
                relations: links.relations(),
                media_type: links.media_type(),
                url: url.as_str(),
            },
        ),
    }
    .map_err(|e| stream_error("stdout", &e))
}
