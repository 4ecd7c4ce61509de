mod cli;
mod cmd;
mod error;
mod format;
mod io;
mod logging;

use std::process::ExitCode;

use access_checkout_core::CardFields;
use clap::Parser;

use cli::{Cli, Command};
use error::CliError;
use format::{
    FormatMode, FormatterConfig, colors_enabled, write_checkout_error_human,
    write_checkout_error_json,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let formatter = FormatterConfig::from_flags(cli.no_color, cli.quiet, cli.verbose);
    let mode = FormatMode::from(cli.format);

    match run(cli, mode, &formatter).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e, mode, &formatter);
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli, mode: FormatMode, formatter: &FormatterConfig) -> Result<(), CliError> {
    let directives = logging::filter_directives(cli.log_filter.as_deref(), cli.verbose, cli.quiet);
    logging::init(directives, colors_enabled(cli.no_color))?;

    let card_config = cli.card_config.as_ref();
    let max_file_size = cli.max_file_size;
    match cli.command {
        Command::ValidatePan {
            pan,
            accepted_brand,
        } => {
            let config = io::load_card_configuration(card_config, max_file_size)?;
            cmd::validate_pan::run(config, &pan, accepted_brand, mode, formatter)
        }
        Command::ValidateCvv { cvv, pan } => {
            let config = io::load_card_configuration(card_config, max_file_size)?;
            cmd::validate_cvv::run(&config, &cvv, pan.as_deref(), mode, formatter)
        }
        Command::ValidateDate { month, year } => {
            let config = io::load_card_configuration(card_config, max_file_size)?;
            cmd::validate_date::run(&config, &month, year.as_deref(), mode, formatter)
        }
        Command::ValidateCard {
            pan,
            expiry,
            cvc,
            accepted_brand,
        } => {
            let config = io::load_card_configuration(card_config, max_file_size)?;
            let (expiry_month, expiry_year) = cmd::validate_card::split_expiry(&expiry);
            let fields = CardFields {
                pan,
                expiry_month,
                expiry_year,
                cvc,
            };
            cmd::validate_card::run(config, &fields, accepted_brand, mode, formatter)
        }
        Command::CardBrands {
            service,
            merchant_id,
            pan,
        } => {
            let config = io::load_card_configuration(card_config, max_file_size)?;
            cmd::card_brands::run(&service, &merchant_id, &pan, &config, mode).await
        }
        Command::Discover { service, target } => {
            cmd::discover::run(&service, target, mode).await
        }
        Command::Session {
            service,
            merchant_id,
            types,
            pan,
            expiry,
            cvc,
            no_validate,
        } => {
            let config = io::load_card_configuration(card_config, max_file_size)?;
            let args = cmd::session::SessionArgs {
                service,
                merchant_id,
                types,
                pan,
                expiry,
                cvc,
                no_validate,
            };
            cmd::session::run(args, config, mode, formatter).await
        }
    }
}

/// Prints `error` to stderr. Service failures get the structured rendering
/// of the selected output mode. In JSON mode incomplete card details print
/// nothing more, the field results already went out as JSON.
fn report(error: &CliError, mode: FormatMode, formatter: &FormatterConfig) {
    if let (FormatMode::Json, CliError::InvalidCardDetails) = (mode, error) {
        return;
    }
    if let CliError::SessionFailed(inner) = error {
        let mut buf = Vec::new();
        let written = match mode {
            FormatMode::Human => write_checkout_error_human(&mut buf, inner, formatter),
            FormatMode::Json => write_checkout_error_json(&mut buf, inner),
        };
        if written.is_ok() {
            eprint!("{}", String::from_utf8_lossy(&buf));
            return;
        }
    }
    eprintln!("{}", error.message());
}
