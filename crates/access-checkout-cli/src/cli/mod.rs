//! Clap CLI definition: root struct, subcommands, and shared argument types.
use std::path::PathBuf;
use std::time::Duration;

use access_checkout_core::{DiscoverLinks, SessionType};
use clap::{Args, Parser, Subcommand, ValueEnum};

/// A CLI argument that is either a filesystem path or the stdin sentinel `"-"`.
#[derive(Clone, Debug)]
pub enum PathOrStdin {
    /// Read from standard input.
    Stdin,
    /// Read from the given filesystem path.
    Path(PathBuf),
}

impl std::str::FromStr for PathOrStdin {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "-" {
            Ok(PathOrStdin::Stdin)
        } else {
            Ok(PathOrStdin::Path(PathBuf::from(s)))
        }
    }
}

impl std::fmt::Display for PathOrStdin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdin => f.write_str("-"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Output format for CLI commands.
///
/// `Human` prints aligned, optionally colored lines. `Json` prints one JSON
/// object per command on stdout.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, optionally colored output (default).
    Human,
    /// Structured JSON output.
    Json,
}

/// Session kinds accepted by `session --type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SessionKind {
    /// Card number, expiry date and CVC.
    Card,
    /// CVC only.
    Cvc,
}

impl From<SessionKind> for SessionType {
    fn from(kind: SessionKind) -> Self {
        match kind {
            SessionKind::Card => SessionType::Card,
            SessionKind::Cvc => SessionType::Cvc,
        }
    }
}

/// Service endpoints reachable with `discover`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DiscoveryTarget {
    /// Card sessions of the verified-tokens service.
    VerifiedTokens,
    /// CVC sessions of the sessions service.
    SessionsCvc,
    /// Card sessions of the sessions service.
    SessionsCard,
}

impl DiscoveryTarget {
    pub fn name(self) -> &'static str {
        match self {
            Self::VerifiedTokens => "verified-tokens",
            Self::SessionsCvc => "sessions-cvc",
            Self::SessionsCard => "sessions-card",
        }
    }

    pub fn links(self) -> DiscoverLinks {
        match self {
            Self::VerifiedTokens => DiscoverLinks::verified_tokens(),
            Self::SessionsCvc => DiscoverLinks::sessions_cvc(),
            Self::SessionsCard => DiscoverLinks::sessions_card(),
        }
    }
}

/// Where the service lives and how long to wait for it.
#[derive(Args, Clone, Debug)]
pub struct ServiceArgs {
    /// Root URL of the Access Checkout service.
    #[arg(long, env = "ACCESS_CHECKOUT_BASE_URL", value_name = "URL")]
    pub base_url: String,

    /// Limit for establishing a connection (e.g. `15s`, `500ms`).
    #[arg(long, default_value = "15s", value_parser = humantime::parse_duration)]
    pub connect_timeout: Duration,

    /// Limit for a whole request including the response body.
    #[arg(long, default_value = "10s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,
}

/// All top-level subcommands exposed by the `access-checkout` binary.
#[derive(Subcommand)]
pub enum Command {
    /// Validate a card number and report its brand.
    #[command(name = "validate-pan")]
    ValidatePan {
        /// Card number digits, complete or partially typed.
        #[arg(value_name = "PAN")]
        pan: String,
        /// Brand allowed to complete (repeatable; default: every brand).
        #[arg(long, value_name = "BRAND")]
        accepted_brand: Vec<String>,
    },

    /// Validate a card verification code.
    #[command(name = "validate-cvv")]
    ValidateCvv {
        /// CVC digits.
        #[arg(value_name = "CVV")]
        cvv: String,
        /// Card number used to pick the brand's CVC rule.
        #[arg(long, value_name = "PAN")]
        pan: Option<String>,
    },

    /// Validate an expiry month and year against the current date.
    #[command(name = "validate-date")]
    ValidateDate {
        /// Expiry month (`1`, `01` .. `12`).
        #[arg(value_name = "MONTH")]
        month: String,
        /// Two-digit expiry year; omit while still typing.
        #[arg(value_name = "YEAR")]
        year: Option<String>,
    },

    /// Validate every card field at once and report submit readiness.
    #[command(name = "validate-card")]
    ValidateCard {
        /// Card number.
        #[arg(long, default_value = "")]
        pan: String,
        /// Expiry date as `MM/YY` or `MMYY`.
        #[arg(long, default_value = "", value_name = "MM/YY")]
        expiry: String,
        /// Card verification code.
        #[arg(long, default_value = "")]
        cvc: String,
        /// Brand allowed to complete (repeatable; default: every brand).
        #[arg(long, value_name = "BRAND")]
        accepted_brand: Vec<String>,
    },

    /// Resolve a service endpoint by walking the discovery links.
    Discover {
        #[command(flatten)]
        service: ServiceArgs,
        /// Endpoint to resolve.
        #[arg(long, default_value = "verified-tokens", value_enum)]
        target: DiscoveryTarget,
    },

    /// List every card network a PAN belongs to.
    #[command(name = "card-brands")]
    CardBrands {
        #[command(flatten)]
        service: ServiceArgs,
        /// Checkout identity sent with the lookup.
        #[arg(long, env = "ACCESS_CHECKOUT_MERCHANT_ID", value_name = "ID")]
        merchant_id: String,
        /// Card number, at least twelve digits for a service lookup.
        #[arg(value_name = "PAN")]
        pan: String,
    },

    /// Exchange card details for session references.
    Session {
        #[command(flatten)]
        service: ServiceArgs,
        /// Merchant identity sent with every request.
        #[arg(long, env = "ACCESS_CHECKOUT_MERCHANT_ID", value_name = "ID")]
        merchant_id: String,
        /// Session kinds to create (comma separated or repeated).
        #[arg(
            long = "type",
            value_name = "TYPE",
            value_enum,
            value_delimiter = ',',
            default_value = "card"
        )]
        types: Vec<SessionKind>,
        /// Card number (card sessions).
        #[arg(long)]
        pan: Option<String>,
        /// Expiry date as `MM/YY` or `MMYY` (card sessions).
        #[arg(long, value_name = "MM/YY")]
        expiry: Option<String>,
        /// Card verification code.
        #[arg(long)]
        cvc: Option<String>,
        /// Skip local validation and let the server judge the details.
        #[arg(long)]
        no_validate: bool,
    },
}

/// Root CLI struct for the `access-checkout` binary.
///
/// All global flags are defined here and marked `global = true` so that clap
/// propagates them to every subcommand.
#[derive(Parser)]
#[command(
    name = "access-checkout",
    version,
    about = "Access Checkout card validation and session client",
    long_about = "Validates card details against brand rules and exchanges them\n\
                  for single-use session references."
)]
pub struct Cli {
    /// Active subcommand.
    #[command(subcommand)]
    pub command: Command,

    /// Output format: human (default) or json.
    #[arg(long, short = 'f', default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Suppress all stderr output except errors (incompatible with `--verbose`).
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log discovery hops, cache hits and requests to stderr
    /// (incompatible with `--quiet`).
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Card brand rule set (JSON), or `-` for stdin. Built-in rules apply
    /// when omitted.
    #[arg(
        long,
        global = true,
        env = "ACCESS_CHECKOUT_CARD_CONFIG",
        value_name = "FILE"
    )]
    pub card_config: Option<PathOrStdin>,

    /// Maximum rule-set file size in bytes.
    #[arg(
        long,
        global = true,
        env = "ACCESS_CHECKOUT_MAX_FILE_SIZE",
        default_value = "1048576"
    )]
    pub max_file_size: u64,

    /// Log filter directives, e.g. `access_checkout_core=debug`.
    #[arg(long, global = true, env = "RUST_LOG", value_name = "FILTER")]
    pub log_filter: Option<String>,

    /// Disable ANSI color codes in human output.
    ///
    /// Also respects the `NO_COLOR` environment variable per
    /// <https://no-color.org>.
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,
}
