//! nullmodem CLI - Command-line tool for managing com0com port pairs.
//!
//! ## Features
//!
//! - List installed pairs and their settings
//! - Install, change and remove pairs
//! - Friendly-name and busy-name queries
//! - JSON output for scripting
//! - Shell completion generation
//! - Environment variable and config file support

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use console::style;
use dialoguer::Error as DialoguerError;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::debug;
use nullmodem::manager::DEFAULT_BUSY_PREFIX;
use nullmodem::{ManagerConfig, NullModemManager, PortBuilder, PortOrder};
use serde::Serialize;
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

mod commands;
mod config;

use config::Config;

/// Exit code for generic failures and negative outcomes.
const EXIT_FAILURE: i32 = 1;
/// Exit code for usage errors (matches clap).
const EXIT_USAGE: i32 = 2;
/// Exit code when com0com is not installed.
const EXIT_NOT_INSTALLED: i32 = 4;
/// Exit code when the user cancelled.
const EXIT_CANCELLED: i32 = 130;

/// Whether stderr is a terminal (set once at startup).
static STDERR_IS_TTY: AtomicBool = AtomicBool::new(true);

/// Check if animations should be used (TTY and colors enabled).
fn use_fancy_output() -> bool {
    STDERR_IS_TTY.load(Ordering::Relaxed) && console::colors_enabled_stderr()
}

/// Errors raised by the CLI itself rather than the library.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    /// The invocation cannot be carried out as given.
    #[error("{0}")]
    Usage(String),
    /// The user declined or interrupted a prompt.
    #[error("{0}")]
    Cancelled(String),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => EXIT_USAGE,
            Self::Cancelled(_) => EXIT_CANCELLED,
        }
    }
}

/// nullmodem - Manage com0com virtual null-modem port pairs.
///
/// Environment variables:
///   NULLMODEM_ROOT              - com0com install directory
///   NULLMODEM_TIMEOUT           - Time budget per setupc run, in seconds
///   NULLMODEM_NON_INTERACTIVE   - Non-interactive mode (disable prompts)
#[derive(Parser)]
#[command(name = "nullmodem")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// com0com install directory (read from the Windows registry if not specified).
    #[arg(long, global = true, env = "NULLMODEM_ROOT", value_name = "DIR")]
    root: Option<PathBuf>,

    /// Time budget per setupc run, in seconds.
    #[arg(long, global = true, env = "NULLMODEM_TIMEOUT", value_name = "SECS")]
    timeout: Option<u64>,

    /// File setupc writes its log to.
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    pub(crate) quiet: bool,

    /// Non-interactive mode (fail instead of prompting).
    #[arg(long, global = true, env = "NULLMODEM_NON_INTERACTIVE")]
    pub(crate) non_interactive: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Endpoint of a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Side {
    /// Endpoint CNCA<n>.
    A,
    /// Endpoint CNCB<n>.
    B,
}

impl From<Side> for PortOrder {
    fn from(side: Side) -> Self {
        match side {
            Side::A => PortOrder::A,
            Side::B => PortOrder::B,
        }
    }
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Show the help text of setupc itself.
    UtilityHelp,

    /// List installed port pairs.
    List {
        /// Output pairs as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// List friendly names of buses and ports.
    ListNames {
        /// Output names as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Regenerate friendly names.
    UpdateNames,

    /// List port names already in use.
    BusyNames {
        /// Port name prefix to match.
        #[arg(long, default_value = DEFAULT_BUSY_PREFIX)]
        prefix: String,

        /// Only match this port number (e.g. 5 for COM5).
        #[arg(long)]
        filter: Option<u32>,

        /// Output names as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Install a new port pair.
    Add {
        /// Options for endpoint A (e.g. "PortName=COM5,EmuBR=yes").
        #[arg(long = "a", value_name = "OPTIONS", value_parser = parse_options)]
        a: PortBuilder,

        /// Options for endpoint B.
        #[arg(long = "b", value_name = "OPTIONS", value_parser = parse_options)]
        b: PortBuilder,

        /// Bus number for the new pair (next free one if not specified).
        #[arg(long)]
        id: Option<u32>,
    },

    /// Change the options of one endpoint.
    Change {
        /// Bus number of the pair.
        id: u32,

        /// Endpoint to change.
        #[arg(value_enum, ignore_case = true)]
        side: Side,

        /// New options (e.g. "EmuBR=yes,EmuOverrun=yes").
        #[arg(value_parser = parse_options)]
        options: PortBuilder,
    },

    /// Remove a port pair.
    Remove {
        /// Bus number of the pair.
        id: u32,
    },

    /// Remove every port pair.
    RemoveAll {
        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (detected from $SHELL if not specified).
        #[arg(value_enum)]
        shell: Option<Shell>,
    },
}

/// Parse endpoint options in `key=value,...` form.
fn parse_options(s: &str) -> Result<PortBuilder, String> {
    s.parse::<PortBuilder>().map_err(|e| e.to_string())
}

/// Print `value` as pretty JSON to stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Spinner on stderr, hidden in quiet mode or without a terminal.
pub(crate) fn spinner(cli: &Cli, message: &str) -> ProgressBar {
    if cli.quiet || !use_fancy_output() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Map a dialoguer failure to a CLI error.
pub(crate) fn map_prompt_error(err: DialoguerError) -> anyhow::Error {
    match err {
        DialoguerError::IO(io_err) => {
            if io_err.kind() == std::io::ErrorKind::Interrupted {
                CliError::Cancelled("Prompt cancelled".to_string()).into()
            } else {
                CliError::Usage(format!("Prompt failed: {io_err}")).into()
            }
        },
    }
}

/// Exit code for an error, looking through its causes.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(cli_err) = cause.downcast_ref::<CliError>() {
            return cli_err.exit_code();
        }
        if let Some(lib_err) = cause.downcast_ref::<nullmodem::Error>() {
            return match lib_err {
                nullmodem::Error::InstallationNotFound(_) => EXIT_NOT_INSTALLED,
                _ => EXIT_FAILURE,
            };
        }
    }
    EXIT_FAILURE
}

fn init_logging(cli: &Cli) {
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();
}

/// Build the manager from flags, environment and config files.
fn open_manager(cli: &Cli, config: &Config) -> Result<NullModemManager> {
    let mut settings = ManagerConfig::default();
    if let Some(secs) = cli.timeout.or(config.utility.timeout_secs) {
        settings = settings.with_timeout(Duration::from_secs(secs));
    }
    if let Some(log_file) = cli.log_file.as_ref().or(config.utility.log_file.as_ref()) {
        settings = settings.with_log_file(log_file);
    }

    let manager = match cli.root.as_ref().or(config.utility.root.as_ref()) {
        Some(root) => NullModemManager::with_root(root, &settings),
        None => NullModemManager::from_registry(&settings),
    };
    let manager = manager.map_err(|e| {
        anyhow::Error::new(e).context("Could not open the com0com installation (see --root)")
    })?;
    debug!("Opened {manager:?}");
    Ok(manager)
}

fn run() -> Result<()> {
    let stderr_is_tty = console::Term::stderr().is_term();
    STDERR_IS_TTY.store(stderr_is_tty, Ordering::Relaxed);
    if env::var_os("NO_COLOR").is_some() || !stderr_is_tty {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let cli = Cli::parse();
    init_logging(&cli);
    debug!(
        "nullmodem v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    if let Commands::Completions { shell } = &cli.command {
        return commands::completions::cmd_completions(*shell);
    }

    let config = match &cli.config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };
    let manager = open_manager(&cli, &config)?;

    match &cli.command {
        Commands::UtilityHelp => commands::names::cmd_utility_help(&manager),
        Commands::List { json } => commands::pairs::cmd_list(&cli, &manager, *json),
        Commands::ListNames { json } => commands::names::cmd_list_names(&cli, &manager, *json),
        Commands::UpdateNames => commands::names::cmd_update_names(&cli, &manager),
        Commands::BusyNames {
            prefix,
            filter,
            json,
        } => commands::names::cmd_busy_names(&cli, &manager, prefix, *filter, *json),
        Commands::Add { a, b, id } => commands::pairs::cmd_add(&cli, &manager, a, b, *id),
        Commands::Change { id, side, options } => {
            commands::pairs::cmd_change(&cli, &manager, *id, (*side).into(), options)
        },
        Commands::Remove { id } => commands::pairs::cmd_remove(&cli, &manager, *id),
        Commands::RemoveAll { yes } => commands::pairs::cmd_remove_all(&cli, &manager, *yes),
        Commands::Completions { .. } => Ok(()),
    }
}

fn main() {
    let code = match run() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{} {err:#}", style("Error:").red().bold());
            exit_code_for(&err)
        },
    };
    std::process::exit(code);
}
