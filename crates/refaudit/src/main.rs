//! refaudit - find entries whose links point at deleted content
//!
//! Exit codes:
//! - 0: scan finished and found nothing broken
//! - 1: the command failed
//! - 2: the scan found broken references or could not finish a content model

use anyhow::Result;
use clap::{Parser, Subcommand};
use refaudit_logging::{init_logging, LogConfig};
use std::process::ExitCode;

mod cli;

use cli::config::ConnectionArgs;

#[derive(Parser, Debug)]
#[command(
    name = "refaudit",
    version,
    about = "Find entries with broken references in a content repository"
)]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan every content model with link fields for broken references
    Scan {
        /// Locale to inspect (default: the space's default locale)
        #[arg(short, long)]
        locale: Option<String>,

        /// Entries per request (1-1000)
        #[arg(long)]
        page_size: Option<u64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Output broken entry ids only
        #[arg(short, long)]
        quiet: bool,
    },

    /// List the locales configured in the space environment
    Locales {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the web app URL of an entry
    Open {
        /// Entry to open
        entry_id: String,
    },

    /// Show the resolved configuration (tokens redacted)
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn command_wants_json(command: &Commands) -> bool {
    match command {
        Commands::Scan { json, .. } => *json,
        Commands::Locales { json } => *json,
        Commands::Config { json } => *json,
        Commands::Open { .. } => false,
    }
}

fn run_command(cli: Cli) -> Result<ExitCode> {
    let connection = cli.connection;
    match cli.command {
        Commands::Scan {
            locale,
            page_size,
            json,
            quiet,
        } => cli::scan::run(
            cli::scan::ScanArgs {
                locale,
                page_size,
                json,
                quiet,
            },
            &connection,
        ),
        Commands::Locales { json } => {
            cli::locales::run(cli::locales::LocalesArgs { json }, &connection)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Open { entry_id } => {
            cli::open::run(cli::open::OpenArgs { entry_id }, &connection)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { json } => {
            cli::config::run(cli::config::ConfigArgs { json }, &connection)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let json_mode = command_wants_json(&cli.command);

    if let Err(err) = init_logging(LogConfig {
        app_name: "refaudit",
        verbose: cli.verbose,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match run_command(cli) {
        Ok(code) => code,
        Err(err) => {
            if json_mode {
                cli::error::print_json_error(&err);
            } else {
                eprintln!("{:?}", err);
            }
            ExitCode::from(1)
        }
    }
}
