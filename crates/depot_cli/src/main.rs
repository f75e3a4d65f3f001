//! Command-line entry point for the depot geography core.
//!
//! # Responsibility
//! - Resolve configuration from an optional TOML file and flag overrides.
//! - Run one geography command and print its JSON result.
//!
//! # Invariants
//! - Success output goes to stdout; error envelopes go to stderr with exit
//!   code 1.

use clap::{Parser, Subcommand};
use depot_core::db::{open_db, open_db_in_memory};
use depot_core::{
    core_version, init_logging, AppError, CoreConfig, ErrorKind, GeographyService, RequestGeography,
    SqliteGeographyRepository,
};
use log::error;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "depot", version, about = "Depot geography hierarchy tool")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database file; overrides `[database].path`.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Log level; overrides `[logging].level`.
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Absolute log directory; overrides `[logging].dir`.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Locality operations.
    Locality {
        #[command(subcommand)]
        action: LocalityAction,
    },
    /// Print the core version.
    Version,
}

#[derive(Debug, Subcommand)]
enum LocalityAction {
    /// Create a locality, resolving its country and province.
    Create {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        province: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Show an existing locality with its ancestors.
    Show {
        #[arg(long)]
        id: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(
                "event=cli_command module=cli status=error error_code={} error={err}",
                err.kind().code()
            );
            eprintln!("{}", json!(err.to_body()));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<String, AppError> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path).map_err(|err| {
            AppError::new(ErrorKind::BadRequest, "invalid configuration")
                .with_detail(err.to_string())
        })?,
        None => CoreConfig::default(),
    };
    if cli.db.is_some() {
        config.database.path = cli.db;
    }
    if cli.log_level.is_some() {
        config.logging.level = cli.log_level;
    }
    if cli.log_dir.is_some() {
        config.logging.dir = cli.log_dir;
    }

    init_logging(
        config.logging.effective_level(),
        config.logging.dir.as_deref(),
    )
    .map_err(|err| {
        AppError::new(ErrorKind::BadRequest, "invalid logging settings")
            .with_detail(err.to_string())
    })?;

    let action = match cli.command {
        Command::Version => return Ok(json!({ "version": core_version() }).to_string()),
        Command::Locality { action } => action,
    };

    let conn = match &config.database.path {
        Some(path) => open_db(path),
        None => open_db_in_memory(),
    }
    .map_err(|err| AppError::internal("failed to open database").with_detail(err.to_string()))?;
    let repo = SqliteGeographyRepository::try_new(&conn)?;
    let service = GeographyService::new(repo);

    let response = match action {
        LocalityAction::Create {
            id,
            country,
            province,
            name,
        } => {
            let request = RequestGeography {
                id,
                country_name: country,
                province_name: province,
                locality_name: name,
            };
            service.create(request.validate()?)?
        }
        LocalityAction::Show { id } => service.get_locality(&id)?,
    };

    Ok(json!(response).to_string())
}
