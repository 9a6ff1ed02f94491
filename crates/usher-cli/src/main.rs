use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use usher_cli::commands::{badge, checkin, event, init, register, scan, status};
use usher_cli::identity;
use usher_cli::{Cli, Commands, Config, EventAction};
use usher_core::types::OrganizerId;

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(usher_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = usher_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

/// The local organizer identity as a core ID.
fn require_organizer() -> Result<OrganizerId> {
    identity::require_organizer()?.id()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match &cli.command {
        Some(Commands::Init { label }) => {
            init::run(label.as_deref())?;
        }
        Some(Commands::Event { action }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let organizer = require_organizer()?;
            match action {
                EventAction::Create {
                    title,
                    at,
                    location,
                    capacity,
                    json,
                } => {
                    event::create(&mut db, &organizer, title, at, location, *capacity, *json)?;
                }
                EventAction::List { json } => event::list(&db, &organizer, *json)?,
                EventAction::Delete { id } => event::delete(&mut db, &organizer, id)?,
            }
        }
        Some(Commands::Register {
            event,
            name,
            email,
            phone,
            send_email,
            json,
        }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let organizer = require_organizer()?;
            register::run(
                &mut db,
                &config,
                &organizer,
                event,
                name,
                email,
                phone.clone(),
                *send_email,
                *json,
            )?;
        }
        Some(Commands::Badge {
            credential,
            out,
            size,
        }) => {
            badge::run(credential, out, *size)?;
        }
        Some(Commands::CheckIn { event, credential }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let organizer = require_organizer()?;
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            checkin::run(&mut writer, &mut db, &organizer, event, credential)?;
            writer.flush()?;
        }
        Some(Commands::Scan {
            event,
            frames,
            decoder,
        }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let organizer = require_organizer()?;
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            let mut input = stdin.lock();
            let mut output = stdout.lock();
            scan::run(
                &mut input,
                &mut output,
                &mut db,
                &organizer,
                event,
                frames.as_deref(),
                decoder.as_deref(),
            )?;
            output.flush()?;
        }
        Some(Commands::Status { event, json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            let organizer = require_organizer()?;
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            status::run(&mut writer, &db, &organizer, event, *json)?;
            writer.flush()?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
