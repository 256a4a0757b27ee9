//! Offline management of the minic mission catalog.
//!
//! Usage:
//!   minic missions list [--json]
//!   minic missions add <NAME> --duration <MINUTES> [--file <PATH>]
//!   minic missions remove <ID>
//!   minic missions move <ID> <INDEX>
//!   minic missions rename <ID> <NAME>
//!   minic missions set-file <ID> <PATH>
//!   minic missions set-duration <ID> <MINUTES>
//!   minic missions select <ID|none>
//!   minic config check

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use minic_catalog::{
    CatalogDocument, CatalogStore, MissionCatalog, MissionDraft, MissionId, MissionLayout,
    MissionUpdate,
};
use minic_core::{default_config_path, logging, AppConfig};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Mission rotation commander for dedicated game servers", long_about = None)]
struct Cli {
    /// Config file; defaults to ~/.minic/minic.toml when present
    #[arg(long, short, env = "MINIC_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Edit the mission catalog
    #[command(subcommand)]
    Missions(MissionsCommand),
    /// Inspect the configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum MissionsCommand {
    /// Print the rotation; `*` marks the current mission
    List {
        #[arg(long)]
        json: bool,
    },
    Add {
        name: String,
        #[arg(long, short)]
        duration: u32,
        /// Mission file, relative to the dogfight missions root or absolute
        #[arg(long, short)]
        file: Option<PathBuf>,
    },
    Remove {
        id: u32,
    },
    /// Move a mission to a zero-based position in the rotation
    Move {
        id: u32,
        index: usize,
    },
    Rename {
        id: u32,
        name: String,
    },
    SetFile {
        id: u32,
        file: PathBuf,
    },
    SetDuration {
        id: u32,
        minutes: u32,
    },
    /// Select the current mission; `none` clears the selection
    Select {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the config and print the effective settings
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    logging::init_from_config(&config.logging);

    match cli.command {
        Commands::Missions(command) => run_missions(&config, command),
        Commands::Config(ConfigCommand::Check) => check_config(&config),
    }
}

fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let config = match explicit {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let path = default_config_path();
            if path.exists() {
                AppConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?
            } else {
                AppConfig::default()
            }
        }
    };
    Ok(config.with_env_overrides())
}

fn check_config(config: &AppConfig) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    println!("catalog: {}", config.catalog.path.display());
    println!("logging: {} (json: {})", config.logging.level, config.logging.json);
    match config.server_settings() {
        Ok(settings) => {
            println!("console: {}", settings.console);
            println!("telemetry: {}", settings.telemetry);
            println!("event log: {}", settings.event_log.display());
            println!("missions: {}", MissionLayout::new(&settings.missions_dir).root().display());
        }
        Err(e) => println!("server: {}", e),
    }
    Ok(())
}

/// Catalog path for a mission file given on the command line.
fn resolve_file(config: &AppConfig, file: &Path) -> Result<String> {
    if file.is_relative() {
        let relative = file.to_string_lossy().replace('\\', "/");
        if relative.trim().is_empty() {
            bail!("Mission file path cannot be empty");
        }
        return Ok(relative);
    }
    let settings = config
        .server_settings()
        .context("Absolute mission paths need the [server] section")?;
    let layout = MissionLayout::new(&settings.missions_dir);
    Ok(layout.relative_path(file)?)
}

fn run_missions(config: &AppConfig, command: MissionsCommand) -> Result<()> {
    let store = CatalogStore::new(&config.catalog.path);
    let mut catalog = store
        .load()
        .with_context(|| format!("Failed to load catalog from {}", store.path().display()))?;

    match command {
        MissionsCommand::List { json } => {
            print_catalog(&catalog, json)?;
            return Ok(());
        }
        MissionsCommand::Add {
            name,
            duration,
            file,
        } => {
            let mut draft = MissionDraft::new(name, duration);
            if let Some(file) = file {
                draft = draft.with_path(resolve_file(config, &file)?);
            }
            let id = catalog.add(draft)?;
            println!("Added mission {}", id);
        }
        MissionsCommand::Remove { id } => {
            let removed = catalog.remove(MissionId(id))?;
            println!("Removed mission {} ({})", removed.id, removed.name);
        }
        MissionsCommand::Move { id, index } => {
            catalog.reorder(MissionId(id), index)?;
        }
        MissionsCommand::Rename { id, name } => {
            catalog.update(MissionId(id), MissionUpdate::rename(name))?;
        }
        MissionsCommand::SetFile { id, file } => {
            let relative = resolve_file(config, &file)?;
            catalog.update(MissionId(id), MissionUpdate::file(relative))?;
        }
        MissionsCommand::SetDuration { id, minutes } => {
            catalog.update(MissionId(id), MissionUpdate::duration(minutes))?;
        }
        MissionsCommand::Select { id } => {
            let selection = match id.as_str() {
                "none" => None,
                raw => Some(MissionId(
                    raw.parse()
                        .with_context(|| format!("Invalid mission id '{}'", raw))?,
                )),
            };
            catalog.set_current(selection)?;
        }
    }

    store.save(&catalog)?;
    info!(path = %store.path().display(), "Catalog saved");
    Ok(())
}

fn print_catalog(catalog: &MissionCatalog, json: bool) -> Result<()> {
    if json {
        let document = CatalogDocument::from(catalog);
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }
    if catalog.is_empty() {
        println!("No missions");
        return Ok(());
    }
    for mission in catalog.list() {
        let marker = if catalog.current_id() == Some(mission.id) {
            '*'
        } else {
            ' '
        };
        println!(
            "{} {:>4}  {:<24} {:>4} min  {}",
            marker,
            mission.id.0,
            mission.name,
            mission.duration_minutes,
            mission.relative_path.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
