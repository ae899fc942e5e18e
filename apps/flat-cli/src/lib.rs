//! FLAT CLI library
//!
//! Argument parsing and command execution for the `flat` binary. Commands
//! write to any [`Write`] so they can run against an in-memory buffer.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flat_common::{format_optional_date, get_default_storage_path, truncate_string};
use flat_core::{
    init_tracing, CascadeSummary, ConfigLoader, DeleteChildHandling, FlatConfig, FlatStore,
    LogSettings, Project, StorageBackend, StoreStats,
};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

const NAME_WIDTH: usize = 40;

#[derive(Parser, Debug)]
#[command(name = "flat")]
#[command(about = "Operate the FLAT project store")]
#[command(version)]
pub struct Cli {
    /// Configuration file (YAML or JSON), applied over the default files
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// SQLite file holding the store
    #[arg(long, short, conflicts_with = "memory")]
    pub storage: Option<PathBuf>,

    /// Keep the store in memory for this run only
    #[arg(long)]
    pub memory: bool,

    /// Verbose output
    #[arg(long, short)]
    pub verbose: bool,

    /// Write logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Replace the store contents with the seed dataset
    Seed,
    /// Show record counts and storage details
    Stats,
    /// List projects
    Projects {
        /// Only MASTER projects
        #[arg(long)]
        masters: bool,
    },
    /// Recompute every MASTER project from its SUB projects
    Aggregate,
    /// Print or write the persisted JSON blob
    Export {
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Replace the store contents with an exported blob
    Import {
        /// File written by `flat export`
        file: PathBuf,
    },
    /// Check the task rules of one project
    ValidateTasks {
        /// Project id
        project_id: String,
    },
    /// Delete a project with its schedule, tasks and comments
    DeleteProject {
        /// Project id
        id: String,
        /// Also delete the SUB projects of a MASTER
        #[arg(long)]
        cascade: bool,
    },
}

/// Resolve the configuration for this invocation
///
/// Command-line flags win over `loader`'s files and environment. A SQLite
/// backend without a path uses `~/.flat/flat.sqlite`.
///
/// # Errors
///
/// Returns an error if a configuration source fails to load or the result
/// is invalid
pub fn resolve_config(cli: &Cli, loader: ConfigLoader) -> Result<FlatConfig> {
    let loader = match &cli.config {
        Some(path) => loader.add_config_path(path),
        None => loader,
    };
    let mut config = loader
        .with_validation(false)
        .load()
        .context("Failed to load configuration")?;

    if cli.memory {
        config.backend = StorageBackend::Memory;
    } else if let Some(path) = &cli.storage {
        config.backend = StorageBackend::Sqlite;
        config.storage_path = Some(path.clone());
    }
    if config.backend == StorageBackend::Sqlite && config.storage_path.is_none() {
        let path = get_default_storage_path();
        debug!(path = %path.display(), "Using the default storage file");
        config.storage_path = Some(path);
    }
    if cli.verbose {
        config.log_level = "debug".to_string();
    }
    if cli.json_logs {
        config.json_logs = true;
    }

    config.validate()?;
    Ok(config)
}

/// Resolve configuration, open the store and run `cli.command`
///
/// # Errors
///
/// Returns an error if configuration, logging, the store or the command fails
pub fn run<W: Write>(cli: Cli, loader: ConfigLoader, out: &mut W) -> Result<()> {
    let config = resolve_config(&cli, loader)?;
    init_tracing(&LogSettings::from(&config))?;
    let mut store = FlatStore::from_config(&config).context("Failed to open the store")?;
    info!(backend = %config.backend, "Store opened");

    execute(&mut store, cli.command, out)?;

    if let Some(warning) = store.persistence_warning() {
        writeln!(out, "Warning: changes were kept in memory only ({warning})")?;
    }
    Ok(())
}

/// Run one command against an open store
///
/// # Errors
///
/// Returns the store error of a failed command, or an I/O error
pub fn execute<W: Write>(store: &mut FlatStore, command: Commands, out: &mut W) -> Result<()> {
    debug!(?command, "Executing command");
    match command {
        Commands::Seed => {
            store.reset();
            writeln!(out, "Store reset to the seed dataset")?;
            print_stats(&store.stats(), out)?;
        }
        Commands::Stats => print_stats(&store.stats(), out)?,
        Commands::Projects { masters } => {
            let projects: Vec<Project> = store
                .get_all_projects()?
                .into_iter()
                .filter(|project| !masters || project.is_master())
                .collect();
            print_projects(&projects, out)?;
        }
        Commands::Aggregate => {
            let changed = store.update_all_master_projects()?;
            writeln!(out, "Updated {changed} MASTER projects")?;
        }
        Commands::Export { output } => {
            let json = store.export()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    writeln!(out, "Exported to {}", path.display())?;
                }
                None => writeln!(out, "{json}")?,
            }
        }
        Commands::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            store
                .import(&json)
                .with_context(|| format!("Failed to import {}", file.display()))?;
            writeln!(out, "Imported {}", file.display())?;
            print_stats(&store.stats(), out)?;
        }
        Commands::ValidateTasks { project_id } => {
            store.validate_project_tasks(&project_id)?;
            let count = store.get_tasks_by_project(&project_id).len();
            writeln!(out, "All {count} tasks of {project_id} are valid")?;
        }
        Commands::DeleteProject { id, cascade } => {
            let handling = if cascade {
                DeleteChildHandling::Cascade
            } else {
                DeleteChildHandling::Error
            };
            let summary = store.delete_project(&id, handling)?;
            print_cascade_summary(&summary, out)?;
        }
    }
    Ok(())
}

/// Print record counts and storage details
///
/// # Errors
///
/// Returns an error if writing fails
pub fn print_stats<W: Write>(stats: &StoreStats, writer: &mut W) -> Result<()> {
    writeln!(writer, "Storage: {} (key {})", stats.storage, stats.storage_key)?;
    writeln!(writer, "Records: {}", stats.total_records)?;
    for (collection, count) in stats.counts.iter().filter(|(_, count)| **count > 0) {
        writeln!(writer, "  {collection:<24} {count:>5}")?;
    }
    if let Some(warning) = &stats.persistence_warning {
        writeln!(writer, "Persistence: {warning}")?;
    }
    Ok(())
}

/// Print projects with their status, dates and parent
///
/// # Errors
///
/// Returns an error if writing fails
pub fn print_projects<W: Write>(projects: &[Project], writer: &mut W) -> Result<()> {
    if projects.is_empty() {
        writeln!(writer, "No projects found")?;
        return Ok(());
    }

    writeln!(writer, "Found {} projects:", projects.len())?;
    for project in projects {
        writeln!(
            writer,
            "  • {} [{:?}] {}",
            truncate_string(&project.name, NAME_WIDTH),
            project.project_type,
            project.id
        )?;
        writeln!(
            writer,
            "    {:?}, {} .. {}",
            project.status,
            format_optional_date(project.start_date.as_ref()),
            format_optional_date(project.end_date.as_ref())
        )?;
        if let Some(parent_id) = &project.parent_id {
            writeln!(writer, "    Parent: {parent_id}")?;
        }
    }
    Ok(())
}

/// Print what a project delete removed
///
/// # Errors
///
/// Returns an error if writing fails
pub fn print_cascade_summary<W: Write>(summary: &CascadeSummary, writer: &mut W) -> Result<()> {
    writeln!(writer, "Deleted projects: {}", summary.projects.join(", "))?;
    writeln!(
        writer,
        "Removed {} schedules, {} tasks, {} comments",
        summary.schedules, summary.tasks, summary.comments
    )?;
    let links = summary.assignments + summary.factory_links + summary.custom_field_values;
    if links > 0 {
        writeln!(writer, "Removed {links} assignments, links and field values")?;
    }
    Ok(())
}
