//! xata-migrate CLI
//!
//! Command-line tool for diffing schemas and keeping the local migration
//! history in step with a branch's remote history.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use xata_migrate::history::DEFAULT_MIGRATIONS_DIR;
use xata_migrate::prelude::*;
use xata_migrate::reconcile;

/// Schema diffing and migration history reconciliation for Xata branches.
#[derive(Parser)]
#[command(name = "xata-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Migrations directory.
    #[arg(short, long, env = "XATA_MIGRATIONS_DIR", default_value = DEFAULT_MIGRATIONS_DIR)]
    migrations_dir: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the operations that turn one schema snapshot into another.
    Diff {
        /// Source schema (JSON).
        #[arg(long)]
        from: PathBuf,

        /// Target schema (JSON).
        #[arg(long)]
        to: PathBuf,

        /// Detect renamed tables instead of drop + create.
        #[arg(long)]
        detect_renames: bool,
    },

    /// Record the diff between two schema snapshots as a new migration.
    New {
        /// Source schema (JSON).
        #[arg(long)]
        from: PathBuf,

        /// Target schema (JSON).
        #[arg(long)]
        to: PathBuf,

        /// Migration id (generated if not specified).
        #[arg(short, long)]
        name: Option<String>,

        /// Detect renamed tables instead of drop + create.
        #[arg(long)]
        detect_renames: bool,
    },

    /// Compare local migrations with a remote history.
    Status {
        /// Remote history (JSON array of migrations).
        #[arg(short, long)]
        remote: PathBuf,
    },

    /// Check the checksum chain of local migrations.
    Verify,

    /// Update local migrations from a remote history.
    Pull {
        /// Remote history (JSON array of migrations).
        #[arg(short, long)]
        remote: PathBuf,

        /// Discard local migrations and take the remote history as is.
        #[arg(long)]
        force: bool,
    },

    /// Replay local-only migrations on top of a remote history.
    Rebase {
        /// Remote history (JSON array of migrations).
        #[arg(short, long)]
        remote: PathBuf,
    },

    /// Append local-only migrations to a remote history.
    Push {
        /// Remote history (JSON array of migrations).
        #[arg(short, long)]
        remote: PathBuf,

        /// Show what would be pushed without writing.
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let dir = MigrationDirectory::new(&cli.migrations_dir);

    match cli.command {
        Commands::Diff {
            from,
            to,
            detect_renames,
        } => {
            let operations = diff_files(&from, &to, detect_renames)?;
            println!("{}", serde_json::to_string_pretty(&operations)?);
        }

        Commands::New {
            from,
            to,
            name,
            detect_renames,
        } => {
            let operations = diff_files(&from, &to, detect_renames)?;
            if operations.is_empty() {
                info!("No changes detected.");
                return Ok(());
            }

            let local = dir.read()?;
            let id = name.unwrap_or_else(generate_migration_id);
            let parent = local.migrations.last().map(|u| u.id().to_string());
            let unit = match local.migrations.last().map(MigrationUnit::format) {
                Some(MigrationFormat::Legacy) => MigrationUnit::legacy(id, parent, operations),
                _ => MigrationUnit::versioned(id, parent, operations),
            };

            for operation in unit.operations() {
                info!("  - {}", operation.description());
            }
            let entries = dir.write(&[unit])?;
            for entry in entries {
                info!("Created migration: {}", dir.path().join(entry.file_name()).display());
            }
        }

        Commands::Status { remote } => {
            let local = dir.read()?;
            let remote = read_remote(&remote)?;

            let status = reconcile::status(&local.migrations, &remote);
            println!("\nMigrations ({}):", dir.path().display());
            println!("{:-<60}", "");
            println!(" common:      {}", status.common);
            for id in &status.local_only {
                println!(" [local]  {id}");
            }
            for id in &status.remote_only {
                println!(" [remote] {id}");
            }
            if status.is_synced() {
                println!(" Up to date.");
            }
            println!();
        }

        Commands::Verify => {
            let local = dir.read()?;
            if !local.warnings.is_empty() {
                bail!(
                    "{} checksum mismatch(es); run `{}` to resync",
                    local.warnings.len(),
                    xata_migrate::error::FORCE_RESYNC_COMMAND
                );
            }
            info!("{} migration(s) verified.", local.migrations.len());
        }

        Commands::Pull { remote, force } => {
            let remote = read_remote(&remote)?;
            let local = if force {
                Vec::new()
            } else {
                dir.read()?.migrations
            };
            let merged = pull(&local, &remote, force)?;
            dir.rewrite(&merged)?;
            info!("Local history now has {} migration(s).", merged.len());
        }

        Commands::Rebase { remote } => {
            let local = dir.read()?;
            let remote = read_remote(&remote)?;
            let rebased = rebase(&local.migrations, &remote)?;
            dir.rewrite(&rebased)?;
            info!("Local history now has {} migration(s).", rebased.len());
        }

        Commands::Push {
            remote: remote_path,
            dry_run,
        } => {
            let local = dir.read()?;
            let mut remote = read_remote(&remote_path)?;

            match plan_push(&local.migrations, &remote)? {
                PushPlan::UpToDate => info!("No new migrations to push."),
                PushPlan::Push(pending) => {
                    for unit in &pending {
                        info!("  - {}", unit.description());
                    }
                    if dry_run {
                        info!("Dry run: {} migration(s) would be pushed.", pending.len());
                    } else {
                        let count = pending.len();
                        remote.extend(pending);
                        let mut content = serde_json::to_string_pretty(&remote)?;
                        content.push('\n');
                        fs::write(&remote_path, content).with_context(|| {
                            format!("failed to write {}", remote_path.display())
                        })?;
                        info!("Pushed {count} migration(s).");
                    }
                }
            }
        }
    }

    Ok(())
}

fn diff_files(from: &Path, to: &Path, detect_renames: bool) -> anyhow::Result<Vec<Operation>> {
    let source = read_schema(from)?;
    let target = read_schema(to)?;
    let mut options = AutodetectorOptions::new();
    if detect_renames {
        options = options.with_rename_detection();
    }
    Ok(Autodetector::with_options(options).diff(&source, &target))
}

fn read_schema(path: &Path) -> anyhow::Result<LogicalSchema> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid schema in {}", path.display()))
}

fn read_remote(path: &Path) -> anyhow::Result<Vec<MigrationUnit>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid migration history in {}", path.display()))
}
