// src/bin/keychain_edit.rs
//! keychain-edit: inspect, edit and prune a backup's keychain from the shell

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use keychain_backup_editor::config::Config;
use keychain_backup_editor::{parse_deletes, parse_edits, BackupRequest, Session};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "keychain-edit",
    version,
    about = "Inspect and edit the keychain of an encrypted device backup"
)]
struct Cli {
    /// Config file (defaults to $KBE_CONFIG or ./keychain-editor.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct BackupArgs {
    /// Backup directory
    backup: PathBuf,
    /// Backup password (prompted for when absent)
    #[arg(short, long, env = "KBE_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every keychain class as JSON
    Inspect {
        #[command(flatten)]
        backup: BackupArgs,
    },
    /// Apply edits and write the updated keychain-backup.plist
    Update {
        #[command(flatten)]
        backup: BackupArgs,
        /// JSON array of {"persistref": ..., <attr>: <value>}; `@file` reads a file
        #[arg(short, long)]
        items: String,
        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete records and write the updated keychain-backup.plist
    Delete {
        #[command(flatten)]
        backup: BackupArgs,
        /// JSON array of {"persistref": ...}; `@file` reads a file
        #[arg(short, long)]
        items: String,
        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => keychain_backup_editor::load_config().clone(),
    };
    let session = Session::from_config(&config);

    match cli.command {
        Commands::Inspect { backup } => {
            let request = backup_request(backup)?;
            let view = session.inspect(&request).context("inspect failed")?;
            for (class, class_view) in view.iter() {
                if class_view.undecrypted() > 0 {
                    warn!(
                        "{class}: {} of {} record(s) could not be decrypted and cannot be edited",
                        class_view.undecrypted(),
                        class_view.total
                    );
                }
            }
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &view)?;
            writeln!(stdout)?;
        }
        Commands::Update {
            backup,
            items,
            output,
        } => {
            let edits = parse_edits(&read_items(&items)?)?;
            let request = backup_request(backup)?;
            let bytes = session.update(&request, &edits).context("update failed")?;
            write_output(output.as_deref(), &config, &bytes)?;
        }
        Commands::Delete {
            backup,
            items,
            output,
        } => {
            let deletes = parse_deletes(&read_items(&items)?)?;
            let request = backup_request(backup)?;
            let bytes = session.delete(&request, &deletes).context("delete failed")?;
            write_output(output.as_deref(), &config, &bytes)?;
        }
    }

    Ok(())
}

fn backup_request(args: BackupArgs) -> Result<BackupRequest> {
    let password = match args.password {
        Some(password) => password,
        None => {
            eprint!("Backup password for {}: ", args.backup.display());
            std::io::stderr().flush()?;
            rpassword::read_password().context("Failed to read password")?
        }
    };
    if password.is_empty() {
        bail!("Missing path or password");
    }
    Ok(BackupRequest::new(args.backup, password))
}

fn read_items(items: &str) -> Result<String> {
    match items.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read items from {path}")),
        None => Ok(items.to_owned()),
    }
}

fn write_output(output: Option<&Path>, config: &Config, bytes: &[u8]) -> Result<()> {
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.output.file_name));
    std::fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("{} byte(s) → {}", bytes.len(), path.display());
    Ok(())
}
