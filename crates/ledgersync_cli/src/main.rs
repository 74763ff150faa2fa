//! Ledgersync CLI
//!
//! Operator tools for a ledgersync server's data directory.
//!
//! # Commands
//!
//! - `hash` - Show the canonical form, hash and bucket of a timestamp
//! - `files` - List registered files
//! - `inspect` - Show the stored digest of a file
//! - `verify` - Check a file's stored digest against its change log

mod commands;

use clap::{Parser, Subcommand};
use ledgersync_storage::{Storage, StorageConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Ledgersync operator tools.
#[derive(Parser)]
#[command(name = "ledgersync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Server data directory (holds server-files/ and user-files/)
    #[arg(global = true, short, long)]
    data_dir: Option<PathBuf>,

    /// Directory of the account database, overriding --data-dir
    #[arg(global = true, long)]
    server_files: Option<PathBuf>,

    /// Directory of per-file group databases, overriding --data-dir
    #[arg(global = true, long)]
    user_files: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the canonical form, hash and bucket of a timestamp
    Hash {
        /// Timestamp to parse
        timestamp: String,
    },

    /// List registered files
    Files {
        /// Include deleted files
        #[arg(short, long)]
        all: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show the stored digest of a file's current group
    Inspect {
        /// File to inspect
        #[arg(long)]
        file_id: String,

        /// Print the digest tree down to this depth
        #[arg(long, default_value = "0")]
        tree_depth: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Rebuild a file's digest from its change log and compare
    Verify {
        /// File to verify
        #[arg(long)]
        file_id: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

impl Cli {
    fn storage_config(&self) -> Result<StorageConfig, Box<dyn std::error::Error>> {
        let defaults = self.data_dir.as_ref().map(StorageConfig::sqlite_in);
        let (default_server, default_user) = match defaults {
            Some(StorageConfig::Sqlite {
                server_files,
                user_files,
            }) => (Some(server_files), Some(user_files)),
            _ => (None, None),
        };

        match (
            self.server_files.clone().or(default_server),
            self.user_files.clone().or(default_user),
        ) {
            (Some(server_files), Some(user_files)) => Ok(StorageConfig::Sqlite {
                server_files,
                user_files,
            }),
            _ => Err("--data-dir (or both --server-files and --user-files) required".into()),
        }
    }

    fn open_storage(&self) -> Result<Storage, Box<dyn std::error::Error>> {
        let config = self.storage_config()?;
        tracing::debug!(?config, "opening storage");
        Ok(Storage::open(&config)?)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Hash { timestamp } => {
            commands::hash::run(timestamp)?;
        }
        Commands::Files { all, format } => {
            commands::files::run(&cli.open_storage()?, *all, format)?;
        }
        Commands::Inspect {
            file_id,
            tree_depth,
            format,
        } => {
            commands::inspect::run(&cli.open_storage()?, file_id, *tree_depth, format)?;
        }
        Commands::Verify { file_id, format } => {
            let consistent = commands::verify::run(&cli.open_storage()?, file_id, format)?;
            if !consistent {
                return Err(format!("digest of {file_id} does not match its change log").into());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_layout() {
        let cli = Cli::parse_from(["ledgersync", "--data-dir", "/srv/data", "files"]);
        assert_eq!(
            cli.storage_config().unwrap(),
            StorageConfig::sqlite_in("/srv/data")
        );
    }

    #[test]
    fn explicit_dirs_override_data_dir() {
        let cli = Cli::parse_from([
            "ledgersync",
            "--data-dir",
            "/srv/data",
            "--user-files",
            "/mnt/groups",
            "files",
        ]);
        assert_eq!(
            cli.storage_config().unwrap(),
            StorageConfig::Sqlite {
                server_files: PathBuf::from("/srv/data/server-files"),
                user_files: PathBuf::from("/mnt/groups"),
            }
        );
    }

    #[test]
    fn storage_location_required() {
        let cli = Cli::parse_from(["ledgersync", "--server-files", "/a", "files"]);
        assert!(cli.storage_config().is_err());
    }

    #[test]
    fn hash_needs_no_storage() {
        let cli = Cli::parse_from([
            "ledgersync",
            "hash",
            "2018-11-12T13:21:40.122Z-0000-0123456789ABCDEF",
        ]);
        assert!(matches!(cli.command, Commands::Hash { .. }));
    }
}
