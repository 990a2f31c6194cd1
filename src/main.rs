//! # tabwash CLI
//!
//! The `tabwash` binary uploads tabular files, cleans them, and serves the
//! same operations over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! tabwash --config ./config/tabwash.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tabwash init` | Create the storage directories |
//! | `tabwash upload <path>` | Store a CSV/TSV/spreadsheet file in the raw namespace |
//! | `tabwash clean <name>` | Normalize a raw file into the cleaned namespace |
//! | `tabwash view <name>` | Preview the first rows of a cleaned file |
//! | `tabwash download <name>` | Write a cleaned file to stdout or `--output` |
//! | `tabwash list` | List raw and cleaned files |
//! | `tabwash logs` | Show recent activity |
//! | `tabwash serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! tabwash upload ./sales.csv
//! tabwash clean sales.csv
//! tabwash view sales.csv --json
//! tabwash download sales.csv --output ./sales.clean.csv
//! ```
//!
//! Diagnostics go to stderr and honour `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tabwash::{commands, config, pipeline::Pipeline, server};

/// tabwash: tabular file ingestion and cleaning.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Built-in defaults apply when the file does not exist.
#[derive(Parser)]
#[command(
    name = "tabwash",
    about = "tabwash: upload, clean, and preview tabular files",
    version,
    long_about = "tabwash stores uploaded CSV, TSV and spreadsheet files, normalizes them \
    (drops empty rows, trims text, snake_cases headers, fills missing cells with NULL), \
    and serves previews and downloads of the cleaned result via a CLI and an HTTP API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/tabwash.toml`.
    #[arg(long, global = true, default_value = "./config/tabwash.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Create the raw and cleaned storage directories.
    ///
    /// Idempotent; running it again is safe.
    Init,

    /// Upload a local file into the raw namespace.
    ///
    /// Accepted extensions: csv, tsv, xlsx, xlsm, xlsb, xls, ods.
    /// An existing raw file with the same name is replaced.
    Upload {
        /// Local file to upload.
        path: PathBuf,

        /// Store under this name instead of the file's own name.
        #[arg(long)]
        name: Option<String>,
    },

    /// Clean a previously uploaded file.
    ///
    /// Writes the canonical CSV into the cleaned namespace and prints
    /// the first rows.
    Clean {
        /// Raw file name.
        name: String,

        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Preview a cleaned file.
    View {
        /// Cleaned file name.
        name: String,

        /// Print the preview as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Export a cleaned file.
    Download {
        /// Cleaned file name.
        name: String,

        /// Destination path; stdout when omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// List raw and cleaned files.
    List,

    /// Show the most recent activity log lines.
    Logs {
        /// Number of lines (defaults to `[preview].log_lines`).
        #[arg(long)]
        lines: Option<usize>,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    if let Commands::Init = cli.command {
        return commands::run_init(&cfg);
    }
    if let Commands::Serve = cli.command {
        return server::run_server(&cfg).await;
    }

    let pipeline = Pipeline::from_config(&cfg);

    match cli.command {
        Commands::Upload { path, name } => {
            commands::run_upload(&pipeline, &path, name.as_deref())?;
        }
        Commands::Clean { name, json } => {
            commands::run_clean(&pipeline, &name, json)?;
        }
        Commands::View { name, json } => {
            commands::run_view(&pipeline, &name, json)?;
        }
        Commands::Download { name, output } => {
            commands::run_download(&pipeline, &name, output.as_deref())?;
        }
        Commands::List => {
            commands::run_list(&pipeline)?;
        }
        Commands::Logs { lines } => {
            commands::run_logs(&pipeline, lines)?;
        }
        Commands::Init | Commands::Serve => {}
    }

    Ok(())
}
