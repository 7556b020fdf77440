//! vertica-migrate CLI
//!
//! Renders migration plans into offline Vertica SQL scripts.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use vertica_migrate::prelude::*;

/// Vertica schema migrations.
#[derive(Parser)]
#[command(name = "vertica-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the SQL script for a migration plan without executing it.
    SqlMigrate {
        /// Migration plan (JSON).
        #[arg(short, long)]
        plan: PathBuf,

        /// Token written after each statement. Empty disables it.
        #[arg(short, long, env = "VERTICA_BATCH_SEPARATOR")]
        batch_separator: Option<String>,

        /// Context options file (JSON).
        #[arg(long)]
        options: Option<PathBuf>,

        /// Write the script here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Render rollback SQL instead of forward SQL.
        #[arg(short, long)]
        reverse: bool,
    },

    /// Check whether two type spellings denote the same Vertica type.
    CompareTypes {
        /// First type, e.g. `INT`.
        left: String,
        /// Second type, e.g. `INTEGER`.
        right: String,
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
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::SqlMigrate {
            plan,
            batch_separator,
            options,
            output,
            reverse,
        } => {
            let mut context_options = match options {
                Some(path) => ContextOptions::from_file(&path)?,
                None => ContextOptions::new(),
            };
            if let Some(separator) = batch_separator {
                context_options = context_options.with_batch_separator(separator);
            }

            let migration = ExecutableMigration::from_file(&plan)?;
            let mut executor = MigrationExecutor::new(VerticaImpl::offline(&context_options));
            if reverse {
                executor.rollback(&migration)?;
            } else {
                executor.apply(&migration)?;
            }
            let script = executor.into_inner().into_script().unwrap_or_default();

            match output {
                Some(path) => {
                    std::fs::write(&path, &script)?;
                    info!("Wrote script: {}", path.display());
                }
                None => print!("{}", script),
            }
        }

        Commands::CompareTypes { left, right } => {
            let equivalent = VerticaDialect::new().types_equivalent(&left, &right);
            println!(
                "{} and {} are {}",
                left,
                right,
                if equivalent {
                    "equivalent"
                } else {
                    "different"
                }
            );
        }
    }

    Ok(())
}
