//! Hoby Loop CLI - Database migrations, seeding and tax-ID tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! hoby-cli migrate
//!
//! # Seed from the default file (data/seed.json)
//! hoby-cli seed
//!
//! # Seed from a YAML file
//! hoby-cli seed fixtures/demo.yaml
//!
//! # Check or punctuate a tax ID
//! hoby-cli document validate cpf 123.456.789-09
//! hoby-cli document format cnpj 11222333000181
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Reconcile a seed batch into the database
//! - `document` - Validate or format CPF/CNPJ numbers

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::document::DocumentKind;

mod commands;

#[derive(Parser)]
#[command(name = "hoby-cli")]
#[command(author, version, about = "Hoby Loop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database from a JSON or YAML batch file
    Seed {
        /// Batch file (`.yaml`/`.yml` is read as YAML, anything else as JSON)
        #[arg(default_value = commands::seed::DEFAULT_SEED_FILE)]
        file: PathBuf,
    },
    /// Validate or format CPF/CNPJ numbers
    Document {
        #[command(subcommand)]
        action: DocumentAction,
    },
}

#[derive(Subcommand)]
enum DocumentAction {
    /// Check the digits of a CPF or CNPJ
    Validate {
        #[arg(value_enum)]
        kind: DocumentKind,
        value: String,
    },
    /// Print a CPF or CNPJ with canonical punctuation
    Format {
        #[arg(value_enum)]
        kind: DocumentKind,
        value: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::print_stdout)]
async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(&file).await?,
        Commands::Document { action } => match action {
            DocumentAction::Validate { kind, value } => {
                match commands::document::validate(kind, &value) {
                    Ok(message) => println!("{message}"),
                    Err(e) => {
                        println!("{value} is invalid: {e}");
                        return Ok(ExitCode::FAILURE);
                    }
                }
            }
            DocumentAction::Format { kind, value } => {
                println!("{}", commands::document::format(kind, &value));
            }
        },
    }
    Ok(ExitCode::SUCCESS)
}
