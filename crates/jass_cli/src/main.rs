//! JASS CLI
//!
//! Offline tools for JASS schemas and index names.
//!
//! # Commands
//!
//! - `compile` - Compile a schema to its engine mapping
//! - `hash` - Print the identity and mapping hashes of a schema
//! - `migrate` - Check an additive migration and print its delta
//! - `check-name` - Run the naming guard on an index name

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// JASS command-line schema tools.
#[derive(Parser)]
#[command(name = "jass")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a schema to its engine mapping
    Compile {
        /// Schema file
        schema: PathBuf,

        /// Fields compiled as nested object arrays
        #[arg(short, long, value_delimiter = ',')]
        nested: Vec<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Print the identity and mapping hashes of a schema
    Hash {
        /// Schema file
        schema: PathBuf,

        /// Fields compiled as nested object arrays
        #[arg(short, long, value_delimiter = ',')]
        nested: Vec<String>,
    },

    /// Check that one schema migrates additively to another
    Migrate {
        /// Current schema file
        from: PathBuf,

        /// Target schema file
        to: PathBuf,

        /// Fields compiled as nested object arrays
        #[arg(short, long, value_delimiter = ',')]
        nested: Vec<String>,
    },

    /// Check an index name against the naming guard
    CheckName {
        /// Index name or delete selector
        name: String,

        /// Tenant id
        #[arg(short, long)]
        tenant: String,

        /// Class prefix
        #[arg(short, long)]
        class: String,

        /// Check as a delete selector instead of a create name
        #[arg(short, long)]
        delete: bool,
    },

    /// Show version information
    Version,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env("JASS_LOG_LEVEL").unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<bool, commands::CliError> {
    let output = match cli.command {
        Commands::Compile {
            schema,
            nested,
            pretty,
        } => commands::compile::run(&schema, &nested, pretty)?,
        Commands::Hash { schema, nested } => commands::hash::run(&schema, &nested)?,
        Commands::Migrate { from, to, nested } => commands::migrate::run(&from, &to, &nested)?,
        Commands::CheckName {
            name,
            tenant,
            class,
            delete,
        } => {
            let (valid, line) = commands::check_name::run(&name, &tenant, &class, delete);
            println!("{line}");
            return Ok(valid);
        }
        Commands::Version => {
            format!("JASS CLI v{}", env!("CARGO_PKG_VERSION"))
        }
    };
    println!("{output}");
    Ok(true)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}
