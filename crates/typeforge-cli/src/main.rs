//! typeforge CLI - publish record types from JSON schemas.

mod colors;
mod list;
mod submit;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use typeforge_core::ForgeConfig;

#[derive(Parser)]
#[command(name = "typeforge")]
#[command(about = "Turn JSON schemas into validated Rust record types")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Catalog directory, overriding the configuration
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a schema and publish its record type
    Submit {
        /// Schema file, or `-` for stdin
        schema: String,

        /// Skip the rustc check and validate with syn only
        #[arg(long)]
        embedded: bool,
    },

    /// List published record types
    List,

    /// Print canonical identifiers for raw names
    Canonicalize {
        /// Raw names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Create an empty catalog
    Init,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Helper to format typeforge-core errors with recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(forge_err) = err.downcast_ref::<typeforge_core::Error>() {
            anyhow::anyhow!("{}", forge_err.with_hint())
        } else {
            err
        }
    };

    let config = load_config(&cli).map_err(format_error)?;

    match cli.command {
        Commands::Submit { schema, embedded } => {
            let published = submit::execute(&config, &schema, embedded).map_err(format_error)?;
            if !published {
                std::process::exit(1);
            }
        }

        Commands::List => list::execute(&config).map_err(format_error)?,

        Commands::Canonicalize { names } => {
            let canonicalizer = config.canonicalizer();
            for name in &names {
                println!("{}", canonicalizer.canonicalize(name));
            }
        }

        Commands::Init => {
            let store = typeforge_core::CatalogStore::open(&config.catalog_dir)
                .map_err(|e| format_error(e.into()))?;
            println!("Catalog ready at {}", store.root().display());
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<ForgeConfig> {
    let mut config = match &cli.config {
        Some(path) => ForgeConfig::load(path)?,
        None => ForgeConfig::default(),
    };
    if let Some(catalog) = &cli.catalog {
        config.catalog_dir = catalog.clone();
    }
    Ok(config)
}
