//! animconv - animation table converter
//!
//! Compiles `.anim` sources (an `.object` with loop bounds and per-part
//! frames) into value/index/header tables emitted as assembler directives.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use animconv::{manifest, NumberFormat};

#[derive(Parser)]
#[command(name = "animconv")]
#[command(about = "Animation table converter")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single animation source
    Convert {
        /// Input .anim file
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit values in decimal instead of hex
        #[arg(short, long)]
        decimal: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Check animation sources without emitting tables
    Check {
        /// Input .anim files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Convert every animation listed in a manifest
    Build {
        /// Path to animconv.toml manifest
        #[arg(default_value = "animconv.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Validate the manifest and its sources without writing anything
        #[arg(long)]
        check: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

impl Commands {
    /// Progress lines are shown when verbose or when stdout is not the sink
    fn show_progress(&self) -> bool {
        match self {
            Commands::Convert {
                output, verbose, ..
            } => *verbose || output.is_some(),
            Commands::Check { .. } => true,
            Commands::Build { .. } => true,
        }
    }

    fn verbose(&self) -> bool {
        match self {
            Commands::Convert { verbose, .. } | Commands::Build { verbose, .. } => *verbose,
            Commands::Check { .. } => false,
        }
    }
}

fn init_logging(command: &Commands) {
    let directive = if command.verbose() {
        "debug"
    } else if command.show_progress() {
        "info"
    } else {
        "warn"
    };

    // Logs go to stderr so stdout only ever carries the generated tables
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directive)),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.command);

    match cli.command {
        Commands::Convert {
            input,
            output,
            decimal,
            verbose: _,
        } => {
            let format = if decimal {
                NumberFormat::Decimal
            } else {
                NumberFormat::Hex
            };
            tracing::info!("Converting {:?}", input);
            let text = animconv::convert_file(&input, format)
                .with_context(|| format!("Failed to convert {:?}", input))?;
            animconv::write_output(&text, output.as_deref())?;
            tracing::info!("Done!");
        }

        Commands::Check { inputs } => {
            for input in &inputs {
                animconv::compile_file(input)
                    .with_context(|| format!("{:?} is not a valid animation", input))?;
                tracing::info!("{:?} OK", input);
            }
        }

        Commands::Build {
            manifest,
            output,
            check,
            verbose: _,
        } => {
            let config = manifest::load_manifest(&manifest)?;
            if check {
                tracing::info!("Checking manifest {:?}", manifest);
                manifest::validate(&config)?;
                tracing::info!("Manifest is valid!");
            } else {
                tracing::info!("Building animations from {:?}", manifest);
                let written = manifest::build_all(&config, output.as_deref())?;
                tracing::info!("Build complete! {} animations written", written.len());
            }
        }
    }

    Ok(())
}
