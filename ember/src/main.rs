//! Ember CLI

use clap::{Parser, Subcommand};
use ember::parser::SourceParser;
use ember::{InterpConfig, Interpreter};
use std::path::{Path, PathBuf};
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

#[derive(Parser)]
#[command(name = "ember", version, about = "Ember - tree-walking interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate a program (an AST serialized as JSON)
    Run {
        /// Program file
        file: PathBuf,
        /// Interpreter settings (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Maximum nested method calls, overrides the config file
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// Parse a program without evaluating it
    Check {
        /// Program file
        file: PathBuf,
    },
}

/// Install a `tracing` subscriber when `RUST_LOG` is set
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run {
            file,
            config,
            max_depth,
        } => run_file(&file, config.as_deref(), max_depth),
        Command::Check { file } => check_file(&file),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run_file(path: &Path, config: Option<&Path>, max_depth: Option<usize>) -> ember::Result<()> {
    let mut settings = match config {
        Some(config_path) => InterpConfig::load(config_path)?,
        None => InterpConfig::default(),
    };
    if let Some(depth) = max_depth {
        settings = settings.with_max_depth(depth);
    }

    let mut interp = Interpreter::with_config(settings);
    tracing::debug!(max_depth = interp.config().max_depth, path = %path.display(), "running");
    if interp.load(path)?.is_none() {
        return Err(ember::Error::io_error(format!("{}: no such file", path.display())));
    }
    Ok(())
}

fn check_file(path: &Path) -> ember::Result<()> {
    let source = std::fs::read_to_string(path)?;
    let nodes = ember::parser::JsonParser.parse(&source)?;
    println!("✓ {} parses ({} top-level statements)", path.display(), nodes.len());
    Ok(())
}
