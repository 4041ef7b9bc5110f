use clap::{Parser, Subcommand, ValueEnum};
use mpsopt_model::{Model, ModelDocument, NameRegistry};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mpsopt")]
#[command(about = "Encode linear and mixed-integer models into MPS", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a JSON model document as MPS
    Encode {
        /// The model document
        file: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Check a JSON model document for errors
    Check {
        /// The model document
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// Aligned table with row ids
    Table,
    /// Free-format MPS text
    Mps,
    /// JSON rows
    Json,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_model(file: &Path) -> Model {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            std::process::exit(1);
        }
    };

    let document = match ModelDocument::from_json(&source) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("✗ {} has errors:", file.display());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    match document.build(&NameRegistry::new()) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("✗ {} has errors:", file.display());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Encode { file, format } => {
            let model = load_model(&file);
            let frame = model.to_frame();
            match format {
                Format::Table => println!("{}", frame),
                Format::Mps => print!("{}", frame.to_free_mps()),
                Format::Json => match serde_json::to_string_pretty(&frame) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error serializing frame: {}", e);
                        std::process::exit(1);
                    }
                },
            }
        }
        Commands::Check { file } => {
            let model = load_model(&file);
            let integers = model
                .variables()
                .filter(|v| v.kind() != mpsopt_model::VariableKind::Continuous)
                .count();

            println!("✓ {} is valid", file.display());
            println!("  model {}", model.name());
            println!("  {} variables ({} integer or binary)", model.num_variables(), integers);
            println!("  {} constraints", model.num_constraints());
            match model.objective().name() {
                Some(name) => println!("  objective {} ({})", name, model.sense()),
                None => println!("  no objective"),
            }
            let blocks = model.user_blocks();
            if !blocks.is_empty() {
                println!("  {} rows with decomposition blocks", blocks.len());
            }
        }
    }
}
