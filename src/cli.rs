//! CLI interface for tractorbeam

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::oracle::OpenAiOracle;
use crate::source::MedicalRecordGenerator;
use crate::types::LearningRate;

const DEFAULT_WORDS: usize = 600;

#[derive(Parser)]
#[command(name = "tractorbeam")]
#[command(about = "Learn summary preferences from the edits you make", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive feedback session (default when no command given)
    Session {
        /// Approximate length of generated records
        #[arg(short, long, default_value_t = DEFAULT_WORDS)]
        words: usize,
        /// Seed for reproducible records
        #[arg(short, long)]
        seed: Option<u64>,
        /// Start with this document instead of a generated record
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Print a synthetic medical record
    Record {
        #[arg(short, long, default_value_t = DEFAULT_WORDS)]
        words: usize,
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Print the unified diff between two text files
    Diff {
        before: PathBuf,
        after: PathBuf,
    },
    /// Configure tractorbeam
    Config {
        /// Store the oracle API key in the OS keyring
        #[arg(long)]
        set_api_key: Option<String>,
        /// Remove the stored API key
        #[arg(long)]
        delete_api_key: bool,
        /// Set the default learning rate (slow, normal, fast)
        #[arg(long)]
        set_learning_rate: Option<String>,
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Restore the default configuration file
        #[arg(long)]
        reset: bool,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => run_session(DEFAULT_WORDS, None, None).await?,
        Some(Commands::Session { words, seed, file }) => run_session(words, seed, file).await?,
        Some(Commands::Record { words, seed }) => {
            let mut generator = match seed {
                Some(seed) => MedicalRecordGenerator::seeded(seed),
                None => MedicalRecordGenerator::new(),
            }
            .word_count(words);
            println!("{}", generator.generate());
        }
        Some(Commands::Diff { before, after }) => {
            let before_text = std::fs::read_to_string(&before)
                .with_context(|| format!("Failed to read {}", before.display()))?;
            let after_text = std::fs::read_to_string(&after)
                .with_context(|| format!("Failed to read {}", after.display()))?;
            let delta = crate::learning::compute_delta(&before_text, &after_text);
            if delta.is_empty() {
                eprintln!("No differences.");
            } else {
                print!("{}", delta);
            }
        }
        Some(Commands::Config { set_api_key, delete_api_key, set_learning_rate, show, reset }) => {
            if let Some(key) = set_api_key {
                crate::security::set_api_key(&key)?;
                println!("API key stored.");
            } else if delete_api_key {
                crate::security::delete_api_key()?;
                println!("API key removed.");
            } else if let Some(name) = set_learning_rate {
                let rate = LearningRate::parse_name(&name).with_context(|| {
                    format!("Unknown learning rate '{}' (expected slow, normal or fast)", name)
                })?;
                let mut config = Config::load()?;
                config.learning.learning_rate = rate;
                config.save()?;
                println!("Learning rate set to {} (promote at {}).", rate, rate.threshold());
            } else if reset {
                Config::default().save()?;
                println!("Configuration reset to defaults at {}", crate::config::config_path()?.display());
            } else if show {
                crate::config::show_config(&Config::load()?);
            } else {
                println!("Configuration options:");
                println!("  --set-api-key <key>          Store the oracle API key");
                println!("  --delete-api-key             Remove the stored API key");
                println!("  --set-learning-rate <rate>   slow (5), normal (3) or fast (2)");
                println!("  --show                       Display current configuration");
                println!("  --reset                      Restore defaults");
                println!();
                println!("The API key can also come from TRACTORBEAM_API_KEY or OPENAI_API_KEY.");
            }
        }
    }

    Ok(())
}

async fn run_session(words: usize, seed: Option<u64>, file: Option<PathBuf>) -> Result<()> {
    let config = Config::load()?;
    let oracle = OpenAiOracle::new(&config.oracle, crate::security::get_api_key())?;
    if !oracle.has_credential() {
        eprintln!("No API key configured. Run 'tractorbeam config --set-api-key <key>' or set TRACTORBEAM_API_KEY.");
        eprintln!("Oracle calls will fail until a key is available.");
    }

    let generator = crate::session::interactive::default_source(words, seed);

    crate::session::interactive::run(config, Arc::new(oracle), generator, file).await
}
