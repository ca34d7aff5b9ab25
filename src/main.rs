use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use canopy_pipeline::{
    DEFAULT_RANDOM_SEED, DEFAULT_TREE_COUNT, DEFAULT_VERBOSITY, ForestClassifier, Hyperparameters,
    RunConfig, RunController,
};

#[derive(Parser)]
#[command(name = "canopy")]
#[command(about = "Train, evaluate and persist a random forest on tabular CSV data")]
#[command(version)]
struct Cli {
    /// Number of trees in the forest
    #[arg(long = "n_estimators", default_value_t = DEFAULT_TREE_COUNT)]
    n_estimators: usize,

    /// RNG seed for reproducibility
    #[arg(long = "random_state", default_value_t = DEFAULT_RANDOM_SEED)]
    random_state: u64,

    /// Training log verbosity (0 = quiet, 1 = forest summary, 2 = every tree)
    #[arg(long, default_value_t = DEFAULT_VERBOSITY)]
    verbose: u32,

    /// Directory containing train.csv
    #[arg(long, env = "SM_CHANNEL_TRAIN")]
    train: PathBuf,

    /// Directory containing test.csv
    #[arg(long, env = "SM_CHANNEL_TEST")]
    test: PathBuf,

    /// Directory the model artifact is written to
    #[arg(long = "model-dir", env = "SM_MODEL_DIR")]
    model_dir: PathBuf,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Suppress all output except errors
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // --quiet wins over RUST_LOG.
    let filter = if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    let hyperparameters = Hyperparameters::new(cli.n_estimators)
        .context("invalid hyperparameters")?
        .with_random_seed(cli.random_state)
        .with_verbosity(cli.verbose);
    let config = RunConfig::new(hyperparameters, cli.train, cli.test, cli.model_dir);

    info!(
        tree_count = hyperparameters.tree_count(),
        random_seed = hyperparameters.random_seed(),
        verbosity = hyperparameters.verbosity(),
        train_dir = %config.train_dir().display(),
        test_dir = %config.test_dir().display(),
        model_dir = %config.model_dir().display(),
        "starting run"
    );

    let summary = match RunController::new(config, ForestClassifier::new()).run() {
        Ok(summary) => summary,
        Err(failure) => {
            let failure = anyhow::Error::new(failure);
            error!("{failure:#}");
            return Err(failure);
        }
    };

    info!(
        train_accuracy = summary.evaluation.train_accuracy,
        test_accuracy = summary.evaluation.test_accuracy,
        "run complete"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("failed to serialize run summary")?
    );
    Ok(())
}
