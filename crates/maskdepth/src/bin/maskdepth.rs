use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::data::{dataloader::batcher::Batcher, dataset::Dataset};
use clap::{Parser, Subcommand};
use maskdepth::{
    backend::{backend_name, create_device, SelectedBackend, TrainingBackend},
    config::{DataConfig, TrainingConfig},
    model::MaskDepthBatch,
    train::{MaskDepthBatcher, MaskDepthDataset},
    training::run_training,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "maskdepth")]
#[command(about = "Train dual-head models predicting a segmentation mask and a depth map")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model from a JSON configuration
    Train {
        /// Training configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Override the number of epochs
        #[arg(long)]
        epochs: Option<usize>,

        /// Override the base learning rate
        #[arg(long)]
        learning_rate: Option<f64>,

        /// Override the batch size
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Write a default training configuration
    InitConfig {
        /// Output JSON file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Load a dataset directory and report its triplets
    InspectDataset {
        /// Dataset root containing fgbg/, mask/ and depth/
        #[arg(short, long)]
        dir: PathBuf,

        /// Side every sample is resized to
        #[arg(short, long, default_value_t = 64)]
        size: u32,
    },

    /// Show backend information
    Info,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Train {
            config,
            epochs,
            learning_rate,
            batch_size,
        } => train(config, epochs, learning_rate, batch_size),
        Commands::InitConfig { output } => {
            let config = TrainingConfig::new(DataConfig::new(
                "data/train".to_owned(),
                "data/test".to_owned(),
            ));
            config.save(&output)?;
            tracing::info!(output = %output.display(), "default configuration written");
            Ok(())
        }
        Commands::InspectDataset { dir, size } => inspect_dataset(dir, size),
        Commands::Info => {
            println!("maskdepth Information:");
            println!("  Backend: {}", backend_name());
            println!("  Device: {:?}", create_device());
            Ok(())
        }
    }
}

fn train(
    config_path: PathBuf,
    epochs: Option<usize>,
    learning_rate: Option<f64>,
    batch_size: Option<usize>,
) -> Result<()> {
    let mut config = TrainingConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    if let Some(epochs) = epochs {
        config.num_epochs = epochs;
    }
    if let Some(learning_rate) = learning_rate {
        config.learning_rate = learning_rate;
    }
    if let Some(batch_size) = batch_size {
        config.batch_size = batch_size;
    }

    tracing::info!(
        backend = backend_name(),
        optimizer = ?config.optimizer.kind,
        learning_rate = config.learning_rate,
        batch_size = config.batch_size,
        epochs = config.num_epochs,
        train_dir = %config.dataset.train_dir,
        "configuration loaded",
    );

    let outcome = run_training::<TrainingBackend>(&config, create_device())?;
    println!("{}", outcome.stats.epoch_desc());
    Ok(())
}

fn inspect_dataset(dir: PathBuf, size: u32) -> Result<()> {
    let dataset = MaskDepthDataset::new(&dir, (size, size))?;
    println!("Dataset: {}", dir.display());
    println!("  Triplets: {}", dataset.len());

    let items: Vec<_> = (0..dataset.len().min(4))
        .filter_map(|index| dataset.get(index))
        .collect();
    if items.is_empty() {
        println!("  No loadable samples");
        return Ok(());
    }

    let batch: MaskDepthBatch<SelectedBackend> =
        MaskDepthBatcher::new().batch(items, &create_device());
    println!("  fgbg:  {:?}", batch.fgbg.dims());
    println!("  mask:  {:?}", batch.mask.dims());
    println!("  depth: {:?}", batch.depth.dims());
    Ok(())
}
