//! Growth Stage Classification CLI
//!
//! Entry point for fine-tuning ResNet-18 on a directory-per-class dataset of
//! plant growth stage photographs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use growth_stage::backend::{backend_name, default_device, TrainingBackend};
use growth_stage::dataset::GrowthStageDataset;
use growth_stage::training::run_training;
use growth_stage::utils::logging::{init_logging, LogConfig, LogLevel};
use growth_stage::{RetentionPolicy, TrainingConfig};

/// Plant growth stage classification
///
/// Fine-tunes a pretrained ResNet-18 with the Burn framework and reports
/// accuracy, F1, a confusion matrix and the training loss curve.
#[derive(Parser, Debug)]
#[command(name = "growth_stage")]
#[command(version)]
#[command(about = "Fine-tune ResNet-18 on plant growth stage images with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, default_value = "false", conflicts_with = "verbose")]
    quiet: bool,

    /// Override the log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fine-tune the classifier and write every artifact
    Train {
        /// Path to the dataset directory (one subdirectory per class)
        #[arg(short, long, default_value = growth_stage::DEFAULT_DATA_DIR)]
        data_dir: PathBuf,

        /// Output directory for checkpoints, charts and the final model
        #[arg(short, long, default_value = growth_stage::DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Number of training epochs
        #[arg(short, long, default_value = "4")]
        epochs: usize,

        /// Batch size for training and validation
        #[arg(short, long, default_value = "32")]
        batch_size: usize,

        /// Square image size images are resized to
        #[arg(long, default_value = "128")]
        image_size: usize,

        /// Adam learning rate
        #[arg(short, long, default_value = "0.0005")]
        learning_rate: f64,

        /// Fraction of samples used for training (rest is validation)
        #[arg(long, default_value = "0.8")]
        train_fraction: f64,

        /// Random seed for the split and shuffling (derived from the clock if omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Checkpoint retention: all, best or last:N
        #[arg(long, default_value = "all")]
        keep: String,

        /// PyTorch state dict with ImageNet ResNet-18 weights
        #[arg(long, default_value = growth_stage::DEFAULT_PRETRAINED_WEIGHTS)]
        pretrained: PathBuf,

        /// Train from random initialization instead of ImageNet weights
        #[arg(long, default_value = "false")]
        no_pretrained: bool,
    },

    /// Show dataset statistics
    Stats {
        /// Path to the dataset directory
        #[arg(short, long, default_value = growth_stage::DEFAULT_DATA_DIR)]
        data_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = if cli.verbose {
        LogConfig::verbose()
    } else if cli.quiet {
        LogConfig::quiet()
    } else {
        LogConfig::default()
    };
    if let Some(level) = &cli.log_level {
        log_config.level = LogLevel::parse(level);
    }

    let _ = init_logging(&log_config);

    print_banner();

    match cli.command {
        Commands::Train {
            data_dir,
            output_dir,
            epochs,
            batch_size,
            image_size,
            learning_rate,
            train_fraction,
            seed,
            keep,
            pretrained,
            no_pretrained,
        } => {
            let config = TrainingConfig {
                data_dir,
                output_dir,
                epochs,
                batch_size,
                image_size,
                learning_rate,
                train_fraction,
                seed,
                retention: RetentionPolicy::parse(&keep)?,
                pretrained_weights: (!no_pretrained).then_some(pretrained),
            };
            cmd_train(&config)?;
        }

        Commands::Stats { data_dir } => {
            cmd_stats(&data_dir)?;
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 ╔══════════════════════════════════════════════════════════╗
 ║   🌱 Growth Stage Classification                         ║
 ║   ResNet-18 fine-tuning with Burn + Rust                 ║
 ╚══════════════════════════════════════════════════════════╝
  "#
        .green()
    );
}

fn cmd_train(config: &TrainingConfig) -> Result<()> {
    info!("Backend: {}", backend_name());
    println!("  Backend: {}", backend_name().cyan());
    println!("  Data: {:?}", config.data_dir);
    println!("  Output: {:?}", config.output_dir);
    println!(
        "  Epochs: {} | Batch: {} | Image: {}px | LR: {} | Checkpoints: {}",
        config.epochs,
        config.batch_size,
        config.image_size,
        config.learning_rate,
        config.retention
    );

    let outcome = run_training::<TrainingBackend>(config, default_device())
        .with_context(|| format!("Training on {:?} failed", config.data_dir))?;

    println!();
    println!("{}", "Artifacts:".cyan().bold());
    for path in &outcome.checkpoints {
        println!("  {:?}", path);
    }
    println!("  {:?}", outcome.final_model);
    println!("  {:?}", outcome.confusion_matrix);
    println!("  {:?}", outcome.loss_curve);

    Ok(())
}

fn cmd_stats(data_dir: &Path) -> Result<()> {
    info!("Computing dataset statistics for: {:?}", data_dir);

    let dataset = GrowthStageDataset::new(data_dir)
        .with_context(|| format!("Failed to read dataset at {:?}", data_dir))?;
    dataset.get_stats().print();

    Ok(())
}
