//! End-to-end fine-tuning run
//!
//! Load data, split, build the model, train, evaluate, report. Each stage
//! runs once, in that order, and the first error ends the run.

use std::path::PathBuf;
use std::time::Instant;

use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use colored::Colorize;
use tracing::info;

use crate::dataset::{DatasetSplit, GrowthStageBurnDataset, GrowthStageDataset};
use crate::model::{build_classifier, ModelConfig, TrainingConfig};
use crate::report::{ClassificationReport, Reporter, TrainingHistory};
use crate::training::trainer::Trainer;
use crate::utils::error::Result;
use crate::utils::format_duration;

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub report: ClassificationReport,
    pub history: TrainingHistory,
    /// Per-epoch checkpoints still on disk after retention
    pub checkpoints: Vec<PathBuf>,
    pub final_model: PathBuf,
    pub confusion_matrix: PathBuf,
    pub loss_curve: PathBuf,
}

/// Run the full pipeline with the given configuration
///
/// # Type Parameters
/// * `B` - The autodiff backend to use (e.g., `Autodiff<NdArray>` or `Autodiff<Cuda>`)
pub fn run_training<B>(config: &TrainingConfig, device: B::Device) -> Result<TrainingOutcome>
where
    B: AutodiffBackend,
{
    let started = Instant::now();
    config.validate()?;

    println!("{}", "Initializing Training...".green().bold());
    info!("Device: {:?}", device);

    std::fs::create_dir_all(&config.output_dir)?;

    let seed = config.resolve_seed();
    info!("Using seed {}", seed);

    // Dataset discovery and class table
    println!("{}", "Loading Dataset...".cyan());
    let dataset = GrowthStageDataset::new(&config.data_dir)?;
    dataset.get_stats().print();

    let class_names = dataset.class_names.clone();
    class_names.save_json(&config.class_names_path())?;
    info!(
        "Saved {} class names to {:?}: {:?}",
        class_names.len(),
        config.class_names_path(),
        class_names.as_slice()
    );

    // Every image decoded once; both splits index into the same cache
    let all_indices: Vec<usize> = (0..dataset.len()).collect();
    let images = GrowthStageBurnDataset::new_cached(dataset.select(&all_indices), config.image_size)?;

    println!("{}", "Creating Data Splits...".cyan());
    let split = DatasetSplit::new(dataset.len(), config.train_fraction, seed)?;
    println!(
        "  Train: {} samples | Validation: {} samples",
        split.train.len(),
        split.validation.len()
    );
    let mut train_view = split.train_view(config.batch_size, seed.wrapping_add(1))?;
    let mut validation_view = split.validation_view(config.batch_size)?;

    // Model
    println!("{}", "Building ResNet-18...".cyan());
    let model_config = ModelConfig::new(class_names.len(), config.image_size);
    model_config.save(&config.model_config_path())?;
    let model = build_classifier::<B>(
        &model_config,
        config.pretrained_weights.as_deref(),
        &device,
    )?;

    // Training
    println!("{}", "Training...".cyan());
    let mut trainer = Trainer::new(model, config.clone(), device);
    trainer.fit(&images, &mut train_view)?;

    // Evaluation
    println!("{}", "Evaluating...".cyan());
    let predictions = trainer.evaluate(&images, &mut validation_view)?;
    let report = ClassificationReport::new(&predictions, &class_names)?;

    // Report and artifacts
    let reporter = Reporter::new(config);
    reporter.print_report(&report);
    let confusion_matrix = reporter.render_confusion_matrix(&report, &class_names)?;
    let loss_curve = reporter.render_loss_curve(trainer.epoch_losses())?;
    let final_model = reporter.save_final_model(&trainer.model.valid())?;

    let duration = started.elapsed().as_secs_f64();
    let history = TrainingHistory {
        seed,
        backend: crate::backend::backend_name().to_string(),
        class_names,
        train_samples: split.train.len(),
        validation_samples: split.validation.len(),
        epoch_losses: trainer.epoch_losses().to_vec(),
        accuracy: report.accuracy,
        weighted_f1: report.weighted_f1(),
        macro_f1: report.macro_avg.f1,
        duration_secs: duration,
        finished_at: chrono::Utc::now().to_rfc3339(),
    };
    reporter.write_history(&history)?;

    println!(
        "\n{} Model saved to {:?} ({})",
        "✅".green(),
        final_model,
        format_duration(duration)
    );

    Ok(TrainingOutcome {
        report,
        history,
        checkpoints: trainer
            .checkpoints()
            .saved()
            .iter()
            .map(|c| c.path.clone())
            .collect(),
        final_model,
        confusion_matrix,
        loss_curve,
    })
}
