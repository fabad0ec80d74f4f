//! Fine-tuning loop for the growth stage classifier
//!
//! This module implements the fixed-length training loop using the Burn framework:
//! - Forward/backward passes with automatic differentiation
//! - Cross-entropy loss computation
//! - Adam optimizer with a constant learning rate
//! - One checkpoint per completed epoch, filtered by the retention policy

use burn::{
    data::dataloader::batcher::Batcher,
    module::AutodiffModule,
    nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig},
    optim::{adaptor::OptimizerAdaptor, Adam, AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::{GrowthStageBatch, GrowthStageBatcher, GrowthStageBurnDataset, SplitView};
use crate::model::{ResNet, TrainingConfig};
use crate::training::checkpoint::CheckpointManager;
use crate::training::evaluator::{self, Predictions};
use crate::utils::error::{GrowthStageError, Result};
use crate::utils::logging::TrainingLogger;
use crate::utils::metrics::RunningAverage;

/// Adam epsilon, matching PyTorch's `optim.Adam` default
pub const ADAM_EPSILON: f32 = 1e-8;

/// Adam with default betas and the PyTorch epsilon
pub fn adam_config() -> AdamConfig {
    AdamConfig::new().with_epsilon(ADAM_EPSILON)
}

/// Where the trainer is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainerPhase {
    Idle,
    /// Iterating the training batches of a 1-based epoch
    EpochRunning { epoch: usize },
    /// Loss recorded and checkpoint handled for a 1-based epoch
    EpochComplete { epoch: usize },
    Done,
}

/// Training state for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingState {
    pub phase: TrainerPhase,
    /// Mean training loss per completed epoch, in epoch order
    pub epoch_losses: Vec<f64>,
    /// Optimizer steps taken
    pub iterations: usize,
    /// Training samples seen across all epochs
    pub samples_seen: usize,
}

impl Default for TrainingState {
    fn default() -> Self {
        Self {
            phase: TrainerPhase::Idle,
            epoch_losses: Vec::new(),
            iterations: 0,
            samples_seen: 0,
        }
    }
}

impl TrainingState {
    /// Number of epochs whose loss has been recorded
    pub fn completed_epochs(&self) -> usize {
        self.epoch_losses.len()
    }

    /// Epoch that the next call to `train_epoch` runs (1-based)
    fn next_epoch(&self) -> Result<usize> {
        match self.phase {
            TrainerPhase::Idle => Ok(1),
            TrainerPhase::EpochComplete { epoch } => Ok(epoch + 1),
            TrainerPhase::EpochRunning { epoch } => Err(GrowthStageError::Training(format!(
                "epoch {} is still running",
                epoch
            ))),
            TrainerPhase::Done => Err(GrowthStageError::Training(
                "training already finished".to_string(),
            )),
        }
    }
}

/// Trainer for the ResNet-18 classifier
pub struct Trainer<B: AutodiffBackend> {
    /// Model being trained
    pub model: ResNet<B>,
    optimizer: OptimizerAdaptor<Adam, ResNet<B>, B>,
    loss_fn: CrossEntropyLoss<B>,
    batcher: GrowthStageBatcher,
    checkpoints: CheckpointManager,
    config: TrainingConfig,
    pub state: TrainingState,
    device: B::Device,
}

impl<B: AutodiffBackend> Trainer<B> {
    /// Create a new trainer around a freshly built model
    pub fn new(model: ResNet<B>, config: TrainingConfig, device: B::Device) -> Self {
        let optimizer = adam_config().init();
        let loss_fn = CrossEntropyLossConfig::new().init(&device);

        Self {
            model,
            optimizer,
            loss_fn,
            batcher: GrowthStageBatcher::new(config.image_size),
            checkpoints: CheckpointManager::new(config.retention),
            config,
            state: TrainingState::default(),
            device,
        }
    }

    /// Run every configured epoch, checkpointing after each one
    pub fn fit(&mut self, dataset: &GrowthStageBurnDataset, train: &mut SplitView) -> Result<()> {
        let epochs = self.config.epochs;
        let mut logger = TrainingLogger::new(epochs);

        info!(
            "Training for {} epochs ({} samples, {} batches per epoch, lr {})",
            epochs,
            train.len(),
            train.num_batches(),
            self.config.learning_rate
        );

        for _ in 0..epochs {
            let epoch = self.state.next_epoch()?;
            logger.start_epoch(epoch);

            let loss = self.train_epoch(dataset, train)?;
            logger.end_epoch(loss);

            let path = self.config.checkpoint_path(epoch);
            self.checkpoints.commit(&self.model, epoch, loss, path)?;
        }

        self.state.phase = TrainerPhase::Done;
        logger.log_complete();

        Ok(())
    }

    /// Train for one full pass over the training view
    ///
    /// # Returns
    /// * Mean loss over the epoch's batches
    pub fn train_epoch(
        &mut self,
        dataset: &GrowthStageBurnDataset,
        train: &mut SplitView,
    ) -> Result<f64> {
        let epoch = self.state.next_epoch()?;
        self.state.phase = TrainerPhase::EpochRunning { epoch };

        let batches = train.next_pass();
        if batches.is_empty() {
            return Err(GrowthStageError::Training(
                "training split contains no samples".to_string(),
            ));
        }

        let pb = ProgressBar::new(batches.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  Epoch {prefix} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map_err(|e| GrowthStageError::Training(e.to_string()))?
                .progress_chars("#>-"),
        );
        pb.set_prefix(format!("{}/{}", epoch, self.config.epochs));

        let mut running_loss = RunningAverage::new();
        let mut correct = 0usize;
        let mut seen = 0usize;

        for (batch_idx, indices) in batches.iter().enumerate() {
            let items = dataset.gather(indices)?;
            let batch: GrowthStageBatch<B> =
                Batcher::<B, _, _>::batch(&self.batcher, items, &self.device);
            let batch_size = indices.len();

            let output = self.model.forward(batch.images);
            let loss = self
                .loss_fn
                .forward(output.clone(), batch.targets.clone());

            let loss_value: f64 = loss.clone().into_scalar().elem();
            if !loss_value.is_finite() {
                pb.abandon();
                return Err(GrowthStageError::Training(format!(
                    "non-finite loss {} at epoch {}, batch {}",
                    loss_value,
                    epoch,
                    batch_idx + 1
                )));
            }
            running_loss.add(loss_value);

            let predictions = output.argmax(1).reshape([batch_size]);
            let batch_correct: i64 = predictions
                .equal(batch.targets)
                .int()
                .sum()
                .into_scalar()
                .elem();
            correct += batch_correct as usize;
            seen += batch_size;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &self.model);
            self.model = self
                .optimizer
                .step(self.config.learning_rate, self.model.clone(), grads);

            self.state.iterations += 1;
            self.state.samples_seen += batch_size;

            pb.set_message(format!(
                "loss {:.4} acc {:.1}%",
                running_loss.average(),
                100.0 * correct as f64 / seen as f64
            ));
            pb.inc(1);

            debug!(
                "  Batch {}/{}: loss = {:.4}",
                batch_idx + 1,
                batches.len(),
                loss_value
            );
        }

        pb.finish_and_clear();

        let mean_loss = running_loss.average();
        self.state.epoch_losses.push(mean_loss);
        self.state.phase = TrainerPhase::EpochComplete { epoch };

        info!(
            "Epoch {}/{} training: loss = {:.4}, accuracy = {:.2}%",
            epoch,
            self.config.epochs,
            mean_loss,
            100.0 * correct as f64 / seen.max(1) as f64
        );

        Ok(mean_loss)
    }

    /// Predict every validation sample with gradients disabled
    pub fn evaluate(
        &self,
        dataset: &GrowthStageBurnDataset,
        validation: &mut SplitView,
    ) -> Result<Predictions> {
        let model = self.model.valid();
        evaluator::evaluate::<B::InnerBackend>(
            &model,
            dataset,
            validation,
            &self.batcher,
            &self.device,
        )
    }

    /// Per-epoch mean losses recorded so far
    pub fn epoch_losses(&self) -> &[f64] {
        &self.state.epoch_losses
    }

    /// Retention bookkeeping for written checkpoints
    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }
}
