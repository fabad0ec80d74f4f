//! Configuration Module
//!
//! Immutable configuration handed to every pipeline stage:
//! - `ModelConfig`: what is needed to rebuild the classifier before loading
//!   a saved record
//! - `TrainingConfig`: paths and hyperparameters for one training run
//! - `RetentionPolicy`: which per-epoch checkpoints survive the run

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::utils::error::{GrowthStageError, Result};

/// Smallest input the ResNet-18 stem and its four stages can reduce cleanly
pub const MIN_IMAGE_SIZE: usize = 32;

/// Architecture parameters persisted next to every model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of output classes (width of the replaced head)
    pub num_classes: usize,

    /// Input image size (width and height, square)
    pub image_size: usize,

    /// Number of input channels (3 for RGB)
    pub input_channels: usize,
}

impl ModelConfig {
    /// Create a model configuration for `num_classes` outputs
    pub fn new(num_classes: usize, image_size: usize) -> Self {
        Self {
            num_classes,
            image_size,
            input_channels: 3,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_classes == 0 {
            return Err(GrowthStageError::Config(
                "num_classes must be greater than 0".to_string(),
            ));
        }

        if self.image_size < MIN_IMAGE_SIZE {
            return Err(GrowthStageError::Config(format!(
                "image_size must be at least {}",
                MIN_IMAGE_SIZE
            )));
        }

        if self.input_channels != 3 {
            return Err(GrowthStageError::Config(
                "input_channels must be 3 (RGB)".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Which per-epoch checkpoints are kept on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RetentionPolicy {
    /// Keep one checkpoint per epoch
    #[default]
    KeepAll,
    /// Keep only the most recent `n` checkpoints
    KeepLast(usize),
    /// Keep only the checkpoint with the lowest mean training loss
    KeepBest,
}

impl RetentionPolicy {
    /// Parse `all`, `best` or `last:N`
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "all" => Ok(Self::KeepAll),
            "best" => Ok(Self::KeepBest),
            _ => {
                let n = s
                    .strip_prefix("last:")
                    .and_then(|n| n.parse::<usize>().ok())
                    .filter(|&n| n > 0)
                    .ok_or_else(|| {
                        GrowthStageError::Config(format!(
                            "Unknown retention policy '{}' (expected all, best or last:N)",
                            s
                        ))
                    })?;
                Ok(Self::KeepLast(n))
            }
        }
    }
}

impl std::fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetentionPolicy::KeepAll => write!(f, "keep all"),
            RetentionPolicy::KeepLast(n) => write!(f, "keep last {}", n),
            RetentionPolicy::KeepBest => write!(f, "keep best"),
        }
    }
}

/// Configuration for one end-to-end training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Dataset root: one subdirectory per class
    pub data_dir: PathBuf,

    /// Directory receiving every output artifact
    pub output_dir: PathBuf,

    /// Number of training epochs
    pub epochs: usize,

    /// Batch size for training and validation
    pub batch_size: usize,

    /// Square resize target for every image
    pub image_size: usize,

    /// Adam learning rate (constant for the whole run)
    pub learning_rate: f64,

    /// Fraction of samples assigned to the training split
    pub train_fraction: f64,

    /// Seed for split and shuffling; `None` derives one from the clock
    pub seed: Option<u64>,

    /// Checkpoint retention policy
    pub retention: RetentionPolicy,

    /// PyTorch state dict with ImageNet ResNet-18 weights; `None` trains from scratch
    pub pretrained_weights: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(crate::DEFAULT_DATA_DIR),
            output_dir: PathBuf::from(crate::DEFAULT_OUTPUT_DIR),
            epochs: 4,
            batch_size: 32,
            image_size: 128,
            learning_rate: 5e-4,
            train_fraction: 0.8,
            seed: None,
            retention: RetentionPolicy::KeepAll,
            pretrained_weights: Some(PathBuf::from(crate::DEFAULT_PRETRAINED_WEIGHTS)),
        }
    }
}

impl TrainingConfig {
    /// Validate hyperparameters before any stage runs
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(GrowthStageError::Config(
                "epochs must be greater than 0".to_string(),
            ));
        }

        if self.batch_size == 0 {
            return Err(GrowthStageError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if self.image_size < MIN_IMAGE_SIZE {
            return Err(GrowthStageError::Config(format!(
                "image_size must be at least {}",
                MIN_IMAGE_SIZE
            )));
        }

        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(GrowthStageError::Config(
                "learning_rate must be a positive number".to_string(),
            ));
        }

        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(GrowthStageError::Config(
                "train_fraction must be in range (0.0, 1.0)".to_string(),
            ));
        }

        if self.retention == RetentionPolicy::KeepLast(0) {
            return Err(GrowthStageError::Config(
                "keep-last retention needs at least one checkpoint".to_string(),
            ));
        }

        Ok(())
    }

    /// The configured seed, or one derived from the current time
    pub fn resolve_seed(&self) -> u64 {
        self.seed
            .unwrap_or_else(|| chrono::Utc::now().timestamp_micros().unsigned_abs())
    }

    /// `<output_dir>/class_names.json`
    pub fn class_names_path(&self) -> PathBuf {
        self.output_dir.join("class_names.json")
    }

    /// `<output_dir>/growth_stage_epoch{epoch}.mpk` (1-based epoch)
    pub fn checkpoint_path(&self, epoch: usize) -> PathBuf {
        self.output_dir.join(format!("growth_stage_epoch{}.mpk", epoch))
    }

    /// `<output_dir>/growth_stage_full_model.mpk`
    pub fn final_model_path(&self) -> PathBuf {
        self.output_dir.join("growth_stage_full_model.mpk")
    }

    /// `<output_dir>/model_config.json`
    pub fn model_config_path(&self) -> PathBuf {
        self.output_dir.join("model_config.json")
    }

    /// `<output_dir>/confusion_matrix.svg`
    pub fn confusion_matrix_path(&self) -> PathBuf {
        self.output_dir.join("confusion_matrix.svg")
    }

    /// `<output_dir>/training_loss.svg`
    pub fn loss_curve_path(&self) -> PathBuf {
        self.output_dir.join("training_loss.svg")
    }

    /// `<output_dir>/training_history.json`
    pub fn history_path(&self) -> PathBuf {
        self.output_dir.join("training_history.json")
    }
}
