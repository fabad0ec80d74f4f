//! # Growth Stage Classification
//!
//! Fine-tunes an ImageNet-pretrained ResNet-18 on photographs of plants
//! sorted into one directory per growth stage, using the Burn framework.
//!
//! ## Modules
//!
//! - `dataset`: Directory discovery, preprocessing and train/validation split
//! - `model`: ResNet-18, pretrained weight loading and configuration
//! - `training`: Epoch loop, checkpoint retention, evaluation and the pipeline driver
//! - `report`: Classification report and end-of-run artifacts
//! - `utils`: Logging, metrics, charts and error types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use growth_stage::backend::{default_device, TrainingBackend};
//! use growth_stage::training::run_training;
//! use growth_stage::TrainingConfig;
//!
//! let config = TrainingConfig {
//!     data_dir: "data/growth_stages".into(),
//!     ..Default::default()
//! };
//! let outcome = run_training::<TrainingBackend>(&config, default_device())?;
//! println!("accuracy {:.4}", outcome.report.accuracy);
//! ```

pub mod backend;
pub mod dataset;
pub mod model;
pub mod report;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::{ClassNames, DatasetSplit, GrowthStageDataset, GrowthStageItem};
pub use model::{load_classifier, ModelConfig, ResNet, RetentionPolicy, TrainingConfig};
pub use report::{ClassificationReport, Reporter};
pub use training::{run_training, Trainer, TrainingOutcome, TrainingState};
pub use utils::error::{GrowthStageError, Result};
pub use utils::metrics::{ConfusionMatrix, Metrics};

/// Default dataset location
pub const DEFAULT_DATA_DIR: &str = "data/growth_stages";

/// Default directory for every output artifact
pub const DEFAULT_OUTPUT_DIR: &str = "models";

/// Default location of torchvision's ImageNet ResNet-18 state dict
pub const DEFAULT_PRETRAINED_WEIGHTS: &str = "weights/resnet18-f37072fd.pth";
