//! Training module for fine-tuning the growth stage classifier
//!
//! This module provides:
//! - The epoch loop with Adam and cross-entropy loss
//! - Checkpoint retention
//! - The validation pass
//! - The pipeline driver wiring every stage together

pub mod checkpoint;
pub mod evaluator;
pub mod pipeline;
pub mod trainer;

// Re-export main types for convenience
pub use checkpoint::{CheckpointManager, RetentionDecision, SavedCheckpoint};
pub use evaluator::{evaluate, Predictions};
pub use pipeline::{run_training, TrainingOutcome};
pub use trainer::{Trainer, TrainerPhase, TrainingState};

pub use crate::model::config::TrainingConfig;
