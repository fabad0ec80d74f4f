//! Train/validation split and batch ordering
//!
//! The dataset is partitioned once into two disjoint index sets. Each side is
//! then exposed as a [`SplitView`] that hands out fixed-size index batches:
//! the training view draws a fresh order on every pass, the validation view
//! always yields the same order.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::utils::error::{GrowthStageError, Result};

/// Disjoint train/validation index sets over `0..N`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSplit {
    /// Indices of training samples
    pub train: Vec<usize>,
    /// Indices of validation samples
    pub validation: Vec<usize>,
}

impl DatasetSplit {
    /// Randomly assign `num_samples` indices, `round(train_fraction * N)` of them to training
    pub fn new(num_samples: usize, train_fraction: f64, seed: u64) -> Result<Self> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(GrowthStageError::Config(format!(
                "train_fraction must be in range (0.0, 1.0), got {}",
                train_fraction
            )));
        }

        let train_len = Self::train_len(num_samples, train_fraction);

        let mut indices: Vec<usize> = (0..num_samples).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let validation = indices.split_off(train_len);

        Ok(Self {
            train: indices,
            validation,
        })
    }

    /// Training subset size for `num_samples` samples
    pub fn train_len(num_samples: usize, train_fraction: f64) -> usize {
        ((num_samples as f64 * train_fraction).round() as usize).min(num_samples)
    }

    /// Total number of samples covered
    pub fn len(&self) -> usize {
        self.train.len() + self.validation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Batched view over the training indices, reshuffled on every pass
    pub fn train_view(&self, batch_size: usize, seed: u64) -> Result<SplitView> {
        SplitView::new(
            self.train.clone(),
            batch_size,
            Some(ChaCha8Rng::seed_from_u64(seed)),
        )
    }

    /// Batched view over the validation indices, in fixed order
    pub fn validation_view(&self, batch_size: usize) -> Result<SplitView> {
        SplitView::new(self.validation.clone(), batch_size, None)
    }
}

/// Batch-iterable view over one side of a split
#[derive(Debug, Clone)]
pub struct SplitView {
    indices: Vec<usize>,
    batch_size: usize,
    rng: Option<ChaCha8Rng>,
}

impl SplitView {
    fn new(indices: Vec<usize>, batch_size: usize, rng: Option<ChaCha8Rng>) -> Result<Self> {
        if batch_size == 0 {
            return Err(GrowthStageError::Config(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            indices,
            batch_size,
            rng,
        })
    }

    /// Number of samples in the view
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of batches in one full pass (the last one may be short)
    pub fn num_batches(&self) -> usize {
        self.indices.len().div_ceil(self.batch_size)
    }

    /// Whether each pass draws a new order
    pub fn is_shuffled(&self) -> bool {
        self.rng.is_some()
    }

    /// Index batches for one full pass over the view
    pub fn next_pass(&mut self) -> Vec<Vec<usize>> {
        if let Some(rng) = self.rng.as_mut() {
            self.indices.shuffle(rng);
        }

        self.indices
            .chunks(self.batch_size)
            .map(|chunk| chunk.to_vec())
            .collect()
    }
}
