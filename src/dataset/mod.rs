//! Dataset module for loading and processing growth stage images
//!
//! This module handles:
//! - Discovering the directory-per-class layout
//! - Image decoding, resizing and normalization
//! - Train/validation splitting and batch ordering

pub mod burn_dataset;
pub mod loader;
pub mod split;

pub use burn_dataset::{GrowthStageBatch, GrowthStageBatcher, GrowthStageBurnDataset, GrowthStageItem};
pub use loader::{ClassNames, DatasetStats, GrowthStageDataset, ImageSample};
pub use split::{DatasetSplit, SplitView};

/// Per-channel mean of the ImageNet training set (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel standard deviation of the ImageNet training set (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];
