//! Model module for the growth stage classifier
//!
//! This module contains:
//! - ResNet-18 architecture with a replaceable classification head
//! - Loading ImageNet weights exported from PyTorch
//! - Saving and restoring trained classifiers
//! - Model and training configuration

pub mod config;
pub mod resnet;

use std::path::Path;

use burn::{
    module::Module,
    record::{CompactRecorder, FullPrecisionSettings, Recorder},
    tensor::backend::Backend,
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use tracing::{info, warn};

pub use config::{ModelConfig, RetentionPolicy, TrainingConfig};
pub use resnet::ResNet;

use crate::utils::error::{GrowthStageError, Result};
use resnet::{ResNetRecord, IMAGENET_CLASSES};

/// Load an ImageNet ResNet-18 from a PyTorch state dict (`.pth`)
pub fn load_imagenet_resnet<B: Backend>(path: &Path, device: &B::Device) -> Result<ResNet<B>> {
    load_torchvision_weights(ResNet::new(IMAGENET_CLASSES, device), path, device)
}

/// Load a torchvision-layout state dict into `model`
///
/// torchvision stores the shortcut projection as a `Sequential`, so its
/// `downsample.0`/`downsample.1` keys are mapped onto the named fields here.
/// `num_batches_tracked` buffers have no counterpart and are ignored.
pub fn load_torchvision_weights<B: Backend>(
    model: ResNet<B>,
    path: &Path,
    device: &B::Device,
) -> Result<ResNet<B>> {
    if !path.exists() {
        return Err(GrowthStageError::PathNotFound(path.to_path_buf()));
    }

    let load_args = LoadArgs::new(path.to_path_buf())
        .with_key_remap(r"downsample\.0", "downsample.conv")
        .with_key_remap(r"downsample\.1", "downsample.bn");

    let record: ResNetRecord<B> = PyTorchFileRecorder::<FullPrecisionSettings>::default()
        .load(load_args, device)
        .map_err(|e| {
            GrowthStageError::Model(format!(
                "Failed to read pretrained weights from {:?}: {}",
                path, e
            ))
        })?;

    Ok(model.load_record(record))
}

/// Build the classifier that training starts from
///
/// With `pretrained` set, the ImageNet backbone is loaded and its head replaced
/// by a fresh `512 -> num_classes` layer. Without it, every layer is randomly
/// initialized.
pub fn build_classifier<B: Backend>(
    config: &ModelConfig,
    pretrained: Option<&Path>,
    device: &B::Device,
) -> Result<ResNet<B>> {
    config.validate()?;

    match pretrained {
        Some(path) => {
            info!("Loading ImageNet weights from {:?}", path);
            let backbone = load_imagenet_resnet::<B>(path, device)?;
            Ok(backbone.replace_head(config.num_classes, device))
        }
        None => {
            warn!("No pretrained weights configured, training ResNet-18 from scratch");
            Ok(ResNet::new(config.num_classes, device))
        }
    }
}

/// Save a classifier with the compact recorder
///
/// Checkpoints and the final model go through here, so either can be
/// restored with [`load_classifier`].
pub fn save_classifier<B: Backend>(model: &ResNet<B>, path: &Path) -> Result<()> {
    model
        .clone()
        .save_file(path, &CompactRecorder::new())
        .map_err(|e| GrowthStageError::Checkpoint(format!("Failed to save {:?}: {}", path, e)))
}

/// Restore a classifier saved by [`save_classifier`]
pub fn load_classifier<B: Backend>(
    path: &Path,
    config: &ModelConfig,
    device: &B::Device,
) -> Result<ResNet<B>> {
    config.validate()?;

    ResNet::new(config.num_classes, device)
        .load_file(path, &CompactRecorder::new(), device)
        .map_err(|e| GrowthStageError::Model(format!("Failed to load {:?}: {}", path, e)))
}
