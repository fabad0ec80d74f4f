//! Burn Dataset Integration for growth stage images
//!
//! This module implements Burn's Dataset trait and Batcher for
//! data loading and batching during training and evaluation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use image::imageops::FilterType;
use image::ImageReader;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{IMAGENET_MEAN, IMAGENET_STD};
use crate::utils::error::{GrowthStageError, Result, ResultExt};

/// A single preprocessed image ready for Burn
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GrowthStageItem {
    /// Image data as flattened CHW float array [3 * H * W], values in [0, 1]
    pub image: Vec<f32>,
    /// Class label
    pub label: usize,
    /// Image path (for logging)
    pub path: String,
}

impl GrowthStageItem {
    /// Load, resize and convert an image
    pub fn from_path(path: &Path, label: usize, image_size: usize) -> Result<Self> {
        let img = ImageReader::open(path)
            .map_err(|e| GrowthStageError::ImageLoad(path.to_path_buf(), e.to_string()))?
            .with_guessed_format()
            .map_err(|e| GrowthStageError::ImageLoad(path.to_path_buf(), e.to_string()))?
            .decode()
            .map_err(|e| GrowthStageError::ImageLoad(path.to_path_buf(), e.to_string()))?
            .resize_exact(image_size as u32, image_size as u32, FilterType::Triangle)
            .to_rgb8();

        let (width, height) = (image_size, image_size);
        let plane = height * width;
        let mut image = vec![0.0f32; 3 * plane];

        // HWC bytes -> CHW floats in [0, 1]
        for (x, y, pixel) in img.enumerate_pixels() {
            let offset = y as usize * width + x as usize;
            image[offset] = pixel[0] as f32 / 255.0;
            image[plane + offset] = pixel[1] as f32 / 255.0;
            image[2 * plane + offset] = pixel[2] as f32 / 255.0;
        }

        Ok(Self {
            image,
            label,
            path: path.to_string_lossy().to_string(),
        })
    }
}

/// Dataset holding every preprocessed image in memory
#[derive(Debug, Clone)]
pub struct GrowthStageBurnDataset {
    items: Vec<GrowthStageItem>,
}

impl GrowthStageBurnDataset {
    /// Decode every sample up front, in parallel
    ///
    /// Items keep the order of `samples`. The first unreadable image aborts
    /// the whole load.
    pub fn new_cached(samples: Vec<(PathBuf, usize)>, image_size: usize) -> Result<Self> {
        let total = samples.len();
        println!("  📦 Pre-loading {} images into memory (parallel)...", total);

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );

        let loaded = AtomicUsize::new(0);

        let items = samples
            .par_iter()
            .map(|(path, label)| {
                let result = GrowthStageItem::from_path(path, *label, image_size);
                let count = loaded.fetch_add(1, Ordering::Relaxed) + 1;
                if count % 100 == 0 || count == total {
                    pb.set_position(count as u64);
                }
                result
            })
            .collect::<Result<Vec<_>>>();

        match &items {
            Ok(items) => pb.finish_with_message(format!("Loaded {} images", items.len())),
            Err(_) => pb.abandon(),
        }

        Ok(Self { items: items? })
    }

    /// Build from already preprocessed items
    pub fn from_items(items: Vec<GrowthStageItem>) -> Self {
        Self { items }
    }

    /// Items at the given positions, in the given order
    pub fn gather(&self, indices: &[usize]) -> Result<Vec<GrowthStageItem>> {
        indices
            .iter()
            .map(|&i| {
                self.get(i).with_context(|| {
                    format!(
                        "Index {} out of range for dataset of {} items",
                        i,
                        self.items.len()
                    )
                })
            })
            .collect()
    }
}

impl Dataset<GrowthStageItem> for GrowthStageBurnDataset {
    fn get(&self, index: usize) -> Option<GrowthStageItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// A batch of growth stage images
#[derive(Clone, Debug)]
pub struct GrowthStageBatch<B: Backend> {
    /// Batch of normalized images with shape [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// Batch of labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher stacking items and applying ImageNet channel normalization
#[derive(Clone, Debug)]
pub struct GrowthStageBatcher {
    image_size: usize,
}

impl GrowthStageBatcher {
    pub fn new(image_size: usize) -> Self {
        Self { image_size }
    }
}

impl<B: Backend> Batcher<B, GrowthStageItem, GrowthStageBatch<B>> for GrowthStageBatcher {
    fn batch(&self, items: Vec<GrowthStageItem>, device: &B::Device) -> GrowthStageBatch<B> {
        let batch_size = items.len();
        let channels = 3;
        let height = self.image_size;
        let width = self.image_size;

        let images_data: Vec<f32> = items.iter().flat_map(|item| item.image.clone()).collect();

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, channels, height, width]),
            device,
        );

        // (x - mean) / std per channel
        let mean = Tensor::<B, 4>::from_floats(
            TensorData::new(IMAGENET_MEAN.to_vec(), [1, 3, 1, 1]),
            device,
        );
        let std = Tensor::<B, 4>::from_floats(
            TensorData::new(IMAGENET_STD.to_vec(), [1, 3, 1, 1]),
            device,
        );

        let images = (images - mean) / std;

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        GrowthStageBatch { images, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use image::{Rgb, RgbImage};

    type TestBackend = NdArray;

    fn write_solid(path: &Path, color: [u8; 3], size: u32) {
        RgbImage::from_pixel(size, size, Rgb(color)).save(path).unwrap();
    }

    #[test]
    fn test_item_is_resized_chw_in_unit_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        write_solid(&path, [255, 0, 51], 50);

        let item = GrowthStageItem::from_path(&path, 1, 32).unwrap();
        assert_eq!(item.image.len(), 3 * 32 * 32);
        assert_eq!(item.label, 1);
        assert!(item.image.iter().all(|v| (0.0..=1.0).contains(v)));

        // Channel planes are contiguous
        assert!((item.image[0] - 1.0).abs() < 1e-6);
        assert!(item.image[32 * 32].abs() < 1e-6);
        assert!((item.image[2 * 32 * 32] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_corrupt_image_is_image_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let result = GrowthStageItem::from_path(&path, 0, 32);
        assert!(matches!(result, Err(GrowthStageError::ImageLoad(_, _))));
    }

    #[test]
    fn test_cached_load_is_fatal_on_bad_image() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        let bad = dir.path().join("bad.png");
        write_solid(&good, [10, 20, 30], 40);
        std::fs::write(&bad, b"garbage").unwrap();

        let result = GrowthStageBurnDataset::new_cached(vec![(good, 0), (bad, 1)], 32);
        assert!(result.is_err());
    }

    #[test]
    fn test_cached_load_keeps_sample_order() {
        let dir = tempfile::tempdir().unwrap();
        let samples: Vec<_> = (0..5)
            .map(|i| {
                let path = dir.path().join(format!("{}.png", i));
                write_solid(&path, [i as u8 * 40, 0, 0], 40);
                (path, i % 2)
            })
            .collect();

        let dataset = GrowthStageBurnDataset::new_cached(samples.clone(), 32).unwrap();
        assert_eq!(dataset.len(), 5);
        for (i, (path, label)) in samples.iter().enumerate() {
            let item = dataset.get(i).unwrap();
            assert_eq!(item.label, *label);
            assert_eq!(item.path, path.to_string_lossy());
        }
        assert!(dataset.gather(&[4, 0]).is_ok());
        assert!(dataset.gather(&[5]).is_err());
    }

    #[test]
    fn test_batcher_applies_imagenet_normalization() {
        let device = Default::default();
        let size = 32;
        let item = GrowthStageItem {
            image: vec![0.485; 3 * size * size],
            label: 2,
            path: "mem".to_string(),
        };

        let batcher = GrowthStageBatcher::new(size);
        let batch: GrowthStageBatch<TestBackend> =
            Batcher::<TestBackend, _, _>::batch(&batcher, vec![item.clone(), item], &device);

        assert_eq!(batch.images.dims(), [2, 3, size, size]);
        assert_eq!(batch.targets.dims(), [2]);

        let values = batch.images.into_data().to_vec::<f32>().unwrap();
        // Red channel sits exactly on its mean
        assert!(values[0].abs() < 1e-5);
        // Blue channel: (0.485 - 0.406) / 0.225
        let blue = values[2 * size * size];
        assert!((blue - (0.485 - 0.406) / 0.225).abs() < 1e-4);
    }
}
