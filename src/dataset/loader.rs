//! Growth Stage Dataset Loader
//!
//! Discovers a directory-per-class image layout and builds the sample list
//! and the class-name table from it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::utils::error::{GrowthStageError, Result};

/// File extensions recognized as images (compared case-insensitively)
pub const IMAGE_EXTENSIONS: [&str; 9] = [
    "jpg", "jpeg", "png", "ppm", "bmp", "pgm", "tif", "tiff", "webp",
];

/// A single image sample with its label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label index
    pub label: usize,
}

/// Ordered class names, index-aligned with integer labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassNames(Vec<String>);

impl ClassNames {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Name for a label index
    pub fn get(&self, label: usize) -> Option<&str> {
        self.0.get(label).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Write the table as a JSON array, replacing any previous file
    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.0)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a table written by [`ClassNames::save_json`]
    pub fn load_json(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Growth stage dataset: every image path with its label
#[derive(Debug)]
pub struct GrowthStageDataset {
    /// Root directory of the dataset
    pub root_dir: PathBuf,
    /// All samples, grouped by class in label order
    pub samples: Vec<ImageSample>,
    /// Class names in lexicographic order of their directories
    pub class_names: ClassNames,
}

impl GrowthStageDataset {
    /// Discover a dataset from a directory
    ///
    /// The directory should be structured as:
    /// ```text
    /// root_dir/
    /// ├── flowering/
    /// │   ├── image1.jpg
    /// │   └── image2.jpg
    /// ├── seedling/
    /// │   └── ...
    /// └── ...
    /// ```
    ///
    /// Class directories are searched recursively and symlinks are followed.
    pub fn new<P: AsRef<Path>>(root_dir: P) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        info!("Loading growth stage dataset from: {:?}", root_dir);

        if !root_dir.exists() {
            return Err(GrowthStageError::PathNotFound(root_dir));
        }

        // Discover all class directories
        let mut class_dirs: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(&root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    class_dirs.push(name.to_string());
                }
            }
        }
        class_dirs.sort();

        let mut samples = Vec::new();
        for (label, class_name) in class_dirs.iter().enumerate() {
            let class_dir = root_dir.join(class_name);

            let mut paths: Vec<PathBuf> = WalkDir::new(&class_dir)
                .min_depth(1)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .filter(|p| p.is_file() && is_image_file(p))
                .collect();
            paths.sort();

            if paths.is_empty() {
                warn!(
                    "Class '{}' has no images in {:?}, it will have zero support",
                    class_name, class_dir
                );
            }

            debug!(
                "Class '{}' (label {}): {} images",
                class_name,
                label,
                paths.len()
            );

            samples.extend(paths.into_iter().map(|path| ImageSample { path, label }));
        }

        if samples.is_empty() {
            return Err(GrowthStageError::EmptyDataset(root_dir));
        }

        info!(
            "Found {} classes, {} total samples",
            class_dirs.len(),
            samples.len()
        );

        Ok(Self {
            root_dir,
            samples,
            class_names: ClassNames::new(class_dirs),
        })
    }

    /// Get the number of samples in the dataset
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get the number of classes
    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Samples as `(path, label)` pairs, selected by index
    pub fn select(&self, indices: &[usize]) -> Vec<(PathBuf, usize)> {
        indices
            .iter()
            .filter_map(|&i| self.samples.get(i))
            .map(|s| (s.path.clone(), s.label))
            .collect()
    }

    /// Get statistics about the dataset
    pub fn get_stats(&self) -> DatasetStats {
        let mut class_counts = vec![0usize; self.num_classes()];
        for sample in &self.samples {
            class_counts[sample.label] += 1;
        }

        DatasetStats {
            total_samples: self.samples.len(),
            class_counts,
            class_names: self.class_names.clone(),
        }
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Statistics about the dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub class_counts: Vec<usize>,
    pub class_names: ClassNames,
}

impl DatasetStats {
    /// Print statistics to console
    pub fn print(&self) {
        println!("\n📊 Dataset Statistics:");
        println!("  Total samples: {}", self.total_samples);
        println!("  Number of classes: {}", self.class_names.len());
        println!("\n  Samples per class:");

        for (idx, name) in self.class_names.as_slice().iter().enumerate() {
            let count = self.class_counts[idx];
            let bar_len = (count as f32 / self.total_samples.max(1) as f32 * 40.0) as usize;
            let bar: String = "█".repeat(bar_len);
            println!("    {:3}. {:30} {:5} {}", idx, name, count, bar);
        }
    }
}
