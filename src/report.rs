//! Evaluation report and artifact output
//!
//! [`ClassificationReport`] is computed from predictions alone and holds no
//! I/O. [`Reporter`] prints it, renders the SVG charts and writes the final
//! model and run history into the output directory.

use std::fmt::Write as _;
use std::path::PathBuf;

use burn::tensor::backend::Backend;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::ClassNames;
use crate::model::{save_classifier, ResNet, TrainingConfig};
use crate::training::evaluator::Predictions;
use crate::utils::charts::{self, DataSeries, COLOR_PRIMARY};
use crate::utils::error::{GrowthStageError, Result};
use crate::utils::metrics::{ConfusionMatrix, Metrics};

/// Precision/recall/F1 line for one class or one average
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub name: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class breakdown plus accuracy, macro and weighted averages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// One row per class, in label order
    pub class_rows: Vec<ReportRow>,
    pub accuracy: f64,
    pub macro_avg: ReportRow,
    pub weighted_avg: ReportRow,
    /// Rows are actual classes, columns predicted classes
    pub confusion_matrix: ConfusionMatrix,
    pub total: usize,
}

impl ClassificationReport {
    /// Build the report from aligned predictions
    pub fn new(predictions: &Predictions, class_names: &ClassNames) -> Result<Self> {
        if predictions.predicted.len() != predictions.actual.len() {
            return Err(GrowthStageError::Model(format!(
                "{} predictions for {} labels",
                predictions.predicted.len(),
                predictions.actual.len()
            )));
        }

        let num_classes = class_names.len();
        if let Some(&label) = predictions
            .predicted
            .iter()
            .chain(&predictions.actual)
            .find(|&&label| label >= num_classes)
        {
            return Err(GrowthStageError::Model(format!(
                "label {} outside of {} known classes",
                label, num_classes
            )));
        }

        let metrics =
            Metrics::from_predictions(&predictions.predicted, &predictions.actual, num_classes);

        let class_rows = metrics
            .per_class
            .iter()
            .map(|m| ReportRow {
                name: class_names
                    .get(m.class_idx)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("class_{}", m.class_idx)),
                precision: m.precision,
                recall: m.recall,
                f1: m.f1,
                support: m.support,
            })
            .collect();

        Ok(Self {
            class_rows,
            accuracy: metrics.accuracy,
            macro_avg: ReportRow {
                name: "macro avg".to_string(),
                precision: metrics.macro_precision,
                recall: metrics.macro_recall,
                f1: metrics.macro_f1,
                support: metrics.total_samples,
            },
            weighted_avg: ReportRow {
                name: "weighted avg".to_string(),
                precision: metrics.weighted_precision,
                recall: metrics.weighted_recall,
                f1: metrics.weighted_f1,
                support: metrics.total_samples,
            },
            confusion_matrix: metrics.confusion_matrix,
            total: metrics.total_samples,
        })
    }

    /// Support-weighted F1
    pub fn weighted_f1(&self) -> f64 {
        self.weighted_avg.f1
    }

    /// Text table with one line per class followed by the summary lines
    pub fn to_table(&self) -> String {
        let width = self
            .class_rows
            .iter()
            .map(|r| r.name.len())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(12);

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}",
            "",
            "precision",
            "recall",
            "f1-score",
            "support",
            width = width
        );
        let _ = writeln!(out);

        for row in &self.class_rows {
            let _ = writeln!(out, "{}", format_row(row, width));
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:>width$}  {:>9} {:>9} {:>9.4} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.total,
            width = width
        );
        let _ = writeln!(out, "{}", format_row(&self.macro_avg, width));
        let _ = writeln!(out, "{}", format_row(&self.weighted_avg, width));

        out
    }
}

fn format_row(row: &ReportRow, width: usize) -> String {
    format!(
        "{:>width$}  {:>9.4} {:>9.4} {:>9.4} {:>9}",
        row.name,
        row.precision,
        row.recall,
        row.f1,
        row.support,
        width = width
    )
}

/// Everything worth keeping about a finished run, written as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Seed that drove the split and shuffling
    pub seed: u64,
    pub backend: String,
    pub class_names: ClassNames,
    pub train_samples: usize,
    pub validation_samples: usize,
    /// Mean training loss per epoch
    pub epoch_losses: Vec<f64>,
    pub accuracy: f64,
    pub weighted_f1: f64,
    pub macro_f1: f64,
    pub duration_secs: f64,
    /// RFC 3339 timestamp of when the run finished
    pub finished_at: String,
}

/// Prints the report and writes every end-of-run artifact
pub struct Reporter<'a> {
    config: &'a TrainingConfig,
}

impl<'a> Reporter<'a> {
    pub fn new(config: &'a TrainingConfig) -> Self {
        Self { config }
    }

    /// Print the per-class table and the headline scores
    pub fn print_report(&self, report: &ClassificationReport) {
        println!("\n{}", "📋 Classification Report".cyan().bold());
        println!("{}", report.to_table());
        println!(
            "{} {:.4}",
            "Accuracy:".green().bold(),
            report.accuracy
        );
        println!(
            "{} {:.4}",
            "F1 Score:".green().bold(),
            report.weighted_f1()
        );
    }

    /// Write the annotated confusion-matrix heatmap
    pub fn render_confusion_matrix(
        &self,
        report: &ClassificationReport,
        class_names: &ClassNames,
    ) -> Result<PathBuf> {
        let path = self.config.confusion_matrix_path();
        charts::generate_confusion_heatmap(
            "Confusion Matrix",
            &report.confusion_matrix,
            class_names.as_slice(),
            &path,
        )?;
        info!("Confusion matrix written to {:?}", path);
        Ok(path)
    }

    /// Write the loss-per-epoch line chart
    pub fn render_loss_curve(&self, epoch_losses: &[f64]) -> Result<PathBuf> {
        let path = self.config.loss_curve_path();
        let series = DataSeries::from_epoch_values("Training Loss", epoch_losses, COLOR_PRIMARY);
        charts::generate_line_chart("Training Loss", "Epoch", "Loss", &[series], &path)?;
        info!("Loss curve written to {:?}", path);
        Ok(path)
    }

    /// Save the trained model, separate from the per-epoch checkpoints
    pub fn save_final_model<B: Backend>(&self, model: &ResNet<B>) -> Result<PathBuf> {
        let path = self.config.final_model_path();
        save_classifier(model, &path)?;
        info!("Final model saved to {:?}", path);
        Ok(path)
    }

    /// Write `training_history.json`
    pub fn write_history(&self, history: &TrainingHistory) -> Result<PathBuf> {
        let path = self.config.history_path();
        let json = serde_json::to_string_pretty(history)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> ClassNames {
        ClassNames::new(vec!["flowering".into(), "seedling".into(), "vegetative".into()])
    }

    #[test]
    fn test_report_rows_and_accuracy() {
        let predictions = Predictions {
            predicted: vec![0, 0, 1, 1, 2, 1],
            actual: vec![0, 0, 1, 2, 2, 1],
        };
        let report = ClassificationReport::new(&predictions, &names()).unwrap();

        assert_eq!(report.class_rows.len(), 3);
        assert_eq!(report.class_rows[1].name, "seedling");
        assert!((report.accuracy - 5.0 / 6.0).abs() < 1e-12);

        let cm = &report.confusion_matrix;
        assert!((cm.correct() as f64 / cm.total() as f64 - report.accuracy).abs() < 1e-12);
        assert_eq!(cm.total(), 6);

        for row in &report.class_rows {
            assert!((0.0..=1.0).contains(&row.precision));
            assert!((0.0..=1.0).contains(&row.recall));
            assert!((0.0..=1.0).contains(&row.f1));
        }
    }

    #[test]
    fn test_report_rejects_unknown_label() {
        let predictions = Predictions {
            predicted: vec![3],
            actual: vec![0],
        };
        assert!(ClassificationReport::new(&predictions, &names()).is_err());
    }

    #[test]
    fn test_table_lists_every_class() {
        let predictions = Predictions {
            predicted: vec![0, 1],
            actual: vec![0, 1],
        };
        let table = ClassificationReport::new(&predictions, &names())
            .unwrap()
            .to_table();

        for name in ["flowering", "seedling", "vegetative", "accuracy", "macro avg", "weighted avg"] {
            assert!(table.contains(name), "missing {}", name);
        }
    }

    #[test]
    fn test_reporter_writes_charts() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainingConfig {
            output_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let reporter = Reporter::new(&config);
        let predictions = Predictions {
            predicted: vec![0, 2, 1],
            actual: vec![0, 1, 1],
        };
        let report = ClassificationReport::new(&predictions, &names()).unwrap();

        let heatmap = reporter.render_confusion_matrix(&report, &names()).unwrap();
        let curve = reporter.render_loss_curve(&[1.2, 0.8, 0.5]).unwrap();

        assert!(std::fs::read_to_string(heatmap).unwrap().starts_with("<svg"));
        assert!(std::fs::read_to_string(curve).unwrap().contains("Training Loss"));
    }
}
