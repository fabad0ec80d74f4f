//! End-to-end run on a tiny synthetic dataset with the CPU backend

use std::path::Path;

use burn::backend::Autodiff;
use burn_ndarray::NdArray;
use image::{Rgb, RgbImage};

use growth_stage::dataset::ClassNames;
use growth_stage::model::{load_classifier, ModelConfig};
use growth_stage::training::run_training;
use growth_stage::{GrowthStageError, RetentionPolicy, TrainingConfig};

type Backend = Autodiff<NdArray>;

/// Two classes of ten 40x40 images, reddish vs. greenish with some noise
fn write_dataset(root: &Path) {
    for (class, base) in [("flowering", [200u8, 60, 60]), ("seedling", [60u8, 180, 60])] {
        let dir = root.join(class);
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..10u32 {
            let img = RgbImage::from_fn(40, 40, |x, y| {
                let jitter = ((x * 7 + y * 13 + i * 31) % 40) as u8;
                Rgb([
                    base[0].saturating_add(jitter),
                    base[1].saturating_add(jitter),
                    base[2].saturating_add(jitter),
                ])
            });
            img.save(dir.join(format!("{:02}.png", i))).unwrap();
        }
    }
}

fn test_config(data_dir: &Path, output_dir: &Path) -> TrainingConfig {
    TrainingConfig {
        data_dir: data_dir.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        epochs: 1,
        batch_size: 4,
        image_size: 32,
        seed: Some(42),
        pretrained_weights: None,
        ..Default::default()
    }
}

/// One shared two-epoch run: training ResNet-18 on the CPU backend dominates
/// the runtime, so every artifact check reads the output of the same run.
#[test]
fn test_end_to_end_synthetic_run() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_dataset(data.path());

    let config = TrainingConfig {
        epochs: 2,
        retention: RetentionPolicy::KeepLast(1),
        ..test_config(data.path(), out.path())
    };
    let outcome = run_training::<Backend>(&config, Default::default()).unwrap();

    // Keep-last(1) leaves only the second epoch's checkpoint, plus the final model
    let checkpoints: Vec<_> = std::fs::read_dir(out.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with("growth_stage_epoch"))
        .collect();
    assert_eq!(checkpoints, vec!["growth_stage_epoch2.mpk".to_string()]);
    assert_eq!(outcome.checkpoints, vec![config.checkpoint_path(2)]);
    assert!(!config.checkpoint_path(1).exists());
    assert!(config.final_model_path().exists());

    // Two rendered charts
    assert!(config.confusion_matrix_path().exists());
    assert!(config.loss_curve_path().exists());

    // Class table on disk
    let names = ClassNames::load_json(&config.class_names_path()).unwrap();
    assert_eq!(names.as_slice(), &["flowering", "seedling"]);

    // Report: two class rows, scores in range, matrix consistent with accuracy
    let report = &outcome.report;
    assert_eq!(report.class_rows.len(), 2);
    for row in &report.class_rows {
        assert!((0.0..=1.0).contains(&row.precision));
        assert!((0.0..=1.0).contains(&row.recall));
        assert!((0.0..=1.0).contains(&row.f1));
    }
    assert_eq!(report.total, 4);
    assert_eq!(report.confusion_matrix.total(), 4);
    let trace_accuracy =
        report.confusion_matrix.correct() as f64 / report.confusion_matrix.total() as f64;
    assert!((trace_accuracy - report.accuracy).abs() < 1e-9);

    // 16 train / 4 validation, one finite non-negative loss per epoch
    assert_eq!(outcome.history.train_samples, 16);
    assert_eq!(outcome.history.validation_samples, 4);
    assert_eq!(outcome.history.epoch_losses.len(), 2);
    assert!(outcome
        .history
        .epoch_losses
        .iter()
        .all(|loss| loss.is_finite() && *loss >= 0.0));
    assert!(config.history_path().exists());

    // The kept checkpoint and the final model load the same way
    let model_config = ModelConfig::load(&config.model_config_path()).unwrap();
    assert_eq!(model_config.num_classes, 2);

    let device = Default::default();
    let checkpoint =
        load_classifier::<NdArray>(&config.checkpoint_path(2), &model_config, &device).unwrap();
    let final_model =
        load_classifier::<NdArray>(&config.final_model_path(), &model_config, &device).unwrap();

    assert_eq!(checkpoint.num_classes(), 2);
    assert_eq!(final_model.num_classes(), 2);
}

#[test]
fn test_missing_dataset_fails_before_training() {
    let out = tempfile::tempdir().unwrap();
    let config = test_config(&out.path().join("nope"), out.path());

    let result = run_training::<Backend>(&config, Default::default());
    assert!(matches!(result, Err(GrowthStageError::PathNotFound(_))));
    assert!(!config.final_model_path().exists());
}
