//! Validation pass without gradient tracking

use burn::{data::dataloader::batcher::Batcher, tensor::backend::Backend};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::{GrowthStageBatch, GrowthStageBatcher, GrowthStageBurnDataset, SplitView};
use crate::model::ResNet;
use crate::utils::error::{GrowthStageError, Result};

/// Predicted and true labels, aligned and in iteration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predictions {
    pub predicted: Vec<usize>,
    pub actual: Vec<usize>,
}

impl Predictions {
    pub fn len(&self) -> usize {
        self.actual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actual.is_empty()
    }
}

/// Run `model` over every validation batch once and take the arg-max class
pub fn evaluate<B: Backend>(
    model: &ResNet<B>,
    dataset: &GrowthStageBurnDataset,
    validation: &mut SplitView,
    batcher: &GrowthStageBatcher,
    device: &B::Device,
) -> Result<Predictions> {
    let mut predictions = Predictions::default();

    for indices in validation.next_pass() {
        let items = dataset.gather(&indices)?;
        let batch: GrowthStageBatch<B> = Batcher::<B, _, _>::batch(batcher, items, device);

        let output = model.forward(batch.images);
        let [batch_size, _] = output.dims();

        let predicted: Vec<i64> = output
            .argmax(1)
            .reshape([batch_size])
            .into_data()
            .convert::<i64>()
            .to_vec()
            .map_err(|e| GrowthStageError::Model(format!("{:?}", e)))?;
        let actual: Vec<i64> = batch
            .targets
            .into_data()
            .convert::<i64>()
            .to_vec()
            .map_err(|e| GrowthStageError::Model(format!("{:?}", e)))?;

        predictions
            .predicted
            .extend(predicted.into_iter().map(|p| p as usize));
        predictions
            .actual
            .extend(actual.into_iter().map(|t| t as usize));
    }

    let correct = predictions
        .predicted
        .iter()
        .zip(&predictions.actual)
        .filter(|(p, a)| p == a)
        .count();
    info!(
        "Evaluation: {} samples, {} correct",
        predictions.len(),
        correct
    );

    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DatasetSplit, GrowthStageItem};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    fn synthetic_dataset(n: usize, size: usize) -> GrowthStageBurnDataset {
        let items = (0..n)
            .map(|i| GrowthStageItem {
                image: vec![(i % 7) as f32 / 7.0; 3 * size * size],
                label: i % 2,
                path: format!("mem/{}", i),
            })
            .collect();
        GrowthStageBurnDataset::from_items(items)
    }

    #[test]
    fn test_predictions_align_with_validation_order() {
        let device = Default::default();
        let dataset = synthetic_dataset(10, 32);
        let split = DatasetSplit::new(10, 0.8, 11).unwrap();
        let mut view = split.validation_view(4).unwrap();
        let model: ResNet<TestBackend> = ResNet::new(2, &device);

        let predictions = evaluate(
            &model,
            &dataset,
            &mut view,
            &GrowthStageBatcher::new(32),
            &device,
        )
        .unwrap();

        assert_eq!(predictions.len(), split.validation.len());
        assert_eq!(predictions.predicted.len(), predictions.actual.len());
        let expected: Vec<usize> = split.validation.iter().map(|i| i % 2).collect();
        assert_eq!(predictions.actual, expected);
        assert!(predictions.predicted.iter().all(|&p| p < 2));
    }
}
