//! Evaluation adapter.
//!
//! [`Evaluator`] couples a network with the cross-entropy loss and owns the
//! two metric accumulators: the named [`MetricSet`] and the
//! [`ConfusionMatrix`]. Each batch is forwarded exactly once and both
//! accumulators receive exactly one observation per sample; the final values
//! are read once after the full pass.

use burn::data::dataloader::batcher::Batcher;
use burn::nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig};
use burn::prelude::*;
use burn::tensor::activation::softmax;
use burn::tensor::ElementConversion;
use tracing::debug;

use crate::dataset::batcher::{CifarBatch, CifarBatcher};
use crate::dataset::cifar::CifarSplit;
use crate::model::Classifier;
use crate::utils::error::{Error, Result};
use crate::utils::metrics::{ConfusionMatrix, MetricSet};

/// Evaluation adapter over a classifier
pub struct Evaluator<B: Backend, M: Classifier<B>> {
    model: M,
    loss: CrossEntropyLoss<B>,
    metrics: MetricSet,
    confusion: ConfusionMatrix,
    num_classes: usize,
}

impl<B: Backend, M: Classifier<B>> Evaluator<B, M> {
    /// Wrap a model for evaluation on the given device
    pub fn new(model: M, device: &B::Device) -> Self {
        let num_classes = model.num_classes();
        Self {
            model,
            loss: CrossEntropyLossConfig::new().init(device),
            metrics: MetricSet::new(num_classes),
            confusion: ConfusionMatrix::new(num_classes),
            num_classes,
        }
    }

    /// Evaluate a single batch, feeding both accumulators once per sample.
    pub fn eval_batch(&mut self, batch: &CifarBatch<B>) -> Result<()> {
        let logits = self.model.forward(batch.images.clone());

        let [_, width] = logits.dims();
        if width != self.num_classes {
            return Err(Error::Model(format!(
                "Classifier produced {} outputs per sample, expected {} classes (was the network built without its top layer?)",
                width, self.num_classes
            )));
        }

        // The loss is informational during a test pass
        let loss = self.loss.forward(logits.clone(), batch.targets.clone());
        let loss_value: f32 = loss.into_scalar().elem();
        debug!("batch loss: {:.4}", loss_value);

        let probabilities = softmax(logits, 1);
        let flat = probabilities
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| Error::Model(format!("Failed to read probabilities: {:?}", e)))?;
        let targets: Vec<usize> = batch
            .targets
            .clone()
            .into_data()
            .to_vec::<i64>()
            .map_err(|e| Error::Model(format!("Failed to read targets: {:?}", e)))?
            .into_iter()
            .map(|t| t as usize)
            .collect();

        let rows: Vec<Vec<f32>> = flat
            .chunks(self.num_classes)
            .map(|chunk| chunk.to_vec())
            .collect();
        let predictions: Vec<usize> = rows.iter().map(|row| argmax(row)).collect();

        self.metrics.update(&rows, &targets);
        self.confusion.update(&predictions, &targets);

        Ok(())
    }

    /// Run the full pass over a split in batches.
    pub fn run(
        &mut self,
        split: &CifarSplit,
        batcher: &CifarBatcher,
        batch_size: usize,
        device: &B::Device,
    ) -> Result<()> {
        for chunk in split.items().chunks(batch_size) {
            let batch = batcher.batch(chunk.to_vec(), device);
            self.eval_batch(&batch)?;
        }
        Ok(())
    }

    /// Final metric values in fixed order, read after the pass
    pub fn compute(&self) -> Vec<(&'static str, f64)> {
        self.metrics.compute()
    }

    /// Number of samples observed so far
    pub fn count(&self) -> usize {
        self.metrics.count()
    }

    /// The accumulated confusion matrix
    pub fn confusion_matrix(&self) -> &ConfusionMatrix {
        &self.confusion
    }
}

fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{default_device, DefaultBackend};
    use crate::config::DatasetKind;
    use crate::dataset::cifar::CifarItem;

    /// Always predicts class 0 with fixed confidence, regardless of input.
    struct ConstantClassifier {
        num_classes: usize,
    }

    impl Classifier<DefaultBackend> for ConstantClassifier {
        fn forward(
            &self,
            images: Tensor<DefaultBackend, 4>,
        ) -> Tensor<DefaultBackend, 2> {
            let [batch_size, _, _, _] = images.dims();
            let mut data = vec![0.0f32; batch_size * self.num_classes];
            for row in 0..batch_size {
                data[row * self.num_classes] = 5.0;
            }
            Tensor::from_floats(
                TensorData::new(data, [batch_size, self.num_classes]),
                &images.device(),
            )
        }

        fn num_classes(&self) -> usize {
            self.num_classes
        }
    }

    fn item(label: usize) -> CifarItem {
        CifarItem::new(vec![0.5; 3 * 32 * 32], label)
    }

    #[test]
    fn test_eval_batch_feeds_both_accumulators_once_per_sample() {
        let device = default_device();
        let mut evaluator = Evaluator::new(ConstantClassifier { num_classes: 3 }, &device);
        let batcher = CifarBatcher::for_kind(DatasetKind::Cifar10);

        let batch = batcher.batch(vec![item(0), item(1), item(2)], &device);
        evaluator.eval_batch(&batch).unwrap();

        assert_eq!(evaluator.count(), 3);
        assert_eq!(evaluator.confusion_matrix().total(), 3);
        // everything predicted as class 0
        assert_eq!(evaluator.confusion_matrix().get(0, 0), 1);
        assert_eq!(evaluator.confusion_matrix().get(1, 0), 1);
        assert_eq!(evaluator.confusion_matrix().get(2, 0), 1);

        let computed = evaluator.compute();
        assert_eq!(computed[0].0, "accuracy");
        assert!((computed[0].1 - 1.0 / 3.0).abs() < 1e-9);
    }

    /// Emits more outputs per sample than it claims classes, like a network
    /// built without its top layer.
    struct HeadlessClassifier {
        num_classes: usize,
        feature_dim: usize,
    }

    impl Classifier<DefaultBackend> for HeadlessClassifier {
        fn forward(
            &self,
            images: Tensor<DefaultBackend, 4>,
        ) -> Tensor<DefaultBackend, 2> {
            let [batch_size, _, _, _] = images.dims();
            Tensor::ones([batch_size, self.feature_dim], &images.device())
        }

        fn num_classes(&self) -> usize {
            self.num_classes
        }
    }

    #[test]
    fn test_eval_batch_rejects_mismatched_output_width() {
        let device = default_device();
        let model = HeadlessClassifier { num_classes: 3, feature_dim: 8 };
        let mut evaluator = Evaluator::new(model, &device);
        let batcher = CifarBatcher::for_kind(DatasetKind::Cifar10);

        let batch = batcher.batch(vec![item(0)], &device);
        let err = evaluator.eval_batch(&batch).unwrap_err();

        assert!(matches!(err, Error::Model(_)));
        assert!(err.to_string().contains("expected 3 classes"));
        // nothing was accumulated
        assert_eq!(evaluator.count(), 0);
        assert_eq!(evaluator.confusion_matrix().total(), 0);
    }

    #[test]
    fn test_run_covers_the_whole_split() {
        let device = default_device();
        let mut evaluator = Evaluator::new(ConstantClassifier { num_classes: 3 }, &device);
        let batcher = CifarBatcher::for_kind(DatasetKind::Cifar10);

        let split = CifarSplit::new(vec![item(0), item(0), item(1), item(2), item(1)]);
        evaluator.run(&split, &batcher, 2, &device).unwrap();

        assert_eq!(evaluator.count(), 5);
        assert_eq!(evaluator.confusion_matrix().total(), 5);
    }
}
