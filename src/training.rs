//! Supervised training loop.
//!
//! A manual epoch loop over the configured dataset: seeded per-epoch
//! shuffling, optional augmentation, Adam with weight decay, per-epoch
//! validation accuracy, and a best-checkpoint save to the configured
//! `.ckpt` path.

use burn::{
    data::dataloader::batcher::Batcher,
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, backend::Backend, ElementConversion},
};
use colored::Colorize;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use std::time::Instant;

use crate::config::Config;
use crate::dataset::{self, Augmenter, CifarBatcher, CifarSplit};
use crate::model::{self, ResNet};
use crate::utils::error::Result;
use crate::utils::format_duration;

/// Weight decay applied by the Adam optimizer
const WEIGHT_DECAY: f32 = 1e-4;

/// Train the configured network and save the best checkpoint to
/// `{weights_dir}/{weights_path}.ckpt`.
pub fn run_training<B: AutodiffBackend>(config: &Config, device: &B::Device) -> Result<()> {
    println!("{}", "Loading dataset...".cyan());
    let bundle = dataset::build(config)?;
    let batcher = CifarBatcher::for_kind(config.dataset);

    println!("{}", "Building model...".cyan());
    let mut model = model::build::<B>(config, bundle.num_classes, device)?;

    let mut optimizer = AdamConfig::new()
        .with_weight_decay(Some(burn::optim::decay::WeightDecayConfig::new(WEIGHT_DECAY)))
        .init();
    let loss_fn = CrossEntropyLossConfig::new().init(device);

    let augmenter = config.augment.then(|| Augmenter::new(bundle.image_size));
    let mut epoch_rng = ChaCha8Rng::seed_from_u64(config.seed);

    println!();
    println!("{}", "Training configuration:".cyan().bold());
    println!("  Dataset:            {}", config.dataset);
    println!("  Training samples:   {}", bundle.train.items().len());
    println!("  Validation samples: {}", bundle.validation.items().len());
    println!("  Epochs:             {}", config.epochs);
    println!("  Batch size:         {}", config.batch_size);
    println!("  Learning rate:      {}", config.learning_rate);
    println!("  Augmentation:       {}", config.augment);
    println!();

    let checkpoint_path = config.checkpoint_path();
    let mut best_val_acc = 0.0f64;
    let started = Instant::now();

    for epoch in 0..config.epochs {
        println!(
            "{}",
            format!("Epoch {}/{}", epoch + 1, config.epochs).yellow().bold()
        );

        let mut epoch_loss = 0.0f64;
        let mut correct = 0usize;
        let mut total = 0usize;

        let mut indices: Vec<usize> = (0..bundle.train.items().len()).collect();
        indices.shuffle(&mut epoch_rng);
        let num_batches = indices.len().div_ceil(config.batch_size);

        for (batch_idx, batch_indices) in indices.chunks(config.batch_size).enumerate() {
            let mut items: Vec<_> = batch_indices
                .iter()
                .map(|&i| bundle.train.items()[i].clone())
                .collect();
            if let Some(augmenter) = &augmenter {
                items = augmenter.apply_batch(&items, &mut epoch_rng);
            }

            let batch = batcher.batch(items, device);
            let output = model.forward(batch.images.clone());
            let loss = loss_fn.forward(output.clone(), batch.targets.clone());

            let loss_value: f64 = loss.clone().into_scalar().elem();
            epoch_loss += loss_value;

            let predictions = output.argmax(1).squeeze::<1>(1);
            let batch_correct: i64 = predictions
                .equal(batch.targets.clone())
                .int()
                .sum()
                .into_scalar()
                .elem();
            correct += batch_correct as usize;
            total += batch.targets.dims()[0];

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(config.learning_rate, model, grads);

            if (batch_idx + 1) % 50 == 0 || batch_idx + 1 == num_batches {
                println!(
                    "  Batch {:>4}/{}: loss = {:.4}, acc = {:.2}%",
                    batch_idx + 1,
                    num_batches,
                    loss_value,
                    100.0 * correct as f64 / total as f64
                );
            }
        }

        let avg_loss = epoch_loss / num_batches.max(1) as f64;
        let train_acc = 100.0 * correct as f64 / total.max(1) as f64;

        let val_acc =
            validation_accuracy::<B>(&model, &bundle.validation, &batcher, config.batch_size);

        let is_best = val_acc > best_val_acc;
        if is_best {
            best_val_acc = val_acc;
            crate::checkpoint::save(model.clone(), &checkpoint_path)?;
        }

        println!(
            "  {} loss: {:.4} | train acc: {:.2}% | val acc: {:.2}%{}",
            "→".cyan(),
            avg_loss,
            train_acc,
            val_acc,
            if is_best {
                " (best, saved)".green().to_string()
            } else {
                String::new()
            }
        );
        println!();
    }

    info!("Training finished, best validation accuracy {:.2}%", best_val_acc);
    println!("{}", "Training complete!".green().bold());
    println!("  Elapsed: {}", format_duration(started.elapsed().as_secs_f64()));
    println!("  Best validation accuracy: {:.2}%", best_val_acc);
    println!("  Checkpoint: {}", checkpoint_path);

    Ok(())
}

/// Accuracy of the model over a split, evaluated on the inner backend.
fn validation_accuracy<B: AutodiffBackend>(
    model: &ResNet<B>,
    split: &CifarSplit,
    batcher: &CifarBatcher,
    batch_size: usize,
) -> f64 {
    let device = <B::InnerBackend as Backend>::Device::default();
    let inner_model = model.clone().valid();

    let mut correct = 0usize;
    let mut total = 0usize;

    for chunk in split.items().chunks(batch_size) {
        let batch = batcher.batch(chunk.to_vec(), &device);
        let output = inner_model.forward(batch.images);
        let predictions = output.argmax(1).squeeze::<1>(1);

        let batch_correct: i64 = predictions
            .equal(batch.targets)
            .int()
            .sum()
            .into_scalar()
            .elem();

        correct += batch_correct as usize;
        total += chunk.len();
    }

    if total == 0 {
        0.0
    } else {
        100.0 * correct as f64 / total as f64
    }
}
