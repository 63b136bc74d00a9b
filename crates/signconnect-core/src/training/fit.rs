//! Mini-batch fitting of the sign classifier.

// Allow common ML code patterns
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{loss, AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use super::TrainingConfig;
use crate::domain::{KeypointVector, TrainingMetrics, KEYPOINT_VECTOR_LEN};
use crate::inference::GestureClassifier;
use crate::ports::{ProgressEvent, ProgressSink};

/// Keypoint vectors with their class indices.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    features: Vec<f32>,
    targets: Vec<u32>,
}

impl Dataset {
    /// Selects `indices` from parallel vectors and targets.
    #[must_use]
    pub fn select(vectors: &[KeypointVector], targets: &[u32], indices: &[usize]) -> Self {
        let mut features = Vec::with_capacity(indices.len() * KEYPOINT_VECTOR_LEN);
        let mut picked = Vec::with_capacity(indices.len());
        for &i in indices {
            features.extend_from_slice(vectors[i].as_slice());
            picked.push(targets[i]);
        }
        Self {
            features,
            targets: picked,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Builds `(features, targets)` tensors for the given rows.
    fn batch(&self, rows: &[usize], device: &Device) -> candle_core::Result<(Tensor, Tensor)> {
        let mut xs = Vec::with_capacity(rows.len() * KEYPOINT_VECTOR_LEN);
        let mut ys = Vec::with_capacity(rows.len());
        for &r in rows {
            let start = r * KEYPOINT_VECTOR_LEN;
            xs.extend_from_slice(&self.features[start..start + KEYPOINT_VECTOR_LEN]);
            ys.push(self.targets[r]);
        }
        let xs = Tensor::from_vec(xs, (rows.len(), KEYPOINT_VECTOR_LEN), device)?;
        let ys = Tensor::from_vec(ys, rows.len(), device)?;
        Ok((xs, ys))
    }
}

/// Overwrites every variable with seeded Glorot-uniform weights and zero biases.
///
/// Variables are visited in name order so the result only depends on the seed.
pub fn glorot_init(varmap: &VarMap, rng: &mut StdRng) -> candle_core::Result<()> {
    let data = varmap
        .data()
        .lock()
        .map_err(|_| candle_core::Error::Msg("variable map lock poisoned".into()))?;

    let mut names: Vec<&String> = data.keys().collect();
    names.sort();

    for name in names {
        let var = &data[name];
        let shape = var.shape().clone();
        let values: Vec<f32> = match shape.dims() {
            &[fan_out, fan_in] => {
                let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
                (0..fan_out * fan_in)
                    .map(|_| rng.gen_range(-limit..=limit))
                    .collect()
            }
            _ => vec![0.0; shape.elem_count()],
        };
        var.set(&Tensor::from_vec(values, shape, var.device())?)?;
    }

    Ok(())
}

/// Loss and accuracy of the model on a whole dataset.
fn evaluate(
    model: &GestureClassifier,
    data: &Dataset,
    device: &Device,
) -> candle_core::Result<(f32, f32)> {
    let rows: Vec<usize> = (0..data.len()).collect();
    let (xs, ys) = data.batch(&rows, device)?;
    let logits = model.forward(&xs)?;
    let loss = loss::cross_entropy(&logits, &ys)?.to_scalar::<f32>()?;
    let correct = correct_count(&logits, &ys)?;
    Ok((loss, correct / data.len() as f32))
}

fn correct_count(logits: &Tensor, ys: &Tensor) -> candle_core::Result<f32> {
    logits
        .argmax(D::Minus1)?
        .eq(ys)?
        .to_dtype(DType::F32)?
        .sum_all()?
        .to_scalar::<f32>()
}

/// Trains a fresh classifier and returns its variables with final metrics.
///
/// # Errors
///
/// Returns an error if a forward or backward pass fails.
pub fn fit(
    train: &Dataset,
    val: &Dataset,
    num_classes: usize,
    config: &TrainingConfig,
    device: &Device,
    rng: &mut StdRng,
    progress: &dyn ProgressSink,
) -> candle_core::Result<(VarMap, TrainingMetrics)> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
    let model = GestureClassifier::new(vb, num_classes)?;
    glorot_init(&varmap, rng)?;

    let params = ParamsAdamW {
        lr: config.learning_rate,
        beta1: 0.9,
        beta2: 0.999,
        eps: 1e-7,
        weight_decay: 0.0,
    };
    let mut opt = AdamW::new(varmap.all_vars(), params)?;

    let mut order: Vec<usize> = (0..train.len()).collect();
    let mut metrics = TrainingMetrics::default();

    for epoch in 1..=config.epochs {
        order.shuffle(rng);

        let mut loss_sum = 0.0f32;
        let mut correct = 0.0f32;
        for rows in order.chunks(config.batch_size) {
            let (xs, ys) = train.batch(rows, device)?;
            let logits = model.forward(&xs)?;
            let loss = loss::cross_entropy(&logits, &ys)?;
            opt.backward_step(&loss)?;

            loss_sum += loss.to_scalar::<f32>()? * rows.len() as f32;
            correct += correct_count(&logits, &ys)?;
        }

        let n = train.len() as f32;
        metrics = TrainingMetrics {
            train_loss: loss_sum / n,
            train_accuracy: correct / n,
            val_loss: None,
            val_accuracy: None,
        };
        if !val.is_empty() {
            let (val_loss, val_accuracy) = evaluate(&model, val, device)?;
            metrics.val_loss = Some(val_loss);
            metrics.val_accuracy = Some(val_accuracy);
        }

        match (metrics.val_loss, metrics.val_accuracy) {
            (Some(vl), Some(va)) => info!(
                "Epoch {epoch}/{}: loss {:.4}, accuracy {:.4}, val_loss {vl:.4}, val_accuracy {va:.4}",
                config.epochs, metrics.train_loss, metrics.train_accuracy
            ),
            _ => info!(
                "Epoch {epoch}/{}: loss {:.4}, accuracy {:.4}",
                config.epochs, metrics.train_loss, metrics.train_accuracy
            ),
        }

        progress.on_event(ProgressEvent::Epoch {
            epoch,
            epochs: config.epochs,
            metrics,
        });
    }

    debug!("Fitted {} variables", varmap.all_vars().len());
    Ok((varmap, metrics))
}
