// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop for the steganalysis network:
//
//   for epoch in start..=epochs
//       train_epoch        forward, cross-entropy, backward, SGD
//       every eval_every epochs:
//           adjust_bn_stats    refresh batch-norm running stats
//           evaluate           accuracy on the validation pairs
//           save if accuracy improved after save_after_epoch
//   load best → adjust_bn_stats → evaluate on the test pairs
//
// Key Burn insight:
//   - Training uses Autodiff<_>, where BatchNorm normalises with
//     batch statistics and updates its running averages
//   - model.valid() returns the model on the inner backend, where
//     BatchNorm uses the running averages
//   - Evaluation batchers must therefore use B::InnerBackend
//
// Reference: Burn Book §5, He et al. (2016) Deep Residual Learning

use std::{sync::Arc, time::Instant};

use anyhow::{bail, Result};
use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::transform::MapperDataset,
    },
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    augment::PairAugmenter,
    batcher::{PairBatch, PairBatcher},
    dataset::{PairDataset, SplitDatasets},
};
use crate::infra::{
    checkpoint::{CheckpointManager, TrainState},
    metrics::{AverageMeter, EpochMetrics, MetricsLogger},
};
use crate::ml::{
    backend::{BackendKind, NdArrayTrain, WgpuTrain},
    model::{SteganalysisNet, SteganalysisNetConfig},
    optim::{grouped_sgd, GroupedSgd, MultiStepLr, SgdSettings},
};

/// What a finished run reports back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    /// Epoch of the saved best checkpoint, if any was written
    pub best_epoch:    Option<usize>,
    pub best_accuracy: f64,
    pub test_accuracy: f64,
}

pub fn run_training(
    cfg:     &TrainConfig,
    data:    SplitDatasets,
    ckpt:    &CheckpointManager,
    metrics: &MetricsLogger,
) -> Result<TrainingOutcome> {
    match cfg.backend {
        BackendKind::Wgpu => {
            let device = BackendKind::wgpu_device();
            tracing::info!("Using WGPU device: {:?}", device);
            train_loop::<WgpuTrain>(cfg, data, ckpt, metrics, device)
        }
        BackendKind::NdArray => {
            let device = BackendKind::ndarray_device();
            tracing::info!("Using NdArray device: {:?}", device);
            train_loop::<NdArrayTrain>(cfg, data, ckpt, metrics, device)
        }
    }
}

fn train_loop<B: AutodiffBackend>(
    cfg:     &TrainConfig,
    data:    SplitDatasets,
    ckpt:    &CheckpointManager,
    metrics: &MetricsLogger,
    device:  B::Device,
) -> Result<TrainingOutcome> {

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = SteganalysisNetConfig::new().with_threshold(cfg.threshold);
    ckpt.save_model_config(&model_cfg)?;
    let mut model: SteganalysisNet<B> = model_cfg.init(&device);

    // ── SGD with momentum, weight decay on rank > 1 only ──────────────────────
    let mut optim = grouped_sgd::<B>(&SgdSettings {
        momentum:     cfg.momentum,
        weight_decay: cfg.weight_decay,
    });
    let schedule = MultiStepLr::new(cfg.lr, cfg.decay_epochs.clone(), cfg.lr_gamma);

    let mut start_epoch   = 1;
    let mut best_accuracy = 0.0;
    let mut best_epoch    = None;

    if let Some(dir) = &cfg.resume {
        if !dir.is_dir() {
            bail!("Resume directory '{}' does not exist", dir.display());
        }
        let from  = CheckpointManager::new(dir);
        let state = from.load_state()?;
        model = from.load_model(model, &device)?;
        optim = from.load_optimizer(optim, &device)?;

        tracing::info!("{}", "-".repeat(8));
        tracing::info!("Load state_dict in {}", dir.display());
        tracing::info!("{}", "-".repeat(8));

        start_epoch   = state.epoch + 1;
        best_accuracy = state.best_accuracy;
        best_epoch    = Some(state.epoch);
    }

    // ── Data loaders ──────────────────────────────────────────────────────────
    let valid_pairs = data.valid.pair_count();
    let test_pairs  = data.test.pair_count();

    let train_loader = train_loader::<B>(cfg, &device, data.train);
    let valid_loader = eval_loader::<B::InnerBackend>(cfg, &device, data.valid);
    let test_loader  = eval_loader::<B::InnerBackend>(cfg, &device, data.test);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in start_epoch..=cfg.epochs {
        let lr = schedule.lr_at(epoch);

        let (trained, train_loss) = train_epoch(
            model, &mut optim, train_loader.as_ref(), lr, epoch, cfg,
        );
        model = trained;

        let mut valid_accuracy = f64::NAN;
        if cfg.eval_every > 0 && epoch % cfg.eval_every == 0 {
            adjust_bn_stats(&model, train_loader.as_ref());
            let accuracy = evaluate(&model.valid(), valid_loader.as_ref(), valid_pairs);

            if accuracy > best_accuracy && epoch > cfg.save_after_epoch {
                best_accuracy = accuracy;
                best_epoch    = Some(epoch);
                ckpt.save_best(&model, &optim, &TrainState { epoch, best_accuracy, lr })?;
            }
            log_accuracy(accuracy, best_accuracy);
            valid_accuracy = accuracy;
        }

        metrics.log(&EpochMetrics {
            epoch,
            train_loss,
            valid_accuracy,
            best_accuracy,
            lr,
        })?;
    }

    // ── Test the best checkpoint ──────────────────────────────────────────────
    tracing::info!("Test set accuracy:");
    if ckpt.has_best() {
        let state = ckpt.load_state()?;
        model = ckpt.load_model(model, &device)?;
        tracing::info!("Loaded best checkpoint from epoch {}", state.epoch);
    } else {
        tracing::warn!(
            "No checkpoint was saved (accuracy never improved after epoch {}); \
             testing the final model",
            cfg.save_after_epoch,
        );
    }

    adjust_bn_stats(&model, train_loader.as_ref());
    let test_accuracy = evaluate(&model.valid(), test_loader.as_ref(), test_pairs);
    log_accuracy(test_accuracy, best_accuracy);

    tracing::info!("Training complete!");
    Ok(TrainingOutcome { best_epoch, best_accuracy, test_accuracy })
}

/// Re-evaluate a saved run: load its best checkpoint, optionally refresh
/// batch-norm statistics on `bn_pairs`, then score `pairs`.
pub fn run_evaluation(
    cfg:      &TrainConfig,
    ckpt:     &CheckpointManager,
    pairs:    PairDataset,
    bn_pairs: Option<PairDataset>,
) -> Result<f64> {
    match cfg.backend {
        BackendKind::Wgpu => {
            evaluation_loop::<WgpuTrain>(cfg, ckpt, pairs, bn_pairs, BackendKind::wgpu_device())
        }
        BackendKind::NdArray => {
            evaluation_loop::<NdArrayTrain>(cfg, ckpt, pairs, bn_pairs, BackendKind::ndarray_device())
        }
    }
}

fn evaluation_loop<B: AutodiffBackend>(
    cfg:      &TrainConfig,
    ckpt:     &CheckpointManager,
    pairs:    PairDataset,
    bn_pairs: Option<PairDataset>,
    device:   B::Device,
) -> Result<f64> {
    let model: SteganalysisNet<B> = ckpt.load_model_config()?.init(&device);
    let model = ckpt.load_model(model, &device)?;
    tracing::info!("Loaded best checkpoint from epoch {}", ckpt.load_state()?.epoch);

    if let Some(bn_pairs) = bn_pairs {
        tracing::info!("Re-estimating batch-norm statistics on {} pairs", bn_pairs.pair_count());
        adjust_bn_stats(&model, train_loader::<B>(cfg, &device, bn_pairs).as_ref());
    }

    let total    = pairs.pair_count();
    let loader   = eval_loader::<B::InnerBackend>(cfg, &device, pairs);
    let accuracy = evaluate(&model.valid(), loader.as_ref(), total);
    tracing::info!("Eval accuracy: {:.4}", accuracy);
    Ok(accuracy)
}

/// Augmented, reshuffled every epoch, autodiff backend.
pub fn train_loader<B: AutodiffBackend>(
    cfg:     &TrainConfig,
    device:  &B::Device,
    dataset: PairDataset,
) -> Arc<dyn DataLoader<PairBatch<B>>> {
    DataLoaderBuilder::new(PairBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .build(MapperDataset::new(dataset, PairAugmenter))
}

/// Fixed order, no augmentation.
pub fn eval_loader<B: Backend>(
    cfg:     &TrainConfig,
    device:  &B::Device,
    dataset: PairDataset,
) -> Arc<dyn DataLoader<PairBatch<B>>> {
    DataLoaderBuilder::new(PairBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(cfg.num_workers)
        .build(dataset)
}

/// One pass over the training loader. Returns the updated model and the
/// mean loss per image.
fn train_epoch<B, O>(
    mut model: SteganalysisNet<B>,
    optim:     &mut GroupedSgd<B, O>,
    loader:    &dyn DataLoader<PairBatch<B>>,
    lr:        f64,
    epoch:     usize,
    cfg:       &TrainConfig,
) -> (SteganalysisNet<B>, f64)
where
    B: AutodiffBackend,
    O: Optimizer<SteganalysisNet<B>, B>,
{
    let num_batches = loader.num_items().div_ceil(cfg.batch_size.max(1));

    let mut batch_time = AverageMeter::new();
    let mut data_time  = AverageMeter::new();
    let mut losses     = AverageMeter::new();

    let mut end = Instant::now();
    for (i, batch) in loader.iter().enumerate() {
        data_time.update(end.elapsed().as_secs_f64(), 1);
        let start = Instant::now();

        let images    = batch.images.dims()[0];
        let (loss, _) = model.forward_classification(batch.images, batch.labels);
        losses.update(loss.clone().into_scalar().elem::<f64>(), images);

        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optim.step(lr, model, grads);

        batch_time.update(start.elapsed().as_secs_f64(), 1);
        end = Instant::now();

        if cfg.print_every > 0 && i % cfg.print_every == 0 {
            tracing::info!(
                "Epoch: [{}][{}/{}]\tTime {:.3} ({:.3})\tData {:.3} ({:.3})\tLoss {:.4} ({:.4})",
                epoch, i, num_batches,
                batch_time.val, batch_time.avg,
                data_time.val, data_time.avg,
                losses.val, losses.avg,
            );
        }
    }

    let mean_loss = if losses.count > 0 { losses.avg } else { f64::NAN };
    (model, mean_loss)
}

/// Re-estimate batch-norm running statistics with training-mode forward
/// passes. Parameters are not updated.
pub fn adjust_bn_stats<B: AutodiffBackend>(
    model:  &SteganalysisNet<B>,
    loader: &dyn DataLoader<PairBatch<B>>,
) {
    for batch in loader.iter() {
        let _ = model.forward(batch.images);
    }
}

/// Fraction of images classified correctly: correct / (2 · pairs).
pub fn evaluate<B: Backend>(
    model:  &SteganalysisNet<B>,
    loader: &dyn DataLoader<PairBatch<B>>,
    pairs:  usize,
) -> f64 {
    let mut correct = 0usize;
    let mut seen    = 0usize;

    for batch in loader.iter() {
        seen += batch.labels.dims()[0];
        let predicted = model.forward(batch.images).argmax(1).flatten::<1>(0, 1);
        correct += predicted
            .equal(batch.labels)
            .int().sum().into_scalar().elem::<i64>() as usize;
    }

    if seen < 2 * pairs {
        tracing::warn!("Evaluated {} of {} images; unread pairs count as errors", seen, 2 * pairs);
    }
    if pairs == 0 {
        return 0.0;
    }
    correct as f64 / (2 * pairs) as f64
}

fn log_accuracy(accuracy: f64, best: f64) {
    tracing::info!("{}", "-".repeat(8));
    tracing::info!("Eval accuracy: {:.4}", accuracy);
    tracing::info!("Best accuracy:{:.4}", best);
    tracing::info!("{}", "-".repeat(8));
}
