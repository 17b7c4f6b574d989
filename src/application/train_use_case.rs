// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Resolve image pairs        (Layer 4 - data)
//           index lists if given, else directory scan + seeded split
//   Step 2: Validate and build datasets (Layer 4 - data)
//   Step 3: Save config                 (Layer 6 - infra)
//   Step 4: Run training loop           (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::data::{
    dataset::{PairDataset, SplitDatasets},
    source::{DirectoryScan, IndexFile},
    splitter::split_three_way,
};
use crate::domain::{
    sample::{ImagePair, PairLayout},
    traits::PairSource,
};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    backend::BackendKind,
    trainer::{run_training, TrainingOutcome},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters and paths for a training run.
// Saved as train_config.json so `evaluate` can rebuild the same splits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub cover_dir:        PathBuf,
    pub stego_dir:        PathBuf,
    pub image_ext:        String,

    /// Plain-text id lists; all three or none
    pub train_index:      Option<PathBuf>,
    pub valid_index:      Option<PathBuf>,
    pub test_index:       Option<PathBuf>,

    /// Used only when no index lists are given
    pub train_fraction:   f64,
    pub valid_fraction:   f64,

    pub output_dir:       PathBuf,
    pub steganography:    String,
    pub embedding_rate:   String,
    pub dataset_index:    String,

    /// Pairs per batch; each batch holds twice as many images
    pub batch_size:       usize,
    pub epochs:           usize,
    pub lr:               f64,
    pub momentum:         f64,
    pub weight_decay:     f64,
    pub decay_epochs:     Vec<usize>,
    pub lr_gamma:         f64,

    /// Checkpoints are only written for epochs after this one
    pub save_after_epoch: usize,
    pub eval_every:       usize,
    pub print_every:      usize,
    pub num_workers:      usize,
    pub seed:             u64,

    /// Truncation threshold of the filter residuals
    pub threshold:        f64,

    /// Run directory to resume from
    pub resume:           Option<PathBuf>,
    pub backend:          BackendKind,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            cover_dir:        PathBuf::from("data/cover"),
            stego_dir:        PathBuf::from("data/stego"),
            image_ext:        "ppm".to_string(),
            train_index:      None,
            valid_index:      None,
            test_index:       None,
            train_fraction:   0.70,
            valid_fraction:   0.05,
            output_dir:       PathBuf::from("output"),
            steganography:    "HILL".to_string(),
            embedding_rate:   "0.4".to_string(),
            dataset_index:    "1".to_string(),
            batch_size:       16,
            epochs:           250,
            lr:               0.01,
            momentum:         0.9,
            weight_decay:     5e-4,
            decay_epochs:     vec![80, 140, 190],
            lr_gamma:         0.1,
            save_after_epoch: 190,
            eval_every:       1,
            print_every:      100,
            num_workers:      1,
            seed:             42,
            threshold:        2.0,
            resume:           None,
            backend:          BackendKind::Wgpu,
        }
    }
}

impl TrainConfig {
    /// `{output_dir}/{alg}-{rate}-{dataset_index}-lr={lr}`
    pub fn run_dir(&self) -> PathBuf {
        self.output_dir.join(format!(
            "{}-{}-{}-lr={}",
            self.steganography, self.embedding_rate, self.dataset_index, self.lr,
        ))
    }

    pub fn layout(&self) -> PairLayout {
        PairLayout::new(&self.cover_dir, &self.stego_dir, &self.image_ext)
    }

    fn check(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.train_fraction)
            || !(0.0..=1.0).contains(&self.valid_fraction)
            || self.train_fraction + self.valid_fraction > 1.0
        {
            bail!(
                "Split fractions must lie in [0, 1] and sum to at most 1 (got {} + {})",
                self.train_fraction, self.valid_fraction,
            );
        }
        Ok(())
    }
}

/// The three id lists of a run, unvalidated.
pub struct ResolvedPairs {
    pub train: Vec<ImagePair>,
    pub valid: Vec<ImagePair>,
    pub test:  Vec<ImagePair>,
}

/// Read the index lists, or scan the cover directory and split it.
pub fn resolve_pairs(cfg: &TrainConfig) -> Result<ResolvedPairs> {
    let layout = cfg.layout();

    match (&cfg.train_index, &cfg.valid_index, &cfg.test_index) {
        (Some(train), Some(valid), Some(test)) => {
            let read = |path: &Path| IndexFile::new(path, layout.clone()).pairs();
            Ok(ResolvedPairs { train: read(train)?, valid: read(valid)?, test: read(test)? })
        }
        (None, None, None) => {
            let all = DirectoryScan::new(layout).pairs()?;
            tracing::info!("Found {} pairs in '{}'", all.len(), cfg.cover_dir.display());
            let (train, valid, test) =
                split_three_way(all, cfg.train_fraction, cfg.valid_fraction, cfg.seed);
            Ok(ResolvedPairs { train, valid, test })
        }
        _ => bail!("Give either all three index lists (train, valid, test) or none"),
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
    ckpt:   CheckpointManager,
}

impl TrainUseCase {
    /// Create a new TrainUseCase with the given configuration
    pub fn new(config: TrainConfig) -> Self {
        let ckpt = CheckpointManager::new(config.run_dir());
        Self { config, ckpt }
    }

    /// Where the training log for this run is written
    pub fn log_path(&self) -> PathBuf {
        self.ckpt.log_path()
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingOutcome> {
        let cfg = &self.config;
        cfg.check()?;

        // ── Step 1: Resolve image pairs ───────────────────────────────────────
        let pairs = resolve_pairs(cfg)?;
        tracing::info!(
            "Split: {} train, {} valid, {} test pairs",
            pairs.train.len(),
            pairs.valid.len(),
            pairs.test.len(),
        );
        if pairs.train.is_empty() || pairs.valid.is_empty() || pairs.test.is_empty() {
            bail!("Every split needs at least one pair");
        }

        // ── Step 2: Validate files and build Burn datasets ────────────────────
        let data = SplitDatasets {
            train: PairDataset::validated(pairs.train)?,
            valid: PairDataset::validated(pairs.valid)?,
            test:  PairDataset::validated(pairs.test)?,
        };

        // ── Step 3: Save config for evaluation ────────────────────────────────
        tracing::info!("Run directory: '{}'", self.ckpt.dir().display());
        self.ckpt.save_config(cfg)?;
        let metrics = MetricsLogger::new(self.ckpt.dir())?;

        // ── Step 4: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, data, &self.ckpt, &metrics)
    }
}
