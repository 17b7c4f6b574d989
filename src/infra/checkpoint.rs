// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores the best model of a run with Burn's
// gzipped MessagePack recorder at full precision, so a reload
// gives back exactly the network that won validation.
//
// Layout of a run directory:
//   <run>/
//     train_config.json        ← TrainConfig, written before training
//     model_config.json        ← SteganalysisNetConfig
//     best_model.mpk.gz        ← weights + batch-norm statistics
//     best_optim_decay.mpk.gz  ← momentum buffers, decayed group
//     best_optim_plain.mpk.gz  ← momentum buffers, plain group
//     best_state.json          ← epoch, best accuracy, lr
//
// best_state.json is written LAST, so its presence means the
// record files next to it are complete.
//
// The recorder appends `.mpk.gz` itself and replaces anything
// after the last dot, so file stems here never contain dots.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    optim::Optimizer,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::{SteganalysisNet, SteganalysisNetConfig};
use crate::ml::optim::GroupedSgd;

const MODEL_FILE:        &str = "best_model";
const OPTIM_DECAY_FILE:  &str = "best_optim_decay";
const OPTIM_PLAIN_FILE:  &str = "best_optim_plain";
const STATE_FILE:        &str = "best_state.json";
const TRAIN_CONFIG_FILE: &str = "train_config.json";
const MODEL_CONFIG_FILE: &str = "model_config.json";
const LOG_FILE:          &str = "train.log";

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Progress saved alongside the best weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainState {
    /// Epoch that produced the best validation accuracy
    pub epoch:         usize,
    pub best_accuracy: f64,
    pub lr:            f64,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager.
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE)
    }

    pub fn has_best(&self) -> bool {
        self.dir.join(STATE_FILE).exists()
    }

    /// Save weights, both optimiser states and the progress marker.
    pub fn save_best<B, O>(
        &self,
        model: &SteganalysisNet<B>,
        optim: &GroupedSgd<B, O>,
        state: &TrainState,
    ) -> Result<()>
    where
        B: AutodiffBackend,
        O: Optimizer<SteganalysisNet<B>, B>,
    {
        let recorder = CheckpointRecorder::new();

        let path = self.dir.join(MODEL_FILE);
        <CheckpointRecorder as Recorder<B>>::record(&recorder, model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save model to '{}'", path.display()))?;

        let (decayed, plain) = optim.to_records();
        for (record, file) in [(decayed, OPTIM_DECAY_FILE), (plain, OPTIM_PLAIN_FILE)] {
            let path = self.dir.join(file);
            <CheckpointRecorder as Recorder<B>>::record(&recorder, record, path.clone())
                .with_context(|| format!("Failed to save optimiser to '{}'", path.display()))?;
        }

        let path = self.dir.join(STATE_FILE);
        fs::write(&path, serde_json::to_string_pretty(state)?)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;

        tracing::debug!("Saved best checkpoint: epoch {}", state.epoch);
        Ok(())
    }

    pub fn load_state(&self) -> Result<TrainState> {
        let path = self.dir.join(STATE_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!("Cannot find '{}'. Has a best checkpoint been saved?", path.display())
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load the best weights into `model`.
    /// The architecture must match the one that was saved.
    pub fn load_model<B: Backend>(
        &self,
        model:  SteganalysisNet<B>,
        device: &B::Device,
    ) -> Result<SteganalysisNet<B>> {
        let path   = self.dir.join(MODEL_FILE);
        let record = <CheckpointRecorder as Recorder<B>>::load(&CheckpointRecorder::new(), path.clone(), device)
            .with_context(|| format!("Cannot load model '{}'", path.display()))?;
        Ok(model.load_record(record))
    }

    pub fn load_optimizer<B, O>(
        &self,
        optim:  GroupedSgd<B, O>,
        device: &B::Device,
    ) -> Result<GroupedSgd<B, O>>
    where
        B: AutodiffBackend,
        O: Optimizer<SteganalysisNet<B>, B>,
    {
        let recorder = CheckpointRecorder::new();
        let load = |file: &str| -> Result<O::Record> {
            let path = self.dir.join(file);
            <CheckpointRecorder as Recorder<B>>::load(&recorder, path.clone(), device)
                .with_context(|| format!("Cannot load optimiser '{}'", path.display()))
        };
        let decayed = load(OPTIM_DECAY_FILE)?;
        let plain   = load(OPTIM_PLAIN_FILE)?;
        Ok(optim.load_records(decayed, plain))
    }

    /// Save the training configuration so `evaluate` can rebuild the run.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        write_json(&self.dir.join(TRAIN_CONFIG_FILE), cfg)
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        read_json(&self.dir.join(TRAIN_CONFIG_FILE))
            .context("Make sure you have run 'train' before 'evaluate'")
    }

    pub fn save_model_config(&self, cfg: &SteganalysisNetConfig) -> Result<()> {
        write_json(&self.dir.join(MODEL_CONFIG_FILE), cfg)
    }

    pub fn load_model_config(&self) -> Result<SteganalysisNetConfig> {
        read_json(&self.dir.join(MODEL_CONFIG_FILE))
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
    tracing::debug!("Wrote '{}'", path.display());
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Malformed '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::optim::{grouped_sgd, SgdSettings};
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn scratch(name: &str) -> CheckpointManager {
        let dir = std::env::temp_dir()
            .join(format!("ucnet-ckpt-{name}-{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();
        CheckpointManager::new(dir)
    }

    #[test]
    fn test_no_best_before_first_save() {
        let ckpt = scratch("empty");
        assert!(!ckpt.has_best());
        assert!(ckpt.load_state().is_err());
    }

    #[test]
    fn test_best_checkpoint_restores_weights_and_state() {
        let ckpt   = scratch("best");
        let device = Default::default();
        let cfg    = SteganalysisNetConfig::new();
        let model  = cfg.init::<TestBackend>(&device);
        let optim  = grouped_sgd::<TestBackend>(&SgdSettings { momentum: 0.9, weight_decay: 5e-4 });
        let state  = TrainState { epoch: 12, best_accuracy: 0.75, lr: 0.01 };

        ckpt.save_best(&model, &optim, &state).unwrap();
        assert!(ckpt.has_best());
        assert_eq!(ckpt.load_state().unwrap(), state);

        let fresh    = cfg.init::<TestBackend>(&device);
        let restored = ckpt.load_model(fresh, &device).unwrap();

        let values = |t: Tensor<TestBackend, 2>| t.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values(model.fc.weight.val()), values(restored.fc.weight.val()));

        let filters = |t: Tensor<TestBackend, 4>| t.into_data().to_vec::<f32>().unwrap();
        assert_eq!(
            filters(model.preprocess.weight.val()),
            filters(restored.preprocess.weight.val()),
        );

        let optim = grouped_sgd::<TestBackend>(&SgdSettings { momentum: 0.9, weight_decay: 5e-4 });
        assert!(ckpt.load_optimizer(optim, &device).is_ok());
    }

    #[test]
    fn test_model_config_round_trips_through_json() {
        let ckpt = scratch("model-config");
        ckpt.save_model_config(&SteganalysisNetConfig::new().with_threshold(3.0)).unwrap();
        assert_eq!(ckpt.load_model_config().unwrap().threshold, 3.0);
    }
}
