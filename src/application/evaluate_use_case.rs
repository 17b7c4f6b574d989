// ============================================================
// Layer 2 — Evaluate Use Case
// ============================================================
// Re-scores a finished run without retraining:
//
//   Step 1: Reload train_config.json from the run directory
//   Step 2: Rebuild the test split (or read a given index list)
//   Step 3: Optionally refresh batch-norm statistics on the
//           training split, as the training loop does
//   Step 4: Report accuracy = correct / (2 · pairs)

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::application::train_use_case::resolve_pairs;
use crate::data::{dataset::PairDataset, source::IndexFile};
use crate::domain::traits::PairSource;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{backend::BackendKind, trainer::run_evaluation};

#[derive(Debug, Clone)]
pub struct EvaluateRequest {
    pub run_dir:   PathBuf,
    /// Score these ids instead of the run's test split
    pub index:     Option<PathBuf>,
    pub adjust_bn: bool,
    pub backend:   Option<BackendKind>,
}

pub struct EvaluateUseCase {
    request: EvaluateRequest,
}

impl EvaluateUseCase {
    pub fn new(request: EvaluateRequest) -> Self {
        Self { request }
    }

    pub fn execute(&self) -> Result<f64> {
        let req = &self.request;
        if !req.run_dir.is_dir() {
            bail!("Run directory '{}' does not exist", req.run_dir.display());
        }

        let ckpt    = CheckpointManager::new(&req.run_dir);
        let mut cfg = ckpt.load_config()?;
        if let Some(backend) = req.backend {
            cfg.backend = backend;
        }

        let (pairs, train) = match &req.index {
            Some(index) => {
                let train = if req.adjust_bn { Some(resolve_pairs(&cfg)?.train) } else { None };
                (IndexFile::new(index, cfg.layout()).pairs()?, train)
            }
            None => {
                let resolved = resolve_pairs(&cfg)?;
                (resolved.test, Some(resolved.train))
            }
        };
        if pairs.is_empty() {
            bail!("Nothing to evaluate: the selected split is empty");
        }

        let bn_pairs = match train {
            Some(train) if req.adjust_bn => Some(PairDataset::validated(train)?),
            _ => None,
        };

        tracing::info!("Evaluating {} pairs from '{}'", pairs.len(), req.run_dir.display());
        run_evaluation(&cfg, &ckpt, PairDataset::validated(pairs)?, bn_pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_run_directory_is_an_error() {
        let use_case = EvaluateUseCase::new(EvaluateRequest {
            run_dir:   PathBuf::from("/definitely/not/a/run"),
            index:     None,
            adjust_bn: false,
            backend:   Some(BackendKind::NdArray),
        });
        assert!(use_case.execute().is_err());
    }
}
