// ============================================================
// Layer 2 — Classify Use Case
// ============================================================
// Loads the best checkpoint of a run and labels individual
// images as cover or stego.

use anyhow::{bail, Result};
use burn::prelude::Backend;
use std::path::PathBuf;

use crate::domain::sample::Prediction;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{backend::BackendKind, inferencer::Inferencer};

pub struct ClassifyUseCase {
    ckpt:    CheckpointManager,
    backend: BackendKind,
}

impl ClassifyUseCase {
    pub fn new(run_dir: PathBuf, backend: BackendKind) -> Result<Self> {
        if !run_dir.is_dir() {
            bail!("Run directory '{}' does not exist", run_dir.display());
        }
        Ok(Self { ckpt: CheckpointManager::new(run_dir), backend })
    }

    /// Classify every image; one failed decode fails the whole call.
    pub fn classify(&self, images: &[PathBuf]) -> Result<Vec<(PathBuf, Prediction)>> {
        match self.backend {
            BackendKind::Wgpu => {
                classify_all::<burn::backend::Wgpu>(&self.ckpt, BackendKind::wgpu_device(), images)
            }
            BackendKind::NdArray => {
                classify_all::<burn::backend::NdArray>(&self.ckpt, BackendKind::ndarray_device(), images)
            }
        }
    }
}

fn classify_all<B: Backend>(
    ckpt:   &CheckpointManager,
    device: B::Device,
    images: &[PathBuf],
) -> Result<Vec<(PathBuf, Prediction)>> {
    let inferencer = Inferencer::<B>::from_checkpoint(ckpt, device)?;
    images
        .iter()
        .map(|path| Ok((path.clone(), inferencer.classify_path(path)?)))
        .collect()
}
