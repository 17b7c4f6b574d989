// ============================================================
// Layer 5 — Inferencer
// ============================================================
use std::path::Path;

use anyhow::{bail, Result};
use burn::{prelude::*, tensor::activation::softmax};

use crate::data::planes::Planes;
use crate::domain::sample::Prediction;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::SteganalysisNet;

pub struct Inferencer<B: Backend> {
    model:  SteganalysisNet<B>,
    device: B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(ckpt: &CheckpointManager, device: B::Device) -> Result<Self> {
        let model: SteganalysisNet<B> = ckpt.load_model_config()?.init(&device);
        let model = ckpt.load_model(model, &device)?;
        tracing::info!("Model loaded from '{}'", ckpt.dir().display());
        Ok(Self::new(model, device))
    }

    pub fn new(model: SteganalysisNet<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    pub fn classify_path(&self, path: &Path) -> Result<Prediction> {
        self.classify(&Planes::open(path)?)
    }

    pub fn classify(&self, image: &Planes) -> Result<Prediction> {
        let [channels, height, width] = image.shape();
        let input = Tensor::<B, 4>::from_data(
            TensorData::new(image.data().to_vec(), [1, channels, height, width]),
            &self.device,
        );

        let probs: Vec<f32> = softmax(self.model.forward(input), 1)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read class probabilities: {:?}", e))?;

        match probs.as_slice() {
            [cover, stego, ..] => Ok(Prediction::from_probabilities(*cover, *stego)),
            other => bail!("Expected two class probabilities, got {}", other.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::Label;
    use crate::ml::model::SteganalysisNetConfig;
    use burn::backend::NdArray;

    #[test]
    fn test_probabilities_are_normalised() {
        let device = Default::default();
        let model  = SteganalysisNetConfig::new().init::<NdArray>(&device);
        let infer  = Inferencer::new(model, device);

        let image = Planes::new(3, 16, 16, (0..3 * 16 * 16).map(|v| (v % 251) as f32).collect());
        let p = infer.classify(&image).unwrap();

        assert!((0.0..=1.0).contains(&p.stego_probability));
        assert_eq!(p.label == Label::Stego, p.stego_probability > 0.5);
    }

    #[test]
    fn test_single_class_head_is_an_error() {
        let device = Default::default();
        let model  = SteganalysisNetConfig::new()
            .with_num_classes(1)
            .init::<NdArray>(&device);
        let infer  = Inferencer::new(model, device);

        let image = Planes::new(3, 16, 16, vec![128.0; 3 * 16 * 16]);
        assert!(infer.classify(&image).is_err());
    }
}
