// ============================================================
// Layer 4 — Pair Batcher
// ============================================================
// Implements Burn's Batcher trait: N pairs in, one tensor of
// 2N images out.
//
// Layout of a batch:
//   images  [2N, C, H, W]   cover₀, stego₀, cover₁, stego₁, ...
//   labels  [2N]            0,      1,      0,      1,      ...
//
// Keeping each cover next to its own stego image means every
// mini-batch is perfectly class-balanced and both members of
// a pair share batch-norm statistics.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::PairItem;
use crate::domain::sample::Label;

#[derive(Debug, Clone)]
pub struct PairBatch<B: Backend> {
    /// Raw pixel values, shape [2N, C, H, W]
    pub images: Tensor<B, 4>,

    /// Class indices, shape [2N]
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct PairBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> PairBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<PairItem, PairBatch<B>> for PairBatcher<B> {
    fn batch(&self, items: Vec<PairItem>) -> PairBatch<B> {
        let [channels, height, width] = items[0].cover.shape();
        let images_per_batch = items.len() * 2;

        let mut pixels = Vec::with_capacity(images_per_batch * channels * height * width);
        let mut labels = Vec::with_capacity(images_per_batch);

        for item in &items {
            pixels.extend_from_slice(item.cover.data());
            labels.push(Label::Cover.index() as i32);
            pixels.extend_from_slice(item.stego.data());
            labels.push(Label::Stego.index() as i32);
        }

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [images_per_batch, channels, height, width]),
            &self.device,
        );
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        PairBatch { images, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::planes::Planes;
    use burn::backend::NdArray;

    fn item(id: &str, fill: f32) -> PairItem {
        PairItem {
            id:    id.to_string(),
            cover: Planes::new(3, 2, 2, vec![fill; 12]),
            stego: Planes::new(3, 2, 2, vec![fill + 1.0; 12]),
        }
    }

    #[test]
    fn test_batch_interleaves_cover_and_stego() {
        let batcher = PairBatcher::<NdArray>::new(Default::default());
        let batch   = batcher.batch(vec![item("a", 10.0), item("b", 20.0)]);

        assert_eq!(batch.images.dims(), [4, 3, 2, 2]);

        let labels: Vec<i64> = batch.labels.into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![0, 1, 0, 1]);

        let firsts: Vec<f32> = batch.images
            .flatten::<2>(1, 3)
            .slice([0..4, 0..1])
            .into_data()
            .iter::<f32>()
            .collect();
        assert_eq!(firsts, vec![10.0, 11.0, 20.0, 21.0]);
    }
}
