// ============================================================
// Layer 4 — Pair Augmentation
// ============================================================
// Random dihedral transforms for training pairs. The SAME
// rotation and flip are applied to the cover and the stego
// image, otherwise the network could learn to separate the
// two by orientation instead of by embedding noise.

use burn::data::dataset::transform::Mapper;
use rand::Rng;

use crate::data::dataset::PairItem;
use crate::data::planes::Planes;

/// A concrete draw of the augmentation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transform {
    /// Quarter turns, 0..=3
    pub quarter_turns: usize,
    pub flip_rows:     bool,
}

impl Transform {
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            quarter_turns: rng.gen_range(0..4),
            flip_rows:     rng.gen_bool(0.5),
        }
    }

    pub fn apply(&self, item: &PairItem) -> PairItem {
        let turn = |p: &Planes| {
            let rotated = p.rot90(self.quarter_turns);
            if self.flip_rows { rotated.flip_rows() } else { rotated }
        };
        PairItem {
            id:    item.id.clone(),
            cover: turn(&item.cover),
            stego: turn(&item.stego),
        }
    }
}

/// Burn `Mapper` that augments every pair drawn from the training set.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairAugmenter;

impl Mapper<PairItem, PairItem> for PairAugmenter {
    fn map(&self, item: &PairItem) -> PairItem {
        let mut transform = Transform::sample(&mut rand::thread_rng());
        // Odd turns would transpose non-square images and break batching
        let [_, height, width] = item.cover.shape();
        if height != width {
            transform.quarter_turns &= 2;
        }
        transform.apply(item)
    }
}
