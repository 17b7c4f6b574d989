use anyhow::{bail, Result};
use burn::data::dataset::Dataset;

use crate::data::planes::Planes;
use crate::domain::sample::ImagePair;

/// One decoded cover/stego pair. Both images have identical shape.
#[derive(Debug, Clone)]
pub struct PairItem {
    pub id:    String,
    pub cover: Planes,
    pub stego: Planes,
}

impl PairItem {
    pub fn load(pair: &ImagePair) -> Result<Self> {
        let cover = Planes::open(&pair.cover)?;
        let stego = Planes::open(&pair.stego)?;
        if cover.shape() != stego.shape() {
            bail!(
                "Pair '{}' has mismatched shapes: cover {:?}, stego {:?}",
                pair.id, cover.shape(), stego.shape()
            );
        }
        Ok(Self { id: pair.id.clone(), cover, stego })
    }
}

/// Lazily decoded pairs. Images are read from disk in `get`, which
/// burn's data loader calls from its worker threads.
#[derive(Debug, Clone)]
pub struct PairDataset {
    pairs: Vec<ImagePair>,
}

impl PairDataset {
    pub fn new(pairs: Vec<ImagePair>) -> Self {
        Self { pairs }
    }

    /// Build the dataset after decoding every pair once.
    ///
    /// burn's loader ends a pass at the first index whose `get` returns
    /// `None`, so a file that cannot be decoded must fail here, by name,
    /// before any pass starts.
    pub fn validated(pairs: Vec<ImagePair>) -> Result<Self> {
        let mut expected: Option<[usize; 3]> = None;

        for pair in &pairs {
            let item  = PairItem::load(pair)?;
            let shape = item.cover.shape();
            match expected {
                None => expected = Some(shape),
                Some(size) if size != shape => {
                    bail!("Pair '{}' is {:?}, expected {:?} like the rest", pair.id, shape, size)
                }
                Some(_) => {}
            }
        }
        tracing::debug!("Decoded {} pairs", pairs.len());

        Ok(Self::new(pairs))
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }
}

impl Dataset<PairItem> for PairDataset {
    fn get(&self, index: usize) -> Option<PairItem> {
        let pair = self.pairs.get(index)?;
        match PairItem::load(pair) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::error!("Dropping pair '{}': {:#}", pair.id, e);
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }
}

/// The three splits used by a training run.
#[derive(Debug, Clone)]
pub struct SplitDatasets {
    pub train: PairDataset,
    pub valid: PairDataset,
    pub test:  PairDataset,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs;
    use std::path::PathBuf;

    use crate::domain::sample::{ImagePair, PairLayout};

    /// Write `count` small PPM pairs whose stego images differ from the
    /// cover by a sparse ±1 pattern. Returns the layout and the pairs.
    pub fn write_pairs(name: &str, count: usize, size: u32) -> (PairLayout, Vec<ImagePair>) {
        let root = std::env::temp_dir()
            .join(format!("ucnet-{name}-{}", std::process::id()));
        let cover_dir: PathBuf = root.join("cover");
        let stego_dir: PathBuf = root.join("stego");
        fs::create_dir_all(&cover_dir).unwrap();
        fs::create_dir_all(&stego_dir).unwrap();

        let layout = PairLayout::new(&cover_dir, &stego_dir, "ppm");
        let mut pairs = Vec::new();
        for n in 0..count {
            let cover = image::RgbImage::from_fn(size, size, |x, y| {
                let v = ((x * 7 + y * 13 + n as u32 * 31) % 200) as u8 + 20;
                image::Rgb([v, v.wrapping_add(3), v.wrapping_sub(5)])
            });
            let mut stego = cover.clone();
            for (i, px) in stego.pixels_mut().enumerate() {
                if (i + n) % 5 == 0 {
                    px.0[i % 3] = px.0[i % 3].wrapping_add(1);
                }
            }
            let pair = layout.pair(&n.to_string());
            cover.save(&pair.cover).unwrap();
            stego.save(&pair.stego).unwrap();
            pairs.push(pair);
        }
        (layout, pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_decodes_both_images() {
        let (_, pairs) = fixtures::write_pairs("dataset-get", 2, 8);
        let dataset    = PairDataset::validated(pairs).unwrap();

        assert_eq!(dataset.len(), 2);
        let item = dataset.get(1).unwrap();
        assert_eq!(item.id, "1");
        assert_eq!(item.cover.shape(), [3, 8, 8]);
        assert_ne!(item.cover, item.stego);
    }

    #[test]
    fn test_out_of_range_is_none() {
        let dataset = PairDataset::new(Vec::new());
        assert!(dataset.get(0).is_none());
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_validation_rejects_missing_stego() {
        let (_, mut pairs) = fixtures::write_pairs("dataset-missing", 1, 4);
        pairs[0].stego = pairs[0].stego.with_file_name("absent.ppm");
        assert!(PairDataset::validated(pairs).is_err());
    }

    #[test]
    fn test_validation_rejects_truncated_pixels() {
        let (_, pairs) = fixtures::write_pairs("dataset-truncated", 6, 8);

        // Header intact, pixel data cut in half
        let bytes = std::fs::read(&pairs[1].cover).unwrap();
        std::fs::write(&pairs[1].cover, &bytes[..bytes.len() / 2]).unwrap();

        let err = PairDataset::validated(pairs.clone()).unwrap_err();
        assert!(format!("{err:#}").contains(&pairs[1].cover.display().to_string()));
    }

    #[test]
    fn test_validation_rejects_mixed_sizes() {
        let (_, mut small) = fixtures::write_pairs("dataset-small", 1, 4);
        let (_, large)     = fixtures::write_pairs("dataset-large", 1, 6);
        small.extend(large);
        assert!(PairDataset::validated(small).is_err());
    }
}
