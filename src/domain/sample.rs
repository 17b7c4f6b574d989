// ============================================================
// Layer 3 — Samples and Labels
// ============================================================
// A training sample is a PAIR: the cover image and the stego
// image produced from it by an embedding algorithm. Both go
// into the same mini-batch so the network always sees the two
// classes in equal numbers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The two classes the network separates.
/// The discriminant is the logit index produced by the classifier head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Cover = 0,
    Stego = 1,
}

impl Label {
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Cover => write!(f, "cover"),
            Label::Stego => write!(f, "stego"),
        }
    }
}

/// One cover image and its stego counterpart, identified by the
/// shared file stem (e.g. `"10043"` for `10043.ppm`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePair {
    pub id:    String,
    pub cover: PathBuf,
    pub stego: PathBuf,
}

/// Where cover and stego images live and which extension they use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairLayout {
    pub cover_dir: PathBuf,
    pub stego_dir: PathBuf,
    pub extension: String,
}

impl PairLayout {
    pub fn new(
        cover_dir: impl Into<PathBuf>,
        stego_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            cover_dir: cover_dir.into(),
            stego_dir: stego_dir.into(),
            extension: extension.into(),
        }
    }

    /// Build the pair paths for an image id: `{dir}/{id}.{ext}`
    pub fn pair(&self, id: &str) -> ImagePair {
        let file = format!("{id}.{}", self.extension);
        ImagePair {
            id:    id.to_string(),
            cover: self.cover_dir.join(&file),
            stego: self.stego_dir.join(&file),
        }
    }
}

/// Output of the classifier for a single image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label:             Label,
    /// Softmax probability of the stego class, in [0, 1]
    pub stego_probability: f32,
}

impl Prediction {
    pub fn from_probabilities(cover: f32, stego: f32) -> Self {
        let label = if stego > cover { Label::Stego } else { Label::Cover };
        Self { label, stego_probability: stego }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_indices_match_logits() {
        assert_eq!(Label::Cover.index(), 0);
        assert_eq!(Label::Stego.index(), 1);
    }

    #[test]
    fn test_layout_builds_matching_paths() {
        let layout = PairLayout::new("/data/cover", "/data/hill_0.4", "ppm");
        let pair   = layout.pair("42");
        assert_eq!(pair.cover, PathBuf::from("/data/cover/42.ppm"));
        assert_eq!(pair.stego, PathBuf::from("/data/hill_0.4/42.ppm"));
    }

    #[test]
    fn test_prediction_ties_go_to_cover() {
        assert_eq!(Prediction::from_probabilities(0.5, 0.5).label, Label::Cover);
        assert_eq!(Prediction::from_probabilities(0.2, 0.8).label, Label::Stego);
    }
}
