// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from image files on disk to tensor batches.
//
//   index list / cover dir
//       │
//       ▼
//   PairSource       → which ids form a split
//       │
//       ▼
//   splitter         → seeded train/valid/test cut (no index lists)
//       │
//       ▼
//   PairDataset      → implements Burn's Dataset, decodes images
//       │
//       ▼
//   PairAugmenter    → random rot90 / flip, training only
//       │
//       ▼
//   PairBatcher      → interleaves cover/stego into [2N, C, H, W]
//       │
//       ▼
//   DataLoader       → feeds batches to the training loop

/// Index-file and directory-scan pair sources
pub mod source;

/// CHW float images and their geometric transforms
pub mod planes;

/// Random dihedral augmentation shared by both images of a pair
pub mod augment;

/// Implements Burn's Dataset trait for cover/stego pairs
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits pairs into train/valid/test sets
pub mod splitter;
