// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn model, optimiser and loops.
//
// What's in this layer:
//
//   filters.rs    — The 62 fixed 5×5 kernels (30 SRM + 32 Gabor)
//
//   model.rs      — The steganalysis network
//                   • Fixed high-pass filtering + truncation
//                   • Plain, pooled-residual and grouped-residual
//                     convolution blocks
//                   • Global average pooling + linear classifier
//
//   optim.rs      — Two-group SGD (weight decay on kernels only)
//                   and the multi-step learning-rate schedule
//
//   backend.rs    — Wgpu / NdArray selection
//
//   trainer.rs    — The training loop
//                   Trains, refreshes batch-norm statistics,
//                   evaluates, keeps the best checkpoint, and
//                   scores the test split at the end
//
//   inferencer.rs — Loads a checkpoint and classifies single images
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Fixed SRM and Gabor filter kernels
pub mod filters;

/// High-pass-filter CNN architecture
pub mod model;

/// Grouped SGD and learning-rate schedule
pub mod optim;

/// Backend choice shared by training and inference
pub mod backend;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Inference engine — loads checkpoint and classifies images
pub mod inferencer;
