// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Handles all cross-cutting concerns that don't belong in
// any specific business layer:
//
//   checkpoint.rs — Saving and loading the best model
//                   Uses Burn's full-precision MessagePack recorder for weights and
//                   optimiser state, JSON for configs and the
//                   best-epoch marker.
//
//   metrics.rs    — Running averages for progress lines and a
//                   per-epoch CSV for learning curves.
//
//   logging.rs    — tracing-subscriber setup: console plus an
//                   optional log file in the run directory.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Global tracing subscriber
pub mod logging;
