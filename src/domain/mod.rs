// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe the problem: which class an
// image belongs to, where a cover/stego pair lives on disk,
// and what the classifier predicted.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO image decoding
//   - Only plain Rust structs, enums, and traits

// Labels, image pairs and predictions
pub mod sample;

// Core abstractions (traits) that other layers implement
pub mod traits;
