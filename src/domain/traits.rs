// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer asks for "the list of pairs" without
// caring whether it comes from an index file or a directory
// scan.

use anyhow::Result;
use crate::domain::sample::ImagePair;

// ─── PairSource ───────────────────────────────────────────────────────────────
/// Any component that can enumerate cover/stego pairs.
///
/// Implementations:
///   - IndexFile     → ids listed one per line in a text file
///   - DirectoryScan → ids present in both the cover and stego directories
pub trait PairSource {
    /// Return every pair this source knows about, in a stable order.
    fn pairs(&self) -> Result<Vec<ImagePair>>;
}
