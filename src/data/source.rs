// ============================================================
// Layer 4 — Pair Sources
// ============================================================
// Two ways to find out which image ids make up a split:
//
//   IndexFile      one id per line, `#` starts a comment
//   DirectoryScan  every `{id}.{ext}` in the cover directory
//                  that also exists in the stego directory
//
// Both return pairs in a stable order so that a fixed seed
// always yields the same train/valid/test split.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::sample::{ImagePair, PairLayout};
use crate::domain::traits::PairSource;

/// Reads image ids from a plain-text index list.
pub struct IndexFile {
    path:   PathBuf,
    layout: PairLayout,
}

impl IndexFile {
    pub fn new(path: impl Into<PathBuf>, layout: PairLayout) -> Self {
        Self { path: path.into(), layout }
    }
}

impl PairSource for IndexFile {
    fn pairs(&self) -> Result<Vec<ImagePair>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read index list '{}'", self.path.display()))?;

        let pairs: Vec<ImagePair> = parse_ids(&text)
            .map(|id| self.layout.pair(id))
            .collect();

        tracing::debug!("Index '{}' lists {} pairs", self.path.display(), pairs.len());
        Ok(pairs)
    }
}

/// Ids are whitespace separated; everything after `#` on a line is ignored.
fn parse_ids(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(str::split_whitespace)
}

/// Enumerates the cover directory and keeps ids that have a stego twin.
pub struct DirectoryScan {
    layout: PairLayout,
}

impl DirectoryScan {
    pub fn new(layout: PairLayout) -> Self {
        Self { layout }
    }
}

impl PairSource for DirectoryScan {
    fn pairs(&self) -> Result<Vec<ImagePair>> {
        let dir = &self.layout.cover_dir;
        let mut ids = Vec::new();
        let mut orphans = 0usize;

        for entry in fs::read_dir(dir)
            .with_context(|| format!("Cannot read cover directory '{}'", dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.layout.extension.as_str()) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if self.layout.pair(id).stego.exists() {
                ids.push(id.to_string());
            } else {
                orphans += 1;
            }
        }

        if orphans > 0 {
            tracing::warn!("{} cover images have no stego counterpart and were skipped", orphans);
        }

        ids.sort();
        Ok(ids.iter().map(|id| self.layout.pair(id)).collect())
    }
}
