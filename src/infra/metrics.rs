// ============================================================
// Layer 6 — Metrics
// ============================================================
// Two pieces:
//
//   AverageMeter   running value/average used for the per-batch
//                  progress lines (batch time, data time, loss)
//
//   MetricsLogger  appends one CSV row per epoch so learning
//                  curves can be plotted after a run
//
// Output file: <run>/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,valid_accuracy,best_accuracy,lr
//   1,0.693100,0.512500,0.000000,0.01
//   2,0.690800,0.531250,0.000000,0.01
//   ...
//
// The header is written only when the file is new, so a resumed
// run keeps appending to the same file.

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// Tracks the latest value and the running mean of a quantity.
#[derive(Debug, Clone, Default)]
pub struct AverageMeter {
    pub val:   f64,
    pub avg:   f64,
    pub sum:   f64,
    pub count: usize,
}

impl AverageMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `val`, weighted as `n` observations.
    pub fn update(&mut self, val: f64, n: usize) {
        self.val    = val;
        self.sum   += val * n as f64;
        self.count += n;
        self.avg    = if self.count > 0 { self.sum / self.count as f64 } else { 0.0 };
    }
}

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean cross-entropy over the epoch's training batches
    pub train_loss: f64,

    /// Validation accuracy, NaN on epochs that skipped evaluation
    pub valid_accuracy: f64,

    /// Best validation accuracy that produced a saved checkpoint
    pub best_accuracy: f64,

    pub lr: f64,
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,valid_accuracy,best_accuracy,lr")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{}",
            m.epoch,
            m.train_loss,
            m.valid_accuracy,
            m.best_accuracy,
            m.lr,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, valid_accuracy={:.4}",
            m.epoch,
            m.train_loss,
            m.valid_accuracy,
        );

        Ok(())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_meter_weights_updates() {
        let mut m = AverageMeter::new();
        m.update(1.0, 1);
        m.update(4.0, 3);
        assert_eq!(m.val, 4.0);
        assert_eq!(m.count, 4);
        assert!((m.avg - 13.0 / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_logger_appends_rows_under_one_header() {
        let dir = std::env::temp_dir()
            .join(format!("ucnet-metrics-{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();

        let row = |epoch| EpochMetrics {
            epoch,
            train_loss:     0.69,
            valid_accuracy: 0.5,
            best_accuracy:  0.0,
            lr:             0.01,
        };

        let logger = MetricsLogger::new(&dir).unwrap();
        logger.log(&row(1)).unwrap();

        // Reopening must not write a second header
        let logger = MetricsLogger::new(&dir).unwrap();
        logger.log(&row(2)).unwrap();

        let csv   = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "epoch,train_loss,valid_accuracy,best_accuracy,lr");
        assert!(lines[1].starts_with("1,0.690000,0.500000"));
        assert!(lines[2].starts_with("2,"));
    }
}
