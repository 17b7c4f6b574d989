// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `evaluate` and
// `classify`, and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, BackendKind, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{evaluate_use_case::EvaluateRequest, train_use_case::TrainConfig};
use crate::ml::backend::BackendKind;

/// The top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the steganalysis network on cover/stego pairs
    Train(TrainArgs),

    /// Re-score the best checkpoint of a finished run
    Evaluate(EvaluateArgs),

    /// Label single images as cover or stego
    Classify(ClassifyArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory holding the cover images
    #[arg(long, default_value = "data/cover")]
    pub cover_dir: PathBuf,

    /// Directory holding the stego images, same file names as the covers
    #[arg(long, default_value = "data/stego")]
    pub stego_dir: PathBuf,

    /// Image file extension shared by cover and stego files
    #[arg(long, default_value = "ppm")]
    pub image_ext: String,

    /// Text file listing training ids (requires --valid-index and --test-index)
    #[arg(long)]
    pub train_index: Option<PathBuf>,

    #[arg(long)]
    pub valid_index: Option<PathBuf>,

    #[arg(long)]
    pub test_index: Option<PathBuf>,

    /// Share of scanned pairs used for training when no index lists are given
    #[arg(long, default_value_t = 0.70)]
    pub train_fraction: f64,

    /// Share of scanned pairs used for validation
    #[arg(long, default_value_t = 0.05)]
    pub valid_fraction: f64,

    /// Parent directory of all run directories
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Embedding algorithm name, used to name the run
    #[arg(short = 'a', long = "steganography", visible_alias = "alg")]
    pub steganography: String,

    /// Embedding rate in bpp, used to name the run
    #[arg(short = 'r', long = "embedding-rate", visible_alias = "rate")]
    pub embedding_rate: String,

    /// Dataset tag, used to name the run
    #[arg(short = 'i', long, default_value = "")]
    pub dataset_index: String,

    /// Pairs per batch (each batch holds twice as many images)
    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 250)]
    pub epochs: usize,

    /// Base learning rate
    #[arg(long, default_value_t = 0.01)]
    pub lr: f64,

    #[arg(long, default_value_t = 0.9)]
    pub momentum: f64,

    /// L2 penalty on convolution and linear weights
    #[arg(long, default_value_t = 5e-4)]
    pub weight_decay: f64,

    /// Epochs at which the learning rate is multiplied by --lr-gamma
    #[arg(long, value_delimiter = ',', default_value = "80,140,190")]
    pub decay_epochs: Vec<usize>,

    #[arg(long, default_value_t = 0.1)]
    pub lr_gamma: f64,

    /// Best checkpoints are only written after this epoch
    #[arg(long, default_value_t = 190)]
    pub save_after_epoch: usize,

    /// Validate every N epochs
    #[arg(long, default_value_t = 1)]
    pub eval_every: usize,

    /// Log a progress line every N batches
    #[arg(long, default_value_t = 100)]
    pub print_every: usize,

    /// Image-decoding worker threads
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    /// Seed for the split and the per-epoch shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Truncation threshold applied to the filter residuals
    #[arg(long, default_value_t = 2.0)]
    pub threshold: f64,

    /// Run directory to resume from
    #[arg(short = 'l', long)]
    pub resume: Option<PathBuf>,

    /// wgpu or ndarray
    #[arg(long, default_value_t = BackendKind::Wgpu)]
    pub backend: BackendKind,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            cover_dir:        a.cover_dir,
            stego_dir:        a.stego_dir,
            image_ext:        a.image_ext,
            train_index:      a.train_index,
            valid_index:      a.valid_index,
            test_index:       a.test_index,
            train_fraction:   a.train_fraction,
            valid_fraction:   a.valid_fraction,
            output_dir:       a.output_dir,
            steganography:    a.steganography,
            embedding_rate:   a.embedding_rate,
            dataset_index:    a.dataset_index,
            batch_size:       a.batch_size,
            epochs:           a.epochs,
            lr:               a.lr,
            momentum:         a.momentum,
            weight_decay:     a.weight_decay,
            decay_epochs:     a.decay_epochs,
            lr_gamma:         a.lr_gamma,
            save_after_epoch: a.save_after_epoch,
            eval_every:       a.eval_every,
            print_every:      a.print_every,
            num_workers:      a.num_workers,
            seed:             a.seed,
            threshold:        a.threshold,
            resume:           a.resume,
            backend:          a.backend,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Run directory written by `train`
    #[arg(long)]
    pub run_dir: PathBuf,

    /// Score the ids in this list instead of the run's test split
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Skip re-estimating batch-norm statistics on the training split
    #[arg(long)]
    pub no_adjust_bn: bool,

    /// Override the backend recorded in the run's config
    #[arg(long)]
    pub backend: Option<BackendKind>,
}

impl From<EvaluateArgs> for EvaluateRequest {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateRequest {
            run_dir:   a.run_dir,
            index:     a.index,
            adjust_bn: !a.no_adjust_bn,
            backend:   a.backend,
        }
    }
}

/// All arguments for the `classify` command
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Run directory written by `train`
    #[arg(long)]
    pub run_dir: PathBuf,

    /// Images to classify
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    #[arg(long, default_value_t = BackendKind::Wgpu)]
    pub backend: BackendKind,
}
