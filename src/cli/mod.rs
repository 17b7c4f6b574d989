// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`    — trains the network on cover/stego pairs
//   2. `evaluate` — re-scores the best checkpoint of a run
//   3. `classify` — labels single images with a checkpoint
//
// Logging is set up here, per command, because only `train`
// knows its run directory before anything is logged.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{ClassifyArgs, Commands, EvaluateArgs, TrainArgs};

use crate::infra::logging;

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "ucnet-steganalysis",
    version,
    about = "Train a high-pass-filter CNN to tell cover images from stego images."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Classify(args) => run_classify(args),
        }
    }
}

/// Handles the `train` subcommand.
/// Converts CLI args into a TrainConfig and hands off to Layer 2.
fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let resuming = args.resume.is_some();
    let use_case = TrainUseCase::new(args.into());
    logging::init(Some(&use_case.log_path()), resuming)?;

    let outcome = use_case.execute()?;

    match outcome.best_epoch {
        Some(epoch) => println!(
            "Training complete. Best validation accuracy {:.4} at epoch {}, test accuracy {:.4}.",
            outcome.best_accuracy, epoch, outcome.test_accuracy,
        ),
        None => println!(
            "Training complete. No checkpoint saved, test accuracy {:.4}.",
            outcome.test_accuracy,
        ),
    }
    Ok(())
}

/// Handles the `evaluate` subcommand.
fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    logging::init(None, false)?;
    let accuracy = EvaluateUseCase::new(args.into()).execute()?;
    println!("Accuracy: {:.4}", accuracy);
    Ok(())
}

/// Handles the `classify` subcommand.
/// Prints one line per image: path, label, stego probability.
fn run_classify(args: ClassifyArgs) -> Result<()> {
    use crate::application::classify_use_case::ClassifyUseCase;

    logging::init(None, false)?;
    let use_case = ClassifyUseCase::new(args.run_dir, args.backend)?;
    for (path, prediction) in use_case.classify(&args.images)? {
        println!(
            "{}\t{}\t{:.4}",
            path.display(),
            prediction.label,
            prediction.stego_probability,
        );
    }
    Ok(())
}
