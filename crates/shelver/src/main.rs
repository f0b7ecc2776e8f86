//! Shelver - watched-folder document classifier
//!
//! Usage:
//!     shelver watch                      # run the long-lived service
//!     shelver classify <path>            # one-shot decision dump
//!     shelver train --samples <dir>      # build the model artifact

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shelver::{
    Classifier, CommitEngine, ConfirmationRouter, ExtensionFilter, FileAuditLog, InFlightTracker,
    LogPrompter, MountLabeler, OfficeExtractor, Pipeline, ScoringMode, ShelverConfig,
    TokenWeightModel,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "shelver", about = "Watches a folder and files documents by subject")]
struct Cli {
    /// Config file (default: ~/.shelver/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Mirror the full log to the console
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the watch service until interrupted
    Watch {
        /// On shutdown, wait for in-flight files instead of detaching them
        #[arg(long)]
        drain: bool,
    },
    /// Classify one file and print the decision without moving anything
    Classify { path: PathBuf },
    /// Build the subject model artifact from labeled samples
    /// (<samples>/<subject>/<document>)
    Train {
        #[arg(long)]
        samples: PathBuf,

        /// Artifact output path (default: the configured model path)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> Result<ShelverConfig> {
    match &cli.config {
        Some(path) => {
            ShelverConfig::load(path).with_context(|| format!("Loading {}", path.display()))
        }
        None => {
            let path = shelver_logging::shelver_home().join("config.toml");
            if path.exists() {
                ShelverConfig::load(&path).with_context(|| format!("Loading {}", path.display()))
            } else {
                Ok(ShelverConfig::default())
            }
        }
    }
}

fn build_classifier(config: &ShelverConfig) -> Result<Classifier> {
    let model = TokenWeightModel::load(&config.model_path)
        .context("Subject model is required at startup")?;
    let mode = if config.filename_first {
        ScoringMode::FilenameFirst
    } else {
        ScoringMode::Weighted
    };
    Ok(Classifier::new(
        config.subject_keywords.clone(),
        config.device_labels.clone(),
        mode,
        Arc::new(OfficeExtractor),
        Arc::new(model),
        Arc::new(MountLabeler::default()),
    ))
}

async fn run_watch(config: ShelverConfig, drain: bool) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    let classifier = build_classifier(&config)?;

    let audit = FileAuditLog::open(&shelver::audit::default_audit_path())
        .context("Opening audit log")?;

    let prompter = Arc::new(LogPrompter);
    let confirmation = config.confirm.enabled.then(|| {
        ConfirmationRouter::new(
            Duration::from_secs(config.confirm.window_secs),
            prompter.clone() as Arc<dyn shelver::Prompter>,
        )
    });

    let pipeline = Arc::new(Pipeline::new(
        Duration::from_secs(config.delay_secs),
        InFlightTracker::new(),
        Arc::new(classifier),
        confirmation,
        CommitEngine::new(config.dest_root().to_path_buf()),
        Arc::new(audit),
        prompter,
    ));

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    // Keep the watcher alive for the whole run; dropping it stops events.
    let _watcher = shelver::watch_directory(&config.watch_dir, tx)
        .with_context(|| format!("Watching {}", config.watch_dir.display()))?;

    let filter = ExtensionFilter::new(&config.extensions);
    let handle = shelver::spawn_dispatcher(pipeline, filter, rx);

    info!(
        watch = %config.watch_dir.display(),
        dest = %config.dest_root().display(),
        "shelver running; press ctrl-c to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Waiting for shutdown signal")?;
    info!("shutdown requested");

    if drain {
        handle.shutdown_and_drain().await?;
    } else {
        handle.shutdown().await?;
    }
    Ok(())
}

fn run_classify(config: ShelverConfig, path: PathBuf) -> Result<()> {
    let classifier = build_classifier(&config)?;
    let decision = classifier.classify(&path);

    match &decision.subject {
        Some(subject) => println!("{} -> {}", path.display(), subject),
        None => println!("{} -> unclassifiable", path.display()),
    }
    for evidence in &decision.evidence {
        println!("  {evidence}");
    }
    Ok(())
}

fn run_train(config: ShelverConfig, samples: PathBuf, out: Option<PathBuf>) -> Result<()> {
    let model = TokenWeightModel::train(&samples, &OfficeExtractor)
        .context("Training subject model")?;
    let out = out.unwrap_or(config.model_path);
    model.save(&out).context("Saving model artifact")?;
    println!(
        "trained {} subjects ({} tokens) -> {}",
        model.subjects.len(),
        model.weights.len(),
        out.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    shelver_logging::init_logging("shelver", cli.verbose)?;

    let config = load_config(&cli)?;
    match cli.command {
        Command::Watch { drain } => run_watch(config, drain).await,
        Command::Classify { path } => run_classify(config, path),
        Command::Train { samples, out } => run_train(config, samples, out),
    }
}
