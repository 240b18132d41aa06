// ─────────────────────────────────────────────────────────────────────
// Recurrent Spectral Network — Experiment Runner
// ─────────────────────────────────────────────────────────────────────
//! `rsn`: build a dataset, train the spectral model and report accuracy.
//!
//!   rsn --source circle --nodes 10 --epochs 200
//!   rsn --config run.json --source file --data points.json --json

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::{debug, info};

use rsn_data::{CircleSource, DataSource, Dataset, JsonFileSource, UniformSource};
use rsn_spectral::{SpectralModel, Trainer};
use rsn_types::{Activation, EvalReport, RsnConfig, RsnError, TrainReport, TransitionMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    /// Features uniform in [0, 1), random labels
    Uniform,
    /// Points on the unit circle vs. a surrounding square (2 classes)
    Circle,
    /// JSON-serialised dataset given by --data
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TransitionArg {
    Projection,
    Eigen,
}

impl From<TransitionArg> for TransitionMode {
    fn from(arg: TransitionArg) -> Self {
        match arg {
            TransitionArg::Projection => TransitionMode::Projection,
            TransitionArg::Eigen => TransitionMode::Eigen,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ActivationArg {
    Relu,
    Tanh,
    Softplus,
    Identity,
}

impl From<ActivationArg> for Activation {
    fn from(arg: ActivationArg) -> Self {
        match arg {
            ActivationArg::Relu => Activation::Relu,
            ActivationArg::Tanh => Activation::Tanh,
            ActivationArg::Softplus => Activation::Softplus,
            ActivationArg::Identity => Activation::Identity,
        }
    }
}

/// Recurrent Spectral Network experiment runner
#[derive(Parser, Debug)]
#[command(name = "rsn", version, author, long_about = None)]
struct Args {
    /// JSON configuration file; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset provider
    #[arg(long, value_enum, default_value_t = SourceArg::Uniform)]
    source: SourceArg,

    /// Dataset file for --source file
    #[arg(long)]
    data: Option<PathBuf>,

    /// Write the loaded dataset as JSON, readable again by --source file
    #[arg(long)]
    save_data: Option<PathBuf>,

    /// Training examples (for --source file: share of the split)
    #[arg(long, default_value_t = 100)]
    train_size: usize,

    /// Held-out examples; 0 evaluates on the training set
    #[arg(long, default_value_t = 0)]
    test_size: usize,

    /// Training epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Seed for parameters, depth windows and generated data
    #[arg(long)]
    seed: Option<u64>,

    /// Number of nodes N
    #[arg(long)]
    nodes: Option<usize>,

    /// Number of classes n
    #[arg(long)]
    classes: Option<usize>,

    /// Linear part of the step
    #[arg(long, value_enum)]
    transition: Option<TransitionArg>,

    /// Nonlinearity g
    #[arg(long, value_enum)]
    activation: Option<ActivationArg>,

    /// Print the final report as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn build_config(args: &Args) -> Result<RsnConfig, RsnError> {
    let mut cfg = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            RsnConfig::from_json(&std::fs::read_to_string(path)?)?
        }
        None => RsnConfig::default(),
    };
    if let Some(epochs) = args.epochs {
        cfg.epochs = epochs;
    }
    if let Some(seed) = args.seed {
        cfg.seed = seed;
    }
    if let Some(nodes) = args.nodes {
        cfg.n_nodes = nodes;
    }
    if let Some(classes) = args.classes {
        cfg.n_classes = classes;
    }
    if let Some(transition) = args.transition {
        cfg.transition = transition.into();
    }
    if let Some(activation) = args.activation {
        cfg.activation = activation.into();
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Load the configured source, zero-padded to N, split into train/test.
fn load_data(args: &Args, cfg: &RsnConfig) -> Result<(Dataset, Dataset), RsnError> {
    let total = args.train_size + args.test_size;
    if args.train_size == 0 {
        return Err(RsnError::Config("--train-size must be >= 1".to_string()));
    }
    let raw = match args.source {
        SourceArg::Uniform => UniformSource {
            count: total,
            dim: cfg.n_nodes,
            n_classes: cfg.n_classes,
            seed: cfg.seed,
        }
        .load()?,
        SourceArg::Circle => CircleSource::new(total.div_ceil(2), cfg.seed).load()?,
        SourceArg::File => {
            let path = args.data.as_ref().ok_or_else(|| {
                RsnError::Config("--source file requires --data <path>".to_string())
            })?;
            JsonFileSource::new(path).load()?
        }
    };
    let data = raw.embed(cfg.n_nodes)?;
    debug!("Class counts: {:?}", data.class_counts());
    if let Some(path) = &args.save_data {
        std::fs::write(path, data.to_json()?)?;
        info!("Saved {} examples to {}", data.len(), path.display());
    }

    if args.test_size == 0 {
        return Ok((data.clone(), data));
    }
    let fraction = args.train_size as f64 / total as f64;
    data.split(fraction)
}

fn print_summary(cfg: &RsnConfig, train: &TrainReport, eval: &EvalReport, as_json: bool) {
    if as_json {
        let report = serde_json::json!({
            "config": cfg,
            "train": train,
            "eval": eval,
            "accuracy": eval.accuracy(),
        });
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => log::error!("Failed to encode report: {e}"),
        }
        return;
    }
    if let (Some(first), Some(last)) = (train.first_loss(), train.final_loss()) {
        println!("loss: {first:.6} -> {last:.6} over {} epochs", train.epochs.len());
    }
    if let Some(best) = train.best() {
        println!("best: epoch {} loss {:.6}", best.epoch, best.loss);
    }
    println!(
        "accuracy: {:.4} ({} examples), mean loss {:.6}",
        eval.accuracy(),
        eval.predictions.len(),
        eval.mean_loss
    );
    println!("confusion (rows = true class):");
    for row in &eval.confusion {
        let cells: Vec<String> = row.iter().map(|c| format!("{c:>6}")).collect();
        println!("  {}", cells.join(""));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let cfg = build_config(&args)?;
    info!(
        "RSN: N={} n={} transition={:?} activation={:?} k_max={} seed={}",
        cfg.n_nodes, cfg.n_classes, cfg.transition, cfg.activation, cfg.k_max, cfg.seed
    );

    let (train_set, test_set) = load_data(&args, &cfg)?;
    info!(
        "Data: {} training / {} evaluation examples",
        train_set.len(),
        test_set.len()
    );

    let model = SpectralModel::new(cfg.clone())?;
    let mut trainer = Trainer::new(model)?;
    let train = trainer.fit(&train_set)?;
    let eval = trainer.evaluate(&test_set)?;

    print_summary(&cfg, &train, &eval, args.json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("rsn").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.source, SourceArg::Uniform);
        assert_eq!(args.train_size, 100);
        let cfg = build_config(&args).unwrap();
        assert_eq!(cfg.n_nodes, 10);
        assert_eq!(cfg.epochs, 200);
    }

    #[test]
    fn test_flags_override_config() {
        let args = parse(&[
            "--nodes", "6", "--classes", "3", "--epochs", "4", "--seed", "9",
            "--transition", "eigen", "--activation", "tanh",
        ]);
        let cfg = build_config(&args).unwrap();
        assert_eq!(cfg.n_nodes, 6);
        assert_eq!(cfg.n_classes, 3);
        assert_eq!(cfg.epochs, 4);
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.transition, TransitionMode::Eigen);
        assert_eq!(cfg.activation, Activation::Tanh);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = parse(&["--nodes", "2", "--classes", "3"]);
        assert!(matches!(build_config(&args), Err(RsnError::Config(_))));
    }

    #[test]
    fn test_config_file_then_flags() {
        let path = std::env::temp_dir().join(format!("rsn-cli-test-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"n_nodes": 8, "epochs": 3}"#).unwrap();
        let args = parse(&["--config", path.to_str().unwrap(), "--epochs", "7"]);
        let cfg = build_config(&args);
        std::fs::remove_file(&path).ok();
        let cfg = cfg.unwrap();
        assert_eq!(cfg.n_nodes, 8);
        assert_eq!(cfg.epochs, 7);
    }

    #[test]
    fn test_circle_split_and_embed() {
        let args = parse(&["--source", "circle", "--train-size", "30", "--test-size", "10"]);
        let cfg = build_config(&args).unwrap();
        let (train, test) = load_data(&args, &cfg).unwrap();
        assert_eq!(train.len(), 30);
        assert_eq!(test.len(), 10);
        assert_eq!(train.dim, 10);
    }

    #[test]
    fn test_file_source_needs_path() {
        let args = parse(&["--source", "file"]);
        let cfg = build_config(&args).unwrap();
        assert!(matches!(load_data(&args, &cfg), Err(RsnError::Config(_))));
    }

    #[test]
    fn test_saved_data_reloads_through_file_source() {
        let path = std::env::temp_dir().join(format!("rsn-cli-data-{}.json", std::process::id()));
        let path_str = path.to_str().unwrap().to_string();
        let save = parse(&["--source", "circle", "--train-size", "16", "--save-data", &path_str]);
        let cfg = build_config(&save).unwrap();
        let (generated, _) = load_data(&save, &cfg).unwrap();

        let reload = parse(&["--source", "file", "--data", &path_str, "--train-size", "16"]);
        let reloaded = load_data(&reload, &cfg);
        std::fs::remove_file(&path).ok();
        let (reloaded, _) = reloaded.unwrap();
        assert_eq!(reloaded, generated);
    }

    #[test]
    fn test_no_test_split_reuses_training_set() {
        let args = parse(&["--train-size", "12", "--nodes", "4"]);
        let cfg = build_config(&args).unwrap();
        let (train, test) = load_data(&args, &cfg).unwrap();
        assert_eq!(train, test);
        assert_eq!(train.len(), 12);
    }
}
