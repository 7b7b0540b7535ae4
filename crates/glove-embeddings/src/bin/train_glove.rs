//! Training binary for the GloVe co-occurrence embedder.
//!
//! Drives the minibatch trainer with a seeded random triple source, the
//! same driver the reference prototype used.
//!
//! # Usage
//!
//! ```bash
//! train-glove --vocab 6000 --dim 300 --epochs 1
//! train-glove --config glove.toml --optimizer adam
//! ```

use std::path::PathBuf;
use std::time::Instant;

use glove_embeddings::{
    DeviceKind, GloveConfig, GloveTrainer, OptimizerKind, RandomTripleSource,
};

/// CLI arguments.
struct Args {
    /// Optional TOML configuration file; CLI flags override it.
    config: Option<PathBuf>,
    /// Vocabulary size V.
    vocab: Option<usize>,
    /// Embedding dimensionality D.
    dim: Option<usize>,
    /// Triples per optimizer step.
    batch_size: Option<usize>,
    /// Passes over the stream.
    epochs: Option<u32>,
    /// Update rule: sgd or adam.
    optimizer: Option<OptimizerKind>,
    /// Number of random triples per pass (default: (0.2 * V)^2).
    triples: Option<usize>,
    /// Random seed.
    seed: u64,
    /// Force CPU even when CUDA is available.
    cpu: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config: None,
            vocab: None,
            dim: None,
            batch_size: None,
            epochs: None,
            optimizer: None,
            triples: None,
            seed: 42,
            cpu: false,
        }
    }
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut result = Args::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-c" | "--config" => {
                i += 1;
                result.config = Some(PathBuf::from(required_value(&args, i)));
            }
            "-v" | "--vocab" => {
                i += 1;
                result.vocab = Some(parse_value(&args, i));
            }
            "-d" | "--dim" => {
                i += 1;
                result.dim = Some(parse_value(&args, i));
            }
            "-b" | "--batch-size" => {
                i += 1;
                result.batch_size = Some(parse_value(&args, i));
            }
            "-e" | "--epochs" => {
                i += 1;
                result.epochs = Some(parse_value(&args, i));
            }
            "--optimizer" => {
                i += 1;
                result.optimizer = Some(match required_value(&args, i).to_lowercase().as_str() {
                    "sgd" => OptimizerKind::Sgd,
                    "adam" => OptimizerKind::Adam,
                    other => {
                        eprintln!("Unknown optimizer: {}", other);
                        std::process::exit(1);
                    }
                });
            }
            "--triples" => {
                i += 1;
                result.triples = Some(parse_value(&args, i));
            }
            "--seed" => {
                i += 1;
                result.seed = parse_value(&args, i);
            }
            "--cpu" => {
                result.cpu = true;
            }
            "--help" | "-h" => {
                println!("train-glove: GloVe co-occurrence embedding trainer");
                println!();
                println!("Usage: train-glove [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>      TOML configuration file");
                println!("  -v, --vocab <N>          Vocabulary size (default: 6000)");
                println!("  -d, --dim <N>            Embedding dimensionality (default: 300)");
                println!("  -b, --batch-size <N>     Triples per optimizer step (default: 10000)");
                println!("  -e, --epochs <N>         Passes over the stream (default: 1)");
                println!("      --optimizer <KIND>   sgd or adam (default: sgd)");
                println!("      --triples <N>        Random triples per pass (default: (0.2*V)^2)");
                println!("      --seed <N>           Random seed (default: 42)");
                println!("      --cpu                Force CPU even when CUDA is available");
                println!("  -h, --help               Show this help");
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                std::process::exit(1);
            }
        }
        i += 1;
    }

    result
}

fn required_value<'a>(args: &'a [String], i: usize) -> &'a str {
    match args.get(i) {
        Some(value) => value,
        None => {
            eprintln!("Missing value for {}", args[i - 1]);
            std::process::exit(1);
        }
    }
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize) -> T {
    match required_value(args, i).parse() {
        Ok(value) => value,
        Err(_) => {
            eprintln!("Invalid value for {}: {}", args[i - 1], args[i]);
            std::process::exit(1);
        }
    }
}

fn build_config(args: &Args) -> Result<GloveConfig, glove_embeddings::GloveError> {
    let mut config = match &args.config {
        Some(path) => GloveConfig::from_file(path)?,
        None => GloveConfig::default(),
    };

    if let Some(vocab) = args.vocab {
        config.vocabulary_size = vocab;
    }
    if let Some(dim) = args.dim {
        config.vector_size = dim;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(epochs) = args.epochs {
        config.epochs = epochs;
    }
    if let Some(kind) = args.optimizer {
        config.optimizer.kind = kind;
    }

    if args.cpu {
        config.device.kind = DeviceKind::Cpu;
    } else if candle_core::utils::cuda_is_available() {
        config.device.kind = DeviceKind::Cuda;
    }

    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn run() -> Result<(), glove_embeddings::GloveError> {
    let args = parse_args();
    let config = build_config(&args)?;

    // The prototype drove training with a random 4% sample of the V x V
    // co-occurrence space.
    let triples_per_pass = args.triples.unwrap_or_else(|| {
        let side = (0.2 * config.vocabulary_size as f64) as usize;
        side * side
    });

    println!("=== GloVe Co-occurrence Training ===");
    println!("Vocabulary:  {}", config.vocabulary_size);
    println!("Dimensions:  {}", config.vector_size);
    println!("Batch size:  {}", config.batch_size);
    println!("Epochs:      {}", config.epochs);
    println!("Optimizer:   {:?}", config.optimizer.kind);
    println!("Device:      {:?}", config.device.kind);
    println!("Triples:     {}", triples_per_pass);
    println!("Seed:        {}", args.seed);
    println!();

    let source = RandomTripleSource::new(config.vocabulary_size, triples_per_pass, args.seed);
    let mut trainer = GloveTrainer::new(config)?;

    let started = Instant::now();
    let history = trainer.train(&source)?;
    println!(
        "success: {} steps over {} triples in {:?}",
        history.total_steps,
        history.triples_seen,
        started.elapsed()
    );

    Ok(())
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    if let Err(e) = run() {
        eprintln!("Training failed: {}", e);
        std::process::exit(1);
    }
}
