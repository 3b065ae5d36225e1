//! Command line arguments.

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use dex_models::{BackendType, CheckpointFormat};
use dex_training::DexConfig;

/// Pokédex CNN: learns to tell five Pokémon apart and classifies images.
#[derive(Debug, Parser)]
#[command(name = "dex")]
#[command(about = "Convolutional classifier for five Pokemon species", long_about = None)]
#[command(version)]
#[command(group(ArgGroup::new("mode").args(["train", "train2", "clf"])))]
pub struct Cli {
    /// Train the network from scratch
    #[arg(short = 't', long)]
    pub train: bool,

    /// Continue training from the last saved checkpoint
    #[arg(long = "train2", visible_alias = "t2")]
    pub train2: bool,

    /// Classify the image at this path with the saved checkpoint
    ///
    /// Kept as a raw `OsString`: `PathBuf` parsing rejects `--clf ""`,
    /// which should fall through to the no-mode notice instead.
    #[arg(short = 'c', long = "clf", value_name = "IMAGE")]
    pub clf: Option<OsString>,

    /// JSON run configuration; flags below override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Dataset root (one sub-directory per species)
    #[arg(long, value_name = "DIR")]
    pub dataset: Option<PathBuf>,

    /// Checkpoint stem, e.g. Serial/dex-model
    #[arg(long, value_name = "STEM")]
    pub checkpoint: Option<PathBuf>,

    /// Number of training epochs
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Images per training step
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Adam learning rate
    #[arg(long)]
    pub learning_rate: Option<f32>,

    /// Seed for shuffling, splitting and weight init
    #[arg(long)]
    pub seed: Option<u64>,

    /// Load at most this many images
    #[arg(long)]
    pub max_images: Option<usize>,

    /// Compute backend (ndarray or wgpu)
    #[arg(long)]
    pub backend: Option<BackendType>,

    /// Checkpoint format when saving (bin or json)
    #[arg(long)]
    pub format: Option<CheckpointFormat>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,
}

/// What the invocation asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Fresh weights.
    Train,
    /// Resume from the checkpoint.
    Continue,
    /// Classify one image.
    Classify(PathBuf),
}

impl Cli {
    /// The selected mode, if any.
    pub fn mode(&self) -> Option<Mode> {
        if self.train {
            Some(Mode::Train)
        } else if self.train2 {
            Some(Mode::Continue)
        } else {
            self.clf
                .as_ref()
                .filter(|p| !p.is_empty())
                .map(|p| Mode::Classify(PathBuf::from(p)))
        }
    }

    /// Reads `--config` (or the defaults) and applies the override flags.
    pub fn load_config(&self) -> Result<DexConfig> {
        let config = match &self.config {
            Some(path) => DexConfig::from_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => DexConfig::default(),
        };
        Ok(self.apply_overrides(config))
    }

    /// Applies every flag that was given on top of `config`.
    pub fn apply_overrides(&self, mut config: DexConfig) -> DexConfig {
        if let Some(root) = &self.dataset {
            config.loader.root.clone_from(root);
        }
        if let Some(stem) = &self.checkpoint {
            config.checkpoint.clone_from(stem);
        }
        if let Some(epochs) = self.epochs {
            config.training.epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            config.training.batch_size = batch_size;
        }
        if let Some(lr) = self.learning_rate {
            config.training.optimizer.learning_rate = lr;
        }
        if let Some(seed) = self.seed {
            config.training.seed = seed;
            config.loader.seed = Some(seed);
        }
        if let Some(max_images) = self.max_images {
            config.loader.max_images = Some(max_images);
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("dex").chain(args.iter().copied()))
    }

    #[test]
    fn modes() {
        assert_eq!(parse(&["-t"]).unwrap().mode(), Some(Mode::Train));
        assert_eq!(parse(&["--train"]).unwrap().mode(), Some(Mode::Train));
        assert_eq!(parse(&["--train2"]).unwrap().mode(), Some(Mode::Continue));
        assert_eq!(parse(&["--t2"]).unwrap().mode(), Some(Mode::Continue));
        assert_eq!(
            parse(&["-c", "pika.png"]).unwrap().mode(),
            Some(Mode::Classify(PathBuf::from("pika.png")))
        );
        assert_eq!(parse(&[]).unwrap().mode(), None);
    }

    #[test]
    fn empty_clf_is_no_mode() {
        for args in [&["--clf", ""][..], &["-c", ""], &["--clf="]] {
            let cli = parse(args).unwrap();
            assert_eq!(cli.mode(), None, "{args:?}");
        }
    }

    #[test]
    fn modes_are_exclusive() {
        assert!(parse(&["-t", "--train2"]).is_err());
        assert!(parse(&["-t", "-c", "x.png"]).is_err());
    }

    #[test]
    fn overrides_apply() {
        let cli = parse(&[
            "-t",
            "--dataset",
            "pics",
            "--checkpoint",
            "out/model",
            "--epochs",
            "3",
            "--batch-size",
            "8",
            "--learning-rate",
            "0.01",
            "--seed",
            "7",
            "--max-images",
            "100",
            "--backend",
            "wgpu",
            "--format",
            "json",
        ])
        .unwrap();
        let config = cli.apply_overrides(DexConfig::default());

        assert_eq!(config.loader.root, Path::new("pics"));
        assert_eq!(config.checkpoint, Path::new("out/model"));
        assert_eq!(config.training.epochs, 3);
        assert_eq!(config.training.batch_size, 8);
        assert!((config.training.optimizer.learning_rate - 0.01).abs() < 1e-9);
        assert_eq!(config.training.seed, 7);
        assert_eq!(config.loader.seed, Some(7));
        assert_eq!(config.loader.max_images, Some(100));
        assert_eq!(config.backend, BackendType::Wgpu);
        assert_eq!(config.format, CheckpointFormat::Json);
    }

    #[test]
    fn no_flags_keep_defaults() {
        let config = parse(&["-t"]).unwrap().load_config().unwrap();
        assert_eq!(config, DexConfig::default());
    }

    #[test]
    fn bad_backend_rejected() {
        assert!(parse(&["-t", "--backend", "cuda"]).is_err());
    }

    #[test]
    fn config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dex.json");
        std::fs::write(&path, r#"{ "training": { "epochs": 9, "batch_size": 4 } }"#).unwrap();

        let cli = parse(&["-t", "--config", path.to_str().unwrap(), "--epochs", "2"]).unwrap();
        let config = cli.load_config().unwrap();
        assert_eq!(config.training.epochs, 2);
        assert_eq!(config.training.batch_size, 4);
    }

    #[test]
    fn missing_config_file_has_context() {
        let cli = parse(&["-t", "--config", "/no/such/dex.json"]).unwrap();
        let err = cli.load_config().unwrap_err();
        assert!(format!("{err:#}").contains("/no/such/dex.json"));
    }
}
