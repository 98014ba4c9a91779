//! File access shared by the commands.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use pad_core::{Dataset, PadConfig};

/// Options selecting the configuration of a run.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long, env = "PAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override `[anonymity] k`
    #[arg(short, long)]
    pub k: Option<usize>,

    /// Override `[sampling] seed`
    #[arg(long)]
    pub seed: Option<u64>,
}

impl ConfigArgs {
    /// Load, override and validate the configuration.
    ///
    /// Precedence: command line, then `PAD_*` environment variables, then
    /// the file, then defaults.
    pub fn load(&self) -> Result<PadConfig> {
        let config = match &self.config {
            Some(path) => PadConfig::from_file(path)?,
            None => PadConfig::default(),
        };
        let mut config = config.with_env_overrides();
        if let Some(k) = self.k {
            config.anonymity.k = k;
        }
        if let Some(seed) = self.seed {
            config.sampling.seed = Some(seed);
        }
        config.validate()?;
        debug!(config = ?self.config, k = config.anonymity.k, "configuration loaded");
        Ok(config)
    }
}

/// Read a dataset from a JSON file, or stdin for `-`.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let text = if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read dataset from stdin")?;
        buffer
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("failed to read dataset {}", path.display()))?
    };
    parse_dataset(&text).with_context(|| format!("invalid dataset {}", path.display()))
}

/// Parse the dataset JSON format.
pub fn parse_dataset(text: &str) -> Result<Dataset> {
    let dataset: Dataset = serde_json::from_str(text)?;
    Ok(dataset)
}

/// Write pretty JSON to `path`, or stdout when `None`.
pub fn write_json<T: serde::Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => fs::write(path, text + "\n")
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", text)?;
            Ok(())
        }
    }
}
