//! `pad describe` and `pad check-config`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use pad_core::resample::{is_feasible, required_records};

use super::io::{read_dataset, ConfigArgs};

/// Arguments for `pad describe`
#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Dataset JSON file; adds a line on its size and whether it needs resampling
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments for `pad check-config`
#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Print the effective configuration as TOML
    #[arg(long)]
    pub print: bool,
}

/// Print the description of the data a configuration publishes.
pub fn describe_command(args: DescribeArgs) -> Result<()> {
    let config = args.config.load()?;
    println!("{}", config.describe());

    if let Some(path) = &args.input {
        let dataset = read_dataset(path)?;
        let dimension = dataset.validate()?;
        let k = config.anonymity.k;
        let n = dataset.len();
        if is_feasible(n, k) {
            println!("Input: {} profiles of {} values.", n, dimension);
        } else {
            println!(
                "Input: {} profiles of {} values; fewer than the {} needed, \
                 profiles will be split into blocks before clustering.",
                n,
                dimension,
                required_records(k)
            );
        }
    }
    Ok(())
}

/// Validate a configuration without running anything.
pub fn check_config_command(args: CheckConfigArgs) -> Result<()> {
    let config = args.config.load()?;
    if args.print {
        print!("{}", config.to_toml_string()?);
    } else {
        let learners: Vec<String> = config
            .learner
            .candidates
            .iter()
            .map(ToString::to_string)
            .collect();
        println!(
            "ok: k={}, {} interest(s), learners [{}]",
            config.anonymity.k,
            config.interests.len(),
            learners.join(", ")
        );
    }
    Ok(())
}
