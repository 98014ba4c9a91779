//! `pad publish`: sanitize a dataset.
//!
//! # Output
//!
//! Without `--output`, stdout receives one JSON document:
//!
//! ```json
//! { "report": { "records": 8, "effective_k": 5, ... }, "dataset": { "records": [...] } }
//! ```
//!
//! With `--output`, the sanitized dataset goes to that file and stdout
//! receives only the report.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::info;

use pad_core::pipeline::PublicationReport;
use pad_core::{Dataset, Publisher};

use super::io::{read_dataset, write_json, ConfigArgs};

/// Arguments for `pad publish`
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Dataset JSON file, `-` for stdin
    #[arg(short, long)]
    pub input: PathBuf,

    /// Write the sanitized dataset here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Serialize)]
struct PublishOutput<'a> {
    report: &'a PublicationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    dataset: Option<&'a Dataset>,
}

/// Execute the publish command.
pub fn publish_command(args: PublishArgs) -> Result<()> {
    let config = args.config.load()?;
    let dataset = read_dataset(&args.input)?;
    info!(
        input = %args.input.display(),
        records = dataset.len(),
        k = config.anonymity.k,
        "publishing dataset"
    );

    let publication = Publisher::new(config)?
        .run(&dataset)
        .with_context(|| format!("failed to publish {}", args.input.display()))?;
    let report = publication.report();

    match &args.output {
        Some(path) => {
            write_json(&publication.dataset, Some(path))?;
            write_json(
                &PublishOutput {
                    report: &report,
                    dataset: None,
                },
                None,
            )?;
        }
        None => write_json(
            &PublishOutput {
                report: &report,
                dataset: Some(&publication.dataset),
            },
            None,
        )?,
    }

    info!(
        metric = %report.metric,
        loss = report.loss.aggregate,
        effective_k = report.effective_k,
        "published"
    );
    Ok(())
}
