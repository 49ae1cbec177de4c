use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::auth::Token;
use crate::circleci::{Builder, CircleClient};
use crate::config::Settings;
use crate::entries::load_entries;
use crate::output::print_report;
use crate::runner::{run_builds, RunOptions, SkipPolicy};

#[derive(Parser)]
#[command(name = "circle-builder")]
#[command(author, version, about = "Builds CircleCI projects one after another", long_about = None)]
pub struct Cli {
    /// JSON file listing the projects to build, in order
    #[arg(short, long, default_value = "Buildfile")]
    file: PathBuf,

    /// Per-job timeout in minutes
    #[arg(short, long, default_value_t = 20)]
    timeout: u64,

    /// Skip a project built successfully within this many days (-1 skips
    /// any project that ever built successfully)
    #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
    skip_days: i64,

    /// Build every project, ignoring previous successful builds
    #[arg(long, default_value_t = false)]
    no_skip: bool,

    /// Settings file (defaults to ./circle-builder.{toml,json,yaml,yml})
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CircleCI API token
    #[arg(long, env = "CIRCLECI_TOKEN", hide_env_values = true)]
    token: String,
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            job_timeout: Duration::from_secs(self.timeout.saturating_mul(60)),
            skip: (!self.no_skip).then(|| SkipPolicy::from_days(self.skip_days)),
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let settings = Settings::load(self.config.as_deref())?;
        let entries = load_entries(&self.file)?;
        if entries.is_empty() {
            info!("Nothing to build");
            return Ok(());
        }

        let client = CircleClient::new(&settings.api.base_url, Token::from(self.token.as_str()))
            .context("Failed to create CircleCI client")?;
        info!("Using CircleCI API at {}", client.base_url());

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after the current request");
                on_interrupt.cancel();
            }
        });

        let builder = Builder::new(client, settings).with_cancellation(cancel);

        info!("Building {} entries from {}", entries.len(), self.file.display());
        let mut reports = Vec::with_capacity(entries.len());
        let result = run_builds(&builder, &self.run_options(), &entries, &mut reports).await;

        print_report(&reports, entries.len(), result.as_ref().err());
        result
    }
}
