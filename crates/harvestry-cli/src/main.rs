//! harvestry — registry metadata harvester.
//! Entry point for the harvest binary.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use harvestry_common::contracts::{FsDocumentLoader, HarvestMode};
use harvestry_common::Config;
use harvestry_db::{Database, MonitorStore, OrgStore, StudyStore};
use harvestry_harvest::pipeline::{run_harvest, HarvestJob};
use harvestry_harvest::sources::Source;

#[derive(Parser, Debug)]
#[command(name = "harvestry", about = "Harvest registry metadata into the staging database")]
struct Options {
    /// Comma separated list of integer source ids (e.g. 100120,101900).
    #[arg(short = 's', long = "source-ids", value_delimiter = ',', required = true)]
    source_ids: Vec<i32>,

    /// Harvest mode: all files, or only files downloaded since last import.
    #[arg(short = 't', long = "harvest-mode", value_enum, default_value = "full")]
    harvest_mode: Mode,

    /// Drop and recreate the sd staging tables before harvesting.
    #[arg(long = "rebuild-sd")]
    rebuild_sd: bool,

    /// Path to harvestry.toml (defaults to HARVESTRY_CONFIG or ./harvestry.toml).
    #[arg(long = "config")]
    config: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Full,
    Incremental,
}

impl From<Mode> for HarvestMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Full        => HarvestMode::Full,
            Mode::Incremental => HarvestMode::Incremental,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("harvestry=info")),
        )
        .init();

    let opts = Options::parse();
    let config = Config::load(opts.config.as_deref()).context("loading configuration")?;

    // validate the requested sources before doing any work
    let mut sources = Vec::new();
    for source_id in &opts.source_ids {
        let source = Source::from_id(*source_id)
            .with_context(|| format!("{source_id} does not correspond to a known source"))?;
        sources.push(source);
    }

    let db = Database::connect(&config.database.url, config.database.max_connections)?;
    db.initialize().await?;
    if opts.rebuild_sd {
        db.recreate_sd_tables().await?;
    }

    let provider = MonitorStore::new(db.clone());
    let sink = StudyStore::new(db.clone());
    let resolver = OrgStore::new(db.clone());
    let mode: HarvestMode = opts.harvest_mode.into();

    let mut failed = false;
    for source in sources {
        let mut job = HarvestJob::new(source, mode);
        job.chunk_size = config.harvest.chunk_size;
        job.progress_every = config.harvest.progress_every;

        match run_harvest(&job, &provider, &FsDocumentLoader, &sink, &provider, &resolver).await {
            Ok(summary) => {
                info!(
                    source = source.as_str(),
                    checked = summary.num_checked,
                    harvested = summary.num_harvested,
                    missing = summary.num_missing_files,
                    unusable = summary.num_unusable,
                    failed = summary.num_failed,
                    "source harvest finished"
                );
            }
            Err(e) => {
                // systemic failure (storage/ledger): report, try the next
                // source, exit non-zero at the end
                error!(source = source.as_str(), error = %e, "source harvest aborted");
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
