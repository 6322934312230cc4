//! Per-source harvest loop.
//!
//! Orchestrates the flow for one source batch:
//!   1. Count candidate file records and walk them page by page
//!   2. Load each raw file, parse it, run the matching processor
//!   3. Resolve contributor organisation names
//!   4. Hand the aggregate to the storage sink, collection by collection
//!   5. Record the harvest event against the file in the ledger
//!
//! One bad file never aborts the batch: missing files are skipped and
//! parse/processing failures are logged with their sequence number. Storage
//! and ledger failures DO abort — silent partial writes would corrupt the
//! idempotency guarantees downstream relies on.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use harvestry_common::contracts::{
    DocumentLoader, FileRecordProvider, HarvestEvent, HarvestLedger, HarvestMode,
    OrganisationResolver, RecordKind, StorageSink,
};
use harvestry_common::model::Study;

use crate::sources::{self, Source};

/// Parameters for one source harvest run.
#[derive(Debug, Clone)]
pub struct HarvestJob {
    pub source: Source,
    pub mode: HarvestMode,
    /// Files fetched from the catalogue per page.
    pub chunk_size: i64,
    /// Progress log cadence, in records.
    pub progress_every: u64,
}

impl HarvestJob {
    pub fn new(source: Source, mode: HarvestMode) -> Self {
        Self {
            source,
            mode,
            chunk_size: 100,
            progress_every: 100,
        }
    }
}

/// Outcome of one source harvest run.
#[derive(Debug, Clone, Serialize)]
pub struct HarvestSummary {
    pub run_id: Uuid,
    pub source_id: i32,
    pub harvest_event_id: i32,
    pub num_available: i64,
    pub num_checked: u64,
    pub num_harvested: u64,
    pub num_missing_files: u64,
    pub num_unusable: u64,
    pub num_failed: u64,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// The default organisation resolver: local cleanup only, no lookup table.
pub struct BasicOrgResolver;

#[async_trait::async_trait]
impl OrganisationResolver for BasicOrgResolver {
    async fn resolve(&self, candidate_name: &str, sd_sid: &str) -> String {
        crate::helpers::orgs::tidy_org_name(candidate_name, sd_sid)
    }
}

/// Run the harvest loop for one source.
#[instrument(skip(provider, loader, sink, ledger, resolver), fields(source = job.source.as_str()))]
pub async fn run_harvest(
    job: &HarvestJob,
    provider: &dyn FileRecordProvider,
    loader: &dyn DocumentLoader,
    sink: &dyn StorageSink,
    ledger: &dyn HarvestLedger,
    resolver: &dyn OrganisationResolver,
) -> anyhow::Result<HarvestSummary> {
    let run_id = Uuid::new_v4();
    let t0 = Instant::now();
    let source_id = job.source.id();

    let harvest_event_id = ledger.next_harvest_event_id().await?;
    let time_started = chrono::Utc::now();
    let total = provider.count(source_id, RecordKind::Study, job.mode).await?;
    info!(run_id = %run_id, harvest_event_id, total, "Starting harvest");

    let mut summary = HarvestSummary {
        run_id,
        source_id,
        harvest_event_id,
        num_available: total,
        num_checked: 0,
        num_harvested: 0,
        num_missing_files: 0,
        num_unusable: 0,
        num_failed: 0,
        errors: Vec::new(),
        duration_ms: 0,
    };

    let mut offset: i64 = 0;
    while offset < total {
        let page = provider
            .page(source_id, RecordKind::Study, offset, job.chunk_size, job.mode)
            .await?;
        if page.is_empty() {
            break;
        }
        offset += page.len() as i64;

        for record in &page {
            summary.num_checked += 1;
            let n = summary.num_checked;

            if !loader.exists(&record.local_path) {
                debug!(n, path = %record.local_path, "File missing on disk, skipping");
                summary.num_missing_files += 1;
                continue;
            }

            let raw = match loader.load(&record.local_path) {
                Ok(raw) => raw,
                Err(e) => {
                    let msg = format!("record {n} ({}): load failed: {e}", record.sd_sid);
                    warn!("{}", &msg);
                    summary.errors.push(msg);
                    summary.num_failed += 1;
                    continue;
                }
            };

            let document = match sources::parse_document(job.source, &raw) {
                Ok(document) => document,
                Err(e) => {
                    let msg = format!("record {n} ({}): parse failed: {e}", record.sd_sid);
                    warn!("{}", &msg);
                    summary.errors.push(msg);
                    summary.num_failed += 1;
                    continue;
                }
            };

            let Some(mut study) =
                sources::process_document(&document, record.last_downloaded)
            else {
                // unusable document, a data quality issue rather than a failure
                warn!(n, sd_sid = %record.sd_sid, "Document lacks mandatory sections, skipped");
                summary.num_unusable += 1;
                continue;
            };

            resolve_contributor_orgs(&mut study, resolver).await;

            // storage and ledger errors are systemic: propagate
            store_study_aggregate(sink, &study).await?;
            ledger.record_harvest(record.id, harvest_event_id).await?;
            summary.num_harvested += 1;

            if summary.num_checked % job.progress_every == 0 {
                info!(records_harvested = summary.num_checked, "progress");
            }
        }
    }

    ledger
        .store_harvest_event(&HarvestEvent {
            id: harvest_event_id,
            source_id,
            harvest_mode: job.mode,
            time_started,
            time_ended: Some(chrono::Utc::now()),
            num_records_available: Some(total),
            num_records_harvested: Some(summary.num_harvested as i64),
        })
        .await?;

    summary.duration_ms = t0.elapsed().as_millis() as u64;
    info!(
        run_id = %run_id,
        checked   = summary.num_checked,
        harvested = summary.num_harvested,
        missing   = summary.num_missing_files,
        unusable  = summary.num_unusable,
        failed    = summary.num_failed,
        duration_ms = summary.duration_ms,
        "Harvest complete"
    );

    Ok(summary)
}

/// Replace contributor organisation names with their resolved canonical
/// forms. Best-effort; person entries are untouched.
async fn resolve_contributor_orgs(study: &mut Study, resolver: &dyn OrganisationResolver) {
    for contributor in study.contributors.iter_mut() {
        if contributor.is_individual {
            continue;
        }
        if let Some(name) = contributor.organisation_name.clone() {
            let resolved = resolver.resolve(&name, &study.sd_sid).await;
            if !resolved.is_empty() {
                contributor.organisation_name = Some(resolved);
            }
        }
    }
}

/// Flatten the aggregate into per-collection batches for the sink. Empty
/// collections are not sent.
pub async fn store_study_aggregate(sink: &dyn StorageSink, study: &Study) -> anyhow::Result<()> {
    sink.store_study(study).await?;

    if !study.identifiers.is_empty() {
        sink.store_identifiers(&study.identifiers).await?;
    }
    if !study.titles.is_empty() {
        sink.store_titles(&study.titles).await?;
    }
    if !study.references.is_empty() {
        sink.store_references(&study.references).await?;
    }
    if !study.contributors.is_empty() {
        sink.store_contributors(&study.contributors).await?;
    }
    if !study.topics.is_empty() {
        sink.store_topics(&study.topics).await?;
    }
    if !study.features.is_empty() {
        sink.store_features(&study.features).await?;
    }
    if !study.relationships.is_empty() {
        sink.store_relationships(&study.relationships).await?;
    }
    if !study.links.is_empty() {
        sink.store_links(&study.links).await?;
    }
    if !study.ipd_info.is_empty() {
        sink.store_ipd_info(&study.ipd_info).await?;
    }

    if study.data_objects.is_empty() {
        return Ok(());
    }
    sink.store_data_objects(&study.data_objects).await?;

    let object_titles: Vec<_> = study
        .data_objects
        .iter()
        .flat_map(|o| o.titles.iter().cloned())
        .collect();
    if !object_titles.is_empty() {
        sink.store_object_titles(&object_titles).await?;
    }

    let object_dates: Vec<_> = study
        .data_objects
        .iter()
        .flat_map(|o| o.dates.iter().cloned())
        .collect();
    if !object_dates.is_empty() {
        sink.store_object_dates(&object_dates).await?;
    }

    let object_instances: Vec<_> = study
        .data_objects
        .iter()
        .flat_map(|o| o.instances.iter().cloned())
        .collect();
    if !object_instances.is_empty() {
        sink.store_object_instances(&object_instances).await?;
    }

    let object_datasets: Vec<_> = study
        .data_objects
        .iter()
        .filter_map(|o| o.dataset.clone())
        .collect();
    if !object_datasets.is_empty() {
        sink.store_object_datasets(&object_datasets).await?;
    }

    Ok(())
}
