//! Boundary contracts consumed by the harvest core.
//!
//! The core never talks to the filesystem catalogue, the staging database or
//! the organisation lookup directly; it goes through these traits. Real
//! implementations live in `harvestry-db` (Postgres) and in the pipeline
//! (filesystem loader). The traits are annotated for `mockall` so tests can
//! generate deterministic fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(any(test, feature = "test-mocks"))]
use mockall::automock;

use crate::model::{
    AvailableIpd, DataObject, ObjectDataset, ObjectDate, ObjectInstance, ObjectTitle, Study,
    StudyContributor, StudyFeature, StudyIdentifier, StudyLink, StudyReference,
    StudyRelationship, StudyTitle, StudyTopic,
};

/// Which file catalogue a harvest reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Study,
    Object,
}

/// Full harvests visit every downloaded file; incremental harvests only
/// files downloaded since their last import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestMode {
    Full,
    Incremental,
}

impl HarvestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HarvestMode::Full        => "full",
            HarvestMode::Incremental => "incremental",
        }
    }
}

/// One locally staged source file, as catalogued by the download stage.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub id: i32,
    pub sd_sid: String,
    pub local_path: String,
    pub last_downloaded: Option<DateTime<Utc>>,
}

/// A harvest run, recorded when the batch completes.
#[derive(Debug, Clone)]
pub struct HarvestEvent {
    pub id: i32,
    pub source_id: i32,
    pub harvest_mode: HarvestMode,
    pub time_started: DateTime<Utc>,
    pub time_ended: Option<DateTime<Utc>>,
    pub num_records_available: Option<i64>,
    pub num_records_harvested: Option<i64>,
}

/// Catalogue of locally staged files per source.
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait FileRecordProvider: Send + Sync {
    /// Number of candidate files for this source and harvest mode.
    async fn count(&self, source_id: i32, kind: RecordKind, mode: HarvestMode)
        -> anyhow::Result<i64>;

    /// One fixed-size page of candidate files, ordered stably.
    async fn page(
        &self,
        source_id: i32,
        kind: RecordKind,
        offset: i64,
        limit: i64,
        mode: HarvestMode,
    ) -> anyhow::Result<Vec<FileRecord>>;
}

/// Raw document access. Parsing into a source-specific shape happens in the
/// per-source modules; the loader only reads bytes.
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
pub trait DocumentLoader: Send + Sync {
    fn exists(&self, local_path: &str) -> bool;
    fn load(&self, local_path: &str) -> anyhow::Result<String>;
}

/// Loader over the local filesystem (the production case).
pub struct FsDocumentLoader;

impl DocumentLoader for FsDocumentLoader {
    fn exists(&self, local_path: &str) -> bool {
        std::path::Path::new(local_path).exists()
    }

    fn load(&self, local_path: &str) -> anyhow::Result<String> {
        Ok(std::fs::read_to_string(local_path)?)
    }
}

/// Bulk persistence of normalized records, one operation per entity
/// collection. Every method must tolerate an empty batch (no-op, 0 rows).
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait StorageSink: Send + Sync {
    async fn store_study(&self, study: &Study) -> anyhow::Result<()>;
    async fn store_identifiers(&self, rows: &[StudyIdentifier]) -> anyhow::Result<u64>;
    async fn store_titles(&self, rows: &[StudyTitle]) -> anyhow::Result<u64>;
    async fn store_references(&self, rows: &[StudyReference]) -> anyhow::Result<u64>;
    async fn store_contributors(&self, rows: &[StudyContributor]) -> anyhow::Result<u64>;
    async fn store_topics(&self, rows: &[StudyTopic]) -> anyhow::Result<u64>;
    async fn store_features(&self, rows: &[StudyFeature]) -> anyhow::Result<u64>;
    async fn store_relationships(&self, rows: &[StudyRelationship]) -> anyhow::Result<u64>;
    async fn store_links(&self, rows: &[StudyLink]) -> anyhow::Result<u64>;
    async fn store_ipd_info(&self, rows: &[AvailableIpd]) -> anyhow::Result<u64>;
    async fn store_data_objects(&self, rows: &[DataObject]) -> anyhow::Result<u64>;
    async fn store_object_titles(&self, rows: &[ObjectTitle]) -> anyhow::Result<u64>;
    async fn store_object_dates(&self, rows: &[ObjectDate]) -> anyhow::Result<u64>;
    async fn store_object_instances(&self, rows: &[ObjectInstance]) -> anyhow::Result<u64>;
    async fn store_object_datasets(&self, rows: &[ObjectDataset]) -> anyhow::Result<u64>;
}

/// Append-only harvest bookkeeping.
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait HarvestLedger: Send + Sync {
    async fn next_harvest_event_id(&self) -> anyhow::Result<i32>;
    async fn record_harvest(&self, file_record_id: i32, harvest_event_id: i32)
        -> anyhow::Result<()>;
    async fn store_harvest_event(&self, event: &HarvestEvent) -> anyhow::Result<()>;
}

/// Best-effort mapping of free-text organisation names onto canonical names.
/// Always returns a usable string, cleaned input when no match exists.
#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait OrganisationResolver: Send + Sync {
    async fn resolve(&self, candidate_name: &str, sd_sid: &str) -> String;
}
