//! End-to-end pipeline tests over in-memory collaborators and on-disk
//! document fixtures.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use harvestry_common::contracts::{
    FileRecord, FileRecordProvider, FsDocumentLoader, HarvestEvent, HarvestLedger, HarvestMode,
    RecordKind, StorageSink,
};
use harvestry_common::model::*;
use harvestry_harvest::helpers::hash;
use harvestry_harvest::pipeline::{run_harvest, BasicOrgResolver, HarvestJob};
use harvestry_harvest::sources::Source;

// ── In-memory collaborators ───────────────────────────────────────────────

struct VecFileProvider {
    records: Vec<FileRecord>,
}

#[async_trait]
impl FileRecordProvider for VecFileProvider {
    async fn count(
        &self,
        _source_id: i32,
        _kind: RecordKind,
        _mode: HarvestMode,
    ) -> anyhow::Result<i64> {
        Ok(self.records.len() as i64)
    }

    async fn page(
        &self,
        _source_id: i32,
        _kind: RecordKind,
        offset: i64,
        limit: i64,
        _mode: HarvestMode,
    ) -> anyhow::Result<Vec<FileRecord>> {
        Ok(self
            .records
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct RecordingSink {
    studies: Mutex<Vec<Study>>,
    object_titles: Mutex<Vec<ObjectTitle>>,
    object_dates: Mutex<Vec<ObjectDate>>,
    object_instances: Mutex<Vec<ObjectInstance>>,
    object_datasets: Mutex<Vec<ObjectDataset>>,
}

#[async_trait]
impl StorageSink for RecordingSink {
    async fn store_study(&self, study: &Study) -> anyhow::Result<()> {
        self.studies.lock().unwrap().push(study.clone());
        Ok(())
    }
    async fn store_identifiers(&self, rows: &[StudyIdentifier]) -> anyhow::Result<u64> {
        Ok(rows.len() as u64)
    }
    async fn store_titles(&self, rows: &[StudyTitle]) -> anyhow::Result<u64> {
        Ok(rows.len() as u64)
    }
    async fn store_references(&self, rows: &[StudyReference]) -> anyhow::Result<u64> {
        Ok(rows.len() as u64)
    }
    async fn store_contributors(&self, rows: &[StudyContributor]) -> anyhow::Result<u64> {
        Ok(rows.len() as u64)
    }
    async fn store_topics(&self, rows: &[StudyTopic]) -> anyhow::Result<u64> {
        Ok(rows.len() as u64)
    }
    async fn store_features(&self, rows: &[StudyFeature]) -> anyhow::Result<u64> {
        Ok(rows.len() as u64)
    }
    async fn store_relationships(&self, rows: &[StudyRelationship]) -> anyhow::Result<u64> {
        Ok(rows.len() as u64)
    }
    async fn store_links(&self, rows: &[StudyLink]) -> anyhow::Result<u64> {
        Ok(rows.len() as u64)
    }
    async fn store_ipd_info(&self, rows: &[AvailableIpd]) -> anyhow::Result<u64> {
        Ok(rows.len() as u64)
    }
    async fn store_data_objects(&self, rows: &[DataObject]) -> anyhow::Result<u64> {
        Ok(rows.len() as u64)
    }
    async fn store_object_titles(&self, rows: &[ObjectTitle]) -> anyhow::Result<u64> {
        self.object_titles.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }
    async fn store_object_dates(&self, rows: &[ObjectDate]) -> anyhow::Result<u64> {
        self.object_dates.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }
    async fn store_object_instances(&self, rows: &[ObjectInstance]) -> anyhow::Result<u64> {
        self.object_instances.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }
    async fn store_object_datasets(&self, rows: &[ObjectDataset]) -> anyhow::Result<u64> {
        self.object_datasets.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len() as u64)
    }
}

#[derive(Default)]
struct RecordingLedger {
    harvested: Mutex<Vec<(i32, i32)>>,
    events: Mutex<Vec<HarvestEvent>>,
}

#[async_trait]
impl HarvestLedger for RecordingLedger {
    async fn next_harvest_event_id(&self) -> anyhow::Result<i32> {
        Ok(101)
    }
    async fn record_harvest(
        &self,
        file_record_id: i32,
        harvest_event_id: i32,
    ) -> anyhow::Result<()> {
        self.harvested.lock().unwrap().push((file_record_id, harvest_event_id));
        Ok(())
    }
    async fn store_harvest_event(&self, event: &HarvestEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

// ── Fixtures ──────────────────────────────────────────────────────────────

fn ctg_document(nct_id: &str, brief_title: &str) -> String {
    serde_json::json!({
        "protocolSection": {
            "identificationModule": { "nctId": nct_id, "briefTitle": brief_title },
            "statusModule": { "overallStatus": "Completed" }
        },
        "hasResults": false
    })
    .to_string()
}

fn file_record(id: i32, sd_sid: &str, path: &std::path::Path) -> FileRecord {
    FileRecord {
        id,
        sd_sid: sd_sid.to_string(),
        local_path: path.to_string_lossy().to_string(),
        last_downloaded: Some(Utc::now()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_minimal_ctg_document_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("NCT00000001.json");
    std::fs::write(&path, ctg_document("NCT00000001", "Example Study")).unwrap();

    let provider = VecFileProvider {
        records: vec![file_record(1, "NCT00000001", &path)],
    };
    let sink = RecordingSink::default();
    let ledger = RecordingLedger::default();

    let job = HarvestJob::new(Source::Ctg, HarvestMode::Full);
    let summary = run_harvest(&job, &provider, &FsDocumentLoader, &sink, &ledger, &BasicOrgResolver)
        .await
        .unwrap();

    assert_eq!(summary.num_checked, 1);
    assert_eq!(summary.num_harvested, 1);
    assert!(summary.errors.is_empty());

    let studies = sink.studies.lock().unwrap();
    assert_eq!(studies.len(), 1);
    let study = &studies[0];
    assert_eq!(study.sd_sid, "NCT00000001");

    let defaults: Vec<_> = study.titles.iter().filter(|t| t.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].title_text, "Example Study");

    assert_eq!(study.identifiers.len(), 1);
    assert_eq!(study.identifiers[0].identifier_type_id, 11);
    assert_eq!(study.identifiers[0].identifier_value, "NCT00000001");

    assert!(!study.data_objects.is_empty());
    assert_eq!(
        study.data_objects[0].sd_oid,
        hash::object_hash("NCT00000001", "Example Study :: CTG Registry entry")
    );

    // object children were flattened through to the sink
    let object_titles = sink.object_titles.lock().unwrap();
    assert_eq!(object_titles.len(), 1);
    assert_eq!(object_titles[0].sd_oid, study.data_objects[0].sd_oid);
}

#[tokio::test]
async fn test_batch_survives_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut records = Vec::new();
    for i in 1..=10 {
        let sd_sid = format!("NCT000000{i:02}");
        let path = dir.path().join(format!("{sd_sid}.json"));
        if i != 4 {
            std::fs::write(&path, ctg_document(&sd_sid, &format!("Study {i}"))).unwrap();
        }
        records.push(file_record(i, &sd_sid, &path));
    }

    let provider = VecFileProvider { records };
    let sink = RecordingSink::default();
    let ledger = RecordingLedger::default();

    let mut job = HarvestJob::new(Source::Ctg, HarvestMode::Full);
    job.chunk_size = 3; // force several pages
    let summary = run_harvest(&job, &provider, &FsDocumentLoader, &sink, &ledger, &BasicOrgResolver)
        .await
        .unwrap();

    assert_eq!(summary.num_checked, 10);
    assert_eq!(summary.num_harvested, 9);
    assert_eq!(summary.num_missing_files, 1);
    assert_eq!(summary.num_failed, 0);

    let harvested = ledger.harvested.lock().unwrap();
    assert_eq!(harvested.len(), 9);
    assert!(harvested.iter().all(|(_, event)| *event == 101));
    assert!(!harvested.iter().any(|(file_id, _)| *file_id == 4));

    let events = ledger.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].num_records_harvested, Some(9));
}

#[tokio::test]
async fn test_unparseable_file_logged_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.json");
    let bad = dir.path().join("bad.json");
    std::fs::write(&good, ctg_document("NCT00000021", "Good Study")).unwrap();
    std::fs::write(&bad, "this is not json {{{").unwrap();

    let provider = VecFileProvider {
        records: vec![
            file_record(1, "NCT00000021", &good),
            file_record(2, "NCT00000022", &bad),
        ],
    };
    let sink = RecordingSink::default();
    let ledger = RecordingLedger::default();

    let job = HarvestJob::new(Source::Ctg, HarvestMode::Full);
    let summary = run_harvest(&job, &provider, &FsDocumentLoader, &sink, &ledger, &BasicOrgResolver)
        .await
        .unwrap();

    assert_eq!(summary.num_harvested, 1);
    assert_eq!(summary.num_failed, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("NCT00000022"));
}

#[tokio::test]
async fn test_unusable_document_skipped_silently() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nostatus.json");
    // no status module, so the processor returns None
    std::fs::write(
        &path,
        serde_json::json!({
            "protocolSection": {
                "identificationModule": { "nctId": "NCT00000031" }
            }
        })
        .to_string(),
    )
    .unwrap();

    let provider = VecFileProvider {
        records: vec![file_record(1, "NCT00000031", &path)],
    };
    let sink = RecordingSink::default();
    let ledger = RecordingLedger::default();

    let job = HarvestJob::new(Source::Ctg, HarvestMode::Full);
    let summary = run_harvest(&job, &provider, &FsDocumentLoader, &sink, &ledger, &BasicOrgResolver)
        .await
        .unwrap();

    assert_eq!(summary.num_unusable, 1);
    assert_eq!(summary.num_harvested, 0);
    assert!(sink.studies.lock().unwrap().is_empty());
    assert!(ledger.harvested.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_reprocessing_yields_identical_object_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("NCT00000041.json");
    std::fs::write(&path, ctg_document("NCT00000041", "Idempotent Study")).unwrap();

    let provider = VecFileProvider {
        records: vec![file_record(1, "NCT00000041", &path)],
    };
    let job = HarvestJob::new(Source::Ctg, HarvestMode::Full);

    let mut oid_sets = Vec::new();
    for _ in 0..2 {
        let sink = RecordingSink::default();
        let ledger = RecordingLedger::default();
        run_harvest(&job, &provider, &FsDocumentLoader, &sink, &ledger, &BasicOrgResolver)
            .await
            .unwrap();
        let studies = sink.studies.lock().unwrap();
        let oids: Vec<String> = studies[0]
            .data_objects
            .iter()
            .map(|o| o.sd_oid.clone())
            .collect();
        oid_sets.push(oids);
    }
    assert_eq!(oid_sets[0], oid_sets[1]);
}
