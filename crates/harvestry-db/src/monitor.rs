//! Source-file catalogue queries and the harvest-event ledger.
//!
//! Incremental harvests select files downloaded since their last import —
//! not since the last harvest, as several harvests may run between imports.

use async_trait::async_trait;
use tracing::debug;

use harvestry_common::contracts::{
    FileRecord, FileRecordProvider, HarvestEvent, HarvestLedger, HarvestMode, RecordKind,
};

use crate::database::Database;

/// `FileRecordProvider` + `HarvestLedger` implementation over the sf schema.
#[derive(Clone)]
pub struct MonitorStore {
    db: Database,
}

impl MonitorStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn table_for(kind: RecordKind) -> &'static str {
        match kind {
            RecordKind::Study  => "sf.source_data_studies",
            RecordKind::Object => "sf.source_data_objects",
        }
    }

    fn where_clause(mode: HarvestMode) -> &'static str {
        match mode {
            HarvestMode::Full => "source_id = $1 AND local_path IS NOT NULL",
            HarvestMode::Incremental => {
                "source_id = $1 AND local_path IS NOT NULL \
                 AND (last_downloaded >= last_imported OR last_imported IS NULL)"
            }
        }
    }
}

#[async_trait]
impl FileRecordProvider for MonitorStore {
    async fn count(
        &self,
        source_id: i32,
        kind: RecordKind,
        mode: HarvestMode,
    ) -> anyhow::Result<i64> {
        let client = self.db.pool().get().await?;
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            Self::table_for(kind),
            Self::where_clause(mode)
        );
        let row = client.query_one(&sql, &[&source_id]).await?;
        Ok(row.get(0))
    }

    async fn page(
        &self,
        source_id: i32,
        kind: RecordKind,
        offset: i64,
        limit: i64,
        mode: HarvestMode,
    ) -> anyhow::Result<Vec<FileRecord>> {
        let client = self.db.pool().get().await?;
        let sql = format!(
            "SELECT id, sd_sid, local_path, last_downloaded FROM {} \
             WHERE {} ORDER BY local_path OFFSET $2 LIMIT $3",
            Self::table_for(kind),
            Self::where_clause(mode)
        );
        let rows = client.query(&sql, &[&source_id, &offset, &limit]).await?;
        debug!(source_id, offset, n = rows.len(), "file record page fetched");
        Ok(rows
            .iter()
            .map(|row| FileRecord {
                id: row.get(0),
                sd_sid: row.get(1),
                local_path: row.get(2),
                last_downloaded: row.get(3),
            })
            .collect())
    }
}

#[async_trait]
impl HarvestLedger for MonitorStore {
    async fn next_harvest_event_id(&self) -> anyhow::Result<i32> {
        let client = self.db.pool().get().await?;
        let row = client
            .query_one("SELECT COALESCE(MAX(id), 100) FROM sf.harvest_events", &[])
            .await?;
        let last: i32 = row.get(0);
        Ok(last + 1)
    }

    async fn record_harvest(
        &self,
        file_record_id: i32,
        harvest_event_id: i32,
    ) -> anyhow::Result<()> {
        let client = self.db.pool().get().await?;
        client
            .execute(
                "UPDATE sf.source_data_studies \
                 SET last_harvest_id = $1, last_harvested = CURRENT_TIMESTAMP \
                 WHERE id = $2",
                &[&harvest_event_id, &file_record_id],
            )
            .await?;
        Ok(())
    }

    async fn store_harvest_event(&self, event: &HarvestEvent) -> anyhow::Result<()> {
        let client = self.db.pool().get().await?;
        client
            .execute(
                r#"
                INSERT INTO sf.harvest_events
                    (id, source_id, harvest_mode, time_started, time_ended,
                     num_records_available, num_records_harvested)
                VALUES ($1,$2,$3,$4,$5,$6,$7)
                "#,
                &[
                    &event.id,
                    &event.source_id,
                    &event.harvest_mode.as_str(),
                    &event.time_started,
                    &event.time_ended,
                    &event.num_records_available,
                    &event.num_records_harvested,
                ],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incremental_clause_selects_new_downloads() {
        let clause = MonitorStore::where_clause(HarvestMode::Incremental);
        assert!(clause.contains("last_downloaded >= last_imported"));
        assert!(clause.contains("last_imported IS NULL"));
    }

    #[test]
    fn test_full_clause_only_requires_local_path() {
        let clause = MonitorStore::where_clause(HarvestMode::Full);
        assert!(!clause.contains("last_imported"));
        assert!(clause.contains("local_path IS NOT NULL"));
    }
}
