//! Postgres storage sink for normalized study aggregates.
//!
//! One batched insert per entity collection, each inside its own
//! transaction. Re-inserting an existing study or data object row is a
//! no-op (`ON CONFLICT DO NOTHING`) — object identities are content-derived,
//! so an unchanged re-harvest writes nothing new.

use async_trait::async_trait;

use harvestry_common::contracts::StorageSink;
use harvestry_common::model::{
    AvailableIpd, DataObject, ObjectDataset, ObjectDate, ObjectInstance, ObjectTitle, Study,
    StudyContributor, StudyFeature, StudyIdentifier, StudyLink, StudyReference,
    StudyRelationship, StudyTitle, StudyTopic,
};

use crate::database::Database;

/// `StorageSink` implementation over the sd staging tables.
#[derive(Clone)]
pub struct StudyStore {
    db: Database,
}

impl StudyStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StorageSink for StudyStore {
    async fn store_study(&self, s: &Study) -> anyhow::Result<()> {
        let client = self.db.pool().get().await?;
        client
            .execute(
                r#"
                INSERT INTO sd.studies
                    (sd_sid, display_title, title_lang_code,
                     brief_description, bd_contains_html,
                     data_sharing_statement, dss_contains_html,
                     study_type_id, study_type, study_status_id, study_status,
                     study_start_year, study_start_month, study_enrolment,
                     study_gender_elig_id, study_gender_elig,
                     min_age, min_age_units_id, min_age_units,
                     max_age, max_age_units_id, max_age_units,
                     datetime_of_data_fetch)
                VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,
                        $15,$16,$17,$18,$19,$20,$21,$22,$23)
                ON CONFLICT (sd_sid) DO NOTHING
                "#,
                &[
                    &s.sd_sid, &s.display_title, &s.title_lang_code,
                    &s.brief_description, &s.bd_contains_html,
                    &s.data_sharing_statement, &s.dss_contains_html,
                    &s.study_type_id, &s.study_type, &s.study_status_id, &s.study_status,
                    &s.study_start_year, &s.study_start_month, &s.study_enrolment,
                    &s.study_gender_elig_id, &s.study_gender_elig,
                    &s.min_age, &s.min_age_units_id, &s.min_age_units,
                    &s.max_age, &s.max_age_units_id, &s.max_age_units,
                    &s.datetime_of_data_fetch,
                ],
            )
            .await?;
        Ok(())
    }

    async fn store_identifiers(&self, rows: &[StudyIdentifier]) -> anyhow::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut client = self.db.pool().get().await?;
        let tx = client.transaction().await?;
        let stmt = tx
            .prepare(
                r#"
                INSERT INTO sd.study_identifiers
                    (sd_sid, identifier_value, identifier_type_id, identifier_type,
                     identifier_org_id, identifier_org, identifier_date, identifier_link)
                VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
                "#,
            )
            .await?;
        for r in rows {
            tx.execute(&stmt, &[
                &r.sd_sid, &r.identifier_value, &r.identifier_type_id, &r.identifier_type,
                &r.identifier_org_id, &r.identifier_org, &r.identifier_date, &r.identifier_link,
            ])
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    async fn store_titles(&self, rows: &[StudyTitle]) -> anyhow::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut client = self.db.pool().get().await?;
        let tx = client.transaction().await?;
        let stmt = tx
            .prepare(
                r#"
                INSERT INTO sd.study_titles
                    (sd_sid, title_text, title_type_id, title_type, is_default, comments)
                VALUES ($1,$2,$3,$4,$5,$6)
                "#,
            )
            .await?;
        for r in rows {
            tx.execute(&stmt, &[
                &r.sd_sid, &r.title_text, &r.title_type_id, &r.title_type,
                &r.is_default, &r.comments,
            ])
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    async fn store_references(&self, rows: &[StudyReference]) -> anyhow::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut client = self.db.pool().get().await?;
        let tx = client.transaction().await?;
        let stmt = tx
            .prepare(
                "INSERT INTO sd.study_references (sd_sid, pmid, citation, doi, comments)
                 VALUES ($1,$2,$3,$4,$5)",
            )
            .await?;
        for r in rows {
            tx.execute(&stmt, &[&r.sd_sid, &r.pmid, &r.citation, &r.doi, &r.comments])
                .await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    async fn store_contributors(&self, rows: &[StudyContributor]) -> anyhow::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut client = self.db.pool().get().await?;
        let tx = client.transaction().await?;
        let stmt = tx
            .prepare(
                r#"
                INSERT INTO sd.study_contributors
                    (sd_sid, contrib_type_id, contrib_type, is_individual,
                     organisation_id, organisation_name, person_full_name, person_affiliation)
                VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
                "#,
            )
            .await?;
        for r in rows {
            tx.execute(&stmt, &[
                &r.sd_sid, &r.contrib_type_id, &r.contrib_type, &r.is_individual,
                &r.organisation_id, &r.organisation_name,
                &r.person_full_name, &r.person_affiliation,
            ])
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    async fn store_topics(&self, rows: &[StudyTopic]) -> anyhow::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut client = self.db.pool().get().await?;
        let tx = client.transaction().await?;
        let stmt = tx
            .prepare(
                r#"
                INSERT INTO sd.study_topics
                    (sd_sid, topic_type_id, topic_type, topic_value,
                     ct_scheme_id, ct_scheme, ct_scheme_code, comments)
                VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
                "#,
            )
            .await?;
        for r in rows {
            tx.execute(&stmt, &[
                &r.sd_sid, &r.topic_type_id, &r.topic_type, &r.topic_value,
                &r.ct_scheme_id, &r.ct_scheme, &r.ct_scheme_code, &r.comments,
            ])
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    async fn store_features(&self, rows: &[StudyFeature]) -> anyhow::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut client = self.db.pool().get().await?;
        let tx = client.transaction().await?;
        let stmt = tx
            .prepare(
                r#"
                INSERT INTO sd.study_features
                    (sd_sid, feature_type_id, feature_type, feature_value_id, feature_value)
                VALUES ($1,$2,$3,$4,$5)
                "#,
            )
            .await?;
        for r in rows {
            tx.execute(&stmt, &[
                &r.sd_sid, &r.feature_type_id, &r.feature_type,
                &r.feature_value_id, &r.feature_value,
            ])
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    async fn store_relationships(&self, rows: &[StudyRelationship]) -> anyhow::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut client = self.db.pool().get().await?;
        let tx = client.transaction().await?;
        let stmt = tx
            .prepare(
                r#"
                INSERT INTO sd.study_relationships
                    (sd_sid, relationship_type_id, relationship_type, target_sd_sid)
                VALUES ($1,$2,$3,$4)
                "#,
            )
            .await?;
        for r in rows {
            tx.execute(&stmt, &[
                &r.sd_sid, &r.relationship_type_id, &r.relationship_type, &r.target_sd_sid,
            ])
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    async fn store_links(&self, rows: &[StudyLink]) -> anyhow::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut client = self.db.pool().get().await?;
        let tx = client.transaction().await?;
        let stmt = tx
            .prepare("INSERT INTO sd.study_links (sd_sid, link_label, link_url) VALUES ($1,$2,$3)")
            .await?;
        for r in rows {
            tx.execute(&stmt, &[&r.sd_sid, &r.link_label, &r.link_url]).await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    async fn store_ipd_info(&self, rows: &[AvailableIpd]) -> anyhow::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut client = self.db.pool().get().await?;
        let tx = client.transaction().await?;
        let stmt = tx
            .prepare(
                r#"
                INSERT INTO sd.study_ipd_available
                    (sd_sid, ipd_id, ipd_type, ipd_url, ipd_comment)
                VALUES ($1,$2,$3,$4,$5)
                "#,
            )
            .await?;
        for r in rows {
            tx.execute(&stmt, &[&r.sd_sid, &r.ipd_id, &r.ipd_type, &r.ipd_url, &r.ipd_comment])
                .await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    async fn store_data_objects(&self, rows: &[DataObject]) -> anyhow::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut client = self.db.pool().get().await?;
        let tx = client.transaction().await?;
        let stmt = tx
            .prepare(
                r#"
                INSERT INTO sd.data_objects
                    (sd_oid, sd_sid, display_title, publication_year,
                     object_class_id, object_class, object_type_id, object_type,
                     managing_org_id, managing_org, access_type_id, access_type,
                     access_details, access_details_url, url_last_checked,
                     datetime_of_data_fetch)
                VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)
                ON CONFLICT (sd_oid) DO NOTHING
                "#,
            )
            .await?;
        for r in rows {
            tx.execute(&stmt, &[
                &r.sd_oid, &r.sd_sid, &r.display_title, &r.publication_year,
                &r.object_class_id, &r.object_class, &r.object_type_id, &r.object_type,
                &r.managing_org_id, &r.managing_org, &r.access_type_id, &r.access_type,
                &r.access_details, &r.access_details_url, &r.url_last_checked,
                &r.datetime_of_data_fetch,
            ])
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    async fn store_object_titles(&self, rows: &[ObjectTitle]) -> anyhow::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut client = self.db.pool().get().await?;
        let tx = client.transaction().await?;
        let stmt = tx
            .prepare(
                r#"
                INSERT INTO sd.object_titles
                    (sd_oid, title_text, title_type_id, title_type, is_default)
                VALUES ($1,$2,$3,$4,$5)
                "#,
            )
            .await?;
        for r in rows {
            tx.execute(&stmt, &[
                &r.sd_oid, &r.title_text, &r.title_type_id, &r.title_type, &r.is_default,
            ])
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    async fn store_object_dates(&self, rows: &[ObjectDate]) -> anyhow::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut client = self.db.pool().get().await?;
        let tx = client.transaction().await?;
        let stmt = tx
            .prepare(
                r#"
                INSERT INTO sd.object_dates
                    (sd_oid, date_type_id, date_type,
                     start_year, start_month, start_day, date_as_string)
                VALUES ($1,$2,$3,$4,$5,$6,$7)
                "#,
            )
            .await?;
        for r in rows {
            tx.execute(&stmt, &[
                &r.sd_oid, &r.date_type_id, &r.date_type,
                &r.start_year, &r.start_month, &r.start_day, &r.date_as_string,
            ])
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    async fn store_object_instances(&self, rows: &[ObjectInstance]) -> anyhow::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut client = self.db.pool().get().await?;
        let tx = client.transaction().await?;
        let stmt = tx
            .prepare(
                r#"
                INSERT INTO sd.object_instances
                    (sd_oid, instance_type_id, instance_type,
                     repository_org_id, repository_org, url, url_accessible,
                     resource_type_id, resource_type, resource_size, resource_size_units)
                VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
                "#,
            )
            .await?;
        for r in rows {
            tx.execute(&stmt, &[
                &r.sd_oid, &r.instance_type_id, &r.instance_type,
                &r.repository_org_id, &r.repository_org, &r.url, &r.url_accessible,
                &r.resource_type_id, &r.resource_type, &r.resource_size,
                &r.resource_size_units,
            ])
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }

    async fn store_object_datasets(&self, rows: &[ObjectDataset]) -> anyhow::Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut client = self.db.pool().get().await?;
        let tx = client.transaction().await?;
        let stmt = tx
            .prepare(
                r#"
                INSERT INTO sd.dataset_properties
                    (sd_oid, record_keys_type_id, record_keys_type, record_keys_details,
                     deident_type_id, deident_type, deident_details,
                     consent_type_id, consent_type, consent_details)
                VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
                ON CONFLICT (sd_oid) DO NOTHING
                "#,
            )
            .await?;
        for r in rows {
            tx.execute(&stmt, &[
                &r.sd_oid, &r.record_keys_type_id, &r.record_keys_type, &r.record_keys_details,
                &r.deident_type_id, &r.deident_type, &r.deident_details,
                &r.consent_type_id, &r.consent_type, &r.consent_details,
            ])
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len() as u64)
    }
}
