//! Staging-table DDL.
//!
//! Three schemas per source database:
//!   `sd`  — the session data written by each harvest (dropped and rebuilt
//!           before a full harvest)
//!   `sf`  — the source-file catalogue and harvest-event log
//!   `ctx` — context lookups (organisation name canonicalisation)

pub const CREATE_SCHEMAS: &str = r#"
    CREATE SCHEMA IF NOT EXISTS sd;
    CREATE SCHEMA IF NOT EXISTS sf;
    CREATE SCHEMA IF NOT EXISTS ctx;
"#;

pub const CREATE_SD_TABLES: &str = r#"
    CREATE TABLE IF NOT EXISTS sd.studies (
        sd_sid                 TEXT PRIMARY KEY,
        display_title          TEXT,
        title_lang_code        TEXT,
        brief_description      TEXT,
        bd_contains_html       BOOLEAN NOT NULL DEFAULT FALSE,
        data_sharing_statement TEXT,
        dss_contains_html      BOOLEAN NOT NULL DEFAULT FALSE,
        study_type_id          INT,
        study_type             TEXT,
        study_status_id        INT,
        study_status           TEXT,
        study_start_year       INT,
        study_start_month      INT,
        study_enrolment        INT,
        study_gender_elig_id   INT,
        study_gender_elig      TEXT,
        min_age                INT,
        min_age_units_id       INT,
        min_age_units          TEXT,
        max_age                INT,
        max_age_units_id       INT,
        max_age_units          TEXT,
        datetime_of_data_fetch TIMESTAMPTZ
    );

    CREATE TABLE IF NOT EXISTS sd.study_identifiers (
        id                 BIGSERIAL PRIMARY KEY,
        sd_sid             TEXT NOT NULL,
        identifier_value   TEXT NOT NULL,
        identifier_type_id INT NOT NULL,
        identifier_type    TEXT NOT NULL,
        identifier_org_id  INT,
        identifier_org     TEXT,
        identifier_date    TEXT,
        identifier_link    TEXT
    );

    CREATE TABLE IF NOT EXISTS sd.study_titles (
        id            BIGSERIAL PRIMARY KEY,
        sd_sid        TEXT NOT NULL,
        title_text    TEXT NOT NULL,
        title_type_id INT NOT NULL,
        title_type    TEXT NOT NULL,
        is_default    BOOLEAN NOT NULL DEFAULT FALSE,
        comments      TEXT
    );

    CREATE TABLE IF NOT EXISTS sd.study_references (
        id       BIGSERIAL PRIMARY KEY,
        sd_sid   TEXT NOT NULL,
        pmid     TEXT,
        citation TEXT,
        doi      TEXT,
        comments TEXT
    );

    CREATE TABLE IF NOT EXISTS sd.study_contributors (
        id                 BIGSERIAL PRIMARY KEY,
        sd_sid             TEXT NOT NULL,
        contrib_type_id    INT NOT NULL,
        contrib_type       TEXT NOT NULL,
        is_individual      BOOLEAN NOT NULL DEFAULT FALSE,
        organisation_id    INT,
        organisation_name  TEXT,
        person_full_name   TEXT,
        person_affiliation TEXT
    );

    CREATE TABLE IF NOT EXISTS sd.study_topics (
        id             BIGSERIAL PRIMARY KEY,
        sd_sid         TEXT NOT NULL,
        topic_type_id  INT NOT NULL,
        topic_type     TEXT NOT NULL,
        topic_value    TEXT NOT NULL,
        ct_scheme_id   INT,
        ct_scheme      TEXT,
        ct_scheme_code TEXT,
        comments       TEXT
    );

    CREATE TABLE IF NOT EXISTS sd.study_features (
        id               BIGSERIAL PRIMARY KEY,
        sd_sid           TEXT NOT NULL,
        feature_type_id  INT NOT NULL,
        feature_type     TEXT NOT NULL,
        feature_value_id INT NOT NULL,
        feature_value    TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS sd.study_relationships (
        id                   BIGSERIAL PRIMARY KEY,
        sd_sid               TEXT NOT NULL,
        relationship_type_id INT NOT NULL,
        relationship_type    TEXT NOT NULL,
        target_sd_sid        TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS sd.study_links (
        id         BIGSERIAL PRIMARY KEY,
        sd_sid     TEXT NOT NULL,
        link_label TEXT,
        link_url   TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS sd.study_ipd_available (
        id          BIGSERIAL PRIMARY KEY,
        sd_sid      TEXT NOT NULL,
        ipd_id      TEXT,
        ipd_type    TEXT,
        ipd_url     TEXT,
        ipd_comment TEXT
    );

    CREATE TABLE IF NOT EXISTS sd.data_objects (
        sd_oid                 TEXT PRIMARY KEY,
        sd_sid                 TEXT NOT NULL,
        display_title          TEXT NOT NULL,
        publication_year       INT,
        object_class_id        INT NOT NULL,
        object_class           TEXT NOT NULL,
        object_type_id         INT NOT NULL,
        object_type            TEXT NOT NULL,
        managing_org_id        INT,
        managing_org           TEXT,
        access_type_id         INT,
        access_type            TEXT,
        access_details         TEXT,
        access_details_url     TEXT,
        url_last_checked       DATE,
        datetime_of_data_fetch TIMESTAMPTZ
    );

    CREATE TABLE IF NOT EXISTS sd.dataset_properties (
        sd_oid               TEXT PRIMARY KEY,
        record_keys_type_id  INT NOT NULL,
        record_keys_type     TEXT NOT NULL,
        record_keys_details  TEXT,
        deident_type_id      INT NOT NULL,
        deident_type         TEXT NOT NULL,
        deident_details      TEXT,
        consent_type_id      INT NOT NULL,
        consent_type         TEXT NOT NULL,
        consent_details      TEXT
    );

    CREATE TABLE IF NOT EXISTS sd.object_titles (
        id            BIGSERIAL PRIMARY KEY,
        sd_oid        TEXT NOT NULL,
        title_text    TEXT NOT NULL,
        title_type_id INT NOT NULL,
        title_type    TEXT NOT NULL,
        is_default    BOOLEAN NOT NULL DEFAULT FALSE
    );

    CREATE TABLE IF NOT EXISTS sd.object_dates (
        id             BIGSERIAL PRIMARY KEY,
        sd_oid         TEXT NOT NULL,
        date_type_id   INT NOT NULL,
        date_type      TEXT NOT NULL,
        start_year     INT,
        start_month    INT,
        start_day      INT,
        date_as_string TEXT
    );

    CREATE TABLE IF NOT EXISTS sd.object_instances (
        id                  BIGSERIAL PRIMARY KEY,
        sd_oid              TEXT NOT NULL,
        instance_type_id    INT,
        instance_type       TEXT,
        repository_org_id   INT,
        repository_org      TEXT,
        url                 TEXT,
        url_accessible      BOOLEAN,
        resource_type_id    INT,
        resource_type       TEXT,
        resource_size       TEXT,
        resource_size_units TEXT
    );
"#;

pub const CREATE_SF_TABLES: &str = r#"
    CREATE TABLE IF NOT EXISTS sf.source_data_studies (
        id              SERIAL PRIMARY KEY,
        source_id       INT NOT NULL,
        sd_sid          TEXT NOT NULL,
        remote_url      TEXT,
        local_path      TEXT,
        last_revised    TIMESTAMPTZ,
        last_downloaded TIMESTAMPTZ,
        last_harvest_id INT,
        last_harvested  TIMESTAMPTZ,
        last_import_id  INT,
        last_imported   TIMESTAMPTZ
    );

    CREATE TABLE IF NOT EXISTS sf.source_data_objects (
        id              SERIAL PRIMARY KEY,
        source_id       INT NOT NULL,
        sd_sid          TEXT NOT NULL,
        remote_url      TEXT,
        local_path      TEXT,
        last_revised    TIMESTAMPTZ,
        last_downloaded TIMESTAMPTZ,
        last_harvest_id INT,
        last_harvested  TIMESTAMPTZ,
        last_import_id  INT,
        last_imported   TIMESTAMPTZ
    );

    CREATE TABLE IF NOT EXISTS sf.harvest_events (
        id                    INT PRIMARY KEY,
        source_id             INT NOT NULL,
        harvest_mode          TEXT NOT NULL,
        time_started          TIMESTAMPTZ NOT NULL,
        time_ended            TIMESTAMPTZ,
        num_records_available BIGINT,
        num_records_harvested BIGINT
    );
"#;

pub const CREATE_CTX_TABLES: &str = r#"
    CREATE TABLE IF NOT EXISTS ctx.org_other_names (
        id           SERIAL PRIMARY KEY,
        other_name   TEXT NOT NULL,
        org_id       INT,
        default_name TEXT NOT NULL
    );
"#;

/// The sd tables. No FK constraints exist in the staging schema, so drop
/// order does not matter.
pub const SD_TABLES: [&str; 15] = [
    "studies",
    "study_identifiers",
    "study_titles",
    "study_references",
    "study_contributors",
    "study_topics",
    "study_features",
    "study_relationships",
    "study_links",
    "study_ipd_available",
    "data_objects",
    "dataset_properties",
    "object_titles",
    "object_dates",
    "object_instances",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ddl_covers_every_sd_table() {
        for table in SD_TABLES {
            assert!(
                CREATE_SD_TABLES.contains(&format!("sd.{table}")),
                "missing DDL for sd.{table}"
            );
        }
    }

    #[test]
    fn test_monitor_tables_present() {
        assert!(CREATE_SF_TABLES.contains("sf.source_data_studies"));
        assert!(CREATE_SF_TABLES.contains("sf.harvest_events"));
    }
}
