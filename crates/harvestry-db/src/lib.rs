//! harvestry-db — Postgres implementations of the harvest boundary
//! contracts.
//!
//! Provides:
//! - `Database`: pooled connection handle, schema bootstrap, staging-table
//!   rebuild
//! - `StudyStore`: the storage sink (bulk inserts per entity collection)
//! - `MonitorStore`: the file-record catalogue and harvest-event ledger
//! - `OrgStore`: organisation-name canonicalisation lookups

pub mod database;
pub mod error;
pub mod monitor;
pub mod orgs;
pub mod schema;
pub mod studies;

pub use database::Database;
pub use error::{DbError, Result};
pub use monitor::MonitorStore;
pub use orgs::OrgStore;
pub use studies::StudyStore;
