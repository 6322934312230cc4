//! Organisation-name canonicalisation over the ctx lookup table.

use async_trait::async_trait;
use tracing::debug;

use harvestry_common::contracts::OrganisationResolver;

use crate::database::Database;

/// `OrganisationResolver` implementation backed by `ctx.org_other_names`.
/// Best-effort: lookup failures and misses fall back to the cleaned input.
#[derive(Clone)]
pub struct OrgStore {
    db: Database,
}

impl OrgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn cleaned(candidate: &str) -> String {
    candidate.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl OrganisationResolver for OrgStore {
    async fn resolve(&self, candidate_name: &str, sd_sid: &str) -> String {
        let fallback = cleaned(candidate_name);
        let client = match self.db.pool().get().await {
            Ok(client) => client,
            Err(e) => {
                debug!(sd_sid, error = %e, "org lookup unavailable, using cleaned input");
                return fallback;
            }
        };
        let row = client
            .query_opt(
                "SELECT default_name FROM ctx.org_other_names \
                 WHERE LOWER(other_name) = LOWER($1) LIMIT 1",
                &[&fallback],
            )
            .await;
        match row {
            Ok(Some(row)) => row.get(0),
            Ok(None) => fallback,
            Err(e) => {
                debug!(sd_sid, error = %e, "org lookup failed, using cleaned input");
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleaned_collapses_whitespace() {
        assert_eq!(cleaned("  Acme   Pharma  "), "Acme Pharma");
    }
}
