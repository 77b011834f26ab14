use std::sync::Arc;

use chrono::{DateTime, Utc};
use common_money::Money;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::backend::{fetch_rows, Direction, TableQuery, TableReader};

pub const PROPOSAL_VERSIONS_TABLE: &str = "proposal_versions";

/// Price and timeline snapshot of a proposal. Versions are append-only and
/// `version_number` grows with every revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalVersion {
    pub id: Uuid,
    pub proposal_id: Uuid,
    pub version_number: i32,
    pub price: Money,
    pub timeline_days: i32,
    #[serde(default)]
    pub scope_text: Option<String>,
    #[serde(default)]
    pub terms: Option<String>,
    #[serde(default)]
    pub conditions: Option<String>,
    #[serde(default)]
    pub change_reason: Option<String>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Positive values mean an increase from the first version to the second.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionComparison {
    pub price_change: Money,
    pub price_change_percent: i64,
    pub timeline_change: i64,
}

pub fn compare_versions(v1: &ProposalVersion, v2: &ProposalVersion) -> VersionComparison {
    let price_change = &v2.price - &v1.price;
    let price_change_percent = price_change.percent_of(&v1.price);
    VersionComparison {
        price_change,
        price_change_percent,
        timeline_change: i64::from(v2.timeline_days) - i64::from(v1.timeline_days),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProposalVersionsView {
    pub proposal_id: Uuid,
    pub versions: Vec<ProposalVersion>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Version history of one proposal, newest first.
pub struct ProposalVersions {
    reader: Arc<dyn TableReader>,
    proposal_id: Uuid,
    versions: Vec<ProposalVersion>,
    loading: bool,
    error: Option<String>,
}

impl ProposalVersions {
    pub async fn load(reader: Arc<dyn TableReader>, proposal_id: Uuid) -> Self {
        let mut versions = Self {
            reader,
            proposal_id,
            versions: Vec::new(),
            loading: true,
            error: None,
        };
        versions.refresh().await;
        versions
    }

    pub fn query(proposal_id: Uuid) -> TableQuery {
        TableQuery::new(PROPOSAL_VERSIONS_TABLE)
            .eq("proposal_id", proposal_id)
            .order_by("version_number", Direction::Desc)
    }

    /// Refetch. On failure the previous list stays and `error` is set.
    pub async fn refresh(&mut self) {
        self.loading = true;
        match fetch_rows::<ProposalVersion>(self.reader.as_ref(), &Self::query(self.proposal_id)).await {
            Ok(mut rows) => {
                rows.sort_by(|a, b| b.version_number.cmp(&a.version_number));
                self.versions = rows;
                self.error = None;
            }
            Err(err) => {
                warn!(proposal_id = %self.proposal_id, error = %err, "failed to load proposal versions");
                self.error = Some(err.to_string());
            }
        }
        self.loading = false;
    }

    pub fn proposal_id(&self) -> Uuid {
        self.proposal_id
    }

    pub fn versions(&self) -> &[ProposalVersion] {
        &self.versions
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn version_by_id(&self, id: Uuid) -> Option<&ProposalVersion> {
        self.versions.iter().find(|version| version.id == id)
    }

    pub fn latest(&self) -> Option<&ProposalVersion> {
        self.versions.first()
    }

    /// `None` when either id is not part of this proposal's history.
    pub fn compare(&self, from: Uuid, to: Uuid) -> Option<VersionComparison> {
        let v1 = self.version_by_id(from)?;
        let v2 = self.version_by_id(to)?;
        Some(compare_versions(v1, v2))
    }

    pub fn view(&self) -> ProposalVersionsView {
        ProposalVersionsView {
            proposal_id: self.proposal_id,
            versions: self.versions.clone(),
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(number: i32, price_cents: i64, days: i32) -> ProposalVersion {
        ProposalVersion {
            id: Uuid::new_v4(),
            proposal_id: Uuid::nil(),
            version_number: number,
            price: Money::from_cents(price_cents),
            timeline_days: days,
            scope_text: None,
            terms: None,
            conditions: None,
            change_reason: None,
            created_by: None,
            created_at: None,
        }
    }

    #[test]
    fn price_increase_and_shorter_timeline() {
        let diff = compare_versions(&version(1, 1_000_000, 60), &version(2, 1_150_000, 45));
        assert_eq!(diff.price_change, Money::from_major(1_500));
        assert_eq!(diff.price_change_percent, 15);
        assert_eq!(diff.timeline_change, -15);
    }

    #[test]
    fn zero_base_price_gives_zero_percent() {
        let diff = compare_versions(&version(1, 0, 30), &version(2, 500_000, 30));
        assert_eq!(diff.price_change_percent, 0);
        assert_eq!(diff.price_change, Money::from_major(5_000));
    }

    #[test]
    fn sub_cent_prices_are_compared_exactly() {
        let mut v1 = version(1, 0, 10);
        let mut v2 = version(2, 0, 10);
        v1.price = "0.004".parse().unwrap();
        v2.price = Money::from_major(1);
        let diff = compare_versions(&v1, &v2);
        assert_eq!(diff.price_change, "0.996".parse::<Money>().unwrap());
        assert_eq!(diff.price_change_percent, 24_900);

        v1.price = "100.009".parse().unwrap();
        v2.price = "100.001".parse().unwrap();
        let diff = compare_versions(&v1, &v2);
        assert_eq!(diff.price_change, "-0.008".parse::<Money>().unwrap());
        assert_eq!(diff.price_change_percent, 0);
    }

    #[test]
    fn extreme_timelines_do_not_overflow() {
        let diff = compare_versions(&version(1, 100, i32::MIN), &version(2, 100, i32::MAX));
        assert_eq!(diff.timeline_change, i64::from(i32::MAX) - i64::from(i32::MIN));
        let back = compare_versions(&version(2, 100, i32::MAX), &version(1, 100, i32::MIN));
        assert_eq!(back.timeline_change, -diff.timeline_change);
    }

    #[test]
    fn comparison_is_sign_symmetric() {
        let a = version(1, 1_234_500, 20);
        let b = version(2, 987_600, 35);
        let forward = compare_versions(&a, &b);
        let backward = compare_versions(&b, &a);
        assert_eq!(forward.price_change, -backward.price_change);
        assert_eq!(forward.timeline_change, -backward.timeline_change);
    }
}
