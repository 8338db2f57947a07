pub mod proposals;
pub mod wiki;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::store::schema::FeatureRecord;

/// One feature row reported by a schedule source. Carries per-network epoch
/// hints and the wiki-curated metadata, but never a mainnet epoch or a
/// description; those are owned by the resolver and the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateRecord {
    pub key: String,
    pub title: Option<String>,
    pub simds: Vec<String>,
    pub simd_links: Vec<String>,
    pub owners: Vec<String>,
    pub min_agave_versions: Vec<String>,
    pub min_fd_versions: Vec<String>,
    pub min_jito_versions: Vec<String>,
    pub planned_testnet_order: Option<u64>,
    pub testnet_activation_epoch: Option<u64>,
    pub devnet_activation_epoch: Option<u64>,
    pub comms_required: Option<String>,
}

impl CandidateRecord {
    /// Canonical record for a feature seen for the first time.
    pub fn into_record(self) -> FeatureRecord {
        FeatureRecord {
            key: self.key,
            title: self.title,
            description: None,
            simds: self.simds,
            simd_links: self.simd_links,
            owners: self.owners,
            min_agave_versions: self.min_agave_versions,
            min_fd_versions: self.min_fd_versions,
            min_jito_versions: self.min_jito_versions,
            planned_testnet_order: self.planned_testnet_order,
            testnet_activation_epoch: self.testnet_activation_epoch,
            devnet_activation_epoch: self.devnet_activation_epoch,
            mainnet_activation_epoch: None,
            comms_required: self.comms_required,
        }
    }
}

/// One fetch of the schedule source, with provenance for the sync log.
#[derive(Debug, Clone)]
pub struct ScheduleBatch {
    pub source_url: String,
    pub fetched_at: DateTime<Utc>,
    pub raw_hash: String,
    pub candidates: Vec<CandidateRecord>,
}

#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch_candidates(&self) -> Result<ScheduleBatch>;
}
