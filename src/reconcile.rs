use std::collections::HashMap;

use tracing::warn;

use crate::schedule::CandidateRecord;
use crate::store::schema::FeatureRecord;

/// Outcome of one reconciliation pass. `updated` is the full replacement
/// record set; `newly_discovered` repeats the records appended at its tail so
/// the operator can review features that arrived with uncurated fields.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub updated: Vec<FeatureRecord>,
    pub newly_discovered: Vec<FeatureRecord>,
}

/// Merges one schedule-source batch into the persisted record set.
///
/// Persisted records keep their original order and every field except the
/// devnet and testnet epochs, which always track the source, including back
/// to null when the source drops an epoch, since schedules slip. Candidates
/// for unknown keys become new records, appended in source order. Duplicate
/// keys within the batch are a source data-quality issue: the later row wins
/// and the collision is logged, not raised.
pub fn reconcile(
    persisted: Vec<FeatureRecord>,
    incoming: Vec<CandidateRecord>,
) -> Reconciliation {
    let mut order: Vec<String> = Vec::with_capacity(incoming.len());
    let mut by_key: HashMap<String, CandidateRecord> = HashMap::with_capacity(incoming.len());
    for candidate in incoming {
        let key = candidate.key.clone();
        if by_key.insert(key.clone(), candidate).is_some() {
            warn!(%key, "duplicate key in schedule batch, keeping the later row");
        } else {
            order.push(key);
        }
    }

    let mut updated = Vec::with_capacity(persisted.len() + by_key.len());
    for mut record in persisted {
        if let Some(candidate) = by_key.remove(&record.key) {
            record.devnet_activation_epoch = candidate.devnet_activation_epoch;
            record.testnet_activation_epoch = candidate.testnet_activation_epoch;
        }
        updated.push(record);
    }

    let mut newly_discovered = Vec::new();
    for key in order {
        if let Some(candidate) = by_key.remove(&key) {
            newly_discovered.push(candidate.into_record());
        }
    }
    updated.extend(newly_discovered.iter().cloned());

    Reconciliation {
        updated,
        newly_discovered,
    }
}
