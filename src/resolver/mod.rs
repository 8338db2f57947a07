pub mod rpc;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::epoch::{epoch_for_slot, EpochSchedule};

/// On-chain lookups the resolution pass depends on. The trait keeps the
/// network edge swappable; interpretation of the returned bytes lives here in
/// [`FeatureAccount`].
#[async_trait]
pub trait ActivationResolver: Send + Sync {
    async fn get_epoch_schedule(&self) -> Result<EpochSchedule>;
    /// Raw account bytes for a feature key, or `None` when the account does
    /// not exist (the feature was never initialized on this cluster).
    async fn get_account_data(&self, key: &str) -> Result<Option<Vec<u8>>>;
}

/// Decoded state of a feature account: byte 0 is the activation flag; when
/// set, bytes 1-8 hold the activation slot as a little-endian u64.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureAccount {
    /// Initialized but not yet activated. A legitimate resting state, not an
    /// error.
    Pending,
    Activated { slot: u64 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountParseError {
    #[error("feature account holds no data")]
    Empty,
    #[error("feature account claims activation but holds {0} bytes, need at least 9")]
    Truncated(usize),
}

impl FeatureAccount {
    pub fn from_bytes(data: &[u8]) -> Result<Self, AccountParseError> {
        let (&flag, rest) = data.split_first().ok_or(AccountParseError::Empty)?;
        if flag == 0 {
            return Ok(Self::Pending);
        }
        let slot_bytes: [u8; 8] = rest
            .get(..8)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(AccountParseError::Truncated(data.len()))?;
        Ok(Self::Activated {
            slot: u64::from_le_bytes(slot_bytes),
        })
    }

    /// Epoch at which the feature takes effect on the cluster. Activation is
    /// stake-weighted and lands at the epoch boundary after the activation
    /// slot, hence the +1 on top of the plain slot-to-epoch mapping.
    pub fn effective_epoch(&self, schedule: &EpochSchedule) -> Option<u64> {
        match self {
            Self::Pending => None,
            Self::Activated { slot } => Some(epoch_for_slot(schedule, *slot) + 1),
        }
    }
}
