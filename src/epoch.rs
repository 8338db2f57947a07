use serde::{Deserialize, Serialize};

/// Epoch length at the start of the bootstrap phase. Epochs double in length
/// from here until they reach `slots_per_epoch`. Must stay bit-exact with the
/// on-chain constant or activation epochs come out silently wrong.
pub const MINIMUM_SLOTS_PER_EPOCH: u64 = 32;

/// Cluster epoch layout as reported by the `getEpochSchedule` RPC call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EpochSchedule {
    pub slots_per_epoch: u64,
    pub first_normal_epoch: u64,
    pub first_normal_slot: u64,
}

/// Maps an absolute slot to the epoch containing it.
///
/// Slots before `first_normal_slot` fall into the bootstrap phase, where the
/// epoch is recovered from the doubling sequence with power-of-two bit
/// arithmetic. From `first_normal_slot` on, epochs have a fixed length of
/// `slots_per_epoch`.
///
/// Feature gates only take effect at the epoch boundary after their
/// activation slot; that +1 is the caller's concern, not this function's.
pub fn epoch_for_slot(schedule: &EpochSchedule, slot: u64) -> u64 {
    if slot < schedule.first_normal_slot {
        let power = (slot + MINIMUM_SLOTS_PER_EPOCH + 1).next_power_of_two();
        u64::from(power.trailing_zeros() - MINIMUM_SLOTS_PER_EPOCH.trailing_zeros() - 1)
    } else {
        schedule.first_normal_epoch + (slot - schedule.first_normal_slot) / schedule.slots_per_epoch
    }
}
