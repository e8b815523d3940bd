//! Mutable state structs, independent of account framing.

use anchor_lang::prelude::*;

use crate::constants::{MAX_POOLS_PER_STAKER, MAX_STAKERS_PER_POOL};
use crate::error::CoreError;
use crate::pool_key::PoolKey;

/// `ValidatorState`: aggregate counters mutated only via defined
/// transitions; every staker balance change and payout keeps this in sync
/// with the sum of per-pool totals.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ValidatorState {
    pub num_pools: u32,
    pub total_stakers: u64,
    pub total_algo_staked: u64,
    pub reward_token_held_back: u64,
}

/// One row per pool, held inline in the registry's validator record.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PoolSummary {
    pub node_id: u32,
    pub pool_app_id: Pubkey,
    pub total_stakers: u64,
    pub total_algo_staked: u64,
}

/// Pool-local staker ledger entry. An empty slot has `account == Pubkey::default()`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StakedInfo {
    pub account: Pubkey,
    pub balance: u64,
    pub total_rewarded: u64,
    pub reward_token_balance: u64,
    pub entry_time: i64,
}

impl StakedInfo {
    pub fn is_empty(&self) -> bool {
        self.account == Pubkey::default()
    }
}

/// Fixed-capacity set of the pools a single staker participates in.
/// Empty slots carry the zero `PoolKey` sentinel.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug)]
pub struct StakerPoolSet {
    pub entries: [PoolKey; MAX_POOLS_PER_STAKER],
}

impl Default for StakerPoolSet {
    fn default() -> Self {
        StakerPoolSet {
            entries: [PoolKey::NONE; MAX_POOLS_PER_STAKER],
        }
    }
}

impl StakerPoolSet {
    /// Inserts `key` into the first empty slot if `(validator_id, pool_id)`
    /// is not already present. No-op if already present. Returns
    /// `Err(StakerPoolSetFull)` if no empty slot remains and it is not
    /// already present.
    pub fn insert(&mut self, key: PoolKey) -> Result<(), CoreError> {
        if self
            .entries
            .iter()
            .any(|e| e.validator_id == key.validator_id && e.pool_id == key.pool_id)
        {
            return Ok(());
        }
        for slot in self.entries.iter_mut() {
            if slot.is_none() {
                *slot = key;
                return Ok(());
            }
        }
        Err(CoreError::StakerPoolSetFull)
    }

    /// Removes the entry for `(validator_id, pool_id)`, preserving slot
    /// indices of the other entries (overwrites with the sentinel).
    pub fn remove(&mut self, validator_id: u64, pool_id: u64) {
        for slot in self.entries.iter_mut() {
            if slot.validator_id == validator_id && slot.pool_id == pool_id {
                *slot = PoolKey::NONE;
            }
        }
    }

    pub fn iter_non_empty(&self) -> impl Iterator<Item = &PoolKey> {
        self.entries.iter().filter(|e| !e.is_none())
    }
}

/// Finds the ledger slot index matching `account`, or the first empty slot,
/// in a single pass, matching `addStake`'s scan order.
pub fn find_slot_for_staker(ledger: &[StakedInfo], account: &Pubkey) -> (Option<usize>, Option<usize>) {
    let mut first_empty = None;
    for (i, slot) in ledger.iter().enumerate() {
        if &slot.account == account {
            return (Some(i), first_empty);
        }
        if first_empty.is_none() && slot.is_empty() {
            first_empty = Some(i);
        }
    }
    (None, first_empty)
}

/// Finds the ledger slot index holding `account`'s stake.
pub fn find_staker(ledger: &[StakedInfo], account: &Pubkey) -> Option<usize> {
    ledger.iter().position(|s| &s.account == account)
}

pub const _ASSERT_LEDGER_CAPACITY: usize = MAX_STAKERS_PER_POOL;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent_for_same_pool() {
        let mut set = StakerPoolSet::default();
        let key = PoolKey {
            validator_id: 1,
            pool_id: 1,
            pool_app_id: Pubkey::new_unique(),
        };
        set.insert(key).unwrap();
        set.insert(key).unwrap();
        assert_eq!(set.iter_non_empty().count(), 1);
    }

    #[test]
    fn insert_fails_when_full() {
        let mut set = StakerPoolSet::default();
        for i in 1..=MAX_POOLS_PER_STAKER as u64 {
            set.insert(PoolKey {
                validator_id: i,
                pool_id: 1,
                pool_app_id: Pubkey::new_unique(),
            })
            .unwrap();
        }
        let overflow = set.insert(PoolKey {
            validator_id: 99,
            pool_id: 1,
            pool_app_id: Pubkey::new_unique(),
        });
        assert_eq!(overflow, Err(CoreError::StakerPoolSetFull));
    }

    #[test]
    fn remove_preserves_other_slot_indices() {
        let mut set = StakerPoolSet::default();
        let a = PoolKey {
            validator_id: 1,
            pool_id: 1,
            pool_app_id: Pubkey::new_unique(),
        };
        let b = PoolKey {
            validator_id: 2,
            pool_id: 1,
            pool_app_id: Pubkey::new_unique(),
        };
        set.insert(a).unwrap();
        set.insert(b).unwrap();
        set.remove(a.validator_id, a.pool_id);
        assert!(set.entries[0].is_none());
        assert_eq!(set.entries[1], b);
    }

    #[test]
    fn find_slot_prefers_existing_account_over_empty() {
        let mut ledger = [StakedInfo::default(); 4];
        let staker = Pubkey::new_unique();
        ledger[2].account = staker;
        ledger[2].balance = 10;
        let (found, empty) = find_slot_for_staker(&ledger, &staker);
        assert_eq!(found, Some(2));
        assert_eq!(empty, Some(0));
    }
}
