//! `findPoolForStaker`, the registry's deterministic pool-selection
//! algorithm.

use crate::pool_key::PoolKey;
use crate::state::{PoolSummary, StakerPoolSet};

/// One candidate pool as seen by the placement algorithm: its `PoolKey` plus
/// the fields needed to evaluate capacity.
#[derive(Clone, Copy, Debug)]
pub struct PoolCandidate {
    pub key: PoolKey,
    pub total_algo_staked: u64,
    pub max_algo_per_pool: u64,
}

/// Implements `findPoolForStaker(validatorId, staker, amount)`:
///
/// 1. If the staker already participates in a pool of this validator with
///    room for `amount`, return it immediately (even below `minEntryStake`,
///    since they are topping up an existing position).
/// 2. Otherwise require `amount >= minEntryStake` and return the first pool
///    (in registry order) with room.
/// 3. If none fits, return the sentinel `PoolKey::NONE`.
pub fn find_pool_for_staker(
    validator_id: u64,
    existing: Option<&StakerPoolSet>,
    pools: &[PoolCandidate],
    amount: u64,
    min_entry_stake: u64,
) -> PoolKey {
    if let Some(set) = existing {
        for key in set.iter_non_empty() {
            if key.validator_id != validator_id {
                continue;
            }
            if let Some(candidate) = pools.iter().find(|c| c.key.pool_id == key.pool_id) {
                if candidate
                    .total_algo_staked
                    .saturating_add(amount)
                    <= candidate.max_algo_per_pool
                {
                    return candidate.key;
                }
            }
        }
    }

    if amount < min_entry_stake {
        return PoolKey::NONE;
    }

    for candidate in pools {
        if candidate.total_algo_staked.saturating_add(amount) <= candidate.max_algo_per_pool {
            return candidate.key;
        }
    }

    PoolKey::NONE
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_lang::prelude::Pubkey;

    fn candidate(pool_id: u64, staked: u64, max: u64) -> PoolCandidate {
        PoolCandidate {
            key: PoolKey {
                validator_id: 1,
                pool_id,
                pool_app_id: Pubkey::new_unique(),
            },
            total_algo_staked: staked,
            max_algo_per_pool: max,
        }
    }

    #[test]
    fn returns_sentinel_when_no_pool_fits() {
        let pools = vec![candidate(1, 99, 100)];
        let key = find_pool_for_staker(1, None, &pools, 5, 10);
        assert!(key.is_none());
    }

    #[test]
    fn rejects_below_minimum_for_new_staker() {
        let pools = vec![candidate(1, 0, 1_000)];
        let key = find_pool_for_staker(1, None, &pools, 5, 10);
        assert!(key.is_none());
    }

    #[test]
    fn picks_first_pool_with_room() {
        let pools = vec![candidate(1, 990, 1_000), candidate(2, 0, 1_000)];
        let key = find_pool_for_staker(1, None, &pools, 50, 10);
        assert_eq!(key.pool_id, 2);
    }

    #[test]
    fn prefers_existing_membership_even_below_minimum() {
        let mut set = StakerPoolSet::default();
        let pools = vec![candidate(3, 100, 1_000)];
        set.insert(pools[0].key).unwrap();
        let key = find_pool_for_staker(1, Some(&set), &pools, 5, 10_000);
        assert_eq!(key.pool_id, 3);
    }

    #[test]
    fn ignores_other_validators_memberships() {
        let mut set = StakerPoolSet::default();
        set.insert(PoolKey {
            validator_id: 2,
            pool_id: 1,
            pool_app_id: Pubkey::new_unique(),
        })
        .unwrap();
        let pools = vec![candidate(1, 0, 1_000)];
        let key = find_pool_for_staker(1, Some(&set), &pools, 50, 10);
        assert_eq!(key.validator_id, 1);
        assert_eq!(key.pool_id, 1);
    }
}
