//! `PoolKey` and the cross-contract authentication predicate.

use anchor_lang::prelude::*;

use crate::error::CoreError;
use crate::state::PoolSummary;

/// Composite identity used to authenticate every privileged inter-account
/// call: which validator, which pool slot, and the pool's own account
/// address (the native analogue of Algorand's `poolAppId`).
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Eq, PartialEq, Default)]
pub struct PoolKey {
    pub validator_id: u64,
    pub pool_id: u64,
    pub pool_app_id: Pubkey,
}

impl PoolKey {
    pub const NONE: PoolKey = PoolKey {
        validator_id: 0,
        pool_id: 0,
        pool_app_id: Pubkey::new_from_array([0u8; 32]),
    };

    pub fn is_none(&self) -> bool {
        self.pool_id == 0
    }
}

/// Performs the four-part authentication check binding a pool's claimed
/// identity to its actual account and the registry's own records.
///
/// A single check is insufficient: a malicious deployer could pass an
/// account that merely *looks* like the right pool. We require all four:
///
/// 1. `pool_id` is in range `[1, num_pools]` for `validator_id`.
/// 2. The registry's own `PoolSummary` row for `pool_id` has
///    `pool_app_id == claimed.pool_app_id`.
/// 3. `actual_pool_address` (the Anchor-verified PDA passed into this
///    instruction, derived from `[b"pool", validator_id, pool_id]` and
///    owned by this program) equals `claimed.pool_app_id`.
/// 4. The pool account's own self-reported `validator_id`/`pool_id` match
///    the claim.
pub fn authenticate(
    claimed: &PoolKey,
    num_pools: u64,
    pool_summaries: &[PoolSummary],
    actual_pool_address: &Pubkey,
    self_reported_validator_id: u64,
    self_reported_pool_id: u64,
) -> Result<(), CoreError> {
    if claimed.pool_id == 0 || claimed.pool_id > num_pools {
        return Err(CoreError::PoolKeyMismatch);
    }
    let summary = pool_summaries
        .get((claimed.pool_id - 1) as usize)
        .ok_or(CoreError::PoolKeyMismatch)?;
    if summary.pool_app_id != claimed.pool_app_id {
        return Err(CoreError::PoolKeyMismatch);
    }
    if actual_pool_address != &claimed.pool_app_id {
        return Err(CoreError::PoolKeyMismatch);
    }
    if self_reported_validator_id != claimed.validator_id || self_reported_pool_id != claimed.pool_id
    {
        return Err(CoreError::PoolKeyMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(pool_id: u64, pool_app_id: Pubkey) -> PoolSummary {
        PoolSummary {
            node_id: 1,
            pool_app_id,
            total_stakers: 0,
            total_algo_staked: 0,
        }
    }

    #[test]
    fn accepts_fully_consistent_claim() {
        let pool_addr = Pubkey::new_unique();
        let claimed = PoolKey {
            validator_id: 3,
            pool_id: 1,
            pool_app_id: pool_addr,
        };
        let summaries = vec![summary(1, pool_addr)];
        assert!(authenticate(&claimed, 1, &summaries, &pool_addr, 3, 1).is_ok());
    }

    #[test]
    fn rejects_pool_id_out_of_range() {
        let pool_addr = Pubkey::new_unique();
        let claimed = PoolKey {
            validator_id: 3,
            pool_id: 2,
            pool_app_id: pool_addr,
        };
        let summaries = vec![summary(1, pool_addr)];
        assert_eq!(
            authenticate(&claimed, 1, &summaries, &pool_addr, 3, 2),
            Err(CoreError::PoolKeyMismatch)
        );
    }

    #[test]
    fn rejects_registry_mismatch() {
        let pool_addr = Pubkey::new_unique();
        let other_addr = Pubkey::new_unique();
        let claimed = PoolKey {
            validator_id: 3,
            pool_id: 1,
            pool_app_id: pool_addr,
        };
        let summaries = vec![summary(1, other_addr)];
        assert_eq!(
            authenticate(&claimed, 1, &summaries, &pool_addr, 3, 1),
            Err(CoreError::PoolKeyMismatch)
        );
    }

    #[test]
    fn rejects_sender_mismatch() {
        let pool_addr = Pubkey::new_unique();
        let impostor_addr = Pubkey::new_unique();
        let claimed = PoolKey {
            validator_id: 3,
            pool_id: 1,
            pool_app_id: pool_addr,
        };
        let summaries = vec![summary(1, pool_addr)];
        assert_eq!(
            authenticate(&claimed, 1, &summaries, &impostor_addr, 3, 1),
            Err(CoreError::PoolKeyMismatch)
        );
    }

    #[test]
    fn rejects_self_reported_mismatch() {
        let pool_addr = Pubkey::new_unique();
        let claimed = PoolKey {
            validator_id: 3,
            pool_id: 1,
            pool_app_id: pool_addr,
        };
        let summaries = vec![summary(1, pool_addr)];
        assert_eq!(
            authenticate(&claimed, 1, &summaries, &pool_addr, 3, 2),
            Err(CoreError::PoolKeyMismatch)
        );
    }
}
