//! `findPoolForStaker`. A read-only instruction: no return
//! data crosses the corpus's CPI boundary anywhere (`set_return_data` is
//! absent from every retrieved example), so the chosen `PoolKey` is reported
//! via `msg!` for an off-chain client to parse out of the transaction logs.

use anchor_lang::prelude::*;

use delegated_stake_common::placement::{find_pool_for_staker, PoolCandidate};
use delegated_stake_common::pool_key::PoolKey;
use delegated_stake_common::state::StakerPoolSet;

use crate::error::DelegatedStakeError;
use crate::state::{Pool, Registry, StakerPoolSetAccount};
use crate::REGISTRY_SEED;

#[derive(Accounts)]
pub struct FindPoolForStaker<'info> {
    #[account(seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,
    // `Pool` accounts for `validator_id`, in registry order, are passed as
    // remaining accounts; a `StakerPoolSetAccount` for the staker may
    // optionally be appended last to honor existing-membership preference.
}

impl<'info> FindPoolForStaker<'info> {
    pub fn process<'c: 'info>(
        &mut self,
        remaining_accounts: &'c [AccountInfo<'info>],
        validator_id: u64,
        staker: Pubkey,
        amount: u64,
    ) -> Result<()> {
        let validator = self
            .registry
            .get_validator(validator_id)
            .map_err(DelegatedStakeError::from)?;

        let mut candidates = Vec::with_capacity(validator.state.num_pools as usize);
        let mut existing: Option<StakerPoolSet> = None;
        for info in remaining_accounts {
            if let Ok(pool) = Account::<Pool>::try_from(info) {
                if pool.validator_id == validator_id {
                    candidates.push(PoolCandidate {
                        key: PoolKey {
                            validator_id: pool.validator_id,
                            pool_id: pool.pool_id,
                            pool_app_id: pool.key(),
                        },
                        total_algo_staked: pool.staked,
                        max_algo_per_pool: pool.max_stake,
                    });
                    continue;
                }
            }
            if let Ok(set) = Account::<StakerPoolSetAccount>::try_from(info) {
                if set.owner == staker {
                    existing = Some(set.inner);
                }
            }
        }

        let key = find_pool_for_staker(
            validator_id,
            existing.as_ref(),
            &candidates,
            amount,
            validator.config.min_entry_stake,
        );
        msg!(
            "pool_for_staker validator={} pool_id={} pool_app_id={}",
            key.validator_id,
            key.pool_id,
            key.pool_app_id
        );
        Ok(())
    }
}
