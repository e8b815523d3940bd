//! `addPool`: creates one staking pool instance.
//! Split into a plain variant and a reward-token variant because Anchor
//! 0.23 has no ergonomic "optional account" story — the client picks the
//! instruction that matches the validator's configuration.

use std::collections::BTreeMap;

use anchor_lang::prelude::*;
use anchor_spl::associated_token::AssociatedToken;
use anchor_spl::token::{Token, TokenAccount};

use delegated_stake_common::error::CoreError;

use crate::error::DelegatedStakeError;
use crate::state::{Pool, Registry, StakedInfo, Validator};
use crate::{POOL_SEED, REGISTRY_SEED};

/// Assigns `pool_id`'s reserved `PoolSummary` slot to a node and records it
/// in the validator's aggregate counters. Shared by `AddPool` and
/// `AddPoolWithRewardToken`, which differ only in how `pool_app_id` (the
/// freshly-initialized pool account's key) and its reward-token wiring come
/// to be.
pub(crate) fn assign_pool_slot(
    validator: &mut Validator,
    pool_id: u64,
    pool_app_id: Pubkey,
) -> std::result::Result<u32, CoreError> {
    let node_id = validator.assign_node()? as u32;
    let summary = validator.pool_summary_slot_mut(pool_id)?;
    summary.node_id = node_id;
    summary.pool_app_id = pool_app_id;
    summary.total_stakers = 0;
    summary.total_algo_staked = 0;
    validator.state.num_pools += 1;
    Ok(node_id)
}

#[derive(Accounts)]
#[instruction(validator_id: u64, pool_id: u64)]
pub struct AddPool<'info> {
    #[account(mut, seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    #[account(
        init,
        payer = payer,
        space = Pool::SIZE,
        seeds = [POOL_SEED, &validator_id.to_le_bytes(), &pool_id.to_le_bytes()],
        bump,
    )]
    pub pool: Account<'info, Pool>,

    pub owner_or_manager: Signer<'info>,

    #[account(mut)]
    pub payer: Signer<'info>,

    pub system_program: Program<'info, System>,
}

impl<'info> AddPool<'info> {
    pub fn process(
        &mut self,
        bumps: &BTreeMap<String, u8>,
        validator_id: u64,
        pool_id: u64,
    ) -> Result<()> {
        let validator = self
            .registry
            .get_validator_mut(validator_id)
            .map_err(DelegatedStakeError::from)?;
        require!(
            validator.is_owner_or_manager(&self.owner_or_manager.key()),
            DelegatedStakeError::NotOwnerOrManager
        );
        require!(
            validator.config.reward_token_id == Pubkey::default() || pool_id != 1,
            DelegatedStakeError::InvalidConfig
        );
        let expected_pool_id = validator
            .next_pool_id()
            .map_err(DelegatedStakeError::from)?;
        require!(
            pool_id == expected_pool_id,
            DelegatedStakeError::PoolKeyMismatch
        );

        let pool = &mut self.pool;
        pool.bump = *bumps.get("pool").unwrap();
        pool.registry = self.registry.key();
        pool.validator_id = validator_id;
        pool.pool_id = pool_id;
        pool.min_entry_stake = validator.config.min_entry_stake;
        pool.max_stake = validator.config.max_algo_per_pool;
        pool.num_stakers = 0;
        pool.staked = 0;
        pool.last_payout = Clock::get()?.unix_timestamp;
        pool.online = false;
        pool.reward_token_account = Pubkey::default();
        pool.algod_ver_len = 0;
        pool.algod_ver = [0u8; 64];
        pool.ledger = vec![
            StakedInfo::default();
            delegated_stake_common::constants::MAX_STAKERS_PER_POOL
        ];

        let node_id =
            assign_pool_slot(validator, pool_id, pool.key()).map_err(DelegatedStakeError::from)?;

        msg!(
            "pool {} for validator {} created at node {}",
            pool_id,
            validator_id,
            node_id
        );
        Ok(())
    }
}

#[derive(Accounts)]
#[instruction(validator_id: u64, pool_id: u64)]
pub struct AddPoolWithRewardToken<'info> {
    #[account(mut, seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    #[account(
        init,
        payer = payer,
        space = Pool::SIZE,
        seeds = [POOL_SEED, &validator_id.to_le_bytes(), &pool_id.to_le_bytes()],
        bump,
    )]
    pub pool: Account<'info, Pool>,

    pub reward_mint: Account<'info, anchor_spl::token::Mint>,

    #[account(
        init,
        payer = payer,
        associated_token::mint = reward_mint,
        associated_token::authority = pool,
    )]
    pub reward_token_account: Account<'info, TokenAccount>,

    pub owner_or_manager: Signer<'info>,

    #[account(mut)]
    pub payer: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
}

impl<'info> AddPoolWithRewardToken<'info> {
    pub fn process(
        &mut self,
        bumps: &BTreeMap<String, u8>,
        validator_id: u64,
        pool_id: u64,
    ) -> Result<()> {
        require!(pool_id == 1, DelegatedStakeError::NotPrimaryPool);

        let validator = self
            .registry
            .get_validator_mut(validator_id)
            .map_err(DelegatedStakeError::from)?;
        require!(
            validator.is_owner_or_manager(&self.owner_or_manager.key()),
            DelegatedStakeError::NotOwnerOrManager
        );
        require!(
            validator.config.reward_token_id == self.reward_mint.key(),
            DelegatedStakeError::InvalidConfig
        );
        let expected_pool_id = validator
            .next_pool_id()
            .map_err(DelegatedStakeError::from)?;
        require!(
            pool_id == expected_pool_id,
            DelegatedStakeError::PoolKeyMismatch
        );

        let pool = &mut self.pool;
        pool.bump = *bumps.get("pool").unwrap();
        pool.registry = self.registry.key();
        pool.validator_id = validator_id;
        pool.pool_id = pool_id;
        pool.min_entry_stake = validator.config.min_entry_stake;
        pool.max_stake = validator.config.max_algo_per_pool;
        pool.num_stakers = 0;
        pool.staked = 0;
        pool.last_payout = Clock::get()?.unix_timestamp;
        pool.online = false;
        pool.reward_token_account = self.reward_token_account.key();
        pool.algod_ver_len = 0;
        pool.algod_ver = [0u8; 64];
        pool.ledger = vec![
            StakedInfo::default();
            delegated_stake_common::constants::MAX_STAKERS_PER_POOL
        ];

        assign_pool_slot(validator, pool_id, pool.key()).map_err(DelegatedStakeError::from)?;

        msg!(
            "pool 1 for validator {} created with reward token {}",
            validator_id,
            self.reward_mint.key()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::blank_validator;

    #[test]
    fn assign_pool_slot_succeeds_on_a_freshly_reserved_slot() {
        let mut validator = blank_validator();
        let pool_id = validator.next_pool_id().unwrap();
        assert_eq!(pool_id, 1);
        let pool_app_id = Pubkey::new_unique();

        let node_id = assign_pool_slot(&mut validator, pool_id, pool_app_id).unwrap();

        assert_eq!(node_id, 0);
        assert_eq!(validator.pools[0].pool_app_id, pool_app_id);
        assert_eq!(validator.state.num_pools, 1);
        // The slot is now assigned, so the next call reserves slot 2, not 1 again.
        assert_eq!(validator.next_pool_id().unwrap(), 2);
    }

    #[test]
    fn assign_pool_slot_spreads_across_nodes_before_reusing_one() {
        let mut validator = blank_validator();
        let first = assign_pool_slot(&mut validator, 1, Pubkey::new_unique()).unwrap();
        let second = assign_pool_slot(&mut validator, 2, Pubkey::new_unique()).unwrap();
        assert_eq!(first, 0);
        assert_eq!(second, 0);
        assert_eq!(validator.nodes[0], 2);
    }

    #[test]
    fn assign_pool_slot_errors_once_node_capacity_is_exhausted() {
        let mut validator = blank_validator();
        validator.config.max_nodes = 1;
        validator.config.pools_per_node = 1;
        assign_pool_slot(&mut validator, 1, Pubkey::new_unique()).unwrap();
        assert_eq!(
            assign_pool_slot(&mut validator, 2, Pubkey::new_unique()),
            Err(CoreError::PoolCapExceeded)
        );
    }
}
