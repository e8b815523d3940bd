//! Staker-facing instructions: `addStake`, `removeStake`,
//! `claimTokens`.

use std::collections::BTreeMap;

use anchor_lang::prelude::*;
use anchor_spl::token::{self, Token, TokenAccount};

use delegated_stake_common::constants::computed_entry_time;
use delegated_stake_common::error::CoreError;
use delegated_stake_common::pool_key::{authenticate, PoolKey};
use delegated_stake_common::state::{find_slot_for_staker, find_staker};

use crate::error::DelegatedStakeError;
use crate::state::{Pool, Registry, StakedInfo, StakerPoolSetAccount, Validator};
use crate::{POOL_SEED, REGISTRY_SEED, STAKER_POOLS_SEED};

/// Core ledger mutation behind `addStake`, independent of account framing so
/// it can run against plain in-memory state: credits `amount` into `staker`'s
/// slot (or opens a new one), stamping `entry_time` on *both* paths per
/// spec.md §4.2, and keeps the validator's aggregate counters in sync.
#[allow(clippy::too_many_arguments)]
pub(crate) fn apply_add_stake(
    pool: &mut Pool,
    staker_pool_set: &mut StakerPoolSetAccount,
    validator: &mut Validator,
    validator_id: u64,
    pool_id: u64,
    pool_app_id: Pubkey,
    staker: Pubkey,
    amount: u64,
    entry_time: i64,
) -> std::result::Result<(), CoreError> {
    let new_total = pool
        .staked
        .checked_add(amount)
        .ok_or(CoreError::ArithmeticError)?;
    if new_total > pool.max_stake {
        return Err(CoreError::ExceedsMaxPerPool);
    }

    let (found, first_empty) = find_slot_for_staker(&pool.ledger, &staker);
    let is_new_entry = found.is_none();
    if is_new_entry && amount < pool.min_entry_stake {
        return Err(CoreError::BelowMinimum);
    }

    let idx = match found {
        Some(idx) => idx,
        None => first_empty.ok_or(CoreError::PoolFull)?,
    };

    if is_new_entry {
        pool.ledger[idx] = StakedInfo {
            account: staker,
            balance: amount,
            total_rewarded: 0,
            reward_token_balance: 0,
            entry_time,
        };
        pool.num_stakers += 1;
        staker_pool_set.inner.insert(PoolKey {
            validator_id,
            pool_id,
            pool_app_id,
        })?;
    } else {
        pool.ledger[idx].balance += amount;
        pool.ledger[idx].entry_time = entry_time;
    }
    pool.staked = new_total;

    let summary = validator.pool_summary_mut(pool_id)?;
    summary.total_algo_staked = new_total;
    summary.total_stakers = pool.num_stakers as u64;
    if is_new_entry {
        validator.state.total_stakers += 1;
    }
    validator.state.total_algo_staked = validator
        .state
        .total_algo_staked
        .checked_add(amount)
        .ok_or(CoreError::ArithmeticError)?;
    Ok(())
}

/// Outcome of `apply_remove_stake`, carrying what the caller still needs to
/// drive CPI transfers (the resolved unstake amount and any reward token
/// owed) without re-deriving them from the now-mutated ledger slot.
pub(crate) struct RemoveStakeOutcome {
    pub amount: u64,
    pub reward_token_balance: u64,
    pub closing: bool,
}

/// Core ledger mutation behind `removeStake`. `amount == 0` means "unstake
/// all" per spec.md §4.2.
pub(crate) fn apply_remove_stake(
    pool: &mut Pool,
    staker_pool_set: &mut StakerPoolSetAccount,
    validator: &mut Validator,
    validator_id: u64,
    pool_id: u64,
    staker: Pubkey,
    amount: u64,
) -> std::result::Result<RemoveStakeOutcome, CoreError> {
    let idx = find_staker(&pool.ledger, &staker).ok_or(CoreError::AccountNotFound)?;

    let slot = &mut pool.ledger[idx];
    let amount = if amount == 0 { slot.balance } else { amount };
    if slot.balance < amount {
        return Err(CoreError::InsufficientBalance);
    }
    let remaining = slot.balance - amount;
    if remaining != 0 && remaining < pool.min_entry_stake {
        return Err(CoreError::BelowMinimum);
    }

    let reward_token_balance = slot.reward_token_balance;
    let closing = remaining == 0;
    if closing {
        pool.ledger[idx] = StakedInfo::default();
        pool.num_stakers -= 1;
    } else {
        pool.ledger[idx].balance = remaining;
        pool.ledger[idx].reward_token_balance = 0;
    }
    pool.staked -= amount;

    let num_stakers_now = pool.num_stakers as u64;
    let staked_now = pool.staked;
    let summary = validator.pool_summary_mut(pool_id)?;
    summary.total_algo_staked = staked_now;
    summary.total_stakers = num_stakers_now;
    if closing {
        validator.state.total_stakers -= 1;
        staker_pool_set.inner.remove(validator_id, pool_id);
    }
    validator.state.total_algo_staked = validator
        .state
        .total_algo_staked
        .checked_sub(amount)
        .ok_or(CoreError::ArithmeticError)?;
    if reward_token_balance > 0 {
        validator.state.reward_token_held_back = validator
            .state
            .reward_token_held_back
            .checked_sub(reward_token_balance)
            .ok_or(CoreError::ArithmeticError)?;
    }

    Ok(RemoveStakeOutcome {
        amount,
        reward_token_balance,
        closing,
    })
}

pub(crate) fn authenticate_pool(
    registry: &Registry,
    pool: &Account<Pool>,
    validator_id: u64,
    pool_id: u64,
) -> Result<()> {
    let validator = registry
        .get_validator(validator_id)
        .map_err(DelegatedStakeError::from)?;
    let claimed = PoolKey {
        validator_id,
        pool_id,
        pool_app_id: pool.key(),
    };
    authenticate(
        &claimed,
        validator.state.num_pools as u64,
        &validator.pools,
        &pool.key(),
        pool.validator_id,
        pool.pool_id,
    )
    .map_err(DelegatedStakeError::from)?;
    Ok(())
}

#[derive(Accounts)]
#[instruction(validator_id: u64, pool_id: u64, amount: u64)]
pub struct AddStake<'info> {
    #[account(mut, seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    #[account(
        mut,
        seeds = [POOL_SEED, &validator_id.to_le_bytes(), &pool_id.to_le_bytes()],
        bump = pool.bump,
    )]
    pub pool: Account<'info, Pool>,

    #[account(
        init_if_needed,
        payer = staker,
        space = StakerPoolSetAccount::SIZE,
        seeds = [STAKER_POOLS_SEED, staker.key().as_ref()],
        bump,
    )]
    pub staker_pool_set: Account<'info, StakerPoolSetAccount>,

    #[account(mut)]
    pub staker: Signer<'info>,

    pub system_program: Program<'info, System>,
}

impl<'info> AddStake<'info> {
    pub fn process(
        &mut self,
        bumps: &BTreeMap<String, u8>,
        validator_id: u64,
        pool_id: u64,
        amount: u64,
    ) -> Result<()> {
        authenticate_pool(&self.registry, &self.pool, validator_id, pool_id)?;

        let staker_key = self.staker.key();
        if self.staker_pool_set.owner == Pubkey::default() {
            self.staker_pool_set.bump = *bumps.get("staker_pool_set").unwrap();
            self.staker_pool_set.owner = staker_key;
        }

        let pool_app_id = self.pool.key();
        let now = Clock::get()?.unix_timestamp;
        let entry_time = computed_entry_time(now);

        let validator = self
            .registry
            .get_validator_mut(validator_id)
            .map_err(DelegatedStakeError::from)?;
        apply_add_stake(
            &mut self.pool,
            &mut self.staker_pool_set,
            validator,
            validator_id,
            pool_id,
            pool_app_id,
            staker_key,
            amount,
            entry_time,
        )
        .map_err(DelegatedStakeError::from)?;

        anchor_lang::system_program::transfer(
            CpiContext::new(
                self.system_program.to_account_info(),
                anchor_lang::system_program::Transfer {
                    from: self.staker.to_account_info(),
                    to: self.pool.to_account_info(),
                },
            ),
            amount,
        )?;

        msg!(
            "staker {} added {} to pool {}/{}",
            staker_key,
            amount,
            validator_id,
            pool_id
        );
        Ok(())
    }
}

#[derive(Accounts)]
#[instruction(validator_id: u64, pool_id: u64, amount: u64)]
pub struct RemoveStake<'info> {
    #[account(mut, seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    #[account(
        mut,
        seeds = [POOL_SEED, &validator_id.to_le_bytes(), &pool_id.to_le_bytes()],
        bump = pool.bump,
    )]
    pub pool: Account<'info, Pool>,

    /// Pool #1 of the same validator, sole custodian of any reward token.
    /// When `pool_id == 1` the client passes the same account as `pool`;
    /// not `mut` here since its own account data is never rewritten through
    /// this handle (only used to derive its PDA signer seeds), which would
    /// otherwise clobber `pool`'s mutations on exit when the two alias.
    #[account(
        seeds = [POOL_SEED, &validator_id.to_le_bytes(), &1u64.to_le_bytes()],
        bump = pool_one.bump,
    )]
    pub pool_one: Account<'info, Pool>,

    /// CHECK: only touched when the staker's `rewardTokenBalance` is non-zero.
    #[account(mut)]
    pub pool_one_reward_token_account: UncheckedAccount<'info>,

    /// CHECK: staker's reward-token account, only touched when non-zero.
    #[account(mut)]
    pub staker_reward_token_account: UncheckedAccount<'info>,

    #[account(
        mut,
        seeds = [STAKER_POOLS_SEED, staker.key().as_ref()],
        bump = staker_pool_set.bump,
    )]
    pub staker_pool_set: Account<'info, StakerPoolSetAccount>,

    #[account(mut)]
    pub staker: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

impl<'info> RemoveStake<'info> {
    pub fn process(&mut self, validator_id: u64, pool_id: u64, amount: u64) -> Result<()> {
        authenticate_pool(&self.registry, &self.pool, validator_id, pool_id)?;

        let staker_key = self.staker.key();
        let pool_bump = self.pool.bump;

        let validator = self
            .registry
            .get_validator_mut(validator_id)
            .map_err(DelegatedStakeError::from)?;
        let outcome = apply_remove_stake(
            &mut self.pool,
            &mut self.staker_pool_set,
            validator,
            validator_id,
            pool_id,
            staker_key,
            amount,
        )
        .map_err(DelegatedStakeError::from)?;
        let RemoveStakeOutcome {
            amount,
            reward_token_balance,
            closing: _,
        } = outcome;

        let validator_id_bytes = validator_id.to_le_bytes();
        let pool_id_bytes = pool_id.to_le_bytes();
        let seeds: &[&[u8]] = &[POOL_SEED, &validator_id_bytes, &pool_id_bytes, &[pool_bump]];
        anchor_lang::system_program::transfer(
            CpiContext::new_with_signer(
                self.system_program.to_account_info(),
                anchor_lang::system_program::Transfer {
                    from: self.pool.to_account_info(),
                    to: self.staker.to_account_info(),
                },
                &[seeds],
            ),
            amount,
        )?;

        if reward_token_balance > 0 {
            require!(
                self.pool_one.reward_token_account == self.pool_one_reward_token_account.key(),
                DelegatedStakeError::PoolKeyMismatch
            );
            let pool_one_id_bytes = 1u64.to_le_bytes();
            let pool_one_bump = self.pool_one.bump;
            let pool_one_seeds: &[&[u8]] = &[
                POOL_SEED,
                &validator_id_bytes,
                &pool_one_id_bytes,
                &[pool_one_bump],
            ];
            token::transfer(
                CpiContext::new_with_signer(
                    self.token_program.to_account_info(),
                    token::Transfer {
                        from: self.pool_one_reward_token_account.to_account_info(),
                        to: self.staker_reward_token_account.to_account_info(),
                        authority: self.pool_one.to_account_info(),
                    },
                    &[pool_one_seeds],
                ),
                reward_token_balance,
            )?;
        }

        msg!(
            "staker {} removed {} (token reward {}) from pool {}/{}",
            staker_key,
            amount,
            reward_token_balance,
            validator_id,
            pool_id
        );
        Ok(())
    }
}

#[derive(Accounts)]
#[instruction(validator_id: u64, pool_id: u64)]
pub struct ClaimTokens<'info> {
    #[account(mut, seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    /// Not `mut`: only read for its `reward_token_account` field and used
    /// as the CPI signer's seeds. When `pool_id == 1` this aliases `pool`,
    /// which is `mut`; marking this one `mut` too would make Anchor
    /// re-serialize its stale copy over `pool`'s mutations on exit.
    #[account(
        seeds = [POOL_SEED, &validator_id.to_le_bytes(), &1u64.to_le_bytes()],
        bump = pool_one.bump,
    )]
    pub pool_one: Account<'info, Pool>,

    #[account(
        mut,
        seeds = [POOL_SEED, &validator_id.to_le_bytes(), &pool_id.to_le_bytes()],
        bump = pool.bump,
    )]
    pub pool: Account<'info, Pool>,

    #[account(mut, address = pool_one.reward_token_account)]
    pub pool_reward_token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub staker_token_account: Account<'info, TokenAccount>,

    pub staker: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

/// Core ledger mutation behind `claimTokens`: zeroes the staker's accrued
/// reward-token balance and returns the amount owed, or errors if there's
/// nothing to claim.
pub(crate) fn apply_claim_tokens(
    pool: &mut Pool,
    validator: &mut Validator,
    staker: Pubkey,
) -> std::result::Result<u64, CoreError> {
    let idx = find_staker(&pool.ledger, &staker).ok_or(CoreError::AccountNotFound)?;
    let amount = pool.ledger[idx].reward_token_balance;
    if amount == 0 {
        return Err(CoreError::RewardTooSmall);
    }
    pool.ledger[idx].reward_token_balance = 0;
    validator.state.reward_token_held_back = validator
        .state
        .reward_token_held_back
        .checked_sub(amount)
        .ok_or(CoreError::ArithmeticError)?;
    Ok(amount)
}

impl<'info> ClaimTokens<'info> {
    pub fn process(&mut self, validator_id: u64, pool_id: u64) -> Result<()> {
        authenticate_pool(&self.registry, &self.pool, validator_id, pool_id)?;

        let staker_key = self.staker.key();
        let validator = self
            .registry
            .get_validator_mut(validator_id)
            .map_err(DelegatedStakeError::from)?;
        let amount = apply_claim_tokens(&mut self.pool, validator, staker_key)
            .map_err(DelegatedStakeError::from)?;

        let validator_id_bytes = validator_id.to_le_bytes();
        let pool_one_id_bytes = 1u64.to_le_bytes();
        let pool_one_bump = self.pool_one.bump;
        let seeds: &[&[u8]] = &[
            POOL_SEED,
            &validator_id_bytes,
            &pool_one_id_bytes,
            &[pool_one_bump],
        ];
        token::transfer(
            CpiContext::new_with_signer(
                self.token_program.to_account_info(),
                token::Transfer {
                    from: self.pool_reward_token_account.to_account_info(),
                    to: self.staker_token_account.to_account_info(),
                    authority: self.pool_one.to_account_info(),
                },
                &[seeds],
            ),
            amount,
        )?;

        msg!("staker {} claimed {} reward tokens", staker_key, amount);
        Ok(())
    }
}
