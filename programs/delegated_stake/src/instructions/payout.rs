//! `epochBalanceUpdate` — the Anchor wrapper around
//! `delegated_stake_common::payout::run_epoch_payout`.

use anchor_lang::prelude::*;
use anchor_lang::AccountDeserialize;
use anchor_spl::token::TokenAccount;

use delegated_stake_common::constants::RATIO_DENOMINATOR;
use delegated_stake_common::error::CoreError;
use delegated_stake_common::math::mul_div;
use delegated_stake_common::payout::{
    max_allowed_stake, run_epoch_payout, PayoutInput, PayoutOutcome, TokenPayoutInput,
};
use delegated_stake_common::pool_key::{authenticate, PoolKey};

use crate::error::DelegatedStakeError;
use crate::state::{Pool, Registry, Validator};
use crate::{POOL_SEED, REGISTRY_SEED};

/// Folds a `run_epoch_payout` outcome back onto the pool ledger and the
/// validator's aggregate counters. Kept separate from `process()` so the
/// bookkeeping can be exercised without `Clock`/`Rent`/CPI syscalls.
pub(crate) fn apply_payout_outcome(
    pool: &mut Pool,
    validator: &mut Validator,
    pool_id: u64,
    outcome: &PayoutOutcome,
) -> std::result::Result<(), CoreError> {
    pool.last_payout = outcome.new_last_payout;
    for credit in &outcome.credits {
        let slot = &mut pool.ledger[credit.ledger_index];
        slot.balance = slot
            .balance
            .checked_add(credit.algo_credit)
            .ok_or(CoreError::ArithmeticError)?;
        slot.total_rewarded = slot.total_rewarded.saturating_add(credit.algo_credit);
        slot.reward_token_balance = slot
            .reward_token_balance
            .saturating_add(credit.token_credit);
    }
    pool.staked = outcome.new_total_algo_staked;

    validator.state.total_algo_staked = validator
        .state
        .total_algo_staked
        .checked_add(outcome.increased_stake)
        .ok_or(CoreError::ArithmeticError)?;
    if outcome.token_paid_out > 0 {
        validator.state.reward_token_held_back = validator
            .state
            .reward_token_held_back
            .saturating_add(outcome.token_paid_out);
    }
    validator.pool_summary_mut(pool_id)?.total_algo_staked = pool.staked;
    Ok(())
}

#[derive(Accounts)]
#[instruction(validator_id: u64, pool_id: u64)]
pub struct EpochBalanceUpdate<'info> {
    #[account(mut, seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    #[account(
        mut,
        seeds = [POOL_SEED, &validator_id.to_le_bytes(), &pool_id.to_le_bytes()],
        bump = pool.bump,
    )]
    pub pool: Account<'info, Pool>,

    /// Pool #1 of the same validator, read for its reward-token balance.
    /// When `pool_id == 1` the client passes the same account as `pool`.
    #[account(
        seeds = [POOL_SEED, &validator_id.to_le_bytes(), &1u64.to_le_bytes()],
        bump = pool_one.bump,
    )]
    pub pool_one: Account<'info, Pool>,

    /// CHECK: only read when `pool_one.reward_token_account != default`.
    pub pool_one_reward_token_account: UncheckedAccount<'info>,

    /// CHECK: address matches `validator.config.validator_commission_address`.
    #[account(mut)]
    pub validator_commission_account: UncheckedAccount<'info>,

    /// CHECK: address matches `registry.fee_sink`.
    #[account(mut, address = registry.fee_sink)]
    pub fee_sink: UncheckedAccount<'info>,

    pub caller: Signer<'info>,

    pub system_program: Program<'info, System>,
}

impl<'info> EpochBalanceUpdate<'info> {
    pub fn process(
        &mut self,
        validator_id: u64,
        pool_id: u64,
        online_stake: u64,
    ) -> Result<()> {
        let claimed = PoolKey {
            validator_id,
            pool_id,
            pool_app_id: self.pool.key(),
        };
        {
            let validator = self
                .registry
                .get_validator(validator_id)
                .map_err(DelegatedStakeError::from)?;
            authenticate(
                &claimed,
                validator.state.num_pools as u64,
                &validator.pools,
                &self.pool.key(),
                self.pool.validator_id,
                self.pool.pool_id,
            )
            .map_err(DelegatedStakeError::from)?;
            require!(
                validator.config.validator_commission_address
                    == self.validator_commission_account.key(),
                DelegatedStakeError::PaymentWrongReceiver
            );
        }

        let validator = self
            .registry
            .get_validator(validator_id)
            .map_err(DelegatedStakeError::from)?;

        let token = if validator.config.reward_token_id != Pubkey::default() {
            require!(
                self.pool_one.reward_token_account == self.pool_one_reward_token_account.key(),
                DelegatedStakeError::PoolKeyMismatch
            );
            let data = self.pool_one_reward_token_account.try_borrow_data()?;
            let token_account = TokenAccount::try_deserialize(&mut &data[..])?;
            let pool_summary = validator
                .pools
                .get((pool_id - 1) as usize)
                .ok_or(DelegatedStakeError::PoolKeyMismatch)?;
            let pool_pct_of_whole = if validator.state.total_algo_staked == 0 {
                0
            } else {
                mul_div(
                    pool_summary.total_algo_staked,
                    RATIO_DENOMINATOR,
                    validator.state.total_algo_staked,
                )
                .map_err(DelegatedStakeError::from)?
            };
            Some(TokenPayoutInput {
                token_avail_global: token_account
                    .amount
                    .saturating_sub(validator.state.reward_token_held_back),
                reward_per_payout: validator.config.reward_per_payout,
                pool_pct_of_whole,
            })
        } else {
            None
        };

        let pool_min_balance = Rent::get()?.minimum_balance(self.pool.to_account_info().data_len());
        let max_allowed = max_allowed_stake(online_stake).map_err(DelegatedStakeError::from)?;

        let input = PayoutInput {
            now: Clock::get()?.unix_timestamp,
            last_payout: self.pool.last_payout,
            payout_every_x_mins: validator.config.payout_every_x_mins,
            pct_to_validator: validator.config.pct_to_validator,
            pool_balance: self.pool.to_account_info().lamports(),
            pool_min_balance,
            total_algo_staked: self.pool.staked,
            ledger: &self.pool.ledger,
            validator_total_algo_staked: validator.state.total_algo_staked,
            max_allowed_stake: max_allowed,
            token,
        };
        let outcome = run_epoch_payout(&input).map_err(DelegatedStakeError::from)?;

        let validator = self
            .registry
            .get_validator_mut(validator_id)
            .map_err(DelegatedStakeError::from)?;
        apply_payout_outcome(&mut self.pool, validator, pool_id, &outcome)
            .map_err(DelegatedStakeError::from)?;

        let validator_id_bytes = validator_id.to_le_bytes();
        let pool_id_bytes = pool_id.to_le_bytes();
        let pool_bump = self.pool.bump;
        let seeds: &[&[u8]] = &[POOL_SEED, &validator_id_bytes, &pool_id_bytes, &[pool_bump]];

        if outcome.validator_pay > 0 {
            anchor_lang::system_program::transfer(
                CpiContext::new_with_signer(
                    self.system_program.to_account_info(),
                    anchor_lang::system_program::Transfer {
                        from: self.pool.to_account_info(),
                        to: self.validator_commission_account.to_account_info(),
                    },
                    &[seeds],
                ),
                outcome.validator_pay,
            )?;
        }
        if outcome.send_reward_to_fee_sink && outcome.fee_sink_amount > 0 {
            anchor_lang::system_program::transfer(
                CpiContext::new_with_signer(
                    self.system_program.to_account_info(),
                    anchor_lang::system_program::Transfer {
                        from: self.pool.to_account_info(),
                        to: self.fee_sink.to_account_info(),
                    },
                    &[seeds],
                ),
                outcome.fee_sink_amount,
            )?;
        }

        msg!(
            "epoch payout for pool {}/{}: validator_pay={} increased_stake={} token_paid_out={}",
            validator_id,
            pool_id,
            outcome.validator_pay,
            outcome.increased_stake,
            outcome.token_paid_out
        );
        Ok(())
    }
}
