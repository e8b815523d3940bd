use anchor_lang::prelude::*;

pub mod error;
pub mod instructions;
pub mod state;

use delegated_stake_common::config::ValidatorConfig;
use instructions::*;

declare_id!("De1egSt8keVa1idatorReg1stryProgram11111111");

pub const REGISTRY_SEED: &[u8] = b"registry";
pub const POOL_SEED: &[u8] = b"pool";
pub const STAKER_POOLS_SEED: &[u8] = b"staker_pools";

#[program]
pub mod delegated_stake {
    use super::*;

    pub fn initialize_registry(ctx: Context<InitializeRegistry>, max_validators: u32) -> Result<()> {
        ctx.accounts.process(&ctx.bumps, max_validators)
    }

    /// Register a new validator, per the owner-editable config bounds.
    pub fn add_validator(
        ctx: Context<AddValidator>,
        config: ValidatorConfig,
        manager: Pubkey,
        nfd_app_id: u64,
    ) -> Result<()> {
        ctx.accounts.process(config, manager, nfd_app_id)
    }

    pub fn update_validator_config(
        ctx: Context<UpdateValidatorConfig>,
        validator_id: u64,
        new_config: ValidatorConfig,
    ) -> Result<()> {
        ctx.accounts.process(validator_id, new_config)
    }

    pub fn set_manager(
        ctx: Context<SetManager>,
        validator_id: u64,
        new_manager: Pubkey,
    ) -> Result<()> {
        ctx.accounts.process(validator_id, new_manager)
    }

    pub fn add_pool(ctx: Context<AddPool>, validator_id: u64, pool_id: u64) -> Result<()> {
        ctx.accounts.process(&ctx.bumps, validator_id, pool_id)
    }

    /// Same as `add_pool`, but for a validator's pool #1 when a secondary
    /// reward token is configured; creates the pool's custodial ATA.
    pub fn add_pool_with_reward_token(
        ctx: Context<AddPoolWithRewardToken>,
        validator_id: u64,
        pool_id: u64,
    ) -> Result<()> {
        ctx.accounts.process(&ctx.bumps, validator_id, pool_id)
    }

    pub fn add_stake(
        ctx: Context<AddStake>,
        validator_id: u64,
        pool_id: u64,
        amount: u64,
    ) -> Result<()> {
        ctx.accounts
            .process(&ctx.bumps, validator_id, pool_id, amount)
    }

    pub fn remove_stake(
        ctx: Context<RemoveStake>,
        validator_id: u64,
        pool_id: u64,
        amount: u64,
    ) -> Result<()> {
        ctx.accounts.process(validator_id, pool_id, amount)
    }

    pub fn claim_tokens(ctx: Context<ClaimTokens>, validator_id: u64, pool_id: u64) -> Result<()> {
        ctx.accounts.process(validator_id, pool_id)
    }

    /// Permissionless: any maintainer bot may drive a pool's epoch payout
    /// once its window has elapsed.
    pub fn epoch_balance_update(
        ctx: Context<EpochBalanceUpdate>,
        validator_id: u64,
        pool_id: u64,
        online_stake: u64,
    ) -> Result<()> {
        ctx.accounts.process(validator_id, pool_id, online_stake)
    }

    pub fn go_online(
        ctx: Context<GoOnline>,
        validator_id: u64,
        pool_id: u64,
        keys: ParticipationKeys,
    ) -> Result<()> {
        ctx.accounts.process(validator_id, pool_id, keys)
    }

    pub fn go_offline(ctx: Context<GoOffline>, validator_id: u64, pool_id: u64) -> Result<()> {
        ctx.accounts.process(validator_id, pool_id)
    }

    pub fn update_algod_ver(
        ctx: Context<UpdateAlgodVer>,
        validator_id: u64,
        pool_id: u64,
        version: String,
    ) -> Result<()> {
        ctx.accounts.process(validator_id, pool_id, version)
    }

    pub fn link_to_nfd(
        ctx: Context<LinkToNfd>,
        validator_id: u64,
        nfd_app_id: u64,
    ) -> Result<()> {
        ctx.accounts.process(validator_id, nfd_app_id)
    }

    /// Read-only: reports the chosen pool via `msg!` rather than return data.
    pub fn find_pool_for_staker(
        ctx: Context<FindPoolForStaker>,
        validator_id: u64,
        staker: Pubkey,
        amount: u64,
    ) -> Result<()> {
        ctx.accounts
            .process(ctx.remaining_accounts, validator_id, staker, amount)
    }
}
