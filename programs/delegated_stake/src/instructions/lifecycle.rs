//! Opaque-effect instructions: `goOnline`/`goOffline`,
//! `updateAlgodVer`, `linkToNFD`. These log the effect and enforce the
//! owner/manager authorization, without performing the
//! underlying external action (participation key registration, NFD
//! resolution), which are treated as external collaborators.

use anchor_lang::prelude::*;

use delegated_stake_common::error::CoreError;

use crate::error::DelegatedStakeError;
use crate::instructions::stake::authenticate_pool;
use crate::state::{Pool, Registry, Validator};
use crate::{POOL_SEED, REGISTRY_SEED};

pub(crate) fn apply_go_online(
    validator: &Validator,
    pool: &mut Pool,
    caller: Pubkey,
) -> std::result::Result<(), CoreError> {
    if !validator.is_owner_or_manager(&caller) {
        return Err(CoreError::NotOwnerOrManager);
    }
    pool.online = true;
    Ok(())
}

pub(crate) fn apply_go_offline(
    validator: &Validator,
    pool: &mut Pool,
    caller: Pubkey,
    registry_key: Pubkey,
) -> std::result::Result<(), CoreError> {
    if !(validator.is_owner_or_manager(&caller) || caller == registry_key) {
        return Err(CoreError::NotOwnerOrManager);
    }
    pool.online = false;
    Ok(())
}

pub(crate) fn apply_update_algod_ver(
    validator: &Validator,
    pool: &mut Pool,
    caller: Pubkey,
    version: &str,
) -> std::result::Result<(), CoreError> {
    if !validator.is_owner_or_manager(&caller) {
        return Err(CoreError::NotOwnerOrManager);
    }
    let bytes = version.as_bytes();
    if bytes.len() > pool.algod_ver.len() {
        return Err(CoreError::InvalidConfig);
    }
    pool.algod_ver = [0u8; 64];
    pool.algod_ver[..bytes.len()].copy_from_slice(bytes);
    pool.algod_ver_len = bytes.len() as u8;
    Ok(())
}

pub(crate) fn apply_link_to_nfd(
    validator: &mut Validator,
    caller: Pubkey,
    nfd_app_id: u64,
) -> std::result::Result<(), CoreError> {
    if !validator.is_owner_or_manager(&caller) {
        return Err(CoreError::NotOwnerOrManager);
    }
    validator.nfd_app_id = nfd_app_id;
    Ok(())
}

/// One pool's participation-key material, passed through verbatim to the
/// (opaque, out-of-scope) platform effect and not otherwise interpreted.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug)]
pub struct ParticipationKeys {
    pub vote_pk: [u8; 32],
    pub selection_pk: [u8; 32],
    pub state_proof_pk: [u8; 48],
    pub vote_first: u64,
    pub vote_last: u64,
    pub vote_key_dilution: u64,
}

#[derive(Accounts)]
#[instruction(validator_id: u64, pool_id: u64)]
pub struct GoOnline<'info> {
    #[account(seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    #[account(
        mut,
        seeds = [POOL_SEED, &validator_id.to_le_bytes(), &pool_id.to_le_bytes()],
        bump = pool.bump,
    )]
    pub pool: Account<'info, Pool>,

    pub owner_or_manager: Signer<'info>,
}

impl<'info> GoOnline<'info> {
    pub fn process(
        &mut self,
        validator_id: u64,
        pool_id: u64,
        keys: ParticipationKeys,
    ) -> Result<()> {
        authenticate_pool(&self.registry, &self.pool, validator_id, pool_id)?;
        let validator = self
            .registry
            .get_validator(validator_id)
            .map_err(DelegatedStakeError::from)?;
        apply_go_online(validator, &mut self.pool, self.owner_or_manager.key())
            .map_err(DelegatedStakeError::from)?;
        msg!(
            "pool {}/{} going online, vote_first={} vote_last={} dilution={}",
            validator_id,
            pool_id,
            keys.vote_first,
            keys.vote_last,
            keys.vote_key_dilution
        );
        Ok(())
    }
}

#[derive(Accounts)]
#[instruction(validator_id: u64, pool_id: u64)]
pub struct GoOffline<'info> {
    #[account(seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    #[account(
        mut,
        seeds = [POOL_SEED, &validator_id.to_le_bytes(), &pool_id.to_le_bytes()],
        bump = pool.bump,
    )]
    pub pool: Account<'info, Pool>,

    /// Owner, manager, or the registry itself (to allow pool migration).
    /// Migration is not implemented in this core (Non-goal: automated
    /// rebalancing between pools), so in practice this is always the
    /// validator's owner or manager; the registry-as-caller path is
    /// reserved for a future migration instruction, per spec.md's §4.2.
    pub caller: Signer<'info>,
}

impl<'info> GoOffline<'info> {
    pub fn process(&mut self, validator_id: u64, pool_id: u64) -> Result<()> {
        authenticate_pool(&self.registry, &self.pool, validator_id, pool_id)?;
        let registry_key = self.registry.key();
        let validator = self
            .registry
            .get_validator(validator_id)
            .map_err(DelegatedStakeError::from)?;
        let caller = self.caller.key();
        apply_go_offline(validator, &mut self.pool, caller, registry_key)
            .map_err(DelegatedStakeError::from)?;
        msg!("pool {}/{} going offline", validator_id, pool_id);
        Ok(())
    }
}

#[derive(Accounts)]
#[instruction(validator_id: u64, pool_id: u64)]
pub struct UpdateAlgodVer<'info> {
    #[account(seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    #[account(
        mut,
        seeds = [POOL_SEED, &validator_id.to_le_bytes(), &pool_id.to_le_bytes()],
        bump = pool.bump,
    )]
    pub pool: Account<'info, Pool>,

    pub owner_or_manager: Signer<'info>,
}

impl<'info> UpdateAlgodVer<'info> {
    pub fn process(&mut self, validator_id: u64, pool_id: u64, version: String) -> Result<()> {
        authenticate_pool(&self.registry, &self.pool, validator_id, pool_id)?;
        let validator = self
            .registry
            .get_validator(validator_id)
            .map_err(DelegatedStakeError::from)?;
        apply_update_algod_ver(
            validator,
            &mut self.pool,
            self.owner_or_manager.key(),
            &version,
        )
        .map_err(DelegatedStakeError::from)?;
        msg!("pool {} algod version set to {}", self.pool.pool_id, version);
        Ok(())
    }
}

#[derive(Accounts)]
pub struct LinkToNfd<'info> {
    #[account(mut, seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    pub owner_or_manager: Signer<'info>,
}

impl<'info> LinkToNfd<'info> {
    pub fn process(&mut self, validator_id: u64, nfd_app_id: u64) -> Result<()> {
        let caller = self.owner_or_manager.key();
        let validator = self
            .registry
            .get_validator_mut(validator_id)
            .map_err(DelegatedStakeError::from)?;
        apply_link_to_nfd(validator, caller, nfd_app_id).map_err(DelegatedStakeError::from)?;
        msg!("validator {} linked to NFD {}", validator_id, nfd_app_id);
        Ok(())
    }
}
