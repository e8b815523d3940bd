//! Registry-level instructions: `initialize`, `addValidator`,
//! plus owner-editable config.

use std::collections::BTreeMap;

use anchor_lang::prelude::*;

use delegated_stake_common::config::{validate_config, ValidatorConfig};
use delegated_stake_common::constants::{add_validator_mbr, MAX_NODES, MAX_POOLS};
use delegated_stake_common::error::CoreError;
use delegated_stake_common::state::{PoolSummary, ValidatorState};

use crate::error::DelegatedStakeError;
use crate::state::{Registry, Validator, DISCRIMINATOR};
use crate::REGISTRY_SEED;

/// Core bookkeeping behind `addValidator`: capacity check, id assignment,
/// record push. Split out from `process()` so it can run without the MBR
/// transfer's `Rent`/CPI requirements.
pub(crate) fn register_validator(
    registry: &mut Registry,
    owner: Pubkey,
    manager: Pubkey,
    nfd_app_id: u64,
    config: ValidatorConfig,
) -> std::result::Result<u64, CoreError> {
    if registry.validators.len() as u32 >= registry.max_validators {
        return Err(CoreError::PoolCapExceeded);
    }
    let id = registry.num_validators + 1;
    registry.validators.push(Validator {
        id,
        owner,
        manager,
        nfd_app_id,
        config,
        state: ValidatorState::default(),
        nodes: [0u8; MAX_NODES],
        pools: vec![PoolSummary::default(); MAX_POOLS],
    });
    registry.num_validators = id;
    Ok(id)
}

/// Core check behind `updateValidatorConfig`: only the owner may update.
pub(crate) fn apply_config_update(
    validator: &mut Validator,
    owner: Pubkey,
    new_config: ValidatorConfig,
) -> std::result::Result<(), CoreError> {
    if validator.owner != owner {
        return Err(CoreError::NotOwner);
    }
    validator.config = new_config;
    Ok(())
}

/// Core check behind `setManager`: only the owner may reassign the manager,
/// and the new manager may not be the zero address.
pub(crate) fn apply_set_manager(
    validator: &mut Validator,
    owner: Pubkey,
    new_manager: Pubkey,
) -> std::result::Result<(), CoreError> {
    if new_manager == Pubkey::default() {
        return Err(CoreError::InvalidConfig);
    }
    if validator.owner != owner {
        return Err(CoreError::NotOwner);
    }
    validator.manager = new_manager;
    Ok(())
}

#[derive(Accounts)]
#[instruction(max_validators: u32)]
pub struct InitializeRegistry<'info> {
    #[account(
        init,
        payer = payer,
        space = Registry::space(max_validators),
        seeds = [REGISTRY_SEED],
        bump,
    )]
    pub registry: Account<'info, Registry>,

    /// Where a cap-triggered payout's redirected reward lands.
    /// CHECK: stored verbatim, never read or deserialized by this program.
    pub fee_sink: UncheckedAccount<'info>,

    #[account(mut)]
    pub payer: Signer<'info>,

    pub system_program: Program<'info, System>,
}

impl<'info> InitializeRegistry<'info> {
    pub fn process(&mut self, bumps: &BTreeMap<String, u8>, max_validators: u32) -> Result<()> {
        let registry = &mut self.registry;
        registry.bump = *bumps.get("registry").unwrap();
        registry.num_validators = 0;
        registry.max_validators = max_validators;
        registry.validators = Vec::new();
        registry.fee_sink = self.fee_sink.key();
        msg!("registry initialized, max_validators={}", max_validators);
        Ok(())
    }
}

#[derive(Accounts)]
pub struct AddValidator<'info> {
    #[account(mut, seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    pub owner: Signer<'info>,

    #[account(mut)]
    pub payer: Signer<'info>,

    pub system_program: Program<'info, System>,
}

impl<'info> AddValidator<'info> {
    pub fn process(&mut self, config: ValidatorConfig, manager: Pubkey, nfd_app_id: u64) -> Result<()> {
        validate_config(&config).map_err(DelegatedStakeError::from)?;
        require!(
            manager != Pubkey::default(),
            DelegatedStakeError::InvalidConfig
        );
        require!(
            (self.registry.validators.len() as u32) < self.registry.max_validators,
            DelegatedStakeError::PoolCapExceeded
        );

        let required_bytes = DISCRIMINATOR + Validator::SIZE;
        let rent = Rent::get()?;
        let mbr = add_validator_mbr(&rent, required_bytes);
        anchor_lang::system_program::transfer(
            CpiContext::new(
                self.system_program.to_account_info(),
                anchor_lang::system_program::Transfer {
                    from: self.payer.to_account_info(),
                    to: self.registry.to_account_info(),
                },
            ),
            mbr,
        )?;

        let owner = self.owner.key();
        let id = register_validator(&mut self.registry, owner, manager, nfd_app_id, config)
            .map_err(DelegatedStakeError::from)?;
        msg!("validator {} added, owner={}", id, owner);
        Ok(())
    }
}

#[derive(Accounts)]
pub struct UpdateValidatorConfig<'info> {
    #[account(mut, seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    pub owner: Signer<'info>,
}

impl<'info> UpdateValidatorConfig<'info> {
    pub fn process(&mut self, validator_id: u64, new_config: ValidatorConfig) -> Result<()> {
        validate_config(&new_config).map_err(DelegatedStakeError::from)?;
        let owner = self.owner.key();
        let validator = self
            .registry
            .get_validator_mut(validator_id)
            .map_err(DelegatedStakeError::from)?;
        apply_config_update(validator, owner, new_config).map_err(DelegatedStakeError::from)?;
        msg!("validator {} config updated", validator_id);
        Ok(())
    }
}

#[derive(Accounts)]
pub struct SetManager<'info> {
    #[account(mut, seeds = [REGISTRY_SEED], bump = registry.bump)]
    pub registry: Account<'info, Registry>,

    pub owner: Signer<'info>,
}

impl<'info> SetManager<'info> {
    pub fn process(&mut self, validator_id: u64, new_manager: Pubkey) -> Result<()> {
        let owner = self.owner.key();
        let validator = self
            .registry
            .get_validator_mut(validator_id)
            .map_err(DelegatedStakeError::from)?;
        apply_set_manager(validator, owner, new_manager).map_err(DelegatedStakeError::from)?;
        msg!("validator {} manager set to {}", validator_id, new_manager);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::blank_validator;

    fn blank_registry(max_validators: u32) -> Registry {
        Registry {
            bump: 0,
            num_validators: 0,
            max_validators,
            fee_sink: Pubkey::new_unique(),
            validators: Vec::new(),
        }
    }

    fn sample_config() -> ValidatorConfig {
        blank_validator().config
    }

    #[test]
    fn register_validator_assigns_sequential_ids() {
        let mut registry = blank_registry(10);
        let owner = Pubkey::new_unique();
        let first = register_validator(&mut registry, owner, Pubkey::new_unique(), 0, sample_config())
            .unwrap();
        let second = register_validator(&mut registry, owner, Pubkey::new_unique(), 0, sample_config())
            .unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(registry.num_validators, 2);
        assert_eq!(registry.validators.len(), 2);
    }

    #[test]
    fn register_validator_rejects_once_at_capacity() {
        let mut registry = blank_registry(1);
        register_validator(
            &mut registry,
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            0,
            sample_config(),
        )
        .unwrap();
        let err = register_validator(
            &mut registry,
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            0,
            sample_config(),
        )
        .unwrap_err();
        assert_eq!(err, CoreError::PoolCapExceeded);
    }

    #[test]
    fn apply_config_update_rejects_non_owner() {
        let mut validator = blank_validator();
        let err =
            apply_config_update(&mut validator, Pubkey::new_unique(), validator.config.clone())
                .unwrap_err();
        assert_eq!(err, CoreError::NotOwner);
    }

    #[test]
    fn apply_config_update_applies_for_owner() {
        let mut validator = blank_validator();
        let mut new_config = validator.config.clone();
        new_config.pct_to_validator = 75_000;
        let owner = validator.owner;
        apply_config_update(&mut validator, owner, new_config.clone()).unwrap();
        assert_eq!(validator.config.pct_to_validator, 75_000);
    }

    #[test]
    fn apply_set_manager_rejects_zero_address() {
        let mut validator = blank_validator();
        let owner = validator.owner;
        let err = apply_set_manager(&mut validator, owner, Pubkey::default()).unwrap_err();
        assert_eq!(err, CoreError::InvalidConfig);
    }

    #[test]
    fn apply_set_manager_rejects_non_owner() {
        let mut validator = blank_validator();
        let err =
            apply_set_manager(&mut validator, Pubkey::new_unique(), Pubkey::new_unique())
                .unwrap_err();
        assert_eq!(err, CoreError::NotOwner);
    }

    #[test]
    fn apply_set_manager_applies_for_owner() {
        let mut validator = blank_validator();
        let owner = validator.owner;
        let new_manager = Pubkey::new_unique();
        apply_set_manager(&mut validator, owner, new_manager).unwrap();
        assert_eq!(validator.manager, new_manager);
    }
}
