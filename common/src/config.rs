//! `ValidatorConfig` and its validation.

use anchor_lang::prelude::*;

use crate::constants::{
    MAX_NODES, MAX_PCT_TO_VALIDATOR, MAX_PAYOUT_MINS, MAX_POOLS_PER_NODE, MIN_PAYOUT_MINS,
    MIN_PCT_TO_VALIDATOR, PROTOCOL_MAX_ALGO_PER_POOL, PROTOCOL_MIN_ENTRY_STAKE,
};
use crate::error::CoreError;

/// Entry-gating parameters, kept as a discriminated variant rather than a
/// bag of optional fields. The gating predicate itself is deliberately
/// outside this core's correctness surface (see `DESIGN.md`); only
/// well-formedness is validated here.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Eq, PartialEq)]
pub enum EntryGating {
    None,
    NfdCreator(u64),
    NfdAppId(u64),
    AssetRequired { asset_ids: [u64; 2], min_balance: u64 },
    AddressAllowList([Pubkey; 4]),
}

impl Default for EntryGating {
    fn default() -> Self {
        EntryGating::None
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Eq, PartialEq)]
pub struct ValidatorConfig {
    pub payout_every_x_mins: u16,
    pub pct_to_validator: u32,
    pub validator_commission_address: Pubkey,
    pub min_entry_stake: u64,
    pub max_algo_per_pool: u64,
    pub pools_per_node: u8,
    pub max_nodes: u8,
    /// 0 means "no secondary reward token configured".
    pub reward_token_id: Pubkey,
    pub reward_per_payout: u64,
    pub entry_gating: EntryGating,
}

impl ValidatorConfig {
    pub fn has_reward_token(&self) -> bool {
        self.reward_token_id != Pubkey::default()
    }

    pub fn max_pools(&self) -> u32 {
        self.max_nodes as u32 * self.pools_per_node as u32
    }
}

/// Validates `config` against the protocol-wide bounds.
/// Returns `Err(InvalidConfig)` on any bound violation, rather than
/// silently clamping it.
pub fn validate_config(config: &ValidatorConfig) -> Result<(), CoreError> {
    if config.payout_every_x_mins < MIN_PAYOUT_MINS || config.payout_every_x_mins > MAX_PAYOUT_MINS
    {
        return Err(CoreError::InvalidConfig);
    }
    if config.pct_to_validator < MIN_PCT_TO_VALIDATOR || config.pct_to_validator > MAX_PCT_TO_VALIDATOR
    {
        return Err(CoreError::InvalidConfig);
    }
    if config.validator_commission_address == Pubkey::default() {
        return Err(CoreError::InvalidConfig);
    }
    if config.min_entry_stake < PROTOCOL_MIN_ENTRY_STAKE {
        return Err(CoreError::InvalidConfig);
    }
    if config.max_algo_per_pool > PROTOCOL_MAX_ALGO_PER_POOL || config.max_algo_per_pool == 0 {
        return Err(CoreError::InvalidConfig);
    }
    if config.pools_per_node == 0 || config.pools_per_node as usize > MAX_POOLS_PER_NODE {
        return Err(CoreError::InvalidConfig);
    }
    if config.max_nodes == 0 || config.max_nodes as usize > MAX_NODES {
        return Err(CoreError::InvalidConfig);
    }
    if !config.has_reward_token() && config.reward_per_payout != 0 {
        return Err(CoreError::InvalidConfig);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ValidatorConfig {
        ValidatorConfig {
            payout_every_x_mins: 60,
            pct_to_validator: 50_000,
            validator_commission_address: Pubkey::new_unique(),
            min_entry_stake: PROTOCOL_MIN_ENTRY_STAKE,
            max_algo_per_pool: 1_000_000_000_000,
            pools_per_node: 2,
            max_nodes: 4,
            reward_token_id: Pubkey::default(),
            reward_per_payout: 0,
            entry_gating: EntryGating::None,
        }
    }

    #[test]
    fn accepts_well_formed_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn rejects_zero_commission_address() {
        let mut c = valid_config();
        c.validator_commission_address = Pubkey::default();
        assert_eq!(validate_config(&c), Err(CoreError::InvalidConfig));
    }

    #[test]
    fn rejects_pct_out_of_bounds() {
        let mut c = valid_config();
        c.pct_to_validator = MIN_PCT_TO_VALIDATOR - 1;
        assert_eq!(validate_config(&c), Err(CoreError::InvalidConfig));

        let mut c = valid_config();
        c.pct_to_validator = MAX_PCT_TO_VALIDATOR + 1;
        assert_eq!(validate_config(&c), Err(CoreError::InvalidConfig));
    }

    #[test]
    fn rejects_pools_per_node_out_of_bounds() {
        let mut c = valid_config();
        c.pools_per_node = 0;
        assert_eq!(validate_config(&c), Err(CoreError::InvalidConfig));

        let mut c = valid_config();
        c.pools_per_node = (MAX_POOLS_PER_NODE + 1) as u8;
        assert_eq!(validate_config(&c), Err(CoreError::InvalidConfig));
    }

    #[test]
    fn rejects_reward_per_payout_without_reward_token() {
        let mut c = valid_config();
        c.reward_per_payout = 100;
        assert_eq!(validate_config(&c), Err(CoreError::InvalidConfig));
    }
}
