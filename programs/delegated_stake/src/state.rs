//! Anchor account wrappers around `delegated_stake_common`'s plain state.
//!
//! Persistent account shapes live here, the map-like operations they need
//! live beside them, and the actual business rules live in the instruction
//! handlers.
//!
//! `pools` and `ledger` below are `Vec`s pre-filled to a fixed capacity at
//! creation time rather than `[T; N]` arrays — borsh's fixed-size array impl
//! only covers small `N`, so any collection that can exceed ~32 entries is a
//! pre-sized `Vec`, never a native array.

use anchor_lang::prelude::*;

use delegated_stake_common::config::ValidatorConfig;
use delegated_stake_common::constants::{
    MAX_NODES, MAX_POOLS, MAX_POOLS_PER_STAKER, MAX_STAKERS_PER_POOL, POOL_KEY_SIZE,
    POOL_SUMMARY_SIZE, STAKED_INFO_SIZE,
};
use delegated_stake_common::error::CoreError;
use delegated_stake_common::state::{PoolSummary, StakedInfo, StakerPoolSet, ValidatorState};

pub const DISCRIMINATOR: usize = 8;

const PUBKEY: usize = 32;

/// Serialized width of `ValidatorState` (`u32 + u64 + u64 + u64`).
const VALIDATOR_STATE_SIZE: usize = 4 + 8 + 8 + 8;

/// Serialized width of `ValidatorConfig`. The `entry_gating` enum's widest
/// variant, `AddressAllowList([Pubkey; 4])`, sets the enum's overall width.
const VALIDATOR_CONFIG_SIZE: usize = 2 // payout_every_x_mins
    + 4 // pct_to_validator
    + PUBKEY // validator_commission_address
    + 8 // min_entry_stake
    + 8 // max_algo_per_pool
    + 1 // pools_per_node
    + 1 // max_nodes
    + PUBKEY // reward_token_id
    + 8 // reward_per_payout
    + 1 // entry_gating discriminant
    + 4 * PUBKEY; // AddressAllowList([Pubkey; 4])

/// A validator's full record: `{id, owner, manager,
/// nfdAppId, config, state, nodes[MAX_NODES], pools[MAX_POOLS]}`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug)]
pub struct Validator {
    pub id: u64,
    pub owner: Pubkey,
    pub manager: Pubkey,
    pub nfd_app_id: u64,
    pub config: ValidatorConfig,
    pub state: ValidatorState,
    /// Number of pools currently assigned to each node slot.
    pub nodes: [u8; MAX_NODES],
    /// Pre-filled to `MAX_POOLS` entries at `add_validator` time; empty
    /// slots carry the zero `PoolSummary`.
    pub pools: Vec<PoolSummary>,
}

impl Validator {
    pub const SIZE: usize = 8 // id
        + PUBKEY // owner
        + PUBKEY // manager
        + 8 // nfd_app_id
        + VALIDATOR_CONFIG_SIZE
        + VALIDATOR_STATE_SIZE
        + MAX_NODES // nodes, one byte each
        + 4 // pools vec length prefix
        + MAX_POOLS * POOL_SUMMARY_SIZE;

    pub fn is_owner_or_manager(&self, signer: &Pubkey) -> bool {
        signer == &self.owner || signer == &self.manager
    }

    pub fn pool_summary_mut(&mut self, pool_id: u64) -> std::result::Result<&mut PoolSummary, CoreError> {
        self.pools
            .get_mut((pool_id - 1) as usize)
            .filter(|s| s.pool_app_id != Pubkey::default())
            .ok_or(CoreError::PoolKeyMismatch)
    }

    /// Like `pool_summary_mut`, but returns the slot regardless of whether
    /// it has been assigned yet. Only `add_pool`/`add_pool_with_reward_token`
    /// should use this, to initialize the slot `next_pool_id` just reserved;
    /// every other call site wants the filtered, already-assigned lookup.
    pub fn pool_summary_slot_mut(
        &mut self,
        pool_id: u64,
    ) -> std::result::Result<&mut PoolSummary, CoreError> {
        self.pools
            .get_mut((pool_id - 1) as usize)
            .ok_or(CoreError::PoolKeyMismatch)
    }

    /// Assigns the next pool to the least-loaded node under `poolsPerNode`,
    /// per the validator's `nodes[MAX_NODES]` bound. Returns the chosen index.
    pub fn assign_node(&mut self) -> std::result::Result<usize, CoreError> {
        let pools_per_node = self.config.pools_per_node as u8;
        let max_nodes = self.config.max_nodes as usize;
        for (idx, count) in self.nodes.iter_mut().enumerate().take(max_nodes) {
            if *count < pools_per_node {
                *count += 1;
                return Ok(idx);
            }
        }
        Err(CoreError::PoolCapExceeded)
    }

    /// The first empty `PoolSummary` slot, i.e. the next `pool_id` (1-based).
    pub fn next_pool_id(&self) -> std::result::Result<u64, CoreError> {
        self.pools
            .iter()
            .position(|s| s.pool_app_id == Pubkey::default())
            .map(|idx| (idx + 1) as u64)
            .ok_or(CoreError::PoolCapExceeded)
    }
}

/// The registry singleton. Space is reserved up front for
/// `max_validators` records at `initialize_registry`, matching the
/// teacher's `Initialize::required_bytes` pattern.
#[account]
#[derive(Debug)]
pub struct Registry {
    pub bump: u8,
    pub num_validators: u64,
    pub max_validators: u32,
    /// Where a cap-triggered payout's redirected reward is sent.
    pub fee_sink: Pubkey,
    pub validators: Vec<Validator>,
}

impl Registry {
    /// Bytes needed to hold `max_validators` fully-populated records,
    /// summing each field's worst-case serialized size up front.
    pub fn space(max_validators: u32) -> usize {
        DISCRIMINATOR
            + 1 // bump
            + 8 // num_validators
            + 4 // max_validators
            + PUBKEY // fee_sink
            + 4 // validators vec length prefix
            + max_validators as usize * Validator::SIZE
    }

    pub fn get_validator(&self, validator_id: u64) -> std::result::Result<&Validator, CoreError> {
        self.validators
            .iter()
            .find(|v| v.id == validator_id)
            .ok_or(CoreError::PoolKeyMismatch)
    }

    pub fn get_validator_mut(
        &mut self,
        validator_id: u64,
    ) -> std::result::Result<&mut Validator, CoreError> {
        self.validators
            .iter_mut()
            .find(|v| v.id == validator_id)
            .ok_or(CoreError::PoolKeyMismatch)
    }
}

/// One staking pool. The account's own lamport balance
/// is the `B` input to the payout engine; `ledger` is the pool-local staker
/// vector, pre-filled to capacity `MAX_STAKERS_PER_POOL = 80`.
#[account]
#[derive(Debug)]
pub struct Pool {
    pub bump: u8,
    pub registry: Pubkey,
    pub validator_id: u64,
    pub pool_id: u64,
    pub min_entry_stake: u64,
    pub max_stake: u64,
    pub num_stakers: u32,
    pub staked: u64,
    pub last_payout: i64,
    /// Whether this pool's stake account currently participates in
    /// consensus (`goOnline`/`goOffline`).
    pub online: bool,
    /// Set only for pool #1 of a validator with a reward token configured;
    /// the associated token account this pool custodies that token in.
    pub reward_token_account: Pubkey,
    pub algod_ver_len: u8,
    pub algod_ver: [u8; 64],
    pub ledger: Vec<StakedInfo>,
}

impl Pool {
    pub const SIZE: usize = DISCRIMINATOR
        + 1 // bump
        + PUBKEY // registry
        + 8 // validator_id
        + 8 // pool_id
        + 8 // min_entry_stake
        + 8 // max_stake
        + 4 // num_stakers
        + 8 // staked
        + 8 // last_payout
        + 1 // online
        + PUBKEY // reward_token_account
        + 1 // algod_ver_len
        + 64 // algod_ver
        + 4 // ledger vec length prefix
        + MAX_STAKERS_PER_POOL * STAKED_INFO_SIZE;

    pub fn is_primary(&self) -> bool {
        self.pool_id == 1
    }
}

/// The per-staker pool membership ledger.
#[account]
#[derive(Debug)]
pub struct StakerPoolSetAccount {
    pub bump: u8,
    pub owner: Pubkey,
    pub inner: StakerPoolSet,
}

impl StakerPoolSetAccount {
    pub const SIZE: usize = DISCRIMINATOR
        + 1 // bump
        + PUBKEY // owner
        + MAX_POOLS_PER_STAKER * POOL_KEY_SIZE;
}

pub const _ASSERT_CAPACITIES: (usize, usize, usize) = (MAX_POOLS, MAX_STAKERS_PER_POOL, MAX_NODES);

/// A validator record with protocol-valid defaults, shared by this module's
/// tests and the other instruction test modules that need one to exercise
/// the handlers against.
#[cfg(test)]
pub(crate) fn blank_validator() -> Validator {
    Validator {
        id: 1,
        owner: Pubkey::new_unique(),
        manager: Pubkey::new_unique(),
        nfd_app_id: 0,
        config: ValidatorConfig {
            payout_every_x_mins: 60,
            pct_to_validator: 50_000,
            validator_commission_address: Pubkey::new_unique(),
            min_entry_stake: 1_000_000,
            max_algo_per_pool: 1_000_000_000_000,
            pools_per_node: 2,
            max_nodes: 3,
            reward_token_id: Pubkey::default(),
            reward_per_payout: 0,
            entry_gating: Default::default(),
        },
        state: ValidatorState::default(),
        nodes: [0u8; MAX_NODES],
        pools: vec![PoolSummary::default(); MAX_POOLS],
    }
}

/// A pool record with protocol-valid defaults, mirroring `blank_validator`.
#[cfg(test)]
pub(crate) fn blank_pool() -> Pool {
    Pool {
        bump: 0,
        registry: Pubkey::default(),
        validator_id: 1,
        pool_id: 1,
        min_entry_stake: 1_000_000,
        max_stake: 1_000_000_000_000,
        num_stakers: 0,
        staked: 0,
        last_payout: 0,
        online: false,
        reward_token_account: Pubkey::default(),
        algod_ver_len: 0,
        algod_ver: [0u8; 64],
        ledger: vec![StakedInfo::default(); MAX_STAKERS_PER_POOL],
    }
}
