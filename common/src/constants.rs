//! Protocol-wide numeric constants.

use anchor_lang::prelude::Rent;

/// Number of blocks the platform waits before a stake change is visible to consensus.
pub const STAKE_VISIBILITY_DELAY_BLOCKS: u64 = 320;

/// Average block time, expressed in tenths of a second (28 == 2.8s).
pub const AVG_BLOCK_TIME_TENTHS: u64 = 28;

/// `computedEntryTime = currentTimestamp + (STAKE_VISIBILITY_DELAY_BLOCKS *
/// AVG_BLOCK_TIME_TENTHS / 10)`: the timestamp at which a stake addition
/// becomes visible to consensus and therefore starts earning epoch rewards.
/// Applied on every `addStake`, new entry or top-up alike, per spec.md §4.2.
pub fn computed_entry_time(now: i64) -> i64 {
    now + (STAKE_VISIBILITY_DELAY_BLOCKS * AVG_BLOCK_TIME_TENTHS / 10) as i64
}

pub const MAX_NODES: usize = 12;
pub const MAX_POOLS_PER_NODE: usize = 4;
pub const MAX_POOLS: usize = MAX_NODES * MAX_POOLS_PER_NODE;

pub const MAX_STAKERS_PER_POOL: usize = 80;

/// Up to this many distinct pools a single staker may participate in at once.
pub const MAX_POOLS_PER_STAKER: usize = 4;

pub const MIN_PAYOUT_MINS: u16 = 1;
pub const MAX_PAYOUT_MINS: u16 = 60 * 24 * 30;

pub const MIN_PCT_TO_VALIDATOR: u32 = 10_000;
pub const MAX_PCT_TO_VALIDATOR: u32 = 1_000_000;

/// Denominator for `pctToValidator` and for commission math generally.
pub const COMMISSION_DENOMINATOR: u64 = 1_000_000;

/// Denominator for the per-staker time-in-epoch weight (tenths of a percent).
pub const TIME_PERCENT_DENOMINATOR: u64 = 1_000;

/// Denominator for `PoolTokenPayoutRatio::pool_pct_of_whole`.
pub const RATIO_DENOMINATOR: u64 = 1_000_000;

/// Maximum fraction of total online stake a single validator may hold before
/// its rewards are redirected to the fee sink, in tenths of a percent.
pub const MAX_VALIDATOR_PCT_OF_ONLINE: u64 = 100;
pub const MAX_VALIDATOR_PCT_OF_ONLINE_DENOMINATOR: u64 = 1_000;

/// Protocol floor on `minEntryStake`, in lamports.
pub const PROTOCOL_MIN_ENTRY_STAKE: u64 = 1_000_000;

/// Protocol ceiling on `maxAlgoPerPool`, in lamports.
pub const PROTOCOL_MAX_ALGO_PER_POOL: u64 = 70_000_000_000_000;

/// Pure-empty payouts (no token reward, and an algo reward at or below this
/// many lamports) are rejected with `RewardTooSmall`.
pub const MIN_ALGO_REWARD_TO_PAY: u64 = 1_000_000;

/// Byte size of a `StakedInfo` ledger slot once packed into account data.
pub const STAKED_INFO_SIZE: usize = 32 + 8 + 8 + 8 + 8;

/// Byte size of one `PoolKey` entry in a `StakerPoolSet`.
pub const POOL_KEY_SIZE: usize = 8 + 8 + 32;

/// Byte size of one `PoolSummary` row held inline in a validator record.
pub const POOL_SUMMARY_SIZE: usize = 8 + 32 + 8 + 8;

/// Lamports required to create and rent-exempt a new validator record slot.
///
/// Solana's analogue of the spec's `AddValidatorMbr`: the registry account
/// itself is sized for `max_validators` at `initialize`, so this simply
/// returns the incremental rent a new record's storage would need if it
/// were a stand-alone account — used to validate the accompanying payment.
pub fn add_validator_mbr(rent: &Rent, validator_record_size: usize) -> u64 {
    rent.minimum_balance(validator_record_size)
}

/// Lamports required to create one `Pool` account, including its
/// associated reward-token account when the pool is pool #1 of a validator
/// with a reward token configured.
pub fn add_pool_mbr(rent: &Rent, pool_account_space: usize, needs_token_account: bool) -> u64 {
    let pool_rent = rent.minimum_balance(pool_account_space);
    if needs_token_account {
        // SPL token account space, rent-exempt minimum.
        pool_rent + rent.minimum_balance(anchor_spl_token_account_len())
    } else {
        pool_rent
    }
}

/// Size of a `spl_token::state::Account`, duplicated here so this crate does
/// not need to depend on `spl-token` just for one constant.
const fn anchor_spl_token_account_len() -> usize {
    165
}

/// Lamports required to create a `StakerPoolSet` account for a first-time staker.
pub fn add_staker_mbr(rent: &Rent, staker_pool_set_space: usize) -> u64 {
    rent.minimum_balance(staker_pool_set_space)
}
