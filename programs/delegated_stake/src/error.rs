//! Anchor-visible error codes, mirroring `delegated_stake_common::error::CoreError`
//! one variant at a time, split between protocol-bound errors and raw arithmetic failures.

use anchor_lang::prelude::*;
use num_derive::FromPrimitive;

use delegated_stake_common::error::CoreError;

#[error_code]
#[derive(Eq, FromPrimitive, PartialEq)]
pub enum DelegatedStakeError {
    #[msg("validator configuration violates protocol bounds")]
    InvalidConfig,
    #[msg("sender is not the validator owner")]
    NotOwner,
    #[msg("sender is not the validator owner or manager")]
    NotOwnerOrManager,
    #[msg("sender is not the registry")]
    NotRegistry,
    #[msg("sender is not the expected pool")]
    NotExpectedPool,
    #[msg("pool key does not authenticate against registry state")]
    PoolKeyMismatch,
    #[msg("caller is not a sibling pool of the same validator")]
    NotSiblingPool,
    #[msg("operation is only permitted on pool #1")]
    NotPrimaryPool,
    #[msg("pool has no free staker ledger slot")]
    PoolFull,
    #[msg("validator has reached its maximum number of pools")]
    PoolCapExceeded,
    #[msg("no pool could accept this stake amount")]
    NoPoolAvailable,
    #[msg("staker's pool membership set is full")]
    StakerPoolSetFull,
    #[msg("staker balance is smaller than the amount requested")]
    InsufficientBalance,
    #[msg("stake amount is below the validator's minimum entry stake")]
    BelowMinimum,
    #[msg("stake amount would exceed the pool's maximum stake")]
    ExceedsMaxPerPool,
    #[msg("no ledger entry for this staker")]
    AccountNotFound,
    #[msg("accompanying payment is missing")]
    PaymentMissing,
    #[msg("accompanying payment has the wrong sender")]
    PaymentWrongSender,
    #[msg("accompanying payment has the wrong receiver")]
    PaymentWrongReceiver,
    #[msg("accompanying payment has the wrong amount")]
    PaymentWrongAmount,
    #[msg("epoch payout was called before payoutEveryXMins elapsed")]
    EpochTooEarly,
    #[msg("no token reward available and algo reward is too small to pay")]
    RewardTooSmall,
    #[msg("a computed state update would violate a core invariant")]
    InvariantViolation,
    #[msg("arithmetic overflow or division by zero")]
    ArithmeticError,
}

impl From<CoreError> for DelegatedStakeError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidConfig => DelegatedStakeError::InvalidConfig,
            CoreError::NotOwner => DelegatedStakeError::NotOwner,
            CoreError::NotOwnerOrManager => DelegatedStakeError::NotOwnerOrManager,
            CoreError::NotRegistry => DelegatedStakeError::NotRegistry,
            CoreError::NotExpectedPool => DelegatedStakeError::NotExpectedPool,
            CoreError::PoolKeyMismatch => DelegatedStakeError::PoolKeyMismatch,
            CoreError::NotSiblingPool => DelegatedStakeError::NotSiblingPool,
            CoreError::NotPrimaryPool => DelegatedStakeError::NotPrimaryPool,
            CoreError::PoolFull => DelegatedStakeError::PoolFull,
            CoreError::PoolCapExceeded => DelegatedStakeError::PoolCapExceeded,
            CoreError::NoPoolAvailable => DelegatedStakeError::NoPoolAvailable,
            CoreError::StakerPoolSetFull => DelegatedStakeError::StakerPoolSetFull,
            CoreError::InsufficientBalance => DelegatedStakeError::InsufficientBalance,
            CoreError::BelowMinimum => DelegatedStakeError::BelowMinimum,
            CoreError::ExceedsMaxPerPool => DelegatedStakeError::ExceedsMaxPerPool,
            CoreError::AccountNotFound => DelegatedStakeError::AccountNotFound,
            CoreError::PaymentMissing => DelegatedStakeError::PaymentMissing,
            CoreError::PaymentWrongSender => DelegatedStakeError::PaymentWrongSender,
            CoreError::PaymentWrongReceiver => DelegatedStakeError::PaymentWrongReceiver,
            CoreError::PaymentWrongAmount => DelegatedStakeError::PaymentWrongAmount,
            CoreError::EpochTooEarly => DelegatedStakeError::EpochTooEarly,
            CoreError::RewardTooSmall => DelegatedStakeError::RewardTooSmall,
            CoreError::InvariantViolation => DelegatedStakeError::InvariantViolation,
            CoreError::ArithmeticError => DelegatedStakeError::ArithmeticError,
        }
    }
}

impl From<CoreError> for anchor_lang::error::Error {
    fn from(e: CoreError) -> Self {
        anchor_lang::error::Error::from(DelegatedStakeError::from(e))
    }
}
