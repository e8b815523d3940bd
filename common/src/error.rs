//! Chain-agnostic error taxonomy.
//!
//! The Anchor program crate's `#[error_code]` enum wraps this one so the
//! payout engine and placement algorithm stay testable without pulling in
//! `anchor_lang::error::Error`.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum CoreError {
    // -- ConfigurationError --
    #[error("validator configuration violates protocol bounds")]
    InvalidConfig,

    // -- AuthorizationError --
    #[error("sender is not the validator owner")]
    NotOwner,
    #[error("sender is not the validator owner or manager")]
    NotOwnerOrManager,
    #[error("sender is not the registry")]
    NotRegistry,
    #[error("sender is not the expected pool")]
    NotExpectedPool,
    #[error("pool key does not authenticate against registry state")]
    PoolKeyMismatch,
    #[error("caller is not a sibling pool of the same validator")]
    NotSiblingPool,
    #[error("operation is only permitted on pool #1")]
    NotPrimaryPool,

    // -- CapacityError --
    #[error("pool has no free staker ledger slot")]
    PoolFull,
    #[error("validator has reached its maximum number of pools")]
    PoolCapExceeded,
    #[error("no pool could accept this stake amount")]
    NoPoolAvailable,
    #[error("staker's pool membership set is full")]
    StakerPoolSetFull,

    // -- StakeError --
    #[error("staker balance is smaller than the amount requested")]
    InsufficientBalance,
    #[error("stake amount is below the validator's minimum entry stake")]
    BelowMinimum,
    #[error("stake amount would exceed the pool's maximum stake")]
    ExceedsMaxPerPool,
    #[error("no ledger entry for this staker")]
    AccountNotFound,

    // -- PaymentError --
    #[error("accompanying payment is missing")]
    PaymentMissing,
    #[error("accompanying payment has the wrong sender")]
    PaymentWrongSender,
    #[error("accompanying payment has the wrong receiver")]
    PaymentWrongReceiver,
    #[error("accompanying payment has the wrong amount")]
    PaymentWrongAmount,

    // -- TimingError --
    #[error("epoch payout was called before payoutEveryXMins elapsed")]
    EpochTooEarly,
    #[error("no token reward available and algo reward is too small to pay")]
    RewardTooSmall,

    // -- InvariantViolation --
    #[error("a computed state update would violate a core invariant")]
    InvariantViolation,
    #[error("arithmetic overflow or division by zero")]
    ArithmeticError,
}
