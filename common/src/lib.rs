//! Chain-agnostic pieces of the delegated stake registry.
//!
//! Everything in this crate is a plain function or a plain-old-data struct:
//! no `#[program]`, no `AccountInfo`, no rent. The Anchor program crate wraps
//! these with account context and persists them; this crate is what makes
//! the payout engine and the placement algorithm unit-testable without a
//! validator.

pub mod config;
pub mod constants;
pub mod error;
pub mod math;
pub mod payout;
pub mod placement;
pub mod pool_key;
pub mod state;

pub use config::{EntryGating, ValidatorConfig};
pub use error::CoreError;
pub use payout::{run_epoch_payout, PayoutInput, PayoutOutcome};
pub use pool_key::PoolKey;
pub use state::{PoolSummary, StakedInfo, StakerPoolSet, ValidatorState};
