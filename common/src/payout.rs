//! The epoch payout engine — the hardest algorithm in this
//! system. A pure function over a snapshot of pool + validator state, so it
//! is fully unit-testable without an account or a validator runtime.

use crate::constants::{
    COMMISSION_DENOMINATOR, MAX_VALIDATOR_PCT_OF_ONLINE, MAX_VALIDATOR_PCT_OF_ONLINE_DENOMINATOR,
    MIN_ALGO_REWARD_TO_PAY, RATIO_DENOMINATOR, TIME_PERCENT_DENOMINATOR,
};
use crate::error::CoreError;
use crate::math::{mul_div, mul_mul_div_div};
use crate::state::StakedInfo;

/// Everything `run_epoch_payout` needs to know about the calling pool and
/// its validator, gathered by the instruction handler from the `Registry`
/// and `Pool` accounts.
pub struct PayoutInput<'a> {
    pub now: i64,
    pub last_payout: i64,
    pub payout_every_x_mins: u16,
    pub pct_to_validator: u32,
    /// `B`: the pool account's current lamport balance.
    pub pool_balance: u64,
    /// `M`: the pool account's rent-exempt minimum balance.
    pub pool_min_balance: u64,
    /// `S`: the pool's `totalAlgoStaked`, which must equal the sum of
    /// `ledger` balances — the caller is responsible for keeping the two
    /// in sync.
    pub total_algo_staked: u64,
    pub ledger: &'a [StakedInfo],
    /// Validator-wide `totalAlgoStaked`, used for the protocol cap check.
    pub validator_total_algo_staked: u64,
    /// `onlineStake * MAX_VALIDATOR_PCT_OF_ONLINE / 1000`, supplied by the
    /// caller since "online stake" is an external, protocol-wide figure.
    pub max_allowed_stake: u64,
    /// `None` when `rewardTokenId == 0`.
    pub token: Option<TokenPayoutInput>,
}

pub struct TokenPayoutInput {
    /// `pool1.assetBalance(rewardTokenId) - rewardTokenHeldBack`, precomputed
    /// by the caller (requires reading pool #1, which only this pool's
    /// instruction handler has the accounts for).
    pub token_avail_global: u64,
    pub reward_per_payout: u64,
    /// `ratio.poolPctOfWhole[poolId - 1]` from the most recent snapshot.
    pub pool_pct_of_whole: u64,
}

/// Per-staker credit produced by one epoch payout. `ledger_index` refers
/// into the `ledger` slice passed in `PayoutInput`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StakerCredit {
    pub ledger_index: usize,
    pub algo_credit: u64,
    pub token_credit: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PayoutOutcome {
    pub new_last_payout: i64,
    pub send_reward_to_fee_sink: bool,
    pub fee_sink_amount: u64,
    pub validator_pay: u64,
    pub token_paid_out: u64,
    pub increased_stake: u64,
    pub new_total_algo_staked: u64,
    pub credits: Vec<StakerCredit>,
}

/// Runs one epoch payout for a single pool.
pub fn run_epoch_payout(input: &PayoutInput) -> Result<PayoutOutcome, CoreError> {
    let epoch_secs = input.payout_every_x_mins as i64 * 60;
    if input.now - input.last_payout < epoch_secs {
        return Err(CoreError::EpochTooEarly);
    }
    let new_last_payout = input.now;

    let s = input.total_algo_staked;
    if input.pool_balance < s.saturating_add(input.pool_min_balance) {
        return Err(CoreError::InvariantViolation);
    }
    let mut algo_reward = input.pool_balance - s - input.pool_min_balance;

    let mut send_reward_to_fee_sink = false;
    let mut fee_sink_amount = 0u64;
    let mut validator_pay = 0u64;

    if input.validator_total_algo_staked > input.max_allowed_stake {
        send_reward_to_fee_sink = true;
        fee_sink_amount = algo_reward;
        algo_reward = 0;
    } else {
        validator_pay = mul_div(algo_reward, input.pct_to_validator as u64, COMMISSION_DENOMINATOR)?;
        algo_reward -= validator_pay;
    }

    let mut token_reward = 0u64;
    if let Some(token) = &input.token {
        if token.token_avail_global >= token.reward_per_payout {
            token_reward = mul_div(
                token.reward_per_payout,
                token.pool_pct_of_whole,
                RATIO_DENOMINATOR,
            )?;
        }
    }

    if token_reward == 0 && !send_reward_to_fee_sink && algo_reward <= MIN_ALGO_REWARD_TO_PAY {
        return Err(CoreError::RewardTooSmall);
    }

    let original_algo_reward = algo_reward;
    let original_token_reward = token_reward;

    let mut credits: Vec<StakerCredit> = Vec::with_capacity(input.ledger.len());
    let mut partial_total = 0u64;
    let mut partial_algo_credited = 0u64;
    let mut partial_token_credited = 0u64;

    // Pass 1: partial-epoch stakers.
    for (i, slot) in input.ledger.iter().enumerate() {
        if slot.is_empty() {
            continue;
        }
        if slot.entry_time > input.now {
            partial_total = partial_total.saturating_add(slot.balance);
            continue;
        }
        let time_in_pool = input.now - slot.entry_time;
        if time_in_pool >= epoch_secs {
            continue;
        }
        let time_percent = (time_in_pool as u64)
            .saturating_mul(TIME_PERCENT_DENOMINATOR)
            / epoch_secs as u64;
        partial_total = partial_total.saturating_add(slot.balance);

        let algo_credit = if original_algo_reward == 0 {
            0
        } else {
            mul_mul_div_div(original_algo_reward, slot.balance, time_percent, s, TIME_PERCENT_DENOMINATOR)?
        };
        let token_credit = if original_token_reward == 0 {
            0
        } else {
            mul_mul_div_div(
                original_token_reward,
                slot.balance,
                time_percent,
                s,
                TIME_PERCENT_DENOMINATOR,
            )?
        };

        partial_algo_credited = partial_algo_credited.saturating_add(algo_credit);
        partial_token_credited = partial_token_credited.saturating_add(token_credit);

        if algo_credit > 0 || token_credit > 0 {
            credits.push(StakerCredit {
                ledger_index: i,
                algo_credit,
                token_credit,
            });
        }
    }

    algo_reward = original_algo_reward.saturating_sub(partial_algo_credited);
    token_reward = original_token_reward.saturating_sub(partial_token_credited);

    // Pass 2: full-epoch stakers, over the residual reward pools.
    let effective_stake = s.saturating_sub(partial_total);
    if effective_stake > 0 {
        for (i, slot) in input.ledger.iter().enumerate() {
            if slot.is_empty() || slot.entry_time > input.now {
                continue;
            }
            let time_in_pool = input.now - slot.entry_time;
            if time_in_pool < epoch_secs {
                continue;
            }
            let algo_credit = if algo_reward == 0 {
                0
            } else {
                mul_div(algo_reward, slot.balance, effective_stake)?
            };
            let token_credit = if token_reward == 0 {
                0
            } else {
                mul_div(token_reward, slot.balance, effective_stake)?
            };
            if algo_credit > 0 || token_credit > 0 {
                credits.push(StakerCredit {
                    ledger_index: i,
                    algo_credit,
                    token_credit,
                });
            }
        }
    }

    let increased_stake: u64 = credits.iter().fold(0u64, |acc, c| acc.saturating_add(c.algo_credit));
    let token_paid_out: u64 = credits.iter().fold(0u64, |acc, c| acc.saturating_add(c.token_credit));

    Ok(PayoutOutcome {
        new_last_payout,
        send_reward_to_fee_sink,
        fee_sink_amount,
        validator_pay,
        token_paid_out,
        increased_stake,
        new_total_algo_staked: s + increased_stake,
        credits,
    })
}

/// `maxAllowedStake = onlineStake * MAX_VALIDATOR_PCT_OF_ONLINE / 1000`.
pub fn max_allowed_stake(online_stake: u64) -> Result<u64, CoreError> {
    mul_div(
        online_stake,
        MAX_VALIDATOR_PCT_OF_ONLINE,
        MAX_VALIDATOR_PCT_OF_ONLINE_DENOMINATOR,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_lang::prelude::Pubkey;

    fn staker(balance: u64, entry_time: i64) -> StakedInfo {
        StakedInfo {
            account: Pubkey::new_unique(),
            balance,
            total_rewarded: 0,
            reward_token_balance: 0,
            entry_time,
        }
    }

    /// Commission + single staker, full epoch.
    #[test]
    fn scenario_commission_single_staker_full_epoch() {
        let epoch_secs = 3600i64;
        let ledger = vec![staker(1000, 0)];
        let input = PayoutInput {
            now: epoch_secs,
            last_payout: 0,
            payout_every_x_mins: 60,
            pct_to_validator: 50_000, // 5%
            pool_balance: 1100,
            pool_min_balance: 0,
            total_algo_staked: 1000,
            ledger: &ledger,
            validator_total_algo_staked: 1000,
            max_allowed_stake: u64::MAX,
            token: None,
        };
        let outcome = run_epoch_payout(&input).unwrap();
        assert_eq!(outcome.validator_pay, 5);
        assert_eq!(outcome.increased_stake, 95);
        assert_eq!(outcome.new_total_algo_staked, 1095);
        assert_eq!(outcome.credits.len(), 1);
        assert_eq!(outcome.credits[0].algo_credit, 95);
    }

    /// One full-epoch staker, one partial-epoch staker of equal balance: the
    /// full-epoch staker must never receive less.
    #[test]
    fn scenario_partial_and_full_stakers() {
        let epoch_secs = 1000i64;
        let ledger = vec![staker(1000, 0), staker(1000, epoch_secs / 2)];
        let input = PayoutInput {
            now: epoch_secs,
            last_payout: 0,
            payout_every_x_mins: (epoch_secs / 60) as u16,
            pct_to_validator: 10_000, // minimum allowed, but we zero it out below via pool_balance math
            pool_balance: 2100,
            pool_min_balance: 0,
            total_algo_staked: 2000,
            ledger: &ledger,
            validator_total_algo_staked: 2000,
            max_allowed_stake: u64::MAX,
            token: None,
        };
        // pctToValidator = 0 is disallowed by config validation but the
        // payout engine itself does not re-validate config bounds, so we
        // can exercise the exact 0%-commission case from the spec directly.
        let input = PayoutInput {
            pct_to_validator: 0,
            ..input
        };
        let outcome = run_epoch_payout(&input).unwrap();
        assert_eq!(outcome.validator_pay, 0);

        let b_credit = outcome
            .credits
            .iter()
            .find(|c| c.ledger_index == 1)
            .unwrap();
        assert_eq!(b_credit.algo_credit, 25);

        let a_credit = outcome
            .credits
            .iter()
            .find(|c| c.ledger_index == 0)
            .unwrap();
        assert_eq!(a_credit.algo_credit, 75);

        // Full-epoch staker never receives less than an equal-balance partial staker.
        assert!(a_credit.algo_credit >= b_credit.algo_credit);
    }

    /// Protocol cap redirect sends the whole reward to the fee sink.
    #[test]
    fn scenario_protocol_cap_redirect() {
        let epoch_secs = 3600i64;
        let ledger = vec![staker(1000, 0)];
        let input = PayoutInput {
            now: epoch_secs,
            last_payout: 0,
            payout_every_x_mins: 60,
            pct_to_validator: 50_000,
            pool_balance: 1100,
            pool_min_balance: 0,
            total_algo_staked: 1000,
            ledger: &ledger,
            validator_total_algo_staked: 2_000_000,
            max_allowed_stake: 1_000_000,
            token: None,
        };
        let outcome = run_epoch_payout(&input).unwrap();
        assert!(outcome.send_reward_to_fee_sink);
        assert_eq!(outcome.fee_sink_amount, 100);
        assert_eq!(outcome.validator_pay, 0);
        assert_eq!(outcome.increased_stake, 0);
        assert!(outcome.credits.is_empty());
    }

    /// Epoch gating rejects a call before the configured interval elapses.
    #[test]
    fn scenario_early_payout_rejected() {
        let epoch_secs = 3600i64;
        let ledger = vec![staker(1000, 0)];
        let input = PayoutInput {
            now: epoch_secs - 1,
            last_payout: 0,
            payout_every_x_mins: 60,
            pct_to_validator: 50_000,
            pool_balance: 1100,
            pool_min_balance: 0,
            total_algo_staked: 1000,
            ledger: &ledger,
            validator_total_algo_staked: 1000,
            max_allowed_stake: u64::MAX,
            token: None,
        };
        assert_eq!(run_epoch_payout(&input), Err(CoreError::EpochTooEarly));
    }

    #[test]
    fn rejects_pure_empty_payout() {
        let epoch_secs = 3600i64;
        let ledger = vec![staker(1000, 0)];
        let input = PayoutInput {
            now: epoch_secs,
            last_payout: 0,
            payout_every_x_mins: 60,
            pct_to_validator: 1_000_000,
            pool_balance: 1000,
            pool_min_balance: 0,
            total_algo_staked: 1000,
            ledger: &ledger,
            validator_total_algo_staked: 1000,
            max_allowed_stake: u64::MAX,
            token: None,
        };
        assert_eq!(run_epoch_payout(&input), Err(CoreError::RewardTooSmall));
    }

    /// Token reward split 50/50 between two equal pools.
    #[test]
    fn token_reward_shares_by_ratio() {
        let epoch_secs = 3600i64;
        let ledger = vec![staker(1000, 0)];
        let input = PayoutInput {
            now: epoch_secs,
            last_payout: 0,
            payout_every_x_mins: 60,
            pct_to_validator: 10_000,
            pool_balance: 1000,
            pool_min_balance: 0,
            total_algo_staked: 1000,
            ledger: &ledger,
            validator_total_algo_staked: 1000,
            max_allowed_stake: u64::MAX,
            token: Some(TokenPayoutInput {
                token_avail_global: 1_000_000,
                reward_per_payout: 1000,
                pool_pct_of_whole: 500_000,
            }),
        };
        let outcome = run_epoch_payout(&input).unwrap();
        assert_eq!(outcome.token_paid_out, 500);
        assert_eq!(outcome.credits[0].token_credit, 500);
    }

    mod proptests {
        use super::*;
        use proptest::collection::vec as vec_strategy;
        use proptest::prelude::*;

        const EPOCH_SECS: i64 = 3600;

        /// One staker: `true` enters at the epoch start (full credit), `false`
        /// enters halfway through (partial credit).
        fn ledger_strategy() -> impl Strategy<Value = Vec<(u64, bool)>> {
            vec_strategy((1_000u64..=1_000_000, any::<bool>()), 1..=8)
        }

        proptest! {
            /// P4: validator commission is exactly `floor(algoRewardAvail * pct / 1_000_000)`
            /// when the protocol cap is not exceeded, computed before any staker credit.
            #[test]
            fn p4_commission_matches_formula(
                entries in ledger_strategy(),
                pct in 10_000u32..=1_000_000,
                reward in 2_000_000u64..=50_000_000,
            ) {
                let ledger: Vec<StakedInfo> = entries
                    .iter()
                    .map(|(bal, full)| staker(*bal, if *full { 0 } else { EPOCH_SECS / 2 }))
                    .collect();
                let s: u64 = ledger.iter().map(|l| l.balance).sum();
                let input = PayoutInput {
                    now: EPOCH_SECS,
                    last_payout: 0,
                    payout_every_x_mins: (EPOCH_SECS / 60) as u16,
                    pct_to_validator: pct,
                    pool_balance: s + reward,
                    pool_min_balance: 0,
                    total_algo_staked: s,
                    ledger: &ledger,
                    validator_total_algo_staked: s,
                    max_allowed_stake: u64::MAX,
                    token: None,
                };
                if let Ok(outcome) = run_epoch_payout(&input) {
                    let expected = mul_div(reward, pct as u64, COMMISSION_DENOMINATOR).unwrap();
                    prop_assert_eq!(outcome.validator_pay, expected);
                }
            }

            /// P5: algo credited to stakers plus validator pay never exceeds the
            /// original reward pool, and falls short of it by at most
            /// `numStakers + 1` units of floor-rounding loss.
            #[test]
            fn p5_reward_allocation_conserves_up_to_rounding(
                entries in ledger_strategy(),
                pct in 10_000u32..=1_000_000,
                reward in 2_000_000u64..=50_000_000,
            ) {
                let ledger: Vec<StakedInfo> = entries
                    .iter()
                    .map(|(bal, full)| staker(*bal, if *full { 0 } else { EPOCH_SECS / 2 }))
                    .collect();
                let s: u64 = ledger.iter().map(|l| l.balance).sum();
                let input = PayoutInput {
                    now: EPOCH_SECS,
                    last_payout: 0,
                    payout_every_x_mins: (EPOCH_SECS / 60) as u16,
                    pct_to_validator: pct,
                    pool_balance: s + reward,
                    pool_min_balance: 0,
                    total_algo_staked: s,
                    ledger: &ledger,
                    validator_total_algo_staked: s,
                    max_allowed_stake: u64::MAX,
                    token: None,
                };
                if let Ok(outcome) = run_epoch_payout(&input) {
                    let allocated = outcome.increased_stake + outcome.validator_pay;
                    prop_assert!(allocated <= reward);
                    let slack = reward - allocated;
                    prop_assert!(slack <= entries.len() as u64 + 1);
                }
            }

            /// P6: of two equal-balance stakers in the same epoch, the one whose
            /// `timeInPool >= epochSecs` never receives less than the partial one.
            #[test]
            fn p6_full_epoch_staker_never_credited_less_than_equal_partial(
                balance in 1_000u64..=1_000_000,
                pct in 10_000u32..=1_000_000,
                reward in 2_000_000u64..=50_000_000,
            ) {
                let ledger = vec![staker(balance, 0), staker(balance, EPOCH_SECS / 2)];
                let s = balance * 2;
                let input = PayoutInput {
                    now: EPOCH_SECS,
                    last_payout: 0,
                    payout_every_x_mins: (EPOCH_SECS / 60) as u16,
                    pct_to_validator: pct,
                    pool_balance: s + reward,
                    pool_min_balance: 0,
                    total_algo_staked: s,
                    ledger: &ledger,
                    validator_total_algo_staked: s,
                    max_allowed_stake: u64::MAX,
                    token: None,
                };
                if let Ok(outcome) = run_epoch_payout(&input) {
                    let full_credit = outcome
                        .credits
                        .iter()
                        .find(|c| c.ledger_index == 0)
                        .map_or(0, |c| c.algo_credit);
                    let partial_credit = outcome
                        .credits
                        .iter()
                        .find(|c| c.ledger_index == 1)
                        .map_or(0, |c| c.algo_credit);
                    prop_assert!(full_credit >= partial_credit);
                }
            }
        }
    }

    #[test]
    fn partial_stakers_add_zero_credit_when_entry_time_is_in_the_future() {
        let epoch_secs = 3600i64;
        let ledger = vec![staker(1000, epoch_secs + 1), staker(1000, 0)];
        let input = PayoutInput {
            now: epoch_secs,
            last_payout: 0,
            payout_every_x_mins: 60,
            pct_to_validator: 0,
            pool_balance: 1100,
            pool_min_balance: 0,
            total_algo_staked: 2000,
            ledger: &ledger,
            validator_total_algo_staked: 2000,
            max_allowed_stake: u64::MAX,
            token: None,
        };
        let outcome = run_epoch_payout(&input).unwrap();
        // Future-entry staker gets nothing; the full-epoch staker gets the
        // entire residual reward divided over the effective stake (1000).
        assert!(outcome.credits.iter().all(|c| c.ledger_index != 0));
        let full = outcome.credits.iter().find(|c| c.ledger_index == 1).unwrap();
        assert_eq!(full.algo_credit, 100);
    }
}
