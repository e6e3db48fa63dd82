use anchor_lang::prelude::*;
use num_traits::ToPrimitive;

use crate::error::StakeError;

pub const BPS_DENOMINATOR: u128 = 10_000;
pub const SECONDS_PER_YEAR: u128 = 31_536_000; // 365 days
pub const MAX_PROPORTIONAL_BPS: u16 = 10_000; // 100% of principal
pub const MAX_ANNUAL_RATE_BPS: u32 = 100_000; // 1000% per year

/// How the reward paid out on `unstake` is computed.
///
/// Every variant is a pure function of the stake record and the current
/// timestamp, so any observer can recompute a payout from public state.
/// All results are floored to the asset's smallest unit.
///
/// The one-step policies only pay once the position has been held for
/// `min_duration_secs`; settling earlier returns the principal alone.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, InitSpace)]
pub enum RewardPolicy {
    /// Flat bonus paid on settlement of a matured non-zero position.
    Fixed { amount: u64, min_duration_secs: u64 },
    /// `principal * bps / 10_000` paid on settlement of a matured position.
    Proportional { bps: u16, min_duration_secs: u64 },
    /// Simple interest on principal for the time it was staked:
    /// `principal * annual_rate_bps * elapsed / (10_000 * SECONDS_PER_YEAR)`.
    TimeWeighted { annual_rate_bps: u32 },
}

impl RewardPolicy {
    pub fn validate(&self) -> Result<()> {
        match *self {
            RewardPolicy::Fixed {
                min_duration_secs, ..
            } => {
                require!(min_duration_secs > 0, StakeError::InvalidRewardPolicy);
                Ok(())
            }
            RewardPolicy::Proportional {
                bps,
                min_duration_secs,
            } => {
                require!(
                    bps <= MAX_PROPORTIONAL_BPS,
                    StakeError::InvalidRewardPolicy
                );
                require!(min_duration_secs > 0, StakeError::InvalidRewardPolicy);
                Ok(())
            }
            RewardPolicy::TimeWeighted { annual_rate_bps } => {
                require!(
                    annual_rate_bps <= MAX_ANNUAL_RATE_BPS,
                    StakeError::InvalidRewardPolicy
                );
                Ok(())
            }
        }
    }

    /// Reward earned by `principal` over `elapsed` seconds. Only the
    /// time-weighted policy accrues; the others settle in one step.
    ///
    /// Saturates at `u64::MAX` so an oversized reward can never block the
    /// principal from being settled.
    pub fn accrue(&self, principal: u64, elapsed: u64) -> u64 {
        match *self {
            RewardPolicy::TimeWeighted { annual_rate_bps } => {
                let numerator = (principal as u128)
                    .saturating_mul(annual_rate_bps as u128)
                    .saturating_mul(elapsed as u128);
                let reward = numerator / (BPS_DENOMINATOR * SECONDS_PER_YEAR);
                reward.to_u64().unwrap_or(u64::MAX)
            }
            RewardPolicy::Fixed { .. } | RewardPolicy::Proportional { .. } => 0,
        }
    }

    /// Total reward owed when a position of `principal`, held for
    /// `held_secs`, is settled given the reward already accrued against it.
    pub fn settlement_reward(&self, principal: u64, accrued: u64, held_secs: u64) -> Result<u64> {
        if principal == 0 {
            return Ok(0);
        }
        match *self {
            RewardPolicy::Fixed {
                min_duration_secs, ..
            }
            | RewardPolicy::Proportional {
                min_duration_secs, ..
            } if held_secs < min_duration_secs => Ok(0),
            RewardPolicy::Fixed { amount, .. } => Ok(amount),
            RewardPolicy::Proportional { bps, .. } => {
                let reward = (principal as u128)
                    .checked_mul(bps as u128)
                    .ok_or(StakeError::Overflow)?
                    / BPS_DENOMINATOR;
                narrow(reward)
            }
            RewardPolicy::TimeWeighted { .. } => Ok(accrued),
        }
    }
}

/// Seconds between two unix timestamps. A clock that moved backwards
/// counts as no time elapsed.
pub fn elapsed_seconds(from: i64, to: i64) -> u64 {
    to.saturating_sub(from).max(0) as u64
}

fn narrow(value: u128) -> Result<u64> {
    let narrowed = value.to_u64().ok_or(StakeError::Overflow)?;
    Ok(narrowed)
}
