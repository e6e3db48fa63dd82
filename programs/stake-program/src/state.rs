use anchor_lang::prelude::*;

use crate::error::StakeError;
use crate::reward::{elapsed_seconds, RewardPolicy};

/// Global, singleton configuration.
/// PDA: seeds = ["stake_config"]
#[account]
#[derive(InitSpace)]
pub struct StakeConfig {
    pub admin: Pubkey,
    pub mint: Pubkey,
    pub reward_vault: Pubkey,
    pub reward_policy: RewardPolicy,
    pub bump: u8,
    pub reward_vault_bump: u8,
}

impl StakeConfig {
    pub const LEN: usize = 8 + Self::INIT_SPACE;

    /// A freshly allocated config is all zeroes, so the admin key doubles
    /// as the initialized flag.
    pub fn is_initialized(&self) -> bool {
        self.admin != Pubkey::default()
    }
}

/// Per-participant stake record.
/// PDA: seeds = ["stake_info", owner]
///
/// `amount` always matches the balance the program moved into `vault`.
/// The record is never closed; after `unstake` it stays at zero until the
/// owner stakes again.
#[account]
#[derive(InitSpace, Debug, PartialEq, Eq)]
pub struct StakeInfo {
    pub owner: Pubkey,
    pub vault: Pubkey,
    pub amount: u64,
    pub accrued_reward: u64, // time-weighted reward earned in the current cycle
    pub last_update_ts: i64,
    pub staked_at: i64, // deposit-weighted start of the current position
    pub total_staked: u64,
    pub total_rewards_paid: u64,
    pub cycles: u64, // completed stake/unstake cycles
    pub bump: u8,
}

/// Amounts released by settling a stake record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Payout {
    pub principal: u64,
    pub reward: u64,
}

impl Payout {
    pub fn total(&self) -> u64 {
        self.principal.saturating_add(self.reward)
    }
}

impl StakeInfo {
    pub const LEN: usize = 8 + Self::INIT_SPACE;

    pub fn open(owner: Pubkey, vault: Pubkey, bump: u8, now: i64) -> Self {
        Self {
            owner,
            vault,
            amount: 0,
            accrued_reward: 0,
            last_update_ts: now,
            staked_at: now,
            total_staked: 0,
            total_rewards_paid: 0,
            cycles: 0,
            bump,
        }
    }

    pub fn is_staked(&self) -> bool {
        self.amount > 0
    }

    /// Adds `amount` to the position. Reward earned by the existing
    /// principal is checkpointed first so the deposit only earns from `now`.
    ///
    /// The position's start moves towards `now` in proportion to the
    /// deposit, so topping up a small matured position does not let the new
    /// principal skip the holding period.
    pub fn record_stake(&mut self, amount: u64, now: i64, policy: &RewardPolicy) -> Result<()> {
        require!(amount > 0, StakeError::InvalidAmount);
        let amount_after = self
            .amount
            .checked_add(amount)
            .ok_or(StakeError::Overflow)?;

        self.checkpoint(now, policy);
        self.staked_at = self.blended_start(amount_after, now);
        self.amount = amount_after;
        self.total_staked = self.total_staked.saturating_add(amount);
        Ok(())
    }

    /// Seconds the current position counts as held at `now`.
    pub fn held_secs(&self, now: i64) -> u64 {
        elapsed_seconds(self.staked_at, now)
    }

    /// Reward the owner would receive if the position were settled at `now`.
    pub fn pending_reward(&self, now: i64, policy: &RewardPolicy) -> Result<u64> {
        if !self.is_staked() {
            return Ok(0);
        }
        let accrued = self
            .accrued_reward
            .saturating_add(policy.accrue(self.amount, elapsed_seconds(self.last_update_ts, now)));
        policy.settlement_reward(self.amount, accrued, self.held_secs(now))
    }

    /// Zeroes the position and returns what must leave the vaults.
    pub fn settle(&mut self, now: i64, policy: &RewardPolicy) -> Result<Payout> {
        require!(self.is_staked(), StakeError::NothingStaked);
        let payout = Payout {
            principal: self.amount,
            reward: self.pending_reward(now, policy)?,
        };
        self.total_rewards_paid = self.total_rewards_paid.saturating_add(payout.reward);
        self.cycles = self.cycles.saturating_add(1);
        self.amount = 0;
        self.accrued_reward = 0;
        self.last_update_ts = now;
        self.staked_at = now;
        Ok(payout)
    }

    fn checkpoint(&mut self, now: i64, policy: &RewardPolicy) {
        let earned = policy.accrue(self.amount, elapsed_seconds(self.last_update_ts, now));
        self.accrued_reward = self.accrued_reward.saturating_add(earned);
        self.last_update_ts = now;
    }

    // existing principal keeps its age scaled by its share of `amount_after`
    fn blended_start(&self, amount_after: u64, now: i64) -> i64 {
        let age = self.held_secs(now) as u128;
        let carried = (self.amount as u128) * age / (amount_after as u128);
        now.saturating_sub(carried as i64)
    }
}
