#![allow(unexpected_cfgs)]

pub mod account_structs;
/// # stake program - Token Staking and Reward Distribution
///
/// ## Business Process Flow
///
/// 1. Initial Setup:
///    - Admin (the program upgrade authority) initializes the program with
///      the single accepted token mint and a reward policy
///    - The reward vault PDA is created as a token account that is its own
///      authority
///
/// 2. Reward Funding:
///    - Anyone tops up the reward vault, either with `fund_rewards` or by
///      transferring/minting into it directly
///
/// 3. User Staking Flow:
///    - User stakes tokens; on first stake the program opens the user's
///      stake record PDA and its vault (the record's associated token account)
///    - Further stakes add to the same position
///
/// 4. Withdrawal Flow:
///    - User unstakes; the full principal returns from the user's vault and
///      the policy's reward is paid from the reward vault in the same
///      transaction
///    - The stake record stays at zero and can be reopened by staking again
///
/// Security is maintained through PDAs (Program Derived Addresses) and strict
/// token authority controls. All token operations are atomic and validated
/// through Solana's transaction model.
pub mod error;
pub mod events;
mod guard;
pub mod pda;
pub mod processor;
pub mod reward;
pub mod state;

use account_structs::*;
use anchor_lang::prelude::*;
use reward::RewardPolicy;

declare_id!("Drzahf6sg5fttp1HHRNrCnrGzYTNnpjAzsF5vU5RXgxJ");

#[program]
pub mod stake_program {
    use super::*;

    /// Creates the stake config and the reward vault:
    /// - reward_policy: How the reward paid on unstake is computed
    pub fn initialize(ctx: Context<Initialize>, reward_policy: RewardPolicy) -> Result<()> {
        processor::initialize(ctx, reward_policy)
    }

    /// Handles user deposits:
    /// - Opens the stake record and vault on first use
    /// - Transfers `amount` from the user into their vault
    pub fn stake(ctx: Context<Stake>, amount: u64) -> Result<()> {
        processor::stake(ctx, amount)
    }

    /// Returns the full staked principal plus the reward to the user and
    /// zeroes the stake record.
    pub fn unstake(ctx: Context<Unstake>) -> Result<()> {
        processor::unstake(ctx)
    }

    pub fn fund_rewards(ctx: Context<FundRewards>, amount: u64) -> Result<()> {
        processor::fund_rewards(ctx, amount)
    }

    pub fn pending_reward(ctx: Context<RewardView>) -> Result<u64> {
        processor::pending_reward(ctx)
    }
}
