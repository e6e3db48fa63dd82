use anchor_lang::prelude::*;

use crate::reward::RewardPolicy;

#[event]
pub struct Initialized {
    pub admin: Pubkey,
    pub mint: Pubkey,
    pub reward_vault: Pubkey,
    pub reward_policy: RewardPolicy,
}

#[event]
pub struct Staked {
    pub staker: Pubkey,
    pub amount: u64,
    pub staked_amount: u64,
    pub accrued_reward: u64,
    pub vault: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct Unstaked {
    pub staker: Pubkey,
    pub principal: u64,
    pub reward: u64,
    pub vault: Pubkey,
    pub reward_vault: Pubkey,
    pub reward_vault_balance: u64,
    pub timestamp: i64,
}

#[event]
pub struct RewardsFunded {
    pub funder: Pubkey,
    pub amount: u64,
    pub reward_vault: Pubkey,
    pub reward_vault_balance: u64,
}
