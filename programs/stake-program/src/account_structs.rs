use crate::error::*;
use crate::pda::{program_data_address, STAKE_CONFIG_SEED};
use crate::state::*;
use anchor_lang::prelude::*;
use anchor_spl::associated_token::AssociatedToken;
use anchor_spl::token::{Mint, Token, TokenAccount};

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(mut)]
    pub admin: Signer<'info>,

    /// CHECK: Validated as an initialized SPL Token mint in the handler,
    /// which reports InvalidAsset for anything else.
    pub mint: UncheckedAccount<'info>,

    // init_if_needed so a repeated initialize reaches the handler and fails
    // with AlreadyInitialized instead of a system program error
    #[account(
        init_if_needed,
        payer = admin,
        space = StakeConfig::LEN,
        seeds = [STAKE_CONFIG_SEED],
        bump
    )]
    pub stake_config: Account<'info, StakeConfig>,

    /// CHECK: Re-derived and created in the handler once the mint is known
    /// to be valid. The reward vault is its own token authority, so only this
    /// program can move rewards out of it.
    #[account(mut)]
    pub reward_vault: UncheckedAccount<'info>,

    /// CHECK: This is the program data account that contains the update authority
    #[account(
        constraint = program_data.key() == program_data_address(&crate::id()) @ StakeError::InvalidProgramData
    )]
    pub program_data: UncheckedAccount<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct Stake<'info> {
    #[account(mut)]
    pub staker: Signer<'info>,

    #[account(
        seeds = [STAKE_CONFIG_SEED],
        bump = stake_config.bump
    )]
    pub stake_config: Box<Account<'info, StakeConfig>>,

    #[account(
        address = stake_config.mint @ StakeError::InvalidAsset
    )]
    pub mint: Box<Account<'info, Mint>>,

    #[account(
        mut,
        constraint = staker_token_account.mint == stake_config.mint @ StakeError::InvalidAsset,
        constraint = staker_token_account.owner == staker.key() @ StakeError::InvalidTokenOwner
    )]
    pub staker_token_account: Box<Account<'info, TokenAccount>>,

    /// CHECK: Re-derived from the staker key in the handler and created on
    /// first stake.
    #[account(mut)]
    pub stake_info: UncheckedAccount<'info>,

    /// CHECK: Associated token account of `stake_info`; re-derived in the
    /// handler and created on first stake.
    #[account(mut)]
    pub vault_token_account: UncheckedAccount<'info>,

    pub token_program: Program<'info, Token>,
    pub associated_token_program: Program<'info, AssociatedToken>,
    pub system_program: Program<'info, System>,
}

#[derive(Accounts)]
pub struct Unstake<'info> {
    pub staker: Signer<'info>,

    #[account(
        seeds = [STAKE_CONFIG_SEED],
        bump = stake_config.bump
    )]
    pub stake_config: Box<Account<'info, StakeConfig>>,

    #[account(
        address = stake_config.mint @ StakeError::InvalidAsset
    )]
    pub mint: Box<Account<'info, Mint>>,

    #[account(
        mut,
        constraint = staker_token_account.mint == stake_config.mint @ StakeError::InvalidAsset,
        constraint = staker_token_account.owner == staker.key() @ StakeError::InvalidTokenOwner
    )]
    pub staker_token_account: Box<Account<'info, TokenAccount>>,

    /// CHECK: Re-derived from the staker key in the handler. Left unchecked
    /// so a missing record reports NothingStaked.
    #[account(mut)]
    pub stake_info: UncheckedAccount<'info>,

    /// CHECK: Associated token account of `stake_info`, re-derived in the
    /// handler; its authority is the stake_info PDA.
    #[account(mut)]
    pub vault_token_account: UncheckedAccount<'info>,

    #[account(
        mut,
        address = stake_config.reward_vault @ StakeError::AddressMismatch
    )]
    pub reward_vault: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct FundRewards<'info> {
    pub funder: Signer<'info>,

    #[account(
        seeds = [STAKE_CONFIG_SEED],
        bump = stake_config.bump
    )]
    pub stake_config: Box<Account<'info, StakeConfig>>,

    #[account(
        mut,
        constraint = funder_token_account.mint == stake_config.mint @ StakeError::InvalidAsset,
        constraint = funder_token_account.owner == funder.key() @ StakeError::InvalidTokenOwner
    )]
    pub funder_token_account: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        address = stake_config.reward_vault @ StakeError::AddressMismatch
    )]
    pub reward_vault: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct RewardView<'info> {
    #[account(
        seeds = [STAKE_CONFIG_SEED],
        bump = stake_config.bump
    )]
    pub stake_config: Account<'info, StakeConfig>,

    /// CHECK: Any participant key; only used to derive the stake record.
    pub staker: UncheckedAccount<'info>,

    /// CHECK: Re-derived from `staker` in the handler; may not exist yet.
    pub stake_info: UncheckedAccount<'info>,
}
