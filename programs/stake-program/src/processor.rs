use crate::account_structs::*;
use crate::error::*;
use crate::events::*;
use crate::guard::{validate_mint, validate_program_update_authority};
use crate::pda::{self, PdaSigner};
use crate::reward::RewardPolicy;
use crate::state::{Payout, StakeInfo};
use anchor_lang::prelude::*;
use anchor_lang::system_program::{self, Allocate, Assign, CreateAccount};
use anchor_spl::associated_token::{self, Create};
use anchor_spl::token::{self, InitializeAccount3, TokenAccount, Transfer};

/*
# Escrow and settlement

Staked principal sits in a per-participant vault: the associated token
account of the participant's stake record PDA. Rewards sit in a single
reward vault PDA that is its own token authority. Neither the participant
nor the admin can move tokens out of either vault; only this program can,
by signing with the PDA seeds (see `pda::PdaSigner`).

Every handler runs in three steps:

1. re-derive every program-owned address the caller supplied and compare,
2. compute the next stake record from a snapshot of the current one with
   the pure methods on `StakeInfo` (all preconditions are checked here,
   before any CPI is issued),
3. issue the token CPIs and write the new record back.

The runtime commits all of it or none of it, so a failure in step 3 never
leaves a half-settled record behind.
 */

pub fn initialize(ctx: Context<Initialize>, reward_policy: RewardPolicy) -> Result<()> {
    validate_program_update_authority(&ctx.accounts.program_data, &ctx.accounts.admin)?;
    require!(
        !ctx.accounts.stake_config.is_initialized(),
        StakeError::AlreadyInitialized
    );
    {
        let mint = &ctx.accounts.mint;
        let data = mint.try_borrow_data()?;
        validate_mint(mint.owner, &data[..])?;
    }
    reward_policy.validate()?;

    let (_, reward_vault_bump) = pda::find_reward_vault_address();
    let reward_signer =
        pda::verify_reward_vault(&ctx.accounts.reward_vault.key(), reward_vault_bump)?;

    create_pda_account(
        ctx.accounts.admin.to_account_info(),
        ctx.accounts.reward_vault.to_account_info(),
        ctx.accounts.system_program.to_account_info(),
        TokenAccount::LEN,
        &token::ID,
        &reward_signer,
    )?;
    token::initialize_account3(CpiContext::new(
        ctx.accounts.token_program.to_account_info(),
        InitializeAccount3 {
            account: ctx.accounts.reward_vault.to_account_info(),
            mint: ctx.accounts.mint.to_account_info(),
            authority: ctx.accounts.reward_vault.to_account_info(),
        },
    ))?;

    let config = &mut ctx.accounts.stake_config;
    config.admin = ctx.accounts.admin.key();
    config.mint = ctx.accounts.mint.key();
    config.reward_vault = reward_signer.address();
    config.reward_policy = reward_policy;
    config.bump = ctx.bumps.stake_config;
    config.reward_vault_bump = reward_vault_bump;

    msg!("Stake config initialized for mint {}", config.mint);
    msg!("Reward vault: {}", config.reward_vault);

    emit!(Initialized {
        admin: config.admin,
        mint: config.mint,
        reward_vault: config.reward_vault,
        reward_policy,
    });

    Ok(())
}

pub fn stake(ctx: Context<Stake>, amount: u64) -> Result<()> {
    let staker = ctx.accounts.staker.key();
    let mint = ctx.accounts.mint.key();

    let stake_signer = pda::verify_stake_info(&staker, &ctx.accounts.stake_info.key())?;
    pda::verify_stake_vault(
        &stake_signer.address(),
        &mint,
        &ctx.accounts.vault_token_account.key(),
    )?;

    let now = Clock::get()?.unix_timestamp;
    let existing = load_stake_info(&ctx.accounts.stake_info)?;
    let is_new = existing.is_none();
    let record = plan_stake(
        existing,
        staker,
        ctx.accounts.vault_token_account.key(),
        ctx.accounts.staker_token_account.amount,
        amount,
        now,
        &ctx.accounts.stake_config.reward_policy,
    )?;

    msg!("Stake amount: {}", amount);
    msg!("Staked after deposit: {}", record.amount);

    if is_new {
        msg!("Opening stake record for {}", staker);
        create_pda_account(
            ctx.accounts.staker.to_account_info(),
            ctx.accounts.stake_info.to_account_info(),
            ctx.accounts.system_program.to_account_info(),
            StakeInfo::LEN,
            &crate::ID,
            &stake_signer,
        )?;
    }
    if ctx.accounts.vault_token_account.data_is_empty() {
        associated_token::create(CpiContext::new(
            ctx.accounts.associated_token_program.to_account_info(),
            Create {
                payer: ctx.accounts.staker.to_account_info(),
                associated_token: ctx.accounts.vault_token_account.to_account_info(),
                authority: ctx.accounts.stake_info.to_account_info(),
                mint: ctx.accounts.mint.to_account_info(),
                system_program: ctx.accounts.system_program.to_account_info(),
                token_program: ctx.accounts.token_program.to_account_info(),
            },
        ))?;
    } else {
        // The address is the ATA of a program PDA, so anything living there
        // must already be the vault; confirm it is a token account before
        // moving funds into it.
        load_token_account(&ctx.accounts.vault_token_account)?;
    }

    // Deposits are signed by the staker; no program authority is needed.
    let cpi_accounts = Transfer {
        from: ctx.accounts.staker_token_account.to_account_info(),
        to: ctx.accounts.vault_token_account.to_account_info(),
        authority: ctx.accounts.staker.to_account_info(),
    };
    token::transfer(
        CpiContext::new(ctx.accounts.token_program.to_account_info(), cpi_accounts),
        amount,
    )?;

    store_stake_info(&ctx.accounts.stake_info, &record)?;

    emit!(Staked {
        staker,
        amount,
        staked_amount: record.amount,
        accrued_reward: record.accrued_reward,
        vault: record.vault,
        timestamp: now,
    });

    Ok(())
}

pub fn unstake(ctx: Context<Unstake>) -> Result<()> {
    msg!("Starting unstake process");
    let staker = ctx.accounts.staker.key();
    let mint = ctx.accounts.mint.key();
    let config = &ctx.accounts.stake_config;

    let stake_signer = pda::verify_stake_info(&staker, &ctx.accounts.stake_info.key())?;
    pda::verify_stake_vault(
        &stake_signer.address(),
        &mint,
        &ctx.accounts.vault_token_account.key(),
    )?;
    let reward_signer =
        pda::verify_reward_vault(&ctx.accounts.reward_vault.key(), config.reward_vault_bump)?;

    let now = Clock::get()?.unix_timestamp;
    let reward_vault_balance = ctx.accounts.reward_vault.amount;
    let (record, payout) = plan_unstake(
        load_stake_info(&ctx.accounts.stake_info)?,
        staker,
        reward_vault_balance,
        now,
        &config.reward_policy,
    )?;

    msg!("Principal: {}", payout.principal);
    msg!("Reward: {}", payout.reward);
    msg!("Reward vault balance: {}", reward_vault_balance);

    let seeds = stake_signer.seeds();
    let signer = &[&seeds[..]];
    let transfer_accounts = Transfer {
        from: ctx.accounts.vault_token_account.to_account_info(),
        to: ctx.accounts.staker_token_account.to_account_info(),
        authority: ctx.accounts.stake_info.to_account_info(),
    };
    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            transfer_accounts,
            signer,
        ),
        payout.principal,
    )?;

    if payout.reward > 0 {
        let seeds = reward_signer.seeds();
        let signer = &[&seeds[..]];
        let transfer_accounts = Transfer {
            from: ctx.accounts.reward_vault.to_account_info(),
            to: ctx.accounts.staker_token_account.to_account_info(),
            authority: ctx.accounts.reward_vault.to_account_info(),
        };
        token::transfer(
            CpiContext::new_with_signer(
                ctx.accounts.token_program.to_account_info(),
                transfer_accounts,
                signer,
            ),
            payout.reward,
        )?;
    }

    store_stake_info(&ctx.accounts.stake_info, &record)?;

    emit!(Unstaked {
        staker,
        principal: payout.principal,
        reward: payout.reward,
        vault: record.vault,
        reward_vault: ctx.accounts.reward_vault.key(),
        reward_vault_balance: reward_vault_balance
            .checked_sub(payout.reward)
            .ok_or(StakeError::Overflow)?,
        timestamp: now,
    });
    msg!("Paid out {}", payout.total());

    Ok(())
}

pub fn fund_rewards(ctx: Context<FundRewards>, amount: u64) -> Result<()> {
    require!(amount > 0, StakeError::InvalidAmount);
    require!(
        ctx.accounts.funder_token_account.amount >= amount,
        StakeError::InsufficientFunds
    );

    let cpi_accounts = Transfer {
        from: ctx.accounts.funder_token_account.to_account_info(),
        to: ctx.accounts.reward_vault.to_account_info(),
        authority: ctx.accounts.funder.to_account_info(),
    };
    token::transfer(
        CpiContext::new(ctx.accounts.token_program.to_account_info(), cpi_accounts),
        amount,
    )?;

    let reward_vault_balance = ctx
        .accounts
        .reward_vault
        .amount
        .checked_add(amount)
        .ok_or(StakeError::Overflow)?;
    msg!("Reward vault funded with {}", amount);

    emit!(RewardsFunded {
        funder: ctx.accounts.funder.key(),
        amount,
        reward_vault: ctx.accounts.reward_vault.key(),
        reward_vault_balance,
    });

    Ok(())
}

/// Reward the staker would receive by unstaking now.
/// Returns value via return_data for efficient CPI access
pub fn pending_reward(ctx: Context<RewardView>) -> Result<u64> {
    pda::verify_stake_info(&ctx.accounts.staker.key(), &ctx.accounts.stake_info.key())?;

    let now = Clock::get()?.unix_timestamp;
    let reward = match load_stake_info(&ctx.accounts.stake_info)? {
        Some(record) => record.pending_reward(now, &ctx.accounts.stake_config.reward_policy)?,
        None => 0,
    };

    msg!("pending_reward: {} for {}", reward, ctx.accounts.staker.key());

    // Set return data so other programs can read via CPI
    anchor_lang::solana_program::program::set_return_data(&reward.to_le_bytes());

    Ok(reward)
}

/// Next stake record for a deposit of `amount`, opening a new record when
/// the participant has none.
pub(crate) fn plan_stake(
    existing: Option<StakeInfo>,
    owner: Pubkey,
    vault: Pubkey,
    source_balance: u64,
    amount: u64,
    now: i64,
    policy: &RewardPolicy,
) -> Result<StakeInfo> {
    require!(amount > 0, StakeError::InvalidAmount);
    require!(source_balance >= amount, StakeError::InsufficientFunds);

    let mut record = match existing {
        Some(record) => {
            require_keys_eq!(record.owner, owner, StakeError::Unauthorized);
            record
        }
        None => {
            let (_, bump) = pda::find_stake_info_address(&owner);
            StakeInfo::open(owner, vault, bump, now)
        }
    };
    record.record_stake(amount, now, policy)?;
    Ok(record)
}

/// Settled stake record and the payout owed, or the reason unstaking is
/// not possible right now.
pub(crate) fn plan_unstake(
    existing: Option<StakeInfo>,
    staker: Pubkey,
    reward_vault_balance: u64,
    now: i64,
    policy: &RewardPolicy,
) -> Result<(StakeInfo, Payout)> {
    let mut record = existing.ok_or(StakeError::NothingStaked)?;
    require_keys_eq!(record.owner, staker, StakeError::Unauthorized);

    let payout = record.settle(now, policy)?;
    require!(
        reward_vault_balance >= payout.reward,
        StakeError::InsufficientRewardFunds
    );
    Ok((record, payout))
}

fn load_stake_info(info: &AccountInfo) -> Result<Option<StakeInfo>> {
    if info.owner != &crate::ID || info.data_is_empty() {
        return Ok(None);
    }
    let data = info.try_borrow_data()?;
    let record = StakeInfo::try_deserialize(&mut &data[..])?;
    Ok(Some(record))
}

fn store_stake_info(info: &AccountInfo, record: &StakeInfo) -> Result<()> {
    let mut data = info.try_borrow_mut_data()?;
    let mut writer: &mut [u8] = &mut data[..];
    record.try_serialize(&mut writer)?;
    Ok(())
}

fn load_token_account(info: &AccountInfo) -> Result<TokenAccount> {
    require_keys_eq!(*info.owner, token::ID, StakeError::AddressMismatch);
    let data = info.try_borrow_data()?;
    let account = TokenAccount::try_deserialize(&mut &data[..])?;
    Ok(account)
}

/// Allocates `space` bytes at a program PDA and hands it to `owner`.
/// Tolerates lamports sent to the address ahead of time, which would make a
/// plain create_account fail.
fn create_pda_account<'info>(
    payer: AccountInfo<'info>,
    target: AccountInfo<'info>,
    system: AccountInfo<'info>,
    space: usize,
    owner: &Pubkey,
    signer: &PdaSigner,
) -> Result<()> {
    let seeds = signer.seeds();
    let signer_seeds = &[&seeds[..]];

    let required = Rent::get()?.minimum_balance(space);
    let current = target.lamports();

    if current == 0 {
        return system_program::create_account(
            CpiContext::new_with_signer(
                system.clone(),
                CreateAccount {
                    from: payer,
                    to: target,
                },
                signer_seeds,
            ),
            required,
            space as u64,
            owner,
        );
    }

    let top_up = required.saturating_sub(current);
    if top_up > 0 {
        system_program::transfer(
            CpiContext::new(
                system.clone(),
                system_program::Transfer {
                    from: payer,
                    to: target.clone(),
                },
            ),
            top_up,
        )?;
    }
    system_program::allocate(
        CpiContext::new_with_signer(
            system.clone(),
            Allocate {
                account_to_allocate: target.clone(),
            },
            signer_seeds,
        ),
        space as u64,
    )?;
    system_program::assign(
        CpiContext::new_with_signer(
            system,
            Assign {
                account_to_assign: target,
            },
            signer_seeds,
        ),
        owner,
    )
}
