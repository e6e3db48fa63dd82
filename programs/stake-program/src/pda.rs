//! Program derived addresses used by the stake program.
//!
//! Every address here can be recomputed off-chain from public inputs. The
//! handlers never trust an address supplied by the caller: they re-derive it
//! and compare. Vault-outbound transfers are signed with a [`PdaSigner`],
//! which can only be obtained from a successful verification below.

use anchor_lang::prelude::*;
use anchor_spl::associated_token::get_associated_token_address;

#[allow(deprecated)]
use anchor_lang::solana_program::bpf_loader_upgradeable::{self};

use crate::error::StakeError;

pub const STAKE_CONFIG_SEED: &[u8] = b"stake_config";
pub const REWARD_VAULT_SEED: &[u8] = b"reward";
pub const STAKE_INFO_SEED: &[u8] = b"stake_info";

pub fn find_config_address() -> (Pubkey, u8) {
    Pubkey::find_program_address(&[STAKE_CONFIG_SEED], &crate::ID)
}

pub fn find_reward_vault_address() -> (Pubkey, u8) {
    Pubkey::find_program_address(&[REWARD_VAULT_SEED], &crate::ID)
}

pub fn find_stake_info_address(owner: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[STAKE_INFO_SEED, owner.as_ref()], &crate::ID)
}

/// The participant vault is the associated token account of their stake
/// record, so its token authority is the stake record PDA.
pub fn stake_vault_address(stake_info: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(stake_info, mint)
}

// Helper function to derive the program data address
#[allow(deprecated)]
pub fn program_data_address(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[program_id.as_ref()], &bpf_loader_upgradeable::id()).0
}

pub fn verify_stake_info(owner: &Pubkey, supplied: &Pubkey) -> Result<PdaSigner> {
    let (expected, bump) = find_stake_info_address(owner);
    require_keys_eq!(*supplied, expected, StakeError::AddressMismatch);
    Ok(PdaSigner {
        address: expected,
        kind: SignerKind::StakeInfo(*owner),
        bump: [bump],
    })
}

pub fn verify_stake_vault(stake_info: &Pubkey, mint: &Pubkey, supplied: &Pubkey) -> Result<()> {
    require_keys_eq!(
        *supplied,
        stake_vault_address(stake_info, mint),
        StakeError::AddressMismatch
    );
    Ok(())
}

/// Checks `supplied` against the reward vault PDA using the bump stored in
/// the config, avoiding a bump search on every unstake.
pub fn verify_reward_vault(supplied: &Pubkey, bump: u8) -> Result<PdaSigner> {
    let expected = Pubkey::create_program_address(&[REWARD_VAULT_SEED, &[bump]], &crate::ID)
        .map_err(|_| error!(StakeError::AddressMismatch))?;
    require_keys_eq!(*supplied, expected, StakeError::AddressMismatch);
    Ok(PdaSigner {
        address: expected,
        kind: SignerKind::RewardVault,
        bump: [bump],
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SignerKind {
    RewardVault,
    StakeInfo(Pubkey),
}

/// Capability to sign a CPI as one of this program's PDAs.
#[derive(Debug)]
pub struct PdaSigner {
    address: Pubkey,
    kind: SignerKind,
    bump: [u8; 1],
}

impl PdaSigner {
    pub fn address(&self) -> Pubkey {
        self.address
    }

    pub fn seeds(&self) -> Vec<&[u8]> {
        match &self.kind {
            SignerKind::RewardVault => vec![REWARD_VAULT_SEED, &self.bump[..]],
            SignerKind::StakeInfo(owner) => vec![STAKE_INFO_SEED, owner.as_ref(), &self.bump[..]],
        }
    }
}
