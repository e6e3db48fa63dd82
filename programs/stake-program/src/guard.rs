use anchor_lang::prelude::*;

#[allow(deprecated)]
use anchor_lang::solana_program::bpf_loader_upgradeable::{self, UpgradeableLoaderState};
use anchor_spl::token::{self, Mint};

use crate::error::StakeError;

/// Reads the upgrade authority out of an upgradeable-loader ProgramData
/// account. Trailing bytes (the program ELF) are ignored.
pub fn upgrade_authority(data: &[u8]) -> Result<Option<Pubkey>> {
    match bincode::deserialize::<UpgradeableLoaderState>(data) {
        Ok(UpgradeableLoaderState::ProgramData {
            upgrade_authority_address,
            ..
        }) => Ok(upgrade_authority_address),
        _ => err!(StakeError::InvalidProgramData),
    }
}

/// Only the program's upgrade authority may run one-time setup.
#[allow(deprecated)]
pub fn validate_program_update_authority(program_data: &AccountInfo, signer: &Signer) -> Result<()> {
    require_keys_eq!(
        *program_data.owner,
        bpf_loader_upgradeable::id(),
        StakeError::InvalidProgramData
    );
    let data = program_data.try_borrow_data()?;
    let authority = upgrade_authority(&data)?.ok_or(StakeError::NoUpgradeAuthority)?;
    require_keys_eq!(authority, signer.key(), StakeError::Unauthorized);
    Ok(())
}

/// The staking asset must be an initialized mint owned by the SPL Token
/// program. Anything else is reported as `InvalidAsset`.
pub fn validate_mint(owner: &Pubkey, data: &[u8]) -> Result<()> {
    require_keys_eq!(*owner, token::ID, StakeError::InvalidAsset);
    Mint::try_deserialize(&mut &data[..]).map_err(|_| error!(StakeError::InvalidAsset))?;
    Ok(())
}
