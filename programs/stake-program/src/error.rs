use anchor_lang::prelude::*;

#[error_code]
pub enum StakeError {
    #[msg("Stake config already initialized")]
    AlreadyInitialized,
    #[msg("Invalid asset provided")]
    InvalidAsset,
    #[msg("Unauthorized")]
    Unauthorized,
    #[msg("Supplied account does not match its derived address")]
    AddressMismatch,
    #[msg("Insufficient funds")]
    InsufficientFunds,
    #[msg("Nothing staked")]
    NothingStaked,
    #[msg("Reward vault cannot cover the reward")]
    InsufficientRewardFunds,

    #[msg("Invalid amount")]
    InvalidAmount,
    #[msg("Invalid token owner")]
    InvalidTokenOwner,
    #[msg("Invalid reward policy")]
    InvalidRewardPolicy,
    #[msg("Arithmetic overflow")]
    Overflow,
    #[msg("ProgramData account did not match expected PDA.")]
    InvalidProgramData,
    #[msg("Program has no upgrade authority (set to None).")]
    NoUpgradeAuthority,
}
