//! LiteSVM harness for the stake program.
//!
//! Loads `target/deploy/stake_program.so` (run `anchor build` first), writes
//! SPL mints and token accounts straight into the bank and wraps every
//! instruction the program exposes.

use std::path::PathBuf;

#[allow(deprecated)]
use anchor_lang::solana_program::bpf_loader_upgradeable::{self, UpgradeableLoaderState};
use anchor_lang::solana_program::program_option::COption;
use anchor_lang::solana_program::program_pack::Pack;
use anchor_lang::{AccountDeserialize, InstructionData, ToAccountMetas};
use anchor_spl::associated_token::get_associated_token_address;
use anchor_spl::token::spl_token::state::{
    Account as SplTokenAccount, AccountState, Mint as SplMint,
};
use litesvm::types::{FailedTransactionMetadata, TransactionMetadata};
use litesvm::LiteSVM;
use solana_account::Account;
use solana_clock::Clock;
use solana_instruction::error::InstructionError;
use solana_instruction::Instruction;
use solana_keypair::Keypair;
use solana_native_token::LAMPORTS_PER_SOL;
use solana_pubkey::Pubkey;
use solana_signer::Signer;
use solana_transaction::Transaction;
use solana_transaction_error::TransactionError;
use stake_program::error::StakeError;
use stake_program::pda;
use stake_program::reward::RewardPolicy;
use stake_program::state::{StakeConfig, StakeInfo};

pub const PROGRAM_ID: Pubkey = stake_program::ID;
pub const DECIMALS: u8 = 6;

pub type TxResult = Result<TransactionMetadata, FailedTransactionMetadata>;

pub fn read_program() -> Vec<u8> {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("../target/deploy/stake_program.so");
    std::fs::read(&path).unwrap_or_else(|_| panic!("Failed to read program from {:?}", path))
}

/// Asserts that the transaction failed inside the program with `expected`.
pub fn assert_stake_error(result: TxResult, expected: StakeError) {
    let failed = match result {
        Ok(meta) => panic!("expected {:?}, transaction succeeded: {:?}", expected, meta.logs),
        Err(failed) => failed,
    };
    assert_eq!(
        failed.err,
        TransactionError::InstructionError(0, InstructionError::Custom(u32::from(expected))),
        "logs: {:?}",
        failed.meta.logs
    );
}

pub struct Harness {
    pub svm: LiteSVM,
    pub admin: Keypair,
    pub mint: Pubkey,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// Fresh bank with the program deployed, `admin` as its upgrade
    /// authority and one mint to stake.
    pub fn new() -> Self {
        let mut svm = LiteSVM::new();
        svm.add_program(PROGRAM_ID, &read_program());

        let admin = Keypair::new();
        svm.airdrop(&admin.pubkey(), 10 * LAMPORTS_PER_SOL).unwrap();

        let mut harness = Self {
            svm,
            admin,
            mint: Pubkey::default(),
        };
        harness.set_upgrade_authority(Some(harness.admin.pubkey()));
        harness.mint = harness.create_mint();
        harness
    }

    /// The bank loads programs through the non-upgradeable loader, so the
    /// ProgramData account the initialize guard reads is written by hand.
    #[allow(deprecated)]
    pub fn set_upgrade_authority(&mut self, authority: Option<Pubkey>) {
        let mut data = bincode::serialize(&UpgradeableLoaderState::ProgramData {
            slot: 0,
            upgrade_authority_address: authority,
        })
        .unwrap();
        data.resize(UpgradeableLoaderState::size_of_programdata_metadata(), 0);
        self.put_account(
            pda::program_data_address(&PROGRAM_ID),
            data,
            bpf_loader_upgradeable::id(),
        );
    }

    pub fn put_account(&mut self, address: Pubkey, data: Vec<u8>, owner: Pubkey) {
        let lamports = self.svm.minimum_balance_for_rent_exemption(data.len());
        self.svm
            .set_account(
                address,
                Account {
                    lamports,
                    data,
                    owner,
                    executable: false,
                    rent_epoch: 0,
                },
            )
            .unwrap();
    }

    pub fn create_mint(&mut self) -> Pubkey {
        let mint = Pubkey::new_unique();
        let state = SplMint {
            mint_authority: COption::Some(self.admin.pubkey()),
            supply: u64::MAX / 2,
            decimals: DECIMALS,
            is_initialized: true,
            freeze_authority: COption::None,
        };
        let mut data = vec![0u8; SplMint::LEN];
        SplMint::pack(state, &mut data).unwrap();
        self.put_account(mint, data, anchor_spl::token::ID);
        mint
    }

    /// Writes an initialized token account holding `amount` of `mint`.
    pub fn put_token_account(&mut self, address: Pubkey, owner: Pubkey, mint: Pubkey, amount: u64) {
        let state = SplTokenAccount {
            mint,
            owner,
            amount,
            delegate: COption::None,
            state: AccountState::Initialized,
            is_native: COption::None,
            delegated_amount: 0,
            close_authority: COption::None,
        };
        let mut data = vec![0u8; SplTokenAccount::LEN];
        SplTokenAccount::pack(state, &mut data).unwrap();
        self.put_account(address, data, anchor_spl::token::ID);
    }

    /// Funded keypair plus its associated token account for the staking mint.
    pub fn participant(&mut self, tokens: u64) -> (Keypair, Pubkey) {
        let owner = Keypair::new();
        self.svm
            .airdrop(&owner.pubkey(), LAMPORTS_PER_SOL)
            .unwrap();
        let token_account = get_associated_token_address(&owner.pubkey(), &self.mint);
        self.put_token_account(token_account, owner.pubkey(), self.mint, tokens);
        (owner, token_account)
    }

    pub fn token_balance(&self, address: &Pubkey) -> u64 {
        let account = self.svm.get_account(address).unwrap();
        SplTokenAccount::unpack(&account.data).unwrap().amount
    }

    pub fn stake_info(&self, owner: &Pubkey) -> Option<StakeInfo> {
        let (address, _) = pda::find_stake_info_address(owner);
        let account = self.svm.get_account(&address)?;
        if account.owner != PROGRAM_ID {
            return None;
        }
        Some(StakeInfo::try_deserialize(&mut account.data.as_slice()).unwrap())
    }

    pub fn config(&self) -> StakeConfig {
        let (address, _) = pda::find_config_address();
        let account = self.svm.get_account(&address).unwrap();
        StakeConfig::try_deserialize(&mut account.data.as_slice()).unwrap()
    }

    pub fn reward_vault(&self) -> Pubkey {
        pda::find_reward_vault_address().0
    }

    pub fn vault_of(&self, owner: &Pubkey) -> Pubkey {
        let (stake_info, _) = pda::find_stake_info_address(owner);
        pda::stake_vault_address(&stake_info, &self.mint)
    }

    pub fn now(&self) -> i64 {
        self.svm.get_sysvar::<Clock>().unix_timestamp
    }

    pub fn warp(&mut self, seconds: i64) {
        let mut clock = self.svm.get_sysvar::<Clock>();
        clock.unix_timestamp += seconds;
        self.svm.set_sysvar::<Clock>(&clock);
    }

    /// Signs with every signer, the first one paying. A fresh blockhash per
    /// call keeps identical retries from being deduplicated.
    pub fn send(&mut self, ix: Instruction, signers: &[&Keypair]) -> TxResult {
        self.svm.expire_blockhash();
        let tx = Transaction::new_signed_with_payer(
            &[ix],
            Some(&signers[0].pubkey()),
            signers,
            self.svm.latest_blockhash(),
        );
        self.svm.send_transaction(tx)
    }

    pub fn initialize_ix(&self, admin: &Pubkey, mint: &Pubkey, reward_policy: RewardPolicy) -> Instruction {
        let accounts = stake_program::accounts::Initialize {
            admin: *admin,
            mint: *mint,
            stake_config: pda::find_config_address().0,
            reward_vault: self.reward_vault(),
            program_data: pda::program_data_address(&PROGRAM_ID),
            token_program: anchor_spl::token::ID,
            system_program: anchor_lang::system_program::ID,
        };
        Instruction {
            program_id: PROGRAM_ID,
            accounts: accounts.to_account_metas(None),
            data: stake_program::instruction::Initialize { reward_policy }.data(),
        }
    }

    pub fn stake_ix(&self, staker: &Pubkey, token_account: &Pubkey, amount: u64) -> Instruction {
        let accounts = stake_program::accounts::Stake {
            staker: *staker,
            stake_config: pda::find_config_address().0,
            mint: self.mint,
            staker_token_account: *token_account,
            stake_info: pda::find_stake_info_address(staker).0,
            vault_token_account: self.vault_of(staker),
            token_program: anchor_spl::token::ID,
            associated_token_program: anchor_spl::associated_token::ID,
            system_program: anchor_lang::system_program::ID,
        };
        Instruction {
            program_id: PROGRAM_ID,
            accounts: accounts.to_account_metas(None),
            data: stake_program::instruction::Stake { amount }.data(),
        }
    }

    pub fn unstake_ix(&self, staker: &Pubkey, token_account: &Pubkey) -> Instruction {
        let accounts = stake_program::accounts::Unstake {
            staker: *staker,
            stake_config: pda::find_config_address().0,
            mint: self.mint,
            staker_token_account: *token_account,
            stake_info: pda::find_stake_info_address(staker).0,
            vault_token_account: self.vault_of(staker),
            reward_vault: self.reward_vault(),
            token_program: anchor_spl::token::ID,
        };
        Instruction {
            program_id: PROGRAM_ID,
            accounts: accounts.to_account_metas(None),
            data: stake_program::instruction::Unstake {}.data(),
        }
    }

    pub fn fund_rewards_ix(&self, funder: &Pubkey, token_account: &Pubkey, amount: u64) -> Instruction {
        let accounts = stake_program::accounts::FundRewards {
            funder: *funder,
            stake_config: pda::find_config_address().0,
            funder_token_account: *token_account,
            reward_vault: self.reward_vault(),
            token_program: anchor_spl::token::ID,
        };
        Instruction {
            program_id: PROGRAM_ID,
            accounts: accounts.to_account_metas(None),
            data: stake_program::instruction::FundRewards { amount }.data(),
        }
    }

    pub fn pending_reward_ix(&self, staker: &Pubkey) -> Instruction {
        let accounts = stake_program::accounts::RewardView {
            stake_config: pda::find_config_address().0,
            staker: *staker,
            stake_info: pda::find_stake_info_address(staker).0,
        };
        Instruction {
            program_id: PROGRAM_ID,
            accounts: accounts.to_account_metas(None),
            data: stake_program::instruction::PendingReward {}.data(),
        }
    }

    pub fn initialize(&mut self, reward_policy: RewardPolicy) -> TxResult {
        let ix = self.initialize_ix(&self.admin.pubkey(), &self.mint, reward_policy);
        let admin = self.admin.insecure_clone();
        self.send(ix, &[&admin])
    }

    pub fn stake(&mut self, staker: &Keypair, token_account: &Pubkey, amount: u64) -> TxResult {
        let ix = self.stake_ix(&staker.pubkey(), token_account, amount);
        self.send(ix, &[staker])
    }

    pub fn unstake(&mut self, staker: &Keypair, token_account: &Pubkey) -> TxResult {
        let ix = self.unstake_ix(&staker.pubkey(), token_account);
        self.send(ix, &[staker])
    }

    pub fn fund_rewards(&mut self, funder: &Keypair, token_account: &Pubkey, amount: u64) -> TxResult {
        let ix = self.fund_rewards_ix(&funder.pubkey(), token_account, amount);
        self.send(ix, &[funder])
    }

    /// Reads the `pending_reward` view through the transaction's return data.
    pub fn pending_reward(&mut self, staker: &Pubkey) -> u64 {
        let ix = self.pending_reward_ix(staker);
        let admin = self.admin.insecure_clone();
        let meta = self.send(ix, &[&admin]).unwrap();
        let bytes: [u8; 8] = meta.return_data.data[..8].try_into().unwrap();
        u64::from_le_bytes(bytes)
    }
}
