use borsh::BorshSerialize;
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    program_error::ProgramError,
    program::{invoke, invoke_signed},
    pubkey::Pubkey,
    sysvar::{rent::Rent, Sysvar},
    borsh1::try_from_slice_unchecked,
    msg,
};

use solana_system_interface::{
    program::id as system_program_id,
    instruction::create_account,
};

use spl_associated_token_account::{
    id as associated_token_program_id,
    get_associated_token_address,
    instruction::create_associated_token_account_idempotent,
};
use spl_token::id as token_program_id;

use crate::{
    instruction::AmmInstruction,
    state::{LiquidityPool, SwapDirection},
    error::AmmError,
    events::MsgLogger,
    transfer::SplTokenTransfer,
};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8]
) -> ProgramResult {
    let instruction = AmmInstruction::unpack(instruction_data)?;

    match instruction {
        AmmInstruction::InitializePool => {
            process_initialize_pool(program_id, accounts)
        },
        AmmInstruction::ProvideLiquidity { amount_a, amount_b } => {
            process_provide_liquidity(program_id, accounts, amount_a, amount_b)
        },
        AmmInstruction::WithdrawLiquidity { share_amount } => {
            process_withdraw_liquidity(program_id, accounts, share_amount)
        },
        AmmInstruction::Swap { amount_in, direction } => {
            process_swap(program_id, accounts, amount_in, direction)
        },
    }
}

pub fn process_initialize_pool(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
) -> ProgramResult {
    let accounts_iter = &mut accounts.iter();

    let payer = next_account_info(accounts_iter)?;
    let pool = next_account_info(accounts_iter)?;
    let mint_a = next_account_info(accounts_iter)?;
    let mint_b = next_account_info(accounts_iter)?;
    let vault_a = next_account_info(accounts_iter)?;
    let vault_b = next_account_info(accounts_iter)?;
    let token_program = next_account_info(accounts_iter)?;
    let associated_token_program = next_account_info(accounts_iter)?;
    let system_program = next_account_info(accounts_iter)?;

    if !payer.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    if mint_a.key == mint_b.key {
        return Err(AmmError::IdenticalMints.into());
    }

    let (pool_pda, pool_bump) = LiquidityPool::find_address(program_id, mint_a.key, mint_b.key);

    if *pool.key != pool_pda {
        return Err(AmmError::PoolAddressMismatch.into());
    }

    if !pool.data_is_empty() {
        return Err(AmmError::AlreadyInitialized.into());
    }

    if *vault_a.key != get_associated_token_address(pool.key, mint_a.key) {
        return Err(AmmError::VaultAddressMismatch.into());
    }

    if *vault_b.key != get_associated_token_address(pool.key, mint_b.key) {
        return Err(AmmError::VaultAddressMismatch.into());
    }

    if *token_program.key != token_program_id() {
        return Err(ProgramError::IncorrectProgramId);
    }

    if *associated_token_program.key != associated_token_program_id() {
        return Err(ProgramError::IncorrectProgramId);
    }

    if *system_program.key != system_program_id() {
        return Err(ProgramError::IncorrectProgramId);
    }

    let pool_data = LiquidityPool::new(*mint_a.key, *mint_b.key, pool_bump)?;

    // create pool account
    let space = LiquidityPool::space(LiquidityPool::MAX_PROVIDERS);
    let pool_rent = Rent::get()?.minimum_balance(space);

    let (mint_lo, mint_hi) = LiquidityPool::sorted_mints(mint_a.key, mint_b.key);

    invoke_signed(
        &create_account(
            payer.key,
            pool.key,
            pool_rent,
            space as u64,
            program_id,
        ),
        &[payer.clone(), pool.clone(), system_program.clone()],
        &[
            &[LiquidityPool::SEED_PREFIX, mint_lo.as_ref(), mint_hi.as_ref(), &[pool_bump]],
        ],
    )?;

    // create the pool's vaults
    for (vault, mint) in [(vault_a, mint_a), (vault_b, mint_b)] {
        invoke(
            &create_associated_token_account_idempotent(
                payer.key,
                pool.key,
                mint.key,
                token_program.key,
            ),
            &[
                payer.clone(),
                vault.clone(),
                pool.clone(),
                mint.clone(),
                system_program.clone(),
                token_program.clone(),
                associated_token_program.clone(),
            ],
        )?;
    }

    pool_data.serialize(&mut &mut pool.data.borrow_mut()[..])?;

    msg!("pool initialized: {} ({} / {})", pool.key, mint_a.key, mint_b.key);

    Ok(())
}

pub fn process_provide_liquidity(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    amount_a: u64,
    amount_b: u64,
) -> ProgramResult {
    let (pool_accounts, mut pool_data) = PoolAccounts::load(program_id, accounts)?;
    let bump = pool_data.bump;
    let provider = pool_accounts.user.key;

    if pool_data.liquidity_of(provider) == 0
        && pool_data.provider_count() >= LiquidityPool::MAX_PROVIDERS
    {
        return Err(AmmError::ProviderCapacityExceeded.into());
    }

    let liquidity_minted = pool_data.provide_liquidity(
        amount_a,
        amount_b,
        provider,
        &mut pool_accounts.transfer(bump),
        &mut MsgLogger,
    )?;

    msg!("minted {} liquidity to {}", liquidity_minted, provider);

    pool_accounts.store(&pool_data)
}

pub fn process_withdraw_liquidity(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    share_amount: u64,
) -> ProgramResult {
    let (pool_accounts, mut pool_data) = PoolAccounts::load(program_id, accounts)?;
    let bump = pool_data.bump;
    let provider = pool_accounts.user.key;

    let (amount_a, amount_b) = pool_data.withdraw_liquidity(
        share_amount,
        provider,
        &mut pool_accounts.transfer(bump),
        &mut MsgLogger,
    )?;

    msg!("paid out ({}, {}) to {}", amount_a, amount_b, provider);

    pool_accounts.store(&pool_data)
}

pub fn process_swap(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    amount_in: u64,
    direction: SwapDirection,
) -> ProgramResult {
    let (pool_accounts, mut pool_data) = PoolAccounts::load(program_id, accounts)?;
    let bump = pool_data.bump;
    let trader = pool_accounts.user.key;

    let amount_out = pool_data.swap(
        amount_in,
        direction,
        trader,
        &mut pool_accounts.transfer(bump),
        &mut MsgLogger,
    )?;

    msg!("swapped {} for {} ({:?})", amount_in, amount_out, direction);

    pool_accounts.store(&pool_data)
}

/// Validated accounts shared by deposit, withdrawal and swap.
struct PoolAccounts<'a, 'info> {
    user: &'a AccountInfo<'info>,
    pool: &'a AccountInfo<'info>,
    mint_a: &'a AccountInfo<'info>,
    mint_b: &'a AccountInfo<'info>,
    vault_a: &'a AccountInfo<'info>,
    vault_b: &'a AccountInfo<'info>,
    user_ata_a: &'a AccountInfo<'info>,
    user_ata_b: &'a AccountInfo<'info>,
    token_program: &'a AccountInfo<'info>,
}

impl<'a, 'info> PoolAccounts<'a, 'info> {
    fn load(
        program_id: &Pubkey,
        accounts: &'a [AccountInfo<'info>],
    ) -> Result<(Self, LiquidityPool), ProgramError> {
        let accounts_iter = &mut accounts.iter();

        let pool_accounts = Self {
            user: next_account_info(accounts_iter)?,
            pool: next_account_info(accounts_iter)?,
            mint_a: next_account_info(accounts_iter)?,
            mint_b: next_account_info(accounts_iter)?,
            vault_a: next_account_info(accounts_iter)?,
            vault_b: next_account_info(accounts_iter)?,
            user_ata_a: next_account_info(accounts_iter)?,
            user_ata_b: next_account_info(accounts_iter)?,
            token_program: next_account_info(accounts_iter)?,
        };

        let pool_data = pool_accounts.validate(program_id)?;

        Ok((pool_accounts, pool_data))
    }

    fn validate(&self, program_id: &Pubkey) -> Result<LiquidityPool, ProgramError> {
        if !self.user.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        if self.pool.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }

        if *self.token_program.key != token_program_id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        let pool_data = self.pool_data()?;

        if *self.mint_a.key != pool_data.mint_a || *self.mint_b.key != pool_data.mint_b {
            return Err(AmmError::MintAddressMismatch.into());
        }

        let (mint_lo, mint_hi) = LiquidityPool::sorted_mints(&pool_data.mint_a, &pool_data.mint_b);

        let expected_pool = Pubkey::create_program_address(
            &[LiquidityPool::SEED_PREFIX, mint_lo.as_ref(), mint_hi.as_ref(), &[pool_data.bump]],
            program_id,
        ).map_err(|_| ProgramError::InvalidSeeds)?;

        if expected_pool != *self.pool.key {
            return Err(AmmError::PoolAddressMismatch.into());
        }

        if *self.vault_a.key != get_associated_token_address(self.pool.key, self.mint_a.key)
            || *self.vault_b.key != get_associated_token_address(self.pool.key, self.mint_b.key)
        {
            return Err(AmmError::VaultAddressMismatch.into());
        }

        if *self.user_ata_a.key != get_associated_token_address(self.user.key, self.mint_a.key)
            || *self.user_ata_b.key != get_associated_token_address(self.user.key, self.mint_b.key)
        {
            return Err(AmmError::UserTokenAccountMismatch.into());
        }

        Ok(pool_data)
    }

    fn pool_data(&self) -> Result<LiquidityPool, ProgramError> {
        let pool_data = try_from_slice_unchecked::<LiquidityPool>(&self.pool.data.borrow())?;

        if !pool_data.is_initialized {
            return Err(AmmError::NotInitialized.into());
        }

        Ok(pool_data)
    }

    fn transfer(&self, pool_bump: u8) -> SplTokenTransfer<'a, 'info> {
        SplTokenTransfer {
            token_program: self.token_program,
            pool: self.pool,
            pool_bump,
            user: self.user,
            mint_a: self.mint_a,
            mint_b: self.mint_b,
            vault_a: self.vault_a,
            vault_b: self.vault_b,
            user_ata_a: self.user_ata_a,
            user_ata_b: self.user_ata_b,
        }
    }

    fn store(&self, pool_data: &LiquidityPool) -> ProgramResult {
        pool_data.serialize(&mut &mut self.pool.data.borrow_mut()[..])?;

        Ok(())
    }
}
