use std::collections::HashMap;

use solana_program::{
    account_info::AccountInfo,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
};

use spl_token::{
    error::TokenError,
    instruction::transfer_checked,
    state::Mint,
};

use crate::state::LiquidityPool;

/// Implementations move the full amount or nothing.
pub trait TokenTransfer {
    fn transfer_in(&mut self, mint: &Pubkey, from: &Pubkey, amount: u64) -> Result<(), ProgramError>;

    fn transfer_out(&mut self, mint: &Pubkey, to: &Pubkey, amount: u64) -> Result<(), ProgramError>;
}

/// SPL token transfers between a signing user and the pool's vaults.
pub struct SplTokenTransfer<'a, 'info> {
    pub token_program: &'a AccountInfo<'info>,
    pub pool: &'a AccountInfo<'info>,
    pub pool_bump: u8,
    pub user: &'a AccountInfo<'info>,
    pub mint_a: &'a AccountInfo<'info>,
    pub mint_b: &'a AccountInfo<'info>,
    pub vault_a: &'a AccountInfo<'info>,
    pub vault_b: &'a AccountInfo<'info>,
    pub user_ata_a: &'a AccountInfo<'info>,
    pub user_ata_b: &'a AccountInfo<'info>,
}

impl<'a, 'info> SplTokenTransfer<'a, 'info> {
    // (mint, vault, user token account) for the given mint
    fn leg(
        &self,
        mint: &Pubkey,
    ) -> Result<(&'a AccountInfo<'info>, &'a AccountInfo<'info>, &'a AccountInfo<'info>), ProgramError> {
        if mint == self.mint_a.key {
            Ok((self.mint_a, self.vault_a, self.user_ata_a))
        } else if mint == self.mint_b.key {
            Ok((self.mint_b, self.vault_b, self.user_ata_b))
        } else {
            Err(ProgramError::InvalidArgument)
        }
    }

    fn check_user(&self, owner: &Pubkey) -> Result<(), ProgramError> {
        if owner != self.user.key {
            return Err(ProgramError::InvalidArgument);
        }

        Ok(())
    }
}

impl TokenTransfer for SplTokenTransfer<'_, '_> {
    fn transfer_in(&mut self, mint: &Pubkey, from: &Pubkey, amount: u64) -> Result<(), ProgramError> {
        self.check_user(from)?;

        let (mint, vault, user_ata) = self.leg(mint)?;
        let decimals = Mint::unpack(&mint.data.borrow())?.decimals;

        invoke(
            &transfer_checked(
                self.token_program.key,
                user_ata.key,
                mint.key,
                vault.key,
                self.user.key,
                &[],
                amount,
                decimals,
            )?,
            &[
                user_ata.clone(),
                mint.clone(),
                vault.clone(),
                self.user.clone(),
                self.token_program.clone(),
            ],
        )
    }

    fn transfer_out(&mut self, mint: &Pubkey, to: &Pubkey, amount: u64) -> Result<(), ProgramError> {
        self.check_user(to)?;

        let (mint, vault, user_ata) = self.leg(mint)?;
        let decimals = Mint::unpack(&mint.data.borrow())?.decimals;

        let (mint_lo, mint_hi) = LiquidityPool::sorted_mints(self.mint_a.key, self.mint_b.key);

        invoke_signed(
            &transfer_checked(
                self.token_program.key,
                vault.key,
                mint.key,
                user_ata.key,
                self.pool.key,
                &[],
                amount,
                decimals,
            )?,
            &[
                vault.clone(),
                mint.clone(),
                user_ata.clone(),
                self.pool.clone(),
                self.token_program.clone(),
            ],
            &[
                &[LiquidityPool::SEED_PREFIX, mint_lo.as_ref(), mint_hi.as_ref(), &[self.pool_bump]],
            ],
        )
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    custody: Pubkey,
    balances: HashMap<(Pubkey, Pubkey), u64>,
    allowances: HashMap<(Pubkey, Pubkey), u64>,
}

impl InMemoryLedger {
    pub fn new(custody: Pubkey) -> Self {
        Self {
            custody,
            balances: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    pub fn custody(&self) -> &Pubkey {
        &self.custody
    }

    pub fn balance_of(&self, mint: &Pubkey, owner: &Pubkey) -> u64 {
        self.balances.get(&(*mint, *owner)).copied().unwrap_or_default()
    }

    pub fn allowance(&self, mint: &Pubkey, owner: &Pubkey) -> u64 {
        self.allowances.get(&(*mint, *owner)).copied().unwrap_or_default()
    }

    pub fn mint_to(&mut self, mint: &Pubkey, owner: &Pubkey, amount: u64) -> Result<(), ProgramError> {
        let balance = self.balance_of(mint, owner)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.balances.insert((*mint, *owner), balance);

        Ok(())
    }

    /// Lets custody pull up to `amount` of `mint` from `owner`.
    pub fn approve(&mut self, mint: &Pubkey, owner: &Pubkey, amount: u64) {
        self.allowances.insert((*mint, *owner), amount);
    }

    fn move_balance(
        &mut self,
        mint: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        amount: u64,
    ) -> Result<(), ProgramError> {
        let from_balance = self.balance_of(mint, from)
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientFunds)?;
        let to_balance = self.balance_of(mint, to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.balances.insert((*mint, *from), from_balance);
        self.balances.insert((*mint, *to), to_balance);

        Ok(())
    }
}

impl TokenTransfer for InMemoryLedger {
    fn transfer_in(&mut self, mint: &Pubkey, from: &Pubkey, amount: u64) -> Result<(), ProgramError> {
        let remaining = self.allowance(mint, from)
            .checked_sub(amount)
            .ok_or(TokenError::InsufficientFunds)?;

        let custody = self.custody;
        self.move_balance(mint, from, &custody, amount)?;
        self.allowances.insert((*mint, *from), remaining);

        Ok(())
    }

    fn transfer_out(&mut self, mint: &Pubkey, to: &Pubkey, amount: u64) -> Result<(), ProgramError> {
        let custody = self.custody;
        self.move_balance(mint, &custody, to, amount)
    }
}
