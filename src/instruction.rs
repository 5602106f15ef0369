use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
};

use borsh::BorshDeserialize;

use solana_system_interface::program::id as system_program_id;

use spl_associated_token_account::{
    id as associated_token_program_id,
    get_associated_token_address,
};
use spl_token::id as token_program_id;

use crate::state::{LiquidityPool, SwapDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmmInstruction {
    /// Accounts:
    /// 0. `[signer, writable]` payer
    /// 1. `[writable]` pool PDA
    /// 2. `[]` mint A
    /// 3. `[]` mint B
    /// 4. `[writable]` vault A (pool's ATA for mint A)
    /// 5. `[writable]` vault B (pool's ATA for mint B)
    /// 6. `[]` token program
    /// 7. `[]` associated token program
    /// 8. `[]` system program
    InitializePool,
    /// Accounts for this and every following variant:
    /// 0. `[signer]` user
    /// 1. `[writable]` pool PDA
    /// 2. `[]` mint A
    /// 3. `[]` mint B
    /// 4. `[writable]` vault A
    /// 5. `[writable]` vault B
    /// 6. `[writable]` user's ATA for mint A
    /// 7. `[writable]` user's ATA for mint B
    /// 8. `[]` token program
    ProvideLiquidity {
        amount_a: u64,
        amount_b: u64,
    },
    WithdrawLiquidity {
        share_amount: u64,
    },
    Swap {
        amount_in: u64,
        direction: SwapDirection,
    },
}

impl AmmInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (&discriminator, rest) = input.split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        Ok(
            match discriminator {
                0 => {
                    if !rest.is_empty() {
                        return Err(ProgramError::InvalidInstructionData);
                    }

                    Self::InitializePool
                },
                1 => {
                    let payload = ProvideLiquidityPayload::try_from_slice(rest)
                        .map_err(|_| ProgramError::InvalidInstructionData)?;

                    Self::ProvideLiquidity {
                        amount_a: payload.amount_a,
                        amount_b: payload.amount_b,
                    }
                },
                2 => {
                    let payload = WithdrawLiquidityPayload::try_from_slice(rest)
                        .map_err(|_| ProgramError::InvalidInstructionData)?;

                    Self::WithdrawLiquidity {
                        share_amount: payload.share_amount,
                    }
                },
                3 => {
                    let payload = SwapPayload::try_from_slice(rest)
                        .map_err(|_| ProgramError::InvalidInstructionData)?;

                    Self::Swap {
                        amount_in: payload.amount_in,
                        direction: payload.direction,
                    }
                },

                _ => return Err(ProgramError::InvalidInstructionData)
            }
        )
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + 8 + 8);

        match *self {
            Self::InitializePool => buf.push(0),
            Self::ProvideLiquidity { amount_a, amount_b } => {
                buf.push(1);
                buf.extend_from_slice(&amount_a.to_le_bytes());
                buf.extend_from_slice(&amount_b.to_le_bytes());
            },
            Self::WithdrawLiquidity { share_amount } => {
                buf.push(2);
                buf.extend_from_slice(&share_amount.to_le_bytes());
            },
            Self::Swap { amount_in, direction } => {
                buf.push(3);
                buf.extend_from_slice(&amount_in.to_le_bytes());
                buf.push(direction as u8);
            },
        }

        buf
    }
}

#[derive(BorshDeserialize)]
struct ProvideLiquidityPayload {
    amount_a: u64,
    amount_b: u64,
}

#[derive(BorshDeserialize)]
struct WithdrawLiquidityPayload {
    share_amount: u64,
}

#[derive(BorshDeserialize)]
struct SwapPayload {
    amount_in: u64,
    direction: SwapDirection,
}

pub fn initialize_pool(
    program_id: &Pubkey,
    payer: &Pubkey,
    mint_a: &Pubkey,
    mint_b: &Pubkey,
) -> Instruction {
    let (pool, _) = LiquidityPool::find_address(program_id, mint_a, mint_b);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(pool, false),
            AccountMeta::new_readonly(*mint_a, false),
            AccountMeta::new_readonly(*mint_b, false),
            AccountMeta::new(get_associated_token_address(&pool, mint_a), false),
            AccountMeta::new(get_associated_token_address(&pool, mint_b), false),
            AccountMeta::new_readonly(token_program_id(), false),
            AccountMeta::new_readonly(associated_token_program_id(), false),
            AccountMeta::new_readonly(system_program_id(), false),
        ],
        data: AmmInstruction::InitializePool.pack(),
    }
}

pub fn provide_liquidity(
    program_id: &Pubkey,
    provider: &Pubkey,
    mint_a: &Pubkey,
    mint_b: &Pubkey,
    amount_a: u64,
    amount_b: u64,
) -> Instruction {
    pool_operation(
        program_id,
        provider,
        mint_a,
        mint_b,
        AmmInstruction::ProvideLiquidity { amount_a, amount_b },
    )
}

pub fn withdraw_liquidity(
    program_id: &Pubkey,
    provider: &Pubkey,
    mint_a: &Pubkey,
    mint_b: &Pubkey,
    share_amount: u64,
) -> Instruction {
    pool_operation(
        program_id,
        provider,
        mint_a,
        mint_b,
        AmmInstruction::WithdrawLiquidity { share_amount },
    )
}

pub fn swap(
    program_id: &Pubkey,
    trader: &Pubkey,
    mint_a: &Pubkey,
    mint_b: &Pubkey,
    amount_in: u64,
    direction: SwapDirection,
) -> Instruction {
    pool_operation(
        program_id,
        trader,
        mint_a,
        mint_b,
        AmmInstruction::Swap { amount_in, direction },
    )
}

fn pool_operation(
    program_id: &Pubkey,
    user: &Pubkey,
    mint_a: &Pubkey,
    mint_b: &Pubkey,
    instruction: AmmInstruction,
) -> Instruction {
    let (pool, _) = LiquidityPool::find_address(program_id, mint_a, mint_b);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*user, true),
            AccountMeta::new(pool, false),
            AccountMeta::new_readonly(*mint_a, false),
            AccountMeta::new_readonly(*mint_b, false),
            AccountMeta::new(get_associated_token_address(&pool, mint_a), false),
            AccountMeta::new(get_associated_token_address(&pool, mint_b), false),
            AccountMeta::new(get_associated_token_address(user, mint_a), false),
            AccountMeta::new(get_associated_token_address(user, mint_b), false),
            AccountMeta::new_readonly(token_program_id(), false),
        ],
        data: instruction.pack(),
    }
}
