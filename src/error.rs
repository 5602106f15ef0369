use thiserror::Error;

use solana_program::program_error::ProgramError;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmmError {
    #[error("Amount must be greater than zero")]
    InvalidAmount,
    #[error("Deposit amounts do not match the pool's reserve ratio")]
    RatioMismatch,
    #[error("Withdrawal exceeds the provider's liquidity share")]
    InsufficientShare,
    #[error("Swap output would drain the output reserve")]
    InsufficientLiquidity,
    #[error("Token transfer failed")]
    TransferFailed,
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
    #[error("Token mints must be different")]
    IdenticalMints,
    #[error("Pool address does not match PDA derived from token mints")]
    PoolAddressMismatch,
    #[error("Vault address does not match ATA derived from mint and pool address")]
    VaultAddressMismatch,
    #[error("Mint address does not match pool data")]
    MintAddressMismatch,
    #[error("Token account does not match ATA derived from mint and user")]
    UserTokenAccountMismatch,
    #[error("Pool account is already initialized")]
    AlreadyInitialized,
    #[error("Pool account is not initialized")]
    NotInitialized,
    #[error("Pool has no room for another liquidity provider")]
    ProviderCapacityExceeded,
}

impl From<AmmError> for ProgramError {
    fn from(error: AmmError) -> Self {
        ProgramError::Custom(error as u32)
    }
}
