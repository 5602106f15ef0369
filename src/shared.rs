use std::sync::Arc;

use parking_lot::Mutex;
use solana_program::pubkey::Pubkey;

use crate::{
    error::AmmError,
    events::PoolObserver,
    state::{LiquidityPool, SwapDirection},
    transfer::TokenTransfer,
};

/// The lock is held for a whole operation and is not reentrant.
#[derive(Debug, Clone)]
pub struct SharedPool {
    inner: Arc<Mutex<LiquidityPool>>,
}

impl SharedPool {
    pub fn new(pool: LiquidityPool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pool)),
        }
    }

    pub fn provide_liquidity<T, O>(
        &self,
        amount_a: u64,
        amount_b: u64,
        provider: &Pubkey,
        transfer: &mut T,
        observer: &mut O,
    ) -> Result<u64, AmmError>
    where
        T: TokenTransfer + ?Sized,
        O: PoolObserver + ?Sized,
    {
        self.inner.lock().provide_liquidity(amount_a, amount_b, provider, transfer, observer)
    }

    pub fn withdraw_liquidity<T, O>(
        &self,
        share_amount: u64,
        provider: &Pubkey,
        transfer: &mut T,
        observer: &mut O,
    ) -> Result<(u64, u64), AmmError>
    where
        T: TokenTransfer + ?Sized,
        O: PoolObserver + ?Sized,
    {
        self.inner.lock().withdraw_liquidity(share_amount, provider, transfer, observer)
    }

    pub fn swap<T, O>(
        &self,
        amount_in: u64,
        direction: SwapDirection,
        trader: &Pubkey,
        transfer: &mut T,
        observer: &mut O,
    ) -> Result<u64, AmmError>
    where
        T: TokenTransfer + ?Sized,
        O: PoolObserver + ?Sized,
    {
        self.inner.lock().swap(amount_in, direction, trader, transfer, observer)
    }

    pub fn reserves(&self) -> (u64, u64) {
        self.inner.lock().reserves()
    }

    pub fn price(&self) -> u64 {
        self.inner.lock().price()
    }

    pub fn liquidity_of(&self, provider: &Pubkey) -> u64 {
        self.inner.lock().liquidity_of(provider)
    }

    pub fn total_liquidity(&self) -> u64 {
        self.inner.lock().total_liquidity()
    }

    pub fn quote_swap(&self, amount_in: u64, direction: SwapDirection) -> Result<u64, AmmError> {
        self.inner.lock().quote_swap(amount_in, direction)
    }

    pub fn snapshot(&self) -> LiquidityPool {
        self.inner.lock().clone()
    }
}
