use solana_program::{msg, pubkey::Pubkey};

use borsh::{BorshSerialize, BorshDeserialize};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    LiquidityProvided {
        provider: Pubkey,
        amount_a: u64,
        amount_b: u64,
        liquidity_minted: u64,
    },
    LiquidityWithdrawn {
        provider: Pubkey,
        amount_a: u64,
        amount_b: u64,
        share_burned: u64,
    },
    Swapped {
        trader: Pubkey,
        mint_in: Pubkey,
        mint_out: Pubkey,
        amount_in: u64,
        amount_out: u64,
    },
}

pub trait PoolObserver {
    fn on_event(&mut self, event: &PoolEvent);
}

impl PoolObserver for () {
    fn on_event(&mut self, _event: &PoolEvent) {}
}

impl PoolObserver for Vec<PoolEvent> {
    fn on_event(&mut self, event: &PoolEvent) {
        self.push(event.clone());
    }
}

/// Writes every event to the program log.
#[derive(Debug, Default, Clone, Copy)]
pub struct MsgLogger;

impl PoolObserver for MsgLogger {
    fn on_event(&mut self, event: &PoolEvent) {
        match event {
            PoolEvent::LiquidityProvided { provider, amount_a, amount_b, liquidity_minted } => {
                msg!(
                    "deposit: provider={} amount_a={} amount_b={} minted={}",
                    provider, amount_a, amount_b, liquidity_minted,
                );
            },
            PoolEvent::LiquidityWithdrawn { provider, amount_a, amount_b, share_burned } => {
                msg!(
                    "withdrawal: provider={} amount_a={} amount_b={} burned={}",
                    provider, amount_a, amount_b, share_burned,
                );
            },
            PoolEvent::Swapped { trader, mint_in, mint_out, amount_in, amount_out } => {
                msg!(
                    "swap: trader={} {} {} -> {} {}",
                    trader, amount_in, mint_in, amount_out, mint_out,
                );
            },
        }
    }
}
