use std::collections::BTreeMap;

use solana_program::pubkey::Pubkey;

use borsh::{BorshSerialize, BorshDeserialize};

use crate::{error::AmmError, math};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDirection {
    AToB,
    BToA,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LiquidityPool {
    pub is_initialized: bool,
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub reserve_a: u64,
    pub reserve_b: u64,
    pub total_liquidity: u64,
    pub bump: u8,
    /// Outstanding shares by provider. Only non-zero shares are stored.
    pub providers: BTreeMap<Pubkey, u64>,
}

impl LiquidityPool {
    pub const SEED_PREFIX: &'static [u8] = b"pool";

    pub const MAX_PROVIDERS: usize = 64;

    pub const HEADER_SPACE: usize =
        1        // is_initialized
        + 32     // mint_a pubkey
        + 32     // mint_b pubkey
        + 8      // reserve_a
        + 8      // reserve_b
        + 8      // total_liquidity
        + 1;     // bump

    pub const PROVIDER_ENTRY_SPACE: usize =
        32       // provider pubkey
        + 8;     // share

    pub const fn space(max_providers: usize) -> usize {
        Self::HEADER_SPACE
        + 4      // providers map length
        + max_providers * Self::PROVIDER_ENTRY_SPACE
    }

    /// An unseeded pool bound to `mint_a` and `mint_b`.
    pub fn new(mint_a: Pubkey, mint_b: Pubkey, bump: u8) -> Result<Self, AmmError> {
        if mint_a == mint_b {
            return Err(AmmError::IdenticalMints);
        }

        Ok(Self {
            is_initialized: true,
            mint_a,
            mint_b,
            bump,
            ..Self::default()
        })
    }

    pub fn sorted_mints<'k>(mint_a: &'k Pubkey, mint_b: &'k Pubkey) -> (&'k Pubkey, &'k Pubkey) {
        if mint_a < mint_b {
            (mint_a, mint_b)
        } else {
            (mint_b, mint_a)
        }
    }

    /// Pool PDA for a mint pair. Both orderings of the pair share one address.
    pub fn find_address(program_id: &Pubkey, mint_a: &Pubkey, mint_b: &Pubkey) -> (Pubkey, u8) {
        let (mint_lo, mint_hi) = Self::sorted_mints(mint_a, mint_b);

        Pubkey::find_program_address(
            &[Self::SEED_PREFIX, mint_lo.as_ref(), mint_hi.as_ref()],
            program_id,
        )
    }

    pub fn is_seeded(&self) -> bool {
        self.total_liquidity > 0
    }

    pub fn reserves(&self) -> (u64, u64) {
        (self.reserve_a, self.reserve_b)
    }

    /// Integer quote of B per A; `0` while the pool holds no A.
    pub fn price(&self) -> u64 {
        if self.reserve_a == 0 {
            return 0;
        }

        self.reserve_b / self.reserve_a
    }

    pub fn liquidity_of(&self, provider: &Pubkey) -> u64 {
        self.providers.get(provider).copied().unwrap_or_default()
    }

    pub fn total_liquidity(&self) -> u64 {
        self.total_liquidity
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// (mint_in, mint_out)
    pub fn mint_in_out(&self, direction: SwapDirection) -> (Pubkey, Pubkey) {
        match direction {
            SwapDirection::AToB => (self.mint_a, self.mint_b),
            SwapDirection::BToA => (self.mint_b, self.mint_a),
        }
    }

    /// (reserve_in, reserve_out)
    pub fn reserves_in_out(&self, direction: SwapDirection) -> (u64, u64) {
        match direction {
            SwapDirection::AToB => (self.reserve_a, self.reserve_b),
            SwapDirection::BToA => (self.reserve_b, self.reserve_a),
        }
    }

    /// Output a swap of `amount_in` would receive right now.
    pub fn quote_swap(&self, amount_in: u64, direction: SwapDirection) -> Result<u64, AmmError> {
        let (reserve_in, reserve_out) = self.reserves_in_out(direction);

        math::quote_swap_output(amount_in, reserve_in, reserve_out)
    }
}
