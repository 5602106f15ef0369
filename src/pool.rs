use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::AmmError,
    events::{PoolEvent, PoolObserver},
    math,
    state::{LiquidityPool, SwapDirection},
    transfer::TokenTransfer,
};

// Fields an operation may touch, captured before it commits.
struct Checkpoint {
    reserve_a: u64,
    reserve_b: u64,
    total_liquidity: u64,
    share: Option<(Pubkey, u64)>,
}

impl Checkpoint {
    fn reserves(pool: &LiquidityPool) -> Self {
        Self {
            reserve_a: pool.reserve_a,
            reserve_b: pool.reserve_b,
            total_liquidity: pool.total_liquidity,
            share: None,
        }
    }

    fn with_share(pool: &LiquidityPool, provider: &Pubkey) -> Self {
        Self {
            share: Some((*provider, pool.liquidity_of(provider))),
            ..Self::reserves(pool)
        }
    }

    fn restore(self, pool: &mut LiquidityPool) {
        pool.reserve_a = self.reserve_a;
        pool.reserve_b = self.reserve_b;
        pool.total_liquidity = self.total_liquidity;

        if let Some((provider, share)) = self.share {
            pool.set_share(provider, share);
        }
    }
}

fn transfer_failed(operation: &str, error: ProgramError) -> AmmError {
    msg!("{}: transfer failed: {}", operation, error);
    AmmError::TransferFailed
}

fn reverse_leg(operation: &str, result: Result<(), ProgramError>) {
    if let Err(error) = result {
        msg!("{}: reversing completed transfer failed: {}", operation, error);
    }
}

impl LiquidityPool {
    fn set_share(&mut self, provider: Pubkey, share: u64) {
        if share == 0 {
            self.providers.remove(&provider);
        } else {
            self.providers.insert(provider, share);
        }
    }

    /// Later deposits must match `amount_b == amount_a * reserve_b / reserve_a` exactly.
    pub fn provide_liquidity<T, O>(
        &mut self,
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
        if amount_a == 0 || amount_b == 0 {
            return Err(AmmError::InvalidAmount);
        }

        let liquidity_minted = if self.is_seeded() {
            let expected_b = math::matching_amount(amount_a, self.reserve_a, self.reserve_b)?;
            if expected_b != amount_b {
                return Err(AmmError::RatioMismatch);
            }

            math::proportional_liquidity(amount_a, self.total_liquidity, self.reserve_a)?
        } else {
            math::initial_liquidity(amount_a, amount_b)?
        };

        if liquidity_minted == 0 {
            return Err(AmmError::InvalidAmount);
        }

        let reserve_a = self.reserve_a.checked_add(amount_a).ok_or(AmmError::ArithmeticOverflow)?;
        let reserve_b = self.reserve_b.checked_add(amount_b).ok_or(AmmError::ArithmeticOverflow)?;
        let total_liquidity = self.total_liquidity
            .checked_add(liquidity_minted)
            .ok_or(AmmError::ArithmeticOverflow)?;
        let share = self.liquidity_of(provider)
            .checked_add(liquidity_minted)
            .ok_or(AmmError::ArithmeticOverflow)?;

        let checkpoint = Checkpoint::with_share(self, provider);

        self.reserve_a = reserve_a;
        self.reserve_b = reserve_b;
        self.total_liquidity = total_liquidity;
        self.set_share(*provider, share);

        if let Err(error) = transfer.transfer_in(&self.mint_a, provider, amount_a) {
            checkpoint.restore(self);
            return Err(transfer_failed("deposit", error));
        }

        if let Err(error) = transfer.transfer_in(&self.mint_b, provider, amount_b) {
            checkpoint.restore(self);
            reverse_leg("deposit", transfer.transfer_out(&self.mint_a, provider, amount_a));
            return Err(transfer_failed("deposit", error));
        }

        msg!(
            "deposit committed: reserves=({}, {}) total_liquidity={}",
            self.reserve_a, self.reserve_b, self.total_liquidity,
        );

        observer.on_event(&PoolEvent::LiquidityProvided {
            provider: *provider,
            amount_a,
            amount_b,
            liquidity_minted,
        });

        Ok(liquidity_minted)
    }

    pub fn withdraw_liquidity<T, O>(
        &mut self,
        share_amount: u64,
        provider: &Pubkey,
        transfer: &mut T,
        observer: &mut O,
    ) -> Result<(u64, u64), AmmError>
    where
        T: TokenTransfer + ?Sized,
        O: PoolObserver + ?Sized,
    {
        if share_amount == 0 {
            return Err(AmmError::InvalidAmount);
        }

        let owned = self.liquidity_of(provider);
        if owned < share_amount {
            return Err(AmmError::InsufficientShare);
        }

        let (amount_a, amount_b) = math::withdrawal_amounts(
            share_amount,
            self.reserve_a,
            self.reserve_b,
            self.total_liquidity,
        )?;

        let reserve_a = self.reserve_a.checked_sub(amount_a).ok_or(AmmError::ArithmeticOverflow)?;
        let reserve_b = self.reserve_b.checked_sub(amount_b).ok_or(AmmError::ArithmeticOverflow)?;
        let total_liquidity = self.total_liquidity
            .checked_sub(share_amount)
            .ok_or(AmmError::ArithmeticOverflow)?;

        let checkpoint = Checkpoint::with_share(self, provider);

        self.reserve_a = reserve_a;
        self.reserve_b = reserve_b;
        self.total_liquidity = total_liquidity;
        self.set_share(*provider, owned - share_amount);

        if let Err(error) = transfer.transfer_out(&self.mint_a, provider, amount_a) {
            checkpoint.restore(self);
            return Err(transfer_failed("withdrawal", error));
        }

        if let Err(error) = transfer.transfer_out(&self.mint_b, provider, amount_b) {
            checkpoint.restore(self);
            reverse_leg("withdrawal", transfer.transfer_in(&self.mint_a, provider, amount_a));
            return Err(transfer_failed("withdrawal", error));
        }

        msg!(
            "withdrawal committed: reserves=({}, {}) total_liquidity={}",
            self.reserve_a, self.reserve_b, self.total_liquidity,
        );

        observer.on_event(&PoolEvent::LiquidityWithdrawn {
            provider: *provider,
            amount_a,
            amount_b,
            share_burned: share_amount,
        });

        Ok((amount_a, amount_b))
    }

    pub fn swap<T, O>(
        &mut self,
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
        if amount_in == 0 {
            return Err(AmmError::InvalidAmount);
        }

        let (reserve_in, reserve_out) = self.reserves_in_out(direction);

        let amount_out = math::quote_swap_output(amount_in, reserve_in, reserve_out)?;
        if amount_out >= reserve_out {
            return Err(AmmError::InsufficientLiquidity);
        }

        let new_reserve_in = reserve_in.checked_add(amount_in).ok_or(AmmError::ArithmeticOverflow)?;
        let new_reserve_out = reserve_out - amount_out;

        let (mint_in, mint_out) = self.mint_in_out(direction);

        transfer
            .transfer_in(&mint_in, trader, amount_in)
            .map_err(|error| transfer_failed("swap", error))?;

        let checkpoint = Checkpoint::reserves(self);

        match direction {
            SwapDirection::AToB => {
                self.reserve_a = new_reserve_in;
                self.reserve_b = new_reserve_out;
            },
            SwapDirection::BToA => {
                self.reserve_b = new_reserve_in;
                self.reserve_a = new_reserve_out;
            },
        }

        if let Err(error) = transfer.transfer_out(&mint_out, trader, amount_out) {
            checkpoint.restore(self);
            reverse_leg("swap", transfer.transfer_out(&mint_in, trader, amount_in));
            return Err(transfer_failed("swap", error));
        }

        msg!("swap committed: reserves=({}, {})", self.reserve_a, self.reserve_b);

        observer.on_event(&PoolEvent::Swapped {
            trader: *trader,
            mint_in,
            mint_out,
            amount_in,
            amount_out,
        });

        Ok(amount_out)
    }

    pub fn swap_a_for_b<T, O>(
        &mut self,
        amount_in: u64,
        trader: &Pubkey,
        transfer: &mut T,
        observer: &mut O,
    ) -> Result<u64, AmmError>
    where
        T: TokenTransfer + ?Sized,
        O: PoolObserver + ?Sized,
    {
        self.swap(amount_in, SwapDirection::AToB, trader, transfer, observer)
    }

    pub fn swap_b_for_a<T, O>(
        &mut self,
        amount_in: u64,
        trader: &Pubkey,
        transfer: &mut T,
        observer: &mut O,
    ) -> Result<u64, AmmError>
    where
        T: TokenTransfer + ?Sized,
        O: PoolObserver + ?Sized,
    {
        self.swap(amount_in, SwapDirection::BToA, trader, transfer, observer)
    }
}

#[cfg(test)]
mod test {
    use crate::transfer::InMemoryLedger;

    use super::*;

    struct Fixture {
        pool: LiquidityPool,
        ledger: InMemoryLedger,
        events: Vec<PoolEvent>,
    }

    impl Fixture {
        fn new() -> Self {
            let pool = LiquidityPool::new(Pubkey::new_unique(), Pubkey::new_unique(), 255).unwrap();
            let ledger = InMemoryLedger::new(Pubkey::new_unique());

            Self { pool, ledger, events: vec![] }
        }

        fn fund(&mut self, owner: &Pubkey, amount_a: u64, amount_b: u64) {
            let (mint_a, mint_b) = (self.pool.mint_a, self.pool.mint_b);

            self.ledger.mint_to(&mint_a, owner, amount_a).unwrap();
            self.ledger.mint_to(&mint_b, owner, amount_b).unwrap();
            self.ledger.approve(&mint_a, owner, amount_a);
            self.ledger.approve(&mint_b, owner, amount_b);
        }

        fn provide(&mut self, provider: &Pubkey, amount_a: u64, amount_b: u64) -> Result<u64, AmmError> {
            self.pool.provide_liquidity(amount_a, amount_b, provider, &mut self.ledger, &mut self.events)
        }

        fn withdraw(&mut self, provider: &Pubkey, share: u64) -> Result<(u64, u64), AmmError> {
            self.pool.withdraw_liquidity(share, provider, &mut self.ledger, &mut self.events)
        }

        fn swap(&mut self, trader: &Pubkey, amount_in: u64, direction: SwapDirection) -> Result<u64, AmmError> {
            self.pool.swap(amount_in, direction, trader, &mut self.ledger, &mut self.events)
        }
    }

    /// Fails every call after the first `allowed` ones, recording what it was asked.
    struct FlakyTransfer {
        allowed: usize,
        calls: Vec<(&'static str, Pubkey, u64)>,
    }

    impl FlakyTransfer {
        fn new(allowed: usize) -> Self {
            Self { allowed, calls: vec![] }
        }

        fn record(&mut self, kind: &'static str, mint: &Pubkey, amount: u64) -> Result<(), ProgramError> {
            self.calls.push((kind, *mint, amount));
            if self.calls.len() > self.allowed {
                return Err(ProgramError::InsufficientFunds);
            }

            Ok(())
        }
    }

    impl TokenTransfer for FlakyTransfer {
        fn transfer_in(&mut self, mint: &Pubkey, _from: &Pubkey, amount: u64) -> Result<(), ProgramError> {
            self.record("in", mint, amount)
        }

        fn transfer_out(&mut self, mint: &Pubkey, _to: &Pubkey, amount: u64) -> Result<(), ProgramError> {
            self.record("out", mint, amount)
        }
    }

    #[test]
    fn seeding_mints_geometric_mean() {
        let mut fixture = Fixture::new();
        let provider = Pubkey::new_unique();
        fixture.fund(&provider, 100, 400);

        assert_eq!(fixture.provide(&provider, 100, 400), Ok(200));
        assert_eq!(fixture.pool.reserves(), (100, 400));
        assert_eq!(fixture.pool.liquidity_of(&provider), 200);
        assert_eq!(fixture.pool.total_liquidity(), 200);
        assert_eq!(fixture.pool.price(), 4);
        assert_eq!(fixture.ledger.balance_of(&fixture.pool.mint_a, &provider), 0);
        assert_eq!(
            fixture.events,
            vec![PoolEvent::LiquidityProvided {
                provider,
                amount_a: 100,
                amount_b: 400,
                liquidity_minted: 200,
            }],
        );
    }

    #[test]
    fn deposit_rejects_zero_amounts() {
        let mut fixture = Fixture::new();
        let provider = Pubkey::new_unique();

        assert_eq!(fixture.provide(&provider, 0, 10), Err(AmmError::InvalidAmount));
        assert_eq!(fixture.provide(&provider, 10, 0), Err(AmmError::InvalidAmount));
        assert!(!fixture.pool.is_seeded());
    }

    #[test]
    fn deposit_requires_exact_ratio() {
        let mut fixture = Fixture::new();
        let seeder = Pubkey::new_unique();
        let provider = Pubkey::new_unique();
        fixture.fund(&seeder, 100, 200);
        fixture.fund(&provider, 10, 50);

        fixture.provide(&seeder, 100, 200).unwrap();
        let before = fixture.pool.clone();

        assert_eq!(fixture.provide(&provider, 10, 50), Err(AmmError::RatioMismatch));
        assert_eq!(fixture.pool, before);
        assert_eq!(fixture.ledger.balance_of(&fixture.pool.mint_a, &provider), 10);
    }

    #[test]
    fn proportional_deposit_mints_by_share_of_a() {
        let mut fixture = Fixture::new();
        let seeder = Pubkey::new_unique();
        let provider = Pubkey::new_unique();
        fixture.fund(&seeder, 100, 200);
        fixture.fund(&provider, 10, 20);

        let seeded = fixture.provide(&seeder, 100, 200).unwrap();
        assert_eq!(seeded, 141);

        // 10 * 141 / 100
        assert_eq!(fixture.provide(&provider, 10, 20), Ok(14));
        assert_eq!(fixture.pool.reserves(), (110, 220));
        assert_eq!(fixture.pool.total_liquidity(), 155);
        assert_eq!(fixture.pool.provider_count(), 2);
    }

    #[test]
    fn deposit_minting_nothing_is_rejected() {
        let mut fixture = Fixture::new();
        let seeder = Pubkey::new_unique();
        let provider = Pubkey::new_unique();
        fixture.fund(&provider, 1, 1);

        // few shares backing deep reserves, as after a long run of fees
        fixture.pool.reserve_a = 10_000;
        fixture.pool.reserve_b = 10_000;
        fixture.pool.total_liquidity = 10;
        fixture.pool.providers.insert(seeder, 10);
        let before = fixture.pool.clone();

        // ratio matches (1 * 10_000 / 10_000 == 1) but 1 * 10 / 10_000 == 0
        assert_eq!(fixture.provide(&provider, 1, 1), Err(AmmError::InvalidAmount));
        assert_eq!(fixture.pool, before);
    }

    #[test]
    fn reserve_overflow_is_rejected_before_any_transfer() {
        let mut pool = LiquidityPool::new(Pubkey::new_unique(), Pubkey::new_unique(), 255).unwrap();
        let seeder = Pubkey::new_unique();
        let user = Pubkey::new_unique();

        pool.reserve_a = u64::MAX - 10;
        pool.reserve_b = u64::MAX - 10;
        pool.total_liquidity = u64::MAX - 10;
        pool.providers.insert(seeder, u64::MAX - 10);
        let before = pool.clone();

        let mut transfer = FlakyTransfer::new(0);
        let mut events: Vec<PoolEvent> = vec![];

        assert_eq!(
            pool.provide_liquidity(20, 20, &user, &mut transfer, &mut events),
            Err(AmmError::ArithmeticOverflow),
        );
        assert_eq!(pool, before);

        assert_eq!(
            pool.swap(20, SwapDirection::AToB, &user, &mut transfer, &mut events),
            Err(AmmError::ArithmeticOverflow),
        );
        assert_eq!(pool, before);

        assert!(transfer.calls.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn withdraw_from_unseeded_pool_fails() {
        let mut fixture = Fixture::new();
        let provider = Pubkey::new_unique();

        assert_eq!(fixture.withdraw(&provider, 1), Err(AmmError::InsufficientShare));
        assert_eq!(fixture.withdraw(&provider, 0), Err(AmmError::InvalidAmount));
    }

    #[test]
    fn withdraw_more_than_owned_fails() {
        let mut fixture = Fixture::new();
        let provider = Pubkey::new_unique();
        fixture.fund(&provider, 100, 400);
        fixture.provide(&provider, 100, 400).unwrap();

        assert_eq!(fixture.withdraw(&provider, 201), Err(AmmError::InsufficientShare));
        assert_eq!(fixture.withdraw(&Pubkey::new_unique(), 1), Err(AmmError::InsufficientShare));
    }

    #[test]
    fn full_withdrawal_unseeds_pool() {
        let mut fixture = Fixture::new();
        let provider = Pubkey::new_unique();
        fixture.fund(&provider, 100, 400);
        fixture.provide(&provider, 100, 400).unwrap();

        assert_eq!(fixture.withdraw(&provider, 200), Ok((100, 400)));
        assert!(!fixture.pool.is_seeded());
        assert_eq!(fixture.pool.reserves(), (0, 0));
        assert_eq!(fixture.pool.provider_count(), 0);
        assert_eq!(fixture.ledger.balance_of(&fixture.pool.mint_b, &provider), 400);

        // reseed at an unrelated ratio
        fixture.fund(&provider, 9, 1);
        assert_eq!(fixture.provide(&provider, 9, 1), Ok(3));
        assert_eq!(fixture.pool.price(), 0);
    }

    #[test]
    fn swap_matches_reference_scenario() {
        let mut fixture = Fixture::new();
        let provider = Pubkey::new_unique();
        let trader = Pubkey::new_unique();
        fixture.fund(&provider, 1000, 1000);
        fixture.fund(&trader, 100, 0);
        fixture.provide(&provider, 1000, 1000).unwrap();

        assert_eq!(fixture.pool.quote_swap(100, SwapDirection::AToB), Ok(90));
        assert_eq!(fixture.swap(&trader, 100, SwapDirection::AToB), Ok(90));
        assert_eq!(fixture.pool.reserves(), (1100, 910));
        assert_eq!(fixture.ledger.balance_of(&fixture.pool.mint_b, &trader), 90);
        assert_eq!(
            fixture.events.last(),
            Some(&PoolEvent::Swapped {
                trader,
                mint_in: fixture.pool.mint_a,
                mint_out: fixture.pool.mint_b,
                amount_in: 100,
                amount_out: 90,
            }),
        );
    }

    #[test]
    fn swap_b_for_a_moves_reserves_the_other_way() {
        let mut fixture = Fixture::new();
        let provider = Pubkey::new_unique();
        let trader = Pubkey::new_unique();
        fixture.fund(&provider, 1000, 1000);
        fixture.fund(&trader, 0, 100);
        fixture.provide(&provider, 1000, 1000).unwrap();

        let out = fixture.pool
            .swap_b_for_a(100, &trader, &mut fixture.ledger, &mut fixture.events)
            .unwrap();

        assert_eq!(out, 90);
        assert_eq!(fixture.pool.reserves(), (910, 1100));
    }

    #[test]
    fn zero_swap_is_rejected() {
        let mut fixture = Fixture::new();
        let provider = Pubkey::new_unique();
        fixture.fund(&provider, 1000, 1000);
        fixture.provide(&provider, 1000, 1000).unwrap();

        assert_eq!(fixture.swap(&provider, 0, SwapDirection::AToB), Err(AmmError::InvalidAmount));
        assert_eq!(fixture.pool.reserves(), (1000, 1000));
    }

    #[test]
    fn swap_on_unseeded_pool_fails() {
        let mut fixture = Fixture::new();
        let trader = Pubkey::new_unique();
        fixture.fund(&trader, 10, 10);

        assert_eq!(
            fixture.swap(&trader, 10, SwapDirection::BToA),
            Err(AmmError::InsufficientLiquidity),
        );
        assert_eq!(fixture.ledger.balance_of(&fixture.pool.mint_b, &trader), 10);
    }

    #[test]
    fn swap_without_allowance_leaves_pool_untouched() {
        let mut fixture = Fixture::new();
        let provider = Pubkey::new_unique();
        let trader = Pubkey::new_unique();
        fixture.fund(&provider, 1000, 1000);
        fixture.provide(&provider, 1000, 1000).unwrap();
        fixture.ledger.mint_to(&fixture.pool.mint_a, &trader, 100).unwrap();

        assert_eq!(
            fixture.swap(&trader, 100, SwapDirection::AToB),
            Err(AmmError::TransferFailed),
        );
        assert_eq!(fixture.pool.reserves(), (1000, 1000));
    }

    #[test]
    fn failed_second_deposit_leg_rolls_back_and_refunds_first() {
        let mut pool = LiquidityPool::new(Pubkey::new_unique(), Pubkey::new_unique(), 255).unwrap();
        let provider = Pubkey::new_unique();
        let mut transfer = FlakyTransfer::new(1);

        assert_eq!(
            pool.provide_liquidity(100, 400, &provider, &mut transfer, &mut ()),
            Err(AmmError::TransferFailed),
        );
        assert!(!pool.is_seeded());
        assert_eq!(pool.liquidity_of(&provider), 0);
        assert_eq!(pool.provider_count(), 0);

        // leg A in, leg B in (fails), leg A reversed (fails too, only logged)
        assert_eq!(
            transfer.calls,
            vec![("in", pool.mint_a, 100), ("in", pool.mint_b, 400), ("out", pool.mint_a, 100)],
        );
    }

    #[test]
    fn failed_payout_rolls_back_withdrawal() {
        let mut pool = LiquidityPool::new(Pubkey::new_unique(), Pubkey::new_unique(), 255).unwrap();
        let provider = Pubkey::new_unique();
        pool.provide_liquidity(100, 400, &provider, &mut FlakyTransfer::new(2), &mut ()).unwrap();
        let before = pool.clone();

        assert_eq!(
            pool.withdraw_liquidity(50, &provider, &mut FlakyTransfer::new(0), &mut ()),
            Err(AmmError::TransferFailed),
        );
        assert_eq!(pool, before);
    }

    #[test]
    fn failed_swap_output_rolls_back_and_refunds_input() {
        let mut pool = LiquidityPool::new(Pubkey::new_unique(), Pubkey::new_unique(), 255).unwrap();
        let provider = Pubkey::new_unique();
        let trader = Pubkey::new_unique();
        pool.provide_liquidity(1000, 1000, &provider, &mut FlakyTransfer::new(2), &mut ()).unwrap();

        let mut transfer = FlakyTransfer::new(1);
        let mut events: Vec<PoolEvent> = vec![];

        assert_eq!(
            pool.swap(100, SwapDirection::AToB, &trader, &mut transfer, &mut events),
            Err(AmmError::TransferFailed),
        );
        assert_eq!(pool.reserves(), (1000, 1000));
        assert!(events.is_empty());
        assert_eq!(transfer.calls.last(), Some(&("out", pool.mint_a, 100)));
    }
}
