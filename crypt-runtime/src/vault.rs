//! Pooled-deposit vault issuing proportional shares.
//!
//! `balance()` is idle custody plus the bound strategy's `balance_of()`.
//! Price per share is `balance() * SCALE / total_supply`, or `SCALE` with no
//! shares outstanding. The first deposit mints one share per unit of the
//! pool it lands in, so the price starts at exactly `SCALE` no matter what
//! was donated beforehand; it must also clear `min_initial_deposit`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use alloy_primitives::{Address, U256};
use once_cell::sync::OnceCell;

use crate::config::VaultConfig;
use crate::error::{CryptError, CryptResult};
use crate::fees::{MAX_DEPOSIT_FEE_BPS, deduct_bps, mul_div};
use crate::lock::ReentrancyLock;
use crate::strategy::Strategy;
use crate::token::FungibleToken;
use crate::types::{SCALE, StrategyState};

#[derive(Debug, Clone, Default)]
struct ShareLedger {
    config: VaultConfig,
    shares: HashMap<Address, U256>,
    total_supply: U256,
    cumulative_deposits: HashMap<Address, U256>,
    cumulative_withdrawals: HashMap<Address, U256>,
}

impl ShareLedger {
    fn shares_of(&self, account: &Address) -> U256 {
        self.shares.get(account).copied().unwrap_or_default()
    }

    fn mint(&mut self, account: Address, shares: U256) {
        *self.shares.entry(account).or_default() += shares;
        self.total_supply += shares;
    }

    /// Caller checks `shares <= shares_of(account)`.
    fn burn(&mut self, account: Address, shares: U256) {
        let held = self.shares_of(&account);
        if held == shares {
            self.shares.remove(&account);
        } else {
            self.shares.insert(account, held - shares);
        }
        self.total_supply -= shares;
    }
}

pub struct Vault {
    address: Address,
    owner: Address,
    name: String,
    symbol: String,
    asset: Arc<dyn FungibleToken>,
    strategy: OnceCell<Arc<Strategy>>,
    ledger: Mutex<ShareLedger>,
    lock: ReentrancyLock,
}

impl Vault {
    pub fn new(
        address: Address,
        owner: Address,
        asset: Arc<dyn FungibleToken>,
        name: impl Into<String>,
        symbol: impl Into<String>,
        config: VaultConfig,
    ) -> CryptResult<Self> {
        config.validate()?;
        let vault = Self {
            address,
            owner,
            name: name.into(),
            symbol: symbol.into(),
            asset,
            strategy: OnceCell::new(),
            ledger: Mutex::new(ShareLedger {
                config,
                ..Default::default()
            }),
            lock: ReentrancyLock::new(),
        };
        tracing::info!(
            vault = %address,
            %owner,
            name = %vault.name,
            asset = vault.asset.symbol(),
            deposit_fee_bps = config.deposit_fee_bps,
            tvl_cap = %config.tvl_cap,
            "vault deployed"
        );
        Ok(vault)
    }

    /// Bind the strategy. Only the owner, only once.
    pub fn initialize(&self, caller: Address, strategy: Arc<Strategy>) -> CryptResult<()> {
        let _guard = self.lock.try_enter()?;
        self.only_owner(&caller)?;
        if self.strategy.get().is_some() {
            return Err(CryptError::AlreadyBound);
        }
        if strategy.vault() != self.address {
            return Err(CryptError::Config(format!(
                "strategy {} is bound to vault {}",
                strategy.address(),
                strategy.vault()
            )));
        }
        self.asset
            .approve(self.address, strategy.address(), U256::MAX)?;
        let strategy_address = strategy.address();
        self.strategy
            .set(strategy)
            .map_err(|_| CryptError::AlreadyBound)?;
        tracing::info!(vault = %self.address, strategy = %strategy_address, "strategy bound");
        Ok(())
    }

    // ── Views ────────────────────────────────────────────────────────────

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn asset(&self) -> &Arc<dyn FungibleToken> {
        &self.asset
    }

    pub fn strategy(&self) -> Option<Arc<Strategy>> {
        self.strategy.get().cloned()
    }

    pub fn config(&self) -> CryptResult<VaultConfig> {
        Ok(self.ledger()?.config)
    }

    /// Idle custody not yet sent to the strategy.
    pub fn available(&self) -> CryptResult<U256> {
        self.asset.balance_of(&self.address)
    }

    /// Total value managed for shareholders.
    pub fn balance(&self) -> CryptResult<U256> {
        let deployed = match self.strategy.get() {
            Some(strategy) => strategy.balance_of()?,
            None => U256::ZERO,
        };
        Ok(self.available()? + deployed)
    }

    pub fn get_price_per_full_share(&self) -> CryptResult<U256> {
        let total = self.total_supply()?;
        if total.is_zero() {
            return Ok(SCALE);
        }
        mul_div(self.balance()?, SCALE, total)
    }

    /// Shares held by `account`.
    pub fn balance_of(&self, account: &Address) -> CryptResult<U256> {
        Ok(self.ledger()?.shares_of(account))
    }

    pub fn total_supply(&self) -> CryptResult<U256> {
        Ok(self.ledger()?.total_supply)
    }

    pub fn cumulative_deposits(&self, account: &Address) -> CryptResult<U256> {
        Ok(self
            .ledger()?
            .cumulative_deposits
            .get(account)
            .copied()
            .unwrap_or_default())
    }

    pub fn cumulative_withdrawals(&self, account: &Address) -> CryptResult<U256> {
        Ok(self
            .ledger()?
            .cumulative_withdrawals
            .get(account)
            .copied()
            .unwrap_or_default())
    }

    // ── Deposits ─────────────────────────────────────────────────────────

    /// Deposit `amount` of the asset from `caller` and mint shares for it.
    /// Returns the shares minted.
    pub fn deposit(&self, caller: Address, amount: U256) -> CryptResult<U256> {
        let _guard = self.lock.try_enter()?;
        if amount.is_zero() {
            return Err(CryptError::ZeroAmount);
        }
        let strategy = self.bound()?;
        match strategy.state()? {
            StrategyState::Active => {}
            StrategyState::Retired => return Err(CryptError::Retired),
            StrategyState::Paused | StrategyState::Panicked => return Err(CryptError::Paused),
        }

        let pool = self.balance()?;
        let (snapshot, shares) = {
            let mut ledger = self.ledger()?;
            let cap = ledger.config.tvl_cap;
            let after = match pool.checked_add(amount) {
                Some(after) if after <= cap => after,
                _ => {
                    return Err(CryptError::CapacityExceeded { pool, amount, cap });
                }
            };

            let shares = if ledger.total_supply.is_zero() {
                let minimum = ledger.config.min_initial_deposit;
                if amount < minimum {
                    return Err(CryptError::BelowMinimumDeposit { amount, minimum });
                }
                after
            } else {
                let after_fee = deduct_bps(amount, ledger.config.deposit_fee_bps)?;
                mul_div(after_fee, ledger.total_supply, pool)?
            };
            if shares.is_zero() {
                return Err(CryptError::ZeroShares);
            }

            let snapshot = ledger.clone();
            ledger.mint(caller, shares);
            *ledger.cumulative_deposits.entry(caller).or_default() += amount;
            (snapshot, shares)
        };

        self.deposit_core(caller, amount, &strategy)
            .inspect_err(|e| self.rollback(snapshot, "deposit", e))?;

        tracing::info!(vault = %self.address, %caller, %amount, %shares, "deposit");
        Ok(shares)
    }

    fn deposit_core(&self, caller: Address, amount: U256, strategy: &Strategy) -> CryptResult<()> {
        self.asset
            .transfer_from(self.address, caller, self.address, amount)?;
        if let Err(e) = self.push_to_strategy(strategy) {
            if let Err(refund) = self.asset.transfer(self.address, caller, amount) {
                tracing::error!(vault = %self.address, %caller, %amount, error = %refund, "refund failed");
            }
            return Err(e);
        }
        Ok(())
    }

    /// Deposit the caller's whole asset balance.
    pub fn deposit_all(&self, caller: Address) -> CryptResult<U256> {
        let amount = self.asset.balance_of(&caller)?;
        self.deposit(caller, amount)
    }

    /// Send all idle custody to the strategy.
    pub fn earn(&self) -> CryptResult<()> {
        let _guard = self.lock.try_enter()?;
        let strategy = self.bound()?;
        self.push_to_strategy(&strategy)
    }

    fn push_to_strategy(&self, strategy: &Strategy) -> CryptResult<()> {
        let idle = self.available()?;
        if idle.is_zero() {
            return Ok(());
        }
        strategy.deposit(self.address, idle)
    }

    // ── Withdrawals ──────────────────────────────────────────────────────

    /// Burn `shares` and pay out their proportional value, pulling any
    /// shortfall from the strategy. Returns the amount paid.
    pub fn withdraw(&self, caller: Address, shares: U256) -> CryptResult<U256> {
        let _guard = self.lock.try_enter()?;
        if shares.is_zero() {
            return Err(CryptError::ZeroAmount);
        }
        let pool = self.balance()?;
        let (snapshot, owed) = {
            let mut ledger = self.ledger()?;
            let held = ledger.shares_of(&caller);
            if held < shares {
                return Err(CryptError::InsufficientShares {
                    requested: shares,
                    held,
                });
            }
            let owed = mul_div(pool, shares, ledger.total_supply)?;
            let snapshot = ledger.clone();
            ledger.burn(caller, shares);
            (snapshot, owed)
        };

        let paid = self
            .withdraw_core(caller, owed)
            .inspect_err(|e| self.rollback(snapshot, "withdraw", e))?;

        tracing::info!(vault = %self.address, %caller, %shares, %owed, %paid, "withdraw");
        Ok(paid)
    }

    fn withdraw_core(&self, caller: Address, owed: U256) -> CryptResult<U256> {
        let idle = self.available()?;
        let mut paid = owed;
        if idle < owed {
            let shortfall = owed - idle;
            self.bound()?.withdraw(self.address, shortfall)?;
            let received = self.available()?.saturating_sub(idle);
            if received < shortfall {
                paid = idle + received;
            }
        }
        if !paid.is_zero() {
            self.asset.transfer(self.address, caller, paid)?;
        }
        *self
            .ledger()?
            .cumulative_withdrawals
            .entry(caller)
            .or_default() += paid;
        Ok(paid)
    }

    pub fn withdraw_all(&self, caller: Address) -> CryptResult<U256> {
        let shares = self.balance_of(&caller)?;
        self.withdraw(caller, shares)
    }

    // ── Owner settings ───────────────────────────────────────────────────

    pub fn update_deposit_fee(&self, caller: Address, bps: u32) -> CryptResult<()> {
        self.only_owner(&caller)?;
        if bps > MAX_DEPOSIT_FEE_BPS {
            return Err(CryptError::FeeTooHigh {
                fee: bps,
                max: MAX_DEPOSIT_FEE_BPS,
            });
        }
        self.ledger()?.config.deposit_fee_bps = bps;
        tracing::info!(vault = %self.address, bps, "deposit fee updated");
        Ok(())
    }

    pub fn update_tvl_cap(&self, caller: Address, cap: U256) -> CryptResult<()> {
        self.only_owner(&caller)?;
        self.ledger()?.config.tvl_cap = cap;
        tracing::info!(vault = %self.address, %cap, "tvl cap updated");
        Ok(())
    }

    pub fn remove_tvl_cap(&self, caller: Address) -> CryptResult<()> {
        self.update_tvl_cap(caller, U256::MAX)
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn ledger(&self) -> CryptResult<MutexGuard<'_, ShareLedger>> {
        Ok(self.ledger.lock()?)
    }

    fn bound(&self) -> CryptResult<Arc<Strategy>> {
        self.strategy.get().cloned().ok_or(CryptError::NotBound)
    }

    fn only_owner(&self, caller: &Address) -> CryptResult<()> {
        if *caller != self.owner {
            return Err(CryptError::NotOwner);
        }
        Ok(())
    }

    fn rollback(&self, snapshot: ShareLedger, operation: &'static str, err: &CryptError) {
        if let Ok(mut ledger) = self.ledger.lock() {
            *ledger = snapshot;
        }
        tracing::warn!(vault = %self.address, operation, error = %err, "rolled back");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::StrategyConfig;
    use crate::sim::{SimToken, SimVenue};
    use crate::strategy::StrategyDeployment;
    use crate::types::{FeeRecipients, MultisigRoles};

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    const OWNER: u8 = 0xd0;
    const VAULT: u8 = 0x5a;
    const STRATEGY: u8 = 0x51;
    const ALICE: u8 = 0xa1;
    const BOB: u8 = 0xb0;

    struct Harness {
        token: Arc<SimToken>,
        vault: Vault,
        strategy: Arc<Strategy>,
    }

    fn deployment(vault: Address) -> StrategyDeployment {
        StrategyDeployment {
            address: addr(STRATEGY),
            deployer: addr(OWNER),
            vault,
            fee_recipients: FeeRecipients {
                treasury: addr(0x0e),
                strategist_remitter: addr(0x0f),
            },
            strategists: vec![addr(0x01)],
            multisig_roles: MultisigRoles {
                super_admin: addr(0x04),
                admin: addr(0x03),
                guardian: addr(0x02),
            },
            config: StrategyConfig::default(),
        }
    }

    fn harness(config: VaultConfig) -> Harness {
        let token = Arc::new(SimToken::new("WANT"));
        let clock = Arc::new(ManualClock::new(1_000));
        let venue = Arc::new(SimVenue::new(addr(0xaa), token.clone(), clock.clone(), 1_000));
        let strategy = Arc::new(
            Strategy::new(deployment(addr(VAULT)), token.clone(), venue, clock).unwrap(),
        );
        let vault = Vault::new(addr(VAULT), addr(OWNER), token.clone(), "Crypt WANT", "cWANT", config)
            .unwrap();
        vault.initialize(addr(OWNER), strategy.clone()).unwrap();
        for user in [ALICE, BOB] {
            token.mint(addr(user), u(1_000_000_000)).unwrap();
            token.approve(addr(user), addr(VAULT), U256::MAX).unwrap();
        }
        Harness {
            token,
            vault,
            strategy,
        }
    }

    #[test]
    fn test_first_deposit_sets_price_to_scale() {
        let h = harness(VaultConfig::default());
        assert_eq!(h.vault.get_price_per_full_share().unwrap(), SCALE);
        let shares = h.vault.deposit(addr(ALICE), u(1_000_000)).unwrap();
        assert_eq!(shares, u(1_000_000));
        assert_eq!(h.vault.get_price_per_full_share().unwrap(), SCALE);
        assert_eq!(h.vault.available().unwrap(), U256::ZERO);
        assert_eq!(h.strategy.balance_of().unwrap(), u(1_000_000));
        assert_eq!(h.vault.cumulative_deposits(&addr(ALICE)).unwrap(), u(1_000_000));
    }

    #[test]
    fn test_donation_before_first_deposit_goes_to_depositor() {
        let h = harness(VaultConfig::default());
        h.token.mint(addr(VAULT), u(5_000)).unwrap();
        let shares = h.vault.deposit(addr(ALICE), u(1_000)).unwrap();
        assert_eq!(shares, u(6_000));
        assert_eq!(h.vault.get_price_per_full_share().unwrap(), SCALE);
    }

    #[test]
    fn test_deposit_fee_reduces_minted_shares() {
        let h = harness(VaultConfig {
            deposit_fee_bps: 100,
            ..Default::default()
        });
        h.vault.deposit(addr(ALICE), u(1_000_000)).unwrap();
        let shares = h.vault.deposit(addr(BOB), u(1_000_000)).unwrap();
        assert_eq!(shares, u(990_000));
        assert!(h.vault.get_price_per_full_share().unwrap() > SCALE);
    }

    #[test]
    fn test_rejects_zero_small_and_over_cap() {
        let h = harness(VaultConfig {
            tvl_cap: u(2_000_000),
            ..Default::default()
        });
        assert_eq!(h.vault.deposit(addr(ALICE), U256::ZERO).unwrap_err().reason(), "please provide amount");
        assert_eq!(
            h.vault.deposit(addr(ALICE), u(999)).unwrap_err().reason(),
            "below minimum deposit"
        );
        h.vault.deposit(addr(ALICE), u(1_500_000)).unwrap();
        let err = h.vault.deposit(addr(BOB), u(500_001)).unwrap_err();
        assert_eq!(err.reason(), "vault is full");
        assert_eq!(h.vault.balance_of(&addr(BOB)).unwrap(), U256::ZERO);
        h.vault.deposit(addr(BOB), u(500_000)).unwrap();
    }

    #[test]
    fn test_deposit_that_mints_nothing_fails() {
        let h = harness(VaultConfig::default());
        h.vault.deposit(addr(ALICE), u(1_000)).unwrap();
        h.token.mint(addr(VAULT), u(1_000)).unwrap();
        let err = h.vault.deposit(addr(BOB), u(1)).unwrap_err();
        assert_eq!(err, CryptError::ZeroShares);
    }

    #[test]
    fn test_withdraw_all_pays_less_security_fee() {
        let h = harness(VaultConfig::default());
        h.vault.deposit(addr(ALICE), u(1_000_000)).unwrap();
        let before = h.token.balance_of(&addr(ALICE)).unwrap();
        let paid = h.vault.withdraw_all(addr(ALICE)).unwrap();
        assert_eq!(paid, u(999_000));
        assert_eq!(h.token.balance_of(&addr(ALICE)).unwrap() - before, u(999_000));
        assert_eq!(h.vault.total_supply().unwrap(), U256::ZERO);
        assert_eq!(h.vault.cumulative_withdrawals(&addr(ALICE)).unwrap(), u(999_000));
    }

    #[test]
    fn test_withdraw_more_than_held_fails() {
        let h = harness(VaultConfig::default());
        h.vault.deposit(addr(ALICE), u(1_000_000)).unwrap();
        let err = h.vault.withdraw(addr(BOB), u(1)).unwrap_err();
        assert_eq!(
            err,
            CryptError::InsufficientShares {
                requested: u(1),
                held: U256::ZERO,
            }
        );
        assert_eq!(h.vault.withdraw(addr(ALICE), U256::ZERO).unwrap_err().reason(), "please provide amount");
    }

    #[test]
    fn test_owner_only_settings() {
        let h = harness(VaultConfig::default());
        assert_eq!(h.vault.update_deposit_fee(addr(ALICE), 10).unwrap_err(), CryptError::NotOwner);
        assert_eq!(
            h.vault.update_deposit_fee(addr(OWNER), 1_001).unwrap_err().reason(),
            "fee too high"
        );
        h.vault.update_deposit_fee(addr(OWNER), 50).unwrap();
        h.vault.update_tvl_cap(addr(OWNER), u(10)).unwrap();
        assert_eq!(h.vault.config().unwrap().tvl_cap, u(10));
        h.vault.remove_tvl_cap(addr(OWNER)).unwrap();
        assert_eq!(h.vault.config().unwrap().tvl_cap, U256::MAX);
        assert_eq!(h.vault.config().unwrap().deposit_fee_bps, 50);
    }

    #[test]
    fn test_initialize_only_once() {
        let h = harness(VaultConfig::default());
        let err = h.vault.initialize(addr(OWNER), h.strategy.clone()).unwrap_err();
        assert_eq!(err.reason(), "already initialized");
    }

    #[test]
    fn test_initialize_checks_owner_and_vault_binding() {
        let token = Arc::new(SimToken::new("WANT"));
        let clock = Arc::new(ManualClock::new(0));
        let venue = Arc::new(SimVenue::new(addr(0xaa), token.clone(), clock.clone(), 0));
        let foreign = Arc::new(
            Strategy::new(deployment(addr(0x77)), token.clone(), venue, clock).unwrap(),
        );
        let vault = Vault::new(addr(VAULT), addr(OWNER), token, "Crypt WANT", "cWANT", VaultConfig::default())
            .unwrap();

        assert_eq!(vault.initialize(addr(ALICE), foreign.clone()).unwrap_err(), CryptError::NotOwner);
        assert_eq!(vault.initialize(addr(OWNER), foreign).unwrap_err().reason(), "invalid config");
        assert!(vault.strategy().is_none());
        assert_eq!(vault.deposit(addr(ALICE), u(1_000)).unwrap_err().reason(), "not initialized");
    }
}
