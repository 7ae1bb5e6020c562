//! Shared fixture: a vault and strategy wired to an in-memory asset and a
//! 10% APR venue, with the same cast of accounts the deployment scripts use.

#![allow(dead_code)]

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;

use crypt_runtime::sim::{SimToken, SimVenue};
use crypt_runtime::units::parse_units;
use crypt_runtime::{
    FeeRecipients, FungibleToken, ManualClock, MultisigRoles, Strategy, StrategyConfig,
    StrategyDeployment, Vault, VaultConfig,
};

pub const DECIMALS: u32 = 18;
pub const VENUE_APR_BPS: u32 = 1_000;
pub const GENESIS: u64 = 1_650_000_000;

pub struct Accounts {
    pub owner: Address,
    pub want_holder: Address,
    pub strategist: Address,
    pub guardian: Address,
    pub admin: Address,
    pub super_admin: Address,
    pub unassigned: Address,
    pub treasury: Address,
    pub payment_splitter: Address,
}

impl Accounts {
    pub fn new() -> Self {
        Self {
            owner: Address::repeat_byte(0xd0),
            want_holder: Address::repeat_byte(0x93),
            strategist: Address::repeat_byte(0x1a),
            guardian: Address::repeat_byte(0xf2),
            admin: Address::repeat_byte(0x53),
            super_admin: Address::repeat_byte(0x04),
            unassigned: Address::repeat_byte(0x99),
            treasury: Address::repeat_byte(0x0e),
            payment_splitter: Address::repeat_byte(0x63),
        }
    }
}

pub struct Fixture {
    pub accounts: Accounts,
    pub want: Arc<SimToken>,
    pub venue: Arc<SimVenue>,
    pub clock: Arc<ManualClock>,
    pub vault: Arc<Vault>,
    pub strategy: Arc<Strategy>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_configs(VaultConfig::default(), StrategyConfig::default())
    }

    pub fn with_configs(vault_config: VaultConfig, strategy_config: StrategyConfig) -> Self {
        let accounts = Accounts::new();
        let want = Arc::new(SimToken::new("TOMB-MAI"));
        let clock = Arc::new(ManualClock::new(GENESIS));
        let venue_address = Address::repeat_byte(0xaa);
        let vault_address = Address::repeat_byte(0x5a);
        let venue = Arc::new(SimVenue::new(
            venue_address,
            want.clone(),
            clock.clone(),
            VENUE_APR_BPS,
        ));

        let deployment = StrategyDeployment {
            address: Address::repeat_byte(0x51),
            deployer: accounts.owner,
            vault: vault_address,
            fee_recipients: FeeRecipients {
                treasury: accounts.treasury,
                strategist_remitter: accounts.payment_splitter,
            },
            strategists: vec![accounts.strategist],
            multisig_roles: MultisigRoles {
                super_admin: accounts.super_admin,
                admin: accounts.admin,
                guardian: accounts.guardian,
            },
            config: strategy_config,
        };
        let strategy = Arc::new(
            Strategy::new(deployment, want.clone(), venue.clone(), clock.clone())
                .expect("strategy deploys"),
        );
        let vault = Arc::new(
            Vault::new(
                vault_address,
                accounts.owner,
                want.clone(),
                "TOMB-MAI Tomb Crypt",
                "rf-TOMB-MAI",
                vault_config,
            )
            .expect("vault deploys"),
        );
        vault
            .initialize(accounts.owner, strategy.clone())
            .expect("vault initializes");

        want.mint(accounts.want_holder, units("100000")).unwrap();
        want.approve(accounts.want_holder, vault_address, U256::MAX)
            .unwrap();

        Self {
            accounts,
            want,
            venue,
            clock,
            vault,
            strategy,
        }
    }

    /// Move `amount` from the want holder to `to` and approve the vault for it.
    pub fn fund(&self, to: Address, amount: U256) {
        self.want
            .transfer(self.accounts.want_holder, to, amount)
            .unwrap();
        self.want.approve(to, self.vault.address(), U256::MAX).unwrap();
    }

    pub fn want_balance(&self, account: &Address) -> U256 {
        self.want.balance_of(account).unwrap()
    }
}

/// Human amount in raw want units, e.g. `units("0.1")`.
pub fn units(amount: &str) -> U256 {
    let decimal: Decimal = amount.parse().unwrap();
    parse_units(&decimal, DECIMALS).unwrap()
}

/// `|a - b| <= tolerance`.
pub fn assert_close(a: U256, b: U256, tolerance: U256) {
    let diff = if a > b { a - b } else { b - a };
    assert!(diff <= tolerance, "{a} and {b} differ by {diff} > {tolerance}");
}
