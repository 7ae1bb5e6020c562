//! TOML scenario format.
//!
//! ```toml
//! name = "TOMB-MAI crypt"
//! asset = "TOMB-MAI"
//!
//! [accounts.holder]
//! address = "0x9393939393939393939393939393939393939393"
//! balance = "100"
//!
//! [roles]
//! deployer = "owner"
//! strategists = ["strategist"]
//! # ...
//!
//! [[steps]]
//! action = "deposit"
//! actor = "holder"
//! amount = "10"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use alloy_primitives::{Address, U256};
use crypt_runtime::units::parse_units;
use crypt_runtime::{StrategyConfig, Tier, VaultConfig};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default = "default_asset")]
    pub asset: String,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    /// Simple interest paid by the simulated venue.
    #[serde(default = "default_venue_apr_bps")]
    pub venue_apr_bps: u32,
    #[serde(default = "default_start_timestamp")]
    pub start_timestamp: u64,
    pub accounts: BTreeMap<String, Account>,
    pub roles: Roles,
    /// Absent fields fall back to `VaultConfig::from_env()`.
    #[serde(default)]
    pub vault: VaultSection,
    /// Absent fields fall back to `StrategyConfig::from_env()`.
    #[serde(default)]
    pub strategy: StrategySection,
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_asset() -> String {
    "WANT".to_string()
}

fn default_decimals() -> u32 {
    18
}

fn default_venue_apr_bps() -> u32 {
    1_000
}

fn default_start_timestamp() -> u64 {
    1_650_000_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub address: Address,
    /// Asset minted to the account before the first step.
    #[serde(default)]
    pub balance: Decimal,
}

/// Deployment roles, each naming an entry of `accounts`.
#[derive(Debug, Clone, Deserialize)]
pub struct Roles {
    pub deployer: String,
    #[serde(default)]
    pub strategists: Vec<String>,
    pub guardian: String,
    pub admin: String,
    pub super_admin: String,
    pub treasury: String,
    pub strategist_remitter: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VaultSection {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub deposit_fee_bps: Option<u32>,
    /// Human amount; absent means uncapped.
    pub tvl_cap: Option<Decimal>,
    /// Raw units.
    pub min_initial_deposit: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrategySection {
    pub security_fee_bps: Option<u32>,
    pub harvest_log_cadence_secs: Option<u64>,
    pub total_fee_bps: Option<u32>,
    pub call_fee_bps: Option<u32>,
    pub treasury_fee_bps: Option<u32>,
    pub strategist_fee_bps: Option<u32>,
}

/// One scripted call. Human amounts are in asset units, `shares` in share units.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Deposit { actor: String, amount: Decimal },
    DepositAll { actor: String },
    Withdraw { actor: String, shares: Decimal },
    WithdrawAll { actor: String },
    Earn,
    /// Move the clock forward.
    Advance { secs: u64 },
    Harvest { actor: String },
    Estimate,
    Pause { actor: String },
    Unpause { actor: String },
    Panic { actor: String },
    Retire { actor: String },
    UpdateHarvestLogCadence { actor: String, secs: u64 },
    UpdateSecurityFee { actor: String, bps: u32 },
    UpdateDepositFee { actor: String, bps: u32 },
    /// No `cap` removes the cap.
    UpdateTvlCap { actor: String, cap: Option<Decimal> },
    GrantRole { actor: String, account: String, tier: Tier },
    RevokeRole { actor: String, account: String },
    /// Take the venue offline or bring it back.
    VenueOnline { online: bool },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Deposit { .. } => "deposit",
            Step::DepositAll { .. } => "deposit_all",
            Step::Withdraw { .. } => "withdraw",
            Step::WithdrawAll { .. } => "withdraw_all",
            Step::Earn => "earn",
            Step::Advance { .. } => "advance",
            Step::Harvest { .. } => "harvest",
            Step::Estimate => "estimate",
            Step::Pause { .. } => "pause",
            Step::Unpause { .. } => "unpause",
            Step::Panic { .. } => "panic",
            Step::Retire { .. } => "retire",
            Step::UpdateHarvestLogCadence { .. } => "update_harvest_log_cadence",
            Step::UpdateSecurityFee { .. } => "update_security_fee",
            Step::UpdateDepositFee { .. } => "update_deposit_fee",
            Step::UpdateTvlCap { .. } => "update_tvl_cap",
            Step::GrantRole { .. } => "grant_role",
            Step::RevokeRole { .. } => "revoke_role",
            Step::VenueOnline { .. } => "venue_online",
        }
    }
}

impl Scenario {
    pub fn from_toml(content: &str) -> SimResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn address_of(&self, name: &str) -> SimResult<Address> {
        self.accounts
            .get(name)
            .map(|a| a.address)
            .ok_or_else(|| SimError::UnknownAccount(name.to_string()))
    }

    pub fn vault_name(&self) -> String {
        self.vault
            .name
            .clone()
            .unwrap_or_else(|| format!("{} Crypt", self.asset))
    }

    pub fn vault_symbol(&self) -> String {
        self.vault
            .symbol
            .clone()
            .unwrap_or_else(|| format!("rf-{}", self.asset))
    }

    pub fn vault_config(&self) -> SimResult<VaultConfig> {
        let mut config = VaultConfig::from_env()?;
        let section = &self.vault;
        if let Some(bps) = section.deposit_fee_bps {
            config.deposit_fee_bps = bps;
        }
        if let Some(cap) = &section.tvl_cap {
            config.tvl_cap = parse_units(cap, self.decimals)?;
        }
        if let Some(minimum) = section.min_initial_deposit {
            config.min_initial_deposit = U256::from(minimum);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn strategy_config(&self) -> SimResult<StrategyConfig> {
        let mut config = StrategyConfig::from_env()?;
        let section = &self.strategy;
        if let Some(bps) = section.security_fee_bps {
            config.security_fee_bps = bps;
        }
        if let Some(secs) = section.harvest_log_cadence_secs {
            config.harvest_log_cadence_secs = secs;
        }
        if let Some(bps) = section.total_fee_bps {
            config.fees.total_fee_bps = bps;
        }
        if let Some(bps) = section.call_fee_bps {
            config.fees.call_fee_bps = bps;
        }
        if let Some(bps) = section.treasury_fee_bps {
            config.fees.treasury_fee_bps = bps;
        }
        if let Some(bps) = section.strategist_fee_bps {
            config.fees.strategist_fee_bps = bps;
        }
        config.validate()?;
        Ok(config)
    }
}
