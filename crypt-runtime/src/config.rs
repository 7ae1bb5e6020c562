use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::{CryptError, CryptResult};
use crate::fees::{FeeSchedule, MAX_DEPOSIT_FEE_BPS, MAX_SECURITY_FEE_BPS};

/// Vault parameters. Mutated only through the vault's owner setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub deposit_fee_bps: u32,
    /// Ceiling on `balance()` after a deposit. `U256::MAX` means uncapped.
    pub tvl_cap: U256,
    /// Floor for the deposit that mints the first shares.
    pub min_initial_deposit: U256,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            deposit_fee_bps: 0,
            tvl_cap: U256::MAX,
            min_initial_deposit: U256::from(1_000u64),
        }
    }
}

impl VaultConfig {
    pub fn validate(&self) -> CryptResult<()> {
        if self.deposit_fee_bps > MAX_DEPOSIT_FEE_BPS {
            return Err(CryptError::FeeTooHigh {
                fee: self.deposit_fee_bps,
                max: MAX_DEPOSIT_FEE_BPS,
            });
        }
        if self.min_initial_deposit.is_zero() {
            return Err(CryptError::Config("min_initial_deposit must be positive".into()));
        }
        Ok(())
    }

    /// Defaults overridden by `CRYPT_DEPOSIT_FEE_BPS`, `CRYPT_TVL_CAP` and
    /// `CRYPT_MIN_INITIAL_DEPOSIT`.
    pub fn from_env() -> CryptResult<Self> {
        let defaults = Self::default();
        let config = Self {
            deposit_fee_bps: env_or("CRYPT_DEPOSIT_FEE_BPS", defaults.deposit_fee_bps)?,
            tvl_cap: env_or("CRYPT_TVL_CAP", defaults.tvl_cap)?,
            min_initial_deposit: env_or("CRYPT_MIN_INITIAL_DEPOSIT", defaults.min_initial_deposit)?,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Strategy parameters. Mutated only through the gated strategy setters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Withdrawal fee kept by the strategy for remaining shareholders.
    pub security_fee_bps: u32,
    /// Minimum spacing between harvest ledger entries.
    pub harvest_log_cadence_secs: u64,
    pub fees: FeeSchedule,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            security_fee_bps: 10,
            harvest_log_cadence_secs: 60,
            fees: FeeSchedule::default(),
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> CryptResult<()> {
        if self.security_fee_bps > MAX_SECURITY_FEE_BPS {
            return Err(CryptError::FeeTooHigh {
                fee: self.security_fee_bps,
                max: MAX_SECURITY_FEE_BPS,
            });
        }
        self.fees.validate()
    }

    /// Defaults overridden by `CRYPT_SECURITY_FEE_BPS`,
    /// `CRYPT_HARVEST_LOG_CADENCE_SECS`, `CRYPT_TOTAL_FEE_BPS`,
    /// `CRYPT_CALL_FEE_BPS`, `CRYPT_TREASURY_FEE_BPS` and
    /// `CRYPT_STRATEGIST_FEE_BPS`.
    pub fn from_env() -> CryptResult<Self> {
        let defaults = Self::default();
        let config = Self {
            security_fee_bps: env_or("CRYPT_SECURITY_FEE_BPS", defaults.security_fee_bps)?,
            harvest_log_cadence_secs: env_or(
                "CRYPT_HARVEST_LOG_CADENCE_SECS",
                defaults.harvest_log_cadence_secs,
            )?,
            fees: FeeSchedule {
                total_fee_bps: env_or("CRYPT_TOTAL_FEE_BPS", defaults.fees.total_fee_bps)?,
                call_fee_bps: env_or("CRYPT_CALL_FEE_BPS", defaults.fees.call_fee_bps)?,
                treasury_fee_bps: env_or("CRYPT_TREASURY_FEE_BPS", defaults.fees.treasury_fee_bps)?,
                strategist_fee_bps: env_or(
                    "CRYPT_STRATEGIST_FEE_BPS",
                    defaults.fees.strategist_fee_bps,
                )?,
            },
        };
        config.validate()?;
        Ok(config)
    }
}

/// Read and parse `key`, falling back to `default` when unset. A set but
/// unparsable value is an error rather than a silent default.
fn env_or<T>(key: &str, default: T) -> CryptResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CryptError::Config(format!("{key}={raw}: {e}"))),
        Err(_) => Ok(default),
    }
}
