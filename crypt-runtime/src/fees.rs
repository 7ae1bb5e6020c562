use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::{CryptError, CryptResult, arithmetic_err};
use crate::types::{FeeBreakdown, PERCENT_DIVISOR, SECONDS_PER_YEAR};

/// Upper bound for the harvest performance fee.
pub const MAX_TOTAL_FEE_BPS: u32 = 1_000;
/// Upper bound for the strategist's cut of the treasury fee.
pub const MAX_STRATEGIST_FEE_BPS: u32 = 5_000;
/// Upper bound for the withdrawal security fee.
pub const MAX_SECURITY_FEE_BPS: u32 = 10;
/// Upper bound for the vault deposit fee.
pub const MAX_DEPOSIT_FEE_BPS: u32 = 1_000;

/// `a * b / denominator`, failing instead of wrapping.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> CryptResult<U256> {
    if denominator.is_zero() {
        return Err(arithmetic_err("division by zero"));
    }
    a.checked_mul(b)
        .map(|product| product / denominator)
        .ok_or_else(|| arithmetic_err(format!("{a} * {b} overflows")))
}

/// `amount * bps / 10000`.
pub fn apply_bps(amount: U256, bps: u32) -> CryptResult<U256> {
    mul_div(amount, U256::from(bps), U256::from(PERCENT_DIVISOR))
}

/// `amount` minus its `bps` share.
pub fn deduct_bps(amount: U256, bps: u32) -> CryptResult<U256> {
    Ok(amount - apply_bps(amount, bps)?)
}

/// How harvest profit is split between the caller, treasury and strategist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Share of gross profit taken as fees.
    pub total_fee_bps: u32,
    /// Share of the total fee paid to the harvest caller.
    pub call_fee_bps: u32,
    /// Share of the total fee paid to the fee recipients.
    pub treasury_fee_bps: u32,
    /// Share of the treasury fee routed to the strategist remitter.
    pub strategist_fee_bps: u32,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            total_fee_bps: 450,
            call_fee_bps: 1_000,
            treasury_fee_bps: 9_000,
            strategist_fee_bps: 2_500,
        }
    }
}

impl FeeSchedule {
    pub fn validate(&self) -> CryptResult<()> {
        if self.total_fee_bps > MAX_TOTAL_FEE_BPS {
            return Err(CryptError::FeeTooHigh {
                fee: self.total_fee_bps,
                max: MAX_TOTAL_FEE_BPS,
            });
        }
        let split = self.call_fee_bps + self.treasury_fee_bps;
        if split != PERCENT_DIVISOR {
            return Err(CryptError::InvalidFeeSplit(split));
        }
        if self.strategist_fee_bps > MAX_STRATEGIST_FEE_BPS {
            return Err(CryptError::FeeTooHigh {
                fee: self.strategist_fee_bps,
                max: MAX_STRATEGIST_FEE_BPS,
            });
        }
        Ok(())
    }

    /// Split the performance fee charged on `profit`.
    pub fn split(&self, profit: U256) -> CryptResult<FeeBreakdown> {
        let total = apply_bps(profit, self.total_fee_bps)?;
        let caller = apply_bps(total, self.call_fee_bps)?;
        let treasury_gross = apply_bps(total, self.treasury_fee_bps)?;
        let strategist = apply_bps(treasury_gross, self.strategist_fee_bps)?;

        Ok(FeeBreakdown {
            total,
            caller,
            treasury: treasury_gross - strategist,
            strategist,
        })
    }
}

/// Annualize `profit` earned on `principal` over `elapsed_secs`, in basis points.
pub fn annualized_apr_bps(profit: U256, principal: U256, elapsed_secs: u64) -> u64 {
    if principal.is_zero() || elapsed_secs == 0 {
        return 0;
    }
    let numerator = profit
        .saturating_mul(U256::from(PERCENT_DIVISOR))
        .saturating_mul(U256::from(SECONDS_PER_YEAR));
    let denominator = principal.saturating_mul(U256::from(elapsed_secs));
    let apr = numerator / denominator;
    u64::try_from(apr).unwrap_or(u64::MAX)
}
