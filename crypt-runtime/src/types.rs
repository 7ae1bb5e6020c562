use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Fixed-point scale for price per share (1e18).
pub const SCALE: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Basis points denominator.
pub const PERCENT_DIVISOR: u32 = 10_000;

pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 3600;

/// Access tier. Ordering is load-bearing: a caller is authorized for an
/// operation when its tier is `>=` the operation's minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Unassigned,
    Strategist,
    Guardian,
    Admin,
    SuperAdmin,
}

/// Strategy lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyState {
    Active,
    Paused,
    Panicked,
    Retired,
}

impl StrategyState {
    /// Whether the strategy may put funds into the yield venue.
    pub fn can_deploy(&self) -> bool {
        matches!(self, StrategyState::Active)
    }
}

/// Gated strategy operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Harvest,
    UpdateHarvestLogCadence,
    Pause,
    Unpause,
    Panic,
    RetireStrat,
    UpdateSecurityFee,
    UpdateFees,
    UpdateStrategistFee,
    UpdateTreasury,
    UpdateStrategistRemitter,
    GrantRole,
    RevokeRole,
}

/// Where harvest fees go: `[treasury, strategist_remitter]` at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRecipients {
    pub treasury: Address,
    pub strategist_remitter: Address,
}

/// Multisig role holders supplied at construction: `[super_admin, admin, guardian]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigRoles {
    pub super_admin: Address,
    pub admin: Address,
    pub guardian: Address,
}

/// One appended harvest outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestRecord {
    pub timestamp: u64,
    /// Net profit compounded since the previous record.
    pub profit: U256,
    pub apr_bps: u64,
}

/// Read-only projection of what an immediate harvest would realize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HarvestEstimate {
    pub profit: U256,
    pub caller_fee: U256,
}

/// Split of a harvest's performance fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub total: U256,
    pub caller: U256,
    pub treasury: U256,
    pub strategist: U256,
}

impl FeeBreakdown {
    /// Sum actually paid out; rounding dust stays with the strategy.
    pub fn paid(&self) -> U256 {
        self.caller + self.treasury + self.strategist
    }
}

/// Result of a successful harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestOutcome {
    pub timestamp: u64,
    /// Gross yield claimed from the venue.
    pub profit: U256,
    pub fees: FeeBreakdown,
    /// Profit left to shareholders after fees.
    pub net_profit: U256,
    /// Whether a ledger entry was appended (cadence elapsed).
    pub logged: bool,
}
