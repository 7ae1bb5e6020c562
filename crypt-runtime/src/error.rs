use alloy_primitives::U256;
use thiserror::Error;

use crate::types::{Operation, StrategyState, Tier};

/// Every failure aborts the operation that raised it. `reason()` gives the
/// short, stable string callers match on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptError {
    #[error("unauthorized access")]
    Unauthorized {
        operation: Operation,
        required: Tier,
        actual: Tier,
    },

    #[error("caller is not the owner")]
    NotOwner,

    #[error("!vault")]
    NotVault,

    #[error("vault is full: pool {pool} + deposit {amount} exceeds cap {cap}")]
    CapacityExceeded { pool: U256, amount: U256, cap: U256 },

    #[error("please provide amount")]
    ZeroAmount,

    #[error("deposit too small to mint shares")]
    ZeroShares,

    #[error("first deposit below minimum: {amount} < {minimum}")]
    BelowMinimumDeposit { amount: U256, minimum: U256 },

    #[error("insufficient shares: requested {requested}, held {held}")]
    InsufficientShares { requested: U256, held: U256 },

    #[error("invalid amount: {0}")]
    InvalidAmount(U256),

    #[error("already initialized")]
    AlreadyBound,

    #[error("strategy not bound")]
    NotBound,

    #[error("reentrant call")]
    Reentrancy,

    #[error("harvest already executed at timestamp {0}")]
    StaleHarvest(u64),

    #[error("yield venue unavailable: {0}")]
    VenueUnavailable(String),

    #[error("strategy is paused")]
    Paused,

    #[error("strategy is retired")]
    Retired,

    #[error("invalid transition: {operation:?} from {from:?}")]
    InvalidTransition {
        operation: Operation,
        from: StrategyState,
    },

    #[error("fee too high: {fee} bps > {max} bps")]
    FeeTooHigh { fee: u32, max: u32 },

    #[error("fee split must sum to 10000 bps, got {0}")]
    InvalidFeeSplit(u32),

    #[error("transfer amount exceeds balance: have {have}, need {need}")]
    InsufficientBalance { have: U256, need: U256 },

    #[error("insufficient allowance: have {have}, need {need}")]
    InsufficientAllowance { have: U256, need: U256 },

    #[error("math overflow: {0}")]
    Arithmetic(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("state lock poisoned: {0}")]
    LockPoisoned(String),
}

impl CryptError {
    /// Machine-checkable reason, stable across releases.
    pub fn reason(&self) -> &'static str {
        match self {
            CryptError::Unauthorized { .. } => "unauthorized access",
            CryptError::NotOwner => "not owner",
            CryptError::NotVault => "!vault",
            CryptError::CapacityExceeded { .. } => "vault is full",
            CryptError::ZeroAmount => "please provide amount",
            CryptError::ZeroShares => "zero shares",
            CryptError::BelowMinimumDeposit { .. } => "below minimum deposit",
            CryptError::InsufficientShares { .. } => "insufficient shares",
            CryptError::InvalidAmount(_) => "invalid amount",
            CryptError::AlreadyBound => "already initialized",
            CryptError::NotBound => "not initialized",
            CryptError::Reentrancy => "reentrant call",
            CryptError::StaleHarvest(_) => "stale harvest",
            CryptError::VenueUnavailable(_) => "venue unavailable",
            CryptError::Paused => "paused",
            CryptError::Retired => "retired",
            CryptError::InvalidTransition { .. } => "invalid transition",
            CryptError::FeeTooHigh { .. } => "fee too high",
            CryptError::InvalidFeeSplit(_) => "invalid fee split",
            CryptError::InsufficientBalance { .. } => "insufficient balance",
            CryptError::InsufficientAllowance { .. } => "insufficient allowance",
            CryptError::Arithmetic(_) => "math overflow",
            CryptError::Config(_) => "invalid config",
            CryptError::LockPoisoned(_) => "lock poisoned",
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for CryptError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        CryptError::LockPoisoned(e.to_string())
    }
}

pub type CryptResult<T> = Result<T, CryptError>;

pub fn arithmetic_err<S: AsRef<str>>(s: S) -> CryptError {
    CryptError::Arithmetic(s.as_ref().to_string())
}
