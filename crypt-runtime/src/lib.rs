pub mod error;
pub mod types;
pub mod access;
pub mod harvest_log;
pub mod fees;
pub mod lock;
pub mod clock;
pub mod config;
pub mod units;
pub mod token;
pub mod venue;
pub mod sim;
pub mod strategy;
pub mod vault;

pub use access::AccessControlRegistry;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{StrategyConfig, VaultConfig};
pub use error::{CryptError, CryptResult};
pub use fees::FeeSchedule;
pub use harvest_log::HarvestLedger;
pub use strategy::{Strategy, StrategyDeployment};
pub use token::FungibleToken;
pub use types::*;
pub use vault::Vault;
pub use venue::YieldVenue;
