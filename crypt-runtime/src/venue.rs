use alloy_primitives::{Address, U256};

use crate::error::CryptResult;

/// External venue a strategy deploys funds into.
///
/// Principal and yield are tracked separately: `balance_of` reports
/// principal only, yield is realized through `claim_yield`. Failures should
/// surface as `CryptError::VenueUnavailable`.
pub trait YieldVenue: Send + Sync {
    /// Venue identifier, used in logs.
    fn venue_id(&self) -> &str;

    /// Account that holds deposited funds; depositors approve it as spender.
    fn address(&self) -> Address;

    /// Pull `amount` of the asset from `depositor` into the venue.
    fn deposit(&self, depositor: Address, amount: U256) -> CryptResult<()>;

    /// Return `amount` of principal to `depositor`.
    fn withdraw(&self, depositor: Address, amount: U256) -> CryptResult<()>;

    /// Pay out all accrued yield to `depositor`, returning the amount.
    fn claim_yield(&self, depositor: Address) -> CryptResult<U256>;

    /// Yield `claim_yield` would pay right now.
    fn pending_yield(&self, depositor: &Address) -> CryptResult<U256>;

    /// Principal held for `depositor`, as reported by the venue.
    fn balance_of(&self, depositor: &Address) -> CryptResult<U256>;
}
