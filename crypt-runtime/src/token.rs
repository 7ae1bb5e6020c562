use alloy_primitives::{Address, U256};

use crate::error::CryptResult;

/// Standard fungible-token contract the vault and strategy custody.
///
/// The acting account is passed explicitly (it is `msg.sender` on-ledger).
/// Each call is atomic: it either moves the full amount or changes nothing.
pub trait FungibleToken: Send + Sync {
    fn symbol(&self) -> &str;

    fn balance_of(&self, account: &Address) -> CryptResult<U256>;

    fn allowance(&self, owner: &Address, spender: &Address) -> CryptResult<U256>;

    fn approve(&self, owner: Address, spender: Address, amount: U256) -> CryptResult<()>;

    /// Move `amount` from `from` (the caller) to `to`.
    fn transfer(&self, from: Address, to: Address, amount: U256) -> CryptResult<()>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming allowance.
    fn transfer_from(&self, spender: Address, from: Address, to: Address, amount: U256)
    -> CryptResult<()>;
}
