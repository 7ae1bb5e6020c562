use std::collections::HashMap;
use std::sync::Mutex;

use alloy_primitives::{Address, U256};

use crate::error::{CryptError, CryptResult};
use crate::token::FungibleToken;

#[derive(Debug, Default)]
struct Balances {
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    total_supply: U256,
}

/// ERC20-style ledger held in memory. `U256::MAX` allowances are never consumed.
#[derive(Debug)]
pub struct SimToken {
    symbol: String,
    state: Mutex<Balances>,
}

impl SimToken {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            state: Mutex::new(Balances::default()),
        }
    }

    /// Create `amount` new units for `to`.
    pub fn mint(&self, to: Address, amount: U256) -> CryptResult<()> {
        let mut state = self.state.lock()?;
        let balance = state.balances.entry(to).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| CryptError::Arithmetic("mint overflows balance".into()))?;
        state.total_supply = state.total_supply.saturating_add(amount);
        Ok(())
    }

    pub fn total_supply(&self) -> CryptResult<U256> {
        Ok(self.state.lock()?.total_supply)
    }

    fn move_balance(state: &mut Balances, from: Address, to: Address, amount: U256) -> CryptResult<()> {
        let have = state.balances.get(&from).copied().unwrap_or_default();
        if have < amount {
            return Err(CryptError::InsufficientBalance { have, need: amount });
        }
        state.balances.insert(from, have - amount);
        *state.balances.entry(to).or_default() += amount;
        Ok(())
    }
}

impl FungibleToken for SimToken {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn balance_of(&self, account: &Address) -> CryptResult<U256> {
        Ok(self.state.lock()?.balances.get(account).copied().unwrap_or_default())
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> CryptResult<U256> {
        Ok(self
            .state
            .lock()?
            .allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or_default())
    }

    fn approve(&self, owner: Address, spender: Address, amount: U256) -> CryptResult<()> {
        self.state.lock()?.allowances.insert((owner, spender), amount);
        Ok(())
    }

    fn transfer(&self, from: Address, to: Address, amount: U256) -> CryptResult<()> {
        let mut state = self.state.lock()?;
        Self::move_balance(&mut state, from, to, amount)
    }

    fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> CryptResult<()> {
        let mut state = self.state.lock()?;
        let allowed = state
            .allowances
            .get(&(from, spender))
            .copied()
            .unwrap_or_default();
        if allowed < amount {
            return Err(CryptError::InsufficientAllowance {
                have: allowed,
                need: amount,
            });
        }
        Self::move_balance(&mut state, from, to, amount)?;
        if allowed != U256::MAX {
            state.allowances.insert((from, spender), allowed - amount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn test_transfer_moves_balance() {
        let token = SimToken::new("WANT");
        token.mint(addr(1), U256::from(100u64)).unwrap();
        token.transfer(addr(1), addr(2), U256::from(40u64)).unwrap();
        assert_eq!(token.balance_of(&addr(1)).unwrap(), U256::from(60u64));
        assert_eq!(token.balance_of(&addr(2)).unwrap(), U256::from(40u64));
        assert_eq!(token.total_supply().unwrap(), U256::from(100u64));
    }

    #[test]
    fn test_transfer_over_balance_changes_nothing() {
        let token = SimToken::new("WANT");
        token.mint(addr(1), U256::from(10u64)).unwrap();
        let err = token.transfer(addr(1), addr(2), U256::from(11u64)).unwrap_err();
        assert_eq!(err.reason(), "insufficient balance");
        assert_eq!(token.balance_of(&addr(1)).unwrap(), U256::from(10u64));
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let token = SimToken::new("WANT");
        token.mint(addr(1), U256::from(100u64)).unwrap();
        token.approve(addr(1), addr(9), U256::from(50u64)).unwrap();

        token
            .transfer_from(addr(9), addr(1), addr(2), U256::from(30u64))
            .unwrap();
        assert_eq!(token.allowance(&addr(1), &addr(9)).unwrap(), U256::from(20u64));

        let err = token
            .transfer_from(addr(9), addr(1), addr(2), U256::from(30u64))
            .unwrap_err();
        assert_eq!(err.reason(), "insufficient allowance");
    }

    #[test]
    fn test_max_allowance_is_not_consumed() {
        let token = SimToken::new("WANT");
        token.mint(addr(1), U256::from(100u64)).unwrap();
        token.approve(addr(1), addr(9), U256::MAX).unwrap();
        token
            .transfer_from(addr(9), addr(1), addr(2), U256::from(100u64))
            .unwrap();
        assert_eq!(token.allowance(&addr(1), &addr(9)).unwrap(), U256::MAX);
    }
}
