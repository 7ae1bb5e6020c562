use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, U256};

use crate::clock::Clock;
use crate::error::{CryptError, CryptResult};
use crate::fees::mul_div;
use crate::sim::SimToken;
use crate::token::FungibleToken;
use crate::types::{PERCENT_DIVISOR, SECONDS_PER_YEAR};
use crate::venue::YieldVenue;

#[derive(Debug, Default, Clone, Copy)]
struct Position {
    principal: U256,
    accrued: U256,
    checkpoint: u64,
}

/// Lending-pool style venue paying a fixed APR on principal, minted as new
/// asset units on claim.
pub struct SimVenue {
    address: Address,
    token: Arc<SimToken>,
    clock: Arc<dyn Clock>,
    apr_bps: u32,
    positions: Mutex<HashMap<Address, Position>>,
    online: AtomicBool,
    /// Extra principal added to every `balance_of` report.
    misreport: Mutex<U256>,
}

impl SimVenue {
    pub fn new(address: Address, token: Arc<SimToken>, clock: Arc<dyn Clock>, apr_bps: u32) -> Self {
        Self {
            address,
            token,
            clock,
            apr_bps,
            positions: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            misreport: Mutex::new(U256::ZERO),
        }
    }

    /// Take the venue offline; every call fails with `VenueUnavailable`.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Make `balance_of` over-report principal by `extra`.
    pub fn set_misreport(&self, extra: U256) -> CryptResult<()> {
        *self.misreport.lock()? = extra;
        Ok(())
    }

    fn ensure_online(&self) -> CryptResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CryptError::VenueUnavailable(format!("venue {} offline", self.address)))
        }
    }

    fn accrue(&self, position: &mut Position, now: u64) -> CryptResult<()> {
        let elapsed = now.saturating_sub(position.checkpoint);
        if elapsed > 0 && !position.principal.is_zero() {
            let earned = mul_div(
                position.principal,
                U256::from(self.apr_bps) * U256::from(elapsed),
                U256::from(PERCENT_DIVISOR) * U256::from(SECONDS_PER_YEAR),
            )?;
            position.accrued += earned;
        }
        position.checkpoint = now;
        Ok(())
    }
}

impl YieldVenue for SimVenue {
    fn venue_id(&self) -> &str {
        "sim-lending"
    }

    fn address(&self) -> Address {
        self.address
    }

    fn deposit(&self, depositor: Address, amount: U256) -> CryptResult<()> {
        self.ensure_online()?;
        let now = self.clock.now();
        let mut positions = self.positions.lock()?;
        let mut position = positions.get(&depositor).copied().unwrap_or_default();
        self.accrue(&mut position, now)?;
        self.token
            .transfer_from(self.address, depositor, self.address, amount)?;
        position.principal += amount;
        positions.insert(depositor, position);
        Ok(())
    }

    fn withdraw(&self, depositor: Address, amount: U256) -> CryptResult<()> {
        self.ensure_online()?;
        let now = self.clock.now();
        let mut positions = self.positions.lock()?;
        let mut position = positions.get(&depositor).copied().unwrap_or_default();
        if amount > position.principal {
            return Err(CryptError::InsufficientBalance {
                have: position.principal,
                need: amount,
            });
        }
        self.accrue(&mut position, now)?;
        self.token.transfer(self.address, depositor, amount)?;
        position.principal -= amount;
        positions.insert(depositor, position);
        Ok(())
    }

    fn claim_yield(&self, depositor: Address) -> CryptResult<U256> {
        self.ensure_online()?;
        let now = self.clock.now();
        let mut positions = self.positions.lock()?;
        let mut position = positions.get(&depositor).copied().unwrap_or_default();
        self.accrue(&mut position, now)?;
        let profit = position.accrued;
        if !profit.is_zero() {
            self.token.mint(depositor, profit)?;
        }
        position.accrued = U256::ZERO;
        positions.insert(depositor, position);
        Ok(profit)
    }

    fn pending_yield(&self, depositor: &Address) -> CryptResult<U256> {
        self.ensure_online()?;
        let now = self.clock.now();
        let mut position = self
            .positions
            .lock()?
            .get(depositor)
            .copied()
            .unwrap_or_default();
        self.accrue(&mut position, now)?;
        Ok(position.accrued)
    }

    fn balance_of(&self, depositor: &Address) -> CryptResult<U256> {
        self.ensure_online()?;
        let principal = self
            .positions
            .lock()?
            .get(depositor)
            .map(|p| p.principal)
            .unwrap_or_default();
        Ok(principal + *self.misreport.lock()?)
    }
}
