//! Yield strategy: deploys vault funds into a venue, harvests and compounds
//! yield, and runs the emergency lifecycle.
//!
//! Legal transitions:
//! - `pause`: Active to Paused.
//! - `unpause`: Paused or Panicked to Active.
//! - `panic`: Active or Paused to Panicked.
//! - `retire_strat`: any state but Retired to Retired, which is terminal.
//!
//! Every mutating call holds the re-entrancy lock for its whole duration and
//! rolls internal state back to a snapshot if any step fails. The tracked
//! deployed principal is kept across rollbacks: it only changes after a venue
//! call has succeeded, so it always mirrors what the venue actually holds.

use std::sync::{Arc, Mutex, MutexGuard};

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::access::AccessControlRegistry;
use crate::clock::Clock;
use crate::config::StrategyConfig;
use crate::error::{CryptError, CryptResult};
use crate::fees::{FeeSchedule, MAX_SECURITY_FEE_BPS, MAX_STRATEGIST_FEE_BPS, annualized_apr_bps, apply_bps};
use crate::harvest_log::HarvestLedger;
use crate::lock::ReentrancyLock;
use crate::token::FungibleToken;
use crate::types::{
    FeeBreakdown, FeeRecipients, HarvestEstimate, HarvestOutcome, HarvestRecord, MultisigRoles,
    Operation, StrategyState, Tier,
};
use crate::venue::YieldVenue;

/// Everything fixed at strategy construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDeployment {
    /// Account the strategy holds custody under.
    pub address: Address,
    /// Constructing account; granted super admin.
    pub deployer: Address,
    pub vault: Address,
    pub fee_recipients: FeeRecipients,
    pub strategists: Vec<Address>,
    pub multisig_roles: MultisigRoles,
    #[serde(default)]
    pub config: StrategyConfig,
}

#[derive(Debug, Clone)]
struct StrategyInner {
    state: StrategyState,
    config: StrategyConfig,
    recipients: FeeRecipients,
    registry: AccessControlRegistry,
    ledger: HarvestLedger,
    /// Principal this strategy has placed in the venue.
    deployed: U256,
    last_harvest: Option<u64>,
    /// Start of the window the next ledger entry covers.
    log_anchor: u64,
    /// Net profit compounded since the last ledger entry.
    unlogged_profit: U256,
}

pub struct Strategy {
    address: Address,
    vault: Address,
    asset: Arc<dyn FungibleToken>,
    venue: Arc<dyn YieldVenue>,
    clock: Arc<dyn Clock>,
    inner: Mutex<StrategyInner>,
    lock: ReentrancyLock,
}

impl Strategy {
    pub fn new(
        deployment: StrategyDeployment,
        asset: Arc<dyn FungibleToken>,
        venue: Arc<dyn YieldVenue>,
        clock: Arc<dyn Clock>,
    ) -> CryptResult<Self> {
        deployment.config.validate()?;
        let registry = AccessControlRegistry::bootstrap(
            deployment.deployer,
            &deployment.strategists,
            deployment.multisig_roles,
        );
        asset.approve(deployment.address, venue.address(), U256::MAX)?;

        tracing::info!(
            strategy = %deployment.address,
            vault = %deployment.vault,
            venue = venue.venue_id(),
            asset = asset.symbol(),
            "strategy deployed"
        );

        let now = clock.now();
        Ok(Self {
            address: deployment.address,
            vault: deployment.vault,
            asset,
            venue,
            clock,
            inner: Mutex::new(StrategyInner {
                state: StrategyState::Active,
                config: deployment.config,
                recipients: deployment.fee_recipients,
                registry,
                ledger: HarvestLedger::new(),
                deployed: U256::ZERO,
                last_harvest: None,
                log_anchor: now,
                unlogged_profit: U256::ZERO,
            }),
            lock: ReentrancyLock::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn vault(&self) -> Address {
        self.vault
    }

    // ── Views ────────────────────────────────────────────────────────────

    pub fn state(&self) -> CryptResult<StrategyState> {
        Ok(self.inner()?.state)
    }

    pub fn config(&self) -> CryptResult<StrategyConfig> {
        Ok(self.inner()?.config)
    }

    pub fn fee_recipients(&self) -> CryptResult<FeeRecipients> {
        Ok(self.inner()?.recipients)
    }

    pub fn tier_of(&self, account: &Address) -> CryptResult<Tier> {
        Ok(self.inner()?.registry.tier_of(account))
    }

    pub fn harvest_log(&self) -> CryptResult<HarvestLedger> {
        Ok(self.inner()?.ledger.clone())
    }

    pub fn last_harvest_timestamp(&self) -> CryptResult<Option<u64>> {
        Ok(self.inner()?.last_harvest)
    }

    pub fn average_apr_across_last_n_harvests(&self, n: usize) -> CryptResult<u64> {
        Ok(self.inner()?.ledger.average_apr(n))
    }

    /// Asset held directly by the strategy.
    pub fn balance_of_want(&self) -> CryptResult<U256> {
        self.asset.balance_of(&self.address)
    }

    /// Principal in the venue, never more than the strategy itself deployed.
    pub fn balance_of_pool(&self) -> CryptResult<U256> {
        let tracked = self.inner()?.deployed;
        if tracked.is_zero() {
            return Ok(U256::ZERO);
        }
        let reported = self.venue.balance_of(&self.address)?;
        if reported > tracked {
            tracing::warn!(
                strategy = %self.address,
                venue = self.venue.venue_id(),
                %reported,
                %tracked,
                "venue over-reports principal, clamping"
            );
            return Ok(tracked);
        }
        Ok(reported)
    }

    /// Total managed by the strategy: idle custody plus deployed principal.
    pub fn balance_of(&self) -> CryptResult<U256> {
        Ok(self.balance_of_want()? + self.balance_of_pool()?)
    }

    /// What `harvest()` would claim right now and the caller's cut of it.
    pub fn estimate_harvest(&self) -> CryptResult<HarvestEstimate> {
        let (state, fees) = {
            let inner = self.inner()?;
            (inner.state, inner.config.fees)
        };
        if state == StrategyState::Retired {
            return Ok(HarvestEstimate::default());
        }
        let profit = self.venue.pending_yield(&self.address)?;
        Ok(HarvestEstimate {
            profit,
            caller_fee: fees.split(profit)?.caller,
        })
    }

    // ── Vault entry points ───────────────────────────────────────────────

    /// Pull `amount` from the vault and deploy all idle custody.
    pub fn deposit(&self, caller: Address, amount: U256) -> CryptResult<()> {
        let _guard = self.lock.try_enter()?;
        self.only_vault(&caller)?;
        if amount.is_zero() {
            return Err(CryptError::InvalidAmount(amount));
        }
        match self.state()? {
            StrategyState::Active => {}
            StrategyState::Retired => return Err(CryptError::Retired),
            StrategyState::Paused | StrategyState::Panicked => return Err(CryptError::Paused),
        }

        self.asset
            .transfer_from(self.address, self.vault, self.address, amount)?;
        let idle = self.balance_of_want()?;
        if let Err(e) = self.venue_deposit(idle) {
            if let Err(refund) = self.asset.transfer(self.address, self.vault, amount) {
                tracing::error!(strategy = %self.address, %amount, error = %refund, "refund to vault failed");
            }
            return Err(e);
        }

        tracing::info!(strategy = %self.address, %amount, deployed = %idle, "funds deployed");
        Ok(())
    }

    /// Send `amount` back to the vault less the security fee, which stays
    /// with the strategy. Returns what the vault received.
    pub fn withdraw(&self, caller: Address, amount: U256) -> CryptResult<U256> {
        let _guard = self.lock.try_enter()?;
        self.only_vault(&caller)?;
        if amount.is_zero() || amount > self.balance_of()? {
            return Err(CryptError::InvalidAmount(amount));
        }

        let idle = self.balance_of_want()?;
        if idle < amount {
            self.venue_withdraw(amount - idle)?;
        }
        let available = self.balance_of_want()?.min(amount);
        let fee = apply_bps(available, self.inner()?.config.security_fee_bps)?;
        let net = available - fee;
        self.asset.transfer(self.address, self.vault, net)?;

        tracing::info!(strategy = %self.address, %amount, %fee, %net, "withdrawn to vault");
        Ok(net)
    }

    // ── Harvest ──────────────────────────────────────────────────────────

    /// Claim venue yield, pay the performance fee and compound the rest.
    pub fn harvest(&self, caller: Address) -> CryptResult<HarvestOutcome> {
        let _guard = self.lock.try_enter()?;
        let now = self.clock.now();
        let snapshot = {
            let mut inner = self.inner()?;
            inner.registry.authorize(&caller, Operation::Harvest)?;
            if inner.state == StrategyState::Retired {
                return Err(CryptError::Retired);
            }
            if inner.last_harvest == Some(now) {
                return Err(CryptError::StaleHarvest(now));
            }
            let snapshot = inner.clone();
            inner.last_harvest = Some(now);
            snapshot
        };
        self.harvest_core(caller, now)
            .inspect_err(|e| self.rollback(snapshot, "harvest", e))
    }

    fn harvest_core(&self, caller: Address, now: u64) -> CryptResult<HarvestOutcome> {
        let principal = self.balance_of()?;
        let profit = self.venue.claim_yield(self.address)?;

        let (schedule, state, recipients, anchor) = {
            let inner = self.inner()?;
            (inner.config.fees, inner.state, inner.recipients, inner.log_anchor)
        };
        let fees = schedule.split(profit)?;
        let net_profit = profit - fees.paid();

        if state.can_deploy() {
            let idle = self.balance_of_want()?;
            self.venue_deposit(idle.saturating_sub(fees.paid()))?;
        }
        self.pay_fees(caller, recipients, &fees)?;

        let logged = {
            let mut inner = self.inner()?;
            inner.unlogged_profit += net_profit;
            let elapsed = now.saturating_sub(anchor);
            let due = inner.ledger.is_empty() || elapsed >= inner.config.harvest_log_cadence_secs;
            // The redeploy above must not move the window this entry covers.
            inner.log_anchor = anchor;
            if due {
                let entry = HarvestRecord {
                    timestamp: now,
                    profit: inner.unlogged_profit,
                    apr_bps: annualized_apr_bps(inner.unlogged_profit, principal, elapsed),
                };
                inner.ledger.record(entry);
                inner.log_anchor = now;
                inner.unlogged_profit = U256::ZERO;
            }
            due
        };

        tracing::info!(
            strategy = %self.address,
            %caller,
            %profit,
            fee = %fees.total,
            %net_profit,
            compounded = state.can_deploy(),
            logged,
            "harvested"
        );
        Ok(HarvestOutcome {
            timestamp: now,
            profit,
            fees,
            net_profit,
            logged,
        })
    }

    fn pay_fees(&self, caller: Address, recipients: FeeRecipients, fees: &FeeBreakdown) -> CryptResult<()> {
        for (to, amount) in [
            (caller, fees.caller),
            (recipients.treasury, fees.treasury),
            (recipients.strategist_remitter, fees.strategist),
        ] {
            if !amount.is_zero() {
                self.asset.transfer(self.address, to, amount)?;
            }
        }
        Ok(())
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Stop deploying new funds. Deployed principal stays in the venue.
    pub fn pause(&self, caller: Address) -> CryptResult<()> {
        let _guard = self.lock.try_enter()?;
        let snapshot = self.transition(&caller, Operation::Pause, StrategyState::Paused)?;
        self.remove_allowance()
            .inspect_err(|e| self.rollback(snapshot, "pause", e))?;
        tracing::info!(strategy = %self.address, %caller, "strategy paused");
        Ok(())
    }

    /// Resume from Paused or Panicked and redeploy idle custody.
    pub fn unpause(&self, caller: Address) -> CryptResult<()> {
        let _guard = self.lock.try_enter()?;
        let snapshot = self.transition(&caller, Operation::Unpause, StrategyState::Active)?;
        self.unpause_core()
            .inspect_err(|e| self.rollback(snapshot, "unpause", e))?;
        tracing::info!(strategy = %self.address, %caller, "strategy unpaused");
        Ok(())
    }

    fn unpause_core(&self) -> CryptResult<()> {
        self.asset
            .approve(self.address, self.venue.address(), U256::MAX)?;
        let idle = self.balance_of_want()?;
        self.venue_deposit(idle)
    }

    /// Pull all principal out of the venue into strategy custody.
    pub fn panic(&self, caller: Address) -> CryptResult<()> {
        let _guard = self.lock.try_enter()?;
        let snapshot = self.transition(&caller, Operation::Panic, StrategyState::Panicked)?;
        let withdrawn = self
            .exit_venue()
            .and_then(|withdrawn| self.remove_allowance().map(|_| withdrawn))
            .inspect_err(|e| self.rollback(snapshot, "panic", e))?;
        tracing::warn!(strategy = %self.address, %caller, %withdrawn, "strategy panicked");
        Ok(())
    }

    /// Exit the venue for good and hand all custody back to the vault.
    pub fn retire_strat(&self, caller: Address) -> CryptResult<()> {
        let _guard = self.lock.try_enter()?;
        let snapshot = self.transition(&caller, Operation::RetireStrat, StrategyState::Retired)?;
        let returned = self
            .retire_core()
            .inspect_err(|e| self.rollback(snapshot, "retireStrat", e))?;
        tracing::info!(strategy = %self.address, %caller, %returned, "strategy retired");
        Ok(())
    }

    fn retire_core(&self) -> CryptResult<U256> {
        // Yield accrued before a panic is still owed once the principal is out.
        let claimed = self.venue.claim_yield(self.address)?;
        if !claimed.is_zero() {
            tracing::info!(strategy = %self.address, %claimed, "claimed remaining yield");
        }
        self.exit_venue()?;
        self.remove_allowance()?;
        let idle = self.balance_of_want()?;
        if !idle.is_zero() {
            self.asset.transfer(self.address, self.vault, idle)?;
        }
        Ok(idle)
    }

    /// Authorize `operation`, check it is legal from the current state and
    /// move to `to`. Returns the pre-transition snapshot.
    fn transition(
        &self,
        caller: &Address,
        operation: Operation,
        to: StrategyState,
    ) -> CryptResult<StrategyInner> {
        let mut inner = self.inner()?;
        inner.registry.authorize(caller, operation)?;
        let from = inner.state;
        let legal = match operation {
            Operation::Pause => from == StrategyState::Active,
            Operation::Unpause => matches!(from, StrategyState::Paused | StrategyState::Panicked),
            Operation::Panic => matches!(from, StrategyState::Active | StrategyState::Paused),
            Operation::RetireStrat => from != StrategyState::Retired,
            _ => false,
        };
        if !legal {
            return Err(CryptError::InvalidTransition { operation, from });
        }
        let snapshot = inner.clone();
        inner.state = to;
        Ok(snapshot)
    }

    // ── Administration ───────────────────────────────────────────────────

    pub fn update_harvest_log_cadence(&self, caller: Address, secs: u64) -> CryptResult<()> {
        self.administer(&caller, Operation::UpdateHarvestLogCadence, |inner| {
            inner.config.harvest_log_cadence_secs = secs;
            Ok(())
        })?;
        tracing::info!(strategy = %self.address, %caller, secs, "harvest log cadence updated");
        Ok(())
    }

    pub fn update_security_fee(&self, caller: Address, bps: u32) -> CryptResult<()> {
        self.administer(&caller, Operation::UpdateSecurityFee, |inner| {
            if bps > MAX_SECURITY_FEE_BPS {
                return Err(CryptError::FeeTooHigh {
                    fee: bps,
                    max: MAX_SECURITY_FEE_BPS,
                });
            }
            inner.config.security_fee_bps = bps;
            Ok(())
        })?;
        tracing::info!(strategy = %self.address, %caller, bps, "security fee updated");
        Ok(())
    }

    /// Replace the performance fee and its caller/treasury split.
    pub fn update_fees(
        &self,
        caller: Address,
        total_fee_bps: u32,
        call_fee_bps: u32,
        treasury_fee_bps: u32,
    ) -> CryptResult<()> {
        self.administer(&caller, Operation::UpdateFees, |inner| {
            let schedule = FeeSchedule {
                total_fee_bps,
                call_fee_bps,
                treasury_fee_bps,
                ..inner.config.fees
            };
            schedule.validate()?;
            inner.config.fees = schedule;
            Ok(())
        })?;
        tracing::info!(
            strategy = %self.address,
            %caller,
            total_fee_bps,
            call_fee_bps,
            treasury_fee_bps,
            "fees updated"
        );
        Ok(())
    }

    pub fn update_strategist_fee(&self, caller: Address, bps: u32) -> CryptResult<()> {
        self.administer(&caller, Operation::UpdateStrategistFee, |inner| {
            if bps > MAX_STRATEGIST_FEE_BPS {
                return Err(CryptError::FeeTooHigh {
                    fee: bps,
                    max: MAX_STRATEGIST_FEE_BPS,
                });
            }
            inner.config.fees.strategist_fee_bps = bps;
            Ok(())
        })?;
        tracing::info!(strategy = %self.address, %caller, bps, "strategist fee updated");
        Ok(())
    }

    pub fn update_treasury(&self, caller: Address, treasury: Address) -> CryptResult<()> {
        self.administer(&caller, Operation::UpdateTreasury, |inner| {
            inner.recipients.treasury = treasury;
            Ok(())
        })?;
        tracing::info!(strategy = %self.address, %caller, %treasury, "treasury updated");
        Ok(())
    }

    pub fn update_strategist_remitter(&self, caller: Address, remitter: Address) -> CryptResult<()> {
        self.administer(&caller, Operation::UpdateStrategistRemitter, |inner| {
            inner.recipients.strategist_remitter = remitter;
            Ok(())
        })?;
        tracing::info!(strategy = %self.address, %caller, %remitter, "strategist remitter updated");
        Ok(())
    }

    pub fn grant_role(&self, caller: Address, account: Address, tier: Tier) -> CryptResult<()> {
        let _guard = self.lock.try_enter()?;
        self.inner()?.registry.grant(&caller, account, tier)
    }

    pub fn revoke_role(&self, caller: Address, account: Address) -> CryptResult<()> {
        let _guard = self.lock.try_enter()?;
        self.inner()?.registry.revoke(&caller, account)
    }

    fn administer(
        &self,
        caller: &Address,
        operation: Operation,
        apply: impl FnOnce(&mut StrategyInner) -> CryptResult<()>,
    ) -> CryptResult<()> {
        let _guard = self.lock.try_enter()?;
        let mut inner = self.inner()?;
        inner.registry.authorize(caller, operation)?;
        apply(&mut inner)
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn inner(&self) -> CryptResult<MutexGuard<'_, StrategyInner>> {
        Ok(self.inner.lock()?)
    }

    fn only_vault(&self, caller: &Address) -> CryptResult<()> {
        if *caller != self.vault {
            return Err(CryptError::NotVault);
        }
        Ok(())
    }

    fn venue_deposit(&self, amount: U256) -> CryptResult<()> {
        if amount.is_zero() {
            return Ok(());
        }
        self.venue.deposit(self.address, amount)?;
        let mut inner = self.inner()?;
        if inner.deployed.is_zero() {
            // Nothing was earning before this deposit.
            inner.log_anchor = self.clock.now();
        }
        inner.deployed += amount;
        Ok(())
    }

    fn venue_withdraw(&self, amount: U256) -> CryptResult<()> {
        if amount.is_zero() {
            return Ok(());
        }
        self.venue.withdraw(self.address, amount)?;
        let mut inner = self.inner()?;
        inner.deployed = inner.deployed.saturating_sub(amount);
        Ok(())
    }

    /// Withdraw all principal the venue will give back.
    fn exit_venue(&self) -> CryptResult<U256> {
        let amount = self.balance_of_pool()?;
        self.venue_withdraw(amount)?;
        Ok(amount)
    }

    fn remove_allowance(&self) -> CryptResult<()> {
        self.asset
            .approve(self.address, self.venue.address(), U256::ZERO)
    }

    fn rollback(&self, snapshot: StrategyInner, operation: &'static str, err: &CryptError) {
        if let Ok(mut inner) = self.inner.lock() {
            let deployed = inner.deployed;
            *inner = snapshot;
            inner.deployed = deployed;
        }
        tracing::warn!(strategy = %self.address, operation, error = %err, "rolled back");
    }
}
