//! Deploys a vault and strategy against the in-memory asset and venue, then
//! plays the scenario's steps in order.
//!
//! A step rejected by the vault or strategy is recorded in the report and the
//! run continues. Scenario mistakes (unknown account names, bad config) abort.

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy_primitives::{Address, U256, address};
use crypt_runtime::sim::{SimToken, SimVenue};
use crypt_runtime::units::{format_units, parse_units};
use crypt_runtime::{
    Clock, FeeRecipients, FungibleToken, HarvestRecord, ManualClock, MultisigRoles, Strategy,
    StrategyDeployment, StrategyState, Vault,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{SimError, SimResult};
use crate::scenario::{Scenario, Step};

pub const VENUE_ADDRESS: Address = address!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
pub const VAULT_ADDRESS: Address = address!("0x5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a");
pub const STRATEGY_ADDRESS: Address = address!("0x5151515151515151515151515151515151515151");

/// Price per share is always scaled by 1e18, whatever the asset's decimals.
const PRICE_DECIMALS: u32 = 18;

// ── Report ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub scenario: String,
    pub vault: String,
    pub steps: Vec<StepReport>,
    /// Steps the vault or strategy rejected.
    pub failures: usize,
    pub final_state: FinalState,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub timestamp: u64,
    pub action: &'static str,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepOutcome {
    Done,
    Minted {
        shares: Decimal,
    },
    Paid {
        amount: Decimal,
    },
    Harvested {
        profit: Decimal,
        fees: Decimal,
        net_profit: Decimal,
        logged: bool,
    },
    Estimated {
        profit: Decimal,
        caller_fee: Decimal,
    },
    Failed {
        reason: String,
        error: String,
    },
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StepOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalState {
    pub timestamp: u64,
    pub strategy_state: StrategyState,
    /// `None` when the venue could not report the pool.
    pub vault_balance: Option<Decimal>,
    pub total_supply: Decimal,
    /// `None` when the venue could not report the pool.
    pub price_per_full_share: Option<Decimal>,
    pub harvest_log: Vec<HarvestRecord>,
    pub average_apr_bps: u64,
    pub accounts: BTreeMap<String, AccountState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountState {
    pub want: Decimal,
    pub shares: Decimal,
}

// ── Simulation ───────────────────────────────────────────────────────────────

pub struct Simulation {
    scenario: Scenario,
    want: Arc<SimToken>,
    venue: Arc<SimVenue>,
    clock: Arc<ManualClock>,
    vault: Arc<Vault>,
    strategy: Arc<Strategy>,
}

impl Simulation {
    /// Deploy the strategy and vault, bind them, and fund the accounts.
    pub fn deploy(scenario: Scenario) -> SimResult<Self> {
        let roles = &scenario.roles;
        let deployer = scenario.address_of(&roles.deployer)?;
        let strategists = roles
            .strategists
            .iter()
            .map(|name| scenario.address_of(name))
            .collect::<SimResult<Vec<_>>>()?;

        let want = Arc::new(SimToken::new(scenario.asset.clone()));
        let clock = Arc::new(ManualClock::new(scenario.start_timestamp));
        let venue = Arc::new(SimVenue::new(
            VENUE_ADDRESS,
            want.clone(),
            clock.clone(),
            scenario.venue_apr_bps,
        ));

        let deployment = StrategyDeployment {
            address: STRATEGY_ADDRESS,
            deployer,
            vault: VAULT_ADDRESS,
            fee_recipients: FeeRecipients {
                treasury: scenario.address_of(&roles.treasury)?,
                strategist_remitter: scenario.address_of(&roles.strategist_remitter)?,
            },
            strategists,
            multisig_roles: MultisigRoles {
                super_admin: scenario.address_of(&roles.super_admin)?,
                admin: scenario.address_of(&roles.admin)?,
                guardian: scenario.address_of(&roles.guardian)?,
            },
            config: scenario.strategy_config()?,
        };
        let strategy = Arc::new(Strategy::new(
            deployment,
            want.clone(),
            venue.clone(),
            clock.clone(),
        )?);
        let vault = Arc::new(Vault::new(
            VAULT_ADDRESS,
            deployer,
            want.clone(),
            scenario.vault_name(),
            scenario.vault_symbol(),
            scenario.vault_config()?,
        )?);
        vault.initialize(deployer, strategy.clone())?;

        for (name, account) in &scenario.accounts {
            let balance = parse_units(&account.balance, scenario.decimals)?;
            if !balance.is_zero() {
                want.mint(account.address, balance)?;
            }
            want.approve(account.address, VAULT_ADDRESS, U256::MAX)?;
            tracing::debug!(account = %name, address = %account.address, %balance, "funded");
        }

        Ok(Self {
            scenario,
            want,
            venue,
            clock,
            vault,
            strategy,
        })
    }

    pub fn vault(&self) -> &Arc<Vault> {
        &self.vault
    }

    pub fn strategy(&self) -> &Arc<Strategy> {
        &self.strategy
    }

    /// Play every step and summarize the end state.
    pub fn run(&self) -> SimResult<Report> {
        let mut steps = Vec::with_capacity(self.scenario.steps.len());
        for (index, step) in self.scenario.steps.iter().enumerate() {
            let outcome = match self.execute(step) {
                Ok(outcome) => outcome,
                Err(SimError::Runtime(e)) => {
                    tracing::warn!(index, action = step.name(), reason = e.reason(), error = %e, "step rejected");
                    StepOutcome::Failed {
                        reason: e.reason().to_string(),
                        error: e.to_string(),
                    }
                }
                Err(other) => return Err(other),
            };
            steps.push(StepReport {
                index,
                timestamp: self.clock.now(),
                action: step.name(),
                outcome,
            });
        }

        let failures = steps.iter().filter(|s| s.outcome.is_failure()).count();
        tracing::info!(scenario = %self.scenario.name, steps = steps.len(), failures, "scenario finished");
        Ok(Report {
            scenario: self.scenario.name.clone(),
            vault: self.vault.name().to_string(),
            steps,
            failures,
            final_state: self.final_state()?,
        })
    }

    fn execute(&self, step: &Step) -> SimResult<StepOutcome> {
        let vault = &self.vault;
        let strategy = &self.strategy;
        let outcome = match step {
            Step::Deposit { actor, amount } => {
                let shares = vault.deposit(self.who(actor)?, self.raw(amount)?)?;
                StepOutcome::Minted {
                    shares: self.human(shares)?,
                }
            }
            Step::DepositAll { actor } => {
                let shares = vault.deposit_all(self.who(actor)?)?;
                StepOutcome::Minted {
                    shares: self.human(shares)?,
                }
            }
            Step::Withdraw { actor, shares } => {
                let paid = vault.withdraw(self.who(actor)?, self.raw(shares)?)?;
                StepOutcome::Paid {
                    amount: self.human(paid)?,
                }
            }
            Step::WithdrawAll { actor } => {
                let paid = vault.withdraw_all(self.who(actor)?)?;
                StepOutcome::Paid {
                    amount: self.human(paid)?,
                }
            }
            Step::Earn => {
                vault.earn()?;
                StepOutcome::Done
            }
            Step::Advance { secs } => {
                self.clock.advance(*secs);
                StepOutcome::Done
            }
            Step::Harvest { actor } => {
                let outcome = strategy.harvest(self.who(actor)?)?;
                StepOutcome::Harvested {
                    profit: self.human(outcome.profit)?,
                    fees: self.human(outcome.fees.paid())?,
                    net_profit: self.human(outcome.net_profit)?,
                    logged: outcome.logged,
                }
            }
            Step::Estimate => {
                let estimate = strategy.estimate_harvest()?;
                StepOutcome::Estimated {
                    profit: self.human(estimate.profit)?,
                    caller_fee: self.human(estimate.caller_fee)?,
                }
            }
            Step::Pause { actor } => {
                strategy.pause(self.who(actor)?)?;
                StepOutcome::Done
            }
            Step::Unpause { actor } => {
                strategy.unpause(self.who(actor)?)?;
                StepOutcome::Done
            }
            Step::Panic { actor } => {
                strategy.panic(self.who(actor)?)?;
                StepOutcome::Done
            }
            Step::Retire { actor } => {
                strategy.retire_strat(self.who(actor)?)?;
                StepOutcome::Done
            }
            Step::UpdateHarvestLogCadence { actor, secs } => {
                strategy.update_harvest_log_cadence(self.who(actor)?, *secs)?;
                StepOutcome::Done
            }
            Step::UpdateSecurityFee { actor, bps } => {
                strategy.update_security_fee(self.who(actor)?, *bps)?;
                StepOutcome::Done
            }
            Step::UpdateDepositFee { actor, bps } => {
                vault.update_deposit_fee(self.who(actor)?, *bps)?;
                StepOutcome::Done
            }
            Step::UpdateTvlCap { actor, cap } => {
                let caller = self.who(actor)?;
                match cap {
                    Some(cap) => vault.update_tvl_cap(caller, self.raw(cap)?)?,
                    None => vault.remove_tvl_cap(caller)?,
                }
                StepOutcome::Done
            }
            Step::GrantRole {
                actor,
                account,
                tier,
            } => {
                strategy.grant_role(self.who(actor)?, self.who(account)?, *tier)?;
                StepOutcome::Done
            }
            Step::RevokeRole { actor, account } => {
                strategy.revoke_role(self.who(actor)?, self.who(account)?)?;
                StepOutcome::Done
            }
            Step::VenueOnline { online } => {
                self.venue.set_online(*online);
                StepOutcome::Done
            }
        };
        Ok(outcome)
    }

    fn final_state(&self) -> SimResult<FinalState> {
        let ledger = self.strategy.harvest_log()?;
        let harvest_log = (0..ledger.len())
            .filter_map(|i| ledger.get(i).copied())
            .collect();

        let mut accounts = BTreeMap::new();
        for (name, account) in &self.scenario.accounts {
            accounts.insert(
                name.clone(),
                AccountState {
                    want: self.human(self.want.balance_of(&account.address)?)?,
                    shares: self.human(self.vault.balance_of(&account.address)?)?,
                },
            );
        }

        // An offline venue cannot report the pool.
        let vault_balance = match self.vault.balance() {
            Ok(balance) => Some(self.human(balance)?),
            Err(e) => {
                tracing::warn!(error = %e, "vault balance unavailable");
                None
            }
        };
        let price_per_full_share = match self.vault.get_price_per_full_share() {
            Ok(pps) => Some(format_units(pps, PRICE_DECIMALS)?),
            Err(e) => {
                tracing::warn!(error = %e, "price per share unavailable");
                None
            }
        };

        Ok(FinalState {
            timestamp: self.clock.now(),
            strategy_state: self.strategy.state()?,
            vault_balance,
            total_supply: self.human(self.vault.total_supply()?)?,
            price_per_full_share,
            average_apr_bps: self
                .strategy
                .average_apr_across_last_n_harvests(ledger.len())?,
            harvest_log,
            accounts,
        })
    }

    fn who(&self, name: &str) -> SimResult<Address> {
        self.scenario.address_of(name)
    }

    fn raw(&self, amount: &Decimal) -> SimResult<U256> {
        Ok(parse_units(amount, self.scenario.decimals)?)
    }

    fn human(&self, raw: U256) -> SimResult<Decimal> {
        Ok(format_units(raw, self.scenario.decimals)?)
    }
}

/// Deploy and run in one go.
pub fn run_scenario(scenario: Scenario) -> SimResult<Report> {
    Simulation::deploy(scenario)?.run()
}
