//! Role matrix: every (tier, operation) pair is allowed iff the caller's tier
//! is at least the operation's minimum.

mod common;

use alloy_primitives::Address;
use common::Fixture;
use crypt_runtime::access::required_tier;
use crypt_runtime::{CryptError, CryptResult, Operation, StrategyState, Tier};

// ── Helpers ──────────────────────────────────────────────────────────────────

const TIERS: [Tier; 5] = [
    Tier::Unassigned,
    Tier::Strategist,
    Tier::Guardian,
    Tier::Admin,
    Tier::SuperAdmin,
];

const OPERATIONS: [Operation; 10] = [
    Operation::UpdateHarvestLogCadence,
    Operation::Pause,
    Operation::Unpause,
    Operation::UpdateSecurityFee,
    Operation::Panic,
    Operation::RetireStrat,
    Operation::UpdateFees,
    Operation::UpdateStrategistFee,
    Operation::UpdateTreasury,
    Operation::UpdateStrategistRemitter,
];

fn caller_for(fx: &Fixture, tier: Tier) -> Address {
    let a = &fx.accounts;
    match tier {
        Tier::Unassigned => a.unassigned,
        Tier::Strategist => a.strategist,
        Tier::Guardian => a.guardian,
        Tier::Admin => a.admin,
        Tier::SuperAdmin => a.super_admin,
    }
}

/// Put the strategy in a state from which `operation` is a legal transition.
fn prepare(fx: &Fixture, operation: Operation) {
    if operation == Operation::Unpause {
        fx.strategy.pause(fx.accounts.owner).unwrap();
    }
}

fn invoke(fx: &Fixture, caller: Address, operation: Operation) -> CryptResult<()> {
    let s = &fx.strategy;
    match operation {
        Operation::UpdateHarvestLogCadence => s.update_harvest_log_cadence(caller, 10),
        Operation::Pause => s.pause(caller),
        Operation::Unpause => s.unpause(caller),
        Operation::UpdateSecurityFee => s.update_security_fee(caller, 0),
        Operation::Panic => s.panic(caller),
        Operation::RetireStrat => s.retire_strat(caller),
        Operation::UpdateFees => s.update_fees(caller, 400, 1_000, 9_000),
        Operation::UpdateStrategistFee => s.update_strategist_fee(caller, 3_000),
        Operation::UpdateTreasury => s.update_treasury(caller, Address::repeat_byte(0x70)),
        Operation::UpdateStrategistRemitter => {
            s.update_strategist_remitter(caller, Address::repeat_byte(0x71))
        }
        other => panic!("{other:?} not covered by the matrix"),
    }
}

// ── Matrix ───────────────────────────────────────────────────────────────────

#[test]
fn test_documented_minimum_tiers() {
    assert_eq!(required_tier(Operation::UpdateHarvestLogCadence), Tier::Strategist);
    assert_eq!(required_tier(Operation::Pause), Tier::Guardian);
    assert_eq!(required_tier(Operation::Unpause), Tier::Admin);
    assert_eq!(required_tier(Operation::UpdateSecurityFee), Tier::SuperAdmin);
    assert_eq!(required_tier(Operation::Harvest), Tier::Unassigned);
    assert_eq!(required_tier(Operation::RetireStrat), Tier::Strategist);
    assert_eq!(required_tier(Operation::Panic), Tier::Guardian);
    assert_eq!(required_tier(Operation::GrantRole), Tier::SuperAdmin);
}

#[test]
fn test_exhaustive_role_matrix() {
    for operation in OPERATIONS {
        for tier in TIERS {
            let fx = Fixture::new();
            prepare(&fx, operation);
            let caller = caller_for(&fx, tier);
            assert_eq!(fx.strategy.tier_of(&caller).unwrap(), tier);

            let result = invoke(&fx, caller, operation);
            let required = required_tier(operation);
            if tier >= required {
                assert!(result.is_ok(), "{tier:?} should be allowed {operation:?}: {result:?}");
            } else {
                let err = result.unwrap_err();
                assert_eq!(err.reason(), "unauthorized access");
                assert_eq!(
                    err,
                    CryptError::Unauthorized {
                        operation,
                        required,
                        actual: tier,
                    }
                );
            }
        }
    }
}

#[test]
fn test_denied_call_changes_nothing() {
    let fx = Fixture::new();
    let before = fx.strategy.config().unwrap();
    assert!(fx.strategy.update_security_fee(fx.accounts.admin, 0).is_err());
    assert!(fx.strategy.pause(fx.accounts.strategist).is_err());
    assert_eq!(fx.strategy.config().unwrap(), before);
    assert_eq!(fx.strategy.state().unwrap(), StrategyState::Active);
}

#[test]
fn test_deployer_is_super_admin() {
    let fx = Fixture::new();
    assert_eq!(fx.strategy.tier_of(&fx.accounts.owner).unwrap(), Tier::SuperAdmin);
    fx.strategy.update_security_fee(fx.accounts.owner, 0).unwrap();
    assert_eq!(fx.strategy.config().unwrap().security_fee_bps, 0);
}

#[test]
fn test_anyone_may_harvest() {
    let fx = Fixture::new();
    fx.vault
        .deposit(fx.accounts.want_holder, common::units("10"))
        .unwrap();
    fx.clock.advance(3_600);
    assert!(fx.strategy.harvest(fx.accounts.unassigned).is_ok());
}

#[test]
fn test_grant_and_revoke_change_privileges() {
    let fx = Fixture::new();
    let newcomer = fx.accounts.unassigned;

    let err = fx
        .strategy
        .grant_role(fx.accounts.admin, newcomer, Tier::Admin)
        .unwrap_err();
    assert_eq!(err.reason(), "unauthorized access");

    fx.strategy
        .grant_role(fx.accounts.super_admin, newcomer, Tier::Guardian)
        .unwrap();
    fx.strategy.pause(newcomer).unwrap();
    assert!(fx.strategy.unpause(newcomer).is_err());

    fx.strategy
        .revoke_role(fx.accounts.super_admin, fx.accounts.guardian)
        .unwrap();
    assert_eq!(
        fx.strategy.tier_of(&fx.accounts.guardian).unwrap(),
        Tier::Unassigned
    );
    assert_eq!(
        fx.strategy.panic(fx.accounts.guardian).unwrap_err().reason(),
        "unauthorized access"
    );
}
