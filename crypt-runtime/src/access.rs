//! Tiered access control for strategy administration.
//!
//! Every address has exactly one effective [`Tier`]; absence means
//! [`Tier::Unassigned`]. Operations declare a minimum tier in a single table
//! and a caller is authorized when its tier is at least that minimum:
//!
//! | Operation                    | Minimum tier |
//! |------------------------------|--------------|
//! | harvest                      | Unassigned   |
//! | updateHarvestLogCadence      | Strategist   |
//! | retireStrat                  | Strategist   |
//! | pause                        | Guardian     |
//! | panic                        | Guardian     |
//! | unpause                      | Admin        |
//! | updateSecurityFee            | SuperAdmin   |
//! | updateFees / strategist fee  | SuperAdmin   |
//! | updateTreasury / remitter    | SuperAdmin   |
//! | grantRole / revokeRole       | SuperAdmin   |

use std::collections::HashMap;

use alloy_primitives::Address;

use crate::error::{CryptError, CryptResult};
use crate::types::{MultisigRoles, Operation, Tier};

/// Minimum tier required to invoke `operation`.
pub fn required_tier(operation: Operation) -> Tier {
    match operation {
        Operation::Harvest => Tier::Unassigned,
        Operation::UpdateHarvestLogCadence | Operation::RetireStrat => Tier::Strategist,
        Operation::Pause | Operation::Panic => Tier::Guardian,
        Operation::Unpause => Tier::Admin,
        Operation::UpdateSecurityFee
        | Operation::UpdateFees
        | Operation::UpdateStrategistFee
        | Operation::UpdateTreasury
        | Operation::UpdateStrategistRemitter
        | Operation::GrantRole
        | Operation::RevokeRole => Tier::SuperAdmin,
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccessControlRegistry {
    tiers: HashMap<Address, Tier>,
}

impl AccessControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry as seeded at strategy construction. The deployer becomes a
    /// super admin alongside the multisig holders.
    pub fn bootstrap(deployer: Address, strategists: &[Address], multisig: MultisigRoles) -> Self {
        let mut registry = Self::new();
        for strategist in strategists {
            registry.assign(*strategist, Tier::Strategist);
        }
        registry.assign(multisig.guardian, Tier::Guardian);
        registry.assign(multisig.admin, Tier::Admin);
        registry.assign(multisig.super_admin, Tier::SuperAdmin);
        registry.assign(deployer, Tier::SuperAdmin);
        registry
    }

    pub fn tier_of(&self, account: &Address) -> Tier {
        self.tiers.get(account).copied().unwrap_or_default()
    }

    /// Fails with `Unauthorized` unless `caller` meets the operation's minimum tier.
    pub fn authorize(&self, caller: &Address, operation: Operation) -> CryptResult<()> {
        let required = required_tier(operation);
        let actual = self.tier_of(caller);
        if actual >= required {
            Ok(())
        } else {
            tracing::debug!(%caller, ?operation, ?required, ?actual, "access denied");
            Err(CryptError::Unauthorized {
                operation,
                required,
                actual,
            })
        }
    }

    /// Role list semantics: an address keeps the highest tier it was ever given.
    fn assign(&mut self, account: Address, tier: Tier) {
        let entry = self.tiers.entry(account).or_default();
        if tier > *entry {
            *entry = tier;
        }
    }

    /// Sets `account` to exactly `tier`, replacing any previous assignment.
    pub fn grant(&mut self, caller: &Address, account: Address, tier: Tier) -> CryptResult<()> {
        self.authorize(caller, Operation::GrantRole)?;
        if tier == Tier::Unassigned {
            self.tiers.remove(&account);
        } else {
            self.tiers.insert(account, tier);
        }
        tracing::info!(%caller, %account, ?tier, "role granted");
        Ok(())
    }

    pub fn revoke(&mut self, caller: &Address, account: Address) -> CryptResult<()> {
        self.authorize(caller, Operation::RevokeRole)?;
        self.tiers.remove(&account);
        tracing::info!(%caller, %account, "role revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn registry() -> AccessControlRegistry {
        AccessControlRegistry::bootstrap(
            addr(0xd0),
            &[addr(0x01)],
            MultisigRoles {
                super_admin: addr(0x04),
                admin: addr(0x03),
                guardian: addr(0x02),
            },
        )
    }

    #[test]
    fn test_bootstrap_tiers() {
        let registry = registry();
        assert_eq!(registry.tier_of(&addr(0x01)), Tier::Strategist);
        assert_eq!(registry.tier_of(&addr(0x02)), Tier::Guardian);
        assert_eq!(registry.tier_of(&addr(0x03)), Tier::Admin);
        assert_eq!(registry.tier_of(&addr(0x04)), Tier::SuperAdmin);
        assert_eq!(registry.tier_of(&addr(0xd0)), Tier::SuperAdmin);
        assert_eq!(registry.tier_of(&addr(0xee)), Tier::Unassigned);
    }

    #[test]
    fn test_highest_tier_wins_on_overlap() {
        let registry = AccessControlRegistry::bootstrap(
            addr(0xd0),
            &[addr(0x02)],
            MultisigRoles {
                super_admin: addr(0x04),
                admin: addr(0x03),
                guardian: addr(0x02),
            },
        );
        assert_eq!(registry.tier_of(&addr(0x02)), Tier::Guardian);
    }

    #[test]
    fn test_denial_carries_required_and_actual() {
        let err = registry().authorize(&addr(0x02), Operation::Unpause).unwrap_err();
        assert_eq!(
            err,
            CryptError::Unauthorized {
                operation: Operation::Unpause,
                required: Tier::Admin,
                actual: Tier::Guardian,
            }
        );
    }

    #[test]
    fn test_grant_and_revoke_require_super_admin() {
        let mut registry = registry();
        assert!(registry.grant(&addr(0x03), addr(0x09), Tier::Guardian).is_err());

        registry.grant(&addr(0x04), addr(0x09), Tier::Guardian).unwrap();
        assert_eq!(registry.tier_of(&addr(0x09)), Tier::Guardian);

        // grant replaces, it does not only raise
        registry.grant(&addr(0x04), addr(0x09), Tier::Strategist).unwrap();
        assert_eq!(registry.tier_of(&addr(0x09)), Tier::Strategist);

        assert!(registry.revoke(&addr(0x02), addr(0x09)).is_err());
        registry.revoke(&addr(0x04), addr(0x09)).unwrap();
        assert_eq!(registry.tier_of(&addr(0x09)), Tier::Unassigned);
    }
}
