//! Salvage split between the unit and its employer
//!
//! A contract caps the unit's share of salvage value. The share is
//! `100 * unit / (unit + employer)`, floored to a whole percent. The unit may
//! keep another piece only while its share is below the cap; once a claim
//! takes it to or past the cap, further salvage goes to the employer.
//!
//! A battle's claims are booked with [`SalvageLedger::book`]: employer pieces
//! first, then unit claims in the order the operator made them. The tracker
//! refuses any claim that would make this booking demote something, and the
//! reconciliation plan books the same way, so the two never disagree.

use serde::{Deserialize, Serialize};

use crate::campaign::Contract;
use crate::core::types::Money;

/// Result of booking one battle's claims
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalvageBooking {
    /// Ledger after every claim, demoted ones counted for the employer
    pub ledger: SalvageLedger,
    /// Unit claims the cap refused, with the unit's share at that point
    pub demoted: Vec<(usize, u32)>,
}

impl SalvageBooking {
    pub fn is_demoted(&self, index: usize) -> bool {
        self.demoted.iter().any(|(i, _)| *i == index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalvageLedger {
    pub cap_pct: u32,
    pub unit_share: Money,
    pub employer_share: Money,
}

impl SalvageLedger {
    pub fn new(cap_pct: u32, unit_share: Money, employer_share: Money) -> Self {
        Self {
            cap_pct,
            unit_share,
            employer_share,
        }
    }

    /// Running totals of a contract
    pub fn for_contract(contract: &Contract) -> Self {
        Self::new(
            contract.salvage_pct,
            contract.salvaged_by_unit,
            contract.salvaged_by_employer,
        )
    }

    /// No employer to share with: everything may be kept
    pub fn unlimited() -> Self {
        Self::new(100, 0, 0)
    }

    pub fn current_pct(&self) -> u32 {
        Self::pct(self.unit_share, self.employer_share)
    }

    /// Share the unit would hold after adding `unit_value` and `employer_value`
    pub fn pct_with(&self, unit_value: Money, employer_value: Money) -> u32 {
        Self::pct(self.unit_share + unit_value, self.employer_share + employer_value)
    }

    fn pct(unit: Money, employer: Money) -> u32 {
        let total = unit + employer;
        if total <= 0 || unit <= 0 {
            return 0;
        }
        ((100 * unit as i128) / total as i128) as u32
    }

    pub fn can_claim(&self) -> bool {
        self.cap_pct >= 100 || self.current_pct() < self.cap_pct
    }

    /// Take `value` for the unit if the cap allows it
    pub fn claim_for_unit(&mut self, value: Money) -> bool {
        if !self.can_claim() {
            return false;
        }
        self.unit_share += value.max(0);
        true
    }

    pub fn claim_for_employer(&mut self, value: Money) {
        self.employer_share += value.max(0);
    }

    /// Book employer values, then `(index, value)` unit claims in order
    pub fn book(&self, employer: &[Money], unit_claims: &[(usize, Money)]) -> SalvageBooking {
        let mut ledger = *self;
        for value in employer {
            ledger.claim_for_employer(*value);
        }

        let mut demoted = Vec::new();
        for &(index, value) in unit_claims {
            let pct = ledger.current_pct();
            if !ledger.claim_for_unit(value) {
                demoted.push((index, pct));
                ledger.claim_for_employer(value);
            }
        }

        SalvageBooking { ledger, demoted }
    }
}
