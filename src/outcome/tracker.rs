//! Post-battle bookkeeping before anything touches the campaign
//!
//! The tracker holds the engine's reports next to the pre-battle roster and
//! derives what does not line up: units nobody brought back, pilots nobody
//! reported and pilots reported dead. The operator can override each of those
//! before the outcome is committed. Everything here is recomputed from the
//! stored collections on demand; the campaign is never modified.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::records::{KillRecord, OutcomeReport, PilotOutcome, SalvageCandidate, SalvageClaim};
use super::roster::{PreBattleRoster, RosterEntry, RosterPilot};
use super::salvage::{SalvageBooking, SalvageLedger};
use crate::core::error::{Result, SortieError};
use crate::core::types::{ExternalId, Money};
use crate::engine::EngineEntity;
use crate::session::identity::{contains, matches, position_of, HasExternalId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcomeTracker {
    roster: PreBattleRoster,
    ledger: SalvageLedger,
    recovered: Vec<EngineEntity>,
    salvage: Vec<SalvageCandidate>,
    pilots: Vec<PilotOutcome>,
    kills: Vec<KillRecord>,
    /// Missing units the operator marked as recovered
    resolved_units: Vec<ExternalId>,
    /// Missing pilots the operator marked as recovered
    resolved_pilots: Vec<ExternalId>,
    /// Casualties the operator restored to duty
    cleared_casualties: Vec<ExternalId>,
    /// Salvage indices claimed for the unit, oldest claim first
    #[serde(default)]
    unit_claims: Vec<usize>,
}

/// Keep the first record of each identity; records without one are kept
fn dedupe<T: HasExternalId>(items: Vec<T>) -> Vec<T> {
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if item.external_id().is_none() || !contains(&kept, &item) {
            kept.push(item);
        }
    }
    kept
}

/// One record per pilot; repeated reports of the same pilot are merged
fn merge_pilots(pilots: Vec<PilotOutcome>) -> Vec<PilotOutcome> {
    let mut merged: Vec<PilotOutcome> = Vec::with_capacity(pilots.len());
    for pilot in pilots {
        match position_of(&merged, &pilot) {
            Some(i) => {
                debug!(pilot = %pilot.name, "repeated pilot record merged");
                merged[i].absorb(&pilot);
            }
            None => merged.push(pilot),
        }
    }
    merged
}

impl ScenarioOutcomeTracker {
    pub fn new(roster: PreBattleRoster, ledger: SalvageLedger) -> Self {
        Self {
            roster,
            ledger,
            recovered: Vec::new(),
            salvage: Vec::new(),
            pilots: Vec::new(),
            kills: Vec::new(),
            resolved_units: Vec::new(),
            resolved_pilots: Vec::new(),
            cleared_casualties: Vec::new(),
            unit_claims: Vec::new(),
        }
    }

    /// Store the engine's reports, replacing any earlier ones
    ///
    /// An entity reported both as recovered and as salvage is recovered.
    /// Repeated reports of one pilot are merged, a death in any of them
    /// standing. Operator overrides made against earlier reports are
    /// discarded; unit claims already on the salvage records are kept in
    /// record order, except on the roster's own units.
    pub fn ingest(
        &mut self,
        recovered: Vec<EngineEntity>,
        salvage: Vec<SalvageCandidate>,
        pilots: Vec<PilotOutcome>,
    ) {
        let recovered = dedupe(recovered);
        let before = salvage.len();
        let salvage: Vec<SalvageCandidate> = dedupe(salvage)
            .into_iter()
            .filter(|candidate| !contains(&recovered, candidate))
            .collect();
        if salvage.len() != before {
            debug!(dropped = before - salvage.len(), "salvage records already recovered");
        }

        info!(
            scenario = %self.roster.scenario,
            recovered = recovered.len(),
            salvage = salvage.len(),
            pilots = pilots.len(),
            "outcome ingested"
        );

        self.unit_claims = salvage
            .iter()
            .enumerate()
            .filter(|(_, c)| c.claim == SalvageClaim::Unit && !contains(&self.roster.units, *c))
            .map(|(i, _)| i)
            .collect();
        self.recovered = recovered;
        self.salvage = salvage;
        self.pilots = merge_pilots(pilots);
        self.resolved_units.clear();
        self.resolved_pilots.clear();
        self.cleared_casualties.clear();
    }

    pub fn ingest_report(&mut self, report: &OutcomeReport) {
        self.ingest(
            report.recovered.clone(),
            report.salvage.clone(),
            report.pilots.clone(),
        );
        self.kills = report.kills.clone();
    }

    pub fn set_kills(&mut self, kills: Vec<KillRecord>) {
        self.kills = kills;
    }

    // === DISCREPANCIES ===

    /// Roster units matched by neither a recovered nor a salvage record
    pub fn compute_missing_units(&self) -> Vec<&RosterEntry> {
        self.roster
            .units
            .iter()
            .filter(|unit| {
                !contains(&self.recovered, *unit)
                    && !contains(&self.salvage, *unit)
                    && !contains(&self.resolved_units, *unit)
            })
            .collect()
    }

    /// Roster pilots with no surviving-pilot record
    pub fn compute_missing_pilots(&self) -> Vec<&RosterPilot> {
        self.roster
            .pilots
            .iter()
            .filter(|pilot| {
                !contains(&self.pilots, *pilot) && !contains(&self.resolved_pilots, *pilot)
            })
            .collect()
    }

    /// Pilot records carrying the death flag
    pub fn compute_casualties(&self) -> Vec<&PilotOutcome> {
        self.pilots
            .iter()
            .filter(|pilot| pilot.is_dead() && !self.is_cleared(pilot))
            .collect()
    }

    fn is_cleared(&self, pilot: &PilotOutcome) -> bool {
        contains(&self.cleared_casualties, pilot)
    }

    // === OPERATOR OVERRIDES ===

    /// Treat the `index`th missing unit as recovered
    pub fn resolve_missing_unit(&mut self, index: usize) -> Result<ExternalId> {
        let external_id = self
            .compute_missing_units()
            .get(index)
            .map(|unit| unit.external_id.clone())
            .ok_or(SortieError::NoSuchDiscrepancy {
                kind: "missing unit",
                index,
            })?;
        info!(unit = %external_id, "missing unit resolved as recovered");
        self.resolved_units.push(external_id.clone());
        Ok(external_id)
    }

    /// Treat the `index`th missing pilot as recovered
    pub fn resolve_missing_pilot(&mut self, index: usize) -> Result<ExternalId> {
        let external_id = self
            .compute_missing_pilots()
            .get(index)
            .map(|pilot| pilot.external_id.clone())
            .ok_or(SortieError::NoSuchDiscrepancy {
                kind: "missing pilot",
                index,
            })?;
        info!(pilot = %external_id, "missing pilot resolved as recovered");
        self.resolved_pilots.push(external_id.clone());
        Ok(external_id)
    }

    /// Restore the `index`th casualty to active duty
    pub fn clear_casualty(&mut self, index: usize) -> Result<ExternalId> {
        let external_id = self
            .compute_casualties()
            .get(index)
            .and_then(|pilot| pilot.external_id.clone())
            .ok_or(SortieError::NoSuchDiscrepancy {
                kind: "casualty",
                index,
            })?;
        info!(pilot = %external_id, "casualty cleared");
        self.cleared_casualties.push(external_id.clone());
        Ok(external_id)
    }

    /// Decide who keeps the `index`th salvage candidate
    ///
    /// Refused when booking the battle's claims with this one would push a
    /// unit claim past the contract cap, and for the roster's own units,
    /// which are lost rather than taken in.
    pub fn claim_salvage(&mut self, index: usize, claim: SalvageClaim) -> Result<()> {
        let candidate = self.salvage.get(index).ok_or(SortieError::NoSuchDiscrepancy {
            kind: "salvage candidate",
            index,
        })?;
        if claim != SalvageClaim::Unclaimed && self.is_own_unit(candidate) {
            return Err(SortieError::OwnUnitSalvage(candidate.label()));
        }

        let previous = (candidate.claim, self.unit_claims.clone());
        self.set_claim(index, claim);

        let booking = self.book_claims();
        if let Some(&(refused, pct)) = booking.demoted.first() {
            let external_id = self.salvage[refused].label();
            self.salvage[index].claim = previous.0;
            self.unit_claims = previous.1;
            return Err(SortieError::SalvageCap {
                external_id,
                pct,
                cap: booking.ledger.cap_pct,
            });
        }

        debug!(candidate = %self.salvage[index].label(), ?claim, "salvage claimed");
        Ok(())
    }

    fn set_claim(&mut self, index: usize, claim: SalvageClaim) {
        self.salvage[index].claim = claim;
        if claim == SalvageClaim::Unit {
            if !self.unit_claims.contains(&index) {
                self.unit_claims.push(index);
            }
        } else {
            self.unit_claims.retain(|i| *i != index);
        }
    }

    fn is_own_unit(&self, candidate: &SalvageCandidate) -> bool {
        contains(&self.roster.units, candidate)
    }

    /// The battle's claims booked against the contract: employer pieces
    /// first, then unit claims oldest first; the roster's own units are
    /// never booked
    pub fn book_claims(&self) -> SalvageBooking {
        let employer: Vec<Money> = self
            .salvage
            .iter()
            .filter(|c| c.claim == SalvageClaim::Employer && !self.is_own_unit(c))
            .map(SalvageCandidate::value)
            .collect();
        // Unit claims with no recorded order (older saved trackers) go last
        let unordered = (0..self.salvage.len()).filter(|i| !self.unit_claims.contains(i));
        let unit: Vec<(usize, Money)> = self
            .unit_claims
            .iter()
            .copied()
            .chain(unordered)
            .filter_map(|i| self.salvage.get(i).map(|c| (i, c)))
            .filter(|(_, c)| c.claim == SalvageClaim::Unit && !self.is_own_unit(c))
            .map(|(i, c)| (i, c.value()))
            .collect();
        self.ledger.book(&employer, &unit)
    }

    /// Contract totals plus every claim made so far in this battle
    pub fn salvage_ledger(&self) -> SalvageLedger {
        self.book_claims().ledger
    }

    // === ACCESSORS ===

    pub fn roster(&self) -> &PreBattleRoster {
        &self.roster
    }

    pub fn base_ledger(&self) -> SalvageLedger {
        self.ledger
    }

    pub fn recovered(&self) -> &[EngineEntity] {
        &self.recovered
    }

    pub fn salvage(&self) -> &[SalvageCandidate] {
        &self.salvage
    }

    pub fn pilots(&self) -> &[PilotOutcome] {
        &self.pilots
    }

    pub fn kills(&self) -> &[KillRecord] {
        &self.kills
    }

    pub fn recovered_entity(&self, unit: &RosterEntry) -> Option<&EngineEntity> {
        self.recovered.iter().find(|e| matches(*e, unit))
    }

    pub fn pilot_outcome(&self, pilot: &RosterPilot) -> Option<&PilotOutcome> {
        self.pilots.iter().find(|p| matches(*p, pilot))
    }

    pub fn is_salvaged(&self, unit: &RosterEntry) -> bool {
        contains(&self.salvage, unit)
    }

    pub fn is_unit_resolved(&self, unit: &RosterEntry) -> bool {
        contains(&self.resolved_units, unit)
    }

    pub fn is_pilot_resolved(&self, pilot: &RosterPilot) -> bool {
        contains(&self.resolved_pilots, pilot)
    }

    pub fn is_casualty_cleared(&self, pilot: &PilotOutcome) -> bool {
        self.is_cleared(pilot)
    }
}
