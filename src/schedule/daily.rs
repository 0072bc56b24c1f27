use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::debug;

use super::availability::Availability;
use super::guard;
use super::ledger::WorkloadLedger;
use super::types::{DailyAssignment, LabSlot, Roster, ShiftType};

/// Who can work each shift of one day, with their overlap
type ShiftAvailability<'a> = [BTreeMap<&'a str, Availability>; 3];

/// Multi-shift tiers in the order they are served
const TIERS: [&[ShiftType]; 4] = [
    &[ShiftType::Morning, ShiftType::Afternoon1, ShiftType::Afternoon2],
    &[ShiftType::Morning, ShiftType::Afternoon1],
    &[ShiftType::Morning, ShiftType::Afternoon2],
    &[ShiftType::Afternoon1, ShiftType::Afternoon2],
];

/// Fills the nine slots of a day, favouring staff who can hold one lab for
/// several shifts.
pub struct DailyAssignmentEngine<'a> {
    roster: &'a Roster,
}

impl<'a> DailyAssignmentEngine<'a> {
    pub fn new(roster: &'a Roster) -> Self {
        Self { roster }
    }

    /// Builds the assignment for `date`, crediting every placement to `ledger`
    pub fn assign_day(&self, date: NaiveDate, ledger: &mut WorkloadLedger) -> DailyAssignment {
        let mut day = DailyAssignment::new(date);
        let available = self.available_by_shift(date);
        let mut assigned: BTreeSet<&str> = BTreeSet::new();

        for shifts in TIERS {
            let members = tier_members(&available, shifts, &assigned);
            for name in by_workload(members, ledger) {
                // same lab for every shift of the tier, or the tier is done
                let Some(lab) = LabSlot::ALL
                    .into_iter()
                    .find(|lab| shifts.iter().all(|shift| day.is_free(*shift, *lab)))
                else {
                    break;
                };
                for shift in shifts {
                    day.assign(*shift, lab, name);
                    ledger.credit(name, available[shift.index()][name].credited_minutes(*shift));
                }
                assigned.insert(name);
                debug!(%date, staff = name, lab = %lab, shifts = shifts.len(), "tier placement");
            }
        }

        for shift in ShiftType::ALL {
            let candidates: Vec<&str> = available[shift.index()]
                .keys()
                .copied()
                .filter(|name| !assigned.contains(name))
                .collect();

            for name in by_workload(candidates, ledger) {
                if day.free_labs(shift).next().is_none() {
                    break;
                }
                let Some(lab) = guard::choose_lab(&day, shift, name) else {
                    continue;
                };
                day.assign(shift, lab, name);
                ledger.credit(name, available[shift.index()][name].credited_minutes(shift));
                debug!(%date, staff = name, shift = %shift, lab = %lab, "single-shift placement");
            }
        }

        debug!(%date, filled = day.filled_count(), "day assigned");
        day
    }

    fn available_by_shift(&self, date: NaiveDate) -> ShiftAvailability<'a> {
        let mut available: ShiftAvailability<'a> = Default::default();
        for staff in self.roster.iter() {
            for shift in ShiftType::ALL {
                let availability = staff.availability(date, shift);
                if availability.can_work {
                    available[shift.index()].insert(staff.name.as_str(), availability);
                }
            }
        }
        available
    }
}

/// Staff available for every shift in `shifts` and not yet placed today
fn tier_members<'a>(
    available: &ShiftAvailability<'a>,
    shifts: &[ShiftType],
    assigned: &BTreeSet<&str>,
) -> Vec<&'a str> {
    let Some((first, rest)) = shifts.split_first() else {
        return Vec::new();
    };
    available[first.index()]
        .keys()
        .copied()
        .filter(|name| rest.iter().all(|shift| available[shift.index()].contains_key(name)))
        .filter(|name| !assigned.contains(name))
        .collect()
}

/// Orders names by credited hours so far, then by name
fn by_workload<'a>(mut names: Vec<&'a str>, ledger: &WorkloadLedger) -> Vec<&'a str> {
    names.sort_by(|a, b| ledger.minutes(a).cmp(&ledger.minutes(b)).then_with(|| a.cmp(b)));
    names
}
