//! Placement rules shared by the daily engine and the balancer.
//!
//! A staff member may hold at most one lab per shift, and once they hold a
//! lab somewhere in the day that lab is where they belong in the other
//! shifts too, as long as it is free there.

use tracing::debug;

use super::ledger::{Adjustment, WorkloadLedger};
use super::types::{minutes_to_hours, DailyAssignment, LabSlot, Reassignment, Roster, ShiftType};

/// Slack for comparing variances computed in floating point
pub(crate) const VARIANCE_EPSILON: f64 = 1e-9;

/// True when `name` already holds a lab other than `lab` in `shift`
pub fn is_double_booked(day: &DailyAssignment, shift: ShiftType, lab: LabSlot, name: &str) -> bool {
    day.lab_of(shift, name).is_some_and(|held| held != lab)
}

/// A lab `name` holds in another shift of the day that is still free in `shift`
pub fn preferred_lab(day: &DailyAssignment, shift: ShiftType, name: &str) -> Option<LabSlot> {
    shift
        .others()
        .filter_map(|other| day.lab_of(other, name))
        .find(|lab| day.is_free(shift, *lab))
}

/// Whether `name` may take `lab` in `shift`
pub fn permits(day: &DailyAssignment, shift: ShiftType, lab: LabSlot, name: &str) -> bool {
    if is_double_booked(day, shift, lab, name) {
        return false;
    }
    match preferred_lab(day, shift, name) {
        Some(preferred) => preferred == lab,
        None => true,
    }
}

/// Picks the lab `name` should take in `shift`: their continuity lab when it
/// is free, otherwise the first free lab. `None` if they already work the
/// shift or nothing is free.
pub fn choose_lab(day: &DailyAssignment, shift: ShiftType, name: &str) -> Option<LabSlot> {
    if day.lab_of(shift, name).is_some() {
        return None;
    }
    preferred_lab(day, shift, name).or_else(|| day.free_labs(shift).next())
}

/// After `new` replaced `previous` in (`shift`, `lab`), hand over the same lab
/// in every other shift where `previous` still holds it, provided `new` can
/// work that shift and the move doesn't widen the hour variance.
pub fn propagate_continuity(
    day: &mut DailyAssignment,
    shift: ShiftType,
    lab: LabSlot,
    previous: &str,
    new: &str,
    roster: &Roster,
    ledger: &mut WorkloadLedger,
) -> Vec<Reassignment> {
    let mut moves = Vec::new();
    let Some(new_staff) = roster.get(new) else {
        return moves;
    };

    for other in shift.others() {
        if day.occupant(other, lab) != Some(previous) {
            continue;
        }
        let availability = new_staff.availability(day.date, other);
        if !availability.can_work || !permits(day, other, lab, new) {
            continue;
        }

        let released = roster
            .get(previous)
            .map(|staff| staff.availability(day.date, other).credited_minutes(other))
            .unwrap_or(0);
        let credited = availability.credited_minutes(other);
        let adjustments = [
            Adjustment { name: previous, delta_minutes: -i64::from(released) },
            Adjustment { name: new, delta_minutes: i64::from(credited) },
        ];
        if ledger.variance_after(&adjustments) > ledger.variance() + VARIANCE_EPSILON {
            debug!(
                date = %day.date,
                shift = %other,
                lab = %lab,
                "continuity hand-over would widen variance, skipped"
            );
            continue;
        }

        ledger.apply(&adjustments);
        day.assign(other, lab, new);
        moves.push(Reassignment {
            date: day.date,
            shift: other,
            lab,
            from: previous.to_string(),
            to: new.to_string(),
            hours: minutes_to_hours(credited),
            propagated: true,
        });
    }

    moves
}
