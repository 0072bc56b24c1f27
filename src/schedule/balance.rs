use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info};

use super::guard::{self, VARIANCE_EPSILON};
use super::ledger::{Adjustment, WorkloadLedger};
use super::types::{minutes_to_hours, DailyAssignment, LabSlot, Reassignment, Roster, ShiftType};
use crate::config::BalanceConfig;

/// Why balancing ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Nobody has credited hours
    EmptyLedger,
    /// max - min hours already within the spread tolerance
    WithinTolerance,
    /// No overloaded/underloaded pair left
    Balanced,
    /// A round improved the variance by less than the minimum
    Stagnated,
    RoundLimit,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub round: usize,
    pub variance_before: f64,
    pub variance_after: f64,
    pub moves: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceReport {
    pub rounds: Vec<RoundSummary>,
    pub moves: Vec<Reassignment>,
    pub stop_reason: StopReason,
}

/// Staff far from the mean at the start of a round
struct Classification {
    mean: f64,
    overloaded: BTreeSet<String>,
    underloaded: BTreeSet<String>,
}

/// Moves slots from overloaded to underloaded staff until the hours even out
/// or the round budget runs out.
pub struct WorkloadBalancer<'a> {
    roster: &'a Roster,
    config: &'a BalanceConfig,
}

impl<'a> WorkloadBalancer<'a> {
    pub fn new(roster: &'a Roster, config: &'a BalanceConfig) -> Self {
        Self { roster, config }
    }

    /// Refines `days` in place. Every accepted move keeps or lowers the
    /// ledger variance, so no round can end worse than it started.
    pub fn balance(
        &self,
        days: &mut [DailyAssignment],
        ledger: &mut WorkloadLedger,
    ) -> BalanceReport {
        let mut rounds = Vec::new();
        let mut moves = Vec::new();

        let stop_reason = 'rounds: {
            for round in 1..=self.config.max_rounds {
                if ledger.is_empty() {
                    break 'rounds StopReason::EmptyLedger;
                }
                if ledger.spread() <= self.config.spread_tolerance_hours {
                    break 'rounds StopReason::WithinTolerance;
                }

                let mut classes = self.classify(ledger);
                if classes.overloaded.is_empty() || classes.underloaded.is_empty() {
                    break 'rounds StopReason::Balanced;
                }

                let variance_before = ledger.variance();
                let round_moves = self.run_round(days, ledger, &mut classes);
                let variance_after = ledger.variance();

                debug!(
                    round,
                    variance_before,
                    variance_after,
                    moves = round_moves.len(),
                    "balancing round finished"
                );
                rounds.push(RoundSummary {
                    round,
                    variance_before,
                    variance_after,
                    moves: round_moves.len(),
                });
                moves.extend(round_moves);

                if rounds.last().is_some_and(|r| r.moves == 0)
                    || variance_before - variance_after < self.config.min_variance_improvement
                {
                    break 'rounds StopReason::Stagnated;
                }
            }
            StopReason::RoundLimit
        };

        info!(
            rounds = rounds.len(),
            moves = moves.len(),
            variance = ledger.variance(),
            ?stop_reason,
            "workload balancing done"
        );
        BalanceReport {
            rounds,
            moves,
            stop_reason,
        }
    }

    fn classify(&self, ledger: &WorkloadLedger) -> Classification {
        let mean = ledger.mean_hours();
        let mut classes = Classification {
            mean,
            overloaded: BTreeSet::new(),
            underloaded: BTreeSet::new(),
        };
        for (name, hours) in ledger.iter() {
            if hours > mean + self.config.overload_threshold_hours {
                classes.overloaded.insert(name.to_string());
            } else if hours < mean - self.config.underload_threshold_hours {
                classes.underloaded.insert(name.to_string());
            }
        }
        classes
    }

    /// Places `names` in whichever class their hours now put them, against
    /// the mean the round started with
    fn reclassify(&self, ledger: &WorkloadLedger, classes: &mut Classification, names: &[&str]) {
        for name in names {
            let hours = ledger.hours(name);
            classes.overloaded.remove(*name);
            classes.underloaded.remove(*name);
            if hours > classes.mean + self.config.overload_threshold_hours {
                classes.overloaded.insert(name.to_string());
            } else if hours < classes.mean - self.config.underload_threshold_hours {
                classes.underloaded.insert(name.to_string());
            }
        }
    }

    fn run_round(
        &self,
        days: &mut [DailyAssignment],
        ledger: &mut WorkloadLedger,
        classes: &mut Classification,
    ) -> Vec<Reassignment> {
        let mut moves = Vec::new();

        for day in days.iter_mut() {
            for shift in ShiftType::ALL {
                for lab in LabSlot::ALL {
                    if classes.overloaded.is_empty() || classes.underloaded.is_empty() {
                        return moves;
                    }
                    let Some(occupant) = day.occupant(shift, lab).map(str::to_string) else {
                        continue;
                    };
                    if !classes.overloaded.contains(&occupant) {
                        continue;
                    }

                    let swapped = self.swap_slot(day, shift, lab, &occupant, classes, ledger);
                    let Some(replacement) = swapped else {
                        continue;
                    };
                    let to = replacement.to.clone();
                    moves.push(replacement);
                    moves.extend(guard::propagate_continuity(
                        day,
                        shift,
                        lab,
                        &occupant,
                        &to,
                        self.roster,
                        ledger,
                    ));
                    self.reclassify(ledger, classes, &[occupant.as_str(), to.as_str()]);
                }
            }
        }

        moves
    }

    /// Hands (`shift`, `lab`) to the least-loaded underloaded staff who covers
    /// the whole shift and fits the day's placement rules
    fn swap_slot(
        &self,
        day: &mut DailyAssignment,
        shift: ShiftType,
        lab: LabSlot,
        occupant: &str,
        classes: &Classification,
        ledger: &mut WorkloadLedger,
    ) -> Option<Reassignment> {
        let mut candidates: Vec<&str> = classes.underloaded.iter().map(String::as_str).collect();
        candidates.sort_by(|a, b| ledger.minutes(a).cmp(&ledger.minutes(b)).then_with(|| a.cmp(b)));

        let released = self
            .roster
            .get(occupant)
            .map(|staff| staff.availability(day.date, shift).credited_minutes(shift))
            .unwrap_or(0);

        for candidate in candidates {
            let Some(staff) = self.roster.get(candidate) else {
                continue;
            };
            if !staff.availability(day.date, shift).covers_shift(shift) {
                continue;
            }
            if !guard::permits(day, shift, lab, candidate) {
                continue;
            }

            let credited = shift.cap_minutes();
            let adjustments = [
                Adjustment { name: occupant, delta_minutes: -i64::from(released) },
                Adjustment { name: candidate, delta_minutes: i64::from(credited) },
            ];
            // a swap has to narrow the spread, not just keep it
            if ledger.variance_after(&adjustments) >= ledger.variance() - VARIANCE_EPSILON {
                continue;
            }

            ledger.apply(&adjustments);
            day.assign(shift, lab, candidate);
            debug!(
                date = %day.date,
                shift = %shift,
                lab = %lab,
                from = occupant,
                to = candidate,
                "slot reassigned"
            );
            return Some(Reassignment {
                date: day.date,
                shift,
                lab,
                from: occupant.to_string(),
                to: candidate.to_string(),
                hours: minutes_to_hours(credited),
                propagated: false,
            });
        }

        None
    }
}
