use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use super::balance::{BalanceReport, WorkloadBalancer};
use super::daily::DailyAssignmentEngine;
use super::ledger::WorkloadLedger;
use super::types::{DailyAssignment, Roster};
use crate::calendar::weekdays_in;
use crate::config::BalanceConfig;

/// Everything one generation run produces
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedSchedule {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: Vec<DailyAssignment>,
    pub ledger: WorkloadLedger,
    pub balance: BalanceReport,
}

/// Assigns every weekday in `[start, end]` and then balances the result.
/// Each call starts from an empty ledger.
pub fn generate_schedule(
    roster: &Roster,
    start: NaiveDate,
    end: NaiveDate,
    config: &BalanceConfig,
) -> GeneratedSchedule {
    let mut ledger = WorkloadLedger::new();
    let engine = DailyAssignmentEngine::new(roster);

    let mut days: Vec<DailyAssignment> = weekdays_in(start, end)
        .into_iter()
        .map(|date| engine.assign_day(date, &mut ledger))
        .collect();

    let filled: usize = days.iter().map(DailyAssignment::filled_count).sum();
    info!(
        %start,
        %end,
        days = days.len(),
        filled,
        open = days.len() * 9 - filled,
        staff = roster.len(),
        "initial assignment done"
    );

    let balance = WorkloadBalancer::new(roster, config).balance(&mut days, &mut ledger);

    GeneratedSchedule {
        start,
        end,
        days,
        ledger,
        balance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::types::{ShiftType, StaffMember};

    #[test]
    fn test_weekend_range_produces_nothing() {
        let roster: Roster = [StaffMember::new("An").with_shift(2, ShiftType::Morning)]
            .into_iter()
            .collect();
        let saturday = NaiveDate::from_ymd_opt(2024, 6, 8).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();

        let schedule = generate_schedule(&roster, saturday, sunday, &BalanceConfig::default());
        assert!(schedule.days.is_empty());
        assert!(schedule.ledger.is_empty());
    }

    #[test]
    fn test_ledger_reset_between_runs() {
        let roster: Roster = [StaffMember::new("An").with_shift(2, ShiftType::Morning)]
            .into_iter()
            .collect();
        let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let config = BalanceConfig::default();

        let first = generate_schedule(&roster, monday, monday, &config);
        let second = generate_schedule(&roster, monday, monday, &config);
        assert!((first.ledger.hours("An") - 3.0).abs() < 1e-10);
        assert_eq!(first.ledger, second.ledger);
    }
}
