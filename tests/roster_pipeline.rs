//! End-to-end checks: availability CSV in, schedule out.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use lab_roster::config::{AppConfig, BalanceConfig};
use lab_roster::display::{schedule_rows, write_schedule_csv};
use lab_roster::parser::{discover_source, load_roster};
use lab_roster::schedule::{generate_schedule, GeneratedSchedule, LabSlot, Roster, ShiftType};
use lab_roster::RosterError;

const HEADER: &str = "Timestamp,Họ và tên,Thứ 2,Thứ 3,Thứ 4,Thứ 5,Thứ 6\n";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn roster_from(csv_body: &str) -> (tempfile::TempDir, Roster) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lich.csv");
    std::fs::write(&path, format!("{HEADER}{csv_body}")).unwrap();
    let (roster, _) = load_roster(&path, false).unwrap();
    (dir, roster)
}

fn busy_week() -> &'static str {
    "t,An,Ca 9h - 12h;Ca 13h30 - 16h;Ca 16h - 18h30,Ca 9h - 12h;Ca 13h30 - 16h;Ca 16h - 18h30,Ca 9h - 12h;Ca 13h30 - 16h;Ca 16h - 18h30,Ca 9h - 12h;Ca 13h30 - 16h;Ca 16h - 18h30,Ca 9h - 12h;Ca 13h30 - 16h;Ca 16h - 18h30\n\
     t,Binh,Ca 9h - 12h;Ca 13h30 - 16h,Ca 9h - 12h,Ca 13h30 - 16h;Ca 16h - 18h30,,Ca 9h - 12h\n\
     t,Chau,Ca 16h - 18h30,Ca 13h30 - 16h;Ca 16h - 18h30,Ca 9h - 12h,Ca 9h - 12h;Ca 13h30 - 16h,\n\
     t,Dung,Ca 9h - 12h,Ca 9h - 12h,Ca 9h - 12h,Ca 9h - 12h,Ca 9h - 12h\n\
     t,Giang,Ca 13h30 - 16h,,Ca 13h30 - 16h,,Ca 16h - 18h30\n\
     t,Hoa,,,,,\n"
}

fn week(roster: &Roster) -> GeneratedSchedule {
    generate_schedule(roster, date(2024, 6, 3), date(2024, 6, 7), &BalanceConfig::default())
}

#[test]
fn test_monday_two_staff() {
    lab_roster::logging::init_test();
    let (_dir, roster) = roster_from(
        "t,A,Ca 9h - 12h;Ca 13h30 - 16h,,,,\n\
         t,B,Ca 9h - 12h,,,,\n",
    );
    let schedule = generate_schedule(&roster, date(2024, 6, 3), date(2024, 6, 3), &BalanceConfig::default());

    assert_eq!(schedule.days.len(), 1);
    let monday = &schedule.days[0];
    assert_eq!(monday.occupant(ShiftType::Morning, LabSlot::Lab01), Some("A"));
    assert_eq!(monday.occupant(ShiftType::Morning, LabSlot::Lab02), Some("B"));
    assert_eq!(monday.occupant(ShiftType::Afternoon1, LabSlot::Lab01), Some("A"));
    assert_eq!(monday.filled_count(), 3);
    assert_eq!(schedule.ledger.hours("A"), 5.5);
    assert_eq!(schedule.ledger.hours("B"), 3.0);
}

#[test]
fn test_identical_inputs_give_identical_csv() {
    lab_roster::logging::init_test();
    let (dir, roster) = roster_from(busy_week());
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");

    write_schedule_csv(&first, &week(&roster).days).unwrap();
    write_schedule_csv(&second, &week(&roster).days).unwrap();

    let first = std::fs::read(first).unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, std::fs::read(second).unwrap());
}

#[test]
fn test_schedule_invariants_hold() {
    lab_roster::logging::init_test();
    let (_dir, roster) = roster_from(busy_week());
    let schedule = week(&roster);

    assert_eq!(schedule.days.len(), 5);
    let mut expected_minutes: BTreeMap<&str, u32> = BTreeMap::new();

    for day in &schedule.days {
        for shift in ShiftType::ALL {
            let names: Vec<&str> = day.occupants(shift).map(|(_, name)| name).collect();
            let mut unique = names.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), names.len(), "{} {:?} has a double booking", day.date, shift);

            for name in names {
                let staff = roster.get(name).unwrap();
                let availability = staff.availability(day.date, shift);
                assert!(availability.can_work, "{name} placed outside availability");
                *expected_minutes.entry(name).or_default() += availability.credited_minutes(shift);
            }
        }
    }

    // credited hours are exactly what the placements are worth
    for staff in roster.iter() {
        let expected = expected_minutes.get(staff.name.as_str()).copied().unwrap_or(0);
        assert_eq!(schedule.ledger.minutes(&staff.name), expected, "ledger for {}", staff.name);
    }
    assert!(!expected_minutes.contains_key("Hoa"));
}

#[test]
fn test_balancing_never_raises_variance() {
    lab_roster::logging::init_test();
    let (_dir, roster) = roster_from(busy_week());
    let schedule = week(&roster);

    for round in &schedule.balance.rounds {
        assert!(round.variance_after <= round.variance_before + 1e-9);
    }
    for (a, b) in schedule.balance.rounds.iter().zip(schedule.balance.rounds.iter().skip(1)) {
        assert!(b.variance_before <= a.variance_after + 1e-9);
    }
    assert!(schedule.balance.rounds.len() <= BalanceConfig::default().max_rounds);
}

#[test]
fn test_weekend_range_is_empty() {
    let (_dir, roster) = roster_from(busy_week());
    let schedule = generate_schedule(&roster, date(2024, 6, 8), date(2024, 6, 9), &BalanceConfig::default());
    assert!(schedule.days.is_empty());
    assert!(schedule_rows(&schedule.days).is_empty());
    assert!(schedule.ledger.is_empty());
}

#[test]
fn test_excluded_date_from_config() {
    lab_roster::logging::init_test();
    let (_dir, mut roster) = roster_from(
        "t,An,Ca 9h - 12h,Ca 9h - 12h,,,\n\
         t,Binh,,Ca 9h - 12h,,,\n",
    );
    let config = AppConfig::from_toml_str(
        r#"
        [[staff]]
        name = "An"
        excluded_dates = ["2024-06-03"]
        "#,
    )
    .unwrap();
    config.apply_overrides(&mut roster).unwrap();

    let schedule = generate_schedule(&roster, date(2024, 6, 3), date(2024, 6, 4), &config.balance);
    assert_eq!(schedule.days[0].filled_count(), 0);
    assert_eq!(schedule.days[1].lab_of(ShiftType::Morning, "An"), Some(LabSlot::Lab01));
    assert_eq!(schedule.days[1].lab_of(ShiftType::Morning, "Binh"), Some(LabSlot::Lab02));
}

#[test]
fn test_missing_source_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::default();
    let err = discover_source(dir.path(), None, &config.input.candidates, &config.output.path).unwrap_err();
    assert!(matches!(err, RosterError::NoSource { .. }));
}
