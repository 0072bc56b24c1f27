use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Minutes since midnight
pub type Minute = u16;

/// Weekday number (Mon=2 .. Fri=6) -> declared windows for that day
pub type WeeklyTable = BTreeMap<u8, Vec<TimeWindow>>;

/// Parses a time string (HH:MM) to minutes since midnight
pub fn parse_clock(time_str: &str) -> Option<Minute> {
    let (hours, minutes) = time_str.trim().split_once(':')?;
    let hours: u16 = hours.trim().parse().ok()?;
    let minutes: u16 = minutes.trim().parse().ok()?;
    if hours > 24 || minutes >= 60 || (hours == 24 && minutes > 0) {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Formats minutes since midnight to time string (HH:MM)
pub fn format_clock(minutes: Minute) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Converts a minute count into fractional hours
pub fn minutes_to_hours(minutes: u32) -> f64 {
    f64::from(minutes) / 60.0
}

/// A half-open `[start, end)` interval of the day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Minute,
    pub end: Minute,
}

impl TimeWindow {
    pub const fn new(start: Minute, end: Minute) -> Self {
        Self { start, end }
    }

    /// Parses `HH:MM-HH:MM`; empty or reversed ranges are rejected
    pub fn parse(range: &str) -> Option<Self> {
        let (start, end) = range.split_once('-')?;
        let start = parse_clock(start)?;
        let end = parse_clock(end)?;
        (start < end).then_some(Self { start, end })
    }

    pub fn len_minutes(&self) -> u32 {
        u32::from(self.end.saturating_sub(self.start))
    }

    /// Length of the intersection with `other`, zero when they don't meet
    pub fn overlap_minutes(&self, other: &TimeWindow) -> u32 {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start < end {
            u32::from(end - start)
        } else {
            0
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_clock(self.start), format_clock(self.end))
    }
}

/// Source labels as they appear in availability cells
const SHIFT_LABELS: [(&str, ShiftType); 3] = [
    ("Ca 9h - 12h", ShiftType::Morning),
    ("Ca 13h30 - 16h", ShiftType::Afternoon1),
    ("Ca 16h - 18h30", ShiftType::Afternoon2),
];

/// One of the three fixed daily shifts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ShiftType {
    Morning,
    Afternoon1,
    Afternoon2,
}

impl ShiftType {
    pub const ALL: [ShiftType; 3] = [
        ShiftType::Morning,
        ShiftType::Afternoon1,
        ShiftType::Afternoon2,
    ];

    pub fn index(self) -> usize {
        match self {
            ShiftType::Morning => 0,
            ShiftType::Afternoon1 => 1,
            ShiftType::Afternoon2 => 2,
        }
    }

    pub fn window(self) -> TimeWindow {
        match self {
            ShiftType::Morning => TimeWindow::new(9 * 60, 12 * 60),
            ShiftType::Afternoon1 => TimeWindow::new(13 * 60 + 30, 16 * 60),
            ShiftType::Afternoon2 => TimeWindow::new(16 * 60, 18 * 60 + 30),
        }
    }

    /// Most minutes a single shift may credit to the ledger
    pub fn cap_minutes(self) -> u32 {
        match self {
            ShiftType::Morning => 180,
            ShiftType::Afternoon1 | ShiftType::Afternoon2 => 150,
        }
    }

    pub fn cap_hours(self) -> f64 {
        minutes_to_hours(self.cap_minutes())
    }

    /// Label used in availability cells
    pub fn source_label(self) -> &'static str {
        SHIFT_LABELS[self.index()].0
    }

    /// Label used in rendered schedules
    pub fn display_label(self) -> &'static str {
        match self {
            ShiftType::Morning => "Sáng (09:00~12:00)",
            ShiftType::Afternoon1 => "Chiều (13:30 ~ 16:00)",
            ShiftType::Afternoon2 => "Chiều (16:00 ~ 18:30)",
        }
    }

    /// Looks up a cell label, tolerating surrounding and repeated whitespace
    pub fn from_label(label: &str) -> Option<ShiftType> {
        let normalized = label.split_whitespace().collect::<Vec<_>>().join(" ");
        SHIFT_LABELS
            .iter()
            .find(|(known, _)| *known == normalized)
            .map(|(_, shift)| *shift)
    }

    /// The other two shifts of the day, in day order
    pub fn others(self) -> impl Iterator<Item = ShiftType> {
        ShiftType::ALL.into_iter().filter(move |s| *s != self)
    }
}

impl fmt::Display for ShiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShiftType::Morning => "morning",
            ShiftType::Afternoon1 => "afternoon1",
            ShiftType::Afternoon2 => "afternoon2",
        };
        f.write_str(name)
    }
}

/// One of the three interchangeable positions inside a shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LabSlot {
    Lab01,
    Lab02,
    Lab03,
}

impl LabSlot {
    pub const ALL: [LabSlot; 3] = [LabSlot::Lab01, LabSlot::Lab02, LabSlot::Lab03];

    pub fn index(self) -> usize {
        match self {
            LabSlot::Lab01 => 0,
            LabSlot::Lab02 => 1,
            LabSlot::Lab03 => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LabSlot::Lab01 => "Lab01",
            LabSlot::Lab02 => "Lab02",
            LabSlot::Lab03 => "Lab03",
        }
    }
}

impl fmt::Display for LabSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A weekly table that replaces the default one between two dates (inclusive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodOverride {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub table: WeeklyTable,
}

impl PeriodOverride {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A staff member and everything they declared about their availability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub name: String,
    pub weekly: WeeklyTable,
    #[serde(default)]
    pub excluded_dates: BTreeSet<NaiveDate>,
    #[serde(default)]
    pub periods: Vec<PeriodOverride>,
}

impl StaffMember {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weekly: WeeklyTable::new(),
            excluded_dates: BTreeSet::new(),
            periods: Vec::new(),
        }
    }

    pub fn with_window(mut self, weekday: u8, window: TimeWindow) -> Self {
        self.weekly.entry(weekday).or_default().push(window);
        self
    }

    pub fn with_shift(self, weekday: u8, shift: ShiftType) -> Self {
        self.with_window(weekday, shift.window())
    }

    pub fn with_excluded_date(mut self, date: NaiveDate) -> Self {
        self.excluded_dates.insert(date);
        self
    }

    pub fn with_period(mut self, period: PeriodOverride) -> Self {
        self.periods.push(period);
        self
    }

    /// True when nothing at all was declared
    pub fn has_no_windows(&self) -> bool {
        self.weekly.values().all(Vec::is_empty)
            && self.periods.iter().all(|p| p.table.values().all(Vec::is_empty))
    }
}

/// All staff of a run, keyed and ordered by name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    members: BTreeMap<String, StaffMember>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a member; a later entry with the same name replaces the earlier one
    pub fn insert(&mut self, member: StaffMember) -> Option<StaffMember> {
        self.members.insert(member.name.clone(), member)
    }

    pub fn get(&self, name: &str) -> Option<&StaffMember> {
        self.members.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut StaffMember> {
        self.members.get_mut(name)
    }

    /// Members in ascending name order
    pub fn iter(&self) -> impl Iterator<Item = &StaffMember> {
        self.members.values()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl FromIterator<StaffMember> for Roster {
    fn from_iter<I: IntoIterator<Item = StaffMember>>(iter: I) -> Self {
        let mut roster = Roster::new();
        for member in iter {
            roster.insert(member);
        }
        roster
    }
}

/// Occupants of every (shift, lab) pair for one weekday
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAssignment {
    pub date: NaiveDate,
    slots: [[Option<String>; 3]; 3], // [shift][lab]
}

impl DailyAssignment {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            slots: Default::default(),
        }
    }

    pub fn occupant(&self, shift: ShiftType, lab: LabSlot) -> Option<&str> {
        self.slots[shift.index()][lab.index()].as_deref()
    }

    pub fn is_free(&self, shift: ShiftType, lab: LabSlot) -> bool {
        self.occupant(shift, lab).is_none()
    }

    /// Puts `name` into the slot, returning whoever held it before
    pub fn assign(&mut self, shift: ShiftType, lab: LabSlot, name: &str) -> Option<String> {
        self.slots[shift.index()][lab.index()].replace(name.to_string())
    }

    /// The lab `name` holds in `shift`, if any
    pub fn lab_of(&self, shift: ShiftType, name: &str) -> Option<LabSlot> {
        LabSlot::ALL
            .into_iter()
            .find(|lab| self.occupant(shift, *lab) == Some(name))
    }

    pub fn free_labs(&self, shift: ShiftType) -> impl Iterator<Item = LabSlot> + '_ {
        LabSlot::ALL.into_iter().filter(move |lab| self.is_free(shift, *lab))
    }

    /// Occupied labs of a shift in lab order
    pub fn occupants(&self, shift: ShiftType) -> impl Iterator<Item = (LabSlot, &str)> + '_ {
        LabSlot::ALL
            .into_iter()
            .filter_map(move |lab| self.occupant(shift, lab).map(|name| (lab, name)))
    }

    pub fn filled_count(&self) -> usize {
        self.slots.iter().flatten().filter(|slot| slot.is_some()).count()
    }
}

/// Records one occupant change made while balancing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reassignment {
    pub date: NaiveDate,
    pub shift: ShiftType,
    pub lab: LabSlot,
    pub from: String,
    pub to: String,
    pub hours: f64,
    /// Set when the move followed a swap in another shift of the day
    pub propagated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_boundaries() {
        assert_eq!(ShiftType::Morning.window(), TimeWindow::new(540, 720));
        assert_eq!(ShiftType::Afternoon1.window(), TimeWindow::new(810, 960));
        assert_eq!(ShiftType::Afternoon2.window(), TimeWindow::new(960, 1110));
        assert!((ShiftType::Morning.cap_hours() - 3.0).abs() < 1e-10);
        assert!((ShiftType::Afternoon1.cap_hours() - 2.5).abs() < 1e-10);
        assert!((ShiftType::Afternoon2.cap_hours() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_label_lookup_every_label() {
        for shift in ShiftType::ALL {
            assert_eq!(ShiftType::from_label(shift.source_label()), Some(shift));
        }
        assert_eq!(ShiftType::from_label("  Ca 13h30 -  16h "), Some(ShiftType::Afternoon1));
        assert_eq!(ShiftType::from_label("Ca 9h-12h"), None);
        assert_eq!(ShiftType::from_label("ca 9h - 12h"), None);
        assert_eq!(ShiftType::from_label(""), None);
    }

    #[test]
    fn test_clock_parsing() {
        assert_eq!(parse_clock("09:00"), Some(540));
        assert_eq!(parse_clock("13:30"), Some(810));
        assert_eq!(parse_clock("24:00"), Some(1440));
        assert_eq!(parse_clock("24:30"), None);
        assert_eq!(parse_clock("9"), None);
        assert_eq!(format_clock(1110), "18:30");
        assert_eq!(TimeWindow::parse("13:30-16:00"), Some(TimeWindow::new(810, 960)));
        assert_eq!(TimeWindow::parse("16:00-13:30"), None);
        assert_eq!(ShiftType::Afternoon2.window().to_string(), "16:00-18:30");
    }

    #[test]
    fn test_window_overlap() {
        let declared = TimeWindow::new(600, 900);
        assert_eq!(declared.overlap_minutes(&ShiftType::Morning.window()), 120);
        assert_eq!(declared.overlap_minutes(&ShiftType::Afternoon1.window()), 90);
        assert_eq!(declared.overlap_minutes(&ShiftType::Afternoon2.window()), 0);
    }

    #[test]
    fn test_daily_assignment_slots() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let mut day = DailyAssignment::new(date);
        assert_eq!(day.free_labs(ShiftType::Morning).count(), 3);

        day.assign(ShiftType::Morning, LabSlot::Lab02, "An");
        assert_eq!(day.lab_of(ShiftType::Morning, "An"), Some(LabSlot::Lab02));
        assert_eq!(day.lab_of(ShiftType::Afternoon1, "An"), None);
        assert_eq!(
            day.free_labs(ShiftType::Morning).collect::<Vec<_>>(),
            vec![LabSlot::Lab01, LabSlot::Lab03]
        );

        let previous = day.assign(ShiftType::Morning, LabSlot::Lab02, "Binh");
        assert_eq!(previous.as_deref(), Some("An"));
        assert_eq!(day.filled_count(), 1);
    }
}
