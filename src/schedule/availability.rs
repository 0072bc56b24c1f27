use chrono::NaiveDate;
use serde::Serialize;

use super::types::{ShiftType, StaffMember, TimeWindow};
use crate::calendar::weekday_number;

/// Answer to "can this staff work this shift on this date"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub can_work: bool,
    pub overlap_minutes: u32,
}

impl Availability {
    pub const UNAVAILABLE: Availability = Availability {
        can_work: false,
        overlap_minutes: 0,
    };

    /// Minutes the ledger receives for working `shift`: the overlap, capped
    pub fn credited_minutes(&self, shift: ShiftType) -> u32 {
        self.overlap_minutes.min(shift.cap_minutes())
    }

    /// True when the declared windows cover the whole shift
    pub fn covers_shift(&self, shift: ShiftType) -> bool {
        self.can_work && self.overlap_minutes >= shift.cap_minutes()
    }
}

impl StaffMember {
    /// Windows that apply on `date`.
    ///
    /// Excluded dates yield nothing. Otherwise the first period override
    /// covering the date replaces the weekly table outright, even when it
    /// declares nothing for that weekday.
    pub fn windows_on(&self, date: NaiveDate) -> &[TimeWindow] {
        if self.excluded_dates.contains(&date) {
            return &[];
        }
        let Some(weekday) = weekday_number(date) else {
            return &[];
        };

        let table = self
            .periods
            .iter()
            .find(|period| period.covers(date))
            .map(|period| &period.table)
            .unwrap_or(&self.weekly);

        table.get(&weekday).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Checks whether the staff can work `shift` on `date`, summing the
    /// overlap of every declared window with the shift
    pub fn availability(&self, date: NaiveDate, shift: ShiftType) -> Availability {
        let shift_window = shift.window();
        let overlap_minutes: u32 = self
            .windows_on(date)
            .iter()
            .map(|window| window.overlap_minutes(&shift_window))
            .sum();

        if overlap_minutes == 0 {
            return Availability::UNAVAILABLE;
        }
        Availability {
            can_work: true,
            overlap_minutes,
        }
    }
}
