use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::Writer;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook};
use serde::Serialize;

use crate::calendar::weekday_label;
use crate::error::{Result, RosterError};
use crate::schedule::{
    BalanceReport, DailyAssignment, GeneratedSchedule, LabSlot, ShiftType, WorkloadLedger,
};

pub const HEADER: [&str; 6] = ["Date", "Thứ", "TYPE", "Lab01", "Lab02", "Lab03"];
pub const SHEET_NAME: &str = "Work Schedule";

const HEADER_FILL: u32 = 0x366092;
const MAX_COLUMN_WIDTH: f64 = 30.0;

/// One rendered line of the schedule: a shift of a day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleRow {
    pub date: String,
    pub weekday: String,
    pub shift: String,
    pub labs: [String; 3],
}

impl ScheduleRow {
    fn fields(&self) -> [&str; 6] {
        [
            self.date.as_str(),
            self.weekday.as_str(),
            self.shift.as_str(),
            self.labs[0].as_str(),
            self.labs[1].as_str(),
            self.labs[2].as_str(),
        ]
    }
}

/// Three rows per day (Morning, Afternoon1, Afternoon2), days in order
pub fn schedule_rows(days: &[DailyAssignment]) -> Vec<ScheduleRow> {
    let mut days: Vec<&DailyAssignment> = days.iter().collect();
    days.sort_by_key(|day| day.date);

    let mut rows = Vec::with_capacity(days.len() * 3);
    for day in days {
        let date = day.date.format("%d/%m/%Y").to_string();
        let weekday = weekday_label(day.date);
        for shift in ShiftType::ALL {
            rows.push(ScheduleRow {
                date: date.clone(),
                weekday: weekday.clone(),
                shift: shift.display_label().to_string(),
                labs: LabSlot::ALL.map(|lab| day.occupant(shift, lab).unwrap_or("").to_string()),
            });
        }
    }
    rows
}

/// Writes the header and every row as CSV to any writer
pub fn write_rows_csv<W: Write>(writer: W, rows: &[ScheduleRow]) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(HEADER)?;
    for row in rows {
        wtr.write_record(row.fields())?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes the schedule to a CSV file
pub fn write_schedule_csv(path: &Path, days: &[DailyAssignment]) -> Result<()> {
    let file = File::create(path).map_err(|e| RosterError::io(path, e))?;
    write_rows_csv(file, &schedule_rows(days))
}

/// Column widths fitted to the longest value plus two, capped at 30
pub fn column_widths(rows: &[ScheduleRow]) -> [f64; 6] {
    let mut longest = HEADER.map(|title| title.chars().count());
    for row in rows {
        for (width, value) in longest.iter_mut().zip(row.fields()) {
            *width = (*width).max(value.chars().count());
        }
    }
    longest.map(|len| (len as f64 + 2.0).min(MAX_COLUMN_WIDTH))
}

/// Writes the schedule as a spreadsheet: bold white header on blue, every
/// cell centered and thinly bordered, columns fitted to their content
pub fn write_schedule_xlsx(path: &Path, days: &[DailyAssignment]) -> Result<()> {
    let rows = schedule_rows(days);
    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);
    let cell_format = Format::new()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for (col, title) in (0u16..).zip(HEADER) {
            sheet.write_string_with_format(0, col, title, &header_format)?;
        }
        for (row_num, row) in (1u32..).zip(&rows) {
            for (col, value) in (0u16..).zip(row.fields()) {
                if value.is_empty() {
                    sheet.write_blank(row_num, col, &cell_format)?;
                } else {
                    sheet.write_string_with_format(row_num, col, value, &cell_format)?;
                }
            }
        }
        for (col, width) in (0u16..).zip(column_widths(&rows)) {
            sheet.set_column_width(col, width)?;
        }
    }
    workbook.save(path)?;
    Ok(())
}

/// Writes rows, ledger and balance report as one JSON document
pub fn write_schedule_json(path: &Path, schedule: &GeneratedSchedule) -> Result<()> {
    #[derive(Serialize)]
    struct Document<'a> {
        rows: Vec<ScheduleRow>,
        workload: &'a WorkloadLedger,
        balance: &'a BalanceReport,
    }

    let file = File::create(path).map_err(|e| RosterError::io(path, e))?;
    let document = Document {
        rows: schedule_rows(&schedule.days),
        workload: &schedule.ledger,
        balance: &schedule.balance,
    };
    serde_json::to_writer_pretty(file, &document)?;
    Ok(())
}

/// Prints the schedule and the hours per staff in a readable format
pub fn print_schedule(schedule: &GeneratedSchedule) {
    println!("\n=== Lab schedule {} .. {} ===", schedule.start, schedule.end);
    for row in schedule_rows(&schedule.days) {
        let labs: Vec<&str> = row
            .labs
            .iter()
            .map(|name| if name.is_empty() { "[EMPTY]" } else { name.as_str() })
            .collect();
        println!(
            "  {} {:<6} {:<22} {}",
            row.date,
            row.weekday,
            row.shift,
            labs.join(" | ")
        );
    }

    println!("\n=== Hours per staff ===");
    for (name, hours) in schedule.ledger.iter() {
        println!("  {:<24} {:>5.1}h", name, hours);
    }
    println!(
        "  mean {:.2}h, spread {:.2}h, variance {:.2}",
        schedule.ledger.mean_hours(),
        schedule.ledger.spread(),
        schedule.ledger.variance()
    );
    if !schedule.balance.moves.is_empty() {
        println!(
            "  balancing moved {} slot(s) in {} round(s)",
            schedule.balance.moves.len(),
            schedule.balance.rounds.len()
        );
    }
}
