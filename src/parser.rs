use std::io::Read;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, RosterError};
use crate::schedule::types::{Roster, ShiftType, StaffMember, TimeWindow};

/// Rows need the name column plus Monday..Friday
const MIN_FIELDS: usize = 7;
const NAME_COL: usize = 1;
/// Column index -> weekday number (Mon=2 .. Fri=6)
const WEEKDAY_COLS: [(usize, u8); 5] = [(2, 2), (3, 3), (4, 4), (5, 5), (6, 6)];

/// A cell fragment that matched none of the known shift labels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnrecognizedLabel {
    pub staff: String,
    pub weekday: u8,
    pub label: String,
}

/// What ingestion saw besides the staff themselves
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub rows_read: usize,
    pub rows_skipped: usize,
    /// Names that appeared more than once; the last row wins
    pub duplicates: Vec<String>,
    pub unrecognized: Vec<UnrecognizedLabel>,
}

/// Splits a `;`-separated cell into shift windows.
/// Returns the windows and the fragments that matched no label.
pub fn parse_shift_cell(cell: &str) -> (Vec<TimeWindow>, Vec<String>) {
    let mut windows = Vec::new();
    let mut unknown = Vec::new();

    for fragment in cell.split(';') {
        let trimmed = fragment.trim();
        if trimmed.is_empty() {
            continue;
        }
        match ShiftType::from_label(trimmed) {
            Some(shift) => windows.push(shift.window()),
            None => unknown.push(trimmed.to_string()),
        }
    }

    (windows, unknown)
}

/// Reads availability rows from any CSV source with a header line.
///
/// Rows with fewer than seven fields or a blank name are skipped. Unknown
/// labels are reported, or rejected outright when `strict` is set.
pub fn read_roster<R: Read>(source: R, strict: bool) -> Result<(Roster, IngestReport)> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);
    let mut roster = Roster::new();
    let mut report = IngestReport::default();

    for result in reader.records() {
        let record = result?;
        report.rows_read += 1;

        if record.len() < MIN_FIELDS {
            debug!(fields = record.len(), "skipping incomplete row");
            report.rows_skipped += 1;
            continue;
        }
        let name = record.get(NAME_COL).unwrap_or("").trim();
        if name.is_empty() {
            debug!("skipping row without a name");
            report.rows_skipped += 1;
            continue;
        }

        let mut staff = StaffMember::new(name);
        for (col, weekday) in WEEKDAY_COLS {
            let (windows, unknown) = parse_shift_cell(record.get(col).unwrap_or(""));
            for label in unknown {
                if strict {
                    return Err(RosterError::UnrecognizedLabel {
                        staff: name.to_string(),
                        weekday,
                        label,
                    });
                }
                warn!(staff = name, weekday, label = %label, "unrecognized shift label ignored");
                report.unrecognized.push(UnrecognizedLabel {
                    staff: name.to_string(),
                    weekday,
                    label,
                });
            }
            for window in windows {
                staff = staff.with_window(weekday, window);
            }
        }

        if staff.has_no_windows() {
            debug!(staff = name, "no availability declared");
        }
        if roster.insert(staff).is_some() {
            warn!(staff = name, "duplicate row, keeping the later one");
            report.duplicates.push(name.to_string());
        }
    }

    Ok((roster, report))
}

/// Loads the roster from a CSV file. A file that yields nobody is fatal.
pub fn load_roster<P: AsRef<Path>>(csv_path: P, strict: bool) -> Result<(Roster, IngestReport)> {
    let path = csv_path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| RosterError::io(path, e))?;
    let (roster, report) = read_roster(file, strict)?;

    if roster.is_empty() {
        return Err(RosterError::EmptyRoster {
            path: path.to_path_buf(),
        });
    }
    info!(
        path = %path.display(),
        staff = roster.len(),
        skipped = report.rows_skipped,
        unrecognized = report.unrecognized.len(),
        "availability loaded"
    );
    Ok((roster, report))
}

/// Picks the availability file.
///
/// An explicit path must exist. Otherwise the first existing candidate in
/// `dir` is used, then the alphabetically first `*.csv` in `dir` that isn't
/// a rendering of `output` (same file stem).
pub fn discover_source(
    dir: &Path,
    explicit: Option<&Path>,
    candidates: &[String],
    output: &Path,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(RosterError::NoSource {
            searched: vec![path.display().to_string()],
        });
    }

    let mut searched: Vec<String> = Vec::new();
    for candidate in candidates {
        let path = dir.join(candidate);
        if path.is_file() {
            return Ok(path);
        }
        searched.push(path.display().to_string());
    }

    let output_stem = output.file_stem();
    let entries = std::fs::read_dir(dir).map_err(|e| RosterError::io(dir, e))?;
    let mut csv_files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .filter(|path| path.file_stem() != output_stem)
        .collect();
    csv_files.sort();

    match csv_files.into_iter().next() {
        Some(path) => {
            debug!(path = %path.display(), "falling back to first csv in directory");
            Ok(path)
        }
        None => {
            searched.push(dir.join("*.csv").display().to_string());
            Err(RosterError::NoSource { searched })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str = "Timestamp,Name,Thu 2,Thu 3,Thu 4,Thu 5,Thu 6\n";

    #[test]
    fn test_parse_cell() {
        let (windows, unknown) = parse_shift_cell("Ca 9h - 12h;Ca 13h30 - 16h; Ca 16h - 18h30 ;");
        assert_eq!(
            windows,
            vec![
                ShiftType::Morning.window(),
                ShiftType::Afternoon1.window(),
                ShiftType::Afternoon2.window()
            ]
        );
        assert!(unknown.is_empty());

        let (windows, unknown) = parse_shift_cell("Ca 9h - 12h;Ca 20h - 22h");
        assert_eq!(windows, vec![ShiftType::Morning.window()]);
        assert_eq!(unknown, vec!["Ca 20h - 22h".to_string()]);

        let (windows, unknown) = parse_shift_cell("   ");
        assert!(windows.is_empty() && unknown.is_empty());
    }

    #[test]
    fn test_read_rows() {
        let csv = format!(
            "{HEADER}\
             t1,An,Ca 9h - 12h;Ca 13h30 - 16h,,,,Ca 16h - 18h30\n\
             t2,   ,Ca 9h - 12h,,,,\n\
             t3,Binh,Ca 9h - 12h\n\
             t4,Chau,Ca 9h - 12h,Ca 7h - 8h,,,\n"
        );
        let (roster, report) = read_roster(csv.as_bytes(), false).unwrap();

        assert_eq!(roster.len(), 2);
        assert_eq!(report.rows_read, 4);
        assert_eq!(report.rows_skipped, 2);
        assert_eq!(
            report.unrecognized,
            vec![UnrecognizedLabel {
                staff: "Chau".into(),
                weekday: 3,
                label: "Ca 7h - 8h".into()
            }]
        );

        let an = roster.get("An").unwrap();
        assert_eq!(an.weekly[&2].len(), 2);
        assert_eq!(an.weekly[&6], vec![ShiftType::Afternoon2.window()]);
        assert!(!an.weekly.contains_key(&3));

        let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        assert!(an.availability(monday, ShiftType::Afternoon1).can_work);
    }

    #[test]
    fn test_strict_labels_fail() {
        let csv = format!("{HEADER}t1,An,Ca 9h - 12h;Ca 9h-12h,,,,\n");
        let err = read_roster(csv.as_bytes(), true).unwrap_err();
        assert!(matches!(err, RosterError::UnrecognizedLabel { weekday: 2, .. }));
    }

    #[test]
    fn test_duplicate_names_keep_last() {
        let csv = format!(
            "{HEADER}t1,An,Ca 9h - 12h,,,,\nt2,An,,Ca 16h - 18h30,,,\n"
        );
        let (roster, report) = read_roster(csv.as_bytes(), false).unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(report.duplicates, vec!["An".to_string()]);
        let an = roster.get("An").unwrap();
        assert!(!an.weekly.contains_key(&2));
        assert!(an.weekly.contains_key(&3));
    }

    #[test]
    fn test_discovery_order() {
        let dir = tempfile::tempdir().unwrap();
        let candidates: Vec<String> = vec!["lich.csv".into(), "staff.csv".into()];
        let output = dir.path().join("work_schedule.xlsx");

        // an earlier CSV rendering of the output is not an input
        std::fs::write(dir.path().join("work_schedule.csv"), "x").unwrap();
        let err = discover_source(dir.path(), None, &candidates, &output).unwrap_err();
        assert!(matches!(err, RosterError::NoSource { .. }));

        std::fs::write(dir.path().join("zeta.csv"), "x").unwrap();
        std::fs::write(dir.path().join("alpha.CSV"), "x").unwrap();
        let found = discover_source(dir.path(), None, &candidates, &output).unwrap();
        assert_eq!(found.file_name().unwrap(), "alpha.CSV");

        std::fs::write(dir.path().join("staff.csv"), "x").unwrap();
        let found = discover_source(dir.path(), None, &candidates, &output).unwrap();
        assert_eq!(found.file_name().unwrap(), "staff.csv");

        std::fs::write(dir.path().join("lich.csv"), "x").unwrap();
        let found = discover_source(dir.path(), None, &candidates, &output).unwrap();
        assert_eq!(found.file_name().unwrap(), "lich.csv");

        let explicit = dir.path().join("missing.csv");
        assert!(discover_source(dir.path(), Some(&explicit), &candidates, &output).is_err());
        let explicit = dir.path().join("zeta.csv");
        assert_eq!(
            discover_source(dir.path(), Some(&explicit), &candidates, &output).unwrap(),
            explicit
        );
    }

    #[test]
    fn test_empty_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lich.csv");
        std::fs::write(&path, HEADER).unwrap();
        let err = load_roster(&path, false).unwrap_err();
        assert!(matches!(err, RosterError::EmptyRoster { .. }));
    }
}
