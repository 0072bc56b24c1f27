//! Configuration loading for the roster generator.
//!
//! Everything lives in an optional TOML file (`roster.toml` unless `--config`
//! says otherwise). Every key has a default, so an absent file or an empty
//! one behaves the same.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, RosterError};
use crate::schedule::types::{PeriodOverride, Roster, ShiftType, TimeWindow, WeeklyTable};

pub const DEFAULT_CONFIG_FILE: &str = "roster.toml";

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Workload balancing thresholds
    #[serde(default)]
    pub balance: BalanceConfig,

    #[serde(default)]
    pub web: WebConfig,

    /// Per-staff excluded dates and date-ranged availability
    #[serde(default)]
    pub staff: Vec<StaffOverrideConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Files tried in order when no input is given explicitly
    #[serde(default = "default_candidates")]
    pub candidates: Vec<String>,

    /// Fail on unknown shift labels instead of skipping them with a warning
    #[serde(default)]
    pub strict_labels: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            candidates: default_candidates(),
            strict_labels: false,
        }
    }
}

fn default_candidates() -> Vec<String> {
    ["lich.csv", "schedule.csv", "staff.csv", "data.csv"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("work_schedule.xlsx")
}

/// Tunables of the balancing pass. None of these are derived from the data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceConfig {
    /// Upper bound on refinement rounds
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    /// Hours above the mean at which a staff counts as overloaded
    #[serde(default = "default_threshold")]
    pub overload_threshold_hours: f64,

    /// Hours below the mean at which a staff counts as underloaded
    #[serde(default = "default_threshold")]
    pub underload_threshold_hours: f64,

    /// A round that lowers the variance by less than this ends balancing
    #[serde(default = "default_min_improvement")]
    pub min_variance_improvement: f64,

    /// Balancing is skipped once max - min hours is within this
    #[serde(default = "default_spread_tolerance")]
    pub spread_tolerance_hours: f64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
            overload_threshold_hours: default_threshold(),
            underload_threshold_hours: default_threshold(),
            min_variance_improvement: default_min_improvement(),
            spread_tolerance_hours: default_spread_tolerance(),
        }
    }
}

fn default_max_rounds() -> usize {
    3
}
fn default_threshold() -> f64 {
    5.0
}
fn default_min_improvement() -> f64 {
    0.01
}
fn default_spread_tolerance() -> f64 {
    8.0
}

impl BalanceConfig {
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("overload_threshold_hours", self.overload_threshold_hours),
            ("underload_threshold_hours", self.underload_threshold_hours),
            ("min_variance_improvement", self.min_variance_improvement),
            ("spread_tolerance_hours", self.spread_tolerance_hours),
        ];
        for (key, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(RosterError::InvalidConfig(format!(
                    "balance.{key} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            admin_password: default_admin_password(),
        }
    }
}

fn default_port() -> u16 {
    8080
}
fn default_admin_password() -> String {
    "admin123".into()
}

/// Extra availability facts for one staff member of the CSV
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffOverrideConfig {
    pub name: String,

    #[serde(default)]
    pub excluded_dates: Vec<NaiveDate>,

    #[serde(default)]
    pub periods: Vec<PeriodConfig>,
}

/// A date range whose weekday cells replace the CSV table while it lasts.
/// Cells hold shift labels or `HH:MM-HH:MM` ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub monday: Vec<String>,
    #[serde(default)]
    pub tuesday: Vec<String>,
    #[serde(default)]
    pub wednesday: Vec<String>,
    #[serde(default)]
    pub thursday: Vec<String>,
    #[serde(default)]
    pub friday: Vec<String>,
}

impl PeriodConfig {
    fn cells(&self) -> [(u8, &[String]); 5] {
        [
            (2, self.monday.as_slice()),
            (3, self.tuesday.as_slice()),
            (4, self.wednesday.as_slice()),
            (5, self.thursday.as_slice()),
            (6, self.friday.as_slice()),
        ]
    }

    fn to_override(&self, staff: &str) -> Result<PeriodOverride> {
        if self.start > self.end {
            return Err(RosterError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }

        let mut table = WeeklyTable::new();
        for (weekday, cells) in self.cells() {
            for cell in cells {
                let window = parse_window_cell(cell).ok_or_else(|| RosterError::InvalidOverride {
                    staff: staff.to_string(),
                    value: cell.clone(),
                })?;
                debug!(staff, weekday, window = %window, "period window");
                table.entry(weekday).or_default().push(window);
            }
        }

        Ok(PeriodOverride {
            start: self.start,
            end: self.end,
            table,
        })
    }
}

/// A shift label or an explicit `HH:MM-HH:MM` range
fn parse_window_cell(text: &str) -> Option<TimeWindow> {
    ShiftType::from_label(text)
        .map(ShiftType::window)
        .or_else(|| TimeWindow::parse(text))
}

impl AppConfig {
    /// Parses configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text)?;
        config.balance.validate()?;
        Ok(config)
    }

    /// Loads `path`, falling back to defaults when it doesn't exist and
    /// `required` is false
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        if !path.exists() && !required {
            debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| RosterError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Attaches excluded dates and period overrides to roster members.
    /// Entries naming nobody in the roster are reported and skipped.
    pub fn apply_overrides(&self, roster: &mut Roster) -> Result<()> {
        for entry in &self.staff {
            let Some(member) = roster.get_mut(&entry.name) else {
                warn!(staff = %entry.name, "override names unknown staff, ignored");
                continue;
            };
            member.excluded_dates.extend(entry.excluded_dates.iter().copied());
            for period in &entry.periods {
                member.periods.push(period.to_override(&entry.name)?);
            }
        }
        Ok(())
    }
}
