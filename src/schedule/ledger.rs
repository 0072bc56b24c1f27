use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use super::types::minutes_to_hours;

/// Credited minutes per staff for one generation run.
///
/// A staff only gets an entry once something is credited to them, so staff
/// who were never placed do not show up here at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkloadLedger {
    minutes: BTreeMap<String, u32>,
}

/// A pending change to one staff's total
#[derive(Debug, Clone, Copy)]
pub struct Adjustment<'a> {
    pub name: &'a str,
    pub delta_minutes: i64,
}

impl WorkloadLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit(&mut self, name: &str, minutes: u32) {
        *self.minutes.entry(name.to_string()).or_insert(0) += minutes;
    }

    /// Removes up to `minutes`; totals never go negative
    pub fn debit(&mut self, name: &str, minutes: u32) {
        if let Some(total) = self.minutes.get_mut(name) {
            *total = total.saturating_sub(minutes);
        }
    }

    pub fn apply(&mut self, adjustments: &[Adjustment<'_>]) {
        for adjustment in adjustments {
            let magnitude =
                u32::try_from(adjustment.delta_minutes.unsigned_abs()).unwrap_or(u32::MAX);
            if adjustment.delta_minutes >= 0 {
                self.credit(adjustment.name, magnitude);
            } else {
                self.debit(adjustment.name, magnitude);
            }
        }
    }

    pub fn minutes(&self, name: &str) -> u32 {
        self.minutes.get(name).copied().unwrap_or(0)
    }

    pub fn hours(&self, name: &str) -> f64 {
        minutes_to_hours(self.minutes(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.minutes.contains_key(name)
    }

    /// Entries in ascending name order, as hours
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.minutes
            .iter()
            .map(|(name, minutes)| (name.as_str(), minutes_to_hours(*minutes)))
    }

    pub fn len(&self) -> usize {
        self.minutes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.minutes.is_empty()
    }

    pub fn total_hours(&self) -> f64 {
        minutes_to_hours(self.minutes.values().sum())
    }

    pub fn mean_hours(&self) -> f64 {
        if self.minutes.is_empty() {
            return 0.0;
        }
        self.total_hours() / self.minutes.len() as f64
    }

    /// Population variance of hours over all entries
    pub fn variance(&self) -> f64 {
        if self.minutes.is_empty() {
            return 0.0;
        }
        let mean = self.mean_hours();
        let sum_sq: f64 = self.iter().map(|(_, hours)| (hours - mean).powi(2)).sum();
        sum_sq / self.minutes.len() as f64
    }

    /// Variance the ledger would have after `adjustments`
    pub fn variance_after(&self, adjustments: &[Adjustment<'_>]) -> f64 {
        let mut trial = self.clone();
        trial.apply(adjustments);
        trial.variance()
    }

    /// Gap between the most and least loaded staff, in hours
    pub fn spread(&self) -> f64 {
        let min = self.minutes.values().min().copied().unwrap_or(0);
        let max = self.minutes.values().max().copied().unwrap_or(0);
        minutes_to_hours(max - min)
    }
}

impl Serialize for WorkloadLedger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}
