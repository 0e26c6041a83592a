//! Filtering and totals over work-log entries.

use std::fmt;

use crate::models::WorkLogEntry;

/// Entry selection by project and paid status. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub project: Option<String>,
    pub paid: Option<bool>,
}

impl EntryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_paid(mut self, paid: bool) -> Self {
        self.paid = Some(paid);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.project.is_none() && self.paid.is_none()
    }

    pub fn matches(&self, entry: &WorkLogEntry) -> bool {
        if let Some(project) = &self.project {
            if &entry.project_name != project {
                return false;
            }
        }
        if let Some(paid) = self.paid {
            if entry.is_paid != paid {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, entries: &[WorkLogEntry]) -> Vec<WorkLogEntry> {
        entries.iter().filter(|e| self.matches(e)).cloned().collect()
    }
}

/// Time totals over a set of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total_seconds: u64,
    pub paid_seconds: u64,
    pub unpaid_seconds: u64,
    pub entry_count: usize,
}

impl Summary {
    /// Totals saturate at `u64::MAX` seconds.
    pub fn of(entries: &[WorkLogEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut acc, entry| {
            acc.total_seconds = acc.total_seconds.saturating_add(entry.seconds);
            if entry.is_paid {
                acc.paid_seconds = acc.paid_seconds.saturating_add(entry.seconds);
            } else {
                acc.unpaid_seconds = acc.unpaid_seconds.saturating_add(entry.seconds);
            }
            acc.entry_count += 1;
            acc
        })
    }

    pub fn earnings(&self, rate_per_hour: f64) -> Earnings {
        let amount = |seconds: u64| seconds as f64 / 3600.0 * rate_per_hour;
        Earnings {
            total: amount(self.total_seconds),
            paid: amount(self.paid_seconds),
            unpaid: amount(self.unpaid_seconds),
        }
    }
}

/// Money owed for a [`Summary`] at a given hourly rate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Earnings {
    pub total: f64,
    pub paid: f64,
    pub unpaid: f64,
}

/// Distinct project names in first-seen order.
pub fn project_names(entries: &[WorkLogEntry]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        if !names.iter().any(|n| n == &entry.project_name) {
            names.push(entry.project_name.clone());
        }
    }
    names
}

/// Seconds rendered as `Hh MMm SSs`.
pub struct Elapsed(pub u64);

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.0 / 3600;
        let minutes = (self.0 / 60) % 60;
        let seconds = self.0 % 60;
        write!(f, "{}h {:02}m {:02}s", hours, minutes, seconds)
    }
}

/// An amount with two decimals followed by the currency's symbol.
pub fn format_amount(amount: f64, currency: &str) -> String {
    let symbol = match currency {
        "USD" => "$",
        "EUR" => "€",
        other => other,
    };
    format!("{:.2}{}", amount, symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkDate;

    fn entries() -> Vec<WorkLogEntry> {
        vec![
            WorkLogEntry::new("Acme", 3600, WorkDate(2023, 0, 1)).with_paid(true),
            WorkLogEntry::new("Acme", 1800, WorkDate(2023, 0, 2)),
            WorkLogEntry::new("Globex", 900, WorkDate(2023, 0, 2)),
        ]
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let filter = EntryFilter::new();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&entries()).len(), 3);
    }

    #[test]
    fn test_filter_by_project_and_paid() {
        let all = entries();
        assert_eq!(EntryFilter::new().with_project("Acme").apply(&all).len(), 2);
        assert_eq!(EntryFilter::new().with_paid(false).apply(&all).len(), 2);

        let unpaid_acme = EntryFilter::new().with_project("Acme").with_paid(false).apply(&all);
        assert_eq!(unpaid_acme.len(), 1);
        assert_eq!(unpaid_acme[0].seconds, 1800);

        assert!(EntryFilter::new().with_project("acme").apply(&all).is_empty());
    }

    #[test]
    fn test_summary_totals() {
        let summary = Summary::of(&entries());
        assert_eq!(summary.total_seconds, 6300);
        assert_eq!(summary.paid_seconds, 3600);
        assert_eq!(summary.unpaid_seconds, 2700);
        assert_eq!(summary.entry_count, 3);

        assert_eq!(Summary::of(&[]), Summary::default());
    }

    #[test]
    fn test_summary_saturates_on_huge_durations() {
        let huge = vec![
            WorkLogEntry::new("X", u64::MAX - 1, WorkDate(2023, 0, 1)),
            WorkLogEntry::new("X", 10, WorkDate(2023, 0, 2)),
            WorkLogEntry::new("X", u64::MAX, WorkDate(2023, 0, 3)).with_paid(true),
        ];
        let summary = Summary::of(&huge);
        assert_eq!(summary.total_seconds, u64::MAX);
        assert_eq!(summary.unpaid_seconds, u64::MAX);
        assert_eq!(summary.paid_seconds, u64::MAX);
        assert_eq!(summary.entry_count, 3);
    }

    #[test]
    fn test_earnings() {
        let earnings = Summary::of(&entries()).earnings(40.0);
        assert!((earnings.total - 70.0).abs() < 1e-9);
        assert!((earnings.paid - 40.0).abs() < 1e-9);
        assert!((earnings.unpaid - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_project_names_first_seen() {
        let mut all = entries();
        all.push(WorkLogEntry::new("Acme", 60, WorkDate(2023, 0, 3)));
        assert_eq!(project_names(&all), vec!["Acme", "Globex"]);
    }

    #[test]
    fn test_elapsed_display() {
        assert_eq!(Elapsed(0).to_string(), "0h 00m 00s");
        assert_eq!(Elapsed(3723).to_string(), "1h 02m 03s");
        assert_eq!(Elapsed(90000).to_string(), "25h 00m 00s");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(12.5, "USD"), "12.50$");
        assert_eq!(format_amount(3.0, "EUR"), "3.00€");
        assert_eq!(format_amount(1.234, "TL"), "1.23TL");
    }
}
