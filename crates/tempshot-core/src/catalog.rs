//! Selectable retention durations.
//!
//! The catalog is fixed. Order is display order and carries no other meaning.

use serde::Serialize;

/// Sentinel minutes value meaning "never expire".
pub const KEEP_FOREVER: i64 = -1;

/// One selectable retention duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationOption {
    pub label: &'static str,
    /// Positive minutes, or [`KEEP_FOREVER`].
    pub minutes: i64,
}

impl DurationOption {
    pub const fn new(label: &'static str, minutes: i64) -> Self {
        Self { label, minutes }
    }

    pub fn is_keep_forever(&self) -> bool {
        self.minutes == KEEP_FOREVER
    }
}

pub const CATALOG: &[DurationOption] = &[
    DurationOption::new("5m", 5),
    DurationOption::new("30m", 30),
    DurationOption::new("1h", 60),
    DurationOption::new("24h", 1440),
    DurationOption::new("Keep", KEEP_FOREVER),
];

/// Look up a catalog entry by its exact label.
pub fn find(label: &str) -> Option<&'static DurationOption> {
    CATALOG.iter().find(|opt| opt.label == label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_one_sentinel_last() {
        let keeps: Vec<_> = CATALOG.iter().filter(|o| o.is_keep_forever()).collect();
        assert_eq!(keeps.len(), 1);
        assert_eq!(CATALOG.last().map(|o| o.label), Some("Keep"));
    }

    #[test]
    fn finite_durations_are_positive_and_ascending() {
        let finite: Vec<i64> = CATALOG
            .iter()
            .filter(|o| !o.is_keep_forever())
            .map(|o| o.minutes)
            .collect();
        assert!(finite.iter().all(|m| *m > 0));
        assert!(finite.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn find_matches_exact_label_only() {
        assert_eq!(find("30m").map(|o| o.minutes), Some(30));
        assert_eq!(find("Keep").map(|o| o.minutes), Some(KEEP_FOREVER));
        assert!(find("keep").is_none());
        assert!(find("30").is_none());
    }
}
