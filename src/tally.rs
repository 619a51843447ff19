use chrono::Weekday;

use crate::source::TimeBlockRecord;

/// Category charged for blocks whose worked marker is off.
pub const FREE_CATEGORY: &str = "Free / Unused";
/// Category charged for worked blocks without a label.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Every record covers one half-hour block per day.
pub const BLOCK_HOURS: f64 = 0.5;

/// Accumulated hours per category. Keeps first-seen order so that new matrix columns appear in
/// the order categories first show up. Category counts stay small, so entries live in a plain
/// vector instead of a map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTally {
    entries: Vec<(String, f64)>,
}

impl CategoryTally {
    pub fn add(&mut self, category: &str, hours: f64) {
        match self.entries.iter_mut().find(|(name, _)| name == category) {
            Some((_, total)) => *total += hours,
            None => self.entries.push((category.to_string(), hours)),
        }
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, total)| *total)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, total)| (name.as_str(), *total))
    }

    pub fn total_hours(&self) -> f64 {
        self.entries.iter().map(|(_, total)| total).sum()
    }

    /// Total minus the unused sentinel, the number shown as utilization in the report.
    pub fn utilized_hours(&self) -> f64 {
        self.total_hours() - self.get(FREE_CATEGORY).unwrap_or(0.)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Folds one day's worth of records into per-category hours. Every record contributes exactly
/// one half-hour block: to its category when the day is marked worked (the uncategorized
/// sentinel when the label is missing), to the unused sentinel otherwise. Category names pass
/// through verbatim; case-variant duplicates stay distinct.
pub fn aggregate_day(day: Weekday, records: &[TimeBlockRecord]) -> CategoryTally {
    let mut tally = CategoryTally::default();

    for record in records {
        let mark = record.mark(day);
        if mark.worked {
            let category = mark.category.as_deref().unwrap_or(UNCATEGORIZED);
            tally.add(category, BLOCK_HOURS);
        } else {
            tally.add(FREE_CATEGORY, BLOCK_HOURS);
        }
    }

    tally
}
