//! Append-only weekly snapshot cache.
//!
//! One writer (the reconciler) grows this collection as fetches land;
//! readers see whole-collection snapshots during a render pass. Rows are
//! keyed by store number plus week-ending date, and a later fetch for the
//! same key replaces the earlier row.

use chrono::NaiveDate;
use shared::{DateRange, WeeklySnapshot};
use std::collections::HashMap;

use crate::domain::store_directory::{StoreDirectory, StoreFilter};

/// Merge freshly fetched rows into an existing set, deduplicating by
/// `(store number, period_end)`. Incoming rows win on key collision;
/// existing rows keep their positions and new rows append in arrival
/// order. Indexed so merging a year of history into a multi-year cache
/// stays linear.
pub fn merge_snapshots(
    existing: Vec<WeeklySnapshot>,
    incoming: Vec<WeeklySnapshot>,
) -> Vec<WeeklySnapshot> {
    let mut merged = existing;
    let mut index: HashMap<(String, String), usize> = merged
        .iter()
        .enumerate()
        .map(|(slot, row)| ((row.store_number(), row.period_end.clone()), slot))
        .collect();
    for row in incoming {
        let key = (row.store_number(), row.period_end.clone());
        match index.get(&key) {
            Some(&slot) => merged[slot] = row,
            None => {
                index.insert(key, merged.len());
                merged.push(row);
            }
        }
    }
    merged
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotCache {
    rows: Vec<WeeklySnapshot>,
}

impl SnapshotCache {
    pub fn rows(&self) -> &[WeeklySnapshot] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Absorb newly fetched rows.
    pub fn merge(&mut self, incoming: Vec<WeeklySnapshot>) {
        if incoming.is_empty() {
            return;
        }
        self.rows = merge_snapshots(std::mem::take(&mut self.rows), incoming);
    }

    /// Drop everything; the refresh trigger restarts from an empty cache.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Whether any cached row closes on the given Sunday.
    pub fn has_period_end(&self, period_end: NaiveDate) -> bool {
        self.rows
            .iter()
            .any(|r| r.period_end_date() == Some(period_end))
    }

    /// Cached rows closing on the given Sunday, filtered.
    pub fn rows_for_period_end(
        &self,
        period_end: NaiveDate,
        filter: &StoreFilter,
        directory: &StoreDirectory,
    ) -> Vec<WeeklySnapshot> {
        self.rows
            .iter()
            .filter(|r| r.period_end_date() == Some(period_end))
            .filter(|r| filter.matches(&r.store_number(), directory))
            .cloned()
            .collect()
    }

    /// Cached rows whose week-ending date falls inside the range, filtered.
    /// Rows with an unparseable period end never match.
    pub fn rows_in_range(
        &self,
        range: &DateRange,
        filter: &StoreFilter,
        directory: &StoreDirectory,
    ) -> Vec<WeeklySnapshot> {
        self.rows
            .iter()
            .filter(|r| r.period_end_date().is_some_and(|d| range.contains(d)))
            .filter(|r| filter.matches(&r.store_number(), directory))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snap(store: &str, period_end: &str, sales: f64) -> WeeklySnapshot {
        WeeklySnapshot {
            store_nbr: json!(store),
            period_end: period_end.into(),
            sales_subtotal: sales,
            ..Default::default()
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_merge_dedups_by_store_and_period_end() {
        let existing = vec![snap("101", "2024-06-09", 100.0), snap("102", "2024-06-09", 200.0)];
        let incoming = vec![snap("101", "2024-06-09", 150.0), snap("101", "2024-06-16", 300.0)];

        let merged = merge_snapshots(existing, incoming);
        assert_eq!(merged.len(), 3);
        let refreshed = merged
            .iter()
            .find(|r| r.store_number() == "101" && r.period_end == "2024-06-09")
            .unwrap();
        assert_eq!(refreshed.sales_subtotal, 150.0);
    }

    #[test]
    fn test_merge_keeps_order_and_last_incoming_wins() {
        let existing = vec![snap("101", "2024-06-02", 1.0)];
        let incoming = vec![
            snap("102", "2024-06-09", 2.0),
            snap("102", "2024-06-09", 5.0),
        ];
        let merged = merge_snapshots(existing, incoming);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].store_number(), "101");
        assert_eq!(merged[1].sales_subtotal, 5.0);
    }

    #[test]
    fn test_period_end_lookup_and_filtering() {
        let mut cache = SnapshotCache::default();
        cache.merge(vec![
            snap("101", "2024-06-09", 100.0),
            snap("102", "2024-06-09", 200.0),
            snap("101", "2024-06-16", 300.0),
        ]);
        let dir = StoreDirectory::default();

        assert!(cache.has_period_end(date("2024-06-09")));
        assert!(!cache.has_period_end(date("2024-06-02")));

        let all = cache.rows_for_period_end(date("2024-06-09"), &StoreFilter::All, &dir);
        assert_eq!(all.len(), 2);

        let one = cache.rows_for_period_end(
            date("2024-06-09"),
            &StoreFilter::Store("102".into()),
            &dir,
        );
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].sales_subtotal, 200.0);
    }

    #[test]
    fn test_range_query_is_inclusive() {
        let mut cache = SnapshotCache::default();
        cache.merge(vec![
            snap("101", "2024-06-02", 1.0),
            snap("101", "2024-06-09", 2.0),
            snap("101", "2024-06-16", 3.0),
        ]);
        let dir = StoreDirectory::default();
        let range = DateRange::new(date("2024-06-02"), date("2024-06-09"));

        let rows = cache.rows_in_range(&range, &StoreFilter::All, &dir);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_unparseable_period_end_never_matches() {
        let mut cache = SnapshotCache::default();
        cache.merge(vec![snap("101", "not-a-date", 1.0)]);
        let dir = StoreDirectory::default();
        let range = DateRange::new(date("2000-01-01"), date("2100-01-01"));
        assert!(cache.rows_in_range(&range, &StoreFilter::All, &dir).is_empty());
    }

    #[test]
    fn test_clear_empties_cache() {
        let mut cache = SnapshotCache::default();
        cache.merge(vec![snap("101", "2024-06-09", 1.0)]);
        cache.clear();
        assert!(cache.is_empty());
    }
}
