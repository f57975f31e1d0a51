//! Data-source selection and fetch reconciliation.
//!
//! Every date-range or filter change flows through [`Reconciler::resolve`],
//! which decides per range whether to hit the daily-performance endpoint,
//! the weekly-snapshot endpoint, the local snapshot cache, or a hybrid of
//! them, then resolves a comparison period the same way. Fetch failures are
//! absorbed here: a failed call logs a warning and contributes an empty
//! result so already-cached data still renders.

use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use shared::{DailyPerformance, DateRange, StoreInfo, WeeklySnapshot};

use crate::domain::fiscal_calendar;
use crate::domain::normalizer;
use crate::domain::snapshot_cache::SnapshotCache;
use crate::domain::store_directory::{StoreDirectory, StoreFilter};

/// The upstream reporting API, seen from the domain side. Date parameters
/// cross this seam as calendar dates; an empty store filter means all
/// stores.
#[async_trait]
pub trait DataApi: Send + Sync {
    async fn fetch_store_directory(&self) -> anyhow::Result<Vec<StoreInfo>>;

    async fn fetch_performance(
        &self,
        range: &DateRange,
        store_filters: &[String],
    ) -> anyhow::Result<Vec<DailyPerformance>>;

    async fn fetch_snapshots(
        &self,
        range: &DateRange,
        store_filters: &[String],
    ) -> anyhow::Result<Vec<WeeklySnapshot>>;
}

/// Everything one reconciliation produces. `all_stores` always covers the
/// full store population so comparative views stay unfiltered while the KPI
/// cards follow the active filter.
#[derive(Debug, Clone, Default)]
pub struct ResolvedData {
    pub records: Vec<DailyPerformance>,
    pub comparison: Vec<DailyPerformance>,
    pub all_stores: Vec<DailyPerformance>,
}

/// The comparison window for a primary range: fiscal-aligned when the range
/// is (within a day of) the fiscal month-to-date window, otherwise the same
/// span one calendar year earlier, day count preserved.
pub fn comparison_range_on(range: &DateRange, reference: NaiveDate) -> DateRange {
    let mtd = fiscal_calendar::fiscal_month_to_date_on(reference);
    if range.start == mtd.start && (range.end - mtd.end).num_days().abs() <= 1 {
        return fiscal_calendar::last_year_fiscal_month_to_date_on(reference);
    }

    let year = range.start.year() - 1;
    let start = range
        .start
        .with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, range.start.month(), range.start.day() - 1))
        .unwrap_or(range.start);
    DateRange::new(start, start + Duration::days(range.day_count() - 1))
}

pub struct Reconciler<A: DataApi> {
    api: std::sync::Arc<A>,
}

impl<A: DataApi> Reconciler<A> {
    pub fn new(api: std::sync::Arc<A>) -> Self {
        Self { api }
    }

    /// Resolve a range against today's clock.
    pub async fn resolve(
        &self,
        range: &DateRange,
        filter: &StoreFilter,
        cache: &mut SnapshotCache,
        directory: &StoreDirectory,
    ) -> ResolvedData {
        self.resolve_on(range, filter, cache, directory, fiscal_calendar::today())
            .await
    }

    /// Resolve a range against an explicit reference date.
    pub async fn resolve_on(
        &self,
        range: &DateRange,
        filter: &StoreFilter,
        cache: &mut SnapshotCache,
        directory: &StoreDirectory,
        reference: NaiveDate,
    ) -> ResolvedData {
        let records = self
            .source_records(range, filter, cache, directory, reference)
            .await;

        let comparison = if *range == fiscal_calendar::current_week_on(reference) {
            // Day-count-matched slice of last week, so a Wednesday compares
            // Mon..Wed against Mon..Wed rather than a full week.
            let elapsed = fiscal_calendar::days_into_week_on(reference);
            let last_week = fiscal_calendar::last_week_on(reference);
            let matched = DateRange::new(
                last_week.start,
                last_week.start + Duration::days(elapsed - 1),
            );
            self.fetch_performance_logged(&matched, filter, directory)
                .await
        } else {
            let comparison_range = comparison_range_on(range, reference);
            self.source_records(&comparison_range, filter, cache, directory, reference)
                .await
        };

        let all_stores = if filter.is_all() {
            records.clone()
        } else {
            self.source_records(range, &StoreFilter::All, cache, directory, reference)
                .await
        };

        ResolvedData {
            records,
            comparison,
            all_stores,
        }
    }

    /// The six-branch sourcing policy, evaluated in order.
    async fn source_records(
        &self,
        range: &DateRange,
        filter: &StoreFilter,
        cache: &mut SnapshotCache,
        directory: &StoreDirectory,
        reference: NaiveDate,
    ) -> Vec<DailyPerformance> {
        let current_week = fiscal_calendar::current_week_on(reference);

        // 1. The in-progress week is inherently partial; snapshots for it do
        //    not exist yet, so it always comes from the daily endpoint.
        if *range == current_week {
            return self
                .fetch_performance_logged(range, filter, directory)
                .await;
        }

        // 2. A complete Monday-to-Sunday week is served from the snapshot
        //    cache when it holds rows for that closing Sunday that survive
        //    the filter, otherwise by a targeted snapshot fetch. The filter
        //    check matters: a cached week for other stores must not mask
        //    the selected store's missing rows.
        if fiscal_calendar::is_complete_week(range) {
            let rows = cache.rows_for_period_end(range.end, filter, directory);
            if !rows.is_empty() {
                return normalizer::snapshots_to_performance(&rows);
            }
            let fetched = self.fetch_snapshots_logged(range, filter, directory).await;
            cache.merge(fetched.clone());
            return normalizer::snapshots_to_performance(&fetched);
        }

        // 3. Any range the cache already covers skips the network entirely.
        let cached = cache.rows_in_range(range, filter, directory);
        if !cached.is_empty() {
            return normalizer::snapshots_to_performance(&cached);
        }

        // 4. Wide unfiltered ranges never go to the daily endpoint; with
        //    nothing cached the result is empty rather than a deep-paginated
        //    fetch.
        if range.span_days() > 30 && filter.is_all() {
            return Vec::new();
        }

        // 5. A short range spilling into the in-progress week splits at the
        //    week boundary: snapshots for the closed weeks, daily rows for
        //    the open one.
        if range.span_days() <= 30 && filter.is_all() && range.overlaps(&current_week) {
            let mut records = Vec::new();
            if range.start < current_week.start {
                let closed = DateRange::new(range.start, current_week.start - Duration::days(1));
                let fetched = self
                    .fetch_snapshots_logged(&closed, filter, directory)
                    .await;
                cache.merge(fetched.clone());
                records.extend(normalizer::snapshots_to_performance(&fetched));
            }
            let open_start = range.start.max(current_week.start);
            let open_end = range.end.min(reference);
            if open_start <= open_end {
                let open = DateRange::new(open_start, open_end);
                records.extend(self.fetch_performance_logged(&open, filter, directory).await);
            }
            return records;
        }

        // 6. Everything else goes straight to the daily endpoint.
        self.fetch_performance_logged(range, filter, directory)
            .await
    }

    async fn fetch_performance_logged(
        &self,
        range: &DateRange,
        filter: &StoreFilter,
        directory: &StoreDirectory,
    ) -> Vec<DailyPerformance> {
        let stores = filter.raw_store_numbers(directory);
        match self.api.fetch_performance(range, &stores).await {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(
                    start = %range.start,
                    end = %range.end,
                    error = %err,
                    "performance fetch failed, continuing with empty result"
                );
                Vec::new()
            }
        }
    }

    async fn fetch_snapshots_logged(
        &self,
        range: &DateRange,
        filter: &StoreFilter,
        directory: &StoreDirectory,
    ) -> Vec<WeeklySnapshot> {
        let stores = filter.raw_store_numbers(directory);
        match self.api.fetch_snapshots(range, &stores).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(
                    start = %range.start,
                    end = %range.end,
                    error = %err,
                    "snapshot fetch failed, continuing with empty result"
                );
                Vec::new()
            }
        }
    }
}
