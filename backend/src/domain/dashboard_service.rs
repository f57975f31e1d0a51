//! Session-level orchestration: one instance owns the cache, the active
//! filter and range, and the latest resolved data, and answers every KPI
//! and chart query from that state.

use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use shared::{
    CostBarsPoint, DailyPerformance, DateRange, EnabledYears, Kpi, LaborByStateRow,
    SalesTrendSeries, StoreInfo, WeeklySnapshot,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::domain::charts;
use crate::domain::fiscal_calendar;
use crate::domain::metrics;
use crate::domain::normalizer;
use crate::domain::reconciler::{DataApi, Reconciler, ResolvedData};
use crate::domain::snapshot_cache::SnapshotCache;
use crate::domain::store_directory::{StoreDirectory, StoreFilter};

pub struct DashboardService<A: DataApi> {
    api: Arc<A>,
    reconciler: Reconciler<A>,
    cache: SnapshotCache,
    directory: StoreDirectory,
    filter: StoreFilter,
    active_range: DateRange,
    enabled_years: EnabledYears,
    resolved: ResolvedData,
    loaded_years: BTreeSet<i32>,
    loading: bool,
    refreshing: bool,
    history_loaded: bool,
}

impl<A: DataApi> DashboardService<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            reconciler: Reconciler::new(api.clone()),
            api,
            cache: SnapshotCache::default(),
            directory: StoreDirectory::default(),
            filter: StoreFilter::All,
            active_range: fiscal_calendar::fiscal_month_to_date(),
            enabled_years: EnabledYears::default(),
            resolved: ResolvedData::default(),
            loaded_years: BTreeSet::new(),
            loading: false,
            refreshing: false,
            history_loaded: false,
        }
    }

    /// First load: store directory, the fiscal month-to-date view, then the
    /// multi-year snapshot history the trend charts need.
    pub async fn load_initial(&mut self) {
        self.load_initial_on(fiscal_calendar::today()).await;
    }

    pub async fn load_initial_on(&mut self, reference: NaiveDate) {
        self.loading = true;
        match self.api.fetch_store_directory().await {
            Ok(stores) => self.directory = StoreDirectory::new(stores),
            Err(err) => {
                tracing::warn!(error = %err, "store directory fetch failed, continuing without it");
            }
        }
        self.active_range = fiscal_calendar::fiscal_month_to_date_on(reference);
        self.reconcile_on(reference).await;
        self.load_history_on(reference).await;
        self.loading = false;
    }

    /// Re-source data for a new date range.
    pub async fn update_for_range(&mut self, range: DateRange) {
        self.update_for_range_on(range, fiscal_calendar::today())
            .await;
    }

    pub async fn update_for_range_on(&mut self, range: DateRange, reference: NaiveDate) {
        self.loading = true;
        self.active_range = range;
        self.reconcile_on(reference).await;
        self.loading = false;
    }

    /// Select a single store, or clear back to all stores. Selecting a
    /// store drops any district selection.
    pub async fn set_store_filter(&mut self, store: Option<String>) {
        self.filter = match store {
            Some(number) => StoreFilter::Store(number),
            None => StoreFilter::All,
        };
        self.reconcile_on(fiscal_calendar::today()).await;
    }

    /// Select a district, or clear back to all stores. Selecting a district
    /// drops any store selection.
    pub async fn set_district_filter(&mut self, district: Option<String>) {
        self.filter = match district {
            Some(name) => StoreFilter::District(name),
            None => StoreFilter::All,
        };
        self.reconcile_on(fiscal_calendar::today()).await;
    }

    /// Change which trend-chart years are visible, backfilling snapshot
    /// history for any year not loaded yet.
    pub async fn enable_years(&mut self, enabled: EnabledYears) {
        self.enable_years_on(enabled, fiscal_calendar::today()).await;
    }

    pub async fn enable_years_on(&mut self, enabled: EnabledYears, reference: NaiveDate) {
        self.enabled_years = enabled;
        // walk the full depth; already-loaded years are skipped, so this
        // retries any year whose earlier fetch failed
        for years_back in 0..enabled.required_years_back() {
            self.load_year_snapshots(reference.year() - years_back).await;
        }
    }

    /// Discard all cached state and rerun the initial load.
    pub async fn refresh(&mut self) {
        self.refresh_on(fiscal_calendar::today()).await;
    }

    /// Backfill one calendar year of snapshot history outside the normal
    /// enable-years flow.
    pub async fn load_additional_year(&mut self, year: i32) {
        self.load_year_snapshots(year).await;
    }

    pub async fn refresh_on(&mut self, reference: NaiveDate) {
        self.refreshing = true;
        self.cache.clear();
        self.resolved = ResolvedData::default();
        self.loaded_years.clear();
        self.history_loaded = false;
        self.load_initial_on(reference).await;
        self.refreshing = false;
    }

    async fn reconcile_on(&mut self, reference: NaiveDate) {
        let resolved = self
            .reconciler
            .resolve_on(
                &self.active_range,
                &self.filter,
                &mut self.cache,
                &self.directory,
                reference,
            )
            .await;
        self.merge_synthetic_current_week(&resolved.all_stores, reference);
        self.resolved = resolved;
    }

    /// The snapshot feed lags the open week, so the trend charts would show
    /// a hole for it. Roll the freshly fetched daily rows up into synthetic
    /// per-store snapshots for the week in progress.
    fn merge_synthetic_current_week(&mut self, records: &[DailyPerformance], reference: NaiveDate) {
        let week = fiscal_calendar::current_week_on(reference);
        let mut per_store: BTreeMap<String, (Value, Vec<DailyPerformance>)> = BTreeMap::new();
        for day in records {
            if !day.date_naive().is_some_and(|d| week.contains(d)) {
                continue;
            }
            per_store
                .entry(day.store_number())
                .or_insert_with(|| (day.store_nbr.clone(), Vec::new()))
                .1
                .push(day.clone());
        }
        if per_store.is_empty() {
            return;
        }
        let synthetic: Vec<WeeklySnapshot> = per_store
            .values()
            .map(|(store_nbr, days)| normalizer::performance_to_snapshot(store_nbr, days, &week))
            .collect();
        self.cache.merge(synthetic);
    }

    async fn load_history_on(&mut self, reference: NaiveDate) {
        for years_back in 0..self.enabled_years.required_years_back() {
            self.load_year_snapshots(reference.year() - years_back).await;
        }
        self.history_loaded = true;
    }

    async fn load_year_snapshots(&mut self, year: i32) {
        if self.loaded_years.contains(&year) {
            return;
        }
        let (Some(start), Some(end)) = (
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year, 12, 31),
        ) else {
            return;
        };
        let range = DateRange::new(start, end);
        match self.api.fetch_snapshots(&range, &[]).await {
            Ok(rows) => {
                self.cache.merge(rows);
                self.loaded_years.insert(year);
            }
            Err(err) => {
                tracing::warn!(year, error = %err, "snapshot history fetch failed, year skipped");
            }
        }
    }

    /// The KPI bundle for the active range and filter, comparison values
    /// included. Recomputed on demand from the latest resolved data.
    pub fn kpis(&self) -> Kpi {
        kpi_bundle(&self.resolved.records, &self.resolved.comparison)
    }

    pub fn sales_trend(&self) -> SalesTrendSeries {
        self.sales_trend_on(fiscal_calendar::today())
    }

    pub fn sales_trend_on(&self, reference: NaiveDate) -> SalesTrendSeries {
        charts::sales_trend(
            self.cache.rows(),
            &self.filter,
            &self.directory,
            reference,
            self.enabled_years,
        )
    }

    pub fn labor_by_state(&self) -> Vec<LaborByStateRow> {
        self.labor_by_state_on(fiscal_calendar::today())
    }

    pub fn labor_by_state_on(&self, reference: NaiveDate) -> Vec<LaborByStateRow> {
        charts::labor_by_state(self.cache.rows(), &self.filter, &self.directory, reference)
    }

    pub fn cost_bars(&self) -> Vec<CostBarsPoint> {
        self.cost_bars_on(fiscal_calendar::today())
    }

    pub fn cost_bars_on(&self, reference: NaiveDate) -> Vec<CostBarsPoint> {
        charts::cost_bars(self.cache.rows(), &self.filter, &self.directory, reference)
    }

    /// Full-population gross sales per store for the comparative views,
    /// unaffected by the KPI filter.
    pub fn gross_sales_by_store(&self) -> std::collections::HashMap<String, f64> {
        metrics::gross_sales_by_store(&self.resolved.all_stores)
    }

    /// Per-store net-sales change against the comparison period, for the
    /// top/bottom performers table.
    pub fn comp_sales_by_store(&self) -> std::collections::HashMap<String, f64> {
        metrics::comp_sales_by_store(&self.resolved.records, &self.resolved.comparison)
    }

    pub fn stores(&self) -> &[StoreInfo] {
        self.directory.stores()
    }

    pub fn districts(&self) -> Vec<String> {
        self.directory.districts()
    }

    pub fn filter(&self) -> &StoreFilter {
        &self.filter
    }

    pub fn active_range(&self) -> DateRange {
        self.active_range
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing
    }

    /// Whether the multi-year snapshot history has finished loading; gates
    /// the trend charts' loading overlay.
    pub fn history_loaded(&self) -> bool {
        self.history_loaded
    }
}

fn kpi_bundle(records: &[DailyPerformance], comparison: &[DailyPerformance]) -> Kpi {
    let net_sales = metrics::net_sales(records);
    let guest_count = metrics::guest_count(records);
    let net_sales_comparison = metrics::net_sales(comparison);
    let guest_count_comparison = metrics::guest_count(comparison);

    Kpi {
        net_sales,
        net_sales_comparison,
        gross_sales: metrics::gross_sales(records),
        gross_sales_comparison: metrics::gross_sales(comparison),
        guest_count,
        guest_count_comparison,
        avg_check: metrics::avg_check(net_sales, guest_count),
        avg_check_comparison: metrics::avg_check(net_sales_comparison, guest_count_comparison),
        carryout_percent: metrics::carryout_percent(records),
        carryout_percent_comparison: metrics::carryout_percent(comparison),
        labor_percent: metrics::labor_percent(records),
        labor_percent_comparison: metrics::labor_percent(comparison),
        food_cost_percent: metrics::food_cost_percent(records),
        food_cost_percent_comparison: metrics::food_cost_percent(comparison),
        discounts_percent: metrics::discounts_percent(records),
        discounts_percent_comparison: metrics::discounts_percent(comparison),
        foundation_donations: metrics::foundation_donations(records),
        foundation_donations_comparison: metrics::foundation_donations(comparison),
        table_turn_time: metrics::table_turn_time(records),
        table_turn_time_comparison: metrics::table_turn_time(comparison),
    }
}
