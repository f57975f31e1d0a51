//! Chart-ready series computed from the weekly snapshot cache.
//!
//! All three shapers share the reconciler's filter predicate and read only
//! cached snapshots; a chart never triggers a fetch. Snapshots whose store
//! is missing from the directory stay in ungrouped totals but drop out of
//! state-grouped views.

use chrono::{Datelike, NaiveDate};
use shared::{
    CostBarsPoint, EnabledYears, LaborByStateRow, MonthValue, SalesTrendPoint, SalesTrendSeries,
    WeeklySnapshot, YearLabels,
};
use std::collections::BTreeMap;

use crate::domain::fiscal_calendar::month_abbrev;
use crate::domain::store_directory::{StoreDirectory, StoreFilter};

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn filtered<'a>(
    snapshots: &'a [WeeklySnapshot],
    filter: &'a StoreFilter,
    directory: &'a StoreDirectory,
) -> impl Iterator<Item = (&'a WeeklySnapshot, NaiveDate)> {
    snapshots
        .iter()
        .filter_map(|s| s.period_end_date().map(|d| (s, d)))
        .filter(move |(s, _)| filter.matches(&s.store_number(), directory))
}

/// Monthly sales grouped by how many years back each snapshot falls from
/// the reference year. All 12 month buckets are always present; buckets for
/// years the caller has not enabled are omitted from each point rather than
/// zeroed.
pub fn sales_trend(
    snapshots: &[WeeklySnapshot],
    filter: &StoreFilter,
    directory: &StoreDirectory,
    reference: NaiveDate,
    enabled: EnabledYears,
) -> SalesTrendSeries {
    let this_year = reference.year();
    // [month 0..12][years back 0..5]
    let mut buckets = [[0.0f64; 5]; 12];

    for (snapshot, period_end) in filtered(snapshots, filter, directory) {
        let years_back = this_year - period_end.year();
        if !(0..5).contains(&years_back) {
            continue;
        }
        buckets[period_end.month0() as usize][years_back as usize] += snapshot.sales_subtotal;
    }

    let data = (0..12)
        .map(|month| SalesTrendPoint {
            period: month_abbrev(month as u32 + 1).to_string(),
            ty: buckets[month][0],
            ly: buckets[month][1],
            ly2: enabled.two_years_ago.then_some(buckets[month][2]),
            ly3: enabled.three_years_ago.then_some(buckets[month][3]),
            ly4: enabled.four_years_ago.then_some(buckets[month][4]),
        })
        .collect();

    SalesTrendSeries {
        data,
        year_labels: YearLabels {
            current_year: this_year.to_string(),
            last_year: (this_year - 1).to_string(),
            two_years_ago: (this_year - 2).to_string(),
            three_years_ago: (this_year - 3).to_string(),
            four_years_ago: (this_year - 4).to_string(),
        },
    }
}

fn in_year_to_date(period_end: NaiveDate, reference: NaiveDate) -> bool {
    period_end.year() == reference.year() && period_end.month() <= reference.month()
}

/// Labor as a percent of sales per state per year-to-date month. States
/// come out sorted; snapshots for stores the directory cannot place are
/// excluded.
pub fn labor_by_state(
    snapshots: &[WeeklySnapshot],
    filter: &StoreFilter,
    directory: &StoreDirectory,
    reference: NaiveDate,
) -> Vec<LaborByStateRow> {
    let months = reference.month() as usize;
    // state -> per-month (labor, sales)
    let mut cells: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();

    for (snapshot, period_end) in filtered(snapshots, filter, directory) {
        if !in_year_to_date(period_end, reference) {
            continue;
        }
        let Some(state) = directory.state_of(&snapshot.store_number()) else {
            continue;
        };
        let row = cells
            .entry(state.to_string())
            .or_insert_with(|| vec![(0.0, 0.0); months]);
        let cell = &mut row[period_end.month0() as usize];
        cell.0 += snapshot.labor_dollars();
        cell.1 += snapshot.sales_subtotal;
    }

    cells
        .into_iter()
        .map(|(state, row)| LaborByStateRow {
            state,
            months: row
                .iter()
                .enumerate()
                .map(|(month, (labor, sales))| MonthValue {
                    month: month_abbrev(month as u32 + 1).to_string(),
                    value: if *sales > 0.0 {
                        round1(labor / sales * 100.0)
                    } else {
                        0.0
                    },
                })
                .collect(),
        })
        .collect()
}

/// Food, beer, and liquor cost percents per year-to-date month. Cost
/// dollars are reconstituted from each snapshot's sales and cost fraction
/// so mixed-volume weeks average correctly.
pub fn cost_bars(
    snapshots: &[WeeklySnapshot],
    filter: &StoreFilter,
    directory: &StoreDirectory,
    reference: NaiveDate,
) -> Vec<CostBarsPoint> {
    let months = reference.month() as usize;
    // per-month (sales, food, beer, liquor) dollars
    let mut cells = vec![(0.0f64, 0.0f64, 0.0f64, 0.0f64); months];

    for (snapshot, period_end) in filtered(snapshots, filter, directory) {
        if !in_year_to_date(period_end, reference) {
            continue;
        }
        let cell = &mut cells[period_end.month0() as usize];
        cell.0 += snapshot.sales_subtotal;
        cell.1 += snapshot.sales_subtotal * snapshot.food_cost_percent;
        cell.2 += snapshot.sales_subtotal * snapshot.beer_cost_percent;
        cell.3 += snapshot.sales_subtotal * snapshot.liquor_cost_percent;
    }

    cells
        .iter()
        .enumerate()
        .map(|(month, (sales, food, beer, liquor))| {
            let pct = |cost: f64| {
                if *sales > 0.0 {
                    round1(cost / sales * 100.0)
                } else {
                    0.0
                }
            };
            CostBarsPoint {
                period: month_abbrev(month as u32 + 1).to_string(),
                food: pct(*food),
                beer: pct(*beer),
                liquor: pct(*liquor),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared::StoreInfo;

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

    fn directory() -> StoreDirectory {
        StoreDirectory::new(vec![
            StoreInfo {
                store_nbr: "we101".into(),
                district: "North".into(),
                state: "OH".into(),
                ..Default::default()
            },
            StoreInfo {
                store_nbr: "we102".into(),
                district: "South".into(),
                state: "MI".into(),
                ..Default::default()
            },
        ])
    }

    #[test]
    fn test_sales_trend_buckets_by_month_and_years_back() {
        let snapshots = vec![
            snap("101", "2024-03-10", 600.0),
            snap("101", "2024-03-17", 400.0),
            snap("101", "2023-03-12", 800.0),
            snap("101", "2022-03-13", 700.0),
        ];
        let series = sales_trend(
            &snapshots,
            &StoreFilter::All,
            &StoreDirectory::default(),
            date("2024-06-12"),
            EnabledYears::default(),
        );

        assert_eq!(series.data.len(), 12);
        let march = &series.data[2];
        assert_eq!(march.period, "Mar");
        assert_eq!(march.ty, 1_000.0);
        assert_eq!(march.ly, 800.0);
        // two-years-ago data exists but the bucket is disabled
        assert_eq!(march.ly2, None);
        assert_eq!(series.data[0].ty, 0.0);
        assert_eq!(series.year_labels.current_year, "2024");
        assert_eq!(series.year_labels.four_years_ago, "2020");
    }

    #[test]
    fn test_sales_trend_enabled_years_surface() {
        let snapshots = vec![snap("101", "2022-03-13", 700.0)];
        let enabled = EnabledYears {
            two_years_ago: true,
            ..Default::default()
        };
        let series = sales_trend(
            &snapshots,
            &StoreFilter::All,
            &StoreDirectory::default(),
            date("2024-06-12"),
            enabled,
        );
        assert_eq!(series.data[2].ly2, Some(700.0));
        assert_eq!(series.data[2].ly3, None);
    }

    #[test]
    fn test_sales_trend_respects_store_filter() {
        let snapshots = vec![
            snap("we101", "2024-03-10", 600.0),
            snap("we102", "2024-03-10", 999.0),
        ];
        let series = sales_trend(
            &snapshots,
            &StoreFilter::Store("101".into()),
            &directory(),
            date("2024-06-12"),
            EnabledYears::default(),
        );
        assert_eq!(series.data[2].ty, 600.0);
    }

    #[test]
    fn test_labor_by_state_rounds_and_sorts() {
        let mut s1 = snap("we101", "2024-02-11", 1_000.0);
        s1.total_labor_cost = Some(333.0);
        let mut s2 = snap("we102", "2024-02-11", 1_000.0);
        s2.total_labor_cost = Some(250.0);
        // store the directory does not know: dropped from the grouping
        let mut s3 = snap("999", "2024-02-11", 1_000.0);
        s3.total_labor_cost = Some(900.0);

        let rows = labor_by_state(
            &[s1, s2, s3],
            &StoreFilter::All,
            &directory(),
            date("2024-06-12"),
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].state, "MI");
        assert_eq!(rows[1].state, "OH");
        assert_eq!(rows[0].months.len(), 6);
        assert_eq!(rows[0].months[1].month, "Feb");
        assert_eq!(rows[0].months[1].value, 25.0);
        assert_eq!(rows[1].months[1].value, 33.3);
        // no sales in January: zero, not NaN
        assert_eq!(rows[0].months[0].value, 0.0);
    }

    #[test]
    fn test_labor_by_state_excludes_prior_years() {
        let mut s1 = snap("we101", "2023-02-12", 1_000.0);
        s1.total_labor_cost = Some(500.0);
        let rows = labor_by_state(
            &[s1],
            &StoreFilter::All,
            &directory(),
            date("2024-06-12"),
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn test_cost_bars_year_to_date_percents() {
        let mut s1 = snap("101", "2024-01-07", 2_000.0);
        s1.food_cost_percent = 0.30;
        s1.beer_cost_percent = 0.05;
        let mut s2 = snap("101", "2024-01-14", 1_000.0);
        s2.food_cost_percent = 0.24;
        s2.liquor_cost_percent = 0.09;
        // beyond the reference month: excluded
        let mut s3 = snap("101", "2024-07-07", 9_000.0);
        s3.food_cost_percent = 0.99;

        let bars = cost_bars(
            &[s1, s2, s3],
            &StoreFilter::All,
            &StoreDirectory::default(),
            date("2024-06-12"),
        );

        assert_eq!(bars.len(), 6);
        assert_eq!(bars[0].period, "Jan");
        // (2000*0.30 + 1000*0.24) / 3000 = 28%
        assert_eq!(bars[0].food, 28.0);
        // 2000*0.05 / 3000 = 3.333 -> 3.3
        assert_eq!(bars[0].beer, 3.3);
        assert_eq!(bars[0].liquor, 3.0);
        // empty month renders as an all-zero row
        assert_eq!(bars[1].food, 0.0);
    }
}
