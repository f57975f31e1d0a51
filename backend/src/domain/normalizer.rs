//! Shape unification between the two upstream record kinds.
//!
//! Weekly snapshots and daily performance rows carry overlapping but
//! differently named fields. Converting a snapshot into the daily shape
//! lets every reducer run over one record type. The conversion is lossy in
//! one direction: a whole week becomes a single synthetic "day", so a
//! snapshot contributes one term to a sum, never seven.

use chrono::Datelike;
use serde_json::{json, Map, Value};
use shared::{DailyPerformance, DateRange, WeeklySnapshot};

use crate::domain::metrics;

/// Convert one weekly rollup into the daily-performance shape.
///
/// Discounts are derived, not copied: the snapshot records a discount cost
/// fraction rather than a dollar figure. Fields with no weekly equivalent
/// (entrees, web total) are fixed at zero. Everything else on the snapshot
/// is carried through the overflow map so downstream consumers can still
/// read raw weekly figures.
pub fn snapshot_to_performance(snapshot: &WeeklySnapshot) -> DailyPerformance {
    let labor_cost = json!(snapshot.labor_dollars());
    let labor_hours = json!(snapshot.resolved_labor_hours());

    let mut extra = Map::new();
    if let Ok(Value::Object(raw)) = serde_json::to_value(snapshot) {
        extra = raw;
    }

    DailyPerformance {
        date: snapshot.period_end.clone(),
        store_nbr: snapshot.store_nbr.clone(),
        sales_sub_total: json!(snapshot.sales_subtotal),
        discounts: json!(snapshot.sales_subtotal * snapshot.discount_cost_percent),
        covers: json!(snapshot.covers),
        entrees: json!(0.0),
        web_total: json!(0.0),
        to_go: json!(snapshot.to_go),
        foundation_donations: json!(snapshot.foundation_donations),
        total_labor_cost: labor_cost,
        total_labor_dollars: Value::Null,
        total_labor_hours: labor_hours,
        turn_parties: Value::Null,
        turn_total_minutes: Value::Null,
        labor: Value::Null,
        extra,
    }
}

/// Convert every snapshot in a slice.
pub fn snapshots_to_performance(snapshots: &[WeeklySnapshot]) -> Vec<DailyPerformance> {
    snapshots.iter().map(snapshot_to_performance).collect()
}

/// Roll accumulated daily rows for one store up into a synthetic snapshot
/// for the containing week.
///
/// Used for the in-progress week, which the snapshot feed has not published
/// yet. The discount fraction is back-derived from summed dollars so the
/// snapshot round-trips through [`snapshot_to_performance`].
pub fn performance_to_snapshot(
    store_nbr: &Value,
    days: &[DailyPerformance],
    week: &DateRange,
) -> WeeklySnapshot {
    let gross = metrics::gross_sales(days);
    let discounts: f64 = days.iter().map(|d| metrics::to_number(&d.discounts)).sum();
    let labor: f64 = days.iter().map(metrics::resolve_labor_cost).sum();
    let hours: f64 = days
        .iter()
        .map(|d| metrics::to_number(&d.total_labor_hours))
        .sum();
    let iso = week.end.iso_week();

    WeeklySnapshot {
        store_nbr: store_nbr.clone(),
        iso_year: iso.year(),
        week_number: iso.week(),
        period_end: shared::format_api_date(week.end),
        sales_subtotal: gross,
        total_labor_cost: (labor != 0.0).then_some(labor),
        total_labor_hours: (hours != 0.0).then_some(hours),
        revenue_per_labor_hr: if hours > 0.0 { gross / hours } else { 0.0 },
        covers: metrics::guest_count(days),
        discount_cost_percent: if gross > 0.0 { discounts / gross } else { 0.0 },
        to_go: days.iter().map(|d| metrics::to_number(&d.to_go)).sum(),
        foundation_donations: metrics::foundation_donations(days),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn snapshot() -> WeeklySnapshot {
        WeeklySnapshot {
            store_nbr: json!("we101"),
            iso_year: 2024,
            week_number: 23,
            period_end: "2024-06-09".into(),
            sales_subtotal: 10_000.0,
            total_labor_cost: Some(2_800.0),
            covers: 640.0,
            discount_cost_percent: 0.04,
            to_go: 1_500.0,
            foundation_donations: 75.0,
            food_cost_percent: 0.29,
            ..Default::default()
        }
    }

    #[test]
    fn test_snapshot_maps_to_daily_shape() {
        let day = snapshot_to_performance(&snapshot());
        assert_eq!(day.date, "2024-06-09");
        assert_eq!(day.store_number(), "we101");
        assert_eq!(metrics::to_number(&day.sales_sub_total), 10_000.0);
        assert_eq!(metrics::to_number(&day.discounts), 400.0);
        assert_eq!(metrics::to_number(&day.entrees), 0.0);
        assert_eq!(metrics::to_number(&day.web_total), 0.0);
        assert_eq!(metrics::to_number(&day.to_go), 1_500.0);
        assert_eq!(metrics::to_number(&day.foundation_donations), 75.0);
        assert_eq!(metrics::to_number(&day.total_labor_cost), 2_800.0);
    }

    #[test]
    fn test_labor_two_name_fallback() {
        let mut snap = snapshot();
        snap.total_labor_cost = None;
        snap.total_labor_dollars = Some(2_650.0);
        let day = snapshot_to_performance(&snap);
        assert_eq!(metrics::to_number(&day.total_labor_cost), 2_650.0);

        snap.total_labor_dollars = None;
        let day = snapshot_to_performance(&snap);
        assert_eq!(metrics::to_number(&day.total_labor_cost), 0.0);
    }

    #[test]
    fn test_net_sales_round_trip() {
        let snap = snapshot();
        let day = snapshot_to_performance(&snap);
        let net = metrics::net_sales(std::slice::from_ref(&day));
        let expected = snap.sales_subtotal - snap.sales_subtotal * snap.discount_cost_percent;
        assert_eq!(net, expected);
    }

    #[test]
    fn test_raw_weekly_fields_survive_in_overflow() {
        let day = snapshot_to_performance(&snapshot());
        assert_eq!(
            metrics::to_number(day.extra.get("FoodCostPercent").unwrap()),
            0.29
        );
    }

    #[test]
    fn test_one_snapshot_contributes_one_term() {
        let days = snapshots_to_performance(&[snapshot(), snapshot()]);
        assert_eq!(days.len(), 2);
        assert_eq!(metrics::gross_sales(&days), 20_000.0);
    }

    #[test]
    fn test_performance_rollup_round_trips() {
        let week = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 9).unwrap(),
        );
        let mut d1 = DailyPerformance {
            date: "2024-06-03".into(),
            store_nbr: json!("101"),
            sales_sub_total: json!(1_000.0),
            discounts: json!(50.0),
            covers: json!(80),
            ..Default::default()
        };
        d1.total_labor_cost = json!(300.0);
        let mut d2 = d1.clone();
        d2.date = "2024-06-04".into();

        let snap = performance_to_snapshot(&json!("101"), &[d1, d2], &week);
        assert_eq!(snap.period_end, "2024-06-09");
        assert_eq!(snap.sales_subtotal, 2_000.0);
        assert_eq!(snap.total_labor_cost, Some(600.0));
        assert_eq!(snap.covers, 160.0);
        assert_eq!(snap.discount_cost_percent, 0.05);
        assert_eq!(snap.iso_year, 2024);
        assert_eq!(snap.week_number, 23);

        let back = snapshot_to_performance(&snap);
        assert_eq!(metrics::net_sales(std::slice::from_ref(&back)), 1_900.0);
    }
}
