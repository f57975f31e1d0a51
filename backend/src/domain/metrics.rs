//! Numeric coercion and KPI reducers.
//!
//! Every number that crosses the API boundary goes through [`to_number`]
//! before arithmetic: the upstream feed mixes plain numbers with
//! currency-formatted strings, percent strings, nulls, and missing fields.
//! Reducers fold a slice of daily-performance records into scalars or
//! per-store maps and are total over their input: an empty slice yields
//! zero or an empty map, never an error.

use serde_json::Value;
use shared::DailyPerformance;
use std::collections::HashMap;

/// Job-category labor dollar fields, in the order the upstream schema lists
/// them. Used when no rolled-up labor total is present.
const LABOR_CATEGORY_FIELDS: [&str; 11] = [
    "ServerDollars",
    "KitchenDollars",
    "BartenderDollars",
    "ManagerDollars",
    "BarBackDollars",
    "HostDollars",
    "ShiftMgrDollars",
    "TrainerDollars",
    "TraineeDollars",
    "NonKnownJobDollars",
    "TeamDollars",
];

/// Coerce a raw feed value to a finite number. Total: never fails.
///
/// Null and empty strings become 0. Strings are stripped of currency
/// symbols, commas, spaces, percent signs, and parentheses before parsing;
/// anything unparsable becomes 0. Non-finite numbers become 0. The same
/// rules run at snapshot deserialization time, so both record kinds share
/// one coercion.
pub fn to_number(value: &Value) -> f64 {
    shared::coerce_number(value)
}

fn sum_field<F>(data: &[DailyPerformance], field: F) -> f64
where
    F: Fn(&DailyPerformance) -> &Value,
{
    data.iter().map(|day| to_number(field(day))).sum()
}

/// Gross sales: the sales subtotal summed across records.
pub fn gross_sales(data: &[DailyPerformance]) -> f64 {
    sum_field(data, |d| &d.sales_sub_total)
}

/// Net sales: sales subtotal less discounts, summed across records.
pub fn net_sales(data: &[DailyPerformance]) -> f64 {
    data.iter()
        .map(|d| to_number(&d.sales_sub_total) - to_number(&d.discounts))
        .sum()
}

/// Guest count: covers summed across records.
pub fn guest_count(data: &[DailyPerformance]) -> f64 {
    sum_field(data, |d| &d.covers)
}

/// Average check: net sales per guest. Zero guests means zero, not a
/// division error.
pub fn avg_check(net_sales: f64, guest_count: f64) -> f64 {
    if guest_count > 0.0 {
        net_sales / guest_count
    } else {
        0.0
    }
}

/// To-go sales as a percent of gross sales.
pub fn carryout_percent(data: &[DailyPerformance]) -> f64 {
    let gross = gross_sales(data);
    if gross > 0.0 {
        sum_field(data, |d| &d.to_go) / gross * 100.0
    } else {
        0.0
    }
}

/// Discounts as a percent of gross sales.
pub fn discounts_percent(data: &[DailyPerformance]) -> f64 {
    let gross = gross_sales(data);
    if gross > 0.0 {
        sum_field(data, |d| &d.discounts) / gross * 100.0
    } else {
        0.0
    }
}

/// Foundation donation dollars summed across records.
pub fn foundation_donations(data: &[DailyPerformance]) -> f64 {
    sum_field(data, |d| &d.foundation_donations)
}

/// Sum the named job-category dollar fields found on a JSON object.
fn sum_labor_categories(obj: &Value) -> f64 {
    LABOR_CATEGORY_FIELDS
        .iter()
        .map(|field| to_number(obj.get(*field).unwrap_or(&Value::Null)))
        .sum()
}

/// Labor cost for one record, resolved through an ordered fallback chain.
///
/// The feed has shipped labor under several shapes over time; the first
/// accessor that yields a non-zero value wins:
/// 1. a rolled-up total on the record (`total_labor_cost`,
///    `total_labor_dollars`, `TotalLaborCost`),
/// 2. totals or job-category dollars inside a nested `labor` object,
/// 3. the job-category dollar fields at the top level.
pub fn resolve_labor_cost(day: &DailyPerformance) -> f64 {
    for direct in [
        to_number(&day.total_labor_cost),
        to_number(&day.total_labor_dollars),
        to_number(day.extra.get("TotalLaborCost").unwrap_or(&Value::Null)),
    ] {
        if direct != 0.0 {
            return direct;
        }
    }

    if day.labor.is_object() {
        for key in ["total_cost", "total_dollars", "cost", "dollars"] {
            let total = to_number(day.labor.get(key).unwrap_or(&Value::Null));
            if total != 0.0 {
                return total;
            }
        }
        let categories = sum_labor_categories(&day.labor);
        if categories != 0.0 {
            return categories;
        }
    }

    LABOR_CATEGORY_FIELDS
        .iter()
        .map(|field| to_number(day.extra.get(*field).unwrap_or(&Value::Null)))
        .sum()
}

/// Labor cost as a percent of gross sales.
pub fn labor_percent(data: &[DailyPerformance]) -> f64 {
    let gross = gross_sales(data);
    if gross <= 0.0 {
        return 0.0;
    }
    let labor: f64 = data.iter().map(resolve_labor_cost).sum();
    labor / gross * 100.0
}

/// Food cost as a percent of gross sales, sales-weighted across records.
///
/// Daily rows do not carry food cost; the fraction rides along on rows
/// normalized from weekly snapshots and contributes in proportion to each
/// row's sales.
pub fn food_cost_percent(data: &[DailyPerformance]) -> f64 {
    let gross = gross_sales(data);
    if gross <= 0.0 {
        return 0.0;
    }
    let cost: f64 = data
        .iter()
        .map(|d| {
            let sales = to_number(&d.sales_sub_total);
            let pct = to_number(d.extra.get("FoodCostPercent").unwrap_or(&Value::Null));
            sales * pct
        })
        .sum();
    cost / gross * 100.0
}

/// Average minutes a seated party holds its table.
pub fn table_turn_time(data: &[DailyPerformance]) -> f64 {
    let parties = sum_field(data, |d| &d.turn_parties);
    if parties > 0.0 {
        sum_field(data, |d| &d.turn_total_minutes) / parties
    } else {
        0.0
    }
}

fn net_sales_by_store(data: &[DailyPerformance]) -> HashMap<String, f64> {
    let mut by_store: HashMap<String, f64> = HashMap::new();
    for day in data {
        let net = to_number(&day.sales_sub_total) - to_number(&day.discounts);
        *by_store.entry(day.store_number()).or_insert(0.0) += net;
    }
    by_store
}

/// Comparable-sales percent change per store: how this period's net sales
/// compare to the comparison period's, store by store.
///
/// Stores present only in `current` get an entry (0 when there is nothing to
/// compare against); stores absent from `current` are not reported at all.
pub fn comp_sales_by_store(
    current: &[DailyPerformance],
    comparison: &[DailyPerformance],
) -> HashMap<String, f64> {
    let current_by_store = net_sales_by_store(current);
    let comparison_by_store = net_sales_by_store(comparison);

    current_by_store
        .into_iter()
        .map(|(store, current_net)| {
            let comparison_net = comparison_by_store.get(&store).copied().unwrap_or(0.0);
            let pct = if comparison_net > 0.0 {
                (current_net - comparison_net) / comparison_net * 100.0
            } else {
                0.0
            };
            (store, pct)
        })
        .collect()
}

/// Gross sales summed per store number. Store identity is the raw string;
/// callers strip display prefixes themselves.
pub fn gross_sales_by_store(data: &[DailyPerformance]) -> HashMap<String, f64> {
    let mut by_store: HashMap<String, f64> = HashMap::new();
    for day in data {
        *by_store.entry(day.store_number()).or_insert(0.0) += to_number(&day.sales_sub_total);
    }
    by_store
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(store: &str, sales: Value, discounts: Value, covers: Value) -> DailyPerformance {
        DailyPerformance {
            date: "2024-06-03".into(),
            store_nbr: json!(store),
            sales_sub_total: sales,
            discounts,
            covers,
            ..Default::default()
        }
    }

    #[test]
    fn test_to_number_totality() {
        assert_eq!(to_number(&json!(null)), 0.0);
        assert_eq!(to_number(&json!("")), 0.0);
        assert_eq!(to_number(&json!(42.5)), 42.5);
        assert_eq!(to_number(&json!("$1,234.50")), 1234.5);
        assert_eq!(to_number(&json!("12%")), 12.0);
        assert_eq!(to_number(&json!("(3.5)")), 3.5);
        assert_eq!(to_number(&json!(" 7 ")), 7.0);
        assert_eq!(to_number(&json!("garbage")), 0.0);
        assert_eq!(to_number(&json!([1, 2])), 0.0);
        assert_eq!(to_number(&json!({"a": 1})), 0.0);
    }

    #[test]
    fn test_to_number_idempotent() {
        for raw in [json!("$1,234.50"), json!(null), json!("12%"), json!(-8.25)] {
            let once = to_number(&raw);
            let twice = to_number(&json!(once));
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_empty_input_yields_zero() {
        let empty: Vec<DailyPerformance> = vec![];
        assert_eq!(gross_sales(&empty), 0.0);
        assert_eq!(net_sales(&empty), 0.0);
        assert_eq!(guest_count(&empty), 0.0);
        assert_eq!(carryout_percent(&empty), 0.0);
        assert_eq!(labor_percent(&empty), 0.0);
        assert_eq!(table_turn_time(&empty), 0.0);
        assert!(gross_sales_by_store(&empty).is_empty());
    }

    #[test]
    fn test_net_never_exceeds_gross_with_nonnegative_discounts() {
        let data = vec![
            day("101", json!(1000.0), json!(50.0), json!(80)),
            day("101", json!("$2,000"), json!("25"), json!(120)),
            day("102", json!(500.0), json!(0), json!(40)),
        ];
        assert!(net_sales(&data) <= gross_sales(&data));
        assert_eq!(gross_sales(&data), 3500.0);
        assert_eq!(net_sales(&data), 3425.0);
        assert_eq!(guest_count(&data), 240.0);
    }

    #[test]
    fn test_avg_check_zero_guests() {
        assert_eq!(avg_check(1234.0, 0.0), 0.0);
        assert_eq!(avg_check(0.0, 0.0), 0.0);
        assert_eq!(avg_check(100.0, 4.0), 25.0);
    }

    #[test]
    fn test_carryout_and_discount_percents() {
        let mut d1 = day("101", json!(1000.0), json!(100.0), json!(50));
        d1.to_go = json!(250.0);
        assert_eq!(carryout_percent(&[d1.clone()]), 25.0);
        assert_eq!(discounts_percent(&[d1]), 10.0);
    }

    #[test]
    fn test_labor_direct_total_wins() {
        let mut d1 = day("101", json!(1000.0), json!(0), json!(0));
        d1.total_labor_cost = json!("$300");
        assert_eq!(labor_percent(&[d1]), 30.0);
    }

    #[test]
    fn test_labor_nested_object_fallback() {
        let mut d1 = day("101", json!(1000.0), json!(0), json!(0));
        d1.labor = json!({
            "ServerDollars": 100.0,
            "KitchenDollars": 120.0,
            "HostDollars": "30"
        });
        assert_eq!(labor_percent(&[d1]), 25.0);
    }

    #[test]
    fn test_labor_top_level_category_fallback() {
        let mut d1 = day("101", json!(1000.0), json!(0), json!(0));
        d1.extra.insert("ServerDollars".into(), json!(150.0));
        d1.extra.insert("ManagerDollars".into(), json!(50.0));
        assert_eq!(labor_percent(&[d1]), 20.0);
    }

    #[test]
    fn test_labor_zero_sales_is_zero() {
        let mut d1 = day("101", json!(0), json!(0), json!(0));
        d1.total_labor_cost = json!(500.0);
        assert_eq!(labor_percent(&[d1]), 0.0);
    }

    #[test]
    fn test_food_cost_percent_sales_weighted() {
        let mut d1 = day("101", json!(2000.0), json!(0), json!(0));
        d1.extra.insert("FoodCostPercent".into(), json!(0.30));
        let mut d2 = day("101", json!(1000.0), json!(0), json!(0));
        d2.extra.insert("FoodCostPercent".into(), json!(0.24));
        assert!((food_cost_percent(&[d1, d2]) - 28.0).abs() < 1e-9);
    }

    #[test]
    fn test_table_turn_time() {
        let mut d1 = day("101", json!(0), json!(0), json!(0));
        d1.turn_parties = json!(10);
        d1.turn_total_minutes = json!(450);
        let mut d2 = day("101", json!(0), json!(0), json!(0));
        d2.turn_parties = json!(5);
        d2.turn_total_minutes = json!(300);
        assert_eq!(table_turn_time(&[d1, d2]), 50.0);
    }

    #[test]
    fn test_comp_sales_by_store() {
        let current = vec![
            day("101", json!(1100.0), json!(0), json!(0)),
            day("102", json!(500.0), json!(0), json!(0)),
        ];
        let comparison = vec![
            day("101", json!(1000.0), json!(0), json!(0)),
            // store 103 only exists in the comparison period
            day("103", json!(900.0), json!(0), json!(0)),
        ];

        let comps = comp_sales_by_store(&current, &comparison);
        assert!((comps["101"] - 10.0).abs() < 1e-9);
        // no comparison-period sales: reported as 0, not infinity
        assert_eq!(comps["102"], 0.0);
        // absent from the current period: not reported at all
        assert!(!comps.contains_key("103"));
    }

    #[test]
    fn test_gross_sales_by_store_groups_raw_identity() {
        let data = vec![
            day("we101", json!(100.0), json!(0), json!(0)),
            day("we101", json!("$50"), json!(0), json!(0)),
            day("102", json!(25.0), json!(0), json!(0)),
        ];
        let by_store = gross_sales_by_store(&data);
        assert_eq!(by_store["we101"], 150.0);
        assert_eq!(by_store["102"], 25.0);
    }
}
