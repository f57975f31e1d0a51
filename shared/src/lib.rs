use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One store's identity and grouping attributes from the store directory.
///
/// Store numbers may carry a non-numeric prefix in their canonical form
/// (e.g. a brand code before the digits). The raw value is preserved here;
/// prefix stripping for grouping happens in the domain layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreInfo {
    #[serde(rename = "StoreNbr", default)]
    pub store_nbr: String,
    #[serde(rename = "Company", default)]
    pub company: String,
    #[serde(rename = "District", default)]
    pub district: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Royalty", default, deserialize_with = "de_number")]
    pub royalty: f64,
    /// Fields the directory sends that we do not model explicitly.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One store's activity for one calendar day, as the upstream API reports it.
///
/// The monetary and count fields are kept as raw JSON values because the
/// upstream feed is inconsistent: the same field can arrive as a number, a
/// currency-formatted string ("$1,234.50"), a percent string, null, or be
/// absent entirely. Every consumer must run these through the numeric
/// coercion in the domain layer before doing arithmetic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyPerformance {
    #[serde(rename = "Date", default)]
    pub date: String,
    #[serde(rename = "StoreNbr", default)]
    pub store_nbr: Value,
    #[serde(rename = "SalesSubTotal", default)]
    pub sales_sub_total: Value,
    #[serde(rename = "Discounts", default)]
    pub discounts: Value,
    #[serde(rename = "Covers", default)]
    pub covers: Value,
    #[serde(rename = "Entrees", default)]
    pub entrees: Value,
    #[serde(rename = "ToGo", default)]
    pub to_go: Value,
    #[serde(rename = "WebTotal", default)]
    pub web_total: Value,
    #[serde(rename = "FoundationDonations", default)]
    pub foundation_donations: Value,
    #[serde(default)]
    pub total_labor_cost: Value,
    #[serde(default)]
    pub total_labor_dollars: Value,
    #[serde(default)]
    pub total_labor_hours: Value,
    #[serde(rename = "TurnParties", default)]
    pub turn_parties: Value,
    #[serde(rename = "TurnTotalMinutes", default)]
    pub turn_total_minutes: Value,
    /// Nested labor breakdown object, when the feed sends one.
    #[serde(default)]
    pub labor: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DailyPerformance {
    /// Store number as a string, whatever shape the feed used for it.
    pub fn store_number(&self) -> String {
        value_to_string(&self.store_nbr)
    }

    /// Calendar date of this record, when parseable as `YYYY-MM-DD`
    /// (a trailing time component is ignored).
    pub fn date_naive(&self) -> Option<NaiveDate> {
        parse_api_date(&self.date)
    }
}

/// One store's rollup for one fiscal week, keyed by `period_end` (the Sunday
/// closing the week). Cost figures are decimal fractions of sales
/// (0.225 = 22.5%), not dollar amounts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeeklySnapshot {
    #[serde(rename = "StoreNbr", default)]
    pub store_nbr: Value,
    #[serde(default)]
    pub iso_year: i32,
    #[serde(default)]
    pub week_number: u32,
    #[serde(default)]
    pub period_end: String,
    #[serde(rename = "SalesSubtotal", default, deserialize_with = "de_number")]
    pub sales_subtotal: f64,
    #[serde(rename = "FoodSales", default, deserialize_with = "de_number")]
    pub food_sales: f64,
    #[serde(rename = "BeerSales", default, deserialize_with = "de_number")]
    pub beer_sales: f64,
    #[serde(rename = "LiquorSales", default, deserialize_with = "de_number")]
    pub liquor_sales: f64,
    /// Labor dollars; the feed has used both of these names over time.
    #[serde(default, deserialize_with = "de_opt_number")]
    pub total_labor_cost: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub total_labor_dollars: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub labor_hours: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub total_labor_hours: Option<f64>,
    #[serde(default, deserialize_with = "de_number")]
    pub revenue_per_labor_hr: f64,
    #[serde(default, deserialize_with = "de_number")]
    pub covers: f64,
    #[serde(rename = "FoodCost", default, deserialize_with = "de_number")]
    pub food_cost: f64,
    #[serde(rename = "PaperCost", default, deserialize_with = "de_number")]
    pub paper_cost: f64,
    #[serde(rename = "LiquorCost", default, deserialize_with = "de_number")]
    pub liquor_cost: f64,
    #[serde(rename = "BeerCost", default, deserialize_with = "de_number")]
    pub beer_cost: f64,
    #[serde(rename = "AlcoholCost", default, deserialize_with = "de_number")]
    pub alcohol_cost: f64,
    #[serde(rename = "DiscountCostPercent", default, deserialize_with = "de_number")]
    pub discount_cost_percent: f64,
    #[serde(rename = "FoodCostPercent", default, deserialize_with = "de_number")]
    pub food_cost_percent: f64,
    #[serde(rename = "LiquorCostPercent", default, deserialize_with = "de_number")]
    pub liquor_cost_percent: f64,
    #[serde(rename = "BeerCostPercent", default, deserialize_with = "de_number")]
    pub beer_cost_percent: f64,
    #[serde(rename = "AlcoholCostPercent", default, deserialize_with = "de_number")]
    pub alcohol_cost_percent: f64,
    #[serde(rename = "LiquorPourCostPercent", default, deserialize_with = "de_number")]
    pub liquor_pour_cost_percent: f64,
    #[serde(rename = "BeerPourCostPercent", default, deserialize_with = "de_number")]
    pub beer_pour_cost_percent: f64,
    #[serde(rename = "AlcoholPourCostPercent", default, deserialize_with = "de_number")]
    pub alcohol_pour_cost_percent: f64,
    #[serde(default, deserialize_with = "de_number")]
    pub flpda_net2: f64,
    #[serde(default, deserialize_with = "de_number")]
    pub total_flpda_pct: f64,
    #[serde(rename = "ToGo", default, deserialize_with = "de_number")]
    pub to_go: f64,
    #[serde(rename = "FoundationDonations", default, deserialize_with = "de_number")]
    pub foundation_donations: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WeeklySnapshot {
    pub fn store_number(&self) -> String {
        value_to_string(&self.store_nbr)
    }

    /// The Sunday closing this fiscal week, when parseable.
    pub fn period_end_date(&self) -> Option<NaiveDate> {
        parse_api_date(&self.period_end)
    }

    /// Labor dollars resolved across the feed's two historical field names.
    pub fn labor_dollars(&self) -> f64 {
        self.total_labor_cost
            .or(self.total_labor_dollars)
            .unwrap_or(0.0)
    }

    /// Labor hours resolved across the feed's two historical field names.
    pub fn resolved_labor_hours(&self) -> f64 {
        self.labor_hours.or(self.total_labor_hours).unwrap_or(0.0)
    }
}

/// An inclusive calendar date range. Fiscal periods (week, month, year) are
/// values of this type, always Monday-to-Sunday aligned at the boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whole days between start and end (6 for a Monday-Sunday week).
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Number of days covered, both endpoints included.
    pub fn day_count(&self) -> i64 {
        self.span_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }
}

/// The flat KPI bundle the dashboard cards render, each metric paired with
/// its comparison-period value (prior year, or prior week when the current
/// week is selected). Recomputed fresh on every render; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub net_sales: f64,
    pub net_sales_comparison: f64,
    pub gross_sales: f64,
    pub gross_sales_comparison: f64,
    pub guest_count: f64,
    pub guest_count_comparison: f64,
    pub avg_check: f64,
    pub avg_check_comparison: f64,
    pub carryout_percent: f64,
    pub carryout_percent_comparison: f64,
    pub labor_percent: f64,
    pub labor_percent_comparison: f64,
    pub food_cost_percent: f64,
    pub food_cost_percent_comparison: f64,
    pub discounts_percent: f64,
    pub discounts_percent_comparison: f64,
    pub foundation_donations: f64,
    pub foundation_donations_comparison: f64,
    pub table_turn_time: f64,
    pub table_turn_time_comparison: f64,
}

/// One month bucket of the sales trend chart. `ty` is this year, `ly` last
/// year; deeper history buckets are present only when the caller enabled
/// that comparison year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesTrendPoint {
    pub period: String,
    pub ty: f64,
    pub ly: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ly2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ly3: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ly4: Option<f64>,
}

/// Resolved calendar-year labels for the trend chart legend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearLabels {
    pub current_year: String,
    pub last_year: String,
    pub two_years_ago: String,
    pub three_years_ago: String,
    pub four_years_ago: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesTrendSeries {
    pub data: Vec<SalesTrendPoint>,
    pub year_labels: YearLabels,
}

/// Which deep-history comparison years the trend chart should include.
/// This year and last year are always on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnabledYears {
    pub two_years_ago: bool,
    pub three_years_ago: bool,
    pub four_years_ago: bool,
}

impl EnabledYears {
    /// How many calendar years of snapshot history the chart needs.
    pub fn required_years_back(&self) -> i32 {
        if self.four_years_ago {
            5
        } else if self.three_years_ago {
            4
        } else if self.two_years_ago {
            3
        } else {
            2
        }
    }
}

/// One (month, value) cell of the labor-by-state chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthValue {
    pub month: String,
    pub value: f64,
}

/// One state row of the labor-by-state chart: labor as a percent of sales
/// per year-to-date month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaborByStateRow {
    pub state: String,
    pub months: Vec<MonthValue>,
}

/// One month of the cost bars chart: food/beer/liquor cost as a percent of
/// sales.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBarsPoint {
    pub period: String,
    pub food: f64,
    pub beer: f64,
    pub liquor: f64,
}

/// Coerce a raw feed value to a finite number. Total: never fails.
///
/// Strings shed currency symbols, commas, spaces, percent signs, and
/// parentheses before parsing; null, unparsable, and non-finite values
/// become 0. The feed sends the same field as a number in one response and
/// a formatted string in the next, so every numeric field funnels through
/// here either at deserialization time or in the reducers.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => {
            let v = n.as_f64().unwrap_or(0.0);
            if v.is_finite() {
                v
            } else {
                0.0
            }
        }
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' ' | '%' | '(' | ')'))
                .collect();
            if cleaned.is_empty() {
                return 0.0;
            }
            match cleaned.parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => 0.0,
            }
        }
        _ => 0.0,
    }
}

fn de_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_number(&value))
}

fn de_opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(coerce_number(&other)),
    })
}

/// Render a JSON value as a plain string identifier. Strings pass through,
/// numbers are formatted, anything else is empty.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Parse the `YYYY-MM-DD` date format used across the API boundary. A
/// trailing `T...` time component is tolerated and ignored.
pub fn parse_api_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.split('T').next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Format a date for the API boundary as `YYYY-MM-DD`.
pub fn format_api_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
