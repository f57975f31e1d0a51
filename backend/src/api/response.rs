//! Envelope normalization for upstream responses.
//!
//! The reporting service has shipped several response shapes over time. All
//! of them reduce to "a list of row objects", and this adapter is the only
//! place that knows the variants; everything downstream sees one canonical
//! array.

use serde_json::Value;

/// Flatten any of the known response envelopes into a flat list of rows.
///
/// Recognized shapes, tried in order:
/// - a bare array of rows
/// - `{"data": [...]}`
/// - `{"snapshots": [...]}`
/// - `{"dates": [{"Date": ..., "stores": [...]}]}`, where each store row
///   inherits the group's date if it lacks its own
/// - an object keyed by arbitrary group names whose values are row arrays
///
/// Anything else yields an empty list.
pub fn extract_rows(body: Value) -> Vec<Value> {
    match body {
        Value::Array(rows) => rows,
        Value::Object(mut envelope) => {
            if let Some(Value::Array(rows)) = envelope.remove("data") {
                return rows;
            }
            if let Some(Value::Array(rows)) = envelope.remove("snapshots") {
                return rows;
            }
            if let Some(Value::Array(groups)) = envelope.remove("dates") {
                return flatten_date_groups(groups);
            }
            envelope
                .into_iter()
                .filter_map(|(_, v)| match v {
                    Value::Array(rows) => Some(rows),
                    _ => None,
                })
                .flatten()
                .collect()
        }
        _ => Vec::new(),
    }
}

fn flatten_date_groups(groups: Vec<Value>) -> Vec<Value> {
    let mut rows = Vec::new();
    for group in groups {
        let Value::Object(mut group) = group else {
            continue;
        };
        let group_date = group
            .get("Date")
            .or_else(|| group.get("date"))
            .cloned()
            .unwrap_or(Value::Null);
        let Some(Value::Array(stores)) = group.remove("stores") else {
            continue;
        };
        for store_row in stores {
            let mut row = match store_row {
                Value::Object(row) => row,
                _ => continue,
            };
            if !row.contains_key("Date") && !group_date.is_null() {
                row.insert("Date".into(), group_date.clone());
            }
            rows.push(Value::Object(row));
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_array_passes_through() {
        let rows = extract_rows(json!([{"a": 1}, {"a": 2}]));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_data_envelope() {
        let rows = extract_rows(json!({"data": [{"a": 1}], "total": 1}));
        assert_eq!(rows, vec![json!({"a": 1})]);
    }

    #[test]
    fn test_snapshots_envelope() {
        let rows = extract_rows(json!({"snapshots": [{"SalesSubtotal": 100}]}));
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_date_groups_inherit_group_date() {
        let rows = extract_rows(json!({
            "dates": [
                {"Date": "2024-06-10", "stores": [
                    {"StoreNbr": "101"},
                    {"StoreNbr": "102", "Date": "2024-06-11"}
                ]},
                {"date": "2024-06-12", "stores": [{"StoreNbr": "101"}]}
            ]
        }));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["Date"], json!("2024-06-10"));
        // a row's own date wins over the group's
        assert_eq!(rows[1]["Date"], json!("2024-06-11"));
        assert_eq!(rows[2]["Date"], json!("2024-06-12"));
    }

    #[test]
    fn test_keyed_map_of_arrays() {
        let rows = extract_rows(json!({
            "we101": [{"a": 1}],
            "we102": [{"a": 2}, {"a": 3}],
            "count": 3
        }));
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_unrecognized_shapes_yield_empty() {
        assert!(extract_rows(json!(null)).is_empty());
        assert!(extract_rows(json!("nope")).is_empty());
        assert!(extract_rows(json!({"message": "no rows"})).is_empty());
    }
}
