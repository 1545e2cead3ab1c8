//! Filter, search, sort and paginate pipeline
//!
//! The steps always run in that order: filtering before pagination decides
//! which records land on a given page.

use std::cmp::Ordering;

use serde_json::Value;

use super::{DataResponse, FilterValue, QueryParams, Record, SortOrder};

/// Cache key for a request: `endpoint:` followed by the canonical params
///
/// Logically equal params produce the same key regardless of the order
/// their filters were inserted in.
pub fn cache_key(endpoint: &str, params: &QueryParams) -> String {
    // serde_json maps are sorted, and QueryParams holds only string-keyed maps
    let serialized = serde_json::to_string(params).unwrap_or_default();
    format!("{endpoint}:{serialized}")
}

/// Runs the full pipeline over `records`
pub fn process(records: Vec<Record>, params: &QueryParams) -> DataResponse {
    let filtered = apply_filters(records, params);
    let mut searched = apply_search(filtered, params.search.as_deref());
    let pagination = params.pagination.normalized();
    if let Some(field) = pagination.sort_by.as_deref() {
        sort_records(&mut searched, field, pagination.sort_order);
    }
    paginate(searched, pagination.page, pagination.limit)
}

fn apply_filters(records: Vec<Record>, params: &QueryParams) -> Vec<Record> {
    let active: Vec<(&String, &FilterValue)> = params
        .filters
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .collect();

    if active.is_empty() {
        return records;
    }

    records
        .into_iter()
        .filter(|record| {
            active
                .iter()
                .all(|(field, filter)| matches_filter(record.get(field.as_str()), filter))
        })
        .collect()
}

/// Whether a record's field satisfies one filter
pub fn matches_filter(field: Option<&Value>, filter: &FilterValue) -> bool {
    match filter {
        FilterValue::Scalar(expected) => field.is_some_and(|value| values_equal(value, expected)),
        FilterValue::Membership(allowed) => {
            field.is_some_and(|value| allowed.iter().any(|item| values_equal(value, item)))
        }
        FilterValue::Range { min, max } => match field.and_then(Value::as_f64) {
            Some(n) => min.map_or(true, |lo| n >= lo) && max.map_or(true, |hi| n <= hi),
            None => false,
        },
    }
}

/// JSON equality where `1` and `1.0` are the same number
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

fn apply_search(records: Vec<Record>, search: Option<&str>) -> Vec<Record> {
    let term = match search.map(str::trim) {
        Some(term) if !term.is_empty() => term.to_lowercase(),
        _ => return records,
    };

    records
        .into_iter()
        .filter(|record| {
            record
                .values()
                .filter_map(searchable_text)
                .any(|text| text.to_lowercase().contains(&term))
        })
        .collect()
}

/// String form of a field for search; nulls are never matched
fn searchable_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Stable sort by one field
///
/// Values order as null < bool < number < string < array < object, with
/// arrays and objects compared by their JSON text. Missing fields sort as
/// null.
pub fn sort_records(records: &mut [Record], field: &str, order: SortOrder) {
    records.sort_by(|a, b| {
        let ordering = compare_values(a.get(field), b.get(field));
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ if type_rank(a) != type_rank(b) => type_rank(a).cmp(&type_rank(b)),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Slices one page out of `records`; `page` is 1-based and must be >= 1
fn paginate(records: Vec<Record>, page: usize, limit: usize) -> DataResponse {
    let total = records.len();
    let start = (page - 1).saturating_mul(limit);
    let end = start.saturating_add(limit);

    let data = if start >= total {
        Vec::new()
    } else {
        records
            .into_iter()
            .skip(start)
            .take(limit)
            .collect()
    };

    DataResponse {
        data,
        total,
        page,
        limit,
        has_more: end < total,
    }
}
