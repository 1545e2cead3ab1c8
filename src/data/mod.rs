//! Core data models for the dashboard data layer
//!
//! Records are untyped JSON objects; the types here describe how callers
//! ask for a slice of a collection (filters, search, sort, page) and what
//! they get back.

pub mod client;
pub mod query;
pub mod source;

pub use client::{Callback, DataClient, DataClientConfig, Subscription};
pub use query::{cache_key, process};
pub use source::RecordSource;

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A single record (client, transaction, alert, ...)
pub type Record = serde_json::Map<String, Value>;

/// Default page size when none (or zero) is requested
pub const DEFAULT_PAGE_LIMIT: usize = 10;

/// A constraint on one record field
///
/// Serialized as plain JSON: a scalar as itself, membership as an array,
/// a range as `{"min": .., "max": ..}` with `null` for an open bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum FilterValue {
    /// Field must equal the value
    Scalar(Value),
    /// Field must equal one of the values
    Membership(Vec<Value>),
    /// Field must be a number within the inclusive bounds; a missing bound is open
    Range { min: Option<f64>, max: Option<f64> },
}

impl FilterValue {
    pub fn scalar(value: impl Into<Value>) -> Self {
        FilterValue::Scalar(value.into())
    }

    pub fn range(min: f64, max: f64) -> Self {
        FilterValue::Range {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Interprets a loosely-typed JSON filter value
    ///
    /// Arrays become membership tests, objects carrying `min` and/or `max`
    /// become ranges, anything else is an exact match.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Array(items) => FilterValue::Membership(items),
            Value::Object(map) if map.contains_key("min") || map.contains_key("max") => {
                FilterValue::Range {
                    min: map.get("min").and_then(Value::as_f64),
                    max: map.get("max").and_then(Value::as_f64),
                }
            }
            other => FilterValue::Scalar(other),
        }
    }

    /// Empty filters impose no constraint
    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Scalar(Value::Null) => true,
            FilterValue::Scalar(Value::String(s)) => s.is_empty(),
            FilterValue::Scalar(_) => false,
            FilterValue::Membership(items) => items.is_empty(),
            FilterValue::Range { min, max } => min.is_none() && max.is_none(),
        }
    }
}

impl From<Value> for FilterValue {
    fn from(value: Value) -> Self {
        FilterValue::from_json(value)
    }
}

impl From<FilterValue> for Value {
    fn from(filter: FilterValue) -> Self {
        match filter {
            FilterValue::Scalar(value) => value,
            FilterValue::Membership(items) => Value::Array(items),
            FilterValue::Range { min, max } => json!({ "min": min, "max": max }),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(format!("invalid sort order '{other}' (expected asc or desc)")),
        }
    }
}

/// Page selection and ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    /// 1-based page number
    pub page: usize,
    pub limit: usize,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            sort_by: None,
            sort_order: SortOrder::Asc,
        }
    }
}

impl Pagination {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page,
            limit,
            ..Self::default()
        }
    }

    pub fn sorted_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(field.into());
        self.sort_order = order;
        self
    }

    /// Page 0 becomes 1 and limit 0 becomes the default
    pub fn normalized(&self) -> Self {
        Self {
            page: self.page.max(1),
            limit: if self.limit == 0 {
                DEFAULT_PAGE_LIMIT
            } else {
                self.limit
            },
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order,
        }
    }
}

/// Everything that selects a view of a collection
///
/// Filters live in a `BTreeMap` so serialization is independent of the
/// order in which they were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    pub filters: BTreeMap<String, FilterValue>,
    pub search: Option<String>,
    pub pagination: Pagination,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: FilterValue) -> Self {
        self.filters.insert(field.into(), value);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }
}

/// One page of a processed collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse {
    pub data: Vec<Record>,
    /// Number of records after filtering and search, before slicing
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_detects_variants() {
        assert_eq!(
            FilterValue::from_json(json!(["open", "closed"])),
            FilterValue::Membership(vec![json!("open"), json!("closed")])
        );
        assert_eq!(
            FilterValue::from_json(json!({"min": 20, "max": 80})),
            FilterValue::range(20.0, 80.0)
        );
        assert_eq!(
            FilterValue::from_json(json!({"min": 5})),
            FilterValue::Range {
                min: Some(5.0),
                max: None
            }
        );
        assert_eq!(
            FilterValue::from_json(json!("high")),
            FilterValue::scalar("high")
        );
    }

    #[test]
    fn test_query_params_from_loose_json() {
        let params: QueryParams = serde_json::from_value(json!({
            "filters": {
                "status": "open",
                "risk": ["high", "critical"],
                "score": {"min": 20, "max": 80},
                "amount": {"min": 1000, "max": null}
            },
            "search": "acme"
        }))
        .unwrap();

        assert_eq!(params.filters["status"], FilterValue::scalar("open"));
        assert_eq!(
            params.filters["risk"],
            FilterValue::Membership(vec![json!("high"), json!("critical")])
        );
        assert_eq!(params.filters["score"], FilterValue::range(20.0, 80.0));
        assert_eq!(
            params.filters["amount"],
            FilterValue::Range {
                min: Some(1000.0),
                max: None
            }
        );
        assert_eq!(params.search.as_deref(), Some("acme"));
        assert_eq!(params.pagination, Pagination::default());
    }

    #[test]
    fn test_filter_value_serializes_as_plain_json() {
        let open_range = FilterValue::Range {
            min: None,
            max: Some(5.0),
        };
        assert_eq!(
            serde_json::to_value(&open_range).unwrap(),
            json!({"min": null, "max": 5.0})
        );
        let back: FilterValue = serde_json::from_value(json!({"min": null, "max": null})).unwrap();
        assert!(back.is_empty());
        assert_eq!(
            serde_json::to_value(FilterValue::scalar("open")).unwrap(),
            json!("open")
        );
    }

    #[test]
    fn test_empty_filters() {
        assert!(FilterValue::Scalar(Value::Null).is_empty());
        assert!(FilterValue::scalar("").is_empty());
        assert!(FilterValue::Membership(vec![]).is_empty());
        assert!(FilterValue::Range {
            min: None,
            max: None
        }
        .is_empty());
        assert!(!FilterValue::scalar(0).is_empty());
        assert!(!FilterValue::scalar(false).is_empty());
    }

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!("asc".parse::<SortOrder>(), Ok(SortOrder::Asc));
        assert_eq!("DESC".parse::<SortOrder>(), Ok(SortOrder::Desc));
        assert!("sideways".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_pagination_normalized() {
        let p = Pagination::new(0, 0).normalized();
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, DEFAULT_PAGE_LIMIT);

        let p = Pagination::new(3, 25).normalized();
        assert_eq!(p.page, 3);
        assert_eq!(p.limit, 25);
    }

    #[test]
    fn test_data_response_uses_camel_case() {
        let response = DataResponse {
            data: vec![],
            total: 0,
            page: 1,
            limit: 10,
            has_more: false,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["hasMore"], json!(false));
    }
}
