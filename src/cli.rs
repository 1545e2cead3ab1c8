//! Command-line interface parsing for crmdata
//!
//! This module handles parsing of CLI arguments using clap and turns the
//! `fetch` flags into `QueryParams`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use thiserror::Error;

use crate::data::{FilterValue, Pagination, QueryParams, SortOrder, DEFAULT_PAGE_LIMIT};

/// Error types for CLI argument parsing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    /// A filter argument is not of the form `field=value`
    #[error("Invalid filter: '{0}'. Expected field=value")]
    InvalidFilter(String),

    /// A range argument is not of the form `field=min..max`
    #[error("Invalid range: '{0}'. Expected field=min..max (either bound may be omitted)")]
    InvalidRange(String),

    /// `--filters-json` is not a JSON object of filters
    #[error("Invalid filters JSON: {0}")]
    InvalidFiltersJson(String),

    /// The sort order is not asc or desc
    #[error("Invalid sort order: '{0}'. Valid orders: asc, desc")]
    InvalidSortOrder(String),
}

/// crmdata - cached, failover-aware access to dashboard collections
#[derive(Parser, Debug)]
#[command(name = "crmdata")]
#[command(about = "Fetch, filter and watch CRM/compliance collections across failover backends")]
#[command(version)]
pub struct Cli {
    /// Path to a JSON config file (defaults to the XDG config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch one page of a collection
    Fetch(FetchArgs),

    /// Subscribe to a collection and print every refresh
    Watch {
        /// Endpoint to watch, e.g. alerts
        endpoint: String,

        /// Refresh interval in seconds (overrides config)
        #[arg(long, value_name = "SECS")]
        interval_secs: Option<u64>,

        /// Stop after this many updates
        #[arg(long, value_name = "N")]
        ticks: Option<usize>,
    },

    /// Probe every backend and print its health
    Health,

    /// Manage the stored auth token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum TokenAction {
    /// Store a bearer token
    Set { token: String },
    /// Remove the stored token
    Clear,
}

/// Arguments for `fetch`
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Endpoint to read, e.g. clients or /audit-logs
    pub endpoint: String,

    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Page size
    #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
    pub limit: usize,

    /// Field to sort by
    #[arg(long, value_name = "FIELD")]
    pub sort_by: Option<String>,

    /// Sort direction: asc or desc
    #[arg(long, default_value = "asc")]
    pub sort_order: String,

    /// Case-insensitive text search over all fields
    #[arg(long)]
    pub search: Option<String>,

    /// Exact-match filter, repeatable: --filter status=open
    #[arg(long = "filter", value_name = "FIELD=VALUE")]
    pub filters: Vec<String>,

    /// Inclusive numeric range, repeatable: --range score=20..80
    #[arg(long = "range", value_name = "FIELD=MIN..MAX")]
    pub ranges: Vec<String>,

    /// Membership filter, repeatable: --any risk=high,critical
    #[arg(long = "any", value_name = "FIELD=A,B,...")]
    pub any_of: Vec<String>,

    /// Filters as one JSON object, e.g. '{"risk": ["high"], "score": {"min": 50}}'
    #[arg(long = "filters-json", value_name = "JSON")]
    pub filters_json: Option<String>,
}

/// Parses a filter value: JSON literals (numbers, booleans, null, quoted
/// strings) keep their type, anything else is a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn split_field(arg: &str) -> Option<(&str, &str)> {
    let (field, value) = arg.split_once('=')?;
    let field = field.trim();
    if field.is_empty() {
        None
    } else {
        Some((field, value))
    }
}

/// Parses `field=value` into an exact-match filter
pub fn parse_filter_arg(arg: &str) -> Result<(String, FilterValue), CliError> {
    let (field, value) =
        split_field(arg).ok_or_else(|| CliError::InvalidFilter(arg.to_string()))?;
    Ok((field.to_string(), FilterValue::Scalar(parse_value(value))))
}

/// Parses `field=min..max` into a range filter
pub fn parse_range_arg(arg: &str) -> Result<(String, FilterValue), CliError> {
    let invalid = || CliError::InvalidRange(arg.to_string());
    let (field, bounds) = split_field(arg).ok_or_else(invalid)?;
    let (min, max) = bounds.split_once("..").ok_or_else(invalid)?;

    let parse_bound = |raw: &str| -> Result<Option<f64>, CliError> {
        let raw = raw.trim();
        if raw.is_empty() {
            Ok(None)
        } else {
            raw.parse::<f64>().map(Some).map_err(|_| invalid())
        }
    };

    Ok((
        field.to_string(),
        FilterValue::Range {
            min: parse_bound(min)?,
            max: parse_bound(max)?,
        },
    ))
}

/// Parses `field=a,b,c` into a membership filter
pub fn parse_any_arg(arg: &str) -> Result<(String, FilterValue), CliError> {
    let (field, values) =
        split_field(arg).ok_or_else(|| CliError::InvalidFilter(arg.to_string()))?;
    let items = values
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(parse_value)
        .collect();
    Ok((field.to_string(), FilterValue::Membership(items)))
}

impl FetchArgs {
    /// Builds the query described by the flags
    pub fn to_query(&self) -> Result<QueryParams, CliError> {
        let sort_order: SortOrder = self
            .sort_order
            .parse()
            .map_err(|_| CliError::InvalidSortOrder(self.sort_order.clone()))?;

        let mut pagination = Pagination::new(self.page, self.limit);
        if let Some(field) = &self.sort_by {
            pagination = pagination.sorted_by(field.clone(), sort_order);
        }

        let mut query = QueryParams::new().paginate(pagination);
        if let Some(raw) = &self.filters_json {
            query.filters = serde_json::from_str::<BTreeMap<String, FilterValue>>(raw)
                .map_err(|e| CliError::InvalidFiltersJson(e.to_string()))?;
        }
        if let Some(search) = &self.search {
            query = query.search(search.clone());
        }

        for arg in &self.filters {
            let (field, value) = parse_filter_arg(arg)?;
            query = query.filter(field, value);
        }
        for arg in &self.ranges {
            let (field, value) = parse_range_arg(arg)?;
            query = query.filter(field, value);
        }
        for arg in &self.any_of {
            let (field, value) = parse_any_arg(arg)?;
            query = query.filter(field, value);
        }

        Ok(query)
    }
}
