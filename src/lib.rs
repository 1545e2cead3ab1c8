//! crmdata library
//!
//! Data layer for a compliance/CRM dashboard: a TTL cache, a query
//! pipeline over record collections, live-update subscriptions and a
//! multi-backend failover router.

pub mod auth;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod refresh;
pub mod router;
