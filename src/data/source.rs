//! Where raw record collections come from

use async_trait::async_trait;
use serde::Deserialize;

use super::Record;
use crate::router::{FailoverRouter, RouterError};

/// Loads the full record set behind an endpoint
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_records(&self, endpoint: &str) -> Result<Vec<Record>, RouterError>;
}

/// Accepted collection payloads: a bare array or `{ "data": [...] }`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordsPayload {
    List(Vec<Record>),
    Wrapped { data: Vec<Record> },
}

impl RecordsPayload {
    fn into_records(self) -> Vec<Record> {
        match self {
            RecordsPayload::List(records) | RecordsPayload::Wrapped { data: records } => records,
        }
    }
}

#[async_trait]
impl RecordSource for FailoverRouter {
    async fn fetch_records(&self, endpoint: &str) -> Result<Vec<Record>, RouterError> {
        let payload: RecordsPayload = self.get(endpoint).await?;
        Ok(payload.into_records())
    }
}
