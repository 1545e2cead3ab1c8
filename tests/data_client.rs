//! End-to-end tests: DataClient over a FailoverRouter
//!
//! Uses a scripted in-process transport so no sockets are opened.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crmdata::auth::TokenStore;
use crmdata::data::{DataClient, DataClientConfig, FilterValue, Pagination, QueryParams, SortOrder};
use crmdata::router::{
    BackendConfig, FailoverRouter, HttpRequest, HttpResponse, HttpTransport, RouterConfig,
    RouterError, TransportError,
};

const PRIMARY: &str = "http://primary.test/api";
const FALLBACK: &str = "http://fallback.test/api";

/// Answers scripted URLs with a status and body; anything else is refused
#[derive(Default)]
struct ScriptedTransport {
    routes: Mutex<HashMap<String, (u16, String)>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn route(&self, url: &str, status: u16, body: Value) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.to_string()));
    }

    fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(request.url.clone());
        match self.routes.lock().unwrap().get(&request.url) {
            Some((status, body)) => Ok(HttpResponse::new(*status, body.clone())),
            None => Err(TransportError::Network("connection refused".to_string())),
        }
    }
}

fn clients(count: usize) -> Value {
    let records: Vec<Value> = (1..=count)
        .map(|i| {
            json!({
                "id": i,
                "name": format!("Client {:02}", i),
                "risk": if i % 3 == 0 { "high" } else { "low" },
                "score": i * 4,
            })
        })
        .collect();
    Value::Array(records)
}

fn client_over(transport: Arc<ScriptedTransport>) -> DataClient {
    let router = FailoverRouter::new(
        vec![
            BackendConfig::new("primary", PRIMARY, 1),
            BackendConfig::new("fallback", FALLBACK, 2),
        ],
        RouterConfig::default(),
        transport,
        TokenStore::anonymous(),
    );
    DataClient::new(Arc::new(router), DataClientConfig::default())
}

#[tokio::test]
async fn test_fetch_fails_over_and_paginates() {
    let transport = Arc::new(ScriptedTransport::default());
    // Primary health probe is refused
    transport.route(&format!("{FALLBACK}/health"), 200, json!({"status": "ok"}));
    transport.route(&format!("{FALLBACK}/clients"), 200, clients(25));

    let client = client_over(transport.clone());
    let query = QueryParams::new().paginate(Pagination::new(3, 10));
    let page = client.fetch("clients", &query).await.expect("fallback should serve");

    assert_eq!(page.total, 25);
    assert_eq!(page.data.len(), 5);
    assert_eq!(page.page, 3);
    assert!(!page.has_more);
    assert_eq!(page.data[0]["id"], 21);
    assert_eq!(transport.calls_to(&format!("{PRIMARY}/clients")), 0);
}

#[tokio::test]
async fn test_repeat_fetch_is_served_from_cache() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.route(&format!("{PRIMARY}/health"), 200, json!({}));
    transport.route(&format!("{PRIMARY}/clients"), 200, json!({ "data": clients(12) }));

    let client = client_over(transport.clone());
    let query = QueryParams::new().filter("risk", FilterValue::scalar("high"));

    let first = client.fetch("clients", &query).await.unwrap();
    let second = client.fetch("clients", &query).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.total, 4);
    assert_eq!(transport.calls_to(&format!("{PRIMARY}/clients")), 1);
    assert_eq!(client.cache_stats().hits, 1);
}

#[tokio::test]
async fn test_query_pipeline_end_to_end() {
    let transport = Arc::new(ScriptedTransport::default());
    transport.route(&format!("{PRIMARY}/health"), 200, json!({}));
    transport.route(&format!("{PRIMARY}/clients"), 200, clients(30));

    let client = client_over(transport);
    let query = QueryParams::new()
        .filter("score", FilterValue::range(20.0, 80.0))
        .search("client 1")
        .paginate(Pagination::new(1, 3).sorted_by("score", SortOrder::Desc));

    let page = client.fetch("clients", &query).await.unwrap();

    // Scores 20..=80 are ids 5..=20; "client 1" matches ids 10..=19
    assert_eq!(page.total, 10);
    assert!(page.has_more);
    let ids: Vec<i64> = page.data.iter().filter_map(|r| r["id"].as_i64()).collect();
    assert_eq!(ids, vec![19, 18, 17]);
}

#[tokio::test]
async fn test_all_backends_down_is_an_outage() {
    let transport = Arc::new(ScriptedTransport::default());
    let client = client_over(transport);

    let err = client
        .fetch("alerts", &QueryParams::default())
        .await
        .expect_err("nothing is reachable");

    assert!(err.is_outage());
    assert!(matches!(err, RouterError::AllBackendsUnavailable { .. }));
    assert!(client.cache_stats().entries == 0);
}
