//! Read-only access to the managed backend's tables.
//!
//! Handlers and accessors only see [`TableReader`]; production wires a
//! [`RestTableReader`] speaking the PostgREST query dialect, tests use
//! [`InMemoryTableReader`].

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common_observability::AdvisoryMetrics;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to build backend client: {0}")]
    Client(String),
    #[error("request to '{table}' failed: {message}")]
    Request { table: String, message: String },
    #[error("HTTP {status} from '{table}': {body}")]
    Status { table: String, status: u16, body: String },
    #[error("failed to decode rows from '{table}': {message}")]
    Decode { table: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// `{table, filter, order}` read request. Filters are equality matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub table: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl TableQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value: value.to_string(),
        });
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query string pairs in PostgREST form.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        for filter in &self.filters {
            pairs.push((filter.column.clone(), format!("eq.{}", filter.value)));
        }
        if let Some(order) = &self.order {
            pairs.push((
                "order".to_string(),
                format!("{}.{}", order.column, order.direction.as_str()),
            ));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

#[async_trait]
pub trait TableReader: Send + Sync {
    async fn fetch(&self, query: &TableQuery) -> BackendResult<Vec<Value>>;
}

/// Fetch and deserialize rows into `T`.
pub async fn fetch_rows<T>(reader: &dyn TableReader, query: &TableQuery) -> BackendResult<Vec<T>>
where
    T: DeserializeOwned,
{
    let rows = reader.fetch(query).await?;
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|err| BackendError::Decode {
                table: query.table.clone(),
                message: err.to_string(),
            })
        })
        .collect()
}

/// First matching row, if any.
pub async fn fetch_one<T>(reader: &dyn TableReader, query: TableQuery) -> BackendResult<Option<T>>
where
    T: DeserializeOwned,
{
    let rows = fetch_rows(reader, &query.limit(1)).await?;
    Ok(rows.into_iter().next())
}

#[derive(Clone)]
pub struct RestTableReader {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestTableReader {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> BackendResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| BackendError::Client(err.to_string()))?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }
}

#[async_trait]
impl TableReader for RestTableReader {
    async fn fetch(&self, query: &TableQuery) -> BackendResult<Vec<Value>> {
        let url = self.table_url(&query.table);
        let response = self
            .client
            .get(&url)
            .query(&query.to_query_pairs())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| BackendError::Request {
                table: query.table.clone(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                table: query.table.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<Value> = response.json().await.map_err(|err| BackendError::Decode {
            table: query.table.clone(),
            message: err.to_string(),
        })?;
        debug!(table = %query.table, rows = rows.len(), "fetched backend rows");
        Ok(rows)
    }
}

/// Records latency and failures for every read.
pub struct MeteredTableReader {
    inner: Arc<dyn TableReader>,
    metrics: Arc<AdvisoryMetrics>,
}

impl MeteredTableReader {
    pub fn new(inner: Arc<dyn TableReader>, metrics: Arc<AdvisoryMetrics>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl TableReader for MeteredTableReader {
    async fn fetch(&self, query: &TableQuery) -> BackendResult<Vec<Value>> {
        let started = Instant::now();
        let result = self.inner.fetch(query).await;
        self.metrics
            .observe_fetch(&query.table, started.elapsed().as_secs_f64());
        if let Err(err) = &result {
            self.metrics.fetch_failure(&query.table);
            warn!(table = %query.table, error = %err, "backend read failed");
        }
        result
    }
}

/// Table rows held in memory. Applies equality filters, ordering and limit
/// the way the REST backend would.
#[derive(Clone, Default)]
pub struct InMemoryTableReader {
    tables: Arc<RwLock<HashMap<String, Vec<Value>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    fetches: Arc<AtomicUsize>,
}

impl InMemoryTableReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        self.set_rows(table, rows);
        self
    }

    pub fn set_rows(&self, table: &str, rows: Vec<Value>) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.insert(table.to_string(), rows);
    }

    /// Make reads of `table` fail until [`InMemoryTableReader::recover`].
    pub fn fail(&self, table: &str) {
        let mut failing = self.failing.write().unwrap_or_else(PoisonError::into_inner);
        failing.insert(table.to_string());
    }

    pub fn recover(&self, table: &str) {
        let mut failing = self.failing.write().unwrap_or_else(PoisonError::into_inner);
        failing.remove(table);
    }

    /// Number of reads served or refused so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(AtomicOrdering::SeqCst)
    }
}

#[async_trait]
impl TableReader for InMemoryTableReader {
    async fn fetch(&self, query: &TableQuery) -> BackendResult<Vec<Value>> {
        self.fetches.fetch_add(1, AtomicOrdering::SeqCst);
        {
            let failing = self.failing.read().unwrap_or_else(PoisonError::into_inner);
            if failing.contains(&query.table) {
                return Err(BackendError::Status {
                    table: query.table.clone(),
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
        }

        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let mut rows: Vec<Value> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|filter| matches_filter(row, filter)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_json(a.get(&order.column), b.get(&order.column));
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }
}

fn matches_filter(row: &Value, filter: &Filter) -> bool {
    match row.get(&filter.column) {
        Some(Value::String(text)) => *text == filter.value,
        Some(Value::Null) | None => filter.value == "null",
        Some(other) => other.to_string() == filter.value,
    }
}

fn compare_json(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        // Nulls sort last, as in PostgreSQL ascending order.
        (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
        (Some(Value::Null) | None, Some(_)) => Ordering::Greater,
        (Some(_), Some(Value::Null) | None) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
