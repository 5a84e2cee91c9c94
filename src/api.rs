use crate::error::LoadError;
use crate::query_state::QueryState;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub const MEASUREMENTS_ENDPOINT: &str = "api/measurements/";
pub const GROUPED_ENDPOINT: &str = "api/measurements/grouped";
const TIMESERIES_ENDPOINT: &str = "api/measurements/timeseries/";
const METHOD_DISTRIBUTION_ENDPOINT: &str = "api/measurements/methodDistribution/";
const DUMP_ENDPOINT: &str = "db/dumpDatabase";
const DELETE_ENDPOINT: &str = "db/deleteDatabase";

/// One record returned by a collection endpoint, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// String view of a field, `None` for missing, null or non-string values.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Value> for Row {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Row(map),
            _ => Row::default(),
        }
    }
}

/// A displayed page: at most `limit` rows plus whether another page exists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub rows: Vec<Row>,
    pub has_next: bool,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Start/end of a time window in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub started_at: i64,
    pub ended_at: i64,
}

impl TimeRange {
    pub fn new(started_at: i64, ended_at: i64) -> Self {
        Self {
            started_at,
            ended_at,
        }
    }

    /// The window of `seconds` ending at `now`.
    pub fn last(seconds: i64, now: i64) -> Self {
        Self::new(now - seconds, now)
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("startedAt".to_string(), self.started_at.to_string()),
            ("endedAt".to_string(), self.ended_at.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Hourly,
    Daily,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Hourly => "hourly",
            Interval::Daily => "daily",
        }
    }
}

/// Anything a server-side table can pull rows from.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_rows(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<Vec<Row>, LoadError>;
}

/// The rest of the profiler REST surface used by the views.
#[async_trait]
pub trait ProfilerApi: PageSource {
    async fn timeseries(
        &self,
        range: TimeRange,
        interval: Interval,
    ) -> Result<BTreeMap<String, u64>, LoadError>;

    async fn method_distribution(&self, range: TimeRange)
        -> Result<BTreeMap<String, u64>, LoadError>;

    async fn measurement(&self, id: &str) -> Result<Value, LoadError>;

    async fn dump_database(&self) -> Result<Value, LoadError>;

    async fn delete_database(&self) -> Result<bool, LoadError>;
}

struct SharedApi(Arc<dyn ProfilerApi>);

#[async_trait]
impl PageSource for SharedApi {
    async fn fetch_rows(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<Vec<Row>, LoadError> {
        self.0.fetch_rows(endpoint, params).await
    }
}

/// Hands a shared client to a table, which only needs the row-fetching half.
pub fn page_source(api: Arc<dyn ProfilerApi>) -> Arc<dyn PageSource> {
    Arc::new(SharedApi(api))
}

/// Loads one page of `state`, asking for one extra row to learn whether a
/// next page exists.
pub async fn fetch_page<S>(source: &S, endpoint: &str, state: &QueryState) -> Result<Page, LoadError>
where
    S: PageSource + ?Sized,
{
    let params = state.query_pairs(state.limit() + 1);
    let mut rows = source.fetch_rows(endpoint, &params).await?;
    let has_next = rows.len() > state.limit();
    rows.truncate(state.limit());
    Ok(Page { rows, has_next })
}

/// Accepts either a bare array of row objects or `{"measurements": [...]}`.
pub fn parse_rows(body: Value) -> Result<Vec<Row>, LoadError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("measurements") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(LoadError::malformed("`measurements` is not an array")),
            None => return Err(LoadError::malformed("object without `measurements` field")),
        },
        other => {
            return Err(LoadError::malformed(format!(
                "expected array or object, got {}",
                json_kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(Row(map)),
            other => Err(LoadError::malformed(format!(
                "row is {}, expected object",
                json_kind(&other)
            ))),
        })
        .collect()
}

/// Parses a `{label: count}` object nested under `key`.
fn parse_counts(body: Value, key: &str) -> Result<BTreeMap<String, u64>, LoadError> {
    let Value::Object(mut map) = body else {
        return Err(LoadError::malformed(format!("expected object with `{}`", key)));
    };
    let Some(Value::Object(counts)) = map.remove(key) else {
        return Err(LoadError::malformed(format!("`{}` is missing or not an object", key)));
    };
    counts
        .into_iter()
        .map(|(label, count)| {
            count
                .as_f64()
                .filter(|c| c.is_finite() && *c >= 0.0)
                .map(|c| (label.clone(), c as u64))
                .ok_or_else(|| LoadError::malformed(format!("count for `{}` is not a number", label)))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    status: bool,
}

/// HTTP client for a profiler mounted at `base_url`
/// (e.g. `http://127.0.0.1:5000/flask-profiler`).
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LoadError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LoadError::Network(e.to_string()))?;
        let base_url = base_url.into();
        Url::parse(&base_url).map_err(|e| LoadError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins `path` onto the base URL, keeping the base's own path prefix.
    pub fn url_for(&self, path: &str) -> Result<Url, LoadError> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| LoadError::InvalidUrl(format!("{}: {}", joined, e)))
    }

    async fn get_json(&self, path: &str, params: &[(String, String)]) -> Result<Value, LoadError> {
        let url = self.url_for(path)?;
        debug!("GET {} {:?}", url, params);

        let response = self.client.get(url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body.trim().chars().take(200).collect()
            };
            return Err(LoadError::http(status.as_u16(), message));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| LoadError::malformed(e.to_string()))
    }
}

#[async_trait]
impl PageSource for ApiClient {
    async fn fetch_rows(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<Vec<Row>, LoadError> {
        let body = self.get_json(endpoint, params).await?;
        parse_rows(body)
    }
}

#[async_trait]
impl ProfilerApi for ApiClient {
    async fn timeseries(
        &self,
        range: TimeRange,
        interval: Interval,
    ) -> Result<BTreeMap<String, u64>, LoadError> {
        let mut params = range.query_pairs();
        params.push(("interval".to_string(), interval.as_str().to_string()));
        let body = self.get_json(TIMESERIES_ENDPOINT, &params).await?;
        parse_counts(body, "series")
    }

    async fn method_distribution(
        &self,
        range: TimeRange,
    ) -> Result<BTreeMap<String, u64>, LoadError> {
        let body = self
            .get_json(METHOD_DISTRIBUTION_ENDPOINT, &range.query_pairs())
            .await?;
        parse_counts(body, "distribution")
    }

    async fn measurement(&self, id: &str) -> Result<Value, LoadError> {
        let path = format!("{}{}", MEASUREMENTS_ENDPOINT, id);
        match self.get_json(&path, &[]).await? {
            Value::Null => Err(LoadError::malformed(format!("measurement {} not found", id))),
            value => Ok(value),
        }
    }

    async fn dump_database(&self) -> Result<Value, LoadError> {
        self.get_json(DUMP_ENDPOINT, &[]).await
    }

    /// The backend exposes deletion as a GET.
    async fn delete_database(&self) -> Result<bool, LoadError> {
        let body = self.get_json(DELETE_ENDPOINT, &[]).await?;
        let response: DeleteResponse =
            serde_json::from_value(body).map_err(|e| LoadError::malformed(e.to_string()))?;
        Ok(response.status)
    }
}
