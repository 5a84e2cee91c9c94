#![allow(dead_code)]

use async_trait::async_trait;
use profview::api::{Interval, PageSource, ProfilerApi, Row, TimeRange};
use profview::error::LoadError;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub type Params = Vec<(String, String)>;

pub fn param<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

pub fn measurement_row(id: usize) -> Row {
    Row::from(json!({
        "id": id,
        "method": "GET",
        "name": format!("/api/items/{}", id),
        "elapsed": 0.25,
        "startedAt": 1_700_000_000 + id as i64,
    }))
}

/// In-memory backend over `total` rows that honours `skip` and `limit`.
#[derive(Default)]
pub struct FakeSource {
    pub total: Mutex<usize>,
    pub calls: Mutex<Vec<(String, Params)>>,
    pub failures: Mutex<VecDeque<LoadError>>,
    pub delays: Mutex<HashMap<usize, Duration>>,
}

impl FakeSource {
    pub fn with_rows(total: usize) -> Self {
        Self {
            total: Mutex::new(total),
            ..Self::default()
        }
    }

    pub fn fail_next(&self, err: LoadError) {
        self.failures.lock().unwrap().push_back(err);
    }

    /// Delays every request whose `skip` equals `skip`.
    pub fn delay_skip(&self, skip: usize, delay: Duration) {
        self.delays.lock().unwrap().insert(skip, delay);
    }

    pub fn calls(&self) -> Vec<(String, Params)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_params(&self) -> Params {
        self.calls.lock().unwrap().last().map(|(_, p)| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PageSource for FakeSource {
    async fn fetch_rows(&self, endpoint: &str, params: &[(String, String)]) -> Result<Vec<Row>, LoadError> {
        let params = params.to_vec();
        self.calls.lock().unwrap().push((endpoint.to_string(), params.clone()));

        let skip: usize = param(&params, "skip").unwrap().parse().unwrap();
        let limit: usize = param(&params, "limit").unwrap().parse().unwrap();

        let delay = self.delays.lock().unwrap().get(&skip).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        let total = *self.total.lock().unwrap();
        Ok((skip..total.min(skip + limit)).map(measurement_row).collect())
    }
}

/// Full profiler backend used by view tests.
#[derive(Default)]
pub struct FakeApi {
    pub rows: FakeSource,
    pub series: BTreeMap<String, u64>,
    pub distribution: BTreeMap<String, u64>,
    pub chart_calls: Mutex<Vec<(TimeRange, Interval)>>,
    pub fail_charts: bool,
    pub dump: Value,
    pub deleted: Mutex<bool>,
}

impl FakeApi {
    pub fn new(total: usize) -> Self {
        let mut series = BTreeMap::new();
        series.insert("2024-01-01 10".to_string(), 3);
        series.insert("2024-01-01 11".to_string(), 5);
        let mut distribution = BTreeMap::new();
        distribution.insert("GET".to_string(), 6);
        distribution.insert("POST".to_string(), 2);
        Self {
            rows: FakeSource::with_rows(total),
            series,
            distribution,
            dump: json!({"summary": [], "measurements": [{"id": 1}]}),
            ..Self::default()
        }
    }
}

#[async_trait]
impl PageSource for FakeApi {
    async fn fetch_rows(&self, endpoint: &str, params: &[(String, String)]) -> Result<Vec<Row>, LoadError> {
        self.rows.fetch_rows(endpoint, params).await
    }
}

#[async_trait]
impl ProfilerApi for FakeApi {
    async fn timeseries(&self, range: TimeRange, interval: Interval) -> Result<BTreeMap<String, u64>, LoadError> {
        self.chart_calls.lock().unwrap().push((range, interval));
        if self.fail_charts {
            return Err(LoadError::http(500, "boom"));
        }
        Ok(self.series.clone())
    }

    async fn method_distribution(&self, _range: TimeRange) -> Result<BTreeMap<String, u64>, LoadError> {
        if self.fail_charts {
            return Err(LoadError::http(500, "boom"));
        }
        Ok(self.distribution.clone())
    }

    async fn measurement(&self, id: &str) -> Result<Value, LoadError> {
        match id {
            "404" => Err(LoadError::malformed("measurement 404 not found")),
            _ => Ok(json!({"id": id, "method": "GET", "context": {"args": {}}})),
        }
    }

    async fn dump_database(&self) -> Result<Value, LoadError> {
        Ok(self.dump.clone())
    }

    async fn delete_database(&self) -> Result<bool, LoadError> {
        *self.deleted.lock().unwrap() = true;
        Ok(true)
    }
}
