#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;
use candle_importer::{
    interpolate::CandleTable,
    io::{DataSink, SinkError},
    models::request_params::CandleQuery,
    providers::{ApiSnafu, CandleSource, ProviderError},
};
use serde_json::{Value, json};

pub const START: i64 = 1_514_764_800; // 2018-01-01 00:00 UTC
pub const STEP: i64 = 60;

/// One scripted answer for a window attempt.
#[derive(Clone, Debug)]
pub enum Reply {
    Error,
    /// A JSON object instead of a list, as the exchange sends on errors.
    NotAList,
}

/// In-memory exchange: answers every query with one candle per bucket,
/// newest first, unless told otherwise.
#[derive(Default)]
pub struct ScriptedSource {
    /// Replies consumed in order for the window starting at the key; once
    /// drained the window answers normally.
    scripts: Mutex<HashMap<i64, VecDeque<Reply>>>,
    /// Windows that never succeed.
    dead_windows: HashSet<i64>,
    /// Buckets the exchange has no candle for.
    holes: HashSet<i64>,
    /// Buckets answered with an undecodable row.
    garbled: HashSet<i64>,
    /// Answer nothing at all.
    empty: bool,
    pub queries: Mutex<Vec<CandleQuery>>,
}

impl ScriptedSource {
    pub fn perfect() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            empty: true,
            ..Self::default()
        }
    }

    pub fn script(self, window_start: i64, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(window_start, replies.into_iter().collect());
        self
    }

    pub fn dead_window(mut self, window_start: i64) -> Self {
        self.dead_windows.insert(window_start);
        self
    }

    pub fn holes(mut self, buckets: impl IntoIterator<Item = i64>) -> Self {
        self.holes.extend(buckets);
        self
    }

    pub fn garbled(mut self, buckets: impl IntoIterator<Item = i64>) -> Self {
        self.garbled.extend(buckets);
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

/// Monotonic in the bucket index, so interpolated values are easy to bound.
pub fn wire_row(ts: i64) -> Value {
    let v = 100.0 + ((ts - START) / STEP) as f64 * 0.5;
    json!([ts, v - 1.0, v + 1.0, v, v + 0.25, 10.0 + v])
}

#[async_trait]
impl CandleSource for ScriptedSource {
    async fn retrieve(&self, query: &CandleQuery) -> Result<Value, ProviderError> {
        self.queries.lock().unwrap().push(query.clone());
        let start = query.start.timestamp();

        if self.dead_windows.contains(&start) {
            return ApiSnafu { message: "503 Service Unavailable" }.fail();
        }
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&start)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(Reply::Error) => return ApiSnafu { message: "429 Too Many Requests" }.fail(),
            Some(Reply::NotAList) => return Ok(json!({ "message": "slow down" })),
            None => {}
        }
        if self.empty {
            return Ok(json!([]));
        }

        let step = query.granularity.secs();
        let buckets = (query.end.timestamp() - start + step - 1) / step;
        let rows: Vec<Value> = (0..buckets)
            .rev()
            .map(|i| start + i * step)
            .filter(|ts| !self.holes.contains(ts))
            .map(|ts| {
                if self.garbled.contains(&ts) {
                    json!([ts, "n/a"])
                } else {
                    wire_row(ts)
                }
            })
            .collect();
        Ok(Value::Array(rows))
    }
}

/// Keeps every table it is handed.
#[derive(Default)]
pub struct MemorySink {
    pub written: Mutex<Vec<(String, CandleTable)>>,
}

impl MemorySink {
    pub fn last(&self) -> Option<(String, CandleTable)> {
        self.written.lock().unwrap().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.written.lock().unwrap().len()
    }
}

#[async_trait]
impl DataSink for MemorySink {
    type Output = usize;

    async fn write(&self, table: &CandleTable, name: &str) -> Result<usize, SinkError> {
        self.written
            .lock()
            .unwrap()
            .push((name.to_string(), table.clone()));
        Ok(table.len())
    }
}
