use crate::storage::{FilterOp, Query, QueryResponse, Store};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// In-process store over a fixed set of rows.
///
/// Evaluates the same query shape as the remote store so handlers can be
/// exercised without a network. Filters compare values as strings, which is
/// what ISO-8601 timestamps need.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Vec<Value>,
    failure: Option<String>,
}

impl MemoryStore {
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows,
            failure: None,
        }
    }

    /// A store whose every query fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            failure: Some(message.into()),
        }
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    fn store_name(&self) -> &'static str {
        "memory"
    }

    async fn execute(&self, query: &Query) -> anyhow::Result<QueryResponse> {
        if let Some(message) = &self.failure {
            anyhow::bail!("{message}");
        }

        let mut rows: Vec<&Value> = self
            .rows
            .iter()
            .filter(|row| {
                query.filters.iter().all(|f| {
                    let Some(actual) = row.get(&f.column).map(as_text) else {
                        return false;
                    };
                    match f.op {
                        FilterOp::Gte => actual >= f.value,
                    }
                })
            })
            .collect();

        let count = query.count_exact.then_some(rows.len() as u64);

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ord
                } else {
                    ord.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        let data = if query.head {
            Vec::new()
        } else {
            rows.into_iter()
                .map(|row| project(row, &query.columns))
                .collect()
        };

        Ok(QueryResponse { data, count })
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => as_text(x).cmp(&as_text(y)),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

fn project(row: &Value, columns: &str) -> Value {
    if columns.trim() == "*" {
        return row.clone();
    }
    let Some(obj) = row.as_object() else {
        return row.clone();
    };

    let picked: Map<String, Value> = columns
        .split(',')
        .map(str::trim)
        .filter_map(|c| obj.get(c).map(|v| (c.to_string(), v.clone())))
        .collect();
    Value::Object(picked)
}
