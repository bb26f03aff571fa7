//! In-process [`RecordStore`]
//!
//! Behaves like the PostgREST backend closely enough to run every workflow
//! offline: generated ids and timestamps, filters, ordering, limits, embedded
//! products and the `decrement_stock` procedure. Failures can be scheduled
//! per operation and table to exercise partial-failure paths.
//!
//! `decrement_stock` applies at most once per `(checkout_key, line)` pair, so a
//! checkout that lost its progress marker can call it again safely.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use super::filter::compare;
use super::{Filter, RecordStore, Select, SortOrder, StoreError, Table};

/// Kind of store call, used to schedule failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Insert,
    Select,
    Update,
    Delete,
    Rpc,
}

#[derive(Debug, Clone)]
struct ScheduledFailure {
    operation: Operation,
    table: Option<Table>,
    skip: usize,
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<Table, Vec<Value>>,
    failures: VecDeque<ScheduledFailure>,
    calls: Vec<(Operation, Option<Table>)>,
    applied_decrements: BTreeSet<(String, u64)>,
}

/// Record store holding every table in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Put rows into a table as-is, without generating ids or timestamps
    pub fn seed(&self, table: Table, rows: impl IntoIterator<Item = Value>) {
        self.lock().tables.entry(table).or_default().extend(rows);
    }

    /// Snapshot of a table's rows in insertion order
    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.lock().tables.get(&table).cloned().unwrap_or_default()
    }

    /// Fail the next call of `operation` on `table`
    pub fn fail_next(&self, operation: Operation, table: Table) {
        self.fail_after(operation, table, 0);
    }

    /// Let `skip` matching calls succeed, then fail the following one
    pub fn fail_after(&self, operation: Operation, table: Table, skip: usize) {
        self.lock().failures.push_back(ScheduledFailure {
            operation,
            table: Some(table),
            skip,
        });
    }

    /// Fail the next stored procedure call
    pub fn fail_next_rpc(&self) {
        self.lock().failures.push_back(ScheduledFailure {
            operation: Operation::Rpc,
            table: None,
            skip: 0,
        });
    }

    /// Number of calls made for an operation, optionally restricted to a table
    pub fn calls(&self, operation: Operation, table: Option<Table>) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|(op, t)| *op == operation && (table.is_none() || *t == table))
            .count()
    }

    /// Number of write calls (insert, update, delete, rpc) across all tables
    pub fn write_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|(op, _)| *op != Operation::Select)
            .count()
    }
}

impl State {
    fn record(&mut self, operation: Operation, table: Option<Table>) -> Result<(), StoreError> {
        self.calls.push((operation, table));

        let position = self
            .failures
            .iter()
            .position(|f| f.operation == operation && f.table == table);
        if let Some(index) = position {
            if let Some(failure) = self.failures.get_mut(index) {
                if failure.skip > 0 {
                    failure.skip -= 1;
                    return Ok(());
                }
            }
            self.failures.remove(index);
            let target = table.map(|t| t.as_str()).unwrap_or("rpc");
            return Err(StoreError::Unavailable(format!(
                "injected {:?} failure on {}",
                operation, target
            )));
        }
        Ok(())
    }

    fn table(&mut self, table: Table) -> &mut Vec<Value> {
        self.tables.entry(table).or_default()
    }

    fn embed_row(&self, mut row: Value, query: &Select) -> Value {
        for embed in &query.embeds {
            let related = row
                .get(embed.foreign_key)
                .and_then(|key| {
                    self.tables.get(&embed.table).and_then(|rows| {
                        rows.iter()
                            .find(|candidate| candidate.get("id") == Some(key))
                            .cloned()
                    })
                })
                .unwrap_or(Value::Null);
            if let Value::Object(map) = &mut row {
                map.insert(embed.table.as_str().to_string(), related);
            }
        }
        row
    }
}

fn matches_all(filters: &[Filter], row: &Value) -> bool {
    filters.iter().all(|f| f.matches(row))
}

fn merge(row: &mut Value, patch: &Value) {
    if let (Value::Object(target), Value::Object(changes)) = (row, patch) {
        for (key, value) in changes {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn insert(&self, table: Table, records: Vec<Value>) -> Result<Vec<Value>, StoreError> {
        let mut state = self.lock();
        state.record(Operation::Insert, Some(table))?;
        debug!("memory insert {} row(s) into {}", records.len(), table);

        let mut stored = Vec::with_capacity(records.len());
        for record in records {
            let mut map = match record {
                Value::Object(map) => map,
                other => {
                    return Err(StoreError::Constraint(format!(
                        "{} rows must be objects, got {}",
                        table, other
                    )))
                }
            };
            map.entry("id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
            map.entry(table.timestamp_column())
                .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
            stored.push(Value::Object(map));
        }
        state.table(table).extend(stored.iter().cloned());
        Ok(stored)
    }

    async fn select(&self, table: Table, query: &Select) -> Result<Vec<Value>, StoreError> {
        let mut state = self.lock();
        state.record(Operation::Select, Some(table))?;

        let mut rows = state
            .tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(&query.filters, row))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        if let Some((column, order)) = &query.order {
            // Stable sort keeps insertion order among equal keys.
            rows.sort_by(|a, b| {
                let ordering = compare(
                    a.get(column).unwrap_or(&Value::Null),
                    b.get(column).unwrap_or(&Value::Null),
                )
                .unwrap_or(Ordering::Equal);
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }

        Ok(rows
            .into_iter()
            .map(|row| state.embed_row(row, query))
            .collect())
    }

    async fn update(
        &self,
        table: Table,
        patch: Value,
        filters: &[Filter],
    ) -> Result<usize, StoreError> {
        let mut state = self.lock();
        state.record(Operation::Update, Some(table))?;

        let mut affected = 0;
        for row in state.table(table).iter_mut() {
            if matches_all(filters, row) {
                merge(row, &patch);
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<usize, StoreError> {
        let mut state = self.lock();
        state.record(Operation::Delete, Some(table))?;

        let rows = state.table(table);
        let before = rows.len();
        rows.retain(|row| !matches_all(filters, row));
        Ok(before - rows.len())
    }

    async fn rpc(&self, function: &str, params: Value) -> Result<Value, StoreError> {
        let mut state = self.lock();
        state.record(Operation::Rpc, None)?;

        match function {
            "decrement_stock" => {
                let product_id = params.get("product_id").cloned().unwrap_or(Value::Null);
                let quantity = params
                    .get("quantity")
                    .and_then(Value::as_i64)
                    .ok_or_else(|| StoreError::Constraint("quantity is required".to_string()))?;
                let claim = match (
                    params.get("checkout_key").and_then(Value::as_str),
                    params.get("line").and_then(Value::as_u64),
                ) {
                    (Some(key), Some(line)) => Some((key.to_string(), line)),
                    _ => None,
                };
                let replay = claim
                    .as_ref()
                    .map_or(false, |claim| state.applied_decrements.contains(claim));

                let product = state
                    .table(Table::Products)
                    .iter_mut()
                    .find(|row| row.get("id") == Some(&product_id))
                    .ok_or_else(|| {
                        StoreError::Constraint(format!("product {} not found", product_id))
                    })?;
                let stock = product.get("stock").and_then(Value::as_i64).unwrap_or(0);
                if replay {
                    debug!("decrement of {} already applied", product_id);
                    return Ok(json!(stock));
                }
                if stock < quantity {
                    return Err(StoreError::Constraint(format!(
                        "insufficient stock for {}: {} < {}",
                        product_id, stock, quantity
                    )));
                }
                let remaining = stock - quantity;
                merge(product, &json!({ "stock": remaining }));
                if let Some(claim) = claim {
                    state.applied_decrements.insert(claim);
                }
                Ok(json!(remaining))
            }
            other => Err(StoreError::UnparsedApi {
                message: format!("function {} not found", other),
                status: reqwest::StatusCode::NOT_FOUND,
            }),
        }
    }
}
