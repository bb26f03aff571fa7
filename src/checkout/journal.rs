//! Durable record of one checkout attempt (`checkout_journal`)
//!
//! Written before the order exists and advanced after every step, so a
//! retried checkout with the same key can skip what already happened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

use super::CheckoutStage;
use crate::accounting::{CarbonTotals, Line};
use crate::models::CartItem;
use crate::store::{self, Filter, RecordStore, Select, StoreError, Table};

/// Caller-chosen identity of one checkout attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(pub Uuid);

impl IdempotencyKey {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IdempotencyKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A cart line frozen at checkout time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalLine {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Unit price, zero when the product was not resolvable
    pub price: f64,
    /// Unit footprint, zero when the product was not resolvable
    pub carbon_footprint: f64,
    /// Stock seen with the cart; `None` skips the stock step for this line
    pub stock: Option<i32>,
}

impl From<&CartItem> for JournalLine {
    fn from(item: &CartItem) -> Self {
        let product = item.product();
        Self {
            product_id: item.product_id,
            quantity: item.quantity,
            price: product.map_or(0.0, |p| p.price),
            carbon_footprint: product.map_or(0.0, |p| p.carbon_footprint),
            stock: product.map(|p| p.stock),
        }
    }
}

/// Stored journal row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutJournal {
    pub id: Uuid,
    pub idempotency_key: IdempotencyKey,
    pub user_id: Uuid,
    /// Assigned before the order is inserted so a retry can look it up
    pub order_id: Uuid,
    /// Last step that completed
    pub stage: CheckoutStage,
    pub lines: Vec<JournalLine>,
    pub total_price: f64,
    pub total_carbon: f64,
    pub eco_points: i64,
    /// Point balance of the profile snapshot the checkout started from
    pub points_before: i64,
    /// Lines already decremented under the guarded stock policy
    #[serde(default)]
    pub lines_adjusted: usize,
    #[serde(default)]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CheckoutJournal {
    pub fn totals(&self) -> CarbonTotals {
        CarbonTotals {
            total_price: self.total_price,
            total_carbon: self.total_carbon,
            eco_points: self.eco_points,
        }
    }

    /// Where the state machine stands, `Failed` when the last attempt stopped early
    pub fn state(&self) -> CheckoutStage {
        if self.last_error.is_some() && self.stage < CheckoutStage::CartCleared {
            CheckoutStage::Failed
        } else {
            self.stage
        }
    }
}

#[derive(Debug, Serialize)]
struct NewJournal<'a> {
    idempotency_key: IdempotencyKey,
    user_id: Uuid,
    order_id: Uuid,
    stage: CheckoutStage,
    lines: &'a [JournalLine],
    total_price: f64,
    total_carbon: f64,
    eco_points: i64,
    points_before: i64,
    lines_adjusted: usize,
}

pub(crate) async fn find<S: RecordStore + ?Sized>(
    store: &S,
    key: IdempotencyKey,
) -> Result<Option<CheckoutJournal>, StoreError> {
    store::fetch_one(
        store,
        Table::CheckoutJournal,
        Select::new().eq("idempotency_key", key),
    )
    .await
}

pub(crate) async fn open<S: RecordStore + ?Sized>(
    store: &S,
    key: IdempotencyKey,
    user_id: Uuid,
    lines: &[JournalLine],
    totals: CarbonTotals,
    points_before: i64,
) -> Result<CheckoutJournal, StoreError> {
    let entry = NewJournal {
        idempotency_key: key,
        user_id,
        order_id: Uuid::new_v4(),
        stage: CheckoutStage::Computing,
        lines,
        total_price: totals.total_price,
        total_carbon: totals.total_carbon,
        eco_points: totals.eco_points,
        points_before,
        lines_adjusted: 0,
    };
    store::create(store, Table::CheckoutJournal, &entry).await
}

/// Persist `changes` on the journal row
pub(crate) async fn patch<S: RecordStore + ?Sized>(
    store: &S,
    journal: &CheckoutJournal,
    changes: Value,
) -> Result<(), StoreError> {
    store
        .update(
            Table::CheckoutJournal,
            changes,
            &[Filter::eq("id", journal.id)],
        )
        .await?;
    Ok(())
}

/// Note why the attempt stopped; losing this note only costs diagnostics
pub(crate) async fn record_failure<S: RecordStore + ?Sized>(
    store: &S,
    journal: &CheckoutJournal,
    error: &StoreError,
) {
    let changes = json!({ "last_error": error.to_string() });
    if let Err(e) = patch(store, journal, changes).await {
        warn!(
            "could not record failure on checkout {}: {}",
            journal.idempotency_key, e
        );
    }
}
