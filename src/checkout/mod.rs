//! Order placement
//!
//! Turns the cart into an order through a fixed sequence of single-table
//! writes:
//!
//! `Idle → Computing → Submitting → ItemsWritten → ProfileCredited →
//! StockAdjusted → CartCleared → Done`, with `Failed` reachable from any step.
//!
//! The store has no cross-table transaction, so progress is journaled
//! (see [`journal`]). Re-running a checkout with the same [`IdempotencyKey`]
//! resumes after the last completed step, or replays a finished one without
//! writing anything.

pub mod journal;

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::accounting::CarbonTotals;
use crate::catalog::CatalogService;
use crate::cart::CartService;
use crate::config::{ShopOptions, StockPolicy};
use crate::error::{Error, Result, ValidationError};
use crate::models::{CartItem, NewOrder, NewOrderItem, Order, OrderItem, Product};
use crate::session::{authenticated, Session};
use crate::store::{self, Filter, RecordStore, Select, StoreError, Table};

pub use journal::{CheckoutJournal, IdempotencyKey, JournalLine};

/// States of the order placement workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    Idle,
    /// Totals computed and the cart snapshot journaled
    Computing,
    /// Order row written
    Submitting,
    ItemsWritten,
    ProfileCredited,
    StockAdjusted,
    CartCleared,
    Done,
    Failed,
}

impl CheckoutStage {
    /// The step that follows a completed one
    pub fn next(self) -> Option<CheckoutStage> {
        match self {
            CheckoutStage::Idle => Some(CheckoutStage::Computing),
            CheckoutStage::Computing => Some(CheckoutStage::Submitting),
            CheckoutStage::Submitting => Some(CheckoutStage::ItemsWritten),
            CheckoutStage::ItemsWritten => Some(CheckoutStage::ProfileCredited),
            CheckoutStage::ProfileCredited => Some(CheckoutStage::StockAdjusted),
            CheckoutStage::StockAdjusted => Some(CheckoutStage::CartCleared),
            CheckoutStage::CartCleared => Some(CheckoutStage::Done),
            CheckoutStage::Done | CheckoutStage::Failed => None,
        }
    }

    /// Whether the order's side effects are all applied
    pub fn is_settled(self) -> bool {
        matches!(self, CheckoutStage::CartCleared | CheckoutStage::Done)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStage::Idle => "idle",
            CheckoutStage::Computing => "computing",
            CheckoutStage::Submitting => "submitting",
            CheckoutStage::ItemsWritten => "items_written",
            CheckoutStage::ProfileCredited => "profile_credited",
            CheckoutStage::StockAdjusted => "stock_adjusted",
            CheckoutStage::CartCleared => "cart_cleared",
            CheckoutStage::Done => "done",
            CheckoutStage::Failed => "failed",
        }
    }
}

impl fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a completed checkout produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: Uuid,
    pub idempotency_key: IdempotencyKey,
    pub totals: CarbonTotals,
    pub line_count: usize,
    /// The key had already completed; nothing was written this time
    pub replayed: bool,
}

/// Receipt plus the refreshed cart and catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutOutcome {
    pub receipt: CheckoutReceipt,
    pub cart: Vec<CartItem>,
    pub catalog: Vec<Product>,
}

/// Places orders for the session's user
pub struct CheckoutService<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    options: &'a ShopOptions,
}

impl<'a, S: RecordStore + ?Sized> CheckoutService<'a, S> {
    pub fn new(store: &'a S, options: &'a ShopOptions) -> Self {
        Self { store, options }
    }

    /// Journal row of an earlier attempt, if any
    pub async fn status(&self, key: IdempotencyKey) -> Result<Option<CheckoutJournal>> {
        Ok(journal::find(self.store, key).await?)
    }

    /// Convert `cart` into an order
    ///
    /// `cart` must be the lines as last fetched with their products joined;
    /// prices and footprints are snapshotted from it, not re-read. The
    /// caller must not start a second checkout for the same session while
    /// one is in flight.
    pub async fn place_order(
        &self,
        session: Option<&Session>,
        cart: &[CartItem],
        key: IdempotencyKey,
    ) -> Result<CheckoutOutcome> {
        let session = authenticated(session)?;

        let (mut journal, resumed) = match journal::find(self.store, key).await? {
            Some(existing) if existing.user_id != session.user_id => {
                return Err(ValidationError::IdempotencyConflict { key: key.0 }.into());
            }
            Some(existing) => {
                info!(
                    "checkout {} found at stage {}, resuming",
                    key, existing.stage
                );
                (existing, true)
            }
            None => {
                if cart.is_empty() {
                    return Err(ValidationError::EmptyCart.into());
                }
                (self.compute(session, cart, key).await?, false)
            }
        };
        let replayed = journal.stage.is_settled();

        while let Some(next) = journal.stage.next() {
            debug!("checkout {}: {} -> {}", key, journal.stage, next);
            if let Err(source) = self.run_step(session, &mut journal, next, resumed).await {
                return Err(self.fail(&journal, journal.stage, source).await);
            }
            if let Err(source) = self.advance(&mut journal, next).await {
                return Err(self.fail(&journal, next, source).await);
            }
            info!("checkout {} reached {}", key, journal.stage);
        }

        let receipt = CheckoutReceipt {
            order_id: journal.order_id,
            idempotency_key: key,
            totals: journal.totals(),
            line_count: journal.lines.len(),
            replayed,
        };

        let cart = CartService::new(self.store, self.options)
            .refresh(Some(session))
            .await?;
        let catalog = CatalogService::new(self.store, self.options)
            .list_products()
            .await?;

        Ok(CheckoutOutcome {
            receipt,
            cart,
            catalog,
        })
    }

    async fn compute(
        &self,
        session: &Session,
        cart: &[CartItem],
        key: IdempotencyKey,
    ) -> Result<CheckoutJournal> {
        let totals = CarbonTotals::compute(cart, self.options.points_per_eco_unit);
        let lines = cart.iter().map(JournalLine::from).collect::<Vec<_>>();
        debug!(
            "checkout {}: {} line(s), price {:.2}, carbon {:.2}, {} point(s)",
            key,
            lines.len(),
            totals.total_price,
            totals.total_carbon,
            totals.eco_points
        );

        let journal = journal::open(
            self.store,
            key,
            session.user_id,
            &lines,
            totals,
            session.carbon_points(),
        )
        .await?;
        info!("checkout {} reached {}", key, journal.stage);
        Ok(journal)
    }

    async fn run_step(
        &self,
        session: &Session,
        journal: &mut CheckoutJournal,
        step: CheckoutStage,
        resumed: bool,
    ) -> std::result::Result<(), StoreError> {
        match step {
            CheckoutStage::Submitting => self.create_order(session, journal, resumed).await?,
            CheckoutStage::ItemsWritten => self.create_items(journal, resumed).await?,
            CheckoutStage::ProfileCredited => self.credit_profile(session, journal).await?,
            CheckoutStage::StockAdjusted => self.adjust_stock(journal, resumed).await?,
            CheckoutStage::CartCleared => {
                self.store
                    .delete(Table::CartItems, &[Filter::eq("user_id", session.user_id)])
                    .await?;
            }
            CheckoutStage::Idle
            | CheckoutStage::Computing
            | CheckoutStage::Done
            | CheckoutStage::Failed => {}
        }
        Ok(())
    }

    /// Journal `step` as completed
    async fn advance(
        &self,
        journal: &mut CheckoutJournal,
        step: CheckoutStage,
    ) -> std::result::Result<(), StoreError> {
        match journal::patch(self.store, journal, json!({ "stage": step })).await {
            Ok(()) => {}
            // Everything is applied; a lost marker only means the next
            // retry replays from `cart_cleared`.
            Err(e) if step == CheckoutStage::Done => {
                warn!("checkout {} done but not marked: {}", journal.idempotency_key, e);
            }
            Err(e) => return Err(e),
        }
        journal.stage = step;
        Ok(())
    }

    async fn create_order(
        &self,
        session: &Session,
        journal: &CheckoutJournal,
        resumed: bool,
    ) -> std::result::Result<(), StoreError> {
        if resumed {
            let existing: Option<Order> = store::fetch_one(
                self.store,
                Table::Orders,
                Select::new().eq("id", journal.order_id),
            )
            .await?;
            if existing.is_some() {
                debug!("order {} already written", journal.order_id);
                return Ok(());
            }
        }

        let order = NewOrder {
            id: journal.order_id,
            user_id: session.user_id,
            total_price: journal.total_price,
            total_carbon: journal.total_carbon,
            carbon_points_earned: journal.eco_points,
            status: &self.options.order_status,
        };
        let created: Order = store::create(self.store, Table::Orders, &order).await?;
        info!("order {} created for {}", created.id, created.user_id);
        Ok(())
    }

    async fn create_items(
        &self,
        journal: &CheckoutJournal,
        resumed: bool,
    ) -> std::result::Result<(), StoreError> {
        if resumed {
            let existing: Vec<OrderItem> = store::fetch(
                self.store,
                Table::OrderItems,
                &Select::new().eq("order_id", journal.order_id),
            )
            .await?;
            if !existing.is_empty() {
                debug!("items of order {} already written", journal.order_id);
                return Ok(());
            }
        }

        let items = journal
            .lines
            .iter()
            .map(|line| NewOrderItem {
                order_id: journal.order_id,
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price,
                carbon_footprint: line.carbon_footprint,
            })
            .collect::<Vec<_>>();
        let _: Vec<OrderItem> = store::create_many(self.store, Table::OrderItems, &items).await?;
        Ok(())
    }

    /// Write the absolute balance from the journaled snapshot, so retries credit once
    async fn credit_profile(
        &self,
        session: &Session,
        journal: &CheckoutJournal,
    ) -> std::result::Result<(), StoreError> {
        let balance = journal.points_before + journal.eco_points;
        self.store
            .update(
                Table::Profiles,
                json!({ "carbon_points": balance }),
                &[Filter::eq("id", session.user_id)],
            )
            .await?;
        debug!("profile {} balance set to {}", session.user_id, balance);
        Ok(())
    }

    async fn adjust_stock(
        &self,
        journal: &mut CheckoutJournal,
        resumed: bool,
    ) -> std::result::Result<(), StoreError> {
        match self.options.stock_policy {
            StockPolicy::Snapshot => {
                for line in &journal.lines {
                    let Some(stock) = line.stock else { continue };
                    let remaining = stock - line.quantity;
                    if remaining < 0 {
                        warn!(
                            "product {} oversold by {}; stock floored at 0",
                            line.product_id, -remaining
                        );
                    }
                    if resumed {
                        debug!(
                            "resumed checkout {} rewrites stock of {} to {} from its cart snapshot",
                            journal.idempotency_key,
                            line.product_id,
                            remaining.max(0)
                        );
                    }
                    self.store
                        .update(
                            Table::Products,
                            json!({ "stock": remaining.max(0) }),
                            &[Filter::eq("id", line.product_id)],
                        )
                        .await?;
                }
            }
            StockPolicy::Guarded => {
                let start = journal.lines_adjusted;
                for index in start..journal.lines.len() {
                    let (product_id, quantity, has_stock) = match journal.lines.get(index) {
                        Some(line) => (line.product_id, line.quantity, line.stock.is_some()),
                        None => break,
                    };
                    if has_stock {
                        self.store
                            .rpc(
                                "decrement_stock",
                                json!({
                                    "product_id": product_id,
                                    "quantity": quantity,
                                    "checkout_key": journal.idempotency_key,
                                    "line": index,
                                }),
                            )
                            .await?;
                    }
                    journal::patch(
                        self.store,
                        journal,
                        json!({ "lines_adjusted": index + 1 }),
                    )
                    .await?;
                    journal.lines_adjusted = index + 1;
                }
            }
        }
        Ok(())
    }

    /// `applied` is the furthest stage whose effects reached the store, which
    /// can be ahead of the journaled stage when only the marker write failed.
    async fn fail(
        &self,
        journal: &CheckoutJournal,
        applied: CheckoutStage,
        source: StoreError,
    ) -> Error {
        warn!(
            "checkout {} failed after {}: {}",
            journal.idempotency_key, applied, source
        );
        journal::record_failure(self.store, journal, &source).await;

        if applied >= CheckoutStage::Submitting {
            Error::PartialOrder {
                order_id: journal.order_id,
                stage: journal.stage,
                source,
            }
        } else {
            Error::Store(source)
        }
    }
}
