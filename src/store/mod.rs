//! The record store the storefront delegates all persistence to
//!
//! [`RecordStore`] is the generic table API the core is written against.
//! [`PostgrestStore`] talks to a Supabase project over PostgREST and
//! [`MemoryStore`] keeps everything in process.

mod error;
mod filter;
pub mod memory;
pub mod postgrest;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt;

pub use error::*;
pub use filter::*;
pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

/// Tables the storefront reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Profiles,
    Products,
    CartItems,
    Orders,
    OrderItems,
    CheckoutJournal,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::Products => "products",
            Table::CartItems => "cart_items",
            Table::Orders => "orders",
            Table::OrderItems => "order_items",
            Table::CheckoutJournal => "checkout_journal",
        }
    }

    /// Column the backend stamps with the insertion time
    pub fn timestamp_column(&self) -> &'static str {
        match self {
            Table::CartItems => "added_at",
            _ => "created_at",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// A to-one relation pulled into each selected row under the related table's name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub table: Table,
    pub foreign_key: &'static str,
}

impl Embed {
    /// The product referenced by `product_id`
    pub fn product() -> Self {
        Self {
            table: Table::Products,
            foreign_key: "product_id",
        }
    }
}

/// Read query: filters, ordering, limit and embedded relations
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub filters: Vec<Filter>,
    pub order: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
    pub embeds: Vec<Embed>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter rows where column equals a value
    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Order the results by a column
    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        self.order = Some((column.to_string(), order));
        self
    }

    /// Newest rows first
    pub fn newest_first(self, table: Table) -> Self {
        self.order(table.timestamp_column(), SortOrder::Descending)
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    /// The PostgREST `select` parameter
    pub fn columns(&self) -> String {
        let mut columns = String::from("*");
        for embed in &self.embeds {
            columns.push_str(&format!(",{}(*)", embed.table));
        }
        columns
    }
}

/// Generic structured-record service
///
/// Each call is atomic on its own; nothing spans tables.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert records, returning them with generated id and timestamp
    async fn insert(&self, table: Table, records: Vec<Value>) -> Result<Vec<Value>, StoreError>;

    /// Rows matching the query
    async fn select(&self, table: Table, query: &Select) -> Result<Vec<Value>, StoreError>;

    /// Apply `patch` to every matching row, returning how many changed
    async fn update(
        &self,
        table: Table,
        patch: Value,
        filters: &[Filter],
    ) -> Result<usize, StoreError>;

    /// Delete every matching row, returning how many were removed
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<usize, StoreError>;

    /// Call a stored procedure
    async fn rpc(&self, function: &str, params: Value) -> Result<Value, StoreError>;
}

/// Select rows and deserialize them
pub async fn fetch<S, T>(store: &S, table: Table, query: &Select) -> Result<Vec<T>, StoreError>
where
    S: RecordStore + ?Sized,
    T: DeserializeOwned,
{
    store
        .select(table, query)
        .await?
        .into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| StoreError::Deserialization(format!("{}: {}", table, e)))
        })
        .collect()
}

/// First row matching the query, if any
pub async fn fetch_one<S, T>(store: &S, table: Table, query: Select) -> Result<Option<T>, StoreError>
where
    S: RecordStore + ?Sized,
    T: DeserializeOwned,
{
    let rows = fetch(store, table, &query.limit(1)).await?;
    Ok(rows.into_iter().next())
}

/// Insert a batch of records and deserialize what the store returned
pub async fn create_many<S, T, R>(store: &S, table: Table, records: &[T]) -> Result<Vec<R>, StoreError>
where
    S: RecordStore + ?Sized,
    T: Serialize,
    R: DeserializeOwned,
{
    let values = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()?;
    store
        .insert(table, values)
        .await?
        .into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| StoreError::Deserialization(format!("{}: {}", table, e)))
        })
        .collect()
}

/// Insert one record and return the stored version
pub async fn create<S, T, R>(store: &S, table: Table, record: &T) -> Result<R, StoreError>
where
    S: RecordStore + ?Sized,
    T: Serialize,
    R: DeserializeOwned,
{
    create_many(store, table, std::slice::from_ref(record))
        .await?
        .pop()
        .ok_or_else(|| {
            StoreError::Deserialization(format!("no {} row returned after insert", table))
        })
}
