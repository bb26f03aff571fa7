//! EcoBazaar storefront core
//!
//! Carbon accounting, eco-friendly recommendations, cart mutations and order
//! placement for a marketplace that delegates persistence to a Supabase
//! project (or any other [`store::RecordStore`]).

pub mod account;
pub mod accounting;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod recommend;
pub mod reports;
pub mod session;
pub mod store;

use crate::account::AccountService;
use crate::cart::CartService;
use crate::catalog::CatalogService;
use crate::checkout::CheckoutService;
use crate::config::{ShopOptions, StoreConfig};
use crate::error::Result;
use crate::reports::ReportService;
use crate::store::{PostgrestStore, RecordStore};

/// The main entry point of the storefront
///
/// Holds the record store and the shop's business rules and hands out the
/// per-concern services, which borrow both.
pub struct EcoBazaar<S: RecordStore = PostgrestStore> {
    store: S,
    options: ShopOptions,
}

impl EcoBazaar<PostgrestStore> {
    /// Create a storefront talking to a Supabase project with default rules
    ///
    /// # Example
    ///
    /// ```
    /// use ecobazaar::EcoBazaar;
    ///
    /// let shop = EcoBazaar::new("https://your-project-url.supabase.co", "your-anon-key").unwrap();
    /// assert_eq!(shop.options().max_alternatives, 2);
    /// ```
    pub fn new(supabase_url: &str, supabase_key: &str) -> Result<Self> {
        Self::from_config(StoreConfig::new(supabase_url, supabase_key)?, ShopOptions::default())
    }

    /// Create a storefront from explicit configuration
    pub fn from_config(config: StoreConfig, options: ShopOptions) -> Result<Self> {
        Ok(Self::with_store(PostgrestStore::new(config)?, options))
    }
}

impl<S: RecordStore> EcoBazaar<S> {
    /// Create a storefront over any record store
    ///
    /// # Example
    ///
    /// ```
    /// use ecobazaar::{EcoBazaar, config::ShopOptions, store::MemoryStore};
    ///
    /// let shop = EcoBazaar::with_store(MemoryStore::new(), ShopOptions::default());
    /// ```
    pub fn with_store(store: S, options: ShopOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &ShopOptions {
        &self.options
    }

    pub fn catalog(&self) -> CatalogService<'_, S> {
        CatalogService::new(&self.store, &self.options)
    }

    pub fn cart(&self) -> CartService<'_, S> {
        CartService::new(&self.store, &self.options)
    }

    pub fn checkout(&self) -> CheckoutService<'_, S> {
        CheckoutService::new(&self.store, &self.options)
    }

    pub fn account(&self) -> AccountService<'_, S> {
        AccountService::new(&self.store)
    }

    pub fn reports(&self) -> ReportService<'_, S> {
        ReportService::new(&self.store, &self.options)
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::accounting::CarbonTotals;
    pub use crate::cart::{AddToCart, Choice};
    pub use crate::checkout::{CheckoutOutcome, CheckoutStage, IdempotencyKey};
    pub use crate::config::{ShopOptions, StockPolicy, StoreConfig};
    pub use crate::error::{Error, Result, ValidationError};
    pub use crate::models::{CartItem, NewProduct, Order, Product, Profile};
    pub use crate::recommend::Recommendation;
    pub use crate::session::{Role, Session};
    pub use crate::store::{MemoryStore, PostgrestStore, RecordStore};
    pub use crate::EcoBazaar;
}
