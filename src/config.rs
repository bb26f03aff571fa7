//! Configuration for the backend connection and the shop's business rules

use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Where the record store lives and how to authenticate against it
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the Supabase project
    pub url: Url,

    /// The anonymous API key
    pub anon_key: String,

    /// User access token; requests fall back to the anon key without one
    pub access_token: Option<String>,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// The database schema
    pub schema: String,
}

impl StoreConfig {
    /// Creates a new configuration, validating the URL
    pub fn new(url: &str, anon_key: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| Error::config(format!("invalid URL {}: {}", url, e)))?;
        if anon_key.is_empty() {
            return Err(Error::config("anon_key cannot be empty"));
        }
        Ok(Self {
            url,
            anon_key: anon_key.to_string(),
            access_token: None,
            request_timeout: Some(Duration::from_secs(30)),
            schema: "public".to_string(),
        })
    }

    /// Reads `SUPABASE_URL`, `SUPABASE_ANON_KEY` and optionally `SUPABASE_ACCESS_TOKEN`
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("SUPABASE_URL")
            .map_err(|_| Error::config("SUPABASE_URL environment variable not found"))?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| Error::config("SUPABASE_ANON_KEY environment variable not found"))?;

        let config = Self::new(&url, &anon_key)?;
        Ok(match std::env::var("SUPABASE_ACCESS_TOKEN") {
            Ok(token) if !token.is_empty() => config.with_access_token(&token),
            _ => config,
        })
    }

    /// Set the user access token
    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the database schema
    pub fn with_schema(mut self, value: &str) -> Self {
        self.schema = value.to_string();
        self
    }

    /// `<project>/rest/v1`
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.url.as_str().trim_end_matches('/'))
    }
}

/// How checkout decrements stock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockPolicy {
    /// Write `stock - quantity` computed from the cart snapshot, never below zero.
    /// Concurrent orders can oversell.
    #[default]
    Snapshot,

    /// Ask the store to decrement atomically through the `decrement_stock`
    /// procedure, which refuses to go below zero and applies once per
    /// checkout line
    Guarded,
}

/// Business rules of the storefront
#[derive(Debug, Clone, PartialEq)]
pub struct ShopOptions {
    /// Footprint (kg CO2e per unit) above which a non-eco product triggers a suggestion
    pub carbon_threshold: f64,

    /// Maximum number of alternatives suggested
    pub max_alternatives: usize,

    /// Points earned per unit of an eco-friendly product
    pub points_per_eco_unit: f64,

    /// Status written on new orders
    pub order_status: String,

    /// How checkout decrements stock
    pub stock_policy: StockPolicy,

    /// Stock a listing is assumed to start with when estimating seller revenue
    pub seller_stock_baseline: i32,

    /// Image used for listings created without one
    pub default_image_url: String,
}

impl Default for ShopOptions {
    fn default() -> Self {
        Self {
            carbon_threshold: 3.0,
            max_alternatives: 2,
            points_per_eco_unit: 10.0,
            order_status: "completed".to_string(),
            stock_policy: StockPolicy::Snapshot,
            seller_stock_baseline: 200,
            default_image_url: "https://images.pexels.com/photos/1174775/pexels-photo-1174775.jpeg?auto=compress&cs=tinysrgb&w=800".to_string(),
        }
    }
}

impl ShopOptions {
    /// Set the suggestion threshold
    pub fn with_carbon_threshold(mut self, value: f64) -> Self {
        self.carbon_threshold = value;
        self
    }

    /// Set the maximum number of suggested alternatives
    pub fn with_max_alternatives(mut self, value: usize) -> Self {
        self.max_alternatives = value;
        self
    }

    /// Set the points earned per eco-friendly unit
    pub fn with_points_per_eco_unit(mut self, value: f64) -> Self {
        self.points_per_eco_unit = value;
        self
    }

    /// Set the status of new orders
    pub fn with_order_status(mut self, value: &str) -> Self {
        self.order_status = value.to_string();
        self
    }

    /// Set the stock decrement policy
    pub fn with_stock_policy(mut self, value: StockPolicy) -> Self {
        self.stock_policy = value;
        self
    }

    /// Set the seller revenue baseline
    pub fn with_seller_stock_baseline(mut self, value: i32) -> Self {
        self.seller_stock_baseline = value;
        self
    }

    /// Set the fallback listing image
    pub fn with_default_image_url(mut self, value: &str) -> Self {
        self.default_image_url = value.to_string();
        self
    }
}
