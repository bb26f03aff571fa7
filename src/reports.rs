//! Platform and seller summaries

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::ShopOptions;
use crate::error::Result;
use crate::models::{Order, Product, Profile};
use crate::session::{authenticated, Permission, Session};
use crate::store::{self, RecordStore, Select, Table};

/// Platform-wide totals for administrators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformOverview {
    pub user_count: usize,
    pub product_count: usize,
    pub order_count: usize,
    /// Sum of every listing's per-unit footprint
    pub total_catalog_carbon: f64,
    pub total_revenue: f64,
    pub products_per_category: BTreeMap<String, usize>,
}

impl PlatformOverview {
    pub fn summarize(profiles: &[Profile], products: &[Product], orders: &[Order]) -> Self {
        let mut products_per_category = BTreeMap::new();
        for product in products {
            *products_per_category
                .entry(product.category.clone())
                .or_insert(0) += 1;
        }

        Self {
            user_count: profiles.len(),
            product_count: products.len(),
            order_count: orders.len(),
            total_catalog_carbon: products.iter().map(|p| p.carbon_footprint).sum(),
            total_revenue: orders.iter().map(|o| o.total_price).sum(),
            products_per_category,
        }
    }
}

/// A seller's listings with estimated sales
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SellerDashboard {
    pub products: Vec<Product>,
    pub product_count: usize,
    /// `price × units sold`, units estimated as the baseline minus current stock
    pub estimated_revenue: f64,
    pub average_carbon: f64,
}

impl SellerDashboard {
    pub fn summarize(products: Vec<Product>, stock_baseline: i32) -> Self {
        let estimated_revenue = products
            .iter()
            .map(|p| p.price * f64::from((stock_baseline - p.stock).max(0)))
            .sum();
        let total_carbon: f64 = products.iter().map(|p| p.carbon_footprint).sum();
        let average_carbon = total_carbon / products.len().max(1) as f64;

        Self {
            product_count: products.len(),
            products,
            estimated_revenue,
            average_carbon,
        }
    }
}

pub struct ReportService<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    options: &'a ShopOptions,
}

impl<'a, S: RecordStore + ?Sized> ReportService<'a, S> {
    pub fn new(store: &'a S, options: &'a ShopOptions) -> Self {
        Self { store, options }
    }

    /// Counts and totals across the platform; administrators only
    pub async fn platform_overview(&self, session: Option<&Session>) -> Result<PlatformOverview> {
        let session = authenticated(session)?;
        session.require(Permission::ViewPlatformReport)?;

        let query = Select::new();
        let (profiles, products, orders) = tokio::try_join!(
            store::fetch::<S, Profile>(self.store, Table::Profiles, &query),
            store::fetch::<S, Product>(self.store, Table::Products, &query),
            store::fetch::<S, Order>(self.store, Table::Orders, &query),
        )?;
        debug!(
            "overview over {} profile(s), {} product(s), {} order(s)",
            profiles.len(),
            products.len(),
            orders.len()
        );

        Ok(PlatformOverview::summarize(&profiles, &products, &orders))
    }

    /// The session's own listings; sellers only
    pub async fn seller_dashboard(&self, session: Option<&Session>) -> Result<SellerDashboard> {
        let session = authenticated(session)?;
        session.require(Permission::ManageListings)?;

        let query = Select::new()
            .eq("seller_id", session.user_id)
            .newest_first(Table::Products);
        let products = store::fetch(self.store, Table::Products, &query).await?;

        Ok(SellerDashboard::summarize(
            products,
            self.options.seller_stock_baseline,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn product(category: &str, price: f64, carbon: f64, stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            seller_id: None,
            name: "Item".to_string(),
            description: String::new(),
            price,
            carbon_footprint: carbon,
            eco_rating: 4,
            image_url: String::new(),
            category: category.to_string(),
            stock,
            is_eco_friendly: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn dashboard_estimates_sales_from_baseline() {
        let dashboard = SellerDashboard::summarize(
            vec![
                product("Kitchen", 2.0, 1.0, 150),
                product("Kitchen", 10.0, 3.0, 250),
            ],
            200,
        );
        assert_eq!(dashboard.product_count, 2);
        assert_eq!(dashboard.estimated_revenue, 100.0);
        assert_eq!(dashboard.average_carbon, 2.0);
    }

    #[test]
    fn empty_dashboard() {
        let dashboard = SellerDashboard::summarize(Vec::new(), 200);
        assert_eq!(dashboard.product_count, 0);
        assert_eq!(dashboard.estimated_revenue, 0.0);
        assert_eq!(dashboard.average_carbon, 0.0);
    }

    #[test]
    fn overview_counts_categories() {
        let products = vec![
            product("Kitchen", 1.0, 0.5, 1),
            product("Kitchen", 1.0, 1.5, 1),
            product("Garden", 1.0, 2.0, 1),
        ];
        let overview = PlatformOverview::summarize(&[], &products, &[]);
        assert_eq!(overview.product_count, 3);
        assert_eq!(overview.total_catalog_carbon, 4.0);
        assert_eq!(overview.products_per_category.get("Kitchen"), Some(&2));
        assert_eq!(overview.products_per_category.get("Garden"), Some(&1));
    }
}
