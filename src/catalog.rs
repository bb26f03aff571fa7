//! Product listings

use tracing::info;
use uuid::Uuid;

use crate::config::ShopOptions;
use crate::error::{Result, ValidationError};
use crate::models::{NewProduct, Product};
use crate::session::{authenticated, Permission, Session};
use crate::store::{self, RecordStore, Select, Table};

/// Reads the catalog and lets sellers list products
pub struct CatalogService<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    options: &'a ShopOptions,
}

impl<'a, S: RecordStore + ?Sized> CatalogService<'a, S> {
    pub fn new(store: &'a S, options: &'a ShopOptions) -> Self {
        Self { store, options }
    }

    /// All products, newest first
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let query = Select::new().newest_first(Table::Products);
        Ok(store::fetch(self.store, Table::Products, &query).await?)
    }

    /// One product by id
    pub async fn product(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(store::fetch_one(self.store, Table::Products, Select::new().eq("id", id)).await?)
    }

    /// Listings of one seller, newest first
    pub async fn seller_products(&self, seller_id: Uuid) -> Result<Vec<Product>> {
        let query = Select::new()
            .eq("seller_id", seller_id)
            .newest_first(Table::Products);
        Ok(store::fetch(self.store, Table::Products, &query).await?)
    }

    /// List a product under the session's seller account
    pub async fn create_listing(
        &self,
        session: Option<&Session>,
        listing: NewProduct,
    ) -> Result<Product> {
        let session = authenticated(session)?;
        session.require(Permission::ManageListings)?;
        validate(&listing)?;

        let listing = NewProduct {
            seller_id: Some(session.user_id),
            image_url: if listing.image_url.trim().is_empty() {
                self.options.default_image_url.clone()
            } else {
                listing.image_url
            },
            ..listing
        };

        let product: Product = store::create(self.store, Table::Products, &listing).await?;
        info!("seller {} listed {} ({})", session.user_id, product.name, product.id);
        Ok(product)
    }
}

fn validate(listing: &NewProduct) -> std::result::Result<(), ValidationError> {
    let invalid = |msg: &str| Err(ValidationError::InvalidListing(msg.to_string()));

    if listing.name.trim().is_empty() {
        return invalid("name is required");
    }
    if listing.category.trim().is_empty() {
        return invalid("category is required");
    }
    if !listing.price.is_finite() || listing.price < 0.0 {
        return invalid("price must be zero or more");
    }
    if !listing.carbon_footprint.is_finite() || listing.carbon_footprint < 0.0 {
        return invalid("carbon footprint must be zero or more");
    }
    if !(1..=5).contains(&listing.eco_rating) {
        return invalid("eco rating must be between 1 and 5");
    }
    if listing.stock < 0 {
        return invalid("stock must be zero or more");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> NewProduct {
        NewProduct {
            seller_id: None,
            name: "Beeswax Wraps".to_string(),
            description: "Set of three".to_string(),
            price: 12.0,
            carbon_footprint: 0.4,
            eco_rating: 5,
            image_url: String::new(),
            category: "Kitchen".to_string(),
            stock: 40,
            is_eco_friendly: true,
        }
    }

    #[test]
    fn valid_listing() {
        assert!(validate(&listing()).is_ok());
    }

    #[test]
    fn rejects_bad_fields() {
        let cases = vec![
            NewProduct {
                name: " ".to_string(),
                ..listing()
            },
            NewProduct {
                category: String::new(),
                ..listing()
            },
            NewProduct {
                price: -1.0,
                ..listing()
            },
            NewProduct {
                carbon_footprint: f64::NAN,
                ..listing()
            },
            NewProduct {
                eco_rating: 6,
                ..listing()
            },
            NewProduct {
                eco_rating: 0,
                ..listing()
            },
            NewProduct {
                stock: -3,
                ..listing()
            },
        ];

        for case in cases {
            match validate(&case) {
                Err(ValidationError::InvalidListing(_)) => {}
                other => panic!("Expected InvalidListing for {:?}, got {:?}", case, other),
            }
        }
    }
}
