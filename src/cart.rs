//! Cart mutations
//!
//! Every mutation returns nothing worth trusting; call [`CartService::refresh`]
//! afterwards to read the canonical cart.

use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ShopOptions;
use crate::error::{Result, ValidationError};
use crate::models::{CartItem, NewCartItem, Product};
use crate::recommend::{Recommendation, RecommendationRules};
use crate::session::{authenticated, Session};
use crate::store::{self, Embed, Filter, RecordStore, Select, Table};

/// Smallest quantity a cart line may be set to by the shopper
pub fn clamp_quantity(requested: i32) -> i32 {
    requested.max(1)
}

/// Result of asking to add a product
#[derive(Debug, Clone, PartialEq)]
pub enum AddToCart {
    /// The product was written to the cart
    Added,
    /// Nothing was written; the shopper should pick from the suggestion
    Suggested(Recommendation),
}

/// The shopper's answer to a [`Recommendation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    /// Add this alternative instead of the candidate
    Alternative(Uuid),
    /// Add the original candidate anyway
    KeepOriginal,
    /// Add nothing
    Dismiss,
}

/// Add, update and remove cart lines for the session's user
pub struct CartService<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    options: &'a ShopOptions,
}

impl<'a, S: RecordStore + ?Sized> CartService<'a, S> {
    pub fn new(store: &'a S, options: &'a ShopOptions) -> Self {
        Self { store, options }
    }

    /// The user's cart with each line's product joined
    pub async fn refresh(&self, session: Option<&Session>) -> Result<Vec<CartItem>> {
        let session = authenticated(session)?;
        let query = Select::new()
            .eq("user_id", session.user_id)
            .embed(Embed::product());
        Ok(store::fetch(self.store, Table::CartItems, &query).await?)
    }

    /// Add one unit, intercepting with a lower-carbon suggestion when one applies
    pub async fn request_add(
        &self,
        session: Option<&Session>,
        product: &Product,
        catalog: &[Product],
    ) -> Result<AddToCart> {
        authenticated(session)?;

        if let Some(recommendation) =
            RecommendationRules::from(self.options).decide(product, catalog)
        {
            info!(
                "suggesting {} alternative(s) to {}",
                recommendation.alternatives.len(),
                product.id
            );
            return Ok(AddToCart::Suggested(recommendation));
        }

        self.add(session, product.id).await?;
        Ok(AddToCart::Added)
    }

    /// Apply the shopper's answer to a suggestion
    pub async fn resolve(
        &self,
        session: Option<&Session>,
        recommendation: &Recommendation,
        choice: Choice,
    ) -> Result<()> {
        authenticated(session)?;

        match choice {
            Choice::Alternative(id) => {
                let alternative = recommendation
                    .alternative(id)
                    .ok_or(ValidationError::UnknownAlternative(id))?;
                self.add(session, alternative.id).await
            }
            Choice::KeepOriginal => self.add(session, recommendation.candidate.id).await,
            Choice::Dismiss => {
                debug!("suggestion for {} dismissed", recommendation.candidate.id);
                Ok(())
            }
        }
    }

    /// Add one unit of a product, incrementing an existing line instead of duplicating it
    pub async fn add(&self, session: Option<&Session>, product_id: Uuid) -> Result<()> {
        let session = authenticated(session)?;

        let existing: Option<CartItem> = store::fetch_one(
            self.store,
            Table::CartItems,
            Select::new()
                .eq("user_id", session.user_id)
                .eq("product_id", product_id),
        )
        .await?;

        match existing {
            Some(item) => {
                debug!("incrementing cart line {} to {}", item.id, item.quantity + 1);
                self.store
                    .update(
                        Table::CartItems,
                        json!({ "quantity": item.quantity + 1 }),
                        &[Filter::eq("id", item.id)],
                    )
                    .await?;
            }
            None => {
                debug!("adding {} to cart of {}", product_id, session.user_id);
                let line = NewCartItem {
                    user_id: session.user_id,
                    product_id,
                    quantity: 1,
                };
                let _: CartItem = store::create(self.store, Table::CartItems, &line).await?;
            }
        }
        Ok(())
    }

    /// Write a line's quantity as given; see [`clamp_quantity`] for the shopper-facing floor
    pub async fn set_quantity(
        &self,
        session: Option<&Session>,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<()> {
        let session = authenticated(session)?;
        self.store
            .update(
                Table::CartItems,
                json!({ "quantity": quantity }),
                &[Filter::eq("id", item_id), Filter::eq("user_id", session.user_id)],
            )
            .await?;
        Ok(())
    }

    /// Delete a cart line
    pub async fn remove(&self, session: Option<&Session>, item_id: Uuid) -> Result<()> {
        let session = authenticated(session)?;
        self.store
            .delete(
                Table::CartItems,
                &[Filter::eq("id", item_id), Filter::eq("user_id", session.user_id)],
            )
            .await?;
        Ok(())
    }
}
