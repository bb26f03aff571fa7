//! Profile, role selection and order history of the signed-in account

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, ValidationError};
use crate::models::{Order, OrderItem, Profile};
use crate::session::{authenticated, Role, Session};
use crate::store::{self, Filter, RecordStore, Select, Table};

/// Badge earned from accumulated carbon points
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoyaltyTier {
    Bronze,
    Silver,
    Gold,
}

impl LoyaltyTier {
    pub fn for_points(points: i64) -> Self {
        if points > 500 {
            LoyaltyTier::Gold
        } else if points > 200 {
            LoyaltyTier::Silver
        } else {
            LoyaltyTier::Bronze
        }
    }
}

impl fmt::Display for LoyaltyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoyaltyTier::Bronze => "bronze",
            LoyaltyTier::Silver => "silver",
            LoyaltyTier::Gold => "gold",
        })
    }
}

/// An order with its lines
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

pub struct AccountService<'a, S: RecordStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> AccountService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Re-read the profile and attach it to a copy of the session
    pub async fn refresh_profile(&self, session: Option<&Session>) -> Result<Session> {
        let session = authenticated(session)?;
        let profile: Option<Profile> = store::fetch_one(
            self.store,
            Table::Profiles,
            Select::new().eq("id", session.user_id),
        )
        .await?;

        let mut refreshed = session.clone();
        refreshed.profile = profile;
        Ok(refreshed)
    }

    /// Pick the account's role; allowed once
    pub async fn choose_role(&self, session: Option<&Session>, role: Role) -> Result<Session> {
        let current = self.refresh_profile(session).await?;
        let profile = current
            .profile
            .as_ref()
            .ok_or(ValidationError::ProfileNotFound(current.user_id))?;
        if let Some(existing) = profile.role {
            return Err(ValidationError::RoleAlreadySelected(existing).into());
        }

        self.store
            .update(
                Table::Profiles,
                json!({ "role": role }),
                &[Filter::eq("id", current.user_id), Filter::is_null("role")],
            )
            .await?;
        info!("profile {} chose role {}", current.user_id, role);

        self.refresh_profile(Some(&current)).await
    }

    /// The account's orders, newest first
    pub async fn order_history(&self, session: Option<&Session>) -> Result<Vec<Order>> {
        let session = authenticated(session)?;
        let query = Select::new()
            .eq("user_id", session.user_id)
            .newest_first(Table::Orders);
        Ok(store::fetch(self.store, Table::Orders, &query).await?)
    }

    /// One of the account's orders with its lines
    pub async fn order(
        &self,
        session: Option<&Session>,
        order_id: Uuid,
    ) -> Result<Option<OrderRecord>> {
        let session = authenticated(session)?;
        let order: Option<Order> = store::fetch_one(
            self.store,
            Table::Orders,
            Select::new()
                .eq("id", order_id)
                .eq("user_id", session.user_id),
        )
        .await?;

        let order = match order {
            Some(order) => order,
            None => return Ok(None),
        };
        let items = store::fetch(
            self.store,
            Table::OrderItems,
            &Select::new().eq("order_id", order.id),
        )
        .await?;
        Ok(Some(OrderRecord { order, items }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers() {
        assert_eq!(LoyaltyTier::for_points(0), LoyaltyTier::Bronze);
        assert_eq!(LoyaltyTier::for_points(200), LoyaltyTier::Bronze);
        assert_eq!(LoyaltyTier::for_points(201), LoyaltyTier::Silver);
        assert_eq!(LoyaltyTier::for_points(500), LoyaltyTier::Silver);
        assert_eq!(LoyaltyTier::for_points(501), LoyaltyTier::Gold);
        assert!(LoyaltyTier::Gold > LoyaltyTier::Silver);
        assert_eq!(LoyaltyTier::Silver.to_string(), "silver");
    }
}
