//! Records stored in the backend tables

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::Role;

/// A platform account (`profiles`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    /// Unset until the account picks one
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub carbon_points: i64,
    pub created_at: DateTime<Utc>,
}

/// A catalog listing (`products`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    /// `None` for platform-seeded items
    #[serde(default)]
    pub seller_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    /// kg CO2e per unit
    pub carbon_footprint: f64,
    pub eco_rating: i32,
    #[serde(default)]
    pub image_url: String,
    pub category: String,
    pub stock: i32,
    pub is_eco_friendly: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `products`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewProduct {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub carbon_footprint: f64,
    pub eco_rating: i32,
    #[serde(default)]
    pub image_url: String,
    pub category: String,
    pub stock: i32,
    pub is_eco_friendly: bool,
}

/// One product line in a user's cart (`cart_items`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
    /// The joined product, absent when not embedded or no longer listed
    #[serde(rename = "products", default, skip_serializing_if = "Option::is_none")]
    pub product: Option<Product>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewCartItem {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Immutable receipt of a completed purchase (`orders`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_price: f64,
    pub total_carbon: f64,
    pub carbon_points_earned: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewOrder<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_price: f64,
    pub total_carbon: f64,
    pub carbon_points_earned: i64,
    pub status: &'a str,
}

/// Order line with price and footprint as they were at purchase time (`order_items`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: f64,
    pub carbon_footprint: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewOrderItem {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: f64,
    pub carbon_footprint: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cart_item_reads_joined_product() {
        let item: CartItem = serde_json::from_value(json!({
            "id": "7d6c1e3c-3f7c-4a55-9a0a-2b0f5b1d9e01",
            "user_id": "0b8f9f7e-0e55-4f8a-9d6f-8f1d2a6c3b11",
            "product_id": "5a4e7c2b-1d3f-4e6a-8b9c-0d1e2f3a4b5c",
            "quantity": 2,
            "added_at": "2024-05-01T10:00:00+00:00",
            "products": {
                "id": "5a4e7c2b-1d3f-4e6a-8b9c-0d1e2f3a4b5c",
                "seller_id": null,
                "name": "Bamboo Toothbrush",
                "description": "",
                "price": 4.5,
                "carbon_footprint": 0.2,
                "eco_rating": 5,
                "image_url": "",
                "category": "Personal Care",
                "stock": 120,
                "is_eco_friendly": true,
                "created_at": "2024-04-01T10:00:00+00:00"
            }
        }))
        .unwrap();

        let product = item.product.unwrap();
        assert_eq!(product.name, "Bamboo Toothbrush");
        assert!(product.seller_id.is_none());
    }

    #[test]
    fn cart_item_without_product() {
        let item: CartItem = serde_json::from_value(json!({
            "id": "7d6c1e3c-3f7c-4a55-9a0a-2b0f5b1d9e01",
            "user_id": "0b8f9f7e-0e55-4f8a-9d6f-8f1d2a6c3b11",
            "product_id": "5a4e7c2b-1d3f-4e6a-8b9c-0d1e2f3a4b5c",
            "quantity": 1,
            "added_at": "2024-05-01T10:00:00Z",
            "products": null
        }))
        .unwrap();
        assert!(item.product.is_none());
    }

    #[test]
    fn profile_role_may_be_unset() {
        let profile: Profile = serde_json::from_value(json!({
            "id": "0b8f9f7e-0e55-4f8a-9d6f-8f1d2a6c3b11",
            "name": "Ada",
            "role": null,
            "carbon_points": 0,
            "created_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert!(profile.role.is_none());

        let seller: Profile = serde_json::from_value(json!({
            "id": "0b8f9f7e-0e55-4f8a-9d6f-8f1d2a6c3b11",
            "role": "seller",
            "created_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(seller.role, Some(Role::Seller));
        assert_eq!(seller.carbon_points, 0);
    }
}
