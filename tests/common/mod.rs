#![allow(dead_code)]

use ecobazaar::config::ShopOptions;
use ecobazaar::models::{Product, Profile};
use ecobazaar::session::{Role, Session};
use ecobazaar::store::{MemoryStore, Table};
use ecobazaar::EcoBazaar;
use serde_json::json;
use uuid::Uuid;

pub fn shop() -> EcoBazaar<MemoryStore> {
    EcoBazaar::with_store(MemoryStore::new(), ShopOptions::default())
}

pub fn shop_with(options: ShopOptions) -> EcoBazaar<MemoryStore> {
    EcoBazaar::with_store(MemoryStore::new(), options)
}

/// Seed a product; later seeds get later creation times
pub fn seed_product(
    store: &MemoryStore,
    name: &str,
    category: &str,
    price: f64,
    carbon: f64,
    eco: bool,
    stock: i32,
) -> Product {
    let row = json!({
        "id": Uuid::new_v4(),
        "seller_id": null,
        "name": name,
        "description": format!("{} description", name),
        "price": price,
        "carbon_footprint": carbon,
        "eco_rating": if eco { 5 } else { 2 },
        "image_url": "",
        "category": category,
        "stock": stock,
        "is_eco_friendly": eco,
        "created_at": format!("2024-05-01T10:{:02}:00+00:00", store.rows(Table::Products).len()),
    });
    store.seed(Table::Products, vec![row.clone()]);
    serde_json::from_value(row).unwrap()
}

pub fn seed_profile(store: &MemoryStore, role: Option<Role>, carbon_points: i64) -> Session {
    let row = json!({
        "id": Uuid::new_v4(),
        "name": "Test Shopper",
        "role": role,
        "carbon_points": carbon_points,
        "created_at": "2024-04-01T09:00:00+00:00",
    });
    store.seed(Table::Profiles, vec![row.clone()]);
    let profile: Profile = serde_json::from_value(row).unwrap();
    Session::new(profile.id).with_profile(profile)
}

pub fn stock_of(store: &MemoryStore, product: &Product) -> i64 {
    store
        .rows(Table::Products)
        .into_iter()
        .find(|row| row["id"] == json!(product.id))
        .and_then(|row| row["stock"].as_i64())
        .unwrap()
}

pub fn points_of(store: &MemoryStore, session: &Session) -> i64 {
    store
        .rows(Table::Profiles)
        .into_iter()
        .find(|row| row["id"] == json!(session.user_id))
        .and_then(|row| row["carbon_points"].as_i64())
        .unwrap()
}
