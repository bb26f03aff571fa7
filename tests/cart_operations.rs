mod common;

use common::{seed_product, seed_profile, shop};
use ecobazaar::cart::{clamp_quantity, AddToCart, Choice};
use ecobazaar::error::{Error, ValidationError};
use ecobazaar::session::Role;
use ecobazaar::store::memory::Operation;
use ecobazaar::store::Table;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_add_creates_then_increments_one_line() {
    let shop = shop();
    let store = shop.store();
    let session = seed_profile(store, Some(Role::User), 0);
    let tote = seed_product(store, "Cotton Tote", "Fashion", 15.0, 0.8, true, 10);

    shop.cart().add(Some(&session), tote.id).await.unwrap();
    shop.cart().add(Some(&session), tote.id).await.unwrap();

    let cart = shop.cart().refresh(Some(&session)).await.unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].quantity, 2);
    assert_eq!(cart[0].product.as_ref().map(|p| p.id), Some(tote.id));
    assert_eq!(store.calls(Operation::Insert, Some(Table::CartItems)), 1);
    assert_eq!(store.calls(Operation::Update, Some(Table::CartItems)), 1);
}

#[tokio::test]
async fn test_high_carbon_add_is_intercepted_without_writing() {
    let shop = shop();
    let store = shop.store();
    let session = seed_profile(store, Some(Role::User), 0);
    let kettle = seed_product(store, "Electric Kettle", "Kitchen", 40.0, 5.0, false, 10);
    let bamboo = seed_product(store, "Bamboo Utensils", "Kitchen", 8.0, 2.0, true, 10);
    let catalog = shop.catalog().list_products().await.unwrap();

    let result = shop
        .cart()
        .request_add(Some(&session), &kettle, &catalog)
        .await
        .unwrap();

    match result {
        AddToCart::Suggested(recommendation) => {
            assert_eq!(recommendation.candidate.id, kettle.id);
            assert_eq!(recommendation.alternatives.len(), 1);
            assert_eq!(recommendation.alternatives[0].id, bamboo.id);
        }
        other => panic!("Expected a suggestion, got {:?}", other),
    }
    assert!(store.rows(Table::CartItems).is_empty());
    assert_eq!(store.write_calls(), 0);
}

#[tokio::test]
async fn test_low_carbon_add_goes_straight_in() {
    let shop = shop();
    let store = shop.store();
    let session = seed_profile(store, None, 0);
    let soap = seed_product(store, "Soap Bar", "Personal Care", 4.0, 0.3, false, 10);
    let catalog = shop.catalog().list_products().await.unwrap();

    let result = shop
        .cart()
        .request_add(Some(&session), &soap, &catalog)
        .await
        .unwrap();

    assert_eq!(result, AddToCart::Added);
    assert_eq!(store.rows(Table::CartItems).len(), 1);
}

#[tokio::test]
async fn test_resolving_a_suggestion() {
    let shop = shop();
    let store = shop.store();
    let session = seed_profile(store, Some(Role::User), 0);
    let kettle = seed_product(store, "Electric Kettle", "Kitchen", 40.0, 5.0, false, 10);
    let bamboo = seed_product(store, "Bamboo Utensils", "Kitchen", 8.0, 2.0, true, 10);
    let catalog = shop.catalog().list_products().await.unwrap();

    let recommendation = match shop
        .cart()
        .request_add(Some(&session), &kettle, &catalog)
        .await
        .unwrap()
    {
        AddToCart::Suggested(recommendation) => recommendation,
        AddToCart::Added => panic!("Expected a suggestion"),
    };

    shop.cart()
        .resolve(Some(&session), &recommendation, Choice::Dismiss)
        .await
        .unwrap();
    assert!(store.rows(Table::CartItems).is_empty());

    let unknown = Uuid::new_v4();
    let result = shop
        .cart()
        .resolve(Some(&session), &recommendation, Choice::Alternative(unknown))
        .await;
    match result {
        Err(Error::Validation(ValidationError::UnknownAlternative(id))) => assert_eq!(id, unknown),
        other => panic!("Expected UnknownAlternative, got {:?}", other),
    }
    assert!(store.rows(Table::CartItems).is_empty());

    shop.cart()
        .resolve(Some(&session), &recommendation, Choice::Alternative(bamboo.id))
        .await
        .unwrap();
    shop.cart()
        .resolve(Some(&session), &recommendation, Choice::KeepOriginal)
        .await
        .unwrap();

    let cart = shop.cart().refresh(Some(&session)).await.unwrap();
    let mut ids = cart.iter().map(|item| item.product_id).collect::<Vec<_>>();
    ids.sort();
    let mut expected = vec![bamboo.id, kettle.id];
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_set_quantity_and_remove() {
    let shop = shop();
    let store = shop.store();
    let session = seed_profile(store, Some(Role::User), 0);
    let jar = seed_product(store, "Glass Jar", "Kitchen", 6.0, 1.0, true, 10);

    shop.cart().add(Some(&session), jar.id).await.unwrap();
    let item = shop.cart().refresh(Some(&session)).await.unwrap().remove(0);

    shop.cart()
        .set_quantity(Some(&session), item.id, clamp_quantity(0))
        .await
        .unwrap();
    assert_eq!(shop.cart().refresh(Some(&session)).await.unwrap()[0].quantity, 1);

    shop.cart()
        .set_quantity(Some(&session), item.id, 4)
        .await
        .unwrap();
    assert_eq!(shop.cart().refresh(Some(&session)).await.unwrap()[0].quantity, 4);

    shop.cart().remove(Some(&session), item.id).await.unwrap();
    assert!(shop.cart().refresh(Some(&session)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cannot_touch_another_users_line() {
    let shop = shop();
    let store = shop.store();
    let owner = seed_profile(store, Some(Role::User), 0);
    let other = seed_profile(store, Some(Role::User), 0);
    let jar = seed_product(store, "Glass Jar", "Kitchen", 6.0, 1.0, true, 10);

    shop.cart().add(Some(&owner), jar.id).await.unwrap();
    let item = shop.cart().refresh(Some(&owner)).await.unwrap().remove(0);

    shop.cart()
        .set_quantity(Some(&other), item.id, 9)
        .await
        .unwrap();
    shop.cart().remove(Some(&other), item.id).await.unwrap();

    let cart = shop.cart().refresh(Some(&owner)).await.unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart[0].quantity, 1);
}

#[tokio::test]
async fn test_mutations_require_authentication() {
    let shop = shop();
    let store = shop.store();
    let jar = seed_product(store, "Glass Jar", "Kitchen", 6.0, 1.0, true, 10);

    let results = vec![
        shop.cart().add(None, jar.id).await,
        shop.cart().set_quantity(None, Uuid::new_v4(), 2).await,
        shop.cart().remove(None, Uuid::new_v4()).await,
    ];
    for result in results {
        assert!(result.unwrap_err().is_authentication_required());
    }
    assert!(shop
        .cart()
        .refresh(None)
        .await
        .unwrap_err()
        .is_authentication_required());
    assert_eq!(store.write_calls(), 0);
}

#[tokio::test]
async fn test_line_for_delisted_product_has_no_product() {
    let shop = shop();
    let store = shop.store();
    let session = seed_profile(store, Some(Role::User), 0);

    store.seed(
        Table::CartItems,
        vec![json!({
            "id": Uuid::new_v4(),
            "user_id": session.user_id,
            "product_id": Uuid::new_v4(),
            "quantity": 2,
            "added_at": "2024-05-02T08:00:00+00:00",
        })],
    );

    let cart = shop.cart().refresh(Some(&session)).await.unwrap();
    assert_eq!(cart.len(), 1);
    assert!(cart[0].product.is_none());
}

#[test]
fn test_clamp_quantity() {
    assert_eq!(clamp_quantity(-5), 1);
    assert_eq!(clamp_quantity(0), 1);
    assert_eq!(clamp_quantity(1), 1);
    assert_eq!(clamp_quantity(7), 7);
}
