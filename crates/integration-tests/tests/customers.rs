//! Customer profile, address book, cart and wishlist tests.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};

use vendora_core::Money;
use vendora_integration_tests::{TestApp, money};

fn address(label: &str, is_default: bool) -> Value {
    json!({
        "label": label,
        "fullName": "Ada Lovelace",
        "phone": "+44 20 7946 0000",
        "line1": "12 St James's Square",
        "city": "London",
        "state": "London",
        "postalCode": "SW1Y 4JH",
        "country": "GB",
        "isDefault": is_default,
    })
}

fn defaults(addresses: &Value) -> Vec<&str> {
    addresses
        .as_array()
        .unwrap()
        .iter()
        .filter(|a| a["isDefault"] == json!(true))
        .map(|a| a["label"].as_str().unwrap())
        .collect()
}

fn cart_lines(cart: &Value) -> Vec<(String, u64)> {
    cart["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|line| {
            (
                line["productId"].as_str().unwrap().to_string(),
                line["quantity"].as_u64().unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_profile_is_owner_only() {
    let app = TestApp::new();
    let (ada, ada_id) = app.customer("Ada", "ada@example.com").await;
    let (grace, _) = app.customer("Grace", "grace@example.com").await;

    let own = app.get(&format!("/api/customers/{ada_id}"), Some(&ada.token)).await;
    assert_eq!(own.status, StatusCode::OK);
    assert_eq!(own.str("/name"), Some("Ada"));
    assert_eq!(own.str("/email"), Some("ada@example.com"));

    let other = app.get(&format!("/api/customers/{ada_id}"), Some(&grace.token)).await;
    assert_eq!(other.status, StatusCode::FORBIDDEN);

    let anonymous = app.get(&format!("/api/customers/{ada_id}"), None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let app = TestApp::new();
    let (ada, ada_id) = app.customer("Ada", "ada@example.com").await;
    let missing = "00000000-0000-4000-8000-000000000000";

    let customer = app.get(&format!("/api/customers/{missing}"), Some(&ada.token)).await;
    assert_eq!(customer.status, StatusCode::NOT_FOUND);

    let product = app.get(&format!("/api/products/{missing}"), None).await;
    assert_eq!(product.status, StatusCode::NOT_FOUND);

    let seller = app.get(&format!("/api/sellers/{missing}"), None).await;
    assert_eq!(seller.status, StatusCode::NOT_FOUND);

    let order = app.get(&format!("/api/orders/{missing}"), Some(&ada.token)).await;
    assert_eq!(order.status, StatusCode::NOT_FOUND);

    let address = app
        .put(
            &format!("/api/customers/{ada_id}/addresses/{missing}"),
            Some(&ada.token),
            address("Home", false),
        )
        .await;
    assert_eq!(address.status, StatusCode::NOT_FOUND);

    let cart = app
        .put(
            &format!("/api/customers/{ada_id}/cart"),
            Some(&ada.token),
            json!({ "productId": missing, "quantity": 1 }),
        )
        .await;
    assert_eq!(cart.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_id_is_bad_request() {
    let app = TestApp::new();
    let (ada, _) = app.customer("Ada", "ada@example.com").await;

    let response = app.get("/api/customers/not-a-uuid", Some(&ada.token)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.error().is_some());
}

#[tokio::test]
async fn test_update_profile_and_preferences() {
    let app = TestApp::new();
    let (ada, ada_id) = app.customer("Ada", "ada@example.com").await;

    let profile = app
        .patch(
            &format!("/api/customers/{ada_id}"),
            Some(&ada.token),
            json!({ "name": "Ada King", "phone": "+44 20 7946 0001", "dateOfBirth": "1815-12-10" }),
        )
        .await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.str("/name"), Some("Ada King"));
    assert_eq!(profile.str("/dateOfBirth"), Some("1815-12-10"));

    let prefs = app
        .patch(
            &format!("/api/customers/{ada_id}/preferences"),
            Some(&ada.token),
            json!({ "newsletter": true }),
        )
        .await;
    assert_eq!(prefs.status, StatusCode::OK);
    assert_eq!(prefs.body["newsletter"], json!(true));
}

#[tokio::test]
async fn test_single_default_address() {
    let app = TestApp::new();
    let (ada, ada_id) = app.customer("Ada", "ada@example.com").await;
    let uri = format!("/api/customers/{ada_id}/addresses");

    // The first address becomes the default on its own
    let first = app.post(&uri, Some(&ada.token), address("Home", false)).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(defaults(&first.body), vec!["Home"]);

    let second = app.post(&uri, Some(&ada.token), address("Work", true)).await;
    assert_eq!(defaults(&second.body), vec!["Work"]);

    let home_id = second.body[0]["id"].as_str().unwrap().to_string();
    let updated = app
        .put(&format!("{uri}/{home_id}"), Some(&ada.token), address("Home", true))
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(defaults(&updated.body), vec!["Home"]);

    let removed = app
        .delete(&format!("{uri}/{home_id}"), Some(&ada.token), None)
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(defaults(&removed.body), vec!["Work"]);
}

#[tokio::test]
async fn test_invalid_address_is_rejected() {
    let app = TestApp::new();
    let (ada, ada_id) = app.customer("Ada", "ada@example.com").await;

    let mut incomplete = address("Home", false);
    incomplete["line1"] = json!("   ");
    let response = app
        .post(&format!("/api/customers/{ada_id}/addresses"), Some(&ada.token), incomplete)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cart_quantities() {
    let app = TestApp::new();
    let (seller, _) = app.seller("Gadget Hub", "hub@example.com").await;
    let phone = app.product(&seller, "Pixel 8", "499.00", 10).await;
    let tablet = app.product(&seller, "iPad Air", "350.00", 10).await;
    let (ada, ada_id) = app.customer("Ada", "ada@example.com").await;
    let uri = format!("/api/customers/{ada_id}/cart");

    app.put(&uri, Some(&ada.token), json!({ "productId": phone, "quantity": 2 }))
        .await;
    let cart = app
        .put(&uri, Some(&ada.token), json!({ "productId": tablet, "quantity": 1 }))
        .await;
    assert_eq!(cart.status, StatusCode::OK);
    assert_eq!(cart_lines(&cart.body).len(), 2);
    assert_eq!(money(&cart.body["subtotal"]), Money::parse("1348.00").unwrap());

    // Changing one line leaves the other alone
    let cart = app
        .put(&uri, Some(&ada.token), json!({ "productId": phone, "quantity": 3 }))
        .await;
    assert_eq!(
        cart_lines(&cart.body),
        vec![(phone.clone(), 3), (tablet.clone(), 1)]
    );

    // Zero removes the line
    let cart = app
        .put(&uri, Some(&ada.token), json!({ "productId": phone, "quantity": 0 }))
        .await;
    assert_eq!(cart_lines(&cart.body), vec![(tablet.clone(), 1)]);

    let cleared = app.delete(&uri, Some(&ada.token), None).await;
    assert_eq!(cleared.status, StatusCode::NO_CONTENT);
    let cart = app.get(&uri, Some(&ada.token)).await;
    assert!(cart_lines(&cart.body).is_empty());
}

#[tokio::test]
async fn test_wishlist_has_no_duplicates() {
    let app = TestApp::new();
    let (seller, _) = app.seller("Gadget Hub", "hub@example.com").await;
    let phone = app.product(&seller, "Pixel 8", "499.00", 10).await;
    let (ada, ada_id) = app.customer("Ada", "ada@example.com").await;
    let uri = format!("/api/customers/{ada_id}/wishlist");

    app.post(&uri, Some(&ada.token), json!({ "productIds": [phone, phone] }))
        .await;
    let wishlist = app
        .post(&uri, Some(&ada.token), json!({ "productIds": [phone] }))
        .await;
    assert_eq!(wishlist.status, StatusCode::OK);
    assert_eq!(wishlist.body.as_array().unwrap().len(), 1);
    assert_eq!(wishlist.str("/0/name"), Some("Pixel 8"));

    let wishlist = app
        .delete(&uri, Some(&ada.token), Some(json!({ "productIds": [phone] })))
        .await;
    assert!(wishlist.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_deleted_products_drop_out_of_wishlist() {
    let app = TestApp::new();
    let (seller, _) = app.seller("Gadget Hub", "hub@example.com").await;
    let phone = app.product(&seller, "Pixel 8", "499.00", 10).await;
    let (ada, ada_id) = app.customer("Ada", "ada@example.com").await;
    let uri = format!("/api/customers/{ada_id}/wishlist");

    app.post(&uri, Some(&ada.token), json!({ "productIds": [phone] }))
        .await;
    let deleted = app
        .delete(&format!("/api/products/{phone}"), Some(&seller.token), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let wishlist = app.get(&uri, Some(&ada.token)).await;
    assert_eq!(wishlist.status, StatusCode::OK);
    assert!(wishlist.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_activity_is_recorded() {
    let app = TestApp::new();
    let (seller, _) = app.seller("Gadget Hub", "hub@example.com").await;
    let phone = app.product(&seller, "Pixel 8", "499.00", 10).await;
    let (ada, ada_id) = app.customer("Ada", "ada@example.com").await;

    app.put(
        &format!("/api/customers/{ada_id}/cart"),
        Some(&ada.token),
        json!({ "productId": phone, "quantity": 1 }),
    )
    .await;

    let activity = app
        .get(&format!("/api/customers/{ada_id}/activity"), Some(&ada.token))
        .await;
    assert_eq!(activity.status, StatusCode::OK);
    assert_eq!(activity.str("/0/kind"), Some("cart"));
}
