//! Checkout, order visibility and fulfillment tests.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};

use vendora_core::Money;
use vendora_integration_tests::{TestApp, TestUser, money};

const SHIPPING_ADDRESS: &str = r#"{
    "fullName": "Ada Lovelace",
    "phone": "+44 20 7946 0000",
    "line1": "12 St James's Square",
    "city": "London",
    "state": "London",
    "postalCode": "SW1Y 4JH",
    "country": "GB",
    "isDefault": true
}"#;

struct Market {
    app: TestApp,
    seller: TestUser,
    seller_id: String,
    phone: String,
    case: String,
    ada: TestUser,
    ada_id: String,
}

/// One seller with two listings and one customer with a saved address.
async fn market() -> Market {
    let app = TestApp::new();
    let (seller, seller_id) = app.seller("Gadget Hub", "hub@example.com").await;
    let phone = app.product(&seller, "Pixel 8", "499.00", 10).await;
    let case = app.product(&seller, "Pixel 8 Case", "19.99", 10).await;
    let (ada, ada_id) = app.customer("Ada", "ada@example.com").await;

    let address: Value = serde_json::from_str(SHIPPING_ADDRESS).unwrap();
    let response = app
        .post(&format!("/api/customers/{ada_id}/addresses"), Some(&ada.token), address)
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    Market {
        app,
        seller,
        seller_id,
        phone,
        case,
        ada,
        ada_id,
    }
}

impl Market {
    async fn order(&self, items: Value) -> Value {
        let response = self
            .app
            .post(
                "/api/orders",
                Some(&self.ada.token),
                json!({ "items": items, "paymentMethod": "card" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body
    }

    async fn set_status(&self, order_id: &str, status: &str) -> StatusCode {
        self.app
            .patch(
                &format!("/api/sellers/{}/orders/{order_id}", self.seller_id),
                Some(&self.seller.token),
                json!({ "status": status }),
            )
            .await
            .status
    }
}

#[tokio::test]
async fn test_checkout_from_cart() {
    let m = market().await;
    let cart_uri = format!("/api/customers/{}/cart", m.ada_id);
    m.app
        .put(&cart_uri, Some(&m.ada.token), json!({ "productId": m.phone, "quantity": 1 }))
        .await;
    m.app
        .put(&cart_uri, Some(&m.ada.token), json!({ "productId": m.case, "quantity": 2 }))
        .await;

    let response = m
        .app
        .post("/api/orders", Some(&m.ada.token), json!({ "paymentMethod": "card" }))
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);

    let order = &response.body;
    assert_eq!(order["status"], json!("pending"));
    assert_eq!(order["paymentStatus"], json!("paid"));
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    assert_eq!(order["shippingAddress"]["city"], json!("London"));

    let subtotal = money(&order["pricing"]["subtotal"]);
    assert_eq!(subtotal, Money::parse("538.98").unwrap());
    // Over the free shipping threshold
    assert!(money(&order["pricing"]["shipping"]).is_zero());
    assert_eq!(
        money(&order["pricing"]["total"]),
        subtotal + money(&order["pricing"]["tax"])
    );
    assert_eq!(order["timeline"][0]["step"], json!("ordered"));

    // Purchased lines leave the cart
    let cart = m.app.get(&cart_uri, Some(&m.ada.token)).await;
    assert!(cart.body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_updates_history_stock_and_store() {
    let m = market().await;
    let order = m.order(json!([{ "productId": m.phone, "quantity": 2 }])).await;
    let order_id = order["id"].as_str().unwrap();

    let orders = m
        .app
        .get(&format!("/api/customers/{}/orders", m.ada_id), Some(&m.ada.token))
        .await;
    assert_eq!(orders.body.as_array().unwrap().len(), 1);
    assert_eq!(orders.str("/0/id"), Some(order_id));

    let transactions = m
        .app
        .get(&format!("/api/customers/{}/transactions", m.ada_id), Some(&m.ada.token))
        .await;
    assert_eq!(transactions.str("/0/orderId"), Some(order_id));
    assert_eq!(transactions.str("/0/status"), Some("paid"));

    let product = m.app.get(&format!("/api/products/{}", m.phone), None).await;
    assert_eq!(product.body["quantity"], json!(8));

    let store = m.app.get(&format!("/api/sellers/{}", m.seller_id), None).await;
    assert_eq!(store.body["metrics"]["totalOrders"], json!(1));
    assert_eq!(
        money(&store.body["metrics"]["totalSales"]),
        Money::parse("998.00").unwrap()
    );

    let seller_orders = m
        .app
        .get(&format!("/api/sellers/{}/orders", m.seller_id), Some(&m.seller.token))
        .await;
    assert_eq!(seller_orders.str("/0/id"), Some(order_id));
}

#[tokio::test]
async fn test_checkout_rejects_empty_and_unknown() {
    let m = market().await;

    let empty_cart = m
        .app
        .post("/api/orders", Some(&m.ada.token), json!({ "paymentMethod": "card" }))
        .await;
    assert_eq!(empty_cart.status, StatusCode::BAD_REQUEST);

    let no_payment = m
        .app
        .post(
            "/api/orders",
            Some(&m.ada.token),
            json!({ "items": [{ "productId": m.phone, "quantity": 1 }] }),
        )
        .await;
    assert_eq!(no_payment.status, StatusCode::BAD_REQUEST);

    let unknown = m
        .app
        .post(
            "/api/orders",
            Some(&m.ada.token),
            json!({
                "items": [{ "productId": "00000000-0000-4000-8000-000000000000", "quantity": 1 }],
                "paymentMethod": "card",
            }),
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_checkout_skips_deleted_listings() {
    let m = market().await;
    let cart_uri = format!("/api/customers/{}/cart", m.ada_id);
    m.app
        .put(&cart_uri, Some(&m.ada.token), json!({ "productId": m.phone, "quantity": 1 }))
        .await;
    m.app
        .put(&cart_uri, Some(&m.ada.token), json!({ "productId": m.case, "quantity": 1 }))
        .await;
    let deleted = m
        .app
        .delete(&format!("/api/products/{}", m.case), Some(&m.seller.token), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let cart = m.app.get(&cart_uri, Some(&m.ada.token)).await;
    assert_eq!(cart.body["items"].as_array().unwrap().len(), 1);

    let response = m
        .app
        .post("/api/orders", Some(&m.ada.token), json!({ "paymentMethod": "card" }))
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    let items = response.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["productId"], json!(m.phone));
    assert_eq!(
        money(&response.body["pricing"]["subtotal"]),
        Money::parse("499.00").unwrap()
    );

    let cart = m.app.get(&cart_uri, Some(&m.ada.token)).await;
    assert!(cart.body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_cart_of_only_deleted_listings_is_empty() {
    let m = market().await;
    m.app
        .put(
            &format!("/api/customers/{}/cart", m.ada_id),
            Some(&m.ada.token),
            json!({ "productId": m.case, "quantity": 1 }),
        )
        .await;
    m.app
        .delete(&format!("/api/products/{}", m.case), Some(&m.seller.token), None)
        .await;

    let response = m
        .app
        .post("/api/orders", Some(&m.ada.token), json!({ "paymentMethod": "card" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), Some("cart is empty"));
}

#[tokio::test]
async fn test_order_total_past_max_is_rejected() {
    let m = market().await;
    let vault = m.app.product(&m.seller, "Gold Phone", "9999999999.99", 5).await;
    let cart_uri = format!("/api/customers/{}/cart", m.ada_id);

    let carted = m
        .app
        .put(&cart_uri, Some(&m.ada.token), json!({ "productId": vault, "quantity": 2 }))
        .await;
    assert_eq!(carted.status, StatusCode::OK);
    let cart = m.app.get(&cart_uri, Some(&m.ada.token)).await;
    assert_eq!(cart.status, StatusCode::OK);

    let response = m
        .app
        .post("/api/orders", Some(&m.ada.token), json!({ "paymentMethod": "card" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), Some("order total is too large"));
}

#[tokio::test]
async fn test_order_visibility() {
    let m = market().await;
    let order = m.order(json!([{ "productId": m.case, "quantity": 1 }])).await;
    let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());

    assert_eq!(m.app.get(&uri, Some(&m.ada.token)).await.status, StatusCode::OK);
    assert_eq!(m.app.get(&uri, Some(&m.seller.token)).await.status, StatusCode::OK);

    let (stranger, _) = m.app.customer("Grace", "grace@example.com").await;
    assert_eq!(
        m.app.get(&uri, Some(&stranger.token)).await.status,
        StatusCode::FORBIDDEN
    );

    let (rival, _) = m.app.seller("Rival Store", "rival@example.com").await;
    assert_eq!(
        m.app.get(&uri, Some(&rival.token)).await.status,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_fulfillment_moves_forward() {
    let m = market().await;
    let order = m.order(json!([{ "productId": m.phone, "quantity": 1 }])).await;
    let order_id = order["id"].as_str().unwrap();

    assert_eq!(m.set_status(order_id, "delivered").await, StatusCode::BAD_REQUEST);
    assert_eq!(m.set_status(order_id, "processing").await, StatusCode::OK);
    assert_eq!(m.set_status(order_id, "shipped").await, StatusCode::OK);
    assert_eq!(m.set_status(order_id, "delivered").await, StatusCode::OK);
    assert_eq!(m.set_status(order_id, "pending").await, StatusCode::BAD_REQUEST);

    let shown = m
        .app
        .get(&format!("/api/orders/{order_id}"), Some(&m.ada.token))
        .await;
    assert_eq!(shown.body["status"], json!("delivered"));
    assert!(
        shown.body["timeline"]
            .as_array()
            .unwrap()
            .iter()
            .all(|step| step["completed"] == json!(true))
    );
}

#[tokio::test]
async fn test_cancel_until_shipped() {
    let m = market().await;
    let first = m.order(json!([{ "productId": m.phone, "quantity": 1 }])).await;
    let second = m.order(json!([{ "productId": m.case, "quantity": 1 }])).await;

    let cancel = |order: &Value| format!("/api/orders/{}/cancel", order["id"].as_str().unwrap());

    let cancelled = m.app.post(&cancel(&first), Some(&m.ada.token), json!({})).await;
    assert_eq!(cancelled.status, StatusCode::OK);
    assert_eq!(cancelled.body["status"], json!("cancelled"));

    let second_id = second["id"].as_str().unwrap();
    assert_eq!(m.set_status(second_id, "processing").await, StatusCode::OK);
    assert_eq!(m.set_status(second_id, "shipped").await, StatusCode::OK);
    let refused = m.app.post(&cancel(&second), Some(&m.ada.token), json!({})).await;
    assert_eq!(refused.status, StatusCode::BAD_REQUEST);

    let (stranger, _) = m.app.customer("Grace", "grace@example.com").await;
    let forbidden = m.app.post(&cancel(&second), Some(&stranger.token), json!({})).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_rival_seller_cannot_update_order() {
    let m = market().await;
    let order = m.order(json!([{ "productId": m.phone, "quantity": 1 }])).await;
    let order_id = order["id"].as_str().unwrap();
    let (rival, rival_id) = m.app.seller("Rival Store", "rival@example.com").await;

    let response = m
        .app
        .patch(
            &format!("/api/sellers/{rival_id}/orders/{order_id}"),
            Some(&rival.token),
            json!({ "status": "processing" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = m
        .app
        .patch(
            &format!("/api/sellers/{}/orders/{order_id}", m.seller_id),
            Some(&rival.token),
            json!({ "status": "processing" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}
