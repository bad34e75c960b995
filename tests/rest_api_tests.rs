use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use bookstore_checkout::adapter::driven::InMemoryStore;
use bookstore_checkout::adapter::driver::{create_router, AppState};
use bookstore_checkout::application::service::{CartApplicationService, OrderApplicationService};
use bookstore_checkout::domain::model::{Book, BookId, Money, User, UserId};
use bookstore_checkout::domain::port::UnitOfWork;

use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    server: TestServer,
    store: InMemoryStore,
    user_id: UserId,
    admin_id: UserId,
    book_id: BookId,
}

async fn harness_with(store: InMemoryStore, stock: u32) -> Harness {
    let user_id = UserId::new();
    let admin_id = UserId::new();
    for (id, name) in [(user_id, "user"), (admin_id, "admin")] {
        store
            .insert_user(User::new(id, name.to_string(), format!("{}@example.com", name)))
            .await;
    }
    let book = Book::new(
        BookId::new(),
        "Test Book".to_string(),
        "Author".to_string(),
        "Description".to_string(),
        Money::new(Decimal::from_str("100.0").unwrap()).unwrap(),
        stock,
    );
    let book_id = book.id();
    store.insert_book(book).await;

    let shared = Arc::new(store.clone());
    let state = AppState {
        cart_service: Arc::new(CartApplicationService::new(
            shared.clone(),
            shared.clone(),
            shared.clone(),
            shared.clone(),
        )),
        order_service: Arc::new(OrderApplicationService::new(
            shared.clone(),
            shared.clone(),
            shared,
        )),
    };
    let server = TestServer::new(create_router().with_state(state)).unwrap();

    Harness {
        server,
        store,
        user_id,
        admin_id,
        book_id,
    }
}

async fn harness(stock: u32) -> Harness {
    harness_with(InMemoryStore::new(), stock).await
}

fn authenticated(request: TestRequest, user_id: UserId, role: &str) -> TestRequest {
    request
        .add_header(
            HeaderName::from_static("x-user-id"),
            HeaderValue::from_str(&user_id.to_string()).unwrap(),
        )
        .add_header(
            HeaderName::from_static("x-user-role"),
            HeaderValue::from_str(role).unwrap(),
        )
}

fn address() -> Value {
    json!({
        "name": "John",
        "phone_number": "9999999999",
        "pin_code": "123456",
        "locality": "Locality",
        "address": "123 Street",
        "city": "City",
        "landmark": "Near Park"
    })
}

impl Harness {
    async fn add_to_cart(&self, quantity: u32) -> Value {
        let response = authenticated(
            self.server.post(&format!("/cart/books/{}", self.book_id)),
            self.user_id,
            "USER",
        )
        .json(&json!({ "quantity": quantity }))
        .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()
    }

    async fn place_order(&self) -> Value {
        let response = authenticated(self.server.post("/orders"), self.user_id, "USER")
            .json(&address())
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()
    }
}

#[tokio::test]
async fn test_health_check() {
    let h = harness(5).await;

    let response = h.server.get("/health").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn test_missing_identity_is_unauthenticated() {
    let h = harness(5).await;

    let response = h.server.get("/cart").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "UNAUTHENTICATED");

    let response = authenticated(h.server.get("/cart"), h.user_id, "GUEST").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_role_is_refused_with_action_message() {
    let h = harness(5).await;

    let response = authenticated(
        h.server.post(&format!("/cart/books/{}", h.book_id)),
        h.admin_id,
        "admin",
    )
    .json(&json!({ "quantity": 1 }))
    .await;

    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(
        response.json::<Value>()["error"],
        "Token is NOT Valid to Add To Cart Book"
    );

    let response = authenticated(h.server.get("/orders"), h.user_id, "user").await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_add_to_cart_and_list() {
    let h = harness(5).await;

    let body = h.add_to_cart(2).await;
    assert_eq!(body["message"], "Book Added to Cart Successfully!!");
    assert_eq!(body["cart_line"]["quantity"], 2);
    assert_eq!(body["cart_line"]["total_price"], "200.0");

    // 役割は大文字小文字を区別しない
    let response = authenticated(
        h.server.post(&format!("/cart/books/{}/one", h.book_id)),
        h.user_id,
        "user",
    )
    .await;
    response.assert_status(StatusCode::CREATED);

    let response = authenticated(h.server.get("/cart"), h.user_id, "USER").await;
    response.assert_status_ok();
    let items = response.json::<Value>();
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["quantity"], 3);
    assert_eq!(items[0]["book_name"], "Test Book");
    assert_eq!(h.store.book(h.book_id).await.unwrap().available_quantity(), 2);
}

#[tokio::test]
async fn test_insufficient_stock_is_bad_request() {
    let h = harness(5).await;

    let response = authenticated(
        h.server.post(&format!("/cart/books/{}", h.book_id)),
        h.user_id,
        "USER",
    )
    .json(&json!({ "quantity": 6 }))
    .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INSUFFICIENT_STOCK");
    assert_eq!(h.store.book(h.book_id).await.unwrap().available_quantity(), 5);
}

#[tokio::test]
async fn test_unknown_book_is_not_found() {
    let h = harness(5).await;

    let response = authenticated(
        h.server.post(&format!("/cart/books/{}", BookId::new())),
        h.user_id,
        "USER",
    )
    .json(&json!({ "quantity": 1 }))
    .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_path_id_is_rejected() {
    let h = harness(5).await;

    let response = authenticated(h.server.delete("/cart/lines/not-a-uuid"), h.user_id, "USER").await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quantity_changes() {
    let h = harness(5).await;
    let body = h.add_to_cart(2).await;
    let line_id = body["cart_line"]["cart_line_id"].as_str().unwrap().to_string();

    let response = authenticated(
        h.server.patch(&format!("/cart/lines/{}", line_id)),
        h.user_id,
        "USER",
    )
    .json(&json!({ "quantity": 5 }))
    .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["cart_line"]["quantity"], 5);

    let response = authenticated(
        h.server.patch(&format!("/cart/lines/{}/increment", line_id)),
        h.user_id,
        "USER",
    )
    .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_QUANTITY");

    let response = authenticated(
        h.server.patch(&format!("/cart/lines/{}/decrement", line_id)),
        h.user_id,
        "USER",
    )
    .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["cart_line"]["quantity"], 4);
    assert_eq!(h.store.book(h.book_id).await.unwrap().available_quantity(), 1);
}

#[tokio::test]
async fn test_remove_line_and_clear_cart() {
    let h = harness(5).await;
    let body = h.add_to_cart(2).await;
    let line_id = body["cart_line"]["cart_line_id"].as_str().unwrap().to_string();

    let response = authenticated(
        h.server.delete(&format!("/cart/lines/{}", line_id)),
        h.user_id,
        "USER",
    )
    .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["message"], "Remove From Cart Successfully");
    assert_eq!(h.store.book(h.book_id).await.unwrap().available_quantity(), 5);

    h.add_to_cart(1).await;
    let response = authenticated(h.server.delete("/cart"), h.user_id, "USER").await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>()["message"],
        format!("All Cart Deleted for User ID: {}", h.user_id)
    );
}

#[tokio::test]
async fn test_admin_listings_signal_empty() {
    let h = harness(5).await;

    let response = authenticated(h.server.get("/carts"), h.admin_id, "ADMIN").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["message"], "No Cart Is Present!!");

    let response = authenticated(h.server.get("/orders"), h.admin_id, "ADMIN").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["message"], "No Order Is Present!!");

    h.add_to_cart(1).await;
    let response = authenticated(h.server.get("/carts"), h.admin_id, "ADMIN").await;
    assert_eq!(response.json::<Value>().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_place_order_empties_cart() {
    let h = harness(5).await;
    h.add_to_cart(2).await;

    let order = h.place_order().await;

    assert_eq!(order["price"], "200.0");
    assert_eq!(order["quantity"], 1);
    assert_eq!(order["status"], "Placed");
    assert_eq!(order["address"]["landmark"], "Near Park");

    let response = authenticated(h.server.get("/cart"), h.user_id, "USER").await;
    assert_eq!(response.json::<Value>(), json!([]));
}

#[tokio::test]
async fn test_place_order_with_blank_address_field() {
    let h = harness(5).await;
    let mut body = address();
    body["name"] = json!("");

    let response = authenticated(h.server.post("/orders"), h.user_id, "USER")
        .json(&body)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "INVALID_ADDRESS");
}

#[tokio::test]
async fn test_cancel_order_lifecycle() {
    let h = harness(5).await;
    let order = h.place_order().await;
    let order_id = order["order_id"].as_str().unwrap().to_string();
    let cancel_path = format!("/orders/{}/cancel", order_id);

    let response = authenticated(h.server.post(&cancel_path), h.admin_id, "USER").await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(
        response.json::<Value>()["error"],
        "NOT Eligible to CANCEL the Order!!"
    );

    let response = authenticated(h.server.post(&cancel_path), h.user_id, "USER").await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>()["message"],
        format!("Order Cancel Successfully with ID : {}", order_id)
    );

    let response = authenticated(h.server.post(&cancel_path), h.user_id, "USER").await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["code"], "ALREADY_CANCELLED");
}

#[tokio::test]
async fn test_cancel_order_by_unknown_user_is_not_found() {
    let h = harness(5).await;
    let order = h.place_order().await;
    let cancel_path = format!("/orders/{}/cancel", order["order_id"].as_str().unwrap());

    let response = authenticated(h.server.post(&cancel_path), UserId::new(), "USER").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body = response.json::<Value>();
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["error"], "Enter a Valid Token");
}

#[tokio::test]
async fn test_get_order_owner_or_admin() {
    let h = harness(5).await;
    let order = h.place_order().await;
    let path = format!("/orders/{}", order["order_id"].as_str().unwrap());

    authenticated(h.server.get(&path), h.user_id, "USER")
        .await
        .assert_status_ok();
    authenticated(h.server.get(&path), h.admin_id, "ADMIN")
        .await
        .assert_status_ok();
    authenticated(h.server.get(&path), h.admin_id, "USER")
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = authenticated(h.server.get("/orders"), h.admin_id, "ADMIN").await;
    assert_eq!(response.json::<Value>().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_lock_timeout_is_retryable_service_unavailable() {
    let h = harness_with(InMemoryStore::with_lock_timeout(Duration::from_millis(20)), 5).await;
    let held = h.store.begin().await.unwrap();

    let response = authenticated(
        h.server.post(&format!("/cart/books/{}", h.book_id)),
        h.user_id,
        "USER",
    )
    .json(&json!({ "quantity": 1 }))
    .await;
    drop(held);

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<Value>()["code"], "RETRYABLE_CONFLICT");
}
