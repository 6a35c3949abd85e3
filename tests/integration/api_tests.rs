//! API integration tests against a running server

use library_server::models::id::ObjectId;
use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Register a reader with a phone number no other test uses
async fn register_reader(client: &Client) -> (String, String) {
    let phone = format!("+{}", ObjectId::new());
    let response = client
        .post(format!("{}/users", BASE_URL))
        .json(&json!({
            "fullName": "Integration Reader",
            "phone": phone,
            "password": "secret",
            "role": "reader"
        }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse user");
    (body["id"].as_str().expect("No id in user").to_string(), phone)
}

async fn create_book(client: &Client, title: &str) -> String {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .json(&json!({
            "title": title,
            "author": "Integration Author",
            "year": 2001,
            "genre": "test"
        }))
        .send()
        .await
        .expect("Failed to send create book request");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse book");
    body["id"].as_str().expect("No id in book").to_string()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();
    let (id, phone) = register_reader(&client).await;

    let response = client
        .post(format!("{}/users/login", BASE_URL))
        .json(&json!({ "phone": phone, "password": "secret" }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["id"], id.as_str());
    assert!(body.get("password").is_none());
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();
    let (_, phone) = register_reader(&client).await;

    let response = client
        .post(format!("{}/users/login", BASE_URL))
        .json(&json!({ "phone": phone, "password": "wrong" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[ignore]
async fn test_blocked_user_cannot_log_in() {
    let client = Client::new();
    let (id, phone) = register_reader(&client).await;

    let response = client
        .post(format!("{}/users/{}/block", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/users/login", BASE_URL))
        .json(&json!({ "phone": phone, "password": "secret" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_borrow_and_return_cycle() {
    let client = Client::new();
    let (user_id, _) = register_reader(&client).await;
    let book_id = create_book(&client, "Integration Cycle").await;

    let response = client
        .post(format!("{}/borrows", BASE_URL))
        .json(&json!({ "userId": user_id, "bookId": book_id }))
        .send()
        .await
        .expect("Failed to send borrow request");
    assert_eq!(response.status(), 201);
    let borrow: Value = response.json().await.expect("Failed to parse borrow");
    let borrow_id = borrow["id"].as_str().expect("No id in borrow").to_string();

    let response = client
        .post(format!("{}/borrows", BASE_URL))
        .json(&json!({ "userId": user_id, "bookId": book_id }))
        .send()
        .await
        .expect("Failed to send borrow request");
    assert_eq!(response.status(), 409);

    let response = client
        .post(format!("{}/borrows/{}/return", BASE_URL, borrow_id))
        .send()
        .await
        .expect("Failed to send return request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "returned");

    let response = client
        .post(format!("{}/borrows/{}/return", BASE_URL, borrow_id))
        .send()
        .await
        .expect("Failed to send return request");
    assert_eq!(response.status(), 409);

    let response = client
        .get(format!("{}/users/{}/borrows", BASE_URL, user_id))
        .send()
        .await
        .expect("Failed to send history request");
    let history: Value = response.json().await.expect("Failed to parse history");
    assert_eq!(history["history"][0]["status"], "ok");
}

#[tokio::test]
#[ignore]
async fn test_stats_rejects_inverted_range() {
    let client = Client::new();

    let response = client
        .get(format!("{}/borrows/stats?from=2024-02-01&to=2024-01-01", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);
}
