#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

//! Sign-in, account details, addresses and order history over HTTP.

use reqwest::StatusCode;
use reqwest::header::LOCATION;

use basket_integration_tests::{PASSWORD, TestApp};
use basket_storefront::backend::{Address, CommerceBackend};

#[tokio::test]
async fn test_account_requires_sign_in() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    for path in ["/account", "/account/addresses", "/account/orders"] {
        let response = browser.get_raw(path).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(response.headers()[LOCATION], "/auth/login", "{path}");
    }
}

#[tokio::test]
async fn test_sign_in_and_out() {
    let app = TestApp::spawn().await;
    app.customer("ada@example.com", "Ada", "Lovelace").await;
    let browser = app.browser();

    let (status, body) = browser
        .post(
            "/auth/login",
            &[("email", "ada@example.com"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Welcome back, Ada Lovelace."));
    assert!(body.contains("Hello, Ada Lovelace"));

    // Signed-in visitors skip the login page.
    let response = browser.get_raw("/auth/login").await;
    assert_eq!(response.headers()[LOCATION], "/account");

    let (_, body) = browser.post("/auth/logout", &[]).await;
    assert!(body.contains("You have been signed out."));
    assert!(body.contains("Sign in"));

    let response = browser.get_raw("/account").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_wrong_password_rerenders_form() {
    let app = TestApp::spawn().await;
    app.customer("ada@example.com", "Ada", "Lovelace").await;
    let browser = app.browser();

    let (status, body) = browser
        .post(
            "/auth/login",
            &[("email", "ada@example.com"), ("password", "wrong")],
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("field-error"));
    assert!(body.contains(r#"value="ada@example.com""#));

    let (status, body) = browser
        .post("/auth/login", &[("email", "not-an-email"), ("password", "x")])
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("field-error"));
}

#[tokio::test]
async fn test_sign_in_starts_a_fresh_cart() {
    let app = TestApp::spawn().await;
    app.customer("ada@example.com", "Ada", "Lovelace").await;
    let browser = app.browser();

    let (_, body) = browser
        .post("/cart/add", &[("product_id", "P1"), ("variant_id", "1")])
        .await;
    assert!(body.contains("Merino Socks"));

    browser.sign_in("ada@example.com").await;
    let (_, body) = browser.get("/cart").await;
    assert!(body.contains("Your cart is empty."));

    browser
        .post("/cart/add", &[("product_id", "P2"), ("variant_id", "1")])
        .await;
    browser.post("/auth/logout", &[]).await;

    // The customer's cart stays with the customer.
    let (_, body) = browser.get("/cart").await;
    assert!(!body.contains("Canvas Tote"));
}

#[tokio::test]
async fn test_update_account_details() {
    let app = TestApp::spawn().await;
    let ada = app.customer("ada@example.com", "Ada", "Lovelace").await;
    app.customer("grace@example.com", "Grace", "Hopper").await;
    let browser = app.browser();
    browser.sign_in("ada@example.com").await;

    // Taken email.
    let (status, body) = browser
        .post(
            "/account",
            &[
                ("first_name", "Ada"),
                ("last_name", "Lovelace"),
                ("email", "grace@example.com"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("field-error"));

    let (status, body) = browser
        .post(
            "/account",
            &[
                ("first_name", "Augusta Ada"),
                ("last_name", "King"),
                ("email", "ada@king.example"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Your details were saved."));
    assert!(body.contains("Hello, Augusta Ada King"));
    // The header shows the new email.
    assert!(body.contains(">ada@king.example</a>"));

    let stored = app.backend.get_customer(&ada.id).await.unwrap().unwrap();
    assert_eq!(stored.email.to_string(), "ada@king.example");
}

#[tokio::test]
async fn test_edit_address() {
    let app = TestApp::spawn().await;
    let ada = app.customer("ada@example.com", "Ada", "Lovelace").await;
    let ada = app
        .backend
        .add_address(
            &ada.id,
            Address {
                id: None,
                first_name: Some("Ada".to_string()),
                last_name: Some("Lovelace".to_string()),
                street_name: Some("St James's Square".to_string()),
                street_number: Some("12".to_string()),
                postal_code: Some("SW1Y 4JH".to_string()),
                city: Some("London".to_string()),
                country: "GB".to_string(),
            },
        )
        .await
        .unwrap();
    let address_id = ada.addresses[0].id.clone().unwrap();
    let browser = app.browser();
    browser.sign_in("ada@example.com").await;

    let (_, body) = browser.get("/account/addresses").await;
    assert!(body.contains("London"));

    let edit = format!("/account/addresses/{address_id}/edit");
    let (status, body) = browser.get(&edit).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"value="SW1Y 4JH""#));

    let (status, body) = browser
        .post(
            &edit,
            &[("street_name", "Marylebone Road"), ("city", ""), ("country", "GBR")],
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("Use a two-letter country code"));

    let (_, body) = browser
        .post(
            &edit,
            &[
                ("street_name", "Marylebone Road"),
                ("street_number", "1"),
                ("city", "London"),
                ("country", "gb"),
            ],
        )
        .await;
    assert!(body.contains("Address saved."));
    assert!(body.contains("Marylebone Road 1"));

    let (_, body) = browser.get("/account/addresses/unknown/edit").await;
    assert!(body.contains("That item no longer exists."));
}

#[tokio::test]
async fn test_order_history() {
    let app = TestApp::spawn().await;
    let ada = app.customer("ada@example.com", "Ada", "Lovelace").await;
    let grace = app.customer("grace@example.com", "Grace", "Hopper").await;
    app.order("o-1", "1001", &ada.id).await;
    app.order("o-2", "1002", &grace.id).await;
    let browser = app.browser();
    browser.sign_in("ada@example.com").await;

    let (_, body) = browser.get("/account/orders").await;
    assert!(body.contains("1001"));
    assert!(!body.contains("1002"));

    let (status, body) = browser.get("/account/orders/o-1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Order 1001"));
    assert!(body.contains("€25.98"));

    let (status, _) = browser.get("/account/orders/o-2").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = browser.get("/account/orders/o-404").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("That item no longer exists."));
}

#[tokio::test]
async fn test_login_is_rate_limited() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    let mut statuses = Vec::new();
    for _ in 0..10 {
        let response = browser
            .post_raw(
                "/auth/login",
                &[("email", "nobody@example.com"), ("password", "guess")],
            )
            .await;
        statuses.push(response.status());
    }

    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
    // The login page itself is not limited.
    let (status, _) = browser.get("/auth/login").await;
    assert_eq!(status, StatusCode::OK);
}
