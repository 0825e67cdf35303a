#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

//! Cart flows over HTTP: session-scoped carts, line item changes, market
//! selection from `Accept-Language` and the mini-cart fragment.

use reqwest::StatusCode;
use reqwest::header::{ACCEPT_LANGUAGE, CACHE_CONTROL, LOCATION};

use basket_integration_tests::{TestApp, line_item_ids};

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    let (status, body) = browser.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, _) = browser.get("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_root_redirects_to_cart() {
    let app = TestApp::spawn().await;
    let response = app.browser().get_raw("/").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/cart");
}

#[tokio::test]
async fn test_empty_cart_page() {
    let app = TestApp::spawn().await;
    let (status, body) = app.browser().get("/cart").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Your cart is empty."));
    assert!(body.contains("Prices in USD for US"));
}

#[tokio::test]
async fn test_add_line_item_in_us_market() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    let (status, body) = browser
        .post(
            "/cart/add",
            &[("product_id", "P1"), ("variant_id", "1"), ("quantity", "2")],
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Added to your cart."));
    assert!(body.contains("Merino Socks"));
    assert!(body.contains("$13.99"));
    assert!(body.contains("$27.98"));
    assert_eq!(line_item_ids(&body).len(), 1);
}

#[tokio::test]
async fn test_german_visitor_pays_in_euro() {
    let app = TestApp::spawn().await;
    let browser = app.browser_with_language("de-DE,de;q=0.9,en;q=0.5");

    let (_, body) = browser
        .post("/cart/add", &[("product_id", "P2"), ("variant_id", "1")])
        .await;

    assert!(body.contains("Canvas Tote"));
    assert!(body.contains("€24.50"));
    assert!(body.contains("Prices in EUR for DE"));
}

#[tokio::test]
async fn test_adding_same_variant_twice_merges_lines() {
    let app = TestApp::spawn().await;
    let browser = app.browser();
    let form = [("product_id", "P3"), ("variant_id", "2"), ("quantity", "1")];

    browser.post("/cart/add", &form).await;
    let (_, body) = browser.post("/cart/add", &form).await;

    assert_eq!(line_item_ids(&body).len(), 1);
    assert!(body.contains(r#"name="quantity" min="0" value="2""#));
}

#[tokio::test]
async fn test_rejected_add_shows_flash_error() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    let (status, body) = browser
        .post("/cart/add", &[("product_id", "P1"), ("variant_id", "99")])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("flash-error"));
    assert!(body.contains("Your cart is empty."));

    let (_, body) = browser
        .post(
            "/cart/add",
            &[("product_id", "P1"), ("variant_id", "1"), ("quantity", "0")],
        )
        .await;
    assert!(body.contains("flash-error"));
    assert!(body.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_cart_keeps_its_market_when_language_changes() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    browser
        .post("/cart/add", &[("product_id", "P1"), ("variant_id", "1")])
        .await;

    let response = browser
        .client
        .post(browser.url("/cart/add"))
        .header(ACCEPT_LANGUAGE, "de-DE")
        .form(&[("product_id", "P2"), ("variant_id", "1")])
        .send()
        .await
        .unwrap();
    let body = response.text().await.unwrap();

    assert!(body.contains("Added to your cart."));
    assert!(body.contains("Canvas Tote"));
    assert!(body.contains("$26.00"));
    assert!(body.contains("Prices in USD for US"));
    assert_eq!(line_item_ids(&body).len(), 2);
}

#[tokio::test]
async fn test_oversized_quantities_are_rejected() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    let (status, body) = browser
        .post(
            "/cart/add",
            &[("product_id", "P1"), ("variant_id", "1"), ("quantity", "4294967295")],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("flash-error"));
    assert!(body.contains("Your cart is empty."));

    let form = [("product_id", "P3"), ("variant_id", "1"), ("quantity", "999")];
    browser.post("/cart/add", &form).await;
    let (status, body) = browser.post("/cart/add", &form).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("flash-error"));
    assert!(body.contains(r#"name="quantity" min="0" value="999""#));

    let (status, body) = browser.get("/cart/mini").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Cart (999)"));
}

#[tokio::test]
async fn test_change_quantity_and_remove() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    let (_, body) = browser
        .post("/cart/add", &[("product_id", "P1"), ("variant_id", "2")])
        .await;
    let line_item_id = line_item_ids(&body)[0].to_string();

    let (_, body) = browser
        .post(
            "/cart/update",
            &[("line_item_id", &line_item_id), ("quantity", "3")],
        )
        .await;
    assert!(body.contains("Cart updated."));
    assert!(body.contains("$41.97"));

    let (_, body) = browser
        .post("/cart/remove", &[("line_item_id", &line_item_id)])
        .await;
    assert!(body.contains("Removed from your cart."));
    assert!(body.contains("Your cart is empty."));

    // The line is gone; a second removal is reported, not fatal.
    let (status, body) = browser
        .post("/cart/remove", &[("line_item_id", &line_item_id)])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("flash-error"));
}

#[tokio::test]
async fn test_zero_quantity_removes_line() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    let (_, body) = browser
        .post("/cart/add", &[("product_id", "P2"), ("variant_id", "1")])
        .await;
    let line_item_id = line_item_ids(&body)[0].to_string();

    let (_, body) = browser
        .post(
            "/cart/update",
            &[("line_item_id", &line_item_id), ("quantity", "0")],
        )
        .await;
    assert!(body.contains("Removed from your cart."));
    assert!(body.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_carts_are_scoped_to_the_session() {
    let app = TestApp::spawn().await;
    let alice = app.browser();
    let bob = app.browser();

    alice
        .post("/cart/add", &[("product_id", "P1"), ("variant_id", "1")])
        .await;

    let (_, body) = bob.get("/cart").await;
    assert!(body.contains("Your cart is empty."));

    let (_, body) = alice.get("/cart").await;
    assert!(body.contains("Merino Socks"));
}

#[tokio::test]
async fn test_mini_cart_never_creates_a_cart() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    let response = browser.client.get(browser.url("/cart/mini")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CACHE_CONTROL], "no-cache, no-store");
    let body = response.text().await.unwrap();
    assert!(body.contains("Cart (0)"));

    browser
        .post(
            "/cart/add",
            &[("product_id", "P3"), ("variant_id", "1"), ("quantity", "4")],
        )
        .await;
    let (_, body) = browser.get("/cart/mini").await;
    assert!(body.contains("Cart (4)"));
    assert!(body.contains("$40.00"));
}

#[tokio::test]
async fn test_responses_carry_request_id_and_security_headers() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    let response = browser
        .client
        .get(browser.url("/cart"))
        .header("x-request-id", "trace-123")
        .send()
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "trace-123");
    assert!(response.headers().contains_key("content-security-policy"));
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}
