#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

//! Shopping list flows over HTTP.

use reqwest::StatusCode;

use basket_integration_tests::{TestApp, line_item_ids, shopping_list_ids};

#[tokio::test]
async fn test_create_and_list() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    let (_, body) = browser.get("/shopping-lists").await;
    assert!(body.contains("You have no shopping lists yet."));

    let (status, body) = browser
        .post("/shopping-lists", &[("name", "  Birthday  ")])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Birthday"));
    assert_eq!(shopping_list_ids(&body).len(), 1);

    browser.post("/shopping-lists", &[("name", "Groceries")]).await;
    let (_, body) = browser.get("/shopping-lists").await;

    // Oldest first.
    let birthday = body.find("<h2>Birthday").unwrap();
    let groceries = body.find("<h2>Groceries").unwrap();
    assert!(birthday < groceries);
}

#[tokio::test]
async fn test_blank_name_is_rejected() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    let (_, body) = browser.post("/shopping-lists", &[("name", "   ")]).await;
    assert!(body.contains("flash-error"));
    assert!(shopping_list_ids(&body).is_empty());
}

#[tokio::test]
async fn test_lists_are_scoped_to_the_visitor() {
    let app = TestApp::spawn().await;
    let alice = app.browser();
    let mallory = app.browser();

    let (_, body) = alice.post("/shopping-lists", &[("name", "Private")]).await;
    let list_id = shopping_list_ids(&body)[0].to_string();

    let (_, body) = mallory.get("/shopping-lists").await;
    assert!(!body.contains("Private"));

    // Renaming or deleting someone else's list is forbidden.
    let response = mallory
        .post_raw(
            &format!("/shopping-lists/{list_id}/rename"),
            &[("name", "Mine now")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = mallory
        .post_raw(&format!("/shopping-lists/{list_id}/delete"), &[])
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let (_, body) = alice.get("/shopping-lists").await;
    assert!(body.contains("Private"));
}

#[tokio::test]
async fn test_rename_and_delete() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    let (_, body) = browser.post("/shopping-lists", &[("name", "Draft")]).await;
    let list_id = shopping_list_ids(&body)[0].to_string();

    let (_, body) = browser
        .post(
            &format!("/shopping-lists/{list_id}/rename"),
            &[("name", "Final")],
        )
        .await;
    assert!(body.contains("<h2>Final"));
    assert!(!body.contains("<h2>Draft"));

    let (_, body) = browser
        .post(&format!("/shopping-lists/{list_id}/delete"), &[])
        .await;
    assert!(body.contains("List deleted."));
    assert!(shopping_list_ids(&body).is_empty());

    // Deleting again reports the missing list.
    let (status, body) = browser
        .post(&format!("/shopping-lists/{list_id}/delete"), &[])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("flash-error"));
}

#[tokio::test]
async fn test_save_cart_line_to_list_and_back() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    let (_, body) = browser.post("/shopping-lists", &[("name", "Later")]).await;
    let list_id = shopping_list_ids(&body)[0].to_string();

    // The cart page offers the list as a target.
    let (_, body) = browser
        .post(
            "/cart/add",
            &[("product_id", "P3"), ("variant_id", "1"), ("quantity", "2")],
        )
        .await;
    assert!(body.contains(&format!(r#"<option value="{list_id}">Later</option>"#)));

    let (_, body) = browser
        .post(
            "/shopping-lists/add",
            &[
                ("list_id", &list_id),
                ("product_id", "P3"),
                ("variant_id", "1"),
                ("quantity", "2"),
            ],
        )
        .await;
    assert!(body.contains("Enamel Mug"));
    assert!(body.contains("2 items"));

    let line_item_id = line_item_ids(&body)[0].to_string();
    let (_, body) = browser
        .post(
            "/shopping-lists/update",
            &[
                ("list_id", &list_id),
                ("line_item_id", &line_item_id),
                ("quantity", "5"),
            ],
        )
        .await;
    assert!(body.contains("List updated."));
    assert!(body.contains("5 items"));

    let (_, body) = browser
        .post(
            "/shopping-lists/remove",
            &[("list_id", &list_id), ("line_item_id", &line_item_id)],
        )
        .await;
    assert!(body.contains("Removed from the list."));
    assert!(body.contains("Nothing saved here yet."));
}

#[tokio::test]
async fn test_unknown_list_is_reported() {
    let app = TestApp::spawn().await;
    let browser = app.browser();

    let (status, body) = browser
        .post(
            "/shopping-lists/add",
            &[
                ("list_id", "no-such-list"),
                ("product_id", "P1"),
                ("variant_id", "1"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("That item no longer exists."));
}
