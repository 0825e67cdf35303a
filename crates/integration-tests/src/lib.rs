//! Test harness for end-to-end storefront tests.
//!
//! Every [`TestApp`] serves the real router on an ephemeral port with the
//! in-memory commerce backend and in-memory sessions, so tests need no
//! database or platform credentials:
//!
//! ```bash
//! cargo test -p basket-integration-tests
//! ```
//!
//! Tests seed customers and orders through [`TestApp::backend`] and drive
//! the storefront over HTTP with a [`Browser`], which keeps cookies like a
//! real browser would.

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, Response, StatusCode, cookie::Jar, redirect};
use tokio::net::TcpListener;
use tower_sessions::MemoryStore;

use basket_core::{CurrencyCode, CustomerId, Email, LineItemId, Money, OrderId, ProductId, VariantId};
use basket_storefront::app;
use basket_storefront::backend::{Catalog, Customer, InMemoryBackend, LineItem, Order};
use basket_storefront::config::StorefrontConfig;
use basket_storefront::state::AppState;

/// Password of every customer created with [`TestApp::customer`].
pub const PASSWORD: &str = "correct horse battery staple";

/// A storefront served on a random local port.
pub struct TestApp {
    pub base_url: String,
    pub backend: InMemoryBackend,
}

impl TestApp {
    /// Start a storefront with the demo catalog.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");
        let base_url = format!("http://{addr}");

        let backend = InMemoryBackend::new(Catalog::demo());
        let config = StorefrontConfig::local(&base_url);
        let state = AppState::new(config, Arc::new(backend.clone()), None);
        let router = app(state, MemoryStore::default());

        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server failed");
        });

        Self { base_url, backend }
    }

    /// A fresh browser with an empty cookie jar.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP clients cannot be built.
    #[must_use]
    pub fn browser(&self) -> Browser {
        self.browser_with_language("en-US")
    }

    /// A fresh browser sending `Accept-Language: language`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP clients cannot be built.
    #[must_use]
    pub fn browser_with_language(&self, language: &str) -> Browser {
        let jar = Arc::new(Jar::default());
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            language.parse().expect("Invalid Accept-Language"),
        );

        let build = |policy: redirect::Policy| {
            Client::builder()
                .cookie_provider(Arc::clone(&jar))
                .default_headers(headers.clone())
                .redirect(policy)
                .build()
                .expect("Failed to create HTTP client")
        };

        Browser {
            base_url: self.base_url.clone(),
            client: build(redirect::Policy::limited(5)),
            no_redirect: build(redirect::Policy::none()),
        }
    }

    /// Register a customer that can sign in with [`PASSWORD`].
    ///
    /// # Panics
    ///
    /// Panics if the email is invalid or taken.
    pub async fn customer(&self, email: &str, first_name: &str, last_name: &str) -> Customer {
        self.backend
            .register_customer(
                Email::parse(email).expect("Invalid email"),
                PASSWORD,
                Some(first_name.to_string()),
                Some(last_name.to_string()),
            )
            .await
            .expect("Failed to register customer")
    }

    /// Record an order of two pairs of socks for `customer_id`.
    ///
    /// # Panics
    ///
    /// Panics never; the demo variant id is valid.
    pub async fn order(&self, id: &str, number: &str, customer_id: &CustomerId) -> Order {
        let price = Money::from_cents(1299, CurrencyCode::EUR);
        let order = Order {
            id: OrderId::new(id),
            order_number: Some(number.to_string()),
            customer_id: Some(customer_id.clone()),
            line_items: vec![LineItem {
                id: LineItemId::new(format!("{id}-1")),
                product_id: ProductId::new("P1"),
                variant_id: VariantId::new(1).expect("Invalid variant id"),
                name: "Merino Socks".to_string(),
                quantity: 2,
                price: Some(price),
            }],
            total: Money::from_cents(2598, CurrencyCode::EUR),
            created_at: chrono::Utc::now(),
        };
        self.backend.insert_order(order.clone()).await;
        order
    }
}

/// An HTTP client with its own cookie jar.
pub struct Browser {
    base_url: String,
    /// Follows redirects.
    pub client: Client,
    /// Shares cookies with `client` but returns redirects as-is.
    pub no_redirect: Client,
}

impl Browser {
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET `path` and return status and body.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn get(&self, path: &str) -> (StatusCode, String) {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed");
        read(response).await
    }

    /// POST a form to `path`, follow the redirect and return the final
    /// status and body.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn post(&self, path: &str, form: &[(&str, &str)]) -> (StatusCode, String) {
        let response = self
            .client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST failed");
        read(response).await
    }

    /// POST a form without following the redirect.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn post_raw(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.no_redirect
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST failed")
    }

    /// GET without following the redirect.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn get_raw(&self, path: &str) -> Response {
        self.no_redirect
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    /// Sign in with [`PASSWORD`].
    ///
    /// # Panics
    ///
    /// Panics if the sign-in is rejected.
    pub async fn sign_in(&self, email: &str) {
        let response = self
            .post_raw("/auth/login", &[("email", email), ("password", PASSWORD)])
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "sign-in rejected");
    }
}

async fn read(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let body = response.text().await.expect("Failed to read body");
    (status, body)
}

/// Every value of `attribute="..."` that directly follows `marker` in
/// `html`, in document order.
#[must_use]
pub fn values_after<'a>(html: &'a str, marker: &str) -> Vec<&'a str> {
    html.match_indices(marker)
        .filter_map(|(start, _)| {
            let rest = html.get(start + marker.len()..)?;
            let end = rest.find('"')?;
            rest.get(..end)
        })
        .collect()
}

/// The line item ids of hidden `line_item_id` inputs.
#[must_use]
pub fn line_item_ids(html: &str) -> Vec<&str> {
    let mut ids = values_after(html, r#"name="line_item_id" value=""#);
    ids.dedup();
    ids
}

/// The shopping list ids linked from delete forms.
#[must_use]
pub fn shopping_list_ids(html: &str) -> Vec<&str> {
    values_after(html, r#"action="/shopping-lists/"#)
        .into_iter()
        .filter_map(|action| action.strip_suffix("/delete"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_after() {
        let html = r#"<input name="line_item_id" value="a"><input name="line_item_id" value="a"><input name="line_item_id" value="b">"#;
        assert_eq!(line_item_ids(html), vec!["a", "b"]);

        let html = r#"<form action="/shopping-lists/l1/rename"></form><form action="/shopping-lists/l1/delete">"#;
        assert_eq!(shopping_list_ids(html), vec!["l1"]);
    }
}
