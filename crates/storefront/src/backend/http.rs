//! Commerce platform REST client.
//!
//! Speaks a commercetools-style JSON API with `reqwest` 0.13:
//!
//! - `POST {auth_url}/oauth/token` client-credentials grant, token cached
//!   until shortly before it expires
//! - `{api_url}/{project_key}/carts|shopping-lists|customers|orders|product-projections`
//! - updates are `POST {resource}/{id}` with `{ "version": n, "actions": [...] }`
//!
//! Orders are immutable once placed and cached with `moka` (5-minute TTL).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use url::Url;

use basket_core::{
    AddressId, CartId, CurrencyCode, CustomerId, Email, LineItemId, Locale, Money, OrderId,
    Principal, ProductId, ShoppingListId, VariantId, Version,
};

use super::{
    Address, BackendError, Cart, CartAction, CartDraft, CartUpdate, CommerceBackend, Customer,
    CustomerAction, CustomerUpdate, LineItem, Order, ProductVariant, ShoppingList,
    ShoppingListAction, ShoppingListDraft, ShoppingListUpdate,
};
use crate::config::CommerceApiConfig;

/// Tokens are refreshed this long before the server says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Upper bound for owner-scoped queries; a visitor never has more lists.
const QUERY_LIMIT: &str = "500";

// =============================================================================
// HttpBackend
// =============================================================================

/// [`CommerceBackend`] talking to the remote platform.
#[derive(Clone)]
pub struct HttpBackend {
    inner: Arc<HttpBackendInner>,
}

struct HttpBackendInner {
    client: reqwest::Client,
    api_url: Url,
    token_url: Url,
    project_key: String,
    client_id: String,
    client_secret: SecretString,
    scopes: Option<String>,
    /// Language used for names that are not tied to a cart locale.
    language: String,
    token: Mutex<Option<CachedToken>>,
    orders: Cache<OrderId, Order>,
}

struct CachedToken {
    access_token: SecretString,
    refresh_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

impl HttpBackend {
    /// Create a client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidInput`] if the auth URL cannot be
    /// extended with the token path.
    pub fn new(config: &CommerceApiConfig, default_locale: &Locale) -> Result<Self, BackendError> {
        let token_url = config
            .auth_url
            .join("oauth/token")
            .map_err(|e| BackendError::InvalidInput(format!("invalid auth URL: {e}")))?;

        let orders = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Ok(Self {
            inner: Arc::new(HttpBackendInner {
                client: reqwest::Client::new(),
                api_url: config.api_url.clone(),
                token_url,
                project_key: config.project_key.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                scopes: config.scopes.clone(),
                language: default_locale.language().to_string(),
                token: Mutex::new(None),
                orders,
            }),
        })
    }

    /// `{api_url}/{project_key}/{segments...}`.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.inner.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidInput("API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(&self.inner.project_key)
            .extend(segments);
        Ok(url)
    }

    /// Current access token, fetching a new one when needed.
    async fn access_token(&self) -> Result<SecretString, BackendError> {
        let mut cached = self.inner.token.lock().await;
        if let Some(token) = cached.as_ref()
            && token.refresh_at > Instant::now()
        {
            return Ok(token.access_token.clone());
        }

        let mut params = vec![("grant_type", "client_credentials")];
        if let Some(scopes) = self.inner.scopes.as_deref() {
            params.push(("scope", scopes));
        }

        let response = self
            .inner
            .client
            .post(self.inner.token_url.clone())
            .basic_auth(
                &self.inner.client_id,
                Some(self.inner.client_secret.expose_secret()),
            )
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "Commerce token request failed");
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: format!("token request failed: {}", truncate(&text)),
            });
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        let access_token = SecretString::from(token.access_token);
        *cached = Some(CachedToken {
            access_token: access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        debug!(lifetime_secs = lifetime.as_secs(), "Fetched commerce access token");

        Ok(access_token)
    }

    /// Send a request and decode the JSON body.
    ///
    /// `version` is the version an update was based on; it lets a 409 be
    /// reported as [`BackendError::Conflict`].
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        version: Option<Version>,
    ) -> Result<T, BackendError> {
        let token = self.access_token().await?;
        let mut request = self
            .inner
            .client
            .request(method, url)
            .bearer_auth(token.expose_secret());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let err = error_from_response(status, &text, version);
            if matches!(err, BackendError::Api { .. }) {
                tracing::error!(
                    status = %status,
                    body = %truncate(&text),
                    "Commerce API returned non-success status"
                );
            }
            return Err(err);
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&text),
                "Failed to parse commerce API response"
            );
            BackendError::Parse(e)
        })
    }

    /// Like [`Self::execute`] for reads, mapping 404 to `None`.
    async fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, BackendError> {
        match self.execute(Method::GET, url, None, None).await {
            Ok(value) => Ok(Some(value)),
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update<T: DeserializeOwned>(
        &self,
        url: Url,
        version: Version,
        actions: Vec<Value>,
    ) -> Result<T, BackendError> {
        let body = json!({ "version": version.get(), "actions": actions });
        self.execute(Method::POST, url, Some(&body), Some(version))
            .await
    }

    fn owner_predicate(owner: &Principal) -> String {
        match owner {
            Principal::Customer { customer_id } => {
                format!("customer(id=\"{}\")", escape_predicate(customer_id.as_str()))
            }
            Principal::Anonymous { session_id } => {
                format!("anonymousId=\"{}\"", escape_predicate(session_id.as_str()))
            }
        }
    }
}

// =============================================================================
// CommerceBackend
// =============================================================================

#[async_trait]
impl CommerceBackend for HttpBackend {
    #[instrument(skip(self))]
    async fn get_cart(&self, id: &CartId) -> Result<Option<Cart>, BackendError> {
        let url = self.endpoint(&["carts", id.as_str()])?;
        self.fetch::<WireCart>(url)
            .await?
            .map(WireCart::into_cart)
            .transpose()
    }

    #[instrument(skip(self), fields(owner = %draft.owner))]
    async fn create_cart(&self, draft: CartDraft) -> Result<Cart, BackendError> {
        let mut body = json!({
            "currency": draft.currency.code(),
            "country": draft.country,
            "locale": draft.locale.to_string(),
        });
        insert_owner(&mut body, &draft.owner, false);

        let url = self.endpoint(&["carts"])?;
        let cart: WireCart = self.execute(Method::POST, url, Some(&body), None).await?;
        cart.into_cart()
    }

    #[instrument(skip(self, update), fields(cart_id = %update.id(), version = %update.version()))]
    async fn update_cart(&self, update: CartUpdate) -> Result<Cart, BackendError> {
        let (id, version, actions) = update.into_parts();
        let actions = actions.iter().map(cart_action_json).collect();
        let url = self.endpoint(&["carts", id.as_str()])?;
        let cart: WireCart = self.update(url, version, actions).await?;
        cart.into_cart()
    }

    #[instrument(skip(self))]
    async fn find_variant(
        &self,
        product_id: &ProductId,
        variant_id: VariantId,
        currency: CurrencyCode,
        country: &str,
    ) -> Result<Option<ProductVariant>, BackendError> {
        let mut url = self.endpoint(&["product-projections", product_id.as_str()])?;
        url.query_pairs_mut()
            .append_pair("priceCurrency", currency.code())
            .append_pair("priceCountry", country);

        let Some(product) = self.fetch::<WireProduct>(url).await? else {
            return Ok(None);
        };
        let name = localized(&product.name, &self.inner.language);
        let Some(variant) = product.all_variants().find(|v| v.id == variant_id.get()) else {
            return Ok(None);
        };
        let Some(price) = variant.price.as_ref() else {
            return Ok(None);
        };

        Ok(Some(ProductVariant {
            product_id: ProductId::new(product.id.clone()),
            variant_id,
            name,
            price: price.value.to_money()?,
        }))
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn query_shopping_lists(
        &self,
        owner: &Principal,
    ) -> Result<Vec<ShoppingList>, BackendError> {
        let mut url = self.endpoint(&["shopping-lists"])?;
        url.query_pairs_mut()
            .append_pair("where", &Self::owner_predicate(owner))
            .append_pair("sort", "createdAt asc")
            .append_pair("limit", QUERY_LIMIT);

        let page: WirePage<WireShoppingList> =
            self.execute(Method::GET, url, None, None).await?;
        page.results
            .into_iter()
            .map(|list| list.into_shopping_list(&self.inner.language))
            .collect()
    }

    #[instrument(skip(self))]
    async fn get_shopping_list(
        &self,
        id: &ShoppingListId,
    ) -> Result<Option<ShoppingList>, BackendError> {
        let url = self.endpoint(&["shopping-lists", id.as_str()])?;
        self.fetch::<WireShoppingList>(url)
            .await?
            .map(|list| list.into_shopping_list(&self.inner.language))
            .transpose()
    }

    #[instrument(skip(self), fields(owner = %draft.owner))]
    async fn create_shopping_list(
        &self,
        draft: ShoppingListDraft,
    ) -> Result<ShoppingList, BackendError> {
        let mut body = json!({
            "name": { draft.locale.language(): draft.name },
        });
        insert_owner(&mut body, &draft.owner, true);

        let url = self.endpoint(&["shopping-lists"])?;
        let list: WireShoppingList = self.execute(Method::POST, url, Some(&body), None).await?;
        list.into_shopping_list(draft.locale.language())
    }

    #[instrument(skip(self, update), fields(list_id = %update.id(), version = %update.version()))]
    async fn update_shopping_list(
        &self,
        update: ShoppingListUpdate,
    ) -> Result<ShoppingList, BackendError> {
        let (id, version, actions) = update.into_parts();
        let language = &self.inner.language;
        let actions = actions
            .iter()
            .map(|action| shopping_list_action_json(action, language))
            .collect();
        let url = self.endpoint(&["shopping-lists", id.as_str()])?;
        let list: WireShoppingList = self.update(url, version, actions).await?;
        list.into_shopping_list(language)
    }

    #[instrument(skip(self))]
    async fn delete_shopping_list(
        &self,
        id: &ShoppingListId,
        version: Version,
    ) -> Result<(), BackendError> {
        let mut url = self.endpoint(&["shopping-lists", id.as_str()])?;
        url.query_pairs_mut()
            .append_pair("version", &version.get().to_string());
        let _: Value = self
            .execute(Method::DELETE, url, None, Some(version))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, password))]
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Customer, BackendError> {
        #[derive(Deserialize)]
        struct SignInResult {
            customer: WireCustomer,
        }

        let body = json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
        });
        let url = self.endpoint(&["login"])?;
        let result: SignInResult = self.execute(Method::POST, url, Some(&body), None).await?;
        result.customer.into_customer()
    }

    #[instrument(skip(self))]
    async fn get_customer(&self, id: &CustomerId) -> Result<Option<Customer>, BackendError> {
        let url = self.endpoint(&["customers", id.as_str()])?;
        self.fetch::<WireCustomer>(url)
            .await?
            .map(WireCustomer::into_customer)
            .transpose()
    }

    #[instrument(skip(self, update), fields(customer_id = %update.id(), version = %update.version()))]
    async fn update_customer(&self, update: CustomerUpdate) -> Result<Customer, BackendError> {
        let (id, version, actions) = update.into_parts();
        let actions = actions.iter().map(customer_action_json).collect();
        let url = self.endpoint(&["customers", id.as_str()])?;
        let customer: WireCustomer = self.update(url, version, actions).await?;
        customer.into_customer()
    }

    #[instrument(skip(self))]
    async fn query_orders(&self, customer_id: &CustomerId) -> Result<Vec<Order>, BackendError> {
        let mut url = self.endpoint(&["orders"])?;
        url.query_pairs_mut()
            .append_pair(
                "where",
                &format!("customerId=\"{}\"", escape_predicate(customer_id.as_str())),
            )
            .append_pair("sort", "createdAt desc")
            .append_pair("limit", QUERY_LIMIT);

        let page: WirePage<WireOrder> = self.execute(Method::GET, url, None, None).await?;
        let mut orders = Vec::with_capacity(page.results.len());
        for order in page.results {
            let order = order.into_order(&self.inner.language)?;
            self.inner
                .orders
                .insert(order.id.clone(), order.clone())
                .await;
            orders.push(order);
        }
        Ok(orders)
    }

    #[instrument(skip(self))]
    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>, BackendError> {
        if let Some(order) = self.inner.orders.get(id).await {
            debug!("Order cache hit");
            return Ok(Some(order));
        }

        let url = self.endpoint(&["orders", id.as_str()])?;
        let Some(order) = self.fetch::<WireOrder>(url).await? else {
            return Ok(None);
        };
        let order = order.into_order(&self.inner.language)?;
        self.inner
            .orders
            .insert(order.id.clone(), order.clone())
            .await;
        Ok(Some(order))
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let url = self.endpoint(&[])?;
        let _: Value = self.execute(Method::GET, url, None, None).await?;
        Ok(())
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetail {
    code: String,
    #[serde(default)]
    message: String,
    current_version: Option<u64>,
}

/// Classify a non-success response.
fn error_from_response(status: StatusCode, body: &str, version: Option<Version>) -> BackendError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .map_or_else(|| truncate(body), |b| b.message.clone());
    let details = parsed.map(|b| b.errors).unwrap_or_default();
    let has_code = |code: &str| details.iter().any(|d| d.code == code);

    if status == StatusCode::CONFLICT || has_code("ConcurrentModification") {
        let actual = details
            .iter()
            .find_map(|d| d.current_version)
            .map(Version::new);
        if let Some(expected) = version {
            return BackendError::Conflict { expected, actual };
        }
    }

    match status {
        StatusCode::NOT_FOUND => BackendError::NotFound(message),
        StatusCode::BAD_REQUEST if has_code("InvalidCredentials") => {
            BackendError::InvalidCredentials
        }
        StatusCode::BAD_REQUEST if has_code("ReferencedResourceNotFound") => {
            BackendError::NotFound(first_detail(&details).unwrap_or(message))
        }
        StatusCode::BAD_REQUEST => {
            BackendError::InvalidInput(first_detail(&details).unwrap_or(message))
        }
        _ => BackendError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn first_detail(details: &[ErrorDetail]) -> Option<String> {
    details
        .first()
        .map(|d| d.message.clone())
        .filter(|m| !m.is_empty())
}

fn truncate(text: &str) -> String {
    text.chars().take(200).collect()
}

fn escape_predicate(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

// =============================================================================
// Request Bodies
// =============================================================================

fn insert_owner(body: &mut Value, owner: &Principal, as_reference: bool) {
    let Some(object) = body.as_object_mut() else {
        return;
    };
    match owner {
        Principal::Customer { customer_id } if as_reference => {
            object.insert(
                "customer".to_string(),
                json!({ "typeId": "customer", "id": customer_id.as_str() }),
            );
        }
        Principal::Customer { customer_id } => {
            object.insert("customerId".to_string(), json!(customer_id.as_str()));
        }
        Principal::Anonymous { session_id } => {
            object.insert("anonymousId".to_string(), json!(session_id.as_str()));
        }
    }
}

fn cart_action_json(action: &CartAction) -> Value {
    match action {
        CartAction::AddLineItem {
            product_id,
            variant_id,
            quantity,
        } => json!({
            "action": "addLineItem",
            "productId": product_id.as_str(),
            "variantId": variant_id.get(),
            "quantity": quantity,
        }),
        CartAction::ChangeLineItemQuantity {
            line_item_id,
            quantity,
        } => json!({
            "action": "changeLineItemQuantity",
            "lineItemId": line_item_id.as_str(),
            "quantity": quantity,
        }),
        CartAction::RemoveLineItem { line_item_id } => json!({
            "action": "removeLineItem",
            "lineItemId": line_item_id.as_str(),
        }),
    }
}

fn shopping_list_action_json(action: &ShoppingListAction, language: &str) -> Value {
    match action {
        ShoppingListAction::AddLineItem {
            product_id,
            variant_id,
            quantity,
        } => json!({
            "action": "addLineItem",
            "productId": product_id.as_str(),
            "variantId": variant_id.get(),
            "quantity": quantity,
        }),
        ShoppingListAction::ChangeLineItemQuantity {
            line_item_id,
            quantity,
        } => json!({
            "action": "changeLineItemQuantity",
            "lineItemId": line_item_id.as_str(),
            "quantity": quantity,
        }),
        ShoppingListAction::RemoveLineItem { line_item_id } => json!({
            "action": "removeLineItem",
            "lineItemId": line_item_id.as_str(),
        }),
        ShoppingListAction::ChangeName { name } => json!({
            "action": "changeName",
            "name": { language: name },
        }),
    }
}

fn customer_action_json(action: &CustomerAction) -> Value {
    match action {
        CustomerAction::SetFirstName(name) => json!({
            "action": "setFirstName",
            "firstName": name,
        }),
        CustomerAction::SetLastName(name) => json!({
            "action": "setLastName",
            "lastName": name,
        }),
        CustomerAction::ChangeEmail(email) => json!({
            "action": "changeEmail",
            "email": email.as_str(),
        }),
        CustomerAction::ChangeAddress {
            address_id,
            address,
        } => json!({
            "action": "changeAddress",
            "addressId": address_id.as_str(),
            "address": {
                "firstName": address.first_name,
                "lastName": address.last_name,
                "streetName": address.street_name,
                "streetNumber": address.street_number,
                "postalCode": address.postal_code,
                "city": address.city,
                "country": address.country,
            },
        }),
    }
}

// =============================================================================
// Wire Types
// =============================================================================

type LocalizedString = BTreeMap<String, String>;

/// Pick the value for `language`, then any regional variant of it, then
/// whatever comes first.
fn localized(value: &LocalizedString, language: &str) -> String {
    value
        .get(language)
        .or_else(|| {
            value
                .iter()
                .find(|(tag, _)| {
                    tag.split(['-', '_'])
                        .next()
                        .is_some_and(|lang| lang.eq_ignore_ascii_case(language))
                })
                .map(|(_, text)| text)
        })
        .or_else(|| value.values().next())
        .cloned()
        .unwrap_or_default()
}

fn owner_from(
    customer_id: Option<String>,
    anonymous_id: Option<String>,
    entity: &str,
) -> Result<Principal, BackendError> {
    match (customer_id, anonymous_id) {
        (Some(customer_id), _) => Ok(Principal::customer(customer_id)),
        (None, Some(anonymous_id)) => Ok(Principal::anonymous(anonymous_id)),
        (None, None) => Err(BackendError::Unexpected(format!("{entity} has no owner"))),
    }
}

fn variant_id(id: u32) -> Result<VariantId, BackendError> {
    VariantId::new(id).map_err(|e| BackendError::Unexpected(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct WirePage<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMoney {
    currency_code: String,
    cent_amount: i64,
}

impl WireMoney {
    fn to_money(&self) -> Result<Money, BackendError> {
        let currency = CurrencyCode::parse(&self.currency_code)
            .map_err(|e| BackendError::Unexpected(e.to_string()))?;
        Ok(Money::from_cents(self.cent_amount, currency))
    }
}

#[derive(Debug, Deserialize)]
struct WirePrice {
    value: WireMoney,
}

#[derive(Debug, Deserialize)]
struct WireVariant {
    id: u32,
    price: Option<WirePrice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProduct {
    id: String,
    name: LocalizedString,
    master_variant: WireVariant,
    #[serde(default)]
    variants: Vec<WireVariant>,
}

impl WireProduct {
    fn all_variants(&self) -> impl Iterator<Item = &WireVariant> {
        std::iter::once(&self.master_variant).chain(&self.variants)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLineItem {
    id: String,
    product_id: String,
    #[serde(default)]
    name: LocalizedString,
    quantity: u32,
    /// Present on cart and order line items.
    variant: Option<WireLineVariant>,
    /// Present on shopping list line items.
    variant_id: Option<u32>,
    price: Option<WirePrice>,
}

#[derive(Debug, Deserialize)]
struct WireLineVariant {
    id: u32,
}

impl WireLineItem {
    fn into_line_item(self, language: &str) -> Result<LineItem, BackendError> {
        let raw_variant = self
            .variant
            .map(|v| v.id)
            .or(self.variant_id)
            .ok_or_else(|| BackendError::Unexpected(format!("line item {} has no variant", self.id)))?;
        let price = self.price.map(|p| p.value.to_money()).transpose()?;
        Ok(LineItem {
            id: LineItemId::new(self.id),
            product_id: ProductId::new(self.product_id),
            variant_id: variant_id(raw_variant)?,
            name: localized(&self.name, language),
            quantity: self.quantity,
            price,
        })
    }
}

fn line_items(items: Vec<WireLineItem>, language: &str) -> Result<Vec<LineItem>, BackendError> {
    items
        .into_iter()
        .map(|item| item.into_line_item(language))
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCart {
    id: String,
    version: u64,
    customer_id: Option<String>,
    anonymous_id: Option<String>,
    locale: Option<String>,
    country: Option<String>,
    total_price: WireMoney,
    #[serde(default)]
    line_items: Vec<WireLineItem>,
}

impl WireCart {
    fn into_cart(self) -> Result<Cart, BackendError> {
        let owner = owner_from(self.customer_id, self.anonymous_id, "cart")?;
        let locale = self.locale.as_deref().and_then(|tag| Locale::parse(tag).ok());
        let language = locale.as_ref().map_or("en", Locale::language).to_string();
        let currency = self.total_price.to_money()?.currency;

        Ok(Cart {
            id: CartId::new(self.id),
            version: Version::new(self.version),
            owner,
            locale,
            currency,
            country: self.country,
            line_items: line_items(self.line_items, &language)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireReference {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireShoppingList {
    id: String,
    version: u64,
    customer: Option<WireReference>,
    anonymous_id: Option<String>,
    #[serde(default)]
    name: LocalizedString,
    #[serde(default)]
    line_items: Vec<WireLineItem>,
    created_at: DateTime<Utc>,
}

impl WireShoppingList {
    fn into_shopping_list(self, language: &str) -> Result<ShoppingList, BackendError> {
        let owner = owner_from(
            self.customer.map(|c| c.id),
            self.anonymous_id,
            "shopping list",
        )?;
        Ok(ShoppingList {
            id: ShoppingListId::new(self.id),
            version: Version::new(self.version),
            owner,
            name: localized(&self.name, language),
            line_items: line_items(self.line_items, language)?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAddress {
    id: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    street_name: Option<String>,
    street_number: Option<String>,
    postal_code: Option<String>,
    city: Option<String>,
    country: String,
}

impl From<WireAddress> for Address {
    fn from(wire: WireAddress) -> Self {
        Self {
            id: wire.id.map(AddressId::new),
            first_name: wire.first_name,
            last_name: wire.last_name,
            street_name: wire.street_name,
            street_number: wire.street_number,
            postal_code: wire.postal_code,
            city: wire.city,
            country: wire.country,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCustomer {
    id: String,
    version: u64,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    #[serde(default)]
    addresses: Vec<WireAddress>,
}

impl WireCustomer {
    fn into_customer(self) -> Result<Customer, BackendError> {
        let email =
            Email::parse(&self.email).map_err(|e| BackendError::Unexpected(e.to_string()))?;
        Ok(Customer {
            id: CustomerId::new(self.id),
            version: Version::new(self.version),
            email,
            first_name: self.first_name,
            last_name: self.last_name,
            addresses: self.addresses.into_iter().map(Address::from).collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOrder {
    id: String,
    order_number: Option<String>,
    customer_id: Option<String>,
    #[serde(default)]
    line_items: Vec<WireLineItem>,
    total_price: WireMoney,
    created_at: DateTime<Utc>,
}

impl WireOrder {
    fn into_order(self, language: &str) -> Result<Order, BackendError> {
        Ok(Order {
            id: OrderId::new(self.id),
            order_number: self.order_number,
            customer_id: self.customer_id.map(CustomerId::new),
            line_items: line_items(self.line_items, language)?,
            total: self.total_price.to_money()?,
            created_at: self.created_at,
        })
    }
}
