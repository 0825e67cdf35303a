//! Domain types returned by the commerce backend.
//!
//! These are the storefront's own view of carts, shopping lists, customers
//! and orders, independent of the wire format of any particular backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use basket_core::{
    AddressId, CartId, CurrencyCode, CustomerId, Email, LineItemId, Locale, Money, OrderId,
    Principal, ProductId, ShoppingListId, VariantId, Version,
};

// =============================================================================
// Line Items
// =============================================================================

/// Largest quantity a single line item may hold.
pub const MAX_QUANTITY: u32 = 999;

/// A product-variant-quantity entry inside a cart, shopping list or order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Id unique within the parent entity only.
    pub id: LineItemId,
    /// Referenced product.
    pub product_id: ProductId,
    /// Referenced variant of the product.
    pub variant_id: VariantId,
    /// Product name in the entity's language.
    pub name: String,
    /// Always positive; a zero quantity removes the item.
    pub quantity: u32,
    /// Unit price. Carts and orders carry one, shopping lists do not.
    pub price: Option<Money>,
}

impl LineItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn total(&self) -> Option<Money> {
        self.price.map(|price| price.times(self.quantity))
    }

    /// Whether this item refers to the given product variant.
    #[must_use]
    pub fn is_variant(&self, product_id: &ProductId, variant_id: VariantId) -> bool {
        self.product_id == *product_id && self.variant_id == variant_id
    }
}

fn find_line_item<'a>(items: &'a [LineItem], id: &LineItemId) -> Option<&'a LineItem> {
    items.iter().find(|item| item.id == *id)
}

fn sum_quantities(items: &[LineItem]) -> u32 {
    items
        .iter()
        .fold(0, |total, item| total.saturating_add(item.quantity))
}

// =============================================================================
// Cart
// =============================================================================

/// A shopping cart owned by exactly one principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Opaque cart id.
    pub id: CartId,
    /// Optimistic concurrency token.
    pub version: Version,
    /// Anonymous session or customer that owns the cart.
    pub owner: Principal,
    /// Locale the cart was created for.
    pub locale: Option<Locale>,
    /// Currency all line items are priced in.
    pub currency: CurrencyCode,
    /// Shipping country (ISO 3166-1 alpha-2).
    pub country: Option<String>,
    /// Line items in insertion order.
    pub line_items: Vec<LineItem>,
}

impl Cart {
    /// Look up a line item by id.
    #[must_use]
    pub fn line_item(&self, id: &LineItemId) -> Option<&LineItem> {
        find_line_item(&self.line_items, id)
    }

    /// Total number of units across all line items.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        sum_quantities(&self.line_items)
    }

    /// Sum of all line totals in the cart currency.
    #[must_use]
    pub fn total_price(&self) -> Money {
        self.line_items
            .iter()
            .filter_map(LineItem::total)
            .filter(|total| total.currency == self.currency)
            .fold(Money::zero(self.currency), |acc, total| {
                acc.checked_add(&total).unwrap_or(acc)
            })
    }

    /// Whether the cart has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }
}

/// Data needed to create a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartDraft {
    /// Future owner of the cart.
    pub owner: Principal,
    /// Locale for product names.
    pub locale: Locale,
    /// Pricing currency.
    pub currency: CurrencyCode,
    /// Pricing/shipping country.
    pub country: String,
}

// =============================================================================
// Shopping List
// =============================================================================

/// A named shopping list owned by exactly one principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingList {
    /// Opaque list id.
    pub id: ShoppingListId,
    /// Optimistic concurrency token.
    pub version: Version,
    /// Anonymous session or customer that owns the list.
    pub owner: Principal,
    /// Human-readable name, used as display key.
    pub name: String,
    /// Line items in insertion order.
    pub line_items: Vec<LineItem>,
    /// Creation time; lists are listed in creation order.
    pub created_at: DateTime<Utc>,
}

impl ShoppingList {
    /// Look up a line item by id.
    #[must_use]
    pub fn line_item(&self, id: &LineItemId) -> Option<&LineItem> {
        find_line_item(&self.line_items, id)
    }

    /// Total number of units across all line items.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        sum_quantities(&self.line_items)
    }
}

/// Data needed to create a shopping list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListDraft {
    /// Future owner of the list.
    pub owner: Principal,
    /// Non-empty display name.
    pub name: String,
    /// Locale the name is written in.
    pub locale: Locale,
}

// =============================================================================
// Product
// =============================================================================

/// A sellable product variant priced for a currency/country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    /// Owning product.
    pub product_id: ProductId,
    /// Variant number within the product.
    pub variant_id: VariantId,
    /// Product name.
    pub name: String,
    /// Selected price for the requested currency/country.
    pub price: Money,
}

// =============================================================================
// Customer
// =============================================================================

/// A postal address in a customer's address book.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    /// Address id, assigned by the backend.
    pub id: Option<AddressId>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub street_name: Option<String>,
    pub street_number: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
}

/// A registered customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub version: Version,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub addresses: Vec<Address>,
}

impl Customer {
    /// Full name, or the email when no name is set.
    #[must_use]
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            self.email.to_string()
        } else {
            parts.join(" ")
        }
    }

    /// Look up an address by id.
    #[must_use]
    pub fn address(&self, id: &AddressId) -> Option<&Address> {
        self.addresses
            .iter()
            .find(|address| address.id.as_ref() == Some(id))
    }
}

// =============================================================================
// Order
// =============================================================================

/// A placed order. Read-only for the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-facing order number, if assigned.
    pub order_number: Option<String>,
    /// Customer that placed the order; `None` for guest checkouts.
    pub customer_id: Option<CustomerId>,
    pub line_items: Vec<LineItem>,
    pub total: Money,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Total number of units ordered.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        sum_quantities(&self.line_items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: &str, quantity: u32, cents: Option<i64>) -> LineItem {
        LineItem {
            id: LineItemId::new(id),
            product_id: ProductId::new("P1"),
            variant_id: VariantId::new(1).unwrap(),
            name: "Socks".to_string(),
            quantity,
            price: cents.map(|c| Money::from_cents(c, CurrencyCode::EUR)),
        }
    }

    #[test]
    fn test_cart_totals() {
        let cart = Cart {
            id: CartId::new("c1"),
            version: Version::INITIAL,
            owner: Principal::anonymous("s1"),
            locale: None,
            currency: CurrencyCode::EUR,
            country: Some("DE".to_string()),
            line_items: vec![item("a", 2, Some(500)), item("b", 1, Some(250))],
        };

        assert_eq!(cart.total_quantity(), 3);
        assert_eq!(cart.total_price().cents(), 1250);
        assert!(cart.line_item(&LineItemId::new("b")).is_some());
        assert!(cart.line_item(&LineItemId::new("zzz")).is_none());
    }

    #[test]
    fn test_total_quantity_saturates() {
        let order = Order {
            id: OrderId::new("o1"),
            order_number: None,
            customer_id: None,
            line_items: vec![item("a", u32::MAX, Some(100)), item("b", 1, Some(100))],
            total: Money::from_cents(100, CurrencyCode::EUR),
            created_at: Utc::now(),
        };
        assert_eq!(order.total_quantity(), u32::MAX);
    }

    #[test]
    fn test_line_item_without_price_has_no_total() {
        assert!(item("a", 3, None).total().is_none());
    }

    #[test]
    fn test_customer_display_name() {
        let mut customer = Customer {
            id: CustomerId::new("c"),
            version: Version::INITIAL,
            email: Email::parse("jo@example.com").unwrap(),
            first_name: Some("Jo".to_string()),
            last_name: None,
            addresses: vec![],
        };
        assert_eq!(customer.display_name(), "Jo");

        customer.first_name = None;
        assert_eq!(customer.display_name(), "jo@example.com");
    }
}
