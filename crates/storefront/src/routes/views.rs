//! Display data for templates.
//!
//! Templates only see preformatted strings and plain numbers; nothing in a
//! template reaches into backend types.

use std::collections::BTreeMap;

use axum::{extract::FromRequestParts, http::request::Parts};

use basket_core::ShoppingListId;

use crate::backend::{Address, Cart, Customer, LineItem, Order, ShoppingList};
use crate::middleware::{Flashes, OptionalAuth};

// =============================================================================
// Layout
// =============================================================================

/// A flash message ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashView {
    pub level: &'static str,
    pub text: String,
}

/// Data every page layout needs.
///
/// As an extractor it consumes pending flash messages, so only extract it in
/// handlers that render a page.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    /// Email of the signed-in customer.
    pub customer_email: Option<String>,
    pub flashes: Vec<FlashView>,
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let OptionalAuth(customer) = OptionalAuth::from_request_parts(parts, state).await?;
        let Flashes(messages) = Flashes::from_request_parts(parts, state).await?;

        Ok(Self {
            customer_email: customer.map(|c| c.email.to_string()),
            flashes: messages
                .into_iter()
                .map(|m| FlashView {
                    level: m.level.as_str(),
                    text: m.text,
                })
                .collect(),
        })
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// Line item display data.
#[derive(Debug, Clone)]
pub struct LineItemView {
    pub id: String,
    pub product_id: String,
    pub variant_id: u32,
    pub name: String,
    pub quantity: u32,
    /// Empty for unpriced items (shopping lists).
    pub unit_price: String,
    pub total: String,
}

impl From<&LineItem> for LineItemView {
    fn from(item: &LineItem) -> Self {
        Self {
            id: item.id.to_string(),
            product_id: item.product_id.to_string(),
            variant_id: item.variant_id.get(),
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.price.map(|p| p.to_string()).unwrap_or_default(),
            total: item.total().map(|t| t.to_string()).unwrap_or_default(),
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Cart display data.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<LineItemView>,
    pub total: String,
    pub item_count: u32,
    pub currency: &'static str,
    pub country: String,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.line_items.iter().map(LineItemView::from).collect(),
            total: cart.total_price().to_string(),
            item_count: cart.total_quantity(),
            currency: cart.currency.code(),
            country: cart.country.clone().unwrap_or_default(),
        }
    }
}

/// An entry of the "save to list" picker.
#[derive(Debug, Clone)]
pub struct ListOption {
    pub id: String,
    pub name: String,
}

/// Picker entries from a name index, sorted by name.
#[must_use]
pub fn list_options(index: BTreeMap<String, ShoppingListId>) -> Vec<ListOption> {
    index
        .into_iter()
        .map(|(name, id)| ListOption {
            id: id.to_string(),
            name,
        })
        .collect()
}

// =============================================================================
// Shopping Lists
// =============================================================================

/// Shopping list display data.
#[derive(Debug, Clone)]
pub struct ShoppingListView {
    pub id: String,
    pub name: String,
    pub items: Vec<LineItemView>,
    pub item_count: u32,
    pub created: String,
}

impl From<&ShoppingList> for ShoppingListView {
    fn from(list: &ShoppingList) -> Self {
        Self {
            id: list.id.to_string(),
            name: list.name.clone(),
            items: list.line_items.iter().map(LineItemView::from).collect(),
            item_count: list.total_quantity(),
            created: list.created_at.format("%Y-%m-%d").to_string(),
        }
    }
}

// =============================================================================
// Account
// =============================================================================

/// Address display data.
#[derive(Debug, Clone)]
pub struct AddressView {
    pub id: String,
    pub name: String,
    pub street: String,
    pub city: String,
    pub country: String,
}

impl From<&Address> for AddressView {
    fn from(address: &Address) -> Self {
        let join = |parts: [Option<&str>; 2]| {
            parts
                .into_iter()
                .flatten()
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        };
        Self {
            id: address
                .id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            name: join([address.first_name.as_deref(), address.last_name.as_deref()]),
            street: join([
                address.street_name.as_deref(),
                address.street_number.as_deref(),
            ]),
            city: join([address.postal_code.as_deref(), address.city.as_deref()]),
            country: address.country.clone(),
        }
    }
}

/// Customer display data.
#[derive(Debug, Clone)]
pub struct CustomerView {
    pub display_name: String,
    pub email: String,
    pub address_count: usize,
}

impl From<&Customer> for CustomerView {
    fn from(customer: &Customer) -> Self {
        Self {
            display_name: customer.display_name(),
            email: customer.email.to_string(),
            address_count: customer.addresses.len(),
        }
    }
}

/// Order display data.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: String,
    pub number: String,
    pub placed: String,
    pub total: String,
    pub item_count: u32,
    pub items: Vec<LineItemView>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            number: order
                .order_number
                .clone()
                .unwrap_or_else(|| order.id.to_string()),
            placed: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
            total: order.total.to_string(),
            item_count: order.total_quantity(),
            items: order.line_items.iter().map(LineItemView::from).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use basket_core::{AddressId, CurrencyCode, LineItemId, Money, ProductId, VariantId};

    use super::*;

    #[test]
    fn test_line_item_view_formats_prices() {
        let item = LineItem {
            id: LineItemId::new("li-1"),
            product_id: ProductId::new("P1"),
            variant_id: VariantId::new(2).unwrap(),
            name: "Merino Socks".to_string(),
            quantity: 3,
            price: Some(Money::from_cents(1299, CurrencyCode::EUR)),
        };
        let view = LineItemView::from(&item);
        assert_eq!(view.unit_price, "€12.99");
        assert_eq!(view.total, "€38.97");
        assert_eq!(view.variant_id, 2);

        let unpriced = LineItem { price: None, ..item };
        assert_eq!(LineItemView::from(&unpriced).total, "");
    }

    #[test]
    fn test_address_view_skips_missing_parts() {
        let address = Address {
            id: Some(AddressId::new("a1")),
            last_name: Some("Doe".to_string()),
            street_name: Some("Hauptstraße".to_string()),
            street_number: Some("5".to_string()),
            city: Some("Berlin".to_string()),
            country: "DE".to_string(),
            ..Address::default()
        };
        let view = AddressView::from(&address);
        assert_eq!(view.name, "Doe");
        assert_eq!(view.street, "Hauptstraße 5");
        assert_eq!(view.city, "Berlin");
    }
}
