//! Session-scoped cart service.
//!
//! The session remembers one cart id per visitor. Reading the cart creates it
//! on first use; changing it always starts from the latest version and is
//! retried once when another request changed the cart in between.

use std::sync::Arc;

use tower_sessions::Session;
use tracing::{debug, instrument, warn};

use basket_core::{CartId, CurrencyCode, LineItemId, Locale, Principal, ProductId, VariantId};

use crate::backend::{Cart, CartAction, CartDraft, CartUpdate, CommerceBackend};
use crate::config::Markets;
use crate::models::session_keys;
use crate::services::{ServiceError, ensure_quantity_limit, retry_once_on_conflict};

/// A validated add-to-cart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLineItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    /// Must be at least 1.
    pub quantity: u32,
    /// Currency the variant must be priced in.
    pub currency: CurrencyCode,
    /// Country the price is selected for.
    pub country: String,
}

/// Cart resolution and mutation.
#[derive(Clone)]
pub struct CartManager {
    backend: Arc<dyn CommerceBackend>,
    markets: Markets,
}

impl CartManager {
    #[must_use]
    pub fn new(backend: Arc<dyn CommerceBackend>, markets: Markets) -> Self {
        Self { backend, markets }
    }

    /// Currency and country line items of `cart` are priced in.
    ///
    /// A cart keeps the market it was created for; `locale` only fills in a
    /// missing country.
    #[must_use]
    pub fn market_of(&self, cart: &Cart, locale: &Locale) -> (CurrencyCode, String) {
        let country = cart
            .country
            .clone()
            .unwrap_or_else(|| self.markets.resolve(locale).1);
        (cart.currency, country)
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// The cart `cart_id` refers to, or a new cart for `principal`.
    ///
    /// A new cart is created when `cart_id` is `None` or the cart no longer
    /// exists; its id is written to the session.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Forbidden`] if the cart belongs to another
    /// principal. Ownership is never reassigned.
    #[instrument(skip(self, session, locale), fields(principal = %principal))]
    pub async fn get_cart(
        &self,
        session: &Session,
        locale: &Locale,
        cart_id: Option<&CartId>,
        principal: &Principal,
    ) -> Result<Cart, ServiceError> {
        if let Some(cart_id) = cart_id {
            match self.backend.get_cart(cart_id).await? {
                Some(cart) if cart.owner == *principal => return Ok(cart),
                Some(cart) => {
                    warn!(cart_id = %cart.id, owner = %cart.owner, "Cart owned by another principal");
                    return Err(ServiceError::Forbidden(format!("cart {cart_id}")));
                }
                None => debug!(%cart_id, "Session cart no longer exists"),
            }
        }

        let (currency, country) = self.markets.resolve(locale);
        let cart = self
            .backend
            .create_cart(CartDraft {
                owner: principal.clone(),
                locale: locale.clone(),
                currency,
                country,
            })
            .await?;
        store_cart_id(session, &cart.id).await?;
        debug!(cart_id = %cart.id, "Created cart for session");

        Ok(cart)
    }

    /// The session's cart, created on first use.
    ///
    /// # Errors
    ///
    /// See [`Self::get_cart`].
    pub async fn current_cart(
        &self,
        session: &Session,
        locale: &Locale,
        principal: &Principal,
    ) -> Result<Cart, ServiceError> {
        let cart_id = session_cart_id(session).await?;
        self.get_cart(session, locale, cart_id.as_ref(), principal)
            .await
    }

    /// The session's cart if it exists and belongs to `principal`. Never
    /// creates a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the session or backend fails.
    pub async fn peek_cart(
        &self,
        session: &Session,
        principal: &Principal,
    ) -> Result<Option<Cart>, ServiceError> {
        let Some(cart_id) = session_cart_id(session).await? else {
            return Ok(None);
        };
        Ok(self
            .backend
            .get_cart(&cart_id)
            .await?
            .filter(|cart| cart.owner == *principal))
    }

    /// The session's existing cart, for operations that need one.
    async fn existing_cart(
        &self,
        session: &Session,
        principal: &Principal,
    ) -> Result<Cart, ServiceError> {
        let cart_id = session_cart_id(session)
            .await?
            .ok_or_else(|| ServiceError::NotFound("cart".to_string()))?;
        let cart = self
            .backend
            .get_cart(&cart_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("cart {cart_id}")))?;
        if cart.owner != *principal {
            return Err(ServiceError::Forbidden(format!("cart {cart_id}")));
        }
        Ok(cart)
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Add units of a product variant to the session's cart.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if the quantity is zero, the line would
    ///   exceed [`MAX_QUANTITY`](crate::backend::MAX_QUANTITY) or the cart
    ///   is priced in another currency
    /// - [`ServiceError::NotFound`] if the variant is not sold in the
    ///   requested currency/country
    /// - [`ServiceError::Conflict`] if the cart changed twice concurrently
    #[instrument(
        skip(self, session, locale, input),
        fields(principal = %principal, product_id = %input.product_id, variant_id = %input.variant_id)
    )]
    pub async fn add_line_item(
        &self,
        session: &Session,
        locale: &Locale,
        principal: &Principal,
        input: &AddLineItem,
    ) -> Result<Cart, ServiceError> {
        if input.quantity == 0 {
            return Err(ServiceError::invalid("quantity", "must be at least 1"));
        }
        ensure_quantity_limit(input.quantity)?;

        self.backend
            .find_variant(
                &input.product_id,
                input.variant_id,
                input.currency,
                &input.country,
            )
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "product {} variant {}",
                    input.product_id, input.variant_id
                ))
            })?;

        retry_once_on_conflict(|| async move {
            let cart = self.current_cart(session, locale, principal).await?;
            if cart.currency != input.currency {
                return Err(ServiceError::invalid(
                    "currency",
                    format!("Your cart is priced in {}", cart.currency),
                ));
            }
            let merged = cart
                .line_items
                .iter()
                .find(|item| item.is_variant(&input.product_id, input.variant_id))
                .map_or(0, |item| item.quantity);
            ensure_quantity_limit(merged.saturating_add(input.quantity))?;

            let update = CartUpdate::new(cart.id, cart.version).with(CartAction::AddLineItem {
                product_id: input.product_id.clone(),
                variant_id: input.variant_id,
                quantity: input.quantity,
            });
            Ok(self.backend.update_cart(update).await?)
        })
        .await
    }

    /// Set the quantity of a line item. A quantity of zero removes it.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if the quantity exceeds
    ///   [`MAX_QUANTITY`](crate::backend::MAX_QUANTITY)
    /// - [`ServiceError::NotFound`] if the session has no cart or the cart
    ///   has no such line item
    #[instrument(skip(self, session), fields(principal = %principal))]
    pub async fn change_line_item_quantity(
        &self,
        session: &Session,
        principal: &Principal,
        line_item_id: &LineItemId,
        quantity: u32,
    ) -> Result<Cart, ServiceError> {
        ensure_quantity_limit(quantity)?;
        retry_once_on_conflict(|| async move {
            let cart = self.existing_cart(session, principal).await?;
            ensure_line_item(&cart, line_item_id)?;

            let action = if quantity == 0 {
                CartAction::RemoveLineItem {
                    line_item_id: line_item_id.clone(),
                }
            } else {
                CartAction::ChangeLineItemQuantity {
                    line_item_id: line_item_id.clone(),
                    quantity,
                }
            };
            let update = CartUpdate::new(cart.id, cart.version).with(action);
            Ok(self.backend.update_cart(update).await?)
        })
        .await
    }

    /// Remove a line item.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if the line item is absent, so
    /// removing the same item twice fails the second time.
    #[instrument(skip(self, session), fields(principal = %principal))]
    pub async fn delete_line_item(
        &self,
        session: &Session,
        principal: &Principal,
        line_item_id: &LineItemId,
    ) -> Result<Cart, ServiceError> {
        retry_once_on_conflict(|| async move {
            let cart = self.existing_cart(session, principal).await?;
            ensure_line_item(&cart, line_item_id)?;

            let update = CartUpdate::new(cart.id, cart.version).with(CartAction::RemoveLineItem {
                line_item_id: line_item_id.clone(),
            });
            Ok(self.backend.update_cart(update).await?)
        })
        .await
    }

    /// Drop the session's cart reference. The cart itself is left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn forget_cart(&self, session: &Session) -> Result<(), ServiceError> {
        session.remove::<CartId>(session_keys::CART_ID).await?;
        Ok(())
    }
}

fn ensure_line_item(cart: &Cart, line_item_id: &LineItemId) -> Result<(), ServiceError> {
    if cart.line_item(line_item_id).is_none() {
        return Err(ServiceError::NotFound(format!("line item {line_item_id}")));
    }
    Ok(())
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the cart id from the session.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn session_cart_id(session: &Session) -> Result<Option<CartId>, ServiceError> {
    Ok(session.get::<CartId>(session_keys::CART_ID).await?)
}

/// Set the cart id in the session.
async fn store_cart_id(session: &Session, cart_id: &CartId) -> Result<(), ServiceError> {
    session.insert(session_keys::CART_ID, cart_id).await?;
    Ok(())
}
