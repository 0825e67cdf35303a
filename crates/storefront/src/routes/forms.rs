//! Form payloads and their typed counterparts.
//!
//! Every form arrives as raw strings and is converted exactly once, here,
//! into a typed input. Conversion collects one message per bad field.

use secrecy::SecretString;
use serde::Deserialize;

use basket_core::{AddressId, Email, LineItemId, ProductId, ShoppingListId, VariantId};

use crate::backend::{Address, MAX_QUANTITY};
use crate::services::{CustomerDetails, ValidationErrors};

// =============================================================================
// Field Parsers
// =============================================================================

fn required<'a>(errors: &mut ValidationErrors, field: &'static str, raw: &'a str) -> Option<&'a str> {
    let value = raw.trim();
    if value.is_empty() {
        errors.add(field, "This field is required");
        None
    } else {
        Some(value)
    }
}

fn optional(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_variant_id(errors: &mut ValidationErrors, raw: &str) -> Option<VariantId> {
    let raw = required(errors, "variant_id", raw)?;
    VariantId::parse(raw)
        .inspect_err(|_| errors.add("variant_id", "Variant must be a positive number"))
        .ok()
}

/// Parse a quantity. `None` when the field was omitted and there is no
/// default.
fn parse_quantity(
    errors: &mut ValidationErrors,
    raw: Option<&str>,
    default: Option<u32>,
    allow_zero: bool,
) -> Option<u32> {
    let raw = raw.map(str::trim).filter(|v| !v.is_empty());
    let Some(raw) = raw else {
        if default.is_none() {
            errors.add("quantity", "This field is required");
        }
        return default;
    };

    match raw.parse::<u32>() {
        Ok(0) if !allow_zero => {
            errors.add("quantity", "Quantity must be at least 1");
            None
        }
        Ok(quantity) if quantity > MAX_QUANTITY => {
            errors.add(
                "quantity",
                format!("Quantity must be at most {MAX_QUANTITY}"),
            );
            None
        }
        Ok(quantity) => Some(quantity),
        Err(_) => {
            errors.add("quantity", "Quantity must be a whole number");
            None
        }
    }
}

/// Turn collected errors or parsed parts into a result.
macro_rules! finish {
    ($errors:ident, $($field:ident),+ => $build:expr) => {
        match ($($field,)+) {
            ($(Some($field),)+) if $errors.is_empty() => Ok($build),
            _ => Err($errors),
        }
    };
}

// =============================================================================
// Cart
// =============================================================================

/// `POST /cart/add`
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub variant_id: String,
    pub quantity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddToCartInput {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
}

impl AddToCartForm {
    /// # Errors
    ///
    /// Returns the field errors if any field is invalid.
    pub fn validate(&self) -> Result<AddToCartInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let product_id = required(&mut errors, "product_id", &self.product_id).map(ProductId::new);
        let variant_id = parse_variant_id(&mut errors, &self.variant_id);
        let quantity = parse_quantity(&mut errors, self.quantity.as_deref(), Some(1), false);

        finish!(errors, product_id, variant_id, quantity => AddToCartInput {
            product_id,
            variant_id,
            quantity,
        })
    }
}

/// `POST /cart/update`
#[derive(Debug, Deserialize)]
pub struct LineQuantityForm {
    pub line_item_id: String,
    pub quantity: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineQuantityInput {
    pub line_item_id: LineItemId,
    /// Zero removes the line.
    pub quantity: u32,
}

impl LineQuantityForm {
    /// # Errors
    ///
    /// Returns the field errors if any field is invalid.
    pub fn validate(&self) -> Result<LineQuantityInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let line_item_id =
            required(&mut errors, "line_item_id", &self.line_item_id).map(LineItemId::new);
        let quantity = parse_quantity(&mut errors, Some(&self.quantity), None, true);

        finish!(errors, line_item_id, quantity => LineQuantityInput {
            line_item_id,
            quantity,
        })
    }
}

/// `POST /cart/remove`
#[derive(Debug, Deserialize)]
pub struct RemoveLineForm {
    pub line_item_id: String,
}

impl RemoveLineForm {
    /// # Errors
    ///
    /// Returns the field errors if the id is blank.
    pub fn validate(&self) -> Result<LineItemId, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let line_item_id =
            required(&mut errors, "line_item_id", &self.line_item_id).map(LineItemId::new);
        finish!(errors, line_item_id => line_item_id)
    }
}

// =============================================================================
// Shopping Lists
// =============================================================================

/// `POST /shopping-lists` and `POST /shopping-lists/{id}/rename`
#[derive(Debug, Deserialize)]
pub struct ListNameForm {
    pub name: String,
}

/// `POST /shopping-lists/add`
#[derive(Debug, Deserialize)]
pub struct ShoppingListLineForm {
    pub list_id: String,
    pub product_id: String,
    pub variant_id: String,
    pub quantity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListLineInput {
    pub list_id: ShoppingListId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
}

impl ShoppingListLineForm {
    /// # Errors
    ///
    /// Returns the field errors if any field is invalid.
    pub fn validate(&self) -> Result<ShoppingListLineInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let list_id = required(&mut errors, "list_id", &self.list_id).map(ShoppingListId::new);
        let product_id = required(&mut errors, "product_id", &self.product_id).map(ProductId::new);
        let variant_id = parse_variant_id(&mut errors, &self.variant_id);
        let quantity = parse_quantity(&mut errors, self.quantity.as_deref(), Some(1), false);

        finish!(errors, list_id, product_id, variant_id, quantity => ShoppingListLineInput {
            list_id,
            product_id,
            variant_id,
            quantity,
        })
    }
}

/// `POST /shopping-lists/update`
#[derive(Debug, Deserialize)]
pub struct ShoppingListQuantityForm {
    pub list_id: String,
    pub line_item_id: String,
    pub quantity: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListQuantityInput {
    pub list_id: ShoppingListId,
    pub line_item_id: LineItemId,
    pub quantity: u32,
}

impl ShoppingListQuantityForm {
    /// # Errors
    ///
    /// Returns the field errors if any field is invalid.
    pub fn validate(&self) -> Result<ShoppingListQuantityInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let list_id = required(&mut errors, "list_id", &self.list_id).map(ShoppingListId::new);
        let line_item_id =
            required(&mut errors, "line_item_id", &self.line_item_id).map(LineItemId::new);
        let quantity = parse_quantity(&mut errors, Some(&self.quantity), None, true);

        finish!(errors, list_id, line_item_id, quantity => ShoppingListQuantityInput {
            list_id,
            line_item_id,
            quantity,
        })
    }
}

/// `POST /shopping-lists/remove`
#[derive(Debug, Deserialize)]
pub struct ShoppingListRemoveForm {
    pub list_id: String,
    pub line_item_id: String,
}

impl ShoppingListRemoveForm {
    /// # Errors
    ///
    /// Returns the field errors if any id is blank.
    pub fn validate(&self) -> Result<(ShoppingListId, LineItemId), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let list_id = required(&mut errors, "list_id", &self.list_id).map(ShoppingListId::new);
        let line_item_id =
            required(&mut errors, "line_item_id", &self.line_item_id).map(LineItemId::new);
        finish!(errors, list_id, line_item_id => (list_id, line_item_id))
    }
}

// =============================================================================
// Auth & Account
// =============================================================================

/// `POST /auth/login`
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub struct LoginInput {
    pub email: Email,
    pub password: SecretString,
}

impl LoginForm {
    /// # Errors
    ///
    /// Returns the field errors if the email is malformed or the password
    /// is empty.
    pub fn validate(&self) -> Result<LoginInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email = parse_email(&mut errors, &self.email);
        let password = if self.password.is_empty() {
            errors.add("password", "Please enter your password");
            None
        } else {
            Some(SecretString::from(self.password.as_str()))
        };

        finish!(errors, email, password => LoginInput { email, password })
    }
}

fn parse_email(errors: &mut ValidationErrors, raw: &str) -> Option<Email> {
    let raw = required(errors, "email", raw)?;
    Email::parse(raw)
        .inspect_err(|e| errors.add("email", e.to_string()))
        .ok()
}

/// `POST /account`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
}

impl AccountForm {
    /// # Errors
    ///
    /// Returns the field errors if the email is missing or malformed.
    pub fn validate(&self) -> Result<CustomerDetails, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let email = parse_email(&mut errors, &self.email);

        finish!(errors, email => CustomerDetails {
            first_name: optional(Some(&self.first_name)),
            last_name: optional(Some(&self.last_name)),
            email,
        })
    }
}

/// `POST /account/addresses/{id}/edit`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub street_name: String,
    #[serde(default)]
    pub street_number: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    pub country: String,
}

impl AddressForm {
    /// Prefill from a stored address.
    #[must_use]
    pub fn from_address(address: &Address) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            first_name: text(&address.first_name),
            last_name: text(&address.last_name),
            street_name: text(&address.street_name),
            street_number: text(&address.street_number),
            postal_code: text(&address.postal_code),
            city: text(&address.city),
            country: address.country.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns the field errors if the country is not a two-letter code or
    /// street or city are missing.
    pub fn validate(&self, id: &AddressId) -> Result<Address, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let street_name = required(&mut errors, "street_name", &self.street_name);
        let city = required(&mut errors, "city", &self.city);
        let country = required(&mut errors, "country", &self.country).and_then(|c| {
            if c.len() == 2 && c.chars().all(|ch| ch.is_ascii_alphabetic()) {
                Some(c.to_ascii_uppercase())
            } else {
                errors.add("country", "Use a two-letter country code");
                None
            }
        });

        finish!(errors, street_name, city, country => Address {
            id: Some(id.clone()),
            first_name: optional(Some(&self.first_name)),
            last_name: optional(Some(&self.last_name)),
            street_name: Some(street_name.to_string()),
            street_number: optional(Some(&self.street_number)),
            postal_code: optional(Some(&self.postal_code)),
            city: Some(city.to_string()),
            country,
        })
    }
}
