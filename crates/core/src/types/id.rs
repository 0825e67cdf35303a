//! Newtype IDs for type-safe entity references.
//!
//! Commerce platform ids are opaque strings. Use the `define_id!` macro to
//! create wrappers that prevent accidentally passing a cart id where a
//! shopping list id is expected.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Macro to define a type-safe opaque string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `new()`, `generate()` (UUID v4), `as_str()`
/// - `Display`, `From<String>`, `From<&str>`
///
/// # Example
///
/// ```rust
/// # use basket_core::define_id;
/// define_id!(BasketId);
/// define_id!(WishId);
///
/// let basket = BasketId::new("b-1");
/// let wish = WishId::new("b-1");
///
/// // These are different types, so this won't compile:
/// // let _: BasketId = wish;
/// assert_eq!(basket.as_str(), wish.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing id.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh random id.
            #[must_use]
            pub fn generate() -> Self {
                Self(::uuid::Uuid::new_v4().to_string())
            }

            /// Get the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

define_id!(CartId);
define_id!(LineItemId);
define_id!(ShoppingListId);
define_id!(ProductId);
define_id!(CustomerId);
define_id!(SessionId);
define_id!(OrderId);
define_id!(AddressId);

/// Error parsing a [`VariantId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariantIdError {
    /// The value is not an integer.
    #[error("variant id must be a whole number")]
    NotANumber,
    /// The value is zero or negative.
    #[error("variant id must be a positive integer")]
    NotPositive,
}

/// Product variant number. Variants are numbered from 1 within a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct VariantId(u32);

impl VariantId {
    /// Create a variant id, rejecting zero.
    ///
    /// # Errors
    ///
    /// Returns [`VariantIdError::NotPositive`] for `0`.
    pub const fn new(id: u32) -> Result<Self, VariantIdError> {
        if id == 0 {
            return Err(VariantIdError::NotPositive);
        }
        Ok(Self(id))
    }

    /// Parse a variant id from user input such as a form field.
    ///
    /// # Errors
    ///
    /// Returns an error unless the trimmed input is a positive integer.
    pub fn parse(input: &str) -> Result<Self, VariantIdError> {
        let value: i64 = input
            .trim()
            .parse()
            .map_err(|_| VariantIdError::NotANumber)?;
        if value <= 0 {
            return Err(VariantIdError::NotPositive);
        }
        u32::try_from(value)
            .map_err(|_| VariantIdError::NotANumber)
            .and_then(Self::new)
    }

    /// Get the underlying number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for VariantId {
    type Error = VariantIdError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VariantId> for u32 {
    fn from(id: VariantId) -> Self {
        id.0
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optimistic concurrency token.
///
/// Every successful update of a versioned entity increments its version by
/// one. Updates must carry the version the caller last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Version of a freshly created entity.
    pub const INITIAL: Self = Self(1);

    /// Wrap a raw version number.
    #[must_use]
    pub const fn new(version: u64) -> Self {
        Self(version)
    }

    /// The version an entity has after one more update.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Get the underlying number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_id_parse() {
        assert_eq!(VariantId::parse("3").unwrap().get(), 3);
        assert_eq!(VariantId::parse(" 12 ").unwrap().get(), 12);
        assert_eq!(VariantId::parse("0"), Err(VariantIdError::NotPositive));
        assert_eq!(VariantId::parse("-4"), Err(VariantIdError::NotPositive));
        assert_eq!(VariantId::parse("abc"), Err(VariantIdError::NotANumber));
        assert_eq!(VariantId::parse("1.5"), Err(VariantIdError::NotANumber));
        assert_eq!(
            VariantId::parse("99999999999"),
            Err(VariantIdError::NotANumber)
        );
    }

    #[test]
    fn test_variant_id_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<VariantId>("0").is_err());
        assert_eq!(serde_json::from_str::<VariantId>("7").unwrap().get(), 7);
    }

    #[test]
    fn test_version_next() {
        assert_eq!(Version::INITIAL.next(), Version::new(2));
        assert!(Version::new(3) > Version::INITIAL);
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = CartId::new("cart-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"cart-1\"");
        assert_eq!(id.to_string(), "cart-1");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(LineItemId::generate(), LineItemId::generate());
    }
}
