//! Product catalog for the in-memory backend.
//!
//! Catalogs are plain YAML so they can be edited by hand and validated with
//! `basket-cli catalog check <file>`:
//!
//! ```yaml
//! products:
//!   - id: P1
//!     name: Merino Socks
//!     variants:
//!       - id: 1
//!         prices:
//!           - { currency: EUR, cents: 1299 }
//!           - { currency: EUR, country: AT, cents: 1399 }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use basket_core::{CurrencyCode, Money, ProductId, VariantId};

use crate::backend::ProductVariant;

/// Errors loading or validating a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("duplicate product id: {0}")]
    DuplicateProduct(ProductId),
    #[error("duplicate variant {1} in product {0}")]
    DuplicateVariant(ProductId, VariantId),
    #[error("product {0} has no variants")]
    NoVariants(ProductId),
    #[error("negative price for product {0} variant {1}")]
    NegativePrice(ProductId, VariantId),
}

/// A price entry, optionally restricted to one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPrice {
    pub currency: CurrencyCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub cents: i64,
}

/// A sellable variant with its prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogVariant {
    pub id: VariantId,
    #[serde(default)]
    pub prices: Vec<CatalogPrice>,
}

/// A product with at least one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    pub variants: Vec<CatalogVariant>,
}

/// All products known to the in-memory backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub products: Vec<CatalogProduct>,
}

impl Catalog {
    /// Parse and validate a YAML catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or the catalog is invalid.
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_yaml::from_str(yaml)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Read, parse and validate a YAML catalog file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Check ids are unique, every product has variants and no price is negative.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut product_ids = HashSet::new();
        for product in &self.products {
            if !product_ids.insert(&product.id) {
                return Err(CatalogError::DuplicateProduct(product.id.clone()));
            }
            if product.variants.is_empty() {
                return Err(CatalogError::NoVariants(product.id.clone()));
            }

            let mut variant_ids = HashSet::new();
            for variant in &product.variants {
                if !variant_ids.insert(variant.id) {
                    return Err(CatalogError::DuplicateVariant(
                        product.id.clone(),
                        variant.id,
                    ));
                }
                if variant.prices.iter().any(|price| price.cents < 0) {
                    return Err(CatalogError::NegativePrice(product.id.clone(), variant.id));
                }
            }
        }
        Ok(())
    }

    /// Look up a product by id.
    #[must_use]
    pub fn product(&self, id: &ProductId) -> Option<&CatalogProduct> {
        self.products.iter().find(|p| p.id == *id)
    }

    /// Number of sellable variants.
    #[must_use]
    pub fn variant_count(&self) -> usize {
        self.products.iter().map(|p| p.variants.len()).sum()
    }

    /// Look up a variant and select its price for `currency` and `country`.
    ///
    /// A country-specific price wins over a currency-only price. Returns
    /// `None` when the variant does not exist or has no matching price.
    #[must_use]
    pub fn price_variant(
        &self,
        product_id: &ProductId,
        variant_id: VariantId,
        currency: CurrencyCode,
        country: Option<&str>,
    ) -> Option<ProductVariant> {
        let product = self.product(product_id)?;
        let variant = product.variants.iter().find(|v| v.id == variant_id)?;

        let in_currency = |price: &&CatalogPrice| price.currency == currency;
        let price = country
            .and_then(|country| {
                variant
                    .prices
                    .iter()
                    .filter(in_currency)
                    .find(|price| price.country.as_deref() == Some(country))
            })
            .or_else(|| {
                variant
                    .prices
                    .iter()
                    .filter(in_currency)
                    .find(|price| price.country.is_none())
            })?;

        Some(ProductVariant {
            product_id: product.id.clone(),
            variant_id: variant.id,
            name: product.name.clone(),
            price: Money::from_cents(price.cents, price.currency),
        })
    }

    /// Small catalog used when no catalog file is configured.
    #[must_use]
    pub fn demo() -> Self {
        fn variant(id: u32, eur: i64, usd: i64, gbp: i64) -> CatalogVariant {
            CatalogVariant {
                id: VariantId::new(id).unwrap_or_else(|_| unreachable!("demo ids are positive")),
                prices: vec![
                    CatalogPrice {
                        currency: CurrencyCode::EUR,
                        country: None,
                        cents: eur,
                    },
                    CatalogPrice {
                        currency: CurrencyCode::USD,
                        country: None,
                        cents: usd,
                    },
                    CatalogPrice {
                        currency: CurrencyCode::GBP,
                        country: None,
                        cents: gbp,
                    },
                ],
            }
        }

        Self {
            products: vec![
                CatalogProduct {
                    id: ProductId::new("P1"),
                    name: "Merino Socks".to_string(),
                    variants: vec![variant(1, 1299, 1399, 1099), variant(2, 1299, 1399, 1099)],
                },
                CatalogProduct {
                    id: ProductId::new("P2"),
                    name: "Canvas Tote".to_string(),
                    variants: vec![variant(1, 2450, 2600, 2100)],
                },
                CatalogProduct {
                    id: ProductId::new("P3"),
                    name: "Enamel Mug".to_string(),
                    variants: vec![variant(1, 900, 1000, 800), variant(2, 950, 1050, 850)],
                },
            ],
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const YAML: &str = r"
products:
  - id: P1
    name: Merino Socks
    variants:
      - id: 1
        prices:
          - { currency: EUR, cents: 1299 }
          - { currency: EUR, country: AT, cents: 1399 }
";

    #[test]
    fn test_from_yaml_and_price_selection() {
        let catalog = Catalog::from_yaml(YAML).unwrap();
        let p1 = ProductId::new("P1");
        let v1 = VariantId::new(1).unwrap();

        let de = catalog
            .price_variant(&p1, v1, CurrencyCode::EUR, Some("DE"))
            .unwrap();
        assert_eq!(de.price.cents(), 1299);

        let at = catalog
            .price_variant(&p1, v1, CurrencyCode::EUR, Some("AT"))
            .unwrap();
        assert_eq!(at.price.cents(), 1399);

        assert!(
            catalog
                .price_variant(&p1, v1, CurrencyCode::USD, Some("US"))
                .is_none()
        );
        assert!(
            catalog
                .price_variant(&p1, VariantId::new(9).unwrap(), CurrencyCode::EUR, None)
                .is_none()
        );
    }

    #[test]
    fn test_rejects_zero_variant_id() {
        let yaml = "products:\n  - id: P1\n    name: X\n    variants:\n      - id: 0\n";
        assert!(matches!(Catalog::from_yaml(yaml), Err(CatalogError::Yaml(_))));
    }

    #[test]
    fn test_validate_duplicates() {
        let mut catalog = Catalog::demo();
        let first = catalog.products.first().cloned().unwrap();
        catalog.products.push(first);
        assert!(matches!(
            catalog.validate(),
            Err(CatalogError::DuplicateProduct(_))
        ));
    }

    #[test]
    fn test_demo_catalog_is_valid() {
        let catalog = Catalog::demo();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.variant_count(), 5);
    }
}
