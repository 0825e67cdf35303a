//! Catalog commands for the in-memory commerce backend.
//!
//! ```bash
//! # Validate a catalog before pointing COMMERCE_CATALOG_FILE at it
//! basket-cli catalog check catalog.yaml
//!
//! # Print the built-in demo catalog as a starting point
//! basket-cli catalog demo > catalog.yaml
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use tracing::info;

use basket_storefront::backend::Catalog;
use basket_storefront::backend::catalog::CatalogError;

/// Summary of a valid catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSummary {
    pub products: usize,
    pub variants: usize,
    /// Currency codes with at least one price.
    pub currencies: BTreeSet<&'static str>,
}

impl CatalogSummary {
    fn of(catalog: &Catalog) -> Self {
        let currencies = catalog
            .products
            .iter()
            .flat_map(|product| &product.variants)
            .flat_map(|variant| &variant.prices)
            .map(|price| price.currency.code())
            .collect();

        Self {
            products: catalog.products.len(),
            variants: catalog.variant_count(),
            currencies,
        }
    }
}

/// Load and validate a catalog file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the catalog is invalid.
pub fn check(path: &Path) -> Result<CatalogSummary, CatalogError> {
    let catalog = Catalog::load(path)?;
    let summary = CatalogSummary::of(&catalog);

    info!(
        path = %path.display(),
        products = summary.products,
        variants = summary.variants,
        currencies = ?summary.currencies,
        "Catalog is valid"
    );
    Ok(summary)
}

/// The built-in demo catalog as YAML.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn demo_yaml() -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&Catalog::demo())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_yaml_parses_back() {
        let yaml = demo_yaml().unwrap();
        let catalog = Catalog::from_yaml(&yaml).unwrap();
        assert_eq!(catalog, Catalog::demo());
    }

    #[test]
    fn test_summary_counts_currencies() {
        let summary = CatalogSummary::of(&Catalog::demo());
        assert_eq!(summary.products, Catalog::demo().products.len());
        assert!(summary.currencies.contains("EUR"));
        assert!(summary.currencies.contains("USD"));
    }

    #[test]
    fn test_check_missing_file() {
        let err = check(Path::new("no/such/catalog.yaml")).unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }
}
