//! Shopping list service.
//!
//! Lists are owned by one principal. Reads of a foreign list look exactly
//! like reads of a missing one; writes to a foreign list are refused.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, instrument};

use basket_core::{LineItemId, Locale, Principal, ProductId, ShoppingListId, VariantId};

use crate::backend::{
    CommerceBackend, ShoppingList, ShoppingListAction, ShoppingListDraft, ShoppingListUpdate,
};
use crate::services::{ServiceError, ensure_quantity_limit, retry_once_on_conflict};

/// Shopping list queries and mutations.
#[derive(Clone)]
pub struct ShoppingListManager {
    backend: Arc<dyn CommerceBackend>,
}

impl ShoppingListManager {
    #[must_use]
    pub fn new(backend: Arc<dyn CommerceBackend>) -> Self {
        Self { backend }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// All lists owned by `principal`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    #[instrument(skip(self), fields(principal = %principal))]
    pub async fn get_all_owned_by(
        &self,
        principal: &Principal,
    ) -> Result<Vec<ShoppingList>, ServiceError> {
        let mut lists = self.backend.query_shopping_lists(principal).await?;
        lists.retain(|list| list.owner == *principal);
        lists.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(lists)
    }

    /// A list owned by `principal`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if the list does not exist or
    /// belongs to someone else.
    #[instrument(skip(self), fields(principal = %principal))]
    pub async fn get_by_id(
        &self,
        list_id: &ShoppingListId,
        principal: &Principal,
    ) -> Result<ShoppingList, ServiceError> {
        self.backend
            .get_shopping_list(list_id)
            .await?
            .filter(|list| list.owner == *principal)
            .ok_or_else(|| ServiceError::NotFound(format!("shopping list {list_id}")))
    }

    /// List names mapped to ids, for the add-to-list picker.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn name_index(
        &self,
        principal: &Principal,
    ) -> Result<BTreeMap<String, ShoppingListId>, ServiceError> {
        Ok(self
            .get_all_owned_by(principal)
            .await?
            .into_iter()
            .map(|list| (list.name, list.id))
            .collect())
    }

    /// The list for a write, distinguishing missing from foreign.
    async fn owned_list(
        &self,
        list_id: &ShoppingListId,
        principal: &Principal,
    ) -> Result<ShoppingList, ServiceError> {
        let list = self
            .backend
            .get_shopping_list(list_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("shopping list {list_id}")))?;
        if list.owner != *principal {
            return Err(ServiceError::Forbidden(format!("shopping list {list_id}")));
        }
        Ok(list)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] if the name is blank.
    #[instrument(skip(self, locale), fields(principal = %principal))]
    pub async fn create(
        &self,
        locale: &Locale,
        name: &str,
        principal: &Principal,
    ) -> Result<ShoppingList, ServiceError> {
        let name = validate_name(name)?;
        let list = self
            .backend
            .create_shopping_list(ShoppingListDraft {
                owner: principal.clone(),
                name,
                locale: locale.clone(),
            })
            .await?;
        info!(list_id = %list.id, "Shopping list created");
        Ok(list)
    }

    /// Delete a list.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] if the list does not exist
    /// - [`ServiceError::Forbidden`] if it belongs to someone else
    #[instrument(skip(self), fields(principal = %principal))]
    pub async fn delete(
        &self,
        list_id: &ShoppingListId,
        principal: &Principal,
    ) -> Result<(), ServiceError> {
        retry_once_on_conflict(|| async move {
            let list = self.owned_list(list_id, principal).await?;
            self.backend
                .delete_shopping_list(&list.id, list.version)
                .await?;
            Ok(())
        })
        .await?;
        info!(%list_id, "Shopping list deleted");
        Ok(())
    }

    /// Apply the actions `build` derives from the latest list state, all or
    /// none of them.
    ///
    /// `build` runs again with fresh state if the first attempt conflicts.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] if the list does not exist
    /// - [`ServiceError::Forbidden`] if it belongs to someone else
    /// - [`ServiceError::Conflict`] if the list changed twice concurrently
    pub async fn apply<F>(
        &self,
        list_id: &ShoppingListId,
        principal: &Principal,
        build: F,
    ) -> Result<ShoppingList, ServiceError>
    where
        F: Fn(&ShoppingList) -> Result<Vec<ShoppingListAction>, ServiceError> + Send + Sync,
    {
        let build = &build;
        retry_once_on_conflict(|| async move {
            let list = self.owned_list(list_id, principal).await?;
            let actions = build(&list)?;
            if actions.is_empty() {
                return Ok(list);
            }
            let update = ShoppingListUpdate::new(list.id, list.version).with_all(actions);
            Ok(self.backend.update_shopping_list(update).await?)
        })
        .await
    }

    /// Add units of a variant. Merges into an existing line for the variant.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`]; also [`ServiceError::Validation`] for a zero
    /// quantity or a line that would exceed
    /// [`MAX_QUANTITY`](crate::backend::MAX_QUANTITY).
    #[instrument(skip(self), fields(principal = %principal))]
    pub async fn add_line_item(
        &self,
        list_id: &ShoppingListId,
        principal: &Principal,
        product_id: &ProductId,
        variant_id: VariantId,
        quantity: u32,
    ) -> Result<ShoppingList, ServiceError> {
        if quantity == 0 {
            return Err(ServiceError::invalid("quantity", "must be at least 1"));
        }
        ensure_quantity_limit(quantity)?;
        self.apply(list_id, principal, |list| {
            let merged = list
                .line_items
                .iter()
                .find(|item| item.is_variant(product_id, variant_id))
                .map_or(0, |item| item.quantity);
            ensure_quantity_limit(merged.saturating_add(quantity))?;
            Ok(vec![ShoppingListAction::AddLineItem {
                product_id: product_id.clone(),
                variant_id,
                quantity,
            }])
        })
        .await
    }

    /// Set the quantity of a line item. A quantity of zero removes it.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`]; [`ServiceError::NotFound`] for an unknown line.
    #[instrument(skip(self), fields(principal = %principal))]
    pub async fn change_line_item_quantity(
        &self,
        list_id: &ShoppingListId,
        principal: &Principal,
        line_item_id: &LineItemId,
        quantity: u32,
    ) -> Result<ShoppingList, ServiceError> {
        ensure_quantity_limit(quantity)?;
        self.apply(list_id, principal, |list| {
            ensure_line_item(list, line_item_id)?;
            let action = if quantity == 0 {
                ShoppingListAction::RemoveLineItem {
                    line_item_id: line_item_id.clone(),
                }
            } else {
                ShoppingListAction::ChangeLineItemQuantity {
                    line_item_id: line_item_id.clone(),
                    quantity,
                }
            };
            Ok(vec![action])
        })
        .await
    }

    /// Remove a line item.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`]; [`ServiceError::NotFound`] for an unknown line.
    #[instrument(skip(self), fields(principal = %principal))]
    pub async fn remove_line_item(
        &self,
        list_id: &ShoppingListId,
        principal: &Principal,
        line_item_id: &LineItemId,
    ) -> Result<ShoppingList, ServiceError> {
        self.apply(list_id, principal, |list| {
            ensure_line_item(list, line_item_id)?;
            Ok(vec![ShoppingListAction::RemoveLineItem {
                line_item_id: line_item_id.clone(),
            }])
        })
        .await
    }

    /// Rename a list.
    ///
    /// # Errors
    ///
    /// See [`Self::apply`]; [`ServiceError::Validation`] for a blank name.
    #[instrument(skip(self), fields(principal = %principal))]
    pub async fn rename(
        &self,
        list_id: &ShoppingListId,
        principal: &Principal,
        name: &str,
    ) -> Result<ShoppingList, ServiceError> {
        let name = validate_name(name)?;
        self.apply(list_id, principal, |_| {
            Ok(vec![ShoppingListAction::ChangeName { name: name.clone() }])
        })
        .await
    }
}

fn validate_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::invalid("name", "Please enter a name"));
    }
    Ok(name.to_string())
}

fn ensure_line_item(list: &ShoppingList, line_item_id: &LineItemId) -> Result<(), ServiceError> {
    if list.line_item(line_item_id).is_none() {
        return Err(ServiceError::NotFound(format!("line item {line_item_id}")));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::{InMemoryBackend, MAX_QUANTITY};

    fn setup() -> (InMemoryBackend, ShoppingListManager, Locale) {
        let backend = InMemoryBackend::default();
        let manager = ShoppingListManager::new(Arc::new(backend.clone()));
        (backend, manager, Locale::parse("en-GB").unwrap())
    }

    fn v(id: u32) -> VariantId {
        VariantId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_list_appears_once() {
        let (_, lists, locale) = setup();
        let owner = Principal::anonymous("sess1");

        let created = lists.create(&locale, "  Gifts ", &owner).await.unwrap();
        assert_eq!(created.name, "Gifts");

        let all = lists.get_all_owned_by(&owner).await.unwrap();
        assert_eq!(all.iter().filter(|l| l.id == created.id).count(), 1);

        // Stable across re-queries.
        let again = lists.get_all_owned_by(&owner).await.unwrap();
        assert_eq!(all, again);
    }

    #[tokio::test]
    async fn test_lists_are_in_creation_order_and_scoped_to_owner() {
        let (_, lists, locale) = setup();
        let owner = Principal::anonymous("sess1");
        let other = Principal::anonymous("sess2");

        lists.create(&locale, "First", &owner).await.unwrap();
        lists.create(&locale, "Theirs", &other).await.unwrap();
        lists.create(&locale, "Second", &owner).await.unwrap();

        let names: Vec<String> = lists
            .get_all_owned_by(&owner)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, ["First", "Second"]);

        let index = lists.name_index(&owner).await.unwrap();
        assert_eq!(index.keys().collect::<Vec<_>>(), ["First", "Second"]);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let (_, lists, locale) = setup();
        let result = lists
            .create(&locale, "   ", &Principal::anonymous("sess1"))
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_by_id_missing_or_foreign_is_not_found() {
        let (_, lists, locale) = setup();
        let owner = Principal::anonymous("sess1");

        let missing = lists
            .get_by_id(&ShoppingListId::new("L404"), &owner)
            .await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));

        let list = lists.create(&locale, "Mine", &owner).await.unwrap();
        let foreign = lists
            .get_by_id(&list.id, &Principal::anonymous("sess2"))
            .await;
        assert!(matches!(foreign, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_foreign_is_forbidden_and_missing_is_not_found() {
        let (_, lists, locale) = setup();
        let owner = Principal::anonymous("sess1");
        let list = lists.create(&locale, "Mine", &owner).await.unwrap();

        let foreign = lists
            .delete(&list.id, &Principal::customer("c-9"))
            .await;
        assert!(matches!(foreign, Err(ServiceError::Forbidden(_))));
        assert!(lists.get_by_id(&list.id, &owner).await.is_ok());

        lists.delete(&list.id, &owner).await.unwrap();
        let again = lists.delete(&list.id, &owner).await;
        assert!(matches!(again, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_line_item_lifecycle() {
        let (_, lists, locale) = setup();
        let owner = Principal::anonymous("sess1");
        let list = lists.create(&locale, "Mine", &owner).await.unwrap();
        let p2 = ProductId::new("P2");

        let list = lists
            .add_line_item(&list.id, &owner, &p2, v(1), 1)
            .await
            .unwrap();
        let list = lists
            .add_line_item(&list.id, &owner, &p2, v(1), 2)
            .await
            .unwrap();
        assert_eq!(list.line_items.len(), 1);
        let line_item_id = list.line_items.first().unwrap().id.clone();
        assert_eq!(list.line_item(&line_item_id).unwrap().quantity, 3);

        let list = lists
            .change_line_item_quantity(&list.id, &owner, &line_item_id, 0)
            .await
            .unwrap();
        assert!(list.line_items.is_empty());

        let removed = lists
            .remove_line_item(&list.id, &owner, &line_item_id)
            .await;
        assert!(matches!(removed, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_line_quantity_is_capped() {
        let (_, lists, locale) = setup();
        let owner = Principal::anonymous("sess1");
        let list = lists.create(&locale, "Bulk", &owner).await.unwrap();
        let p1 = ProductId::new("P1");

        let list = lists
            .add_line_item(&list.id, &owner, &p1, v(1), MAX_QUANTITY)
            .await
            .unwrap();
        let line_item_id = list.line_items.first().unwrap().id.clone();

        let over = lists.add_line_item(&list.id, &owner, &p1, v(1), 1).await;
        assert!(matches!(over, Err(ServiceError::Validation(_))));
        let over = lists
            .change_line_item_quantity(&list.id, &owner, &line_item_id, MAX_QUANTITY + 1)
            .await;
        assert!(matches!(over, Err(ServiceError::Validation(_))));

        let list = lists.get_by_id(&list.id, &owner).await.unwrap();
        assert_eq!(list.total_quantity(), MAX_QUANTITY);
    }

    #[tokio::test]
    async fn test_mutating_foreign_list_is_forbidden() {
        let (_, lists, locale) = setup();
        let list = lists
            .create(&locale, "Mine", &Principal::anonymous("sess1"))
            .await
            .unwrap();

        let result = lists
            .rename(&list.id, &Principal::anonymous("sess2"), "Stolen")
            .await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_multi_action_update_is_all_or_nothing() {
        let (_, lists, locale) = setup();
        let owner = Principal::anonymous("sess1");
        let list = lists.create(&locale, "Before", &owner).await.unwrap();

        let result = lists
            .apply(&list.id, &owner, |_| {
                Ok(vec![
                    ShoppingListAction::ChangeName {
                        name: "After".to_string(),
                    },
                    ShoppingListAction::RemoveLineItem {
                        line_item_id: LineItemId::new("missing"),
                    },
                ])
            })
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));

        let unchanged = lists.get_by_id(&list.id, &owner).await.unwrap();
        assert_eq!(unchanged.name, "Before");
        assert_eq!(unchanged.version, list.version);
    }

    #[tokio::test]
    async fn test_rename_retries_single_conflict() {
        let (backend, lists, locale) = setup();
        let owner = Principal::anonymous("sess1");
        let list = lists.create(&locale, "Old", &owner).await.unwrap();

        backend.interleave_concurrent_writes(1);
        let renamed = lists.rename(&list.id, &owner, "New").await.unwrap();
        assert_eq!(renamed.name, "New");

        backend.interleave_concurrent_writes(2);
        let result = lists.rename(&list.id, &owner, "Newer").await;
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }
}
