//! Customer account service.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{info, instrument};

use basket_core::{AddressId, CustomerId, Email};

use crate::backend::{Address, CommerceBackend, Customer, CustomerAction, CustomerUpdate};
use crate::services::{ServiceError, retry_once_on_conflict};

/// Editable account details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDetails {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Email,
}

impl CustomerDetails {
    fn into_actions(self) -> [CustomerAction; 3] {
        [
            CustomerAction::SetFirstName(non_blank(self.first_name)),
            CustomerAction::SetLastName(non_blank(self.last_name)),
            CustomerAction::ChangeEmail(self.email),
        ]
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Sign-in and account management.
#[derive(Clone)]
pub struct CustomerManager {
    backend: Arc<dyn CommerceBackend>,
}

impl CustomerManager {
    #[must_use]
    pub fn new(backend: Arc<dyn CommerceBackend>) -> Self {
        Self { backend }
    }

    /// Verify credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] on the `email` field when the
    /// credentials are not accepted.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Customer, ServiceError> {
        let customer = self.backend.sign_in(email, password).await?;
        info!(customer_id = %customer.id, "Customer signed in");
        Ok(customer)
    }

    /// Fetch a customer.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if the customer does not exist.
    pub async fn get_by_id(&self, customer_id: &CustomerId) -> Result<Customer, ServiceError> {
        self.backend
            .get_customer(customer_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("customer {customer_id}")))
    }

    /// Replace name and email in one update.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] if the email is taken by another
    /// customer, [`ServiceError::Conflict`] if the account changed twice
    /// concurrently.
    #[instrument(skip(self, details))]
    pub async fn update_details(
        &self,
        customer_id: &CustomerId,
        details: CustomerDetails,
    ) -> Result<Customer, ServiceError> {
        let details = &details;
        retry_once_on_conflict(|| async move {
            let customer = self.get_by_id(customer_id).await?;
            let update = CustomerUpdate::new(customer.id, customer.version)
                .with_all(details.clone().into_actions());
            Ok(self.backend.update_customer(update).await?)
        })
        .await
    }

    /// Replace one address of the address book.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if the customer has no address with
    /// this id.
    #[instrument(skip(self, address))]
    pub async fn change_address(
        &self,
        customer_id: &CustomerId,
        address_id: &AddressId,
        address: Address,
    ) -> Result<Customer, ServiceError> {
        let address = &address;
        retry_once_on_conflict(|| async move {
            let customer = self.get_by_id(customer_id).await?;
            if customer.address(address_id).is_none() {
                return Err(ServiceError::NotFound(format!("address {address_id}")));
            }
            let update = CustomerUpdate::new(customer.id, customer.version).with(
                CustomerAction::ChangeAddress {
                    address_id: address_id.clone(),
                    address: address.clone(),
                },
            );
            Ok(self.backend.update_customer(update).await?)
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;

    async fn setup() -> (InMemoryBackend, CustomerManager, Customer) {
        let backend = InMemoryBackend::default();
        let customer = backend
            .register_customer(
                Email::parse("jo@example.com").unwrap(),
                "correct horse battery",
                Some("Jo".to_string()),
                None,
            )
            .await
            .unwrap();
        let manager = CustomerManager::new(Arc::new(backend.clone()));
        (backend, manager, customer)
    }

    #[tokio::test]
    async fn test_sign_in() {
        let (_, customers, customer) = setup().await;
        let email = Email::parse("jo@example.com").unwrap();

        let signed_in = customers
            .sign_in(&email, &SecretString::from("correct horse battery"))
            .await
            .unwrap();
        assert_eq!(signed_in.id, customer.id);

        let wrong = customers
            .sign_in(&email, &SecretString::from("wrong"))
            .await;
        assert!(matches!(
            wrong,
            Err(ServiceError::Validation(errors)) if errors.for_field("email").is_some()
        ));
    }

    #[tokio::test]
    async fn test_update_details_in_one_update() {
        let (_, customers, customer) = setup().await;
        let updated = customers
            .update_details(
                &customer.id,
                CustomerDetails {
                    first_name: Some("  ".to_string()),
                    last_name: Some("Doe".to_string()),
                    email: Email::parse("jo.doe@example.com").unwrap(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.first_name, None);
        assert_eq!(updated.last_name.as_deref(), Some("Doe"));
        assert_eq!(updated.email.as_str(), "jo.doe@example.com");
        assert_eq!(updated.version, customer.version.next());
    }

    #[tokio::test]
    async fn test_update_details_retries_single_conflict() {
        let (backend, customers, customer) = setup().await;
        backend.interleave_concurrent_writes(1);

        let updated = customers
            .update_details(
                &customer.id,
                CustomerDetails {
                    first_name: Some("Jo".to_string()),
                    last_name: None,
                    email: customer.email.clone(),
                },
            )
            .await;
        assert!(updated.is_ok());
    }

    #[tokio::test]
    async fn test_change_address() {
        let (backend, customers, customer) = setup().await;
        let customer = backend
            .add_address(
                &customer.id,
                Address {
                    city: Some("Berlin".to_string()),
                    country: "DE".to_string(),
                    ..Address::default()
                },
            )
            .await
            .unwrap();
        let address_id = customer.addresses.first().unwrap().id.clone().unwrap();

        let updated = customers
            .change_address(
                &customer.id,
                &address_id,
                Address {
                    city: Some("Hamburg".to_string()),
                    country: "DE".to_string(),
                    ..Address::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            updated.address(&address_id).unwrap().city.as_deref(),
            Some("Hamburg")
        );

        let unknown = customers
            .change_address(&customer.id, &AddressId::new("nope"), Address::default())
            .await;
        assert!(matches!(unknown, Err(ServiceError::NotFound(_))));
    }
}
