//! Customer repository trait definition.

use std::future::Future;

use ussd_types::customer::{Customer, NewCustomer};
use ussd_types::error::RepositoryError;

/// Trait for customer persistence.
///
/// Lookups are keyed by a one-way hash of the phone number; implementations
/// decrypt the stored display name before returning it.
pub trait CustomerRepository: Send + Sync {
    /// Find the customer registered for `phone`.
    /// Returns None if no customer uses this number.
    fn find_by_phone(
        &self,
        phone: &str,
    ) -> impl Future<Output = Result<Option<Customer>, RepositoryError>> + Send;

    /// Register a customer. Fails with `Conflict` if the phone is taken.
    fn create(
        &self,
        customer: &NewCustomer,
    ) -> impl Future<Output = Result<Customer, RepositoryError>> + Send;
}
