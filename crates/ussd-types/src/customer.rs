use serde::{Deserialize, Serialize};

/// A known caller, resolved from the persistent store by phone hash.
///
/// `display_name` is already decrypted. The record is read once when a
/// session starts and never changes during the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub display_name: String,
    pub network_operator: String,
    /// Preferred language code, when the customer chose one.
    pub locale: Option<String>,
}

/// Input for registering a customer.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub phone: String,
    pub display_name: String,
    pub network_operator: String,
    pub locale: Option<String>,
}
