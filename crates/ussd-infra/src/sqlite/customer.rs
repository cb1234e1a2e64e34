//! SQLite customer repository implementation.
//!
//! Lookups go through the SHA-256 phone hash; display names are decrypted
//! on read and encrypted on write.

use chrono::Utc;
use sqlx::Row;
use ussd_core::repository::customer::CustomerRepository;
use ussd_types::customer::{Customer, NewCustomer};
use ussd_types::error::RepositoryError;
use uuid::Uuid;

use super::pool::DatabasePool;
use crate::crypto::hash::PhoneHasher;
use crate::crypto::vault::VaultCrypto;

/// SQLite-backed implementation of `CustomerRepository`.
pub struct SqliteCustomerRepository {
    pool: DatabasePool,
    hasher: PhoneHasher,
    crypto: VaultCrypto,
}

impl SqliteCustomerRepository {
    pub fn new(pool: DatabasePool, crypto: VaultCrypto) -> Self {
        Self {
            pool,
            hasher: PhoneHasher::new(),
            crypto,
        }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct CustomerRow {
    id: String,
    display_name_enc: String,
    network_operator: String,
    locale: Option<String>,
}

impl CustomerRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            display_name_enc: row.try_get("display_name_enc")?,
            network_operator: row.try_get("network_operator")?,
            locale: row.try_get("locale")?,
        })
    }

    fn into_customer(self, crypto: &VaultCrypto) -> Result<Customer, RepositoryError> {
        let display_name = crypto.decrypt_hex(&self.display_name_enc).map_err(|e| {
            RepositoryError::Query(format!("customer {}: display name: {e}", self.id))
        })?;
        Ok(Customer {
            id: self.id,
            display_name,
            network_operator: self.network_operator,
            locale: self.locale,
        })
    }
}

impl CustomerRepository for SqliteCustomerRepository {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, display_name_enc, network_operator, locale FROM customers WHERE phone_hash = ?",
        )
        .bind(self.hasher.hash(phone))
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let customer_row =
                    CustomerRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(customer_row.into_customer(&self.crypto)?))
            }
            None => Ok(None),
        }
    }

    async fn create(&self, customer: &NewCustomer) -> Result<Customer, RepositoryError> {
        let id = Uuid::now_v7().to_string();
        let display_name_enc = self
            .crypto
            .encrypt_to_hex(&customer.display_name)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let locale = customer
            .locale
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);

        let result = sqlx::query(
            "INSERT INTO customers (id, phone_hash, display_name_enc, network_operator, locale, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(self.hasher.hash(&customer.phone))
        .bind(&display_name_enc)
        .bind(&customer.network_operator)
        .bind(&locale)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(Customer {
                id,
                display_name: customer.display_name.clone(),
                network_operator: customer.network_operator.clone(),
                locale,
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict("a customer with this phone number already exists".to_string()),
            ),
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }
}
