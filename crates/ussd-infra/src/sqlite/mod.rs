//! SQLite storage layer.
//!
//! Customer repository and shared session cache backed by SQLite with WAL
//! mode and split read/write connection pools.

pub mod cache;
pub mod customer;
pub mod pool;
