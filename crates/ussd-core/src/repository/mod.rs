//! Repository trait definitions (ports).
//!
//! These traits define the persistent-store interface that the infrastructure
//! layer (ussd-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod customer;
