//! USSD session state machine and its collaborators.
//!
//! This crate defines the "ports" (cache store and customer repository traits)
//! that the infrastructure layer implements, plus everything that runs inside a
//! request: step catalog, input matching, pagination, localization, the action
//! registry and the engine itself. It depends only on `ussd-types` -- never on
//! `ussd-infra` or any database/IO crate.

pub mod action;
pub mod catalog;
pub mod engine;
pub mod localize;
pub mod matcher;
pub mod menu;
pub mod paginate;
pub mod repository;
pub mod storage;
