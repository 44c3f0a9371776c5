//! # Data Model
//!
//! Database rows and repositories.

pub mod store;
