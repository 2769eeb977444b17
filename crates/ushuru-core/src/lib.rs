//! Core types and trait definitions for the Ushuru tax-filing store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod access;
pub mod audit;
pub mod error;
pub mod filing;
pub mod money;
pub mod pin;
pub mod plan;
pub mod session;
pub mod store;
pub mod truth;

pub use error::{Error, Result};
