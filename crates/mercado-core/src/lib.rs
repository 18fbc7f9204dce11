//! Core types and trait definitions for the market-data synchronization
//! engine.
//!
//! No HTTP or database code lives here; every other crate depends on it.

pub mod error;
pub mod frame;
pub mod ident;
pub mod reference;
pub mod schema;
pub mod store;

pub use error::{Error, Result};
