//! Reference-driven synchronization of market data into a relational store.
//!
//! A run loads the set of valid company codes, writes the `companies` table,
//! prunes every table of rows whose code left the set, fetches each fact
//! category for every code, and prunes again. See [`pipeline::run`].

pub mod config;
pub mod dump;
pub mod error;
pub mod pipeline;
pub mod reconcile;
pub mod reference;
pub mod report;
pub mod schemas;

pub use config::{SyncConfig, WriteMode};
pub use error::{Error, Result};
pub use pipeline::run;
pub use report::RunReport;
