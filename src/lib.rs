//! A personal library manager: book records kept in a JSON document, a
//! checkout/check-in workflow with per-book history, and analytics over the
//! collection.

pub mod catalog;
pub mod export;
pub mod model;
pub mod settings;
pub mod shell;
pub mod statistics;
pub mod store;
pub mod telemetry;

pub use catalog::*;
pub use export::{Export, ExportError};
pub use model::*;
pub use statistics::{BookMetric, Statistics};
pub use store::{BookRepository, JsonBookStore, MemoryBookStore, StoreError};
