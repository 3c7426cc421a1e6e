//! Constituent sources and the fallback chain that resolves them.
//!
//! - [`fetcher`]: HTTP client plus CSV export and HTML table extraction
//! - [`resolver`]: the ordered strategies (primary export, page table,
//!   mirror, static set) and the orchestrator that runs them
//!
//! Every strategy reports failure as a [`crate::error::FetchError`]; the
//! resolver logs it and moves on to the next strategy.

pub mod fetcher;
pub mod resolver;
