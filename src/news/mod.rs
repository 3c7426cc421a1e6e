//! News feed reading and symbol correlation.
//!
//! - [`feed`]: RSS/Atom parsing into flat entries
//! - [`correlator`]: per-symbol matching, classification, and ordering

pub mod correlator;
pub mod feed;
