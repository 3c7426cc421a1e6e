//! Export writers for the assembled dataset.
//!
//! # Submodules
//!
//! - [`csv`]: delimited text with a header row
//! - [`json`]: an array of records, pretty-printed
//!
//! Both writers emit the columns in [`crate::models::COLUMNS`] order.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── nifty_smallcap_momentum_data_20250506_143000.csv
//! └── nifty_smallcap_momentum_data_20250506_143000.json
//! ```

pub mod csv;
pub mod json;
