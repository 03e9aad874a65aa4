//! `stockmerge-recon`: product list and location inventory reconciliation.
//!
//! Pure engine crate: receives parsed tables, returns merged records.
//! No CLI or file IO dependencies.

pub mod columns;
pub mod config;
pub mod engine;
pub mod error;
pub mod key;
pub mod load;
pub mod matcher;
pub mod model;
mod output;
pub mod summary;

pub use config::{JobConfig, JoinOptions, KeyStrategy, DuplicatePolicy, Placement, Separator};
pub use engine::{merge, run};
pub use error::InputError;
pub use model::{CellValue, JoinInput, JoinResult, Location, MergedRecord, ProductRecord, LocationRecord, Table};
