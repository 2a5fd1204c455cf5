//! The relational store: row staging, bulk insertion and the transaction
//! boundary around imports.

mod database;
mod inserter;
mod row;

pub use database::Store;
pub(crate) use database::default_start_time;
pub use inserter::{bulk_insert, BatchStats, BulkInserter, TableStats};
pub use row::{display_value, Row, Value};
