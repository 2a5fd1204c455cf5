//! Normalization of document trees into relational rows.

mod normalizer;
mod report;

pub use normalizer::Normalizer;
pub use report::ImportReport;
