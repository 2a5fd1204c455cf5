//! Relational schema of the store.

mod registry;

pub use registry::{TableDef, TableKind, TableRegistry, PROVENANCE_COLUMN};
