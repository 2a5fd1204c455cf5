//! Summary of one import batch.

use crate::schema::TableKind;
use crate::store::{BatchStats, TableStats};

/// What an import wrote.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    /// Per-table counts.
    pub stats: BatchStats,
    /// Ids of the batch's events, in document order.
    pub event_ids: Vec<i64>,
}

impl ImportReport {
    /// Counts of one table.
    pub fn table(&self, kind: TableKind) -> TableStats {
        self.stats.table(kind)
    }

    /// Whether the batch left the store unchanged.
    pub fn is_noop(&self) -> bool {
        self.stats.total_inserted() == 0
    }
}
