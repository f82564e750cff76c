//! Redb table definitions.

use redb::TableDefinition;

/// Post rows, keyed by the 16-byte encoded row key. Values are empty: a row's
/// presence is the record.
pub const SERIES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("series");
