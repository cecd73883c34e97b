//! Catalog lookup interface
//!
//! The metadata store itself lives outside this crate; resolution only needs
//! table/column name to descriptor lookups, so that is the whole trait.

use crate::types::TypeDescriptor;
use std::collections::HashMap;

/// Resolved metadata for one table column.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub ty: TypeDescriptor,
    pub nullable: bool,
    pub ordinal: usize,
}

/// Table/column metadata lookups. Implemented by the surrounding engine's
/// catalog; the in-memory version below backs the tests.
pub trait Catalog: Send + Sync {
    fn column(&self, table: &str, column: &str) -> Option<ColumnMeta>;

    /// All columns of a table in ordinal order, with their names.
    fn columns(&self, table: &str) -> Option<Vec<(String, ColumnMeta)>>;

    fn has_table(&self, table: &str) -> bool {
        self.columns(table).is_some()
    }
}

/// Hash-map backed catalog for tests and embedding.
#[derive(Default)]
pub struct MemoryCatalog {
    tables: HashMap<String, Vec<(String, ColumnMeta)>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, name: &str, columns: Vec<(&str, TypeDescriptor, bool)>) {
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(ordinal, (col, ty, nullable))| {
                (
                    col.to_string(),
                    ColumnMeta {
                        ty,
                        nullable,
                        ordinal,
                    },
                )
            })
            .collect();
        self.tables.insert(name.to_string(), columns);
    }
}

impl Catalog for MemoryCatalog {
    fn column(&self, table: &str, column: &str) -> Option<ColumnMeta> {
        self.tables.get(table)?.iter().find_map(|(name, meta)| {
            if name == column {
                Some(meta.clone())
            } else {
                None
            }
        })
    }

    fn columns(&self, table: &str) -> Option<Vec<(String, ColumnMeta)>> {
        self.tables.get(table).cloned()
    }
}
