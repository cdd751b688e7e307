use std::sync::Arc;

use super::{RecordSchema, Value};

/// Columnar materialization of the occupied slots of one PAX page: one value
/// array per field of the requested sub-schema, all arrays the same length.
#[derive(Debug)]
pub struct Chunk {
    schema: Arc<RecordSchema>,
    columns: Vec<Vec<Value>>,
}

impl Chunk {
    pub fn new(schema: Arc<RecordSchema>, columns: Vec<Vec<Value>>) -> Self {
        debug_assert_eq!(columns.len(), schema.field_count());
        Self { schema, columns }
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// The value array of the field at `index` in the chunk schema.
    pub fn column(&self, index: usize) -> &[Value] {
        &self.columns[index]
    }

    pub fn column_by_name(&self, name: &str) -> Option<&[Value]> {
        self.schema.field_index(name).map(|i| self.column(i))
    }

    /// Number of rows materialized in this chunk.
    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }
}
