use std::cmp::Ordering;
use std::sync::Arc;

use crate::common::{bitmap, QuarryError, Result, Rid};

use super::{RecordSchema, Value};

/// One row: a schema, a null map, a packed fixed-width payload, and the RID
/// it was read from (INVALID_RID for records not materialized from a table).
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<RecordSchema>,
    nullmap: Vec<u8>,
    data: Vec<u8>,
    rid: Rid,
}

impl Record {
    /// Builds a record by serializing `values` against `schema`.
    pub fn from_values(schema: Arc<RecordSchema>, values: &[Value], rid: Rid) -> Result<Self> {
        assert_eq!(
            values.len(),
            schema.field_count(),
            "value count must match schema field count"
        );

        let mut nullmap = vec![0u8; schema.nullmap_size()];
        let mut data = vec![0u8; schema.rec_size()];

        for (i, value) in values.iter().enumerate() {
            let field = schema.field_at(i);
            let offset = schema.offset_at(i);
            if value.is_null() {
                bitmap::set(&mut nullmap, i, true);
            }
            value.write_to(field.data_type(), &mut data[offset..offset + field.size()])?;
        }

        Ok(Self {
            schema,
            nullmap,
            data,
            rid,
        })
    }

    /// Wraps raw null-map and payload bytes read from a page.
    pub fn from_raw(schema: Arc<RecordSchema>, nullmap: Vec<u8>, data: Vec<u8>, rid: Rid) -> Self {
        debug_assert_eq!(nullmap.len(), schema.nullmap_size());
        debug_assert_eq!(data.len(), schema.rec_size());
        Self {
            schema,
            nullmap,
            data,
            rid,
        }
    }

    /// Builds a record over `sub_schema` by extracting the matching fields of
    /// `other` by name. This is the projection constructor: `sub_schema` must
    /// name a subset of `other`'s fields.
    pub fn project(sub_schema: Arc<RecordSchema>, other: &Record) -> Result<Self> {
        let mut nullmap = vec![0u8; sub_schema.nullmap_size()];
        let mut data = vec![0u8; sub_schema.rec_size()];

        for (i, field) in sub_schema.fields().enumerate() {
            let src_idx = other
                .schema
                .field_index(field.name())
                .ok_or_else(|| QuarryError::FieldMiss(field.name().to_string()))?;
            let src_off = other.schema.offset_at(src_idx);
            let dst_off = sub_schema.offset_at(i);
            data[dst_off..dst_off + field.size()]
                .copy_from_slice(&other.data[src_off..src_off + field.size()]);
            if bitmap::get(&other.nullmap, src_idx) {
                bitmap::set(&mut nullmap, i, true);
            }
        }

        Ok(Self {
            schema: sub_schema,
            nullmap,
            data,
            rid: other.rid,
        })
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn nullmap(&self) -> &[u8] {
        &self.nullmap
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn rid(&self) -> Rid {
        self.rid
    }

    pub fn set_rid(&mut self, rid: Rid) {
        self.rid = rid;
    }

    /// Returns true if the field at `index` is null.
    pub fn is_null(&self, index: usize) -> bool {
        bitmap::get(&self.nullmap, index)
    }

    /// Materializes the value of the field at `index`.
    pub fn value_at(&self, index: usize) -> Value {
        if self.is_null(index) {
            return Value::Null;
        }
        let field = self.schema.field_at(index);
        let offset = self.schema.offset_at(index);
        Value::from_bytes(field.data_type(), &self.data[offset..offset + field.size()])
    }

    /// Materializes all field values in schema order.
    pub fn values(&self) -> Vec<Value> {
        (0..self.schema.field_count())
            .map(|i| self.value_at(i))
            .collect()
    }

    /// Field-wise comparison of two records over the same schema layout.
    pub fn compare(&self, other: &Record) -> Ordering {
        debug_assert_eq!(self.schema.field_count(), other.schema.field_count());
        for i in 0..self.schema.field_count() {
            let ord = self.value_at(i).compare(&other.value_at(i));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Compares two records by projecting both onto `key_schema` first.
    pub fn compare_by(&self, other: &Record, key_schema: &Arc<RecordSchema>) -> Result<Ordering> {
        let lhs = Record::project(Arc::clone(key_schema), self)?;
        let rhs = Record::project(Arc::clone(key_schema), other)?;
        Ok(lhs.compare(&rhs))
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.nullmap == other.nullmap && self.data == other.data
    }
}
