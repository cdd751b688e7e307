use std::collections::HashMap;
use std::sync::Arc;

use crate::common::{QuarryError, Result};

use super::DataType;

/// One field of a record schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn size(&self) -> usize {
        self.data_type.size()
    }

    /// Format: name_len (2 bytes) + name + data_type
    fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        let name_bytes = self.name.as_bytes();
        bytes.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
        bytes.extend_from_slice(name_bytes);
        bytes.extend(self.data_type.serialize());
        bytes
    }

    fn deserialize(data: &[u8]) -> Option<(Self, usize)> {
        if data.len() < 2 {
            return None;
        }
        let name_len = u16::from_le_bytes([data[0], data[1]]) as usize;
        let mut offset = 2;

        if data.len() < offset + name_len {
            return None;
        }
        let name = String::from_utf8_lossy(&data[offset..offset + name_len]).to_string();
        offset += name_len;

        let (data_type, dt_size) = DataType::deserialize(&data[offset..])?;
        offset += dt_size;

        Some((Field { name, data_type }, offset))
    }
}

/// Ordered list of fields describing the fixed-width layout of a record.
///
/// Supports lookup by field name and by index, and precomputes the payload
/// offset of each field so slot reads can address a single field directly.
#[derive(Debug)]
pub struct RecordSchema {
    fields: Vec<Field>,
    name_to_index: HashMap<String, usize>,
    /// Byte offset of each field within the packed record payload
    offsets: Vec<usize>,
    /// Total payload size of a record
    rec_size: usize,
    /// Size of the per-record null map in bytes (ceil(field_count / 8))
    nullmap_size: usize,
}

impl RecordSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        let mut name_to_index = HashMap::new();
        let mut offsets = Vec::with_capacity(fields.len());
        let mut rec_size = 0;

        for (i, field) in fields.iter().enumerate() {
            name_to_index.insert(field.name.clone(), i);
            offsets.push(rec_size);
            rec_size += field.size();
        }

        let nullmap_size = crate::common::bitmap::bytes_for(fields.len());

        Self {
            fields,
            name_to_index,
            offsets,
            rec_size,
            nullmap_size,
        }
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_at(&self, index: usize) -> &Field {
        &self.fields[index]
    }

    /// Returns the index of the named field.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Payload offset of the field at `index`.
    pub fn offset_at(&self, index: usize) -> usize {
        self.offsets[index]
    }

    pub fn rec_size(&self) -> usize {
        self.rec_size
    }

    pub fn nullmap_size(&self) -> usize {
        self.nullmap_size
    }

    /// Builds the sub-schema containing the named fields, in the given order.
    pub fn project(&self, names: &[&str]) -> Result<RecordSchema> {
        let fields = names
            .iter()
            .map(|name| {
                self.field_index(name)
                    .map(|i| self.fields[i].clone())
                    .ok_or_else(|| QuarryError::FieldMiss(name.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RecordSchema::new(fields))
    }

    /// Serializes the schema for the table header page.
    /// Format: field_count (2 bytes) + [field_data...]
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(self.fields.len() as u16).to_le_bytes());
        for field in &self.fields {
            bytes.extend(field.serialize());
        }
        bytes
    }

    /// Deserializes a schema, returning it and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> Option<(Self, usize)> {
        if data.len() < 2 {
            return None;
        }
        let field_count = u16::from_le_bytes([data[0], data[1]]) as usize;
        let mut offset = 2;
        let mut fields = Vec::with_capacity(field_count);

        for _ in 0..field_count {
            let (field, used) = Field::deserialize(&data[offset..])?;
            fields.push(field);
            offset += used;
        }

        Some((RecordSchema::new(fields), offset))
    }
}

impl PartialEq for RecordSchema {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for RecordSchema {}

/// Shorthand for building a shared schema from `(name, type)` pairs.
pub fn schema_of(fields: &[(&str, DataType)]) -> Arc<RecordSchema> {
    Arc::new(RecordSchema::new(
        fields
            .iter()
            .map(|(name, dt)| Field::new(*name, *dt))
            .collect(),
    ))
}
