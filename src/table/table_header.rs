use crate::common::{bitmap, PageId, QuarryError, Result, INVALID_PAGE_ID, PAGE_SIZE};
use crate::record::RecordSchema;
use crate::storage::page::PAGE_HEADER_SIZE;

/// Magic tag at the start of every table file header page
const TABLE_FILE_MAGIC: u32 = 0x5154_424C; // "QTBL"

/// In-page storage model of a table, persisted in the file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageModel {
    /// Row store: each slot is a contiguous nullmap + payload region
    NAry,
    /// Column bands within a page, nullmaps packed up front
    Pax,
}

impl StorageModel {
    fn tag(&self) -> u8 {
        match self {
            StorageModel::NAry => 0,
            StorageModel::Pax => 1,
        }
    }

    fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(StorageModel::NAry),
            1 => Ok(StorageModel::Pax),
            t => Err(QuarryError::InvalidTableFile(format!(
                "unknown storage model tag {}",
                t
            ))),
        }
    }
}

/// Persisted metadata of one table: page and record counts, the head of the
/// free-page list, and the fixed slot geometry derived from the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHeader {
    /// Total pages allocated, including the header page
    pub page_num: u32,
    /// Head of the singly-linked list of not-full pages
    pub first_free_page: PageId,
    /// Total records currently stored
    pub rec_num: u32,
    /// Fixed number of slots per page
    pub rec_per_page: usize,
    /// Fixed payload size of one record
    pub rec_size: usize,
    /// Per-record null map size in bytes
    pub nullmap_size: usize,
    /// Per-page slot bitmap size in bytes (= ceil(rec_per_page / 8))
    pub bitmap_size: usize,
}

impl TableHeader {
    /// Computes the header of an empty table for the given schema: fits as
    /// many `nullmap + payload` slots into a page as the slot bitmap allows.
    pub fn new(schema: &RecordSchema) -> Self {
        let rec_size = schema.rec_size();
        let nullmap_size = schema.nullmap_size();
        let slot_size = nullmap_size + rec_size;
        assert!(slot_size > 0, "schema must have at least one field");

        let avail = PAGE_SIZE - PAGE_HEADER_SIZE;
        let mut rec_per_page = (avail * 8) / (slot_size * 8 + 1);
        while bitmap::bytes_for(rec_per_page) + rec_per_page * slot_size > avail {
            rec_per_page -= 1;
        }
        // Slot ids are u16
        rec_per_page = rec_per_page.min(u16::MAX as usize);
        assert!(rec_per_page > 0, "record does not fit in a page");

        Self {
            page_num: 1,
            first_free_page: INVALID_PAGE_ID,
            rec_num: 0,
            rec_per_page,
            rec_size,
            nullmap_size,
            bitmap_size: bitmap::bytes_for(rec_per_page),
        }
    }

    /// Serialized size of the header fields alone.
    pub const ENCODED_SIZE: usize = 28;

    fn serialize(&self) -> [u8; Self::ENCODED_SIZE] {
        let mut out = [0u8; Self::ENCODED_SIZE];
        out[0..4].copy_from_slice(&self.page_num.to_le_bytes());
        out[4..8].copy_from_slice(&self.first_free_page.as_u32().to_le_bytes());
        out[8..12].copy_from_slice(&self.rec_num.to_le_bytes());
        out[12..16].copy_from_slice(&(self.rec_per_page as u32).to_le_bytes());
        out[16..20].copy_from_slice(&(self.rec_size as u32).to_le_bytes());
        out[20..24].copy_from_slice(&(self.nullmap_size as u32).to_le_bytes());
        out[24..28].copy_from_slice(&(self.bitmap_size as u32).to_le_bytes());
        out
    }

    fn deserialize(data: &[u8]) -> Self {
        let u32_at = |o: usize| u32::from_le_bytes([data[o], data[o + 1], data[o + 2], data[o + 3]]);
        Self {
            page_num: u32_at(0),
            first_free_page: PageId::new(u32_at(4)),
            rec_num: u32_at(8),
            rec_per_page: u32_at(12) as usize,
            rec_size: u32_at(16) as usize,
            nullmap_size: u32_at(20) as usize,
            bitmap_size: u32_at(24) as usize,
        }
    }
}

/// Writes the table file header page: magic, storage model, header fields,
/// then the serialized schema.
pub fn encode_header_page(
    hdr: &TableHeader,
    model: StorageModel,
    schema: &RecordSchema,
    page: &mut [u8],
) {
    debug_assert_eq!(page.len(), PAGE_SIZE);
    page[0..4].copy_from_slice(&TABLE_FILE_MAGIC.to_le_bytes());
    page[4] = model.tag();
    page[5..5 + TableHeader::ENCODED_SIZE].copy_from_slice(&hdr.serialize());
    let schema_bytes = schema.serialize();
    let off = 5 + TableHeader::ENCODED_SIZE;
    assert!(
        off + schema_bytes.len() <= PAGE_SIZE,
        "schema too large for header page"
    );
    page[off..off + schema_bytes.len()].copy_from_slice(&schema_bytes);
}

/// Reads back what `encode_header_page` wrote.
pub fn decode_header_page(page: &[u8]) -> Result<(TableHeader, StorageModel, RecordSchema)> {
    debug_assert_eq!(page.len(), PAGE_SIZE);
    let magic = u32::from_le_bytes([page[0], page[1], page[2], page[3]]);
    if magic != TABLE_FILE_MAGIC {
        return Err(QuarryError::InvalidTableFile("bad magic".to_string()));
    }
    let model = StorageModel::from_tag(page[4])?;
    let hdr = TableHeader::deserialize(&page[5..5 + TableHeader::ENCODED_SIZE]);
    let (schema, _) = RecordSchema::deserialize(&page[5 + TableHeader::ENCODED_SIZE..])
        .ok_or_else(|| QuarryError::InvalidTableFile("truncated schema".to_string()))?;
    Ok((hdr, model, schema))
}
