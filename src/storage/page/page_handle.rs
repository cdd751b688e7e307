use std::sync::Arc;

use crate::common::{bitmap, PageId, QuarryError, Result, SlotId};
use crate::record::{Chunk, RecordSchema, Value};
use crate::table::TableHeader;

use super::page;
use super::page::PAGE_HEADER_SIZE;

/// Precomputes the PAX band offsets for a schema, relative to the slot
/// memory base: the nullmap region comes first, then one band per field.
pub fn pax_band_offsets(schema: &RecordSchema, hdr: &TableHeader) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(schema.field_count());
    let mut current = hdr.nullmap_size * hdr.rec_per_page;
    for field in schema.fields() {
        offsets.push(current);
        current += field.size() * hdr.rec_per_page;
    }
    offsets
}

/// Schema-aware interpreter of one pinned page, resolved from the table's
/// storage model. Both variants share the page header and the slot bitmap;
/// they differ in how slot bytes are laid out. `read_chunk` exists only on
/// the PAX variant.
pub enum PageHandle<'a> {
    NAry(NAryPageHandle<'a>),
    Pax(PaxPageHandle<'a>),
}

impl<'a> PageHandle<'a> {
    fn hdr(&self) -> &TableHeader {
        match self {
            PageHandle::NAry(h) => h.hdr,
            PageHandle::Pax(h) => h.hdr,
        }
    }

    fn raw(&self) -> &[u8] {
        match self {
            PageHandle::NAry(h) => h.data,
            PageHandle::Pax(h) => h.data,
        }
    }

    fn raw_mut(&mut self) -> &mut [u8] {
        match self {
            PageHandle::NAry(h) => h.data,
            PageHandle::Pax(h) => h.data,
        }
    }

    pub fn page_id(&self) -> PageId {
        page::page_id(self.raw())
    }

    pub fn set_page_id(&mut self, pid: PageId) {
        page::set_page_id(self.raw_mut(), pid);
    }

    pub fn next_free_page_id(&self) -> PageId {
        page::next_free_page_id(self.raw())
    }

    pub fn set_next_free_page_id(&mut self, pid: PageId) {
        page::set_next_free_page_id(self.raw_mut(), pid);
    }

    /// The per-page slot bitmap, immediately after the page header.
    pub fn bitmap(&self) -> &[u8] {
        &self.raw()[PAGE_HEADER_SIZE..PAGE_HEADER_SIZE + self.hdr().bitmap_size]
    }

    fn bitmap_mut(&mut self) -> &mut [u8] {
        let bitmap_size = self.hdr().bitmap_size;
        &mut self.raw_mut()[PAGE_HEADER_SIZE..PAGE_HEADER_SIZE + bitmap_size]
    }

    pub fn slot_occupied(&self, slot: SlotId) -> bool {
        bitmap::get(self.bitmap(), slot.as_usize())
    }

    pub fn set_slot_bit(&mut self, slot: SlotId, occupied: bool) {
        bitmap::set(self.bitmap_mut(), slot.as_usize(), occupied);
    }

    /// First unoccupied slot, if any.
    pub fn find_free_slot(&self) -> Option<SlotId> {
        bitmap::find_first(self.bitmap(), self.hdr().rec_per_page, 0, false)
            .map(|i| SlotId::new(i as u16))
    }

    /// First occupied slot at or after `start`.
    pub fn find_occupied_slot(&self, start: usize) -> Option<SlotId> {
        bitmap::find_first(self.bitmap(), self.hdr().rec_per_page, start, true)
            .map(|i| SlotId::new(i as u16))
    }

    pub fn is_full(&self) -> bool {
        self.find_free_slot().is_none()
    }

    /// Reads slot `slot` into the caller's nullmap and payload buffers.
    pub fn read_slot(&self, slot: SlotId, nullmap: &mut [u8], data: &mut [u8]) {
        match self {
            PageHandle::NAry(h) => h.read_slot(slot, nullmap, data),
            PageHandle::Pax(h) => h.read_slot(slot, nullmap, data),
        }
    }

    /// Writes the caller's nullmap and row-packed payload into slot `slot`.
    /// `is_update` asserts the expected occupancy: the bitmap bit must
    /// already equal it.
    pub fn write_slot(&mut self, slot: SlotId, nullmap: &[u8], data: &[u8], is_update: bool) {
        debug_assert_eq!(self.slot_occupied(slot), is_update);
        match self {
            PageHandle::NAry(h) => h.write_slot(slot, nullmap, data),
            PageHandle::Pax(h) => h.write_slot(slot, nullmap, data),
        }
    }

    pub fn as_pax(&self) -> Option<&PaxPageHandle<'a>> {
        match self {
            PageHandle::Pax(h) => Some(h),
            PageHandle::NAry(_) => None,
        }
    }
}

/// Row-store page layout:
///
/// ```text
/// [page_hdr][bitmap][null_0 | data_0][null_1 | data_1] ...
/// ```
pub struct NAryPageHandle<'a> {
    hdr: &'a TableHeader,
    data: &'a mut [u8],
}

impl<'a> NAryPageHandle<'a> {
    pub fn new(hdr: &'a TableHeader, data: &'a mut [u8]) -> Self {
        debug_assert_eq!(bitmap::bytes_for(hdr.rec_per_page), hdr.bitmap_size);
        Self { hdr, data }
    }

    fn slot_offset(&self, slot: SlotId) -> usize {
        let slot_size = self.hdr.nullmap_size + self.hdr.rec_size;
        PAGE_HEADER_SIZE + self.hdr.bitmap_size + slot.as_usize() * slot_size
    }

    fn read_slot(&self, slot: SlotId, nullmap: &mut [u8], data: &mut [u8]) {
        debug_assert!(slot.as_usize() < self.hdr.rec_per_page);
        let base = self.slot_offset(slot);
        let nm_end = base + self.hdr.nullmap_size;
        nullmap.copy_from_slice(&self.data[base..nm_end]);
        data.copy_from_slice(&self.data[nm_end..nm_end + self.hdr.rec_size]);
    }

    fn write_slot(&mut self, slot: SlotId, nullmap: &[u8], data: &[u8]) {
        debug_assert!(slot.as_usize() < self.hdr.rec_per_page);
        let base = self.slot_offset(slot);
        let nm_end = base + self.hdr.nullmap_size;
        self.data[base..nm_end].copy_from_slice(nullmap);
        self.data[nm_end..nm_end + self.hdr.rec_size].copy_from_slice(data);
    }
}

/// PAX page layout: all nullmaps packed first, then one column band per
/// field. Band offsets are precomputed by the table handle
/// (see [`pax_band_offsets`]); the caller's payload buffer stays row-packed
/// and the handle performs the gather/scatter.
///
/// ```text
/// [page_hdr][bitmap][nm_0..nm_n][f0_0..f0_n][f1_0..f1_n] ...
/// ```
pub struct PaxPageHandle<'a> {
    hdr: &'a TableHeader,
    schema: &'a RecordSchema,
    offsets: &'a [usize],
    data: &'a mut [u8],
}

impl<'a> PaxPageHandle<'a> {
    pub fn new(
        hdr: &'a TableHeader,
        schema: &'a RecordSchema,
        offsets: &'a [usize],
        data: &'a mut [u8],
    ) -> Self {
        debug_assert_eq!(bitmap::bytes_for(hdr.rec_per_page), hdr.bitmap_size);
        debug_assert_eq!(offsets.len(), schema.field_count());
        Self {
            hdr,
            schema,
            offsets,
            data,
        }
    }

    fn slots_base(&self) -> usize {
        PAGE_HEADER_SIZE + self.hdr.bitmap_size
    }

    fn read_slot(&self, slot: SlotId, nullmap: &mut [u8], data: &mut [u8]) {
        debug_assert!(slot.as_usize() < self.hdr.rec_per_page);
        let base = self.slots_base();
        let nm_off = base + slot.as_usize() * self.hdr.nullmap_size;
        nullmap.copy_from_slice(&self.data[nm_off..nm_off + self.hdr.nullmap_size]);

        for (i, field) in self.schema.fields().enumerate() {
            let size = field.size();
            let src = base + self.offsets[i] + slot.as_usize() * size;
            let dst = self.schema.offset_at(i);
            data[dst..dst + size].copy_from_slice(&self.data[src..src + size]);
        }
    }

    fn write_slot(&mut self, slot: SlotId, nullmap: &[u8], data: &[u8]) {
        debug_assert!(slot.as_usize() < self.hdr.rec_per_page);
        let base = self.slots_base();
        let nm_off = base + slot.as_usize() * self.hdr.nullmap_size;
        self.data[nm_off..nm_off + self.hdr.nullmap_size].copy_from_slice(nullmap);

        for (i, field) in self.schema.fields().enumerate() {
            let size = field.size();
            let dst = base + self.offsets[i] + slot.as_usize() * size;
            let src = self.schema.offset_at(i);
            self.data[dst..dst + size].copy_from_slice(&data[src..src + size]);
        }
    }

    /// Materializes the occupied slots of this page as one value array per
    /// field of `chunk_schema` (a sub-schema of the page's full schema).
    /// Per-slot nulls become typed `Value::Null` entries.
    pub fn read_chunk(&self, chunk_schema: &Arc<RecordSchema>) -> Result<Chunk> {
        let base = self.slots_base();
        let slot_bitmap = &self.data[PAGE_HEADER_SIZE..PAGE_HEADER_SIZE + self.hdr.bitmap_size];
        let mut columns = Vec::with_capacity(chunk_schema.field_count());

        for field in chunk_schema.fields() {
            let orig_idx = self
                .schema
                .field_index(field.name())
                .ok_or_else(|| QuarryError::FieldMiss(field.name().to_string()))?;
            let size = field.size();
            let band = base + self.offsets[orig_idx];

            let mut column = Vec::new();
            for slot in 0..self.hdr.rec_per_page {
                if !bitmap::get(slot_bitmap, slot) {
                    continue;
                }
                let nm_off = base + slot * self.hdr.nullmap_size;
                let nullmap = &self.data[nm_off..nm_off + self.hdr.nullmap_size];
                if bitmap::get(nullmap, orig_idx) {
                    column.push(Value::Null);
                } else {
                    let off = band + slot * size;
                    column.push(Value::from_bytes(
                        field.data_type(),
                        &self.data[off..off + size],
                    ));
                }
            }
            columns.push(column);
        }

        Ok(Chunk::new(Arc::clone(chunk_schema), columns))
    }
}
