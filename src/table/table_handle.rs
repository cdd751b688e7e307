use std::sync::Arc;

use crate::buffer::{BufferPoolManager, PageGuard};
use crate::common::{
    FileId, PageId, QuarryError, Result, Rid, FILE_HEADER_PAGE_ID, INVALID_PAGE_ID, INVALID_RID,
};
use crate::record::{Chunk, Record, RecordSchema};
use crate::storage::page::{
    self, pax_band_offsets, NAryPageHandle, PageHandle, PaxPageHandle,
};

use super::{decode_header_page, encode_header_page, StorageModel, TableHeader};

/// Heap-table access path: owns the table header and schema, interprets pages
/// through the storage model's page handle, and keeps the free-page list
/// threaded through page headers.
///
/// Every page fetched by an operation is released on all exit paths with the
/// dirty flag matching whether it was mutated; the page guard makes the
/// release automatic. A table has a single writer at a time.
pub struct TableHandle {
    table_id: FileId,
    bpm: Arc<BufferPoolManager>,
    header: TableHeader,
    storage_model: StorageModel,
    schema: Arc<RecordSchema>,
    /// PAX column band offsets, empty for the N-ary model
    field_offsets: Vec<usize>,
}

/// Builds the storage model's page handle over pinned page bytes.
fn page_handle<'a>(
    header: &'a TableHeader,
    model: StorageModel,
    schema: &'a RecordSchema,
    offsets: &'a [usize],
    data: &'a mut [u8],
) -> PageHandle<'a> {
    match model {
        StorageModel::NAry => PageHandle::NAry(NAryPageHandle::new(header, data)),
        StorageModel::Pax => PageHandle::Pax(PaxPageHandle::new(header, schema, offsets, data)),
    }
}

impl TableHandle {
    /// Creates an empty table in the file `table_id` and persists its header.
    pub fn create(
        bpm: Arc<BufferPoolManager>,
        table_id: FileId,
        schema: Arc<RecordSchema>,
        storage_model: StorageModel,
    ) -> Result<Self> {
        let header = TableHeader::new(&schema);
        let field_offsets = match storage_model {
            StorageModel::Pax => pax_band_offsets(&schema, &header),
            StorageModel::NAry => Vec::new(),
        };
        let handle = Self {
            table_id,
            bpm,
            header,
            storage_model,
            schema,
            field_offsets,
        };
        handle.write_header_page()?;
        log::debug!("created table {}", table_id);
        Ok(handle)
    }

    /// Opens a table from its persisted header page.
    pub fn open(bpm: Arc<BufferPoolManager>, table_id: FileId) -> Result<Self> {
        let (header, storage_model, schema) = {
            let guard = bpm.fetch_page(table_id, FILE_HEADER_PAGE_ID)?;
            let data = guard.data();
            decode_header_page(&data[..])?
        };
        let schema = Arc::new(schema);
        let field_offsets = match storage_model {
            StorageModel::Pax => pax_band_offsets(&schema, &header),
            StorageModel::NAry => Vec::new(),
        };
        log::debug!("opened table {} ({} records)", table_id, header.rec_num);
        Ok(Self {
            table_id,
            bpm,
            header,
            storage_model,
            schema,
            field_offsets,
        })
    }

    pub fn table_id(&self) -> FileId {
        self.table_id
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn header(&self) -> &TableHeader {
        &self.header
    }

    pub fn storage_model(&self) -> StorageModel {
        self.storage_model
    }

    /// The file name this table was registered under.
    pub fn table_name(&self) -> Result<String> {
        self.bpm.disk().file_name(self.table_id)
    }

    /// Reads the record at `rid`. Fails with `RecordMiss` if the slot is
    /// empty.
    pub fn get_record(&self, rid: Rid) -> Result<Record> {
        self.check_rid(rid)?;
        let mut guard = self.bpm.fetch_page(self.table_id, rid.page_id)?;

        let mut nullmap = vec![0u8; self.header.nullmap_size];
        let mut payload = vec![0u8; self.header.rec_size];
        {
            let mut data = guard.data_mut();
            let handle = page_handle(
                &self.header,
                self.storage_model,
                &self.schema,
                &self.field_offsets,
                &mut data[..],
            );
            if !handle.slot_occupied(rid.slot_id) {
                return Err(QuarryError::RecordMiss(rid));
            }
            handle.read_slot(rid.slot_id, &mut nullmap, &mut payload);
        }

        Ok(Record::from_raw(
            Arc::clone(&self.schema),
            nullmap,
            payload,
            rid,
        ))
    }

    /// Materializes a column chunk of page `pid` for `chunk_schema`.
    /// PAX tables only.
    pub fn get_chunk(&self, pid: PageId, chunk_schema: &Arc<RecordSchema>) -> Result<Chunk> {
        if self.storage_model != StorageModel::Pax {
            return Err(QuarryError::ChunkUnsupported);
        }
        if pid == INVALID_PAGE_ID {
            return Err(QuarryError::PageMiss(pid));
        }

        let mut guard = self.bpm.fetch_page(self.table_id, pid)?;
        let mut data = guard.data_mut();
        let handle = page_handle(
            &self.header,
            self.storage_model,
            &self.schema,
            &self.field_offsets,
            &mut data[..],
        );
        match handle.as_pax() {
            Some(pax) => pax.read_chunk(chunk_schema),
            None => Err(QuarryError::ChunkUnsupported),
        }
    }

    /// Inserts a record into the first page with a free slot, allocating a
    /// new page when the free list is empty. Returns the record's RID.
    pub fn insert_record(&mut self, record: &Record) -> Result<Rid> {
        debug_assert_eq!(record.data().len(), self.header.rec_size);

        let mut guard = if self.header.first_free_page == INVALID_PAGE_ID {
            Self::allocate_page(&self.bpm, self.table_id, &mut self.header)?
        } else {
            self.bpm
                .fetch_page(self.table_id, self.header.first_free_page)?
        };
        let pid = guard.page_id();

        let slot;
        let mut unlink_next = None;
        {
            let mut data = guard.data_mut();
            let mut handle = page_handle(
                &self.header,
                self.storage_model,
                &self.schema,
                &self.field_offsets,
                &mut data[..],
            );
            slot = handle.find_free_slot().ok_or_else(|| {
                QuarryError::InvalidTableFile(format!("page {} on free list is full", pid))
            })?;
            handle.write_slot(slot, record.nullmap(), record.data(), false);
            handle.set_slot_bit(slot, true);
            if handle.is_full() {
                unlink_next = Some(handle.next_free_page_id());
                handle.set_next_free_page_id(INVALID_PAGE_ID);
            }
        }
        guard.mark_dirty();
        drop(guard);

        self.header.rec_num += 1;
        if let Some(next) = unlink_next {
            self.header.first_free_page = next;
        }
        Ok(Rid::new(pid, slot))
    }

    /// Inserts a record at a caller-chosen RID. Fails with `PageMiss` for the
    /// invalid page id and `RecordExists` if the slot is occupied.
    pub fn insert_record_at(&mut self, rid: Rid, record: &Record) -> Result<()> {
        if rid.page_id == INVALID_PAGE_ID {
            return Err(QuarryError::PageMiss(rid.page_id));
        }
        if rid.slot_id.as_usize() >= self.header.rec_per_page {
            return Err(QuarryError::RecordMiss(rid));
        }
        debug_assert_eq!(record.data().len(), self.header.rec_size);

        let mut guard = self.bpm.fetch_page(self.table_id, rid.page_id)?;
        let mut unlink_next = None;
        {
            let mut data = guard.data_mut();
            let mut handle = page_handle(
                &self.header,
                self.storage_model,
                &self.schema,
                &self.field_offsets,
                &mut data[..],
            );
            if handle.slot_occupied(rid.slot_id) {
                return Err(QuarryError::RecordExists(rid));
            }
            handle.write_slot(rid.slot_id, record.nullmap(), record.data(), false);
            handle.set_slot_bit(rid.slot_id, true);
            if handle.is_full() {
                unlink_next = Some(handle.next_free_page_id());
                handle.set_next_free_page_id(INVALID_PAGE_ID);
            }
        }
        guard.mark_dirty();
        drop(guard);

        self.header.rec_num += 1;
        if let Some(next) = unlink_next {
            self.header.first_free_page = next;
        }
        Ok(())
    }

    /// Clears the slot at `rid`. The payload bytes are left in place; the
    /// bitmap bit is the authority on occupancy.
    pub fn delete_record(&mut self, rid: Rid) -> Result<()> {
        self.check_rid(rid)?;
        let mut guard = self.bpm.fetch_page(self.table_id, rid.page_id)?;

        let mut relink = false;
        {
            let mut data = guard.data_mut();
            let mut handle = page_handle(
                &self.header,
                self.storage_model,
                &self.schema,
                &self.field_offsets,
                &mut data[..],
            );
            if !handle.slot_occupied(rid.slot_id) {
                return Err(QuarryError::RecordMiss(rid));
            }
            let was_full = handle.is_full();
            handle.set_slot_bit(rid.slot_id, false);
            // A previously-full page regains a free slot: thread it back in
            // at the head of the free list
            if was_full {
                handle.set_next_free_page_id(self.header.first_free_page);
                relink = true;
            }
        }
        guard.mark_dirty();
        drop(guard);

        self.header.rec_num -= 1;
        if relink {
            self.header.first_free_page = rid.page_id;
        }
        Ok(())
    }

    /// Overwrites the record at `rid` in place. The RID stays stable.
    pub fn update_record(&mut self, rid: Rid, record: &Record) -> Result<()> {
        self.check_rid(rid)?;
        debug_assert_eq!(record.data().len(), self.header.rec_size);
        let mut guard = self.bpm.fetch_page(self.table_id, rid.page_id)?;

        {
            let mut data = guard.data_mut();
            let mut handle = page_handle(
                &self.header,
                self.storage_model,
                &self.schema,
                &self.field_offsets,
                &mut data[..],
            );
            if !handle.slot_occupied(rid.slot_id) {
                return Err(QuarryError::RecordMiss(rid));
            }
            handle.write_slot(rid.slot_id, record.nullmap(), record.data(), true);
        }
        guard.mark_dirty();
        Ok(())
    }

    /// The RID of the first record in `(page_id, slot_id)` order, or
    /// `INVALID_RID` for an empty table. Scanning starts at page 1; page 0
    /// is the file header.
    pub fn first_rid(&self) -> Result<Rid> {
        self.scan_from(FILE_HEADER_PAGE_ID.as_u32() + 1, 0)
    }

    /// The RID following `rid` in `(page_id, slot_id)` order, or
    /// `INVALID_RID` at the end.
    pub fn next_rid(&self, rid: Rid) -> Result<Rid> {
        if rid.is_invalid() {
            return Ok(INVALID_RID);
        }
        self.scan_from(rid.page_id.as_u32(), rid.slot_id.as_usize() + 1)
    }

    fn scan_from(&self, mut page_id: u32, mut start_slot: usize) -> Result<Rid> {
        while page_id < self.header.page_num {
            let mut guard = self.bpm.fetch_page(self.table_id, PageId::new(page_id))?;
            let mut data = guard.data_mut();
            let handle = page_handle(
                &self.header,
                self.storage_model,
                &self.schema,
                &self.field_offsets,
                &mut data[..],
            );
            if let Some(slot) = handle.find_occupied_slot(start_slot) {
                return Ok(Rid::new(PageId::new(page_id), slot));
            }
            page_id += 1;
            start_slot = 0;
        }
        Ok(INVALID_RID)
    }

    /// Persists the table header and flushes the file's dirty pages.
    pub fn flush(&self) -> Result<()> {
        self.write_header_page()?;
        self.bpm.flush_all_pages(self.table_id)?;
        Ok(())
    }

    fn write_header_page(&self) -> Result<()> {
        let mut guard = self.bpm.fetch_page(self.table_id, FILE_HEADER_PAGE_ID)?;
        {
            let mut data = guard.data_mut();
            encode_header_page(
                &self.header,
                self.storage_model,
                &self.schema,
                &mut data[..],
            );
        }
        guard.mark_dirty();
        Ok(())
    }

    /// Allocates the next page id, threads the page in at the head of the
    /// free list, and returns it pinned. The caller performs the insert.
    fn allocate_page<'a>(
        bpm: &'a BufferPoolManager,
        table_id: FileId,
        header: &mut TableHeader,
    ) -> Result<PageGuard<'a>> {
        let pid = PageId::new(header.page_num);
        let mut guard = bpm.fetch_page(table_id, pid)?;
        header.page_num += 1;
        {
            let mut data = guard.data_mut();
            page::set_page_id(&mut data[..], pid);
            page::set_next_free_page_id(&mut data[..], header.first_free_page);
        }
        guard.mark_dirty();
        header.first_free_page = pid;
        log::debug!("table {} allocated page {}", table_id, pid);
        Ok(guard)
    }

    /// Maps RIDs that cannot address a slot of this table to `RecordMiss`.
    fn check_rid(&self, rid: Rid) -> Result<()> {
        if rid.page_id == INVALID_PAGE_ID
            || rid.page_id.as_u32() >= self.header.page_num
            || rid.page_id == FILE_HEADER_PAGE_ID
            || rid.slot_id.as_usize() >= self.header.rec_per_page
        {
            return Err(QuarryError::RecordMiss(rid));
        }
        Ok(())
    }
}

impl Drop for TableHandle {
    fn drop(&mut self) {
        // Best-effort persistence; explicit flush() reports errors
        let _ = self.flush();
    }
}
