use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FileId, PageId, PAGE_SIZE};

use super::{BufferPoolManager, Frame};

/// RAII pin on one resident page.
///
/// The guard records the `(fid, pid)` it pins and an intended dirty flag, and
/// releases the pin exactly once when dropped, on every exit path. Callers
/// that mutate the page bytes must call [`mark_dirty`](Self::mark_dirty)
/// after a successful mutation; the flag is passed to the pool's unpin, which
/// ORs it into the frame's dirty state.
pub struct PageGuard<'a> {
    pool: &'a BufferPoolManager,
    frame: Arc<Frame>,
    fid: FileId,
    pid: PageId,
    dirty: bool,
}

impl<'a> PageGuard<'a> {
    pub(crate) fn new(
        pool: &'a BufferPoolManager,
        frame: Arc<Frame>,
        fid: FileId,
        pid: PageId,
    ) -> Self {
        Self {
            pool,
            frame,
            fid,
            pid,
            dirty: false,
        }
    }

    pub fn file_id(&self) -> FileId {
        self.fid
    }

    pub fn page_id(&self) -> PageId {
        self.pid
    }

    /// Locks the page bytes for reading.
    pub fn data(&self) -> RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.frame.read_data()
    }

    /// Locks the page bytes for writing. Does not mark the page dirty on its
    /// own; pair mutations with `mark_dirty`.
    pub fn data_mut(&mut self) -> RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.frame.write_data()
    }

    /// Records that the page was mutated during this pin interval.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        self.pool.unpin_page(self.fid, self.pid, self.dirty);
    }
}
