use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::RwLock;

use crate::common::{FileId, FrameId, PageId, PAGE_SIZE};

/// One slot of the buffer pool: page bytes plus frame metadata. Frames are
/// created when the pool is constructed and reused for its whole lifetime.
/// A frame is in use iff its pin count is positive.
pub struct Frame {
    /// The frame ID (index in the buffer pool)
    frame_id: FrameId,
    /// Back-reference to the resident page, None while the frame is free
    identity: RwLock<Option<(FileId, PageId)>>,
    /// Number of callers currently holding this frame pinned
    pin_count: AtomicU32,
    /// Whether the page has been modified since it was last flushed
    is_dirty: AtomicBool,
    /// The page bytes
    data: RwLock<Box<[u8; PAGE_SIZE]>>,
}

impl Frame {
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            identity: RwLock::new(None),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
            data: RwLock::new(Box::new([0u8; PAGE_SIZE])),
        }
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// The `(fid, pid)` this frame holds, if any.
    pub fn identity(&self) -> Option<(FileId, PageId)> {
        *self.identity.read()
    }

    pub fn set_identity(&self, fid: FileId, pid: PageId) {
        *self.identity.write() = Some((fid, pid));
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    pub fn in_use(&self) -> bool {
        self.pin_count() > 0
    }

    /// Increments the pin count and returns the new value.
    pub fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrements the pin count and returns the new value.
    /// Returns None if the pin count was already 0.
    pub fn unpin(&self) -> Option<u32> {
        loop {
            let current = self.pin_count.load(Ordering::Acquire);
            if current == 0 {
                return None;
            }
            if self
                .pin_count
                .compare_exchange(current, current - 1, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return Some(current - 1);
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Acquire)
    }

    pub fn set_dirty(&self, dirty: bool) {
        self.is_dirty.store(dirty, Ordering::Release);
    }

    /// Returns a read guard to the page bytes.
    pub fn read_data(&self) -> parking_lot::RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.data.read()
    }

    /// Returns a write guard to the page bytes.
    pub fn write_data(&self) -> parking_lot::RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.data.write()
    }

    /// Returns the frame to its initial, free state.
    pub fn reset(&self) {
        *self.identity.write() = None;
        self.pin_count.store(0, Ordering::Release);
        self.is_dirty.store(false, Ordering::Release);
        self.data.write().fill(0);
    }
}
