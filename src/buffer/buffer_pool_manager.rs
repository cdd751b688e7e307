use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::{FileId, FrameId, PageId, QuarryError, ReplacerConfig, Result};
use crate::storage::disk::DiskManager;

use super::{build_replacer, Frame, PageGuard, Replacer};

struct PoolState {
    /// Maps resident `(fid, pid)` pairs to their frame
    lookup: HashMap<(FileId, PageId), FrameId>,
    /// Frames not currently holding any page
    free_list: VecDeque<FrameId>,
}

/// Fixed-size cache of pages between the executors and the disk manager.
///
/// Every public operation serializes on one state mutex; disk I/O for misses,
/// write-backs, and flushes happens while it is held. Eviction is delegated
/// to the configured [`Replacer`].
pub struct BufferPoolManager {
    pool_size: usize,
    frames: Vec<Arc<Frame>>,
    state: Mutex<PoolState>,
    replacer: Box<dyn Replacer>,
    disk: Arc<DiskManager>,
}

impl BufferPoolManager {
    pub fn new(disk: Arc<DiskManager>, pool_size: usize, replacer: ReplacerConfig) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);
        for i in 0..pool_size {
            let frame_id = FrameId::new(i as u32);
            frames.push(Arc::new(Frame::new(frame_id)));
            free_list.push_back(frame_id);
        }

        Self {
            pool_size,
            frames,
            state: Mutex::new(PoolState {
                lookup: HashMap::new(),
                free_list,
            }),
            replacer: build_replacer(replacer),
            disk,
        }
    }

    /// Fetches a page, pinning its frame. The returned guard holds the pin
    /// (`pin_count >= 1`) and releases it on drop.
    ///
    /// On a miss the page is read through the disk manager into a free frame,
    /// evicting a victim (with write-back if dirty) when the free list is
    /// empty. Fails with `NoFreeFrame` when every frame is pinned.
    pub fn fetch_page(&self, fid: FileId, pid: PageId) -> Result<PageGuard<'_>> {
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.lookup.get(&(fid, pid)) {
            let frame = &self.frames[frame_id.as_usize()];
            frame.pin();
            self.replacer.pin(frame_id);
            drop(state);
            return Ok(PageGuard::new(self, Arc::clone(frame), fid, pid));
        }

        let frame_id = self.acquire_frame(&mut state)?;
        let frame = &self.frames[frame_id.as_usize()];
        frame.reset();
        frame.set_identity(fid, pid);

        {
            let mut data = frame.write_data();
            if let Err(e) = self.disk.read_page(fid, pid, &mut data[..]) {
                drop(data);
                frame.reset();
                state.free_list.push_back(frame_id);
                return Err(e);
            }
        }

        frame.pin();
        self.replacer.pin(frame_id);
        state.lookup.insert((fid, pid), frame_id);
        drop(state);

        Ok(PageGuard::new(self, Arc::clone(frame), fid, pid))
    }

    /// Releases one pin on a resident page, ORing `is_dirty` into the frame's
    /// dirty flag. Returns false if the page is not resident or its frame is
    /// not in use.
    pub fn unpin_page(&self, fid: FileId, pid: PageId, is_dirty: bool) -> bool {
        let state = self.state.lock();

        let Some(&frame_id) = state.lookup.get(&(fid, pid)) else {
            return false;
        };
        let frame = &self.frames[frame_id.as_usize()];
        if !frame.in_use() {
            return false;
        }

        if let Some(0) = frame.unpin() {
            self.replacer.unpin(frame_id);
        }
        if is_dirty {
            frame.set_dirty(true);
        }
        true
    }

    /// Writes a resident dirty page back to disk and clears its dirty flag.
    /// Returns false if the page is not resident; pin state is unchanged.
    pub fn flush_page(&self, fid: FileId, pid: PageId) -> Result<bool> {
        let state = self.state.lock();

        let Some(&frame_id) = state.lookup.get(&(fid, pid)) else {
            return Ok(false);
        };
        let frame = &self.frames[frame_id.as_usize()];

        if frame.is_dirty() {
            let data = frame.read_data();
            self.disk.write_page(fid, pid, &data[..])?;
            frame.set_dirty(false);
            log::trace!("flushed page ({}, {})", fid, pid);
        }
        Ok(true)
    }

    /// Flushes every dirty resident page belonging to `fid`.
    pub fn flush_all_pages(&self, fid: FileId) -> Result<bool> {
        let state = self.state.lock();

        for (&(f, pid), &frame_id) in state.lookup.iter() {
            if f != fid {
                continue;
            }
            let frame = &self.frames[frame_id.as_usize()];
            if frame.is_dirty() {
                let data = frame.read_data();
                self.disk.write_page(fid, pid, &data[..])?;
                frame.set_dirty(false);
            }
        }
        Ok(true)
    }

    /// Drops a page from the pool, flushing it first if dirty. Returns true
    /// if the page is absent afterwards; false if it is pinned and cannot be
    /// dropped.
    pub fn delete_page(&self, fid: FileId, pid: PageId) -> Result<bool> {
        let mut state = self.state.lock();
        self.delete_resident(&mut state, fid, pid)
    }

    /// Best-effort delete of every resident page of `fid`. Returns false if
    /// any page was pinned (the others are still dropped).
    pub fn delete_all_pages(&self, fid: FileId) -> Result<bool> {
        let mut state = self.state.lock();
        let pids: Vec<PageId> = state
            .lookup
            .keys()
            .filter(|(f, _)| *f == fid)
            .map(|&(_, pid)| pid)
            .collect();

        let mut success = true;
        for pid in pids {
            success &= self.delete_resident(&mut state, fid, pid)?;
        }
        Ok(success)
    }

    fn delete_resident(&self, state: &mut PoolState, fid: FileId, pid: PageId) -> Result<bool> {
        let Some(&frame_id) = state.lookup.get(&(fid, pid)) else {
            return Ok(true);
        };
        let frame = &self.frames[frame_id.as_usize()];
        if frame.in_use() {
            return Ok(false);
        }

        if frame.is_dirty() {
            let data = frame.read_data();
            self.disk.write_page(fid, pid, &data[..])?;
            frame.set_dirty(false);
        }

        frame.reset();
        state.lookup.remove(&(fid, pid));
        state.free_list.push_back(frame_id);
        self.replacer.remove(frame_id);
        Ok(true)
    }

    /// Pops a free frame, or evicts a victim (writing it back if dirty) and
    /// returns its frame with the old mapping removed.
    fn acquire_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = self.replacer.victim().ok_or(QuarryError::NoFreeFrame)?;
        let frame = &self.frames[frame_id.as_usize()];

        if let Some((old_fid, old_pid)) = frame.identity() {
            if frame.is_dirty() {
                let data = frame.read_data();
                if let Err(e) = self.disk.write_page(old_fid, old_pid, &data[..]) {
                    // Write-back failed: restore the frame's victim candidacy
                    self.replacer.unpin(frame_id);
                    return Err(e);
                }
                frame.set_dirty(false);
            }
            state.lookup.remove(&(old_fid, old_pid));
            log::debug!("evicted page ({}, {}) from {}", old_fid, old_pid, frame_id);
        }

        Ok(frame_id)
    }

    /// Current pin count of a resident page, for tests and diagnostics.
    pub fn pin_count(&self, fid: FileId, pid: PageId) -> Option<u32> {
        let state = self.state.lock();
        state
            .lookup
            .get(&(fid, pid))
            .map(|&frame_id| self.frames[frame_id.as_usize()].pin_count())
    }

    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn disk(&self) -> &Arc<DiskManager> {
        &self.disk
    }
}
