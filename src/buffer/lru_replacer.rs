use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::common::FrameId;

use super::Replacer;

struct LruInner {
    /// Recency queue, least recently pinned at the front
    entries: VecDeque<(FrameId, bool)>,
    /// Count of evictable entries
    cur_size: usize,
}

/// Classic LRU replacement.
///
/// Keeps frames in a recency queue: a pin moves the frame to the tail
/// (most recent) and clears its evictable flag, an unpin flips the flag in
/// place, and a victim scan takes the first evictable frame from the head.
pub struct LruReplacer {
    inner: Mutex<LruInner>,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LruInner {
                entries: VecDeque::new(),
                cur_size: 0,
            }),
        }
    }
}

impl Default for LruReplacer {
    fn default() -> Self {
        Self::new()
    }
}

impl Replacer for LruReplacer {
    fn victim(&self) -> Option<FrameId> {
        let mut inner = self.inner.lock();
        let pos = inner.entries.iter().position(|&(_, evictable)| evictable)?;
        let (frame_id, _) = inner.entries.remove(pos).unwrap();
        inner.cur_size -= 1;
        Some(frame_id)
    }

    fn pin(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock();
        if let Some(pos) = inner.entries.iter().position(|&(id, _)| id == frame_id) {
            if inner.entries[pos].1 {
                inner.cur_size -= 1;
            }
            inner.entries.remove(pos);
        }
        inner.entries.push_back((frame_id, false));
    }

    fn unpin(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock();
        match inner.entries.iter().position(|&(id, _)| id == frame_id) {
            Some(pos) => {
                // Already-evictable frames are left untouched
                if !inner.entries[pos].1 {
                    inner.entries[pos].1 = true;
                    inner.cur_size += 1;
                }
            }
            None => {
                inner.entries.push_back((frame_id, true));
                inner.cur_size += 1;
            }
        }
    }

    fn remove(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock();
        if let Some(pos) = inner.entries.iter().position(|&(id, _)| id == frame_id) {
            if inner.entries[pos].1 {
                inner.cur_size -= 1;
            }
            inner.entries.remove(pos);
        }
    }

    fn size(&self) -> usize {
        self.inner.lock().cur_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_victim_order_is_pin_order() {
        let replacer = LruReplacer::new();
        replacer.pin(FrameId::new(1));
        replacer.pin(FrameId::new(2));
        replacer.unpin(FrameId::new(1));
        replacer.unpin(FrameId::new(2));

        assert_eq!(replacer.size(), 2);
        assert_eq!(replacer.victim(), Some(FrameId::new(1)));
        assert_eq!(replacer.victim(), Some(FrameId::new(2)));
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_pin_moves_to_tail() {
        let replacer = LruReplacer::new();
        for i in 0..3 {
            replacer.pin(FrameId::new(i));
            replacer.unpin(FrameId::new(i));
        }

        // Re-pinning frame 0 makes it most recent and not evictable
        replacer.pin(FrameId::new(0));
        assert_eq!(replacer.size(), 2);
        assert_eq!(replacer.victim(), Some(FrameId::new(1)));
        assert_eq!(replacer.victim(), Some(FrameId::new(2)));
        assert_eq!(replacer.victim(), None);

        replacer.unpin(FrameId::new(0));
        assert_eq!(replacer.victim(), Some(FrameId::new(0)));
    }

    #[test]
    fn test_unpin_is_idempotent() {
        let replacer = LruReplacer::new();
        replacer.pin(FrameId::new(4));
        replacer.unpin(FrameId::new(4));
        replacer.unpin(FrameId::new(4));
        assert_eq!(replacer.size(), 1);
    }

    #[test]
    fn test_unpin_unknown_frame_is_tracked() {
        let replacer = LruReplacer::new();
        replacer.unpin(FrameId::new(9));
        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.victim(), Some(FrameId::new(9)));
    }

    #[test]
    fn test_remove() {
        let replacer = LruReplacer::new();
        replacer.pin(FrameId::new(1));
        replacer.unpin(FrameId::new(1));
        replacer.remove(FrameId::new(1));
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_pinned_frames_skipped() {
        let replacer = LruReplacer::new();
        replacer.pin(FrameId::new(1));
        replacer.pin(FrameId::new(2));
        replacer.unpin(FrameId::new(2));

        // Frame 1 is older but pinned
        assert_eq!(replacer.victim(), Some(FrameId::new(2)));
        assert_eq!(replacer.victim(), None);
    }
}
