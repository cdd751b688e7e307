use crate::common::{FrameId, ReplacerConfig};

use super::{LruKReplacer, LruReplacer};

/// Victim selector over frame ids. The buffer pool tells the replacer which
/// frames are pinned (never eligible) and which are unpinned (eligible), and
/// asks it to pick a victim when the pool is full.
///
/// Every operation of one replacer is atomic under its internal mutex.
pub trait Replacer: Send + Sync {
    /// Picks one evictable frame, removes it from tracking, and returns it.
    fn victim(&self) -> Option<FrameId>;

    /// Records an access and marks the frame not-evictable. Frames unknown
    /// to the replacer are implicitly created.
    fn pin(&self, frame_id: FrameId);

    /// Marks the frame evictable; it is tracked from now on.
    fn unpin(&self, frame_id: FrameId);

    /// Drops the frame from tracking entirely. Used when the pool returns a
    /// frame to its free list, so a free frame can never double as a victim
    /// candidate.
    fn remove(&self, frame_id: FrameId);

    /// Number of currently evictable frames.
    fn size(&self) -> usize;
}

/// Builds the replacer selected by the configuration.
pub fn build_replacer(config: ReplacerConfig) -> Box<dyn Replacer> {
    match config {
        ReplacerConfig::Lru => Box::new(LruReplacer::new()),
        ReplacerConfig::LruK { k } => Box::new(LruKReplacer::new(k)),
    }
}
