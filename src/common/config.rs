/// Size of a page in bytes (4 KB)
pub const PAGE_SIZE: usize = 4096;

/// Invalid page ID constant
pub const INVALID_PAGE_ID: PageId = PageId(u32::MAX);

/// Invalid frame ID constant
pub const INVALID_FRAME_ID: FrameId = FrameId(u32::MAX);

/// Sentinel RID marking end-of-sequence
pub const INVALID_RID: Rid = Rid::new(INVALID_PAGE_ID, SlotId(u16::MAX));

/// Page 0 of every table file holds the table header, never records
pub const FILE_HEADER_PAGE_ID: PageId = PageId(0);

/// Default K value for LRU-K replacement policy
pub const DEFAULT_LRU_K: usize = 2;

/// Default buffer pool size (number of frames)
pub const DEFAULT_BUFFER_POOL_SIZE: usize = 64;

/// Replacement policy selected at buffer-pool construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacerConfig {
    Lru,
    LruK { k: usize },
}

/// Process-wide default replacer choice
pub const DEFAULT_REPLACER: ReplacerConfig = ReplacerConfig::LruK { k: DEFAULT_LRU_K };

use super::types::{FrameId, PageId, Rid, SlotId};
