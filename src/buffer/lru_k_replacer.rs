use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::common::{FrameId, Timestamp};

use super::Replacer;

/// Access history of a single frame
struct LruKNode {
    /// Last K access timestamps, most recent at the back
    history: VecDeque<Timestamp>,
    evictable: bool,
}

impl LruKNode {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            evictable: false,
        }
    }

    fn record_access(&mut self, ts: Timestamp, k: usize) {
        self.history.push_back(ts);
        while self.history.len() > k {
            self.history.pop_front();
        }
    }

    /// Backward k-distance from `cur_ts`, or None when the frame has fewer
    /// than k recorded accesses (treated as infinite distance).
    fn k_distance(&self, cur_ts: Timestamp, k: usize) -> Option<Timestamp> {
        if self.history.len() < k {
            None
        } else {
            Some(cur_ts - self.history[self.history.len() - k])
        }
    }

    fn first_access(&self) -> Timestamp {
        *self.history.front().expect("node without history")
    }
}

struct LruKInner {
    nodes: HashMap<FrameId, LruKNode>,
    /// Monotone counter advanced on every pin
    cur_ts: Timestamp,
    /// Count of evictable frames
    cur_size: usize,
}

/// LRU-K replacement.
///
/// Evicts the evictable frame with the largest backward k-distance, where the
/// distance is the age of the k-th most recent access. Frames with fewer than
/// k accesses have infinite distance and take priority, ordered by their
/// first access; ties among finite distances break the same way.
pub struct LruKReplacer {
    k: usize,
    inner: Mutex<LruKInner>,
}

impl LruKReplacer {
    pub fn new(k: usize) -> Self {
        assert!(k > 0, "k must be positive");
        Self {
            k,
            inner: Mutex::new(LruKInner {
                nodes: HashMap::new(),
                cur_ts: 0,
                cur_size: 0,
            }),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

impl Replacer for LruKReplacer {
    fn victim(&self) -> Option<FrameId> {
        let mut inner = self.inner.lock();
        if inner.cur_size == 0 {
            return None;
        }
        let cur_ts = inner.cur_ts;

        // First pass: frames with fewer than k accesses, earliest first access wins
        let mut victim: Option<(FrameId, Timestamp)> = None;
        for (&frame_id, node) in &inner.nodes {
            if !node.evictable || node.history.len() >= self.k {
                continue;
            }
            let first = node.first_access();
            if victim.map_or(true, |(_, best)| first < best) {
                victim = Some((frame_id, first));
            }
        }

        // Second pass: maximum backward k-distance, ties by earliest first access
        if victim.is_none() {
            let mut best: Option<(FrameId, Timestamp, Timestamp)> = None;
            for (&frame_id, node) in &inner.nodes {
                if !node.evictable {
                    continue;
                }
                let Some(distance) = node.k_distance(cur_ts, self.k) else {
                    continue;
                };
                let first = node.first_access();
                let better = match best {
                    None => true,
                    Some((_, best_dist, best_first)) => {
                        distance > best_dist || (distance == best_dist && first < best_first)
                    }
                };
                if better {
                    best = Some((frame_id, distance, first));
                }
            }
            victim = best.map(|(frame_id, _, first)| (frame_id, first));
        }

        let (frame_id, _) = victim?;
        inner.nodes.remove(&frame_id);
        inner.cur_size -= 1;
        Some(frame_id)
    }

    fn pin(&self, frame_id: FrameId) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.cur_ts += 1;

        let node = inner.nodes.entry(frame_id).or_insert_with(LruKNode::new);
        node.record_access(inner.cur_ts, self.k);
        if node.evictable {
            node.evictable = false;
            inner.cur_size -= 1;
        }
    }

    fn unpin(&self, frame_id: FrameId) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if let Some(node) = inner.nodes.get_mut(&frame_id) {
            if !node.evictable {
                node.evictable = true;
                inner.cur_size += 1;
            }
        }
    }

    fn remove(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock();
        if let Some(node) = inner.nodes.remove(&frame_id) {
            if node.evictable {
                inner.cur_size -= 1;
            }
        }
    }

    fn size(&self) -> usize {
        self.inner.lock().cur_size
    }
}
