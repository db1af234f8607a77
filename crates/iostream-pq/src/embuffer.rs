//! `EmBuffer`: one level B_i of the external-memory priority queue's
//! cascading buffer hierarchy. Each level holds up to `arity` sorted
//! streams (runs); when full, its streams are k-way merged into a single
//! new run that is pushed to the next level up.
//!
//! Grounded in `em_buffer`'s role in `empq_impl.h`'s `empty_buff`/
//! `fillpq`/`merge_buffer` trio. This port collapses that trio's per-source
//! deleted-counter bookkeeping into two direct operations — merge the whole
//! level (`merge_all`, used when cascading a full level up) and merge a
//! bounded prefix without consuming the rest (`merge_prefix`, used to
//! refill the in-memory top of the queue) — rather than tracking partial
//! consumption per source stream explicitly.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bytemuck::{Pod, Zeroable};

use iostream_core::comparator::Comparator;
use iostream_core::config::Config;
use iostream_core::error::Result;

use iostream_stream::stream::Stream;

struct MergeEntry<T> {
    item: T,
    source: usize,
}

/// Wraps the `Comparator` so `BinaryHeap` (a max-heap) yields the smallest
/// entry first, the same inversion the teacher's `MergeEntry: Ord` applies
/// in `emsqrt-operators::sort::external`.
struct Reverse<'a, T, C> {
    entry: MergeEntry<T>,
    cmp: &'a C,
}

impl<'a, T, C: Comparator<T>> PartialEq for Reverse<'a, T, C> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp.compare(&self.entry.item, &other.entry.item) == Ordering::Equal
    }
}
impl<'a, T, C: Comparator<T>> Eq for Reverse<'a, T, C> {}
impl<'a, T, C: Comparator<T>> PartialOrd for Reverse<'a, T, C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<'a, T, C: Comparator<T>> Ord for Reverse<'a, T, C> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp
            .compare(&self.entry.item, &other.entry.item)
            .reverse()
    }
}

pub struct EmBuffer<T: Pod + Zeroable + Copy> {
    level: u32,
    arity: usize,
    streams: Vec<Stream<T>>,
}

impl<T: Pod + Zeroable + Copy> EmBuffer<T> {
    pub fn new(level: u32, arity: usize) -> Self {
        Self {
            level,
            arity,
            streams: Vec::with_capacity(arity),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_full(&self) -> bool {
        self.streams.len() >= self.arity
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn insert_stream(&mut self, s: Stream<T>) -> Result<()> {
        debug_assert!(!self.is_full(), "em_buffer level {} overflowed its arity", self.level);
        self.streams.push(s);
        Ok(())
    }

    /// K-way merges every stream at this level into one freshly written
    /// stream, and empties the level. Used when cascading a full level to
    /// the one above it.
    pub fn merge_all<C: Comparator<T>>(&mut self, cfg: &Config, cmp: &C) -> Result<Stream<T>> {
        let mut streams = std::mem::take(&mut self.streams);
        let out = merge_k_way(cfg, cmp, &mut streams, None)?;
        Ok(out)
    }

    /// K-way merges up to `k` items across this level's streams into a
    /// fresh stream, without discarding the unread remainder of any source
    /// stream. Used to refill the in-memory top of the queue.
    pub fn merge_prefix<C: Comparator<T>>(
        &mut self,
        cfg: &Config,
        cmp: &C,
        k: usize,
    ) -> Result<Stream<T>> {
        merge_k_way(cfg, cmp, &mut self.streams, Some(k))
    }
}

/// Core k-way merge: drains `limit` items (or all, if `None`) from
/// `sources` in sorted order into a fresh anonymous stream. Sources are
/// consumed in place — their read cursors advance — so calling this twice
/// with `limit` continues where the previous call left off.
fn merge_k_way<T: Pod + Zeroable + Copy, C: Comparator<T>>(
    cfg: &Config,
    cmp: &C,
    sources: &mut [Stream<T>],
    limit: Option<usize>,
) -> Result<Stream<T>> {
    let mut heap: BinaryHeap<Reverse<T, C>> = BinaryHeap::new();
    for (idx, s) in sources.iter_mut().enumerate() {
        if let Ok(item) = s.read_item() {
            heap.push(Reverse {
                entry: MergeEntry { item, source: idx },
                cmp,
            });
        }
    }

    let mut out = Stream::new_anonymous(cfg)?;
    let mut written = 0usize;
    while let Some(Reverse { entry, .. }) = heap.pop() {
        if let Some(k) = limit {
            if written >= k {
                // This item was already read off its source stream to seed
                // the heap comparison; rewind that stream by one item so a
                // later merge_prefix call picks it up again.
                let src = &mut sources[entry.source];
                let back = src.current_offset()?.saturating_sub(1);
                src.seek(back)?;
                break;
            }
        }
        out.write_item(&entry.item)?;
        written += 1;
        if let Ok(next) = sources[entry.source].read_item() {
            heap.push(Reverse {
                entry: MergeEntry {
                    item: next,
                    source: entry.source,
                },
                cmp,
            });
        }
    }
    out.flush()?;
    out.seek(0)?;
    Ok(out)
}
