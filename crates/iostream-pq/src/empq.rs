//! External-memory priority queue, ported from `em_pqueue<T,Key>` in
//! `empq_impl.h`. An in-memory min-max heap holds the smallest live
//! elements; everything that does not fit cascades through a chain of
//! `EmBuffer` levels, doubling the structure's capacity at every additional
//! level.
//!
//! Sizing follows the component design: the in-memory heap capacity `p`,
//! Buffer0 capacity `b`, and each `EmBuffer` level's stream arity `a` are
//! three distinct values derived from one memory budget, not one arity
//! reused for all three roles.

use bytemuck::{Pod, Zeroable};

use iostream_core::budget::MemoryBudget;
use iostream_core::comparator::Comparator;
use iostream_core::config::Config;
use iostream_core::error::{Error, Result};

use iostream_mem::accountant::{Accountant, AccountantGuard};
use iostream_stream::buffer0::Buffer0;

use crate::embuffer::EmBuffer;
use crate::minmax::MinMaxHeap;

/// `p`, `b`, and `a` derived from one memory budget, per the component
/// design's Sizing step.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PqSizing {
    /// In-memory min-max heap capacity, in items.
    pub p: usize,
    /// Buffer0 capacity, in items.
    pub b: usize,
    /// Stream arity of each `EmBuffer` level.
    pub a: usize,
}

/// Lower bound the component design places on `a` "for safety": below this
/// a buffer level cascades on almost every insert, defeating the point of
/// batching streams into a level at all.
const MIN_EM_ARITY: usize = 3;

/// Splits `acc.memory_available()` into `p`, `b`, and `a`: `p` and `b` each
/// get a quarter of the budget (a half each in `save_memory` mode, where EM
/// buffer stream data is kept evicted off-heap and so isn't competing for
/// the same budget), and `a` gets whatever's left after that, divided by the
/// per-stream overhead `cfg.stream_buffer_size` across up to
/// `cfg.pq_max_buffer_levels` levels.
pub(crate) fn size_for_budget<T>(acc: &Accountant, cfg: &Config) -> PqSizing {
    let item_size = std::mem::size_of::<T>().max(1);
    let available = acc.memory_available();
    let max_levels = cfg.pq_max_buffer_levels.max(1);

    let (pq_bytes, buf0_bytes) = if cfg.save_memory {
        (available / 2, available / 2)
    } else {
        (available / 4, available / 4)
    };

    let a = if cfg.save_memory {
        cfg.max_streams_open
    } else {
        let overheads = pq_bytes + buf0_bytes;
        let denom = 2 * max_levels * cfg.stream_buffer_size.max(1);
        available.saturating_sub(overheads) / denom.max(1)
    };

    PqSizing {
        p: (pq_bytes / item_size).max(1),
        b: (buf0_bytes / item_size).max(1),
        a: a.max(MIN_EM_ARITY).min(cfg.max_streams_open.max(MIN_EM_ARITY)),
    }
}

pub struct ExternalPQueue<T: Pod + Zeroable + Copy, C: Comparator<T> + Clone> {
    cfg: Config,
    cmp: C,
    acc: Accountant,
    sizing: PqSizing,
    buffer0: Buffer0<T>,
    pq: MinMaxHeap<T, C>,
    levels: Vec<EmBuffer<T>>,
    /// One accounted guard per active level, covering that level's
    /// `a * cfg.stream_buffer_size` worth of open-stream buffer overhead.
    /// `None` when the guard couldn't be acquired (memory pressure) or the
    /// level has not been activated yet.
    level_guards: Vec<Option<AccountantGuard>>,
    /// Number of levels that currently hold at least one stream.
    crt_buf: usize,
    _pq_guard: Option<AccountantGuard>,
    _buf0_guard: Option<AccountantGuard>,
}

impl<T: Pod + Zeroable + Copy, C: Comparator<T> + Clone> ExternalPQueue<T, C> {
    pub fn new(cfg: Config, cmp: C) -> Self {
        let acc = Accountant::new(cfg.mem_cap_bytes, cfg.memory_policy);
        Self::with_accountant(cfg, cmp, acc)
    }

    pub(crate) fn with_accountant(cfg: Config, cmp: C, acc: Accountant) -> Self {
        let sizing = size_for_budget::<T>(&acc, &cfg);
        tracing::debug!(p = sizing.p, b = sizing.b, a = sizing.a, "sized external priority queue");
        let pq_guard = acc.try_acquire(sizing.p * std::mem::size_of::<T>(), "em_pq_heap");
        let buf0_guard = acc.try_acquire(sizing.b * std::mem::size_of::<T>(), "em_pq_buffer0");
        Self {
            buffer0: Buffer0::new(sizing.b),
            pq: MinMaxHeap::bounded(sizing.p, cmp.clone()),
            levels: Vec::new(),
            level_guards: Vec::new(),
            crt_buf: 0,
            acc,
            sizing,
            cfg,
            cmp,
            _pq_guard: pq_guard,
            _buf0_guard: buf0_guard,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pq.is_empty() && self.buffer0.is_empty() && self.crt_buf == 0
    }

    fn pqsize(&self) -> usize {
        self.sizing.p
    }

    /// Acquires a level's stream-buffer overhead guard if one isn't already
    /// held, warning (not failing) if the accountant can't fit it — the EM
    /// buffer hierarchy still has to run under memory pressure, just with
    /// less of its true footprint tracked.
    fn ensure_level_guard(&mut self, i: usize) {
        while self.level_guards.len() <= i {
            self.level_guards.push(None);
        }
        if self.level_guards[i].is_some() {
            return;
        }
        let bytes = self.sizing.a * self.cfg.stream_buffer_size;
        match self.acc.try_acquire(bytes, "em_buffer_level") {
            Some(guard) => self.level_guards[i] = Some(guard),
            None => tracing::warn!(
                level = i,
                bytes,
                available = self.acc.memory_available(),
                "em buffer level exceeds available memory; proceeding unaccounted"
            ),
        }
    }

    /// Inserts `x`. Mirrors `em_pqueue::insert`: if the in-memory heap
    /// isn't full, `x` (or the value it displaces) goes straight in;
    /// otherwise it lands in Buffer0, cascading to disk if Buffer0 is full.
    pub fn insert(&mut self, x: T) -> Result<()> {
        let val = if self.is_empty() && !self.pq.is_full() {
            self.pq.insert(x)?;
            return Ok(());
        } else if let Some(pqmax) = self.pq.max() {
            if self.cmp.le(&x, &pqmax) && !self.pq.is_full() {
                self.pq.insert(x)?;
                return Ok(());
            } else if self.cmp.le(&x, &pqmax) {
                let evicted = self.pq.extract_max().expect("pq.max() just returned Some");
                self.pq.insert(x)?;
                evicted
            } else {
                x
            }
        } else {
            x
        };

        if self.buffer0.is_full() {
            self.empty_buff_0()?;
        }
        self.buffer0.insert(val)
    }

    fn empty_buff_0(&mut self) -> Result<()> {
        debug_assert!(self.buffer0.is_full());
        self.buffer0.sort_with_cutoff(self.cfg.insertion_sort_cutoff, &self.cmp);
        let stream = self.buffer0.save_to_stream(&self.cfg)?;
        self.buffer0.clear();

        if self.levels.is_empty() {
            self.levels.push(EmBuffer::new(1, self.sizing.a));
        }
        self.ensure_level_guard(0);
        if self.levels[0].is_full() {
            self.empty_buff(0)?;
        }
        self.levels[0].insert_stream(stream)?;
        self.crt_buf = self.crt_buf.max(1);
        Ok(())
    }

    /// Cascades level `i` up into level `i+1`, merging level `i`'s streams
    /// into a single run first. Mirrors `em_pqueue::empty_buff`, including
    /// its fail-loud behavior once `max_nbuf` levels are exhausted (see the
    /// component design's note on why `max_nbuf` is a fixed ceiling).
    fn empty_buff(&mut self, i: usize) -> Result<()> {
        debug_assert!(i < self.crt_buf);
        debug_assert!(self.levels[i].is_full());

        if i + 1 >= self.cfg.pq_max_buffer_levels {
            return Err(Error::InsufficientAvailableStreams(
                format!("external priority queue exhausted all {} buffer levels", self.cfg.pq_max_buffer_levels),
                self.cfg.max_streams_open,
            ));
        }

        if self.levels.len() <= i + 1 {
            self.levels.push(EmBuffer::new((i + 2) as u32, self.sizing.a));
        }
        self.ensure_level_guard(i + 1);
        if self.levels[i + 1].is_full() {
            self.empty_buff(i + 1)?;
        }

        let merged = self.levels[i].merge_all(&self.cfg, &self.cmp)?;
        // Level `i` just gave up every stream it held; its accounted
        // overhead goes with them until it's reactivated.
        if i < self.level_guards.len() {
            self.level_guards[i] = None;
        }
        self.levels[i + 1].insert_stream(merged)?;
        self.crt_buf = self.crt_buf.max(i + 2);
        Ok(())
    }

    /// Refills the in-memory heap from the buffer-level hierarchy, mirroring
    /// `fillpq`: each active level contributes its smallest `pqsize` items,
    /// and those contributions are merged together if more than one level
    /// is active.
    fn fillpq(&mut self) -> Result<()> {
        let pqsize = self.pqsize();
        let mut level_items: Vec<Vec<T>> = Vec::with_capacity(self.crt_buf);
        for i in 0..self.crt_buf {
            if self.levels[i].is_empty() {
                level_items.push(Vec::new());
                continue;
            }
            let mut prefix = self.levels[i].merge_prefix(&self.cfg, &self.cmp, pqsize)?;
            let mut items = Vec::new();
            while let Ok(item) = prefix.read_item() {
                items.push(item);
            }
            level_items.push(items);
        }

        let merged = k_way_merge_vecs(&self.cmp, level_items, pqsize);
        self.pq.fill(&merged);
        Ok(())
    }

    fn ensure_pq_filled(&mut self) -> Result<()> {
        if !self.pq.is_empty() {
            return Ok(());
        }
        if self.crt_buf == 0 {
            if !self.buffer0.is_empty() {
                self.buffer0.sort_with_cutoff(self.cfg.insertion_sort_cutoff, &self.cmp);
                self.pq.fill(self.buffer0.as_slice());
                self.buffer0.clear();
            }
        } else {
            self.fillpq()?;
        }
        Ok(())
    }

    pub fn min(&mut self) -> Result<Option<T>> {
        self.ensure_pq_filled()?;
        Ok(self.pq.min())
    }

    pub fn extract_min(&mut self) -> Result<Option<T>> {
        self.ensure_pq_filled()?;
        Ok(self.pq.extract_min())
    }

    /// Extracts the minimum and folds in every subsequent element that
    /// compares equal to it, mirroring `extract_all_min`.
    pub fn extract_all_min<F>(&mut self, combine: F) -> Result<Option<T>>
    where
        F: Fn(T, T) -> T,
    {
        self.ensure_pq_filled()?;
        Ok(self.pq.extract_all_min(combine))
    }
}

/// Merges already-sorted per-level vectors into one sorted vector, capped at
/// `limit` items. Small inputs (each at most `pqsize`), so a plain
/// repeated-scan merge is simpler and fast enough here; the heavy k-way
/// merging happens on disk inside `EmBuffer::merge_prefix`/`merge_all`.
fn k_way_merge_vecs<T: Copy, C: Comparator<T>>(
    cmp: &C,
    mut lists: Vec<Vec<T>>,
    limit: usize,
) -> Vec<T> {
    let mut cursors = vec![0usize; lists.len()];
    let mut out = Vec::with_capacity(limit);
    while out.len() < limit {
        let mut best: Option<usize> = None;
        for (li, list) in lists.iter().enumerate() {
            if cursors[li] >= list.len() {
                continue;
            }
            best = match best {
                None => Some(li),
                Some(bi) => {
                    if cmp.lt(&list[cursors[li]], &lists[bi][cursors[bi]]) {
                        Some(li)
                    } else {
                        Some(bi)
                    }
                }
            };
        }
        match best {
            Some(li) => {
                out.push(lists[li][cursors[li]]);
                cursors[li] += 1;
            }
            None => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use iostream_core::comparator::NaturalOrder;

    fn new_pq() -> ExternalPQueue<i32, NaturalOrder> {
        ExternalPQueue::new(Config::default(), NaturalOrder)
    }

    #[test]
    fn sizing_splits_budget_into_three_distinct_roles() {
        let cfg = Config {
            mem_cap_bytes: 64,
            ..Config::default()
        };
        let acc = Accountant::new(cfg.mem_cap_bytes, cfg.memory_policy);
        let sizing = size_for_budget::<i32>(&acc, &cfg);
        // p and b each get a quarter of 64 bytes (16 bytes / 4-byte items).
        assert_eq!(sizing.p, 4);
        assert_eq!(sizing.b, 4);
        // stream_buffer_size dwarfs the 32-byte remainder, so a floors at
        // the safety minimum rather than going to zero.
        assert_eq!(sizing.a, 3);
    }

    #[test]
    fn extracts_in_sorted_order_within_memory_capacity() {
        let mut pq = new_pq();
        for v in [5, 3, 8, 1, 9, 2] {
            pq.insert(v).unwrap();
        }
        let mut out = vec![];
        while let Some(v) = pq.extract_min().unwrap() {
            out.push(v);
        }
        assert_eq!(out, vec![1, 2, 3, 5, 8, 9]);
    }

    #[test]
    fn spills_to_disk_and_still_extracts_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            mem_cap_bytes: 64, // b = p = 4 items for i32
            stream_dir: Some(dir.path().to_string_lossy().into_owned()),
            ..Config::default()
        };
        let mut pq = ExternalPQueue::new(cfg, NaturalOrder);
        let mut input: Vec<i32> = (0..50).rev().collect();
        for v in input.drain(..) {
            pq.insert(v).unwrap();
        }
        let mut out = vec![];
        while let Some(v) = pq.extract_min().unwrap() {
            out.push(v);
        }
        assert_eq!(out, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn extract_all_min_combines_duplicates() {
        let mut pq = new_pq();
        for v in [1, 1, 2, 2, 2, 3] {
            pq.insert(v).unwrap();
        }
        let first = pq.extract_all_min(|a, b| a + b).unwrap().unwrap();
        assert_eq!(first, 2);
        let second = pq.extract_all_min(|a, b| a + b).unwrap().unwrap();
        assert_eq!(second, 6);
    }
}
