//! Adaptive priority queue: starts as a pure in-memory `MinMaxHeap` and
//! promotes itself to a full `ExternalPQueue` the moment an insert would
//! exceed twice Buffer0's capacity `b` — the point past which the original
//! `empq_adaptive_impl.h` abandons the single in-memory heap regime. `2 * b`
//! is chosen so the promotion splits the heap's contents into exactly two
//! even halves with no rounding, using the same `b` the promoted
//! `ExternalPQueue` will size its own Buffer0 to.

use bytemuck::{Pod, Zeroable};

use iostream_core::comparator::Comparator;
use iostream_core::config::Config;
use iostream_core::error::Result;

use iostream_mem::accountant::Accountant;

use crate::empq::{size_for_budget, ExternalPQueue};
use crate::minmax::MinMaxHeap;

enum Regime<T: Pod + Zeroable + Copy, C: Comparator<T> + Clone> {
    InMemory(MinMaxHeap<T, C>),
    External(ExternalPQueue<T, C>),
}

pub struct AdaptivePQueue<T: Pod + Zeroable + Copy, C: Comparator<T> + Clone> {
    cfg: Config,
    cmp: C,
    regime: Regime<T, C>,
    promotion_threshold: usize,
}

impl<T: Pod + Zeroable + Copy, C: Comparator<T> + Clone> AdaptivePQueue<T, C> {
    pub fn new(cfg: Config, cmp: C) -> Self {
        let acc = Accountant::new(cfg.mem_cap_bytes, cfg.memory_policy);
        let threshold = 2 * size_for_budget::<T>(&acc, &cfg).b;
        Self {
            regime: Regime::InMemory(MinMaxHeap::unbounded(Some(threshold), cmp.clone())),
            promotion_threshold: threshold,
            cfg,
            cmp,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self.regime, Regime::External(_))
    }

    pub fn len(&self) -> usize {
        match &self.regime {
            Regime::InMemory(h) => h.len(),
            // The external regime does not track total size cheaply; the
            // in-memory top is all that's resident, the rest lives on disk.
            Regime::External(_) => usize::MAX,
        }
    }

    fn promote(&mut self) -> Result<()> {
        let Regime::InMemory(heap) = &mut self.regime else {
            return Ok(());
        };
        let mut ext = ExternalPQueue::new(self.cfg.clone(), self.cmp.clone());
        while let Some(v) = heap.extract_min() {
            ext.insert(v)?;
        }
        self.regime = Regime::External(ext);
        Ok(())
    }

    pub fn insert(&mut self, x: T) -> Result<()> {
        if let Regime::InMemory(heap) = &mut self.regime {
            if heap.len() >= self.promotion_threshold {
                self.promote()?;
            }
        }
        match &mut self.regime {
            Regime::InMemory(heap) => heap.insert(x),
            Regime::External(ext) => ext.insert(x),
        }
    }

    pub fn min(&mut self) -> Result<Option<T>> {
        match &mut self.regime {
            Regime::InMemory(heap) => Ok(heap.min()),
            Regime::External(ext) => ext.min(),
        }
    }

    pub fn extract_min(&mut self) -> Result<Option<T>> {
        match &mut self.regime {
            Regime::InMemory(heap) => Ok(heap.extract_min()),
            Regime::External(ext) => ext.extract_min(),
        }
    }

    pub fn extract_all_min<F>(&mut self, combine: F) -> Result<Option<T>>
    where
        F: Fn(T, T) -> T,
    {
        match &mut self.regime {
            Regime::InMemory(heap) => Ok(heap.extract_all_min(combine)),
            Regime::External(ext) => ext.extract_all_min(combine),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iostream_core::comparator::NaturalOrder;

    #[test]
    fn stays_in_memory_below_threshold() {
        let cfg = Config::default();
        let mut pq = AdaptivePQueue::new(cfg, NaturalOrder);
        for v in [3, 1, 2] {
            pq.insert(v).unwrap();
        }
        assert!(!pq.is_external());
        assert_eq!(pq.extract_min().unwrap(), Some(1));
    }

    #[test]
    fn promotes_and_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            mem_cap_bytes: 64, // b = 4 items for i32, promotion threshold = 8
            stream_dir: Some(dir.path().to_string_lossy().into_owned()),
            ..Config::default()
        };
        let mut pq = AdaptivePQueue::new(cfg, NaturalOrder);
        let values: Vec<i32> = (0..40).rev().collect();
        for v in values {
            pq.insert(v).unwrap();
        }
        assert!(pq.is_external());
        let mut out = vec![];
        while let Some(v) = pq.extract_min().unwrap() {
            out.push(v);
        }
        assert_eq!(out, (0..40).collect::<Vec<_>>());
    }
}
