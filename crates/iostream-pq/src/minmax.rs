//! Min-max heap: a single array-backed heap supporting both
//! `extract_min` and `extract_max` in O(log n), ported from
//! `BasicMinMaxHeap<T>` / `MinMaxHeap<T>` / `UnboundedMinMaxHeap<T>` in
//! `minmaxheap.h`.
//!
//! Levels alternate min/max by `floor(log2(index))` parity, 1-indexed with
//! slot 0 unused. `Bounded` growth mirrors the original's `MinMaxHeap`,
//! which panics rather than growing; `Unbounded` mirrors
//! `UnboundedMinMaxHeap`, which doubles capacity starting from 1024.

use iostream_core::comparator::Comparator;
use iostream_core::error::{Error, Result};

type HeapIndex = usize;

const MMHEAP_INITIAL_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Growth {
    Bounded,
    Unbounded,
}

/// Array-backed min-max heap over `T`, ordered by `C`.
pub struct MinMaxHeap<T: Copy, C: Comparator<T>> {
    data: Vec<T>,
    maxsize: HeapIndex,
    lastindex: HeapIndex,
    cmp: C,
    growth: Growth,
}

impl<T: Copy, C: Comparator<T>> MinMaxHeap<T, C> {
    /// A fixed-capacity heap that refuses further inserts once full,
    /// matching the original `MinMaxHeap<T>`.
    pub fn bounded(capacity: usize, cmp: C) -> Self {
        Self::with_growth(capacity, cmp, Growth::Bounded)
    }

    /// A heap that doubles its capacity on overflow, matching
    /// `UnboundedMinMaxHeap<T>`. `initial_capacity` defaults to
    /// `MMHEAP_INITIAL_SIZE` (1024) when `None`.
    pub fn unbounded(initial_capacity: Option<usize>, cmp: C) -> Self {
        Self::with_growth(
            initial_capacity.unwrap_or(MMHEAP_INITIAL_SIZE),
            cmp,
            Growth::Unbounded,
        )
    }

    fn with_growth(capacity: usize, cmp: C, growth: Growth) -> Self {
        assert!(capacity > 0, "min-max heap capacity must be positive");
        Self {
            data: Vec::with_capacity(capacity + 1),
            maxsize: capacity,
            lastindex: 0,
            cmp,
            growth,
        }
    }

    pub fn len(&self) -> usize {
        self.lastindex
    }

    pub fn is_empty(&self) -> bool {
        self.lastindex == 0
    }

    pub fn is_full(&self) -> bool {
        self.lastindex >= self.maxsize
    }

    pub fn capacity(&self) -> usize {
        self.maxsize
    }

    /// Discards all elements without shrinking the backing array.
    pub fn clear(&mut self) {
        self.lastindex = 0;
        self.data.clear();
    }

    fn grow(&mut self) -> Result<()> {
        match self.growth {
            Growth::Bounded => Err(Error::InsufficientMainMemory(
                "bounded min-max heap is full".to_string(),
            )),
            Growth::Unbounded => {
                self.maxsize *= 2;
                Ok(())
            }
        }
    }

    pub fn insert(&mut self, elt: T) -> Result<()> {
        if self.lastindex == self.maxsize {
            self.grow()?;
        }
        self.lastindex += 1;
        if self.data.len() <= self.lastindex {
            self.data.resize(self.lastindex + 1, elt);
        }
        self.data[self.lastindex] = elt;
        self.bubble_up(self.lastindex);
        Ok(())
    }

    /// Inserts as many of `items` as fit, returning the count that did not
    /// fit (always 0 for an unbounded heap), matching `MinMaxHeap::fill`.
    pub fn fill(&mut self, items: &[T]) -> usize {
        assert!(self.is_empty(), "fill requires an empty heap");
        let mut i = 0;
        while !self.is_full() && i < items.len() {
            self.insert(items[i]).expect("fill: insert into heap");
            i += 1;
        }
        items.len() - i
    }

    pub fn min(&self) -> Option<T> {
        if self.lastindex == 0 {
            None
        } else {
            Some(self.data[1])
        }
    }

    pub fn max(&self) -> Option<T> {
        if self.lastindex == 0 {
            None
        } else if self.has_children(1) {
            Some(self.data[self.largest_child(1)])
        } else {
            Some(self.data[1])
        }
    }

    pub fn extract_min(&mut self) -> Option<T> {
        if self.lastindex == 0 {
            return None;
        }
        let elt = self.data[1];
        self.data[1] = self.data[self.lastindex];
        self.lastindex -= 1;
        self.trickle_down(1);
        Some(elt)
    }

    pub fn extract_max(&mut self) -> Option<T> {
        if self.lastindex == 0 {
            return None;
        }
        let p = if self.has_children(1) {
            self.largest_child(1)
        } else {
            1
        };
        let elt = self.data[p];
        self.data[p] = self.data[self.lastindex];
        self.lastindex -= 1;
        self.trickle_down(p);
        Some(elt)
    }

    /// Extracts the minimum and every subsequent element comparing equal to
    /// it, folding them together with `combine`. Mirrors
    /// `extract_all_min`'s `elt = elt + next_elt` accumulation loop.
    pub fn extract_all_min<F>(&mut self, combine: F) -> Option<T>
    where
        F: Fn(T, T) -> T,
    {
        let mut elt = self.extract_min()?;
        loop {
            match self.min() {
                Some(next) if self.cmp.compare(&next, &elt) == std::cmp::Ordering::Equal => {
                    let next = self.extract_min().unwrap();
                    elt = combine(elt, next);
                }
                _ => break,
            }
        }
        Some(elt)
    }

    // ---- internal heap machinery, ported 1:1 from minmaxheap.h ----

    fn log2(n: HeapIndex) -> i64 {
        let mut n = n;
        let mut i: i64 = -1;
        while n != 0 {
            n >>= 1;
            i += 1;
        }
        i
    }

    fn is_on_min_level(i: HeapIndex) -> bool {
        Self::log2(i) % 2 == 0
    }

    fn left_child(i: HeapIndex) -> HeapIndex {
        2 * i
    }

    fn right_child(i: HeapIndex) -> HeapIndex {
        2 * i + 1
    }

    fn has_right_child(&self, i: HeapIndex) -> bool {
        Self::right_child(i) <= self.lastindex
    }

    fn parent(i: HeapIndex) -> HeapIndex {
        i / 2
    }

    fn grandparent(i: HeapIndex) -> HeapIndex {
        i / 4
    }

    fn has_children(&self, i: HeapIndex) -> bool {
        2 * i <= self.lastindex
    }

    fn is_grandchild_of(i: HeapIndex, m: HeapIndex) -> bool {
        m >= i * 4
    }

    fn smallest_child(&self, i: HeapIndex) -> HeapIndex {
        let l = Self::left_child(i);
        if self.has_right_child(i) {
            let r = Self::right_child(i);
            if self.cmp.gt(&self.data[l], &self.data[r]) {
                return r;
            }
        }
        l
    }

    fn largest_child(&self, i: HeapIndex) -> HeapIndex {
        let l = Self::left_child(i);
        if self.has_right_child(i) {
            let r = Self::right_child(i);
            if self.cmp.lt(&self.data[l], &self.data[r]) {
                return r;
            }
        }
        l
    }

    fn smallest_child_grandchild(&self, i: HeapIndex) -> HeapIndex {
        let mut p = Self::left_child(i);
        if self.has_children(p) {
            let q = self.smallest_child(p);
            if self.cmp.gt(&self.data[p], &self.data[q]) {
                p = q;
            }
        }
        let mut minpos = p;

        if self.has_right_child(i) {
            let mut p = Self::right_child(i);
            if self.has_children(p) {
                let q = self.smallest_child(p);
                if self.cmp.gt(&self.data[p], &self.data[q]) {
                    p = q;
                }
            }
            if self.cmp.lt(&self.data[p], &self.data[minpos]) {
                minpos = p;
            }
        }
        minpos
    }

    fn largest_child_grandchild(&self, i: HeapIndex) -> HeapIndex {
        let mut p = Self::left_child(i);
        if self.has_children(p) {
            let q = self.largest_child(p);
            if self.cmp.lt(&self.data[p], &self.data[q]) {
                p = q;
            }
        }
        let mut maxpos = p;

        if self.has_right_child(i) {
            let mut p = Self::right_child(i);
            if self.has_children(p) {
                let q = self.largest_child(p);
                if self.cmp.lt(&self.data[p], &self.data[q]) {
                    p = q;
                }
            }
            if self.cmp.gt(&self.data[p], &self.data[maxpos]) {
                maxpos = p;
            }
        }
        maxpos
    }

    fn swap(&mut self, a: HeapIndex, b: HeapIndex) {
        self.data.swap(a, b);
    }

    fn trickle_down_min(&mut self, mut i: HeapIndex) {
        loop {
            if !self.has_children(i) {
                return;
            }
            let m = self.smallest_child_grandchild(i);
            if Self::is_grandchild_of(i, m) {
                if self.cmp.lt(&self.data[m], &self.data[i]) {
                    self.swap(i, m);
                    let p = Self::parent(m);
                    if self.cmp.gt(&self.data[m], &self.data[p]) {
                        self.swap(m, p);
                    }
                    i = m;
                } else {
                    return;
                }
            } else {
                if self.cmp.lt(&self.data[m], &self.data[i]) {
                    self.swap(i, m);
                }
                return;
            }
        }
    }

    fn trickle_down_max(&mut self, mut i: HeapIndex) {
        loop {
            if !self.has_children(i) {
                return;
            }
            let m = self.largest_child_grandchild(i);
            if Self::is_grandchild_of(i, m) {
                if self.cmp.gt(&self.data[m], &self.data[i]) {
                    self.swap(i, m);
                    let p = Self::parent(m);
                    if self.cmp.lt(&self.data[m], &self.data[p]) {
                        self.swap(m, p);
                    }
                    i = m;
                } else {
                    return;
                }
            } else {
                if self.cmp.gt(&self.data[m], &self.data[i]) {
                    self.swap(i, m);
                }
                return;
            }
        }
    }

    fn trickle_down(&mut self, i: HeapIndex) {
        if Self::is_on_min_level(i) {
            self.trickle_down_min(i);
        } else {
            self.trickle_down_max(i);
        }
    }

    fn bubble_up_min(&mut self, mut i: HeapIndex) {
        let mut m = Self::grandparent(i);
        while m != 0 && self.cmp.lt(&self.data[i], &self.data[m]) {
            self.swap(i, m);
            i = m;
            m = Self::grandparent(i);
        }
    }

    fn bubble_up_max(&mut self, mut i: HeapIndex) {
        let mut m = Self::grandparent(i);
        while m != 0 && self.cmp.gt(&self.data[i], &self.data[m]) {
            self.swap(i, m);
            i = m;
            m = Self::grandparent(i);
        }
    }

    fn bubble_up(&mut self, i: HeapIndex) {
        let m = Self::parent(i);
        if Self::is_on_min_level(i) {
            if m != 0 && self.cmp.gt(&self.data[i], &self.data[m]) {
                self.swap(i, m);
                self.bubble_up_max(m);
            } else {
                self.bubble_up_min(i);
            }
        } else if m != 0 && self.cmp.lt(&self.data[i], &self.data[m]) {
            self.swap(i, m);
            self.bubble_up_min(m);
        } else {
            self.bubble_up_max(i);
        }
    }
}
