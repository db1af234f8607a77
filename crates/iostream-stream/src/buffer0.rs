//! B0: the bounded in-memory staging buffer records land in before they are
//! ever written to disk. Lives in this crate, rather than in the sort
//! engine, so both `Stream<T>::new_substream` consumers and the sort
//! engine's run generator can share one capacity-bounded sort buffer without
//! a dependency cycle between the stream and sort crates.

use bytemuck::{Pod, Zeroable};

use iostream_core::comparator::Comparator;
use iostream_core::config::Config;
use iostream_core::error::{Error, Result};
use iostream_core::sortalg;

use crate::stream::Stream;

/// Fixed-capacity in-memory buffer of records, filled by insertion and
/// drained by sorting it and writing it out as a new anonymous stream.
pub struct Buffer0<T: Pod + Zeroable + Copy> {
    data: Vec<T>,
    capacity: usize,
    sorted: bool,
}

impl<T: Pod + Zeroable + Copy> Buffer0<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            sorted: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Inserts one item. Fails if the buffer is already at capacity; the
    /// caller (sort engine / EM priority queue) is responsible for
    /// flushing before inserting further.
    pub fn insert(&mut self, item: T) -> Result<()> {
        if self.is_full() {
            return Err(Error::OutOfRange("buffer0 is full".to_string()));
        }
        self.data.push(item);
        self.sorted = false;
        Ok(())
    }

    /// Inserts as many items from `items` as fit, returning the number
    /// consumed.
    pub fn insert_array(&mut self, items: &[T]) -> usize {
        let free = self.capacity - self.data.len();
        let n = free.min(items.len());
        self.data.extend_from_slice(&items[..n]);
        if n > 0 {
            self.sorted = false;
        }
        n
    }

    /// Sorts the buffer's contents in place using the shared quicksort.
    pub fn sort<C: Comparator<T>>(&mut self, cmp: &C) {
        sortalg::quicksort(&mut self.data, cmp);
        self.sorted = true;
    }

    /// Sorts the buffer's contents using `cutoff` as the insertion-sort
    /// threshold, for callers that honor `Config::insertion_sort_cutoff`.
    pub fn sort_with_cutoff<C: Comparator<T>>(&mut self, cutoff: usize, cmp: &C) {
        sortalg::quicksort_with_threshold(&mut self.data, cmp, cutoff);
        self.sorted = true;
    }

    /// Drops the first `n` elements, shifting the remainder to the front.
    /// Used after co-merging a prefix of the buffer into a priority queue.
    pub fn shift_left(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.data.drain(..n.min(self.data.len()));
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.sorted = false;
    }

    /// Writes the (sorted) contents to a fresh anonymous stream and returns
    /// it, positioned at the start for reading.
    pub fn save_to_stream(&self, cfg: &Config) -> Result<Stream<T>> {
        let mut stream = Stream::new_anonymous(cfg)?;
        stream.write_array(&self.data)?;
        stream.flush()?;
        stream.seek(0)?;
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iostream_core::comparator::NaturalOrder;

    #[test]
    fn insert_respects_capacity() {
        let mut buf: Buffer0<i32> = Buffer0::new(2);
        buf.insert(1).unwrap();
        buf.insert(2).unwrap();
        assert!(buf.insert(3).is_err());
    }

    #[test]
    fn sort_orders_contents() {
        let mut buf: Buffer0<i32> = Buffer0::new(8);
        for v in [5, 1, 4, 2, 3] {
            buf.insert(v).unwrap();
        }
        buf.sort(&NaturalOrder);
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4, 5]);
        assert!(buf.is_sorted());
    }

    #[test]
    fn shift_left_drops_prefix() {
        let mut buf: Buffer0<i32> = Buffer0::new(8);
        for v in [1, 2, 3, 4] {
            buf.insert(v).unwrap();
        }
        buf.shift_left(2);
        assert_eq!(buf.as_slice(), &[3, 4]);
    }

    #[test]
    fn save_to_stream_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            stream_dir: Some(dir.path().to_string_lossy().into_owned()),
            ..Config::default()
        };
        let mut buf: Buffer0<i32> = Buffer0::new(4);
        for v in [3, 1, 2] {
            buf.insert(v).unwrap();
        }
        buf.sort(&NaturalOrder);
        let mut stream = buf.save_to_stream(&cfg).unwrap();
        assert_eq!(stream.read_item().unwrap(), 1);
        assert_eq!(stream.read_item().unwrap(), 2);
        assert_eq!(stream.read_item().unwrap(), 3);
        assert!(matches!(stream.read_item(), Err(Error::EndOfStream)));
    }
}
