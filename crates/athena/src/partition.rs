//! Splits an ordered date list into fixed-size batches.

use std::vec;

/// Default number of dates started together before the batch barrier.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Lazy, consuming iterator over owned batches. Created by [`chunk`].
#[derive(Debug)]
pub struct Chunks<T> {
    items: vec::IntoIter<T>,
    size: usize,
}

/// Partition `items` into batches of at most `size`, preserving order.
///
/// The final batch may be shorter. A `size` of 0 is treated as 1.
pub fn chunk<T>(items: Vec<T>, size: usize) -> Chunks<T> {
    Chunks {
        items: items.into_iter(),
        size: size.max(1),
    }
}

impl<T> Iterator for Chunks<T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        let batch: Vec<T> = self.items.by_ref().take(self.size).collect();
        if batch.is_empty() { None } else { Some(batch) }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.items.len().div_ceil(self.size);
        (n, Some(n))
    }
}

impl<T> ExactSizeIterator for Chunks<T> {}
