use std::collections::btree_map;
use std::iter::FusedIterator;

use roaring::{RoaringBitmap, bitmap};

use crate::index::{ShardIndex, Shards};
use crate::{Treemap, join, split};

/// Ascending iterator over the values of a [`Treemap`].
///
/// Besides [`Iterator`], it can look at the next value without consuming it
/// and skip forward to a lower bound.
pub struct Iter<'a> {
    index: &'a ShardIndex,
    shards: Shards<'a>,
    current: Option<(u32, bitmap::Iter<'a>)>,
    next: Option<u64>,
}

impl<'a> Iter<'a> {
    fn new(index: &'a ShardIndex) -> Self {
        let mut iter = Iter {
            index,
            shards: index.iter(),
            current: None,
            next: None,
        };
        iter.next = iter.pull();
        iter
    }

    /// Take the next value from the active shard, moving on to the following
    /// shards once it runs dry.
    fn pull(&mut self) -> Option<u64> {
        loop {
            if let Some((high, values)) = &mut self.current {
                if let Some(low) = values.next() {
                    return Some(join(*high, low));
                }
            }

            match self.shards.next() {
                Some((high, bitmap)) => self.current = Some((high, bitmap.iter())),
                None => {
                    self.current = None;
                    return None;
                }
            }
        }
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// The value the next call to [`next`](Iterator::next) will return.
    pub fn peek_next(&self) -> Option<u64> {
        self.next
    }

    /// Skip values until the next one is at least `min`.
    ///
    /// Shards entirely below `min` are skipped through the index without
    /// being visited. Does nothing if the next value already satisfies the
    /// bound or the iterator is exhausted.
    pub fn advance_if_needed(&mut self, min: u64) {
        match self.next {
            Some(next) if next < min => {}
            _ => return,
        }

        let (high, low) = split(min);

        if !matches!(&self.current, Some((key, _)) if *key == high) {
            self.shards = self.index.range(high..);
            self.current = self
                .shards
                .next()
                .map(|(key, bitmap)| (key, bitmap.iter()));
        }

        if let Some((key, values)) = &mut self.current {
            if *key == high {
                values.advance_to(low);
            }
        }

        self.next = self.pull();
    }
}

impl Iterator for Iter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let value = self.next?;
        self.next = self.pull();
        Some(value)
    }
}

impl FusedIterator for Iter<'_> {}

/// Descending iterator over the values of a [`Treemap`].
pub struct RevIter<'a> {
    shards: Shards<'a>,
    current: Option<(u32, bitmap::Iter<'a>)>,
    next: Option<u64>,
}

impl<'a> RevIter<'a> {
    fn new(index: &'a ShardIndex) -> Self {
        let mut iter = RevIter {
            shards: index.iter(),
            current: None,
            next: None,
        };
        iter.next = iter.pull();
        iter
    }

    fn pull(&mut self) -> Option<u64> {
        loop {
            if let Some((high, values)) = &mut self.current {
                if let Some(low) = values.next_back() {
                    return Some(join(*high, low));
                }
            }

            match self.shards.next_back() {
                Some((high, bitmap)) => self.current = Some((high, bitmap.iter())),
                None => {
                    self.current = None;
                    return None;
                }
            }
        }
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn peek_next(&self) -> Option<u64> {
        self.next
    }
}

impl Iterator for RevIter<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let value = self.next?;
        self.next = self.pull();
        Some(value)
    }
}

impl FusedIterator for RevIter<'_> {}

/// Bulk iterator filling caller-provided buffers in ascending order.
pub struct ManyIter<'a> {
    shards: Shards<'a>,
    current: Option<(u32, bitmap::Iter<'a>)>,
}

impl<'a> ManyIter<'a> {
    fn new(index: &'a ShardIndex) -> Self {
        let mut shards = index.iter();
        let current = shards.next().map(|(high, bitmap)| (high, bitmap.iter()));
        ManyIter { shards, current }
    }

    /// Fill `buf` with as many of the remaining values as fit and return how
    /// many were written. A return of 0 with a non-empty `buf` means the
    /// iterator is exhausted.
    pub fn next_many(&mut self, buf: &mut [u64]) -> usize {
        let mut filled = 0;

        while filled < buf.len() {
            let Some((high, values)) = self.current.as_mut() else {
                break;
            };
            let high = *high;

            for (slot, low) in buf[filled..].iter_mut().zip(values.by_ref()) {
                *slot = join(high, low);
                filled += 1;
            }

            if filled < buf.len() {
                self.current = self
                    .shards
                    .next()
                    .map(|(high, bitmap)| (high, bitmap.iter()));
            }
        }

        filled
    }
}

/// Owning ascending iterator over the values of a [`Treemap`].
pub struct IntoIter {
    shards: btree_map::IntoIter<u32, RoaringBitmap>,
    current: Option<(u32, bitmap::IntoIter)>,
}

impl Iterator for IntoIter {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        loop {
            if let Some((high, values)) = &mut self.current {
                if let Some(low) = values.next() {
                    return Some(join(*high, low));
                }
            }

            match self.shards.next() {
                Some((high, bitmap)) => self.current = Some((high, bitmap.into_iter())),
                None => {
                    self.current = None;
                    return None;
                }
            }
        }
    }
}

impl FusedIterator for IntoIter {}

impl Treemap {
    /// Ascending iterator supporting peeking and seeking.
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(&self.index)
    }

    /// Descending iterator.
    pub fn rev_iter(&self) -> RevIter<'_> {
        RevIter::new(&self.index)
    }

    /// Bulk iterator, see [`ManyIter::next_many`].
    pub fn many_iter(&self) -> ManyIter<'_> {
        ManyIter::new(&self.index)
    }
}

impl<'a> IntoIterator for &'a Treemap {
    type Item = u64;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl IntoIterator for Treemap {
    type Item = u64;
    type IntoIter = IntoIter;

    fn into_iter(self) -> IntoIter {
        IntoIter {
            shards: self.index.into_inner().into_iter(),
            current: None,
        }
    }
}
