//! Reductions of many sets into one.
//!
//! The `fast_*` functions fold the inputs pairwise from left to right. The
//! `heap_*` functions repeatedly merge the two smallest candidates (by
//! [`Treemap::size_in_bytes`]), which keeps the total merge work low when the
//! inputs vary widely in size.

use std::borrow::Cow;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use tracing::trace;

use crate::Treemap;

/// Intersection of all `treemaps`.
///
/// No input yields an empty set, a single input yields a copy of it.
pub fn fast_and<'a, I>(treemaps: I) -> Treemap
where
    I: IntoIterator<Item = &'a Treemap>,
{
    let mut treemaps = treemaps.into_iter();
    let Some(first) = treemaps.next() else {
        return Treemap::new();
    };

    let mut result = first.clone();
    for treemap in treemaps {
        if result.is_empty() {
            break;
        }
        result.and(treemap);
    }
    result
}

/// Union of all `treemaps`.
pub fn fast_or<'a, I>(treemaps: I) -> Treemap
where
    I: IntoIterator<Item = &'a Treemap>,
{
    treemaps.into_iter().fold(Treemap::new(), |mut acc, treemap| {
        acc.or(treemap);
        acc
    })
}

/// Symmetric difference of all `treemaps`: the values present in an odd
/// number of inputs.
pub fn fast_xor<'a, I>(treemaps: I) -> Treemap
where
    I: IntoIterator<Item = &'a Treemap>,
{
    treemaps.into_iter().fold(Treemap::new(), |mut acc, treemap| {
        acc.xor(treemap);
        acc
    })
}

/// Union of all `treemaps`, merging the smallest candidates first.
pub fn heap_or<'a, I>(treemaps: I) -> Treemap
where
    I: IntoIterator<Item = &'a Treemap>,
{
    heap_reduce(treemaps, Treemap::or)
}

/// Symmetric difference of all `treemaps`, merging the smallest candidates
/// first.
pub fn heap_xor<'a, I>(treemaps: I) -> Treemap
where
    I: IntoIterator<Item = &'a Treemap>,
{
    heap_reduce(treemaps, Treemap::xor)
}

fn heap_reduce<'a, I>(treemaps: I, merge: fn(&mut Treemap, &Treemap)) -> Treemap
where
    I: IntoIterator<Item = &'a Treemap>,
{
    let mut heap: BinaryHeap<Reverse<Candidate<'a>>> = treemaps
        .into_iter()
        .enumerate()
        .map(|(seq, treemap)| Reverse(Candidate::new(seq, Cow::Borrowed(treemap))))
        .collect();
    let mut seq = heap.len();

    loop {
        let Some(Reverse(smallest)) = heap.pop() else {
            return Treemap::new();
        };
        let Some(Reverse(next)) = heap.pop() else {
            return smallest.treemap.into_owned();
        };

        trace!(
            lhs_bytes = smallest.size,
            rhs_bytes = next.size,
            remaining = heap.len(),
            "merging candidates"
        );

        let mut merged = smallest.treemap.into_owned();
        merge(&mut merged, &next.treemap);

        heap.push(Reverse(Candidate::new(seq, Cow::Owned(merged))));
        seq += 1;
    }
}

/// A heap entry: an input or an intermediate result, prioritized by size.
struct Candidate<'a> {
    size: u64,
    seq: usize,
    treemap: Cow<'a, Treemap>,
}

impl<'a> Candidate<'a> {
    fn new(seq: usize, treemap: Cow<'a, Treemap>) -> Self {
        Self {
            size: treemap.size_in_bytes(),
            seq,
            treemap,
        }
    }
}

impl PartialEq for Candidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate<'_> {}

impl PartialOrd for Candidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.size, self.seq).cmp(&(other.size, other.seq))
    }
}
