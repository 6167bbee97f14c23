use std::fmt;
use std::ops::{Bound, RangeBounds, RangeInclusive};

use roaring::RoaringBitmap;
use tracing::trace;

use crate::index::{ShardIndex, Shards};
use crate::serialization::SerializationFormat;
use crate::statistics::Statistics;
use crate::{Error, Result, join, split};

/// Values written by [`Display`](fmt::Display) before the output is cut short.
const DISPLAY_LIMIT: usize = 0x40000;

/// A compressed set of `u64` values.
///
/// Values are grouped by their high 32 bits into shards, each an independent
/// [`RoaringBitmap`] over the low 32 bits. Shards are kept in ascending key
/// order, and a shard is dropped as soon as it becomes empty, with one
/// exception: [`and_not`](Self::and_not) leaves emptied shards in place.
#[derive(Clone, Default)]
pub struct Treemap {
    pub(crate) index: ShardIndex,
    pub(crate) format: SerializationFormat,
}

static_assertions::assert_impl_all!(Treemap: Send, Sync);

impl Treemap {
    /// Create an empty set that serializes with the native format.
    pub const fn new() -> Self {
        Self {
            index: ShardIndex::new(),
            format: SerializationFormat::Native,
        }
    }

    /// Select the wire format used by [`serialize_into`](Self::serialize_into)
    /// and [`deserialize_from`](Self::deserialize_from).
    pub fn with_format(mut self, format: SerializationFormat) -> Self {
        self.format = format;
        self
    }

    pub fn format(&self) -> SerializationFormat {
        self.format
    }

    pub fn set_format(&mut self, format: SerializationFormat) {
        self.format = format;
    }

    /// Add `value`, returning `true` if it was not already present.
    pub fn insert(&mut self, value: u64) -> bool {
        let (high, low) = split(value);

        match self.index.get_mut(high) {
            Some(bitmap) => bitmap.insert(low),
            None => {
                let mut bitmap = RoaringBitmap::new();
                bitmap.insert(low);
                self.index.insert(high, bitmap);
                true
            }
        }
    }

    /// Add every value of `values`.
    pub fn add_many(&mut self, values: &[u64]) {
        for &value in values {
            self.insert(value);
        }
    }

    /// Remove `value`, returning `true` if it was present.
    ///
    /// A shard left empty by the removal is dropped.
    pub fn remove(&mut self, value: u64) -> bool {
        let (high, low) = split(value);

        let Some(bitmap) = self.index.get_mut(high) else {
            return false;
        };

        let removed = bitmap.remove(low);
        if bitmap.is_empty() {
            self.index.remove(high);
            return true;
        }
        removed
    }

    pub fn contains(&self, value: u64) -> bool {
        let (high, low) = split(value);
        self.index.get(high).is_some_and(|bitmap| bitmap.contains(low))
    }

    /// Returns `true` if no shard holds a value.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty() || self.index.iter().all(|(_, bitmap)| bitmap.is_empty())
    }

    /// Remove every value.
    pub fn clear(&mut self) {
        self.index.clear();
    }

    /// Number of values in the set.
    pub fn len(&self) -> u64 {
        self.index.iter().map(|(_, bitmap)| bitmap.len()).sum()
    }

    /// Number of shards, including any empty shard left by
    /// [`and_not`](Self::and_not).
    pub fn shard_count(&self) -> usize {
        self.index.len()
    }

    /// Ascending iterator over `(high key, bitmap)` pairs.
    pub fn shards(&self) -> Shards<'_> {
        self.index.iter()
    }

    /// Smallest value, or `None` for an empty set.
    pub fn min(&self) -> Option<u64> {
        let (high, bitmap) = self.index.first()?;
        if let Some(low) = bitmap.min() {
            return Some(join(high, low));
        }

        // The first shard was emptied by `and_not`.
        self.index
            .iter()
            .find_map(|(high, bitmap)| bitmap.min().map(|low| join(high, low)))
    }

    /// Largest value, or `None` for an empty set.
    pub fn max(&self) -> Option<u64> {
        let (high, bitmap) = self.index.last()?;
        if let Some(low) = bitmap.max() {
            return Some(join(high, low));
        }

        self.index
            .iter()
            .rev()
            .find_map(|(high, bitmap)| bitmap.max().map(|low| join(high, low)))
    }

    /// Smallest value, or 0 for an empty set.
    pub fn minimum(&self) -> u64 {
        self.min().unwrap_or(0)
    }

    /// Largest value, or 0 for an empty set.
    pub fn maximum(&self) -> u64 {
        self.max().unwrap_or(0)
    }

    /// In-place intersection with `other`.
    pub fn and(&mut self, other: &Treemap) {
        let mut emptied = Vec::new();

        for (high, bitmap) in self.index.iter_mut() {
            match other.index.get(high) {
                Some(rhs) => {
                    *bitmap &= rhs;
                    if bitmap.is_empty() {
                        emptied.push(high);
                    }
                }
                None => emptied.push(high),
            }
        }

        self.index.remove_all(emptied);
    }

    /// In-place union with `other`.
    pub fn or(&mut self, other: &Treemap) {
        for (high, rhs) in other.index.iter() {
            if rhs.is_empty() {
                continue;
            }

            if let Some(bitmap) = self.index.get_mut(high) {
                *bitmap |= rhs;
            } else {
                self.index.insert(high, rhs.clone());
            }
        }
    }

    /// In-place symmetric difference with `other`.
    pub fn xor(&mut self, other: &Treemap) {
        let mut emptied = Vec::new();

        for (high, rhs) in other.index.iter() {
            if rhs.is_empty() {
                continue;
            }

            if let Some(bitmap) = self.index.get_mut(high) {
                *bitmap ^= rhs;
                if bitmap.is_empty() {
                    emptied.push(high);
                }
            } else {
                self.index.insert(high, rhs.clone());
            }
        }

        self.index.remove_all(emptied);
    }

    /// In-place difference: removes every value of `other` from `self`.
    ///
    /// Unlike the other operations, shards emptied by the subtraction are
    /// kept. Membership is unaffected, but [`shard_count`](Self::shard_count)
    /// and equality (which compares shard counts) observe them.
    pub fn and_not(&mut self, other: &Treemap) {
        for (high, bitmap) in self.index.iter_mut() {
            if let Some(rhs) = other.index.get(high) {
                *bitmap -= rhs;
            }
        }
    }

    /// Cardinality of the intersection, without materializing it.
    pub fn and_cardinality(&self, other: &Treemap) -> u64 {
        let (small, large) = self.order_by_shards(other);

        small
            .index
            .iter()
            .filter_map(|(high, bitmap)| {
                large
                    .index
                    .get(high)
                    .map(|rhs| bitmap.intersection_len(rhs))
            })
            .sum()
    }

    /// Cardinality of the union, without materializing it.
    pub fn or_cardinality(&self, other: &Treemap) -> u64 {
        let mut total: u64 = other
            .index
            .iter()
            .map(|(high, rhs)| match self.index.get(high) {
                Some(bitmap) => bitmap.union_len(rhs),
                None => rhs.len(),
            })
            .sum();

        for (high, bitmap) in self.index.iter() {
            if other.index.get(high).is_none() {
                total += bitmap.len();
            }
        }

        total
    }

    /// Returns `true` if the two sets share at least one value.
    pub fn intersects(&self, other: &Treemap) -> bool {
        let (small, large) = self.order_by_shards(other);

        small.index.iter().any(|(high, bitmap)| {
            large
                .index
                .get(high)
                .is_some_and(|rhs| !bitmap.is_disjoint(rhs))
        })
    }

    fn order_by_shards<'a>(&'a self, other: &'a Treemap) -> (&'a Treemap, &'a Treemap) {
        if self.index.len() <= other.index.len() {
            (self, other)
        } else {
            (other, self)
        }
    }

    /// Number of values less than or equal to `value`.
    pub fn rank(&self, value: u64) -> u64 {
        let (high, low) = split(value);
        let mut rank = 0;

        // Relies on ascending traversal: stops at the first shard past `high`.
        for (key, bitmap) in self.index.iter() {
            if key > high {
                break;
            }
            if key < high {
                rank += bitmap.len();
                continue;
            }
            rank += bitmap.rank(low);
            break;
        }

        rank
    }

    /// The `index`-th smallest value (0-based).
    pub fn select(&self, index: u64) -> Result<u64> {
        let cardinality = self.len();
        let out_of_range = Error::SelectOutOfRange { index, cardinality };

        if index >= cardinality {
            return Err(out_of_range);
        }

        let mut remaining = index;
        for (high, bitmap) in self.index.iter() {
            let len = bitmap.len();
            if remaining >= len {
                remaining -= len;
                continue;
            }

            return u32::try_from(remaining)
                .ok()
                .and_then(|n| bitmap.select(n))
                .map(|low| join(high, low))
                .ok_or(out_of_range);
        }

        Err(out_of_range)
    }

    /// Add every value of `range`, returning how many were not already present.
    pub fn insert_range<R: RangeBounds<u64>>(&mut self, range: R) -> u64 {
        let Some(range) = to_inclusive(range) else {
            return 0;
        };
        trace!(start = *range.start(), end = *range.end(), "inserting range");

        let (first, last) = (split(*range.start()).0, split(*range.end()).0);
        let mut added = 0;
        for high in first..=last {
            let lows = shard_slice(high, &range);
            added += self.index.get_or_insert(high).insert_range(lows);
        }
        added
    }

    /// Remove every value of `range`, returning how many were present.
    pub fn remove_range<R: RangeBounds<u64>>(&mut self, range: R) -> u64 {
        let Some(range) = to_inclusive(range) else {
            return 0;
        };
        trace!(start = *range.start(), end = *range.end(), "removing range");

        // Shards missing from the index have nothing to remove, so only the
        // existing ones in the key range are visited.
        let (first, last) = (split(*range.start()).0, split(*range.end()).0);
        let keys: Vec<u32> = self.index.range(first..=last).map(|(high, _)| high).collect();

        let mut removed = 0;
        for high in keys {
            let lows = shard_slice(high, &range);
            if let Some(bitmap) = self.index.get_mut(high) {
                removed += bitmap.remove_range(lows);
            }
            self.index.prune(high);
        }
        removed
    }

    /// Toggle membership of every value of `range`.
    pub fn flip_range<R: RangeBounds<u64>>(&mut self, range: R) {
        let Some(range) = to_inclusive(range) else {
            return;
        };
        trace!(start = *range.start(), end = *range.end(), "flipping range");

        let (first, last) = (split(*range.start()).0, split(*range.end()).0);
        for high in first..=last {
            let mut mask = RoaringBitmap::new();
            mask.insert_range(shard_slice(high, &range));

            *self.index.get_or_insert(high) ^= mask;
            self.index.prune(high);
        }
    }

    /// Let every shard container pick its most compact encoding.
    ///
    /// Membership is unchanged.
    pub fn run_optimize(&mut self) {
        for (_, bitmap) in self.index.iter_mut() {
            bitmap.optimize();
        }
    }

    /// Container statistics summed over all shards.
    pub fn statistics(&self) -> Statistics {
        self.index
            .iter()
            .map(|(_, bitmap)| Statistics::of_shard(bitmap))
            .sum()
    }

    /// All values in ascending order.
    pub fn to_vec(&self) -> Vec<u64> {
        self.iter().collect()
    }
}

/// Convert any `u64` range into an inclusive one, or `None` if it is empty.
fn to_inclusive<R: RangeBounds<u64>>(range: R) -> Option<RangeInclusive<u64>> {
    let start = match range.start_bound() {
        Bound::Included(&n) => n,
        Bound::Excluded(&n) => n.checked_add(1)?,
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&n) => n,
        Bound::Excluded(&n) => n.checked_sub(1)?,
        Bound::Unbounded => u64::MAX,
    };

    (start <= end).then_some(start..=end)
}

/// The low halves of `range` that fall into shard `high`.
///
/// Only the first and last shard of the range are partial; every shard
/// strictly between them is covered completely.
fn shard_slice(high: u32, range: &RangeInclusive<u64>) -> RangeInclusive<u32> {
    let (first, start) = split(*range.start());
    let (last, end) = split(*range.end());

    let lo = if high == first { start } else { 0 };
    let hi = if high == last { end } else { u32::MAX };
    lo..=hi
}

impl PartialEq for Treemap {
    fn eq(&self, other: &Self) -> bool {
        self.index.len() == other.index.len()
            && self.index.iter().all(|(high, bitmap)| {
                other
                    .index
                    .get(high)
                    .is_some_and(|rhs| rhs.len() == bitmap.len() && rhs == bitmap)
            })
    }
}

impl Eq for Treemap {}

impl FromIterator<u64> for Treemap {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        let mut treemap = Treemap::new();
        treemap.extend(iter);
        treemap
    }
}

impl<'a> FromIterator<&'a u64> for Treemap {
    fn from_iter<I: IntoIterator<Item = &'a u64>>(iter: I) -> Self {
        iter.into_iter().copied().collect()
    }
}

impl<const N: usize> From<[u64; N]> for Treemap {
    fn from(values: [u64; N]) -> Self {
        values.into_iter().collect()
    }
}

impl Extend<u64> for Treemap {
    fn extend<I: IntoIterator<Item = u64>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a> Extend<&'a u64> for Treemap {
    fn extend<I: IntoIterator<Item = &'a u64>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl fmt::Display for Treemap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, value) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if i == DISPLAY_LIMIT {
                f.write_str("...")?;
                break;
            }
            write!(f, "{value}")?;
        }
        f.write_str("}")
    }
}

impl fmt::Debug for Treemap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.len() < 16 {
            return f.debug_set().entries(self.iter()).finish();
        }

        write!(
            f,
            "Treemap<{} values in {} shards between {} and {}>",
            self.len(),
            self.shard_count(),
            self.minimum(),
            self.maximum()
        )
    }
}
