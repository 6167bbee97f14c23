use std::collections::BTreeMap;
use std::collections::btree_map;
use std::iter::FusedIterator;
use std::ops::RangeBounds;

use roaring::RoaringBitmap;

/// Ordered map from a shard's high key to the bitmap holding its low halves.
///
/// Keys are unique and traversed in ascending order. The map itself does not
/// enforce the "no empty shard" rule; [`Treemap`](crate::Treemap) does.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ShardIndex {
    shards: BTreeMap<u32, RoaringBitmap>,
}

impl ShardIndex {
    pub(crate) const fn new() -> Self {
        Self {
            shards: BTreeMap::new(),
        }
    }

    /// Number of shards, empty ones included.
    pub(crate) fn len(&self) -> usize {
        self.shards.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    pub(crate) fn get(&self, high: u32) -> Option<&RoaringBitmap> {
        self.shards.get(&high)
    }

    pub(crate) fn get_mut(&mut self, high: u32) -> Option<&mut RoaringBitmap> {
        self.shards.get_mut(&high)
    }

    /// Return the shard for `high`, creating an empty one if it is missing.
    ///
    /// Callers that may leave the shard empty must prune it afterwards.
    pub(crate) fn get_or_insert(&mut self, high: u32) -> &mut RoaringBitmap {
        self.shards.entry(high).or_default()
    }

    /// Insert `bitmap` under `high`, replacing and returning any previous shard.
    pub(crate) fn insert(&mut self, high: u32, bitmap: RoaringBitmap) -> Option<RoaringBitmap> {
        self.shards.insert(high, bitmap)
    }

    pub(crate) fn remove(&mut self, high: u32) -> Option<RoaringBitmap> {
        self.shards.remove(&high)
    }

    /// Remove the shard for `high` if it holds no values.
    pub(crate) fn prune(&mut self, high: u32) {
        if self.shards.get(&high).is_some_and(RoaringBitmap::is_empty) {
            self.shards.remove(&high);
        }
    }

    /// Apply a batch of removals collected during a traversal.
    pub(crate) fn remove_all(&mut self, keys: impl IntoIterator<Item = u32>) {
        for key in keys {
            self.shards.remove(&key);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.shards.clear();
    }

    pub(crate) fn first(&self) -> Option<(u32, &RoaringBitmap)> {
        self.shards.first_key_value().map(|(&k, v)| (k, v))
    }

    pub(crate) fn last(&self) -> Option<(u32, &RoaringBitmap)> {
        self.shards.last_key_value().map(|(&k, v)| (k, v))
    }

    /// Ascending traversal over all shards.
    pub(crate) fn iter(&self) -> Shards<'_> {
        self.range(..)
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut RoaringBitmap)> {
        self.shards.iter_mut().map(|(&k, v)| (k, v))
    }

    /// Traversal over the shards whose key lies in `range`.
    ///
    /// `range(high..)` seeks to the smallest key that is at least `high`.
    pub(crate) fn range(&self, range: impl RangeBounds<u32>) -> Shards<'_> {
        Shards {
            inner: self.shards.range(range),
        }
    }

    pub(crate) fn into_inner(self) -> BTreeMap<u32, RoaringBitmap> {
        self.shards
    }
}

impl FromIterator<(u32, RoaringBitmap)> for ShardIndex {
    fn from_iter<I: IntoIterator<Item = (u32, RoaringBitmap)>>(iter: I) -> Self {
        Self {
            shards: iter.into_iter().collect(),
        }
    }
}

/// Iterator over `(high key, bitmap)` pairs of a [`Treemap`](crate::Treemap),
/// ascending by key. Reverse it for descending order.
#[derive(Clone, Debug)]
pub struct Shards<'a> {
    inner: btree_map::Range<'a, u32, RoaringBitmap>,
}

impl<'a> Iterator for Shards<'a> {
    type Item = (u32, &'a RoaringBitmap);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(&k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Shards<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(&k, v)| (k, v))
    }
}

impl FusedIterator for Shards<'_> {}
