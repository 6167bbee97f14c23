//! Compressed set of 64-bit unsigned integers.
//!
//! A [`Treemap`] splits every value into a 32-bit high half and a 32-bit low
//! half. Values sharing the same high half live in one shard: a
//! [`RoaringBitmap`](roaring::RoaringBitmap) keyed by that high half inside an
//! ordered shard index. Set algebra, rank/select and iteration walk the
//! shards in ascending key order and delegate the low halves to the shard
//! containers.
//!
//! Two binary encodings are supported, selected per instance with
//! [`SerializationFormat`]: the little-endian layout used by CRoaring's
//! `Roaring64Map` and the big-endian layout of the JVM `Roaring64NavigableMap`.
//!
//! # Example
//!
//! ```
//! use roaring64::Treemap;
//!
//! let mut set: Treemap = [15, 25, u64::MAX].into_iter().collect();
//! set.insert(1 << 40);
//!
//! assert!(set.contains(1 << 40));
//! assert_eq!(set.len(), 4);
//! assert_eq!(set.rank(25), 2);
//! assert_eq!(set.select(3).unwrap(), u64::MAX);
//!
//! let bytes = set.to_bytes().unwrap();
//! let mut restored = Treemap::new();
//! restored.from_bytes(&bytes).unwrap();
//! assert_eq!(set, restored);
//! ```

mod error;
mod index;
mod iter;
pub mod multiops;
mod ops;
#[cfg(feature = "serde")]
mod serde;
mod serialization;
mod statistics;
mod treemap;

#[cfg(test)]
mod tests_multiops;

pub use error::{Error, Result};
pub use index::Shards;
pub use iter::{IntoIter, Iter, ManyIter, RevIter};
pub use multiops::{fast_and, fast_or, fast_xor, heap_or, heap_xor};
pub use serialization::SerializationFormat;
pub use statistics::Statistics;
pub use treemap::Treemap;

/// Split a 64-bit value into its shard key (high half) and the value stored
/// inside the shard (low half).
#[inline]
pub const fn split(value: u64) -> (u32, u32) {
    ((value >> 32) as u32, value as u32)
}

/// Inverse of [`split`].
#[inline]
pub const fn join(high: u32, low: u32) -> u64 {
    ((high as u64) << 32) | low as u64
}
