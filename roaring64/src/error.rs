use thiserror::Error;

/// Errors reported by [`Treemap`](crate::Treemap) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// `select` was asked for a position past the end of the set.
    #[error("can't find the {index}th value in a set with only {cardinality} values")]
    SelectOutOfRange { index: u64, cardinality: u64 },

    /// Reading or writing a serialized set failed, either in the underlying
    /// stream or while decoding a shard container.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid base64 input: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The serialized header announces more shards than 32-bit keys can address.
    #[error("serialized set announces {0} shards")]
    TooManyShards(u64),

    /// Shard keys in a serialized set must be strictly ascending.
    #[error("shard key {key:#x} follows shard key {previous:#x}")]
    UnorderedShard { previous: u32, key: u32 },
}

/// A specialized Result type for [`Treemap`](crate::Treemap) operations.
pub type Result<T> = std::result::Result<T, Error>;
