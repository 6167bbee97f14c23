//! Binary encodings of a [`Treemap`].
//!
//! Both formats write the shards in ascending key order, each as its 32-bit
//! high key followed by the shard bitmap in the portable roaring format. They
//! differ only in the header and in the byte order of the integers they add:
//!
//! ```text
//! Native  [u64 LE shard count] ([u32 LE high key] [bitmap])*
//! Legacy  [u8 reserved = 0] [u32 BE shard count] ([u32 BE high key] [bitmap])*
//! ```
//!
//! The native layout is the one of CRoaring's `Roaring64Map`; the legacy
//! layout is the one of the JVM `Roaring64NavigableMap`.

use std::io::{self, Read, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use roaring::RoaringBitmap;
use tracing::{debug, trace};

use crate::index::ShardIndex;
use crate::{Error, Result, Treemap};

/// Size of the shard key preceding every serialized shard bitmap.
const KEY_SIZE: u64 = 4;

/// Fixed overhead used by [`Treemap::size_in_bytes`].
const SIZE_ESTIMATE_OVERHEAD: u64 = 8;

/// Upper bound on the number of shards a set can hold (one per high key).
const MAX_SHARDS: u64 = 1 << 32;

/// Wire format used by a [`Treemap`] to serialize itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SerializationFormat {
    /// Little-endian, 8-byte shard count. Compatible with CRoaring.
    #[default]
    Native,
    /// Big-endian, reserved flag byte and 4-byte shard count. Compatible with
    /// the JVM implementation.
    Legacy,
}

impl SerializationFormat {
    /// Bytes written before the first shard.
    pub const fn header_size(self) -> u64 {
        match self {
            SerializationFormat::Native => 8,
            SerializationFormat::Legacy => 1 + 4,
        }
    }

    fn encode_key(self, high: u32) -> [u8; 4] {
        match self {
            SerializationFormat::Native => high.to_le_bytes(),
            SerializationFormat::Legacy => high.to_be_bytes(),
        }
    }

    fn decode_key(self, bytes: [u8; 4]) -> u32 {
        match self {
            SerializationFormat::Native => u32::from_le_bytes(bytes),
            SerializationFormat::Legacy => u32::from_be_bytes(bytes),
        }
    }
}

impl Treemap {
    /// Exact number of bytes [`serialize_into`](Self::serialize_into) writes
    /// with the configured format.
    pub fn serialized_size(&self) -> u64 {
        self.format.header_size() + self.shards_size()
    }

    /// Size estimate independent of the configured format: an 8-byte header,
    /// plus each shard's key and serialized bitmap.
    pub fn size_in_bytes(&self) -> u64 {
        SIZE_ESTIMATE_OVERHEAD + self.shards_size()
    }

    fn shards_size(&self) -> u64 {
        self.index
            .iter()
            .map(|(_, bitmap)| KEY_SIZE + bitmap.serialized_size() as u64)
            .sum()
    }

    /// Write the set with the configured format, returning the number of
    /// bytes written.
    pub fn serialize_into<W: Write>(&self, writer: W) -> Result<u64> {
        self.write_with(self.format, writer)
    }

    /// Replace the contents of the set with the one read from `reader`, using
    /// the configured format. Returns the number of bytes read.
    ///
    /// The set is only modified if the whole input decodes; on error the
    /// reader may have been partially consumed and the set is left as it was.
    pub fn deserialize_from<R: Read>(&mut self, reader: R) -> Result<u64> {
        let mut reader = CountingReader::new(reader);
        self.index = read_index(self.format, &mut reader)?;
        Ok(reader.count)
    }

    /// Read a set written with `format`.
    pub fn deserialize_with<R: Read>(format: SerializationFormat, reader: R) -> Result<Treemap> {
        let mut treemap = Treemap::new().with_format(format);
        treemap.deserialize_from(reader)?;
        Ok(treemap)
    }

    /// Serialize with the configured format into a new buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.serialized_size() as usize);
        self.serialize_into(&mut buf)?;
        Ok(buf)
    }

    /// Replace the contents of the set with the one decoded from `bytes`,
    /// using the configured format. Returns the number of bytes consumed.
    pub fn from_bytes(&mut self, bytes: &[u8]) -> Result<u64> {
        self.deserialize_from(bytes)
    }

    /// Standard base64 encoding of the native serialization, whatever the
    /// configured format.
    pub fn to_base64(&self) -> Result<String> {
        Ok(BASE64.encode(self.native_bytes()?))
    }

    /// Replace the contents of the set with the one decoded from base64 text
    /// produced by [`to_base64`](Self::to_base64). Returns the number of
    /// decoded bytes consumed.
    pub fn from_base64(&mut self, text: &str) -> Result<u64> {
        let bytes = BASE64.decode(text)?;
        let mut reader = CountingReader::new(bytes.as_slice());
        self.index = read_index(SerializationFormat::Native, &mut reader)?;
        Ok(reader.count)
    }

    pub(crate) fn native_bytes(&self) -> Result<Vec<u8>> {
        let size = SerializationFormat::Native.header_size() + self.shards_size();
        let mut buf = Vec::with_capacity(size as usize);
        self.write_with(SerializationFormat::Native, &mut buf)?;
        Ok(buf)
    }

    fn write_with<W: Write>(&self, format: SerializationFormat, writer: W) -> Result<u64> {
        let mut writer = CountingWriter::new(writer);
        let shards = self.index.len() as u64;

        match format {
            SerializationFormat::Native => writer.write_all(&shards.to_le_bytes())?,
            SerializationFormat::Legacy => {
                let count = u32::try_from(shards).map_err(|_| Error::TooManyShards(shards))?;
                // Reserved flag, always false.
                writer.write_all(&[0])?;
                writer.write_all(&count.to_be_bytes())?;
            }
        }

        for (high, bitmap) in self.index.iter() {
            writer.write_all(&format.encode_key(high))?;
            bitmap.serialize_into(&mut writer)?;
        }

        debug!(?format, shards, bytes = writer.count, "serialized treemap");
        Ok(writer.count)
    }
}

/// Decode a complete shard index. Nothing is returned unless every shard
/// decodes.
fn read_index<R: Read>(format: SerializationFormat, reader: &mut R) -> Result<ShardIndex> {
    let shards = match format {
        SerializationFormat::Native => u64::from_le_bytes(read_array(reader)?),
        SerializationFormat::Legacy => {
            let [_reserved] = read_array::<1>(reader)?;
            u64::from(u32::from_be_bytes(read_array(reader)?))
        }
    };

    if shards > MAX_SHARDS {
        return Err(Error::TooManyShards(shards));
    }
    trace!(?format, shards, "decoding treemap");

    // The header is untrusted, so it only bounds the initial allocation.
    let mut entries = Vec::with_capacity(shards.min(1024) as usize);
    let mut previous: Option<u32> = None;

    for _ in 0..shards {
        let high = format.decode_key(read_array(reader)?);
        if let Some(previous) = previous {
            if high <= previous {
                return Err(Error::UnorderedShard {
                    previous,
                    key: high,
                });
            }
        }
        previous = Some(high);

        let bitmap = RoaringBitmap::deserialize_from(&mut *reader)?;
        entries.push((high, bitmap));
    }

    debug!(?format, shards, "deserialized treemap");
    Ok(entries.into_iter().collect())
}

fn read_array<const N: usize>(reader: &mut impl Read) -> io::Result<[u8; N]> {
    let mut buf = [0; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Writer adapter keeping track of the bytes accepted by the inner writer.
struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Reader adapter keeping track of the bytes handed out by the inner reader.
struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, count: 0 }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}
