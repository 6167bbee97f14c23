use std::fmt;

use ::serde::de::{self, SeqAccess, Visitor};
use ::serde::{Deserialize, Deserializer, Serialize, Serializer, ser};

use crate::{SerializationFormat, Treemap};

/// Serialized as the bytes of the native format, so the serde form is
/// interchangeable with [`Treemap::to_bytes`] of a native set.
impl Serialize for Treemap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes = self
            .native_bytes()
            .map_err(<S::Error as ser::Error>::custom)?;
        serializer.serialize_bytes(&bytes)
    }
}

impl<'de> Deserialize<'de> for Treemap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_bytes(TreemapVisitor)
    }
}

struct TreemapVisitor;

impl<'de> Visitor<'de> for TreemapVisitor {
    type Value = Treemap;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a natively serialized treemap")
    }

    fn visit_bytes<E: de::Error>(self, bytes: &[u8]) -> Result<Treemap, E> {
        Treemap::deserialize_with(SerializationFormat::Native, bytes).map_err(E::custom)
    }

    // Self-describing formats without a bytes type (e.g. JSON) hand the
    // bytes over as a sequence.
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Treemap, A::Error> {
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element::<u8>()? {
            bytes.push(byte);
        }
        self.visit_bytes(&bytes)
    }
}
