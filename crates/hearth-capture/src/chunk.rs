use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

/// One unit of data written to a capture stream.
///
/// The text holds one `char` per written byte, each in `0..=0xFF`, so any
/// binary payload is representable and [`to_bytes`](Chunk::to_bytes) gives
/// back exactly what was written. Cloning is a refcount bump.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Chunk(Arc<str>);

impl Chunk {
    /// Widen `bytes` one byte per code point.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let text: String = bytes.iter().map(|&b| char::from(b)).collect();
        Self(Arc::from(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of bytes the chunk stands for.
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The bytes originally written.
    pub fn to_bytes(&self) -> Bytes {
        // Every char came from a byte, so the truncation is lossless.
        self.0.chars().map(|c| u32::from(c) as u8).collect::<Vec<u8>>().into()
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Chunk {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Chunk {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Chunk {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl From<Chunk> for Bytes {
    fn from(chunk: Chunk) -> Self {
        chunk.to_bytes()
    }
}
