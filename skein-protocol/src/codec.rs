//! Traits for encoding and decoding Kafka protocol messages

use anyhow::Result;
use bytes::{Buf, BufMut, BytesMut};

/// A type that can be encoded into a buffer.
///
/// Every field is written big-endian; compact types use the `n + 1` length convention.
pub trait Encodable {
    /// Encode a value into a buffer.
    fn encode(&self, buf: &mut impl BufMut) -> Result<()>;

    /// Encode into a fresh buffer.
    fn to_bytes(&self) -> Result<BytesMut> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf)
    }
}

/// A type that can be decoded from a buffer.
///
/// Implementations consume exactly the bytes of one value and fail, rather than
/// panic, when the buffer runs short.
pub trait Decodable: Sized {
    /// Decode a value from a buffer.
    fn decode(buf: &mut impl Buf) -> Result<Self>;
}
