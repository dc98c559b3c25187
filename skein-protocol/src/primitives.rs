//! Primitive types used in the Kafka protocol

use std::str;

use anyhow::{bail, ensure, Context, Result};
use bytes::{Buf, BufMut, Bytes};
use uuid::Uuid;

use crate::codec::{Decodable, Encodable};

/// Longest encoding of a 32-bit varint.
pub const MAX_VARINT_BYTES: usize = 5;
/// Longest encoding of a 64-bit varint.
pub const MAX_VARLONG_BYTES: usize = 10;

/// Takes exactly `len` bytes off the front of `buf`, failing instead of panicking
/// when the buffer is short.
pub fn take_bytes(buf: &mut impl Buf, len: usize, what: &str) -> Result<Bytes> {
    ensure!(
        buf.remaining() >= len,
        "not enough bytes for {}: need {}, have {}",
        what,
        len,
        buf.remaining()
    );
    Ok(buf.copy_to_bytes(len))
}

// --- Implementations for primitive integer types ---

macro_rules! impl_codec_for_int {
    ($($t:ty),*) => {
        $(
            impl Encodable for $t {
                fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
                    buf.put_slice(&self.to_be_bytes());
                    Ok(())
                }
            }

            impl Decodable for $t {
                fn decode(buf: &mut impl Buf) -> Result<Self> {
                    const SIZE: usize = std::mem::size_of::<$t>();
                    ensure!(
                        buf.remaining() >= SIZE,
                        "not enough bytes for {}: need {}, have {}",
                        stringify!($t),
                        SIZE,
                        buf.remaining()
                    );
                    let mut bytes = [0u8; SIZE];
                    buf.copy_to_slice(&mut bytes);
                    Ok(<$t>::from_be_bytes(bytes))
                }
            }
        )*
    };
}

impl_codec_for_int!(i8, i16, i32, i64, u8, u16, u32, u64);

// --- UUID ---

impl Encodable for Uuid {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        buf.put_slice(self.as_bytes());
        Ok(())
    }
}

impl Decodable for Uuid {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        ensure!(
            buf.remaining() >= 16,
            "not enough bytes for uuid: need 16, have {}",
            buf.remaining()
        );
        let mut bytes = [0u8; 16];
        buf.copy_to_slice(&mut bytes);
        Ok(Uuid::from_bytes(bytes))
    }
}

// --- Varint / Varlong ---

/// Writes `n` as a base-128 varint, low group first.
pub fn encode_unsigned_varint(mut n: u32, buf: &mut impl BufMut) {
    while n >= 0x80 {
        buf.put_u8((n as u8 & 0x7f) | 0x80);
        n >>= 7;
    }
    buf.put_u8(n as u8);
}

/// Reads a base-128 varint of at most [`MAX_VARINT_BYTES`] bytes.
pub fn decode_unsigned_varint(buf: &mut impl Buf) -> Result<u32> {
    let mut n: u32 = 0;
    for i in 0..MAX_VARINT_BYTES {
        ensure!(buf.has_remaining(), "unexpected EOF reading varint");
        let b = buf.get_u8();
        n |= u32::from(b & 0x7f) << (7 * i);
        if b & 0x80 == 0 {
            return Ok(n);
        }
    }
    bail!("varint longer than {} bytes", MAX_VARINT_BYTES)
}

fn encode_unsigned_varlong(mut n: u64, buf: &mut impl BufMut) {
    while n >= 0x80 {
        buf.put_u8((n as u8 & 0x7f) | 0x80);
        n >>= 7;
    }
    buf.put_u8(n as u8);
}

fn decode_unsigned_varlong(buf: &mut impl Buf) -> Result<u64> {
    let mut n: u64 = 0;
    for i in 0..MAX_VARLONG_BYTES {
        ensure!(buf.has_remaining(), "unexpected EOF reading varlong");
        let b = buf.get_u8();
        n |= u64::from(b & 0x7f) << (7 * i);
        if b & 0x80 == 0 {
            return Ok(n);
        }
    }
    bail!("varlong longer than {} bytes", MAX_VARLONG_BYTES)
}

/// Writes `n` ZigZag-encoded as a varint.
pub fn encode_signed_varint(n: i32, buf: &mut impl BufMut) {
    encode_unsigned_varint(((n << 1) ^ (n >> 31)) as u32, buf);
}

/// Reads a ZigZag varint: `{0x82, 0x01}` is 65, `{0x01}` is -1.
pub fn decode_signed_varint(buf: &mut impl Buf) -> Result<i32> {
    let n = decode_unsigned_varint(buf)?;
    Ok(((n >> 1) as i32) ^ -((n & 1) as i32))
}

/// Writes `n` ZigZag-encoded as a varlong.
pub fn encode_signed_varlong(n: i64, buf: &mut impl BufMut) {
    encode_unsigned_varlong(((n << 1) ^ (n >> 63)) as u64, buf);
}

/// Reads a ZigZag varlong.
pub fn decode_signed_varlong(buf: &mut impl Buf) -> Result<i64> {
    let n = decode_unsigned_varlong(buf)?;
    Ok(((n >> 1) as i64) ^ -((n & 1) as i64))
}

// --- KafkaBool ---

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct KafkaBool(pub bool);

impl Encodable for KafkaBool {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        (self.0 as i8).encode(buf)
    }
}

impl Decodable for KafkaBool {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        Ok(KafkaBool(i8::decode(buf)? != 0))
    }
}

impl From<bool> for KafkaBool {
    fn from(b: bool) -> Self {
        Self(b)
    }
}

// --- NullableString ---

/// INT16-length string where `-1` means null. Used for the request header client id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NullableString(pub Option<String>);

impl Encodable for NullableString {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        match &self.0 {
            Some(s) => {
                let len = i16::try_from(s.len()).context("nullable string too long")?;
                len.encode(buf)?;
                buf.put_slice(s.as_bytes());
            }
            None => (-1i16).encode(buf)?,
        }
        Ok(())
    }
}

impl Decodable for NullableString {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let len = i16::decode(buf)?;
        if len < 0 {
            return Ok(NullableString(None));
        }
        let bytes = take_bytes(buf, len as usize, "nullable string")?;
        let s = str::from_utf8(&bytes)?.to_string();
        Ok(NullableString(Some(s)))
    }
}

impl From<Option<String>> for NullableString {
    fn from(s: Option<String>) -> Self {
        Self(s)
    }
}

// --- CompactString ---

/// Varint `len + 1` followed by the bytes. A stored length of zero (null) decodes
/// to the empty string; use [`CompactNullableString`] where null must survive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CompactString(pub String);

impl Encodable for CompactString {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        let len = u32::try_from(self.0.len() + 1).context("compact string too long")?;
        encode_unsigned_varint(len, buf);
        buf.put_slice(self.0.as_bytes());
        Ok(())
    }
}

impl Decodable for CompactString {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        Ok(CompactString(
            CompactNullableString::decode(buf)?.0.unwrap_or_default(),
        ))
    }
}

impl From<&str> for CompactString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl CompactString {
    pub fn into_inner(self) -> String {
        self.0
    }
}

// --- CompactNullableString ---

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CompactNullableString(pub Option<String>);

impl Encodable for CompactNullableString {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        match &self.0 {
            Some(s) => CompactString(s.clone()).encode(buf),
            None => {
                encode_unsigned_varint(0, buf);
                Ok(())
            }
        }
    }
}

impl Decodable for CompactNullableString {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let len = decode_unsigned_varint(buf)? as usize;
        if len == 0 {
            return Ok(CompactNullableString(None));
        }
        let bytes = take_bytes(buf, len - 1, "compact string")?;
        let s = str::from_utf8(&bytes)?.to_string();
        Ok(CompactNullableString(Some(s)))
    }
}

impl From<&str> for CompactNullableString {
    fn from(s: &str) -> Self {
        Self(Some(s.to_string()))
    }
}

// --- CompactNullableBytes ---

/// Compact nullable byte string; a lone `0` is the null record set in fetch responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CompactNullableBytes(pub Option<Bytes>);

impl Encodable for CompactNullableBytes {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        match &self.0 {
            Some(bytes) => {
                let len = u32::try_from(bytes.len() + 1).context("compact bytes too long")?;
                encode_unsigned_varint(len, buf);
                buf.put_slice(bytes);
            }
            None => encode_unsigned_varint(0, buf),
        }
        Ok(())
    }
}

impl Decodable for CompactNullableBytes {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let len = decode_unsigned_varint(buf)? as usize;
        if len == 0 {
            return Ok(Self(None));
        }
        Ok(Self(Some(take_bytes(buf, len - 1, "compact bytes")?)))
    }
}

// --- CompactArray ---

/// Varint `count + 1` followed by the elements. `None` is the null array (stored
/// count zero) and stays distinct from an empty one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompactArray<T>(pub Option<Vec<T>>);

impl<T> CompactArray<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self(Some(items))
    }

    pub fn null() -> Self {
        Self(None)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// The elements, with null reading as empty.
    pub fn items(&self) -> &[T] {
        self.0.as_deref().unwrap_or(&[])
    }

    pub fn into_items(self) -> Vec<T> {
        self.0.unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

impl<T> Default for CompactArray<T> {
    fn default() -> Self {
        Self(Some(Vec::new()))
    }
}

impl<T> From<Vec<T>> for CompactArray<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

/// Encodes a compact array, writing each element with `encode_item`.
pub fn encode_compact_array_with<B, T, F>(
    items: Option<&[T]>,
    buf: &mut B,
    mut encode_item: F,
) -> Result<()>
where
    B: BufMut,
    F: FnMut(&T, &mut B) -> Result<()>,
{
    match items {
        None => encode_unsigned_varint(0, buf),
        Some(items) => {
            let len = u32::try_from(items.len() + 1).context("compact array too long")?;
            encode_unsigned_varint(len, buf);
            for item in items {
                encode_item(item, buf)?;
            }
        }
    }
    Ok(())
}

/// Decodes a compact array whose elements are parsed by `decode_item`.
pub fn decode_compact_array_with<B, T, F>(buf: &mut B, mut decode_item: F) -> Result<CompactArray<T>>
where
    B: Buf,
    F: FnMut(&mut B) -> Result<T>,
{
    let len = decode_unsigned_varint(buf)? as usize;
    if len == 0 {
        return Ok(CompactArray(None));
    }
    let count = len - 1;
    // Every element takes at least one byte, so the count can't exceed what is left.
    ensure!(
        count <= buf.remaining(),
        "compact array claims {} elements but only {} bytes remain",
        count,
        buf.remaining()
    );
    let mut items = Vec::with_capacity(count);
    for i in 0..count {
        let item = decode_item(buf).with_context(|| format!("compact array element {i}"))?;
        items.push(item);
    }
    Ok(CompactArray(Some(items)))
}

impl<T: Encodable> Encodable for CompactArray<T> {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        encode_compact_array_with(self.0.as_deref(), buf, |item, buf| item.encode(buf))
    }
}

impl<T: Decodable> Decodable for CompactArray<T> {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        decode_compact_array_with(buf, |buf| T::decode(buf))
    }
}

// --- TaggedFields ---

/// Tagged field buffer. Always written empty; unknown fields are skipped on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TaggedFields;

impl Encodable for TaggedFields {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        encode_unsigned_varint(0, buf);
        Ok(())
    }
}

impl Decodable for TaggedFields {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let num_tags = decode_unsigned_varint(buf)?;
        for _ in 0..num_tags {
            let _tag = decode_unsigned_varint(buf)?;
            let len = decode_unsigned_varint(buf)? as usize;
            ensure!(
                buf.remaining() >= len,
                "not enough bytes for tagged field: need {}, have {}",
                len,
                buf.remaining()
            );
            buf.advance(len);
        }
        Ok(TaggedFields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_signed_varint_vectors() {
        assert_eq!(decode_signed_varint(&mut &[0x82u8, 0x01][..]).unwrap(), 65);
        assert_eq!(decode_signed_varint(&mut &[0x01u8][..]).unwrap(), -1);
        assert_eq!(decode_signed_varint(&mut &[0x30u8][..]).unwrap(), 24);
        assert_eq!(decode_signed_varint(&mut &[0x00u8][..]).unwrap(), 0);
    }

    #[test]
    fn test_signed_varint_encode_matches_vectors() {
        let mut buf = BytesMut::new();
        encode_signed_varint(65, &mut buf);
        assert_eq!(&buf[..], &[0x82, 0x01]);

        let mut buf = BytesMut::new();
        encode_signed_varint(-1, &mut buf);
        assert_eq!(&buf[..], &[0x01]);
    }

    #[test]
    fn test_varint_rejects_overlong_input() {
        let endless = [0xffu8; 16];
        let err = decode_signed_varint(&mut &endless[..]).unwrap_err();
        assert!(err.to_string().contains("longer than"));

        let err = decode_signed_varlong(&mut &endless[..]).unwrap_err();
        assert!(err.to_string().contains("longer than"));
    }

    #[test]
    fn test_varint_rejects_truncated_input() {
        assert!(decode_signed_varint(&mut &[0x82u8][..]).is_err());
        assert!(decode_unsigned_varint(&mut &[][..]).is_err());
    }

    #[test]
    fn test_varint_extremes() {
        for n in [i32::MIN, i32::MAX, 0, -64, 63] {
            let mut buf = BytesMut::new();
            encode_signed_varint(n, &mut buf);
            assert!(buf.len() <= MAX_VARINT_BYTES);
            assert_eq!(decode_signed_varint(&mut buf.freeze()).unwrap(), n);
        }
        for n in [i64::MIN, i64::MAX] {
            let mut buf = BytesMut::new();
            encode_signed_varlong(n, &mut buf);
            assert_eq!(buf.len(), MAX_VARLONG_BYTES);
            assert_eq!(decode_signed_varlong(&mut buf.freeze()).unwrap(), n);
        }
    }

    #[test]
    fn test_compact_string_boundaries() {
        let absent = CompactString::decode(&mut &[0u8][..]).unwrap();
        assert_eq!(absent.0, "");
        let present = CompactString::decode(&mut &[1u8][..]).unwrap();
        assert_eq!(present.0, "");

        assert_eq!(CompactNullableString::decode(&mut &[0u8][..]).unwrap().0, None);
        assert_eq!(
            CompactNullableString::decode(&mut &[1u8][..]).unwrap().0,
            Some(String::new())
        );
    }

    #[test]
    fn test_compact_string_encoding() {
        let mut buf = BytesMut::new();
        CompactString::from("saz").encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &[4, b's', b'a', b'z']);
    }

    #[test]
    fn test_compact_string_long_names_use_varint_length() {
        let name = "x".repeat(300);
        let mut buf = BytesMut::new();
        CompactString(name.clone()).encode(&mut buf).unwrap();
        assert_eq!(&buf[..2], &[0xad, 0x02]);
        assert_eq!(CompactString::decode(&mut buf.freeze()).unwrap().0, name);
    }

    #[test]
    fn test_compact_string_truncated() {
        assert!(CompactString::decode(&mut &[5u8, b'a'][..]).is_err());
    }

    #[test]
    fn test_compact_array_of_replica_ids() {
        let mut buf: &[u8] = &[3, 0, 0, 0, 4, 0, 0, 0, 2];
        let decoded = CompactArray::<i32>::decode(&mut buf).unwrap();
        assert_eq!(decoded.items(), &[4, 2]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_compact_array_of_uuids() {
        let mut buf: &[u8] = &[2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0, 6];
        let decoded = CompactArray::<Uuid>::decode(&mut buf).unwrap();
        assert_eq!(
            decoded.items(),
            &[Uuid::from_bytes([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0, 6])]
        );
    }

    #[test]
    fn test_compact_array_null_and_empty_are_distinct() {
        let mut null_buf = BytesMut::new();
        CompactArray::<i32>::null().encode(&mut null_buf).unwrap();
        assert_eq!(&null_buf[..], &[0]);

        let mut empty_buf = BytesMut::new();
        CompactArray::<i32>::new(vec![]).encode(&mut empty_buf).unwrap();
        assert_eq!(&empty_buf[..], &[1]);

        assert!(CompactArray::<i32>::decode(&mut null_buf.freeze())
            .unwrap()
            .is_null());
        let empty = CompactArray::<i32>::decode(&mut empty_buf.freeze()).unwrap();
        assert!(!empty.is_null());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_compact_array_count_larger_than_buffer() {
        let err = CompactArray::<i32>::decode(&mut &[200u8, 1, 0, 0, 0, 1][..]).unwrap_err();
        assert!(err.to_string().contains("claims"));

        let err = CompactArray::<i32>::decode(&mut &[3u8, 0, 0, 0, 1, 0][..]).unwrap_err();
        assert!(format!("{err:#}").contains("element 1"));
    }

    #[test]
    fn test_custom_compact_array() {
        let mut buf = BytesMut::new();
        encode_compact_array_with(Some(&["a", "bc"][..]), &mut buf, |s, buf| {
            CompactString::from(*s).encode(buf)?;
            TaggedFields.encode(buf)
        })
        .unwrap();
        assert_eq!(&buf[..], &[3, 2, b'a', 0, 3, b'b', b'c', 0]);

        let decoded = decode_compact_array_with(&mut buf.freeze(), |buf| {
            let name = CompactString::decode(buf)?;
            TaggedFields::decode(buf)?;
            Ok(name.into_inner())
        })
        .unwrap();
        assert_eq!(decoded.into_items(), vec!["a".to_string(), "bc".to_string()]);
    }

    #[test]
    fn test_tagged_fields_skip_unknown_tags() {
        // two tags: (tag 0, 2 bytes), (tag 5, 0 bytes), then a trailing marker byte
        let mut buf: &[u8] = &[2, 0, 2, 0xaa, 0xbb, 5, 0, 0x7f];
        TaggedFields::decode(&mut buf).unwrap();
        assert_eq!(buf, &[0x7f]);

        assert!(TaggedFields::decode(&mut &[1u8, 0, 9, 1][..]).is_err());
    }

    #[test]
    fn test_nullable_string() {
        let mut buf = BytesMut::new();
        NullableString(Some("kafka-cli".into())).encode(&mut buf).unwrap();
        NullableString(None).encode(&mut buf).unwrap();
        let mut buf = buf.freeze();
        assert_eq!(
            NullableString::decode(&mut buf).unwrap().0.as_deref(),
            Some("kafka-cli")
        );
        assert_eq!(NullableString::decode(&mut buf).unwrap().0, None);
    }

    #[test]
    fn test_int_decode_short_buffer() {
        assert!(i32::decode(&mut &[0u8, 1][..]).is_err());
        assert_eq!(i16::decode(&mut &[0u8, 35][..]).unwrap(), 35);
    }
}
