//! Record batches and the records inside them.

use anyhow::{bail, ensure, Context, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use skein_protocol::primitives::{
    decode_signed_varint, decode_signed_varlong, encode_signed_varint, encode_signed_varlong,
    take_bytes,
};
use skein_protocol::{Decodable, Encodable};

/// Base offset plus batch length, the part of a batch not counted by `batch_length`.
pub const BATCH_PREFIX_LEN: usize = 12;
/// Bytes from `partition_leader_epoch` through `record_count`.
pub const BATCH_HEADER_LEN: usize = 49;
/// The only batch format the metadata log is written in.
pub const MAGIC_V2: i8 = 2;

/// Records no longer than this carry no usable value.
const MIN_RECORD_LEN: i32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBatchHeader {
    pub base_offset: i64,
    pub batch_length: i32,
    pub partition_leader_epoch: i32,
    pub magic: i8,
    /// Read but never checked.
    pub crc: u32,
    pub attributes: i16,
    pub last_offset_delta: i32,
    pub base_timestamp: i64,
    pub max_timestamp: i64,
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub base_sequence: i32,
    pub record_count: i32,
}

impl Default for RecordBatchHeader {
    fn default() -> Self {
        Self {
            base_offset: 0,
            batch_length: 0,
            partition_leader_epoch: 0,
            magic: MAGIC_V2,
            crc: 0,
            attributes: 0,
            last_offset_delta: 0,
            base_timestamp: 0,
            max_timestamp: 0,
            producer_id: -1,
            producer_epoch: -1,
            base_sequence: -1,
            record_count: 0,
        }
    }
}

/// A single record. Metadata records keep their payload in `value`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub attributes: i8,
    pub timestamp_delta: i64,
    pub offset_delta: i32,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBatch {
    pub header: RecordBatchHeader,
    /// Records in batch order. Records too short to carry a value are dropped.
    pub records: Vec<Record>,
}

impl RecordBatch {
    pub fn new(base_offset: i64, records: Vec<Record>) -> Self {
        let last_offset_delta = records.len().saturating_sub(1) as i32;
        Self {
            header: RecordBatchHeader {
                base_offset,
                last_offset_delta,
                record_count: records.len() as i32,
                ..Default::default()
            },
            records,
        }
    }

    /// Reads one batch off the front of `buf`.
    ///
    /// Only the `batch_length` bytes that belong to the batch are consumed, and the
    /// records are parsed from that slice alone, so a bad record count can never
    /// spill into the following batch.
    pub fn read(buf: &mut Bytes) -> Result<Self> {
        ensure!(
            buf.remaining() >= BATCH_PREFIX_LEN,
            "truncated batch prefix: {} bytes left",
            buf.remaining()
        );
        let base_offset = buf.get_i64();
        let batch_length = buf.get_i32();
        ensure!(
            batch_length >= BATCH_HEADER_LEN as i32,
            "batch length {} shorter than the {} byte header",
            batch_length,
            BATCH_HEADER_LEN
        );
        let mut body = take_bytes(buf, batch_length as usize, "record batch")?;

        let partition_leader_epoch = i32::decode(&mut body)?;
        let magic = i8::decode(&mut body)?;
        ensure!(magic == MAGIC_V2, "unsupported batch magic {}", magic);
        let crc = u32::decode(&mut body)?;
        let attributes = i16::decode(&mut body)?;
        let last_offset_delta = i32::decode(&mut body)?;
        let base_timestamp = i64::decode(&mut body)?;
        let max_timestamp = i64::decode(&mut body)?;
        let producer_id = i64::decode(&mut body)?;
        let producer_epoch = i16::decode(&mut body)?;
        let base_sequence = i32::decode(&mut body)?;
        let record_count = i32::decode(&mut body)?;
        ensure!(record_count >= 0, "negative record count {}", record_count);

        let mut records = Vec::new();
        for i in 0..record_count {
            if !body.has_remaining() {
                bail!(
                    "batch declares {} records but ends after {}",
                    record_count,
                    i
                );
            }
            if let Some(record) = Record::read(&mut body).with_context(|| format!("record {i}"))? {
                records.push(record);
            }
        }

        Ok(Self {
            header: RecordBatchHeader {
                base_offset,
                batch_length,
                partition_leader_epoch,
                magic,
                crc,
                attributes,
                last_offset_delta,
                base_timestamp,
                max_timestamp,
                producer_id,
                producer_epoch,
                base_sequence,
                record_count,
            },
            records,
        })
    }
}

impl Record {
    pub fn with_value(offset_delta: i32, value: impl Into<Bytes>) -> Self {
        Self {
            offset_delta,
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// Reads one length-prefixed record. `Ok(None)` means the record was too short
    /// to hold anything and was skipped.
    pub fn read(buf: &mut Bytes) -> Result<Option<Self>> {
        let len = decode_signed_varint(buf).context("record length")?;
        ensure!(len >= 0, "negative record length {}", len);
        let mut body = take_bytes(buf, len as usize, "record")?;
        if len <= MIN_RECORD_LEN {
            return Ok(None);
        }

        let attributes = i8::decode(&mut body)?;
        let timestamp_delta = decode_signed_varlong(&mut body)?;
        let offset_delta = decode_signed_varint(&mut body)?;
        let key = read_varint_bytes(&mut body, "record key")?;
        let value = read_varint_bytes(&mut body, "record value")?;

        if body.has_remaining() {
            let header_count = decode_signed_varint(&mut body)?;
            for _ in 0..header_count.max(0) {
                read_varint_bytes(&mut body, "header key")?;
                read_varint_bytes(&mut body, "header value")?;
            }
        }

        Ok(Some(Self {
            attributes,
            timestamp_delta,
            offset_delta,
            key,
            value,
        }))
    }
}

fn read_varint_bytes(buf: &mut Bytes, what: &str) -> Result<Option<Bytes>> {
    let len = decode_signed_varint(buf).with_context(|| format!("{what} length"))?;
    if len < 0 {
        return Ok(None);
    }
    Ok(Some(take_bytes(buf, len as usize, what)?))
}

fn write_varint_bytes(bytes: Option<&Bytes>, buf: &mut impl BufMut) {
    match bytes {
        Some(bytes) => {
            encode_signed_varint(bytes.len() as i32, buf);
            buf.put_slice(bytes);
        }
        None => encode_signed_varint(-1, buf),
    }
}

impl Encodable for Record {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        let mut body = BytesMut::new();
        self.attributes.encode(&mut body)?;
        encode_signed_varlong(self.timestamp_delta, &mut body);
        encode_signed_varint(self.offset_delta, &mut body);
        write_varint_bytes(self.key.as_ref(), &mut body);
        write_varint_bytes(self.value.as_ref(), &mut body);
        // no headers
        encode_signed_varint(0, &mut body);

        let len = i32::try_from(body.len()).context("record too large")?;
        encode_signed_varint(len, buf);
        buf.put_slice(&body);
        Ok(())
    }
}

impl Encodable for RecordBatch {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        let mut records = BytesMut::new();
        for record in &self.records {
            record.encode(&mut records)?;
        }

        let header = &self.header;
        let batch_length =
            i32::try_from(BATCH_HEADER_LEN + records.len()).context("batch too large")?;
        header.base_offset.encode(buf)?;
        batch_length.encode(buf)?;
        header.partition_leader_epoch.encode(buf)?;
        header.magic.encode(buf)?;
        header.crc.encode(buf)?;
        header.attributes.encode(buf)?;
        header.last_offset_delta.encode(buf)?;
        header.base_timestamp.encode(buf)?;
        header.max_timestamp.encode(buf)?;
        header.producer_id.encode(buf)?;
        header.producer_epoch.encode(buf)?;
        header.base_sequence.encode(buf)?;
        header.record_count.encode(buf)?;
        buf.put_slice(&records);
        Ok(())
    }
}
