//! Parsing a whole metadata log into records.

use bytes::{Buf, Bytes, BytesMut};
use skein_common::{Error, Result};
use skein_protocol::Encodable;

use crate::batch::{Record, RecordBatch};
use crate::records::{FeatureLevelRecord, MetadataRecord, PartitionRecord, TopicRecord};

/// Everything the broker keeps from the metadata log, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecords {
    pub topics: Vec<TopicRecord>,
    pub partitions: Vec<PartitionRecord>,
    pub feature_levels: Vec<FeatureLevelRecord>,
    pub batch_count: usize,
    /// Records that were empty or of a type the broker does not use.
    pub ignored: usize,
}

impl MetadataRecords {
    fn push(&mut self, record: MetadataRecord) {
        match record {
            MetadataRecord::Topic(topic) => self.topics.push(topic),
            MetadataRecord::Partition(partition) => self.partitions.push(partition),
            MetadataRecord::FeatureLevel(feature) => self.feature_levels.push(feature),
            MetadataRecord::Ignored { record_type } => {
                tracing::trace!(record_type, "skipping metadata record");
                self.ignored += 1;
            }
        }
    }
}

#[derive(Debug)]
pub struct MetadataLog;

impl MetadataLog {
    /// Parses every batch in `data`. Any malformed batch fails the whole parse with
    /// [`Error::CorruptLog`] carrying the batch's byte offset.
    pub fn parse(mut data: Bytes) -> Result<MetadataRecords> {
        let total = data.len();
        let mut records = MetadataRecords::default();

        while data.has_remaining() {
            let offset = total - data.remaining();
            let batch = RecordBatch::read(&mut data)
                .map_err(|e| Error::corrupt_log(offset, format!("{e:#}")))?;
            records.batch_count += 1;

            for record in batch.records {
                let offset_delta = record.offset_delta;
                let Some(mut value) = record.value else {
                    records.ignored += 1;
                    continue;
                };
                let record = MetadataRecord::from_value(&mut value).map_err(|e| {
                    Error::corrupt_log(offset, format!("record {offset_delta}: {e:#}"))
                })?;
                records.push(record);
            }
        }

        tracing::debug!(
            batches = records.batch_count,
            topics = records.topics.len(),
            partitions = records.partitions.len(),
            feature_levels = records.feature_levels.len(),
            ignored = records.ignored,
            "parsed metadata log"
        );
        Ok(records)
    }
}

/// Builds metadata log bytes, one batch per call to [`MetadataLogWriter::batch`].
#[derive(Debug, Default)]
pub struct MetadataLogWriter {
    buf: BytesMut,
    next_offset: i64,
}

impl MetadataLogWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a batch holding `records` as consecutive offsets.
    pub fn batch(&mut self, records: &[MetadataRecord]) -> anyhow::Result<&mut Self> {
        let mut batch_records = Vec::with_capacity(records.len());
        for (delta, record) in records.iter().enumerate() {
            batch_records.push(Record::with_value(delta as i32, record.to_bytes()?.freeze()));
        }
        let batch = RecordBatch::new(self.next_offset, batch_records);
        batch.encode(&mut self.buf)?;
        self.next_offset += records.len() as i64;
        Ok(self)
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BATCH_HEADER_LEN, BATCH_PREFIX_LEN};
    use uuid::Uuid;

    fn topic(name: &str, id: u128) -> MetadataRecord {
        MetadataRecord::Topic(TopicRecord {
            version: 0,
            name: name.to_string(),
            topic_id: Uuid::from_u128(id),
        })
    }

    #[test]
    fn test_parse_empty_log() {
        let records = MetadataLog::parse(Bytes::new()).unwrap();
        assert_eq!(records, MetadataRecords::default());
    }

    #[test]
    fn test_parse_multiple_batches_in_order() {
        let mut writer = MetadataLogWriter::new();
        writer
            .batch(&[MetadataRecord::FeatureLevel(FeatureLevelRecord {
                version: 0,
                name: "metadata.version".into(),
                feature_level: 20,
            })])
            .unwrap()
            .batch(&[topic("foo", 1), MetadataRecord::Ignored { record_type: 21 }])
            .unwrap()
            .batch(&[topic("bar", 2)])
            .unwrap();

        let records = MetadataLog::parse(writer.finish()).unwrap();
        assert_eq!(records.batch_count, 3);
        assert_eq!(records.feature_levels.len(), 1);
        let names: Vec<_> = records.topics.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["foo", "bar"]);
        assert_eq!(records.ignored, 1);
    }

    #[test]
    fn test_overstated_record_count_reports_batch_offset() {
        let mut writer = MetadataLogWriter::new();
        writer.batch(&[topic("first", 1)]).unwrap();
        let first_len = writer.buf.len();
        writer.batch(&[topic("second", 2)]).unwrap();
        writer.batch(&[topic("third", 3)]).unwrap();
        let mut data = BytesMut::from(&writer.finish()[..]);

        // record_count is the last header field of the second batch
        let count_at = first_len + BATCH_PREFIX_LEN + BATCH_HEADER_LEN - 4;
        data[count_at..count_at + 4].copy_from_slice(&2i32.to_be_bytes());

        let err = MetadataLog::parse(data.freeze()).unwrap_err();
        match err {
            Error::CorruptLog { offset, reason } => {
                assert_eq!(offset, first_len);
                assert!(reason.contains("declares 2 records"), "{reason}");
            }
            other => panic!("expected corrupt log, got {other:?}"),
        }
    }

    #[test]
    fn test_trailing_garbage_is_corrupt() {
        let mut writer = MetadataLogWriter::new();
        writer.batch(&[topic("foo", 1)]).unwrap();
        let mut data = BytesMut::from(&writer.finish()[..]);
        data.extend_from_slice(&[0, 0, 0]);

        assert!(MetadataLog::parse(data.freeze())
            .unwrap_err()
            .is_corrupt_log());
    }
}
