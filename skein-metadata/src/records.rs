//! Metadata record payloads carried in record values.

use anyhow::{ensure, Result};
use bytes::{Buf, BufMut};
use skein_protocol::primitives::{CompactArray, CompactString, TaggedFields};
use skein_protocol::{Decodable, Encodable};
use uuid::Uuid;

pub const TOPIC_RECORD: u8 = 2;
pub const PARTITION_RECORD: u8 = 3;
pub const FEATURE_LEVEL_RECORD: u8 = 12;

/// Frame version written in front of every record value.
pub const FRAME_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRecord {
    pub version: u8,
    pub name: String,
    pub topic_id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionRecord {
    pub version: u8,
    /// As stored in the log. Not the index clients see.
    pub partition_id: i32,
    pub topic_id: Uuid,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
    pub removing_replicas: Vec<i32>,
    pub adding_replicas: Vec<i32>,
    pub leader: i32,
    pub leader_epoch: i32,
    pub partition_epoch: i32,
    pub directories: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLevelRecord {
    pub version: u8,
    pub name: String,
    pub feature_level: i16,
}

/// A decoded record value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataRecord {
    Topic(TopicRecord),
    Partition(PartitionRecord),
    FeatureLevel(FeatureLevelRecord),
    /// Any record type the broker does not serve from.
    Ignored { record_type: u8 },
}

impl MetadataRecord {
    /// Classifies a record value by its type byte and decodes the payload.
    pub fn from_value(value: &mut impl Buf) -> Result<Self> {
        ensure!(
            value.remaining() >= 2,
            "record value too short for frame version and type"
        );
        let _frame_version = value.get_u8();
        let record_type = value.get_u8();
        let record = match record_type {
            TOPIC_RECORD => MetadataRecord::Topic(TopicRecord::decode(value)?),
            PARTITION_RECORD => MetadataRecord::Partition(PartitionRecord::decode(value)?),
            FEATURE_LEVEL_RECORD => {
                MetadataRecord::FeatureLevel(FeatureLevelRecord::decode(value)?)
            }
            other => MetadataRecord::Ignored { record_type: other },
        };
        Ok(record)
    }

    pub fn record_type(&self) -> u8 {
        match self {
            MetadataRecord::Topic(_) => TOPIC_RECORD,
            MetadataRecord::Partition(_) => PARTITION_RECORD,
            MetadataRecord::FeatureLevel(_) => FEATURE_LEVEL_RECORD,
            MetadataRecord::Ignored { record_type } => *record_type,
        }
    }
}

impl Encodable for MetadataRecord {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        buf.put_u8(FRAME_VERSION);
        buf.put_u8(self.record_type());
        match self {
            MetadataRecord::Topic(record) => record.encode(buf),
            MetadataRecord::Partition(record) => record.encode(buf),
            MetadataRecord::FeatureLevel(record) => record.encode(buf),
            MetadataRecord::Ignored { .. } => Ok(()),
        }
    }
}

impl Decodable for TopicRecord {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let version = u8::decode(buf)?;
        let name = CompactString::decode(buf)?.into_inner();
        let topic_id = Uuid::decode(buf)?;
        if buf.has_remaining() {
            TaggedFields::decode(buf)?;
        }
        Ok(Self {
            version,
            name,
            topic_id,
        })
    }
}

impl Encodable for TopicRecord {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.version.encode(buf)?;
        CompactString(self.name.clone()).encode(buf)?;
        self.topic_id.encode(buf)?;
        TaggedFields.encode(buf)
    }
}

impl Decodable for PartitionRecord {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let version = u8::decode(buf)?;
        let partition_id = i32::decode(buf)?;
        let topic_id = Uuid::decode(buf)?;
        let replicas = CompactArray::<i32>::decode(buf)?.into_items();
        let isr = CompactArray::<i32>::decode(buf)?.into_items();
        let removing_replicas = CompactArray::<i32>::decode(buf)?.into_items();
        let adding_replicas = CompactArray::<i32>::decode(buf)?.into_items();
        let leader = i32::decode(buf)?;
        let leader_epoch = i32::decode(buf)?;
        let partition_epoch = i32::decode(buf)?;
        // Older record versions end here apart from the tag buffer.
        let directories = if buf.remaining() > 1 {
            CompactArray::<Uuid>::decode(buf)?.into_items()
        } else {
            Vec::new()
        };
        if buf.has_remaining() {
            TaggedFields::decode(buf)?;
        }
        Ok(Self {
            version,
            partition_id,
            topic_id,
            replicas,
            isr,
            removing_replicas,
            adding_replicas,
            leader,
            leader_epoch,
            partition_epoch,
            directories,
        })
    }
}

impl Encodable for PartitionRecord {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.version.encode(buf)?;
        self.partition_id.encode(buf)?;
        self.topic_id.encode(buf)?;
        CompactArray::new(self.replicas.clone()).encode(buf)?;
        CompactArray::new(self.isr.clone()).encode(buf)?;
        CompactArray::new(self.removing_replicas.clone()).encode(buf)?;
        CompactArray::new(self.adding_replicas.clone()).encode(buf)?;
        self.leader.encode(buf)?;
        self.leader_epoch.encode(buf)?;
        self.partition_epoch.encode(buf)?;
        CompactArray::new(self.directories.clone()).encode(buf)?;
        TaggedFields.encode(buf)
    }
}

impl Decodable for FeatureLevelRecord {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let version = u8::decode(buf)?;
        let name = CompactString::decode(buf)?.into_inner();
        let feature_level = i16::decode(buf)?;
        if buf.has_remaining() {
            TaggedFields::decode(buf)?;
        }
        Ok(Self {
            version,
            name,
            feature_level,
        })
    }
}

impl Encodable for FeatureLevelRecord {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.version.encode(buf)?;
        CompactString(self.name.clone()).encode(buf)?;
        self.feature_level.encode(buf)?;
        TaggedFields.encode(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_record_value() {
        // frame 1, type 2, version 0, "saz", uuid, no tags
        let mut value = vec![1u8, 2, 0, 4, b's', b'a', b'z'];
        value.extend_from_slice(&[0; 15]);
        value.push(0x91);
        value.push(0);

        match MetadataRecord::from_value(&mut &value[..]).unwrap() {
            MetadataRecord::Topic(topic) => {
                assert_eq!(topic.name, "saz");
                assert_eq!(topic.topic_id, Uuid::from_u128(0x91));
            }
            other => panic!("expected topic record, got {other:?}"),
        }
    }

    #[test]
    fn test_partition_record_value() {
        let record = PartitionRecord {
            version: 1,
            partition_id: 1,
            topic_id: Uuid::from_u128(7),
            replicas: vec![1],
            isr: vec![1],
            leader: 1,
            directories: vec![Uuid::from_u128(9)],
            ..Default::default()
        };
        let value = MetadataRecord::Partition(record.clone()).to_bytes().unwrap();
        assert_eq!(&value[..2], &[FRAME_VERSION, PARTITION_RECORD]);
        assert_eq!(
            MetadataRecord::from_value(&mut value.freeze()).unwrap(),
            MetadataRecord::Partition(record)
        );
    }

    #[test]
    fn test_partition_record_without_directories() {
        let mut value = vec![1u8, 3, 0];
        value.extend_from_slice(&5i32.to_be_bytes());
        value.extend_from_slice(&[0; 16]);
        // replicas [2], isr [2], removing [], adding []
        value.extend_from_slice(&[2, 0, 0, 0, 2, 2, 0, 0, 0, 2, 1, 1]);
        value.extend_from_slice(&2i32.to_be_bytes());
        value.extend_from_slice(&0i32.to_be_bytes());
        value.extend_from_slice(&0i32.to_be_bytes());
        value.push(0);

        let MetadataRecord::Partition(record) = MetadataRecord::from_value(&mut &value[..]).unwrap()
        else {
            panic!("expected partition record");
        };
        assert_eq!(record.partition_id, 5);
        assert_eq!(record.replicas, vec![2]);
        assert_eq!(record.leader, 2);
        assert!(record.directories.is_empty());
    }

    #[test]
    fn test_feature_level_and_unknown_types() {
        let value = MetadataRecord::FeatureLevel(FeatureLevelRecord {
            version: 0,
            name: "metadata.version".into(),
            feature_level: 20,
        })
        .to_bytes()
        .unwrap();
        let MetadataRecord::FeatureLevel(feature) =
            MetadataRecord::from_value(&mut value.freeze()).unwrap()
        else {
            panic!("expected feature level record");
        };
        assert_eq!(feature.feature_level, 20);

        let ignored = MetadataRecord::from_value(&mut &[1u8, 21, 0, 0][..]).unwrap();
        assert_eq!(ignored, MetadataRecord::Ignored { record_type: 21 });
    }

    #[test]
    fn test_truncated_topic_record_fails() {
        let value = [1u8, 2, 0, 4, b's', b'a'];
        assert!(MetadataRecord::from_value(&mut &value[..]).is_err());
        assert!(MetadataRecord::from_value(&mut &[1u8][..]).is_err());
    }
}
