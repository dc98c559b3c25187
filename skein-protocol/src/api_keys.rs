//! Kafka protocol API keys

use anyhow::Result;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

use crate::codec::{Decodable, Encodable};
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive, Default)]
#[repr(i16)]
pub enum ApiKey {
    Produce = 0,
    Fetch = 1,
    ListOffsets = 2,
    Metadata = 3,
    OffsetCommit = 8,
    OffsetFetch = 9,
    FindCoordinator = 10,
    JoinGroup = 11,
    Heartbeat = 12,
    LeaveGroup = 13,
    SyncGroup = 14,
    DescribeGroups = 15,
    ListGroups = 16,
    SaslHandshake = 17,
    #[default]
    ApiVersions = 18,
    CreateTopics = 19,
    DeleteTopics = 20,
    InitProducerId = 22,
    DescribeConfigs = 32,
    SaslAuthenticate = 36,
    CreatePartitions = 37,
    DescribeCluster = 60,
    DescribeTopicPartitions = 75,
}

impl ApiKey {
    /// Maps a wire value to a known key; `None` for keys this broker has never heard of.
    pub fn from_i16(key: i16) -> Option<Self> {
        <Self as FromPrimitive>::from_i16(key)
    }

    /// Whether requests of this key and version use the flexible (tagged) header.
    pub fn is_flexible(self, api_version: i16) -> bool {
        match self {
            ApiKey::ApiVersions => api_version >= 3,
            ApiKey::Fetch => api_version >= 12,
            ApiKey::Metadata => api_version >= 9,
            ApiKey::Produce => api_version >= 9,
            ApiKey::CreateTopics => api_version >= 5,
            ApiKey::DeleteTopics => api_version >= 4,
            ApiKey::DescribeCluster | ApiKey::DescribeTopicPartitions => true,
            _ => false,
        }
    }
}

impl Encodable for ApiKey {
    fn encode(&self, buf: &mut impl bytes::BufMut) -> Result<()> {
        (*self as i16).encode(buf)
    }
}

impl Decodable for ApiKey {
    fn decode(buf: &mut impl bytes::Buf) -> Result<Self> {
        let key = i16::decode(buf)?;
        ApiKey::from_i16(key).ok_or_else(|| anyhow::anyhow!("Unknown API key: {}", key))
    }
}
