//! Kafka protocol message types

use anyhow::{ensure, Result};
use bytes::{Buf, BufMut};
use uuid::Uuid;

use crate::error_codes::ErrorCode;
use crate::primitives::{
    CompactArray, CompactNullableBytes, CompactNullableString, CompactString, KafkaBool,
    NullableString, TaggedFields,
};
use crate::{ApiKey, Decodable, Encodable};

/// Authorized operations bitmask reported for every described topic
/// (READ, WRITE, CREATE, DELETE, ALTER, DESCRIBE, DESCRIBE_CONFIGS, ALTER_CONFIGS).
pub const DEFAULT_TOPIC_AUTHORIZED_OPERATIONS: i32 = 0x0000_0df8;

/// Marker byte for a null nullable struct such as the describe cursor.
const NULL_STRUCT_MARKER: u8 = 0xff;

// --- Request header ---

/// Layout of a request header, which depends on the API and its version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderVersion {
    /// Unknown API: everything after the correlation id is the client id.
    Legacy,
    /// Client id as an INT16-length nullable string.
    V1,
    /// V1 plus a tagged field buffer.
    V2,
}

impl HeaderVersion {
    pub fn for_request(api_key: i16, api_version: i16) -> Self {
        match ApiKey::from_i16(api_key) {
            None => HeaderVersion::Legacy,
            Some(key) if key.is_flexible(api_version) => HeaderVersion::V2,
            Some(_) => HeaderVersion::V1,
        }
    }
}

/// A Kafka protocol request header
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RequestHeader {
    /// The API key of this request, kept raw so unknown keys survive decoding
    pub api_key: i16,
    /// The API version of this request
    pub api_version: i16,
    /// The correlation ID of this request
    pub correlation_id: i32,
    /// The client ID string
    pub client_id: NullableString,
}

impl RequestHeader {
    pub fn new(api_key: ApiKey, api_version: i16, correlation_id: i32, client_id: &str) -> Self {
        Self {
            api_key: api_key as i16,
            api_version,
            correlation_id,
            client_id: NullableString(Some(client_id.to_string())),
        }
    }

    /// The API this header addresses, if the broker knows the key.
    pub fn api(&self) -> Option<ApiKey> {
        ApiKey::from_i16(self.api_key)
    }

    pub fn version(&self) -> HeaderVersion {
        HeaderVersion::for_request(self.api_key, self.api_version)
    }

    /// Decodes the header at the start of `frame` and returns it together with the
    /// offset at which the request body begins.
    pub fn parse(frame: &[u8]) -> Result<(Self, usize)> {
        ensure!(
            frame.len() >= 8,
            "request header needs 8 bytes, frame has {}",
            frame.len()
        );
        let api_key = i16::from_be_bytes([frame[0], frame[1]]);
        let api_version = i16::from_be_bytes([frame[2], frame[3]]);
        let version = HeaderVersion::for_request(api_key, api_version);

        let mut cursor = frame;
        let header = Self::decode_versioned(&mut cursor, version)?;
        Ok((header, frame.len() - cursor.len()))
    }

    pub fn decode_versioned(buf: &mut impl Buf, version: HeaderVersion) -> Result<Self> {
        let api_key = i16::decode(buf)?;
        let api_version = i16::decode(buf)?;
        let correlation_id = i32::decode(buf)?;
        let client_id = match version {
            HeaderVersion::Legacy => {
                let rest = buf.copy_to_bytes(buf.remaining());
                NullableString(Some(String::from_utf8_lossy(&rest).into_owned()))
            }
            HeaderVersion::V1 => NullableString::decode(buf)?,
            HeaderVersion::V2 => {
                let client_id = NullableString::decode(buf)?;
                TaggedFields::decode(buf)?;
                client_id
            }
        };

        Ok(Self {
            api_key,
            api_version,
            correlation_id,
            client_id,
        })
    }
}

impl Encodable for RequestHeader {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.api_key.encode(buf)?;
        self.api_version.encode(buf)?;
        self.correlation_id.encode(buf)?;
        match self.version() {
            HeaderVersion::Legacy => {
                if let Some(client_id) = &self.client_id.0 {
                    buf.put_slice(client_id.as_bytes());
                }
            }
            HeaderVersion::V1 => self.client_id.encode(buf)?,
            HeaderVersion::V2 => {
                self.client_id.encode(buf)?;
                TaggedFields.encode(buf)?;
            }
        }
        Ok(())
    }
}

// --- Response header ---

/// A Kafka protocol response header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseHeader {
    /// Correlation id only
    V0 { correlation_id: i32 },
    /// Correlation id followed by a tagged field buffer
    V1 { correlation_id: i32 },
}

impl ResponseHeader {
    /// Picks the header layout for `api_key`. ApiVersions always answers with V0 so
    /// that clients can parse it before versions are negotiated.
    pub fn for_api(api_key: ApiKey, correlation_id: i32) -> Self {
        match api_key {
            ApiKey::DescribeTopicPartitions | ApiKey::Fetch => {
                ResponseHeader::V1 { correlation_id }
            }
            _ => ResponseHeader::V0 { correlation_id },
        }
    }

    pub fn correlation_id(&self) -> i32 {
        match *self {
            ResponseHeader::V0 { correlation_id } | ResponseHeader::V1 { correlation_id } => {
                correlation_id
            }
        }
    }

    pub fn decode_for_api(buf: &mut impl Buf, api_key: ApiKey) -> Result<Self> {
        let correlation_id = i32::decode(buf)?;
        match Self::for_api(api_key, correlation_id) {
            ResponseHeader::V0 { .. } => Ok(ResponseHeader::V0 { correlation_id }),
            ResponseHeader::V1 { .. } => {
                TaggedFields::decode(buf)?;
                Ok(ResponseHeader::V1 { correlation_id })
            }
        }
    }
}

impl Encodable for ResponseHeader {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        match self {
            ResponseHeader::V0 { correlation_id } => correlation_id.encode(buf),
            ResponseHeader::V1 { correlation_id } => {
                correlation_id.encode(buf)?;
                TaggedFields.encode(buf)
            }
        }
    }
}

// --- Request bodies ---

/// A decoded request body, one variant per API the broker answers.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    ApiVersions(ApiVersionsRequest),
    DescribeTopicPartitions(DescribeTopicPartitionsRequest),
    Fetch(FetchRequest),
    /// A key with no handler; the broker does not reply to it.
    Unsupported { api_key: i16 },
}

impl Request {
    /// Decodes the body that follows `header`.
    pub fn decode(header: &RequestHeader, buf: &mut impl Buf) -> Result<Self> {
        let request = match header.api() {
            Some(ApiKey::ApiVersions) => Request::ApiVersions(ApiVersionsRequest::decode_versioned(
                buf,
                header.api_version,
            )?),
            Some(ApiKey::DescribeTopicPartitions) => {
                Request::DescribeTopicPartitions(DescribeTopicPartitionsRequest::decode(buf)?)
            }
            Some(ApiKey::Fetch) => {
                Request::Fetch(FetchRequest::decode_versioned(buf, header.api_version)?)
            }
            _ => Request::Unsupported {
                api_key: header.api_key,
            },
        };
        Ok(request)
    }
}

/// ApiVersions Request. Empty before v3; v3+ names the client software.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiVersionsRequest {
    pub client_software_name: Option<CompactString>,
    pub client_software_version: Option<CompactString>,
}

impl ApiVersionsRequest {
    pub fn decode_versioned(buf: &mut impl Buf, api_version: i16) -> Result<Self> {
        if api_version < 3 || !buf.has_remaining() {
            return Ok(Self::default());
        }
        let client_software_name = CompactString::decode(buf)?;
        let client_software_version = CompactString::decode(buf)?;
        TaggedFields::decode(buf)?;
        Ok(Self {
            client_software_name: Some(client_software_name),
            client_software_version: Some(client_software_version),
        })
    }
}

impl Encodable for ApiVersionsRequest {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        if let (Some(name), Some(version)) =
            (&self.client_software_name, &self.client_software_version)
        {
            name.encode(buf)?;
            version.encode(buf)?;
            TaggedFields.encode(buf)?;
        }
        Ok(())
    }
}

/// ApiVersions Response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiVersionsResponse {
    /// The error code, or 0 if there was no error.
    pub error_code: i16,
    /// The API versions supported by the broker.
    pub api_keys: CompactArray<ApiVersion>,
    pub throttle_time_ms: i32,
}

impl Encodable for ApiVersionsResponse {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.error_code.encode(buf)?;
        self.api_keys.encode(buf)?;
        self.throttle_time_ms.encode(buf)?;
        TaggedFields.encode(buf)
    }
}

impl Decodable for ApiVersionsResponse {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let error_code = i16::decode(buf)?;
        let api_keys = CompactArray::<ApiVersion>::decode(buf)?;
        let throttle_time_ms = i32::decode(buf)?;
        TaggedFields::decode(buf)?;
        Ok(Self {
            error_code,
            api_keys,
            throttle_time_ms,
        })
    }
}

/// A single API key and its supported version range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ApiVersion {
    pub api_key: i16,
    /// The minimum supported version, inclusive.
    pub min_version: i16,
    /// The maximum supported version, inclusive.
    pub max_version: i16,
}

impl ApiVersion {
    pub fn new(api_key: ApiKey, min_version: i16, max_version: i16) -> Self {
        Self {
            api_key: api_key as i16,
            min_version,
            max_version,
        }
    }

    pub fn supports(&self, api_version: i16) -> bool {
        (self.min_version..=self.max_version).contains(&api_version)
    }
}

impl Encodable for ApiVersion {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.api_key.encode(buf)?;
        self.min_version.encode(buf)?;
        self.max_version.encode(buf)?;
        TaggedFields.encode(buf)
    }
}

impl Decodable for ApiVersion {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let api_key = i16::decode(buf)?;
        let min_version = i16::decode(buf)?;
        let max_version = i16::decode(buf)?;
        TaggedFields::decode(buf)?;
        Ok(Self {
            api_key,
            min_version,
            max_version,
        })
    }
}

// --- DescribeTopicPartitions ---

/// DescribeTopicPartitions Request (v0)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeTopicPartitionsRequest {
    pub topics: CompactArray<TopicRequest>,
    pub response_partition_limit: i32,
    pub cursor: Option<Cursor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicRequest {
    pub name: CompactString,
}

/// Where a paginated describe left off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    pub topic_name: CompactString,
    pub partition_index: i32,
}

fn encode_nullable_cursor(cursor: &Option<Cursor>, buf: &mut impl BufMut) -> Result<()> {
    match cursor {
        Some(cursor) => cursor.encode(buf),
        None => {
            buf.put_u8(NULL_STRUCT_MARKER);
            Ok(())
        }
    }
}

fn decode_nullable_cursor(buf: &mut impl Buf) -> Result<Option<Cursor>> {
    ensure!(buf.has_remaining(), "unexpected EOF reading cursor");
    if buf.chunk()[0] == NULL_STRUCT_MARKER {
        buf.advance(1);
        return Ok(None);
    }
    Ok(Some(Cursor::decode(buf)?))
}

impl Encodable for DescribeTopicPartitionsRequest {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.topics.encode(buf)?;
        self.response_partition_limit.encode(buf)?;
        encode_nullable_cursor(&self.cursor, buf)?;
        TaggedFields.encode(buf)
    }
}

impl Decodable for DescribeTopicPartitionsRequest {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let topics = CompactArray::<TopicRequest>::decode(buf)?;
        let response_partition_limit = i32::decode(buf)?;
        let cursor = decode_nullable_cursor(buf)?;
        TaggedFields::decode(buf)?;
        Ok(Self {
            topics,
            response_partition_limit,
            cursor,
        })
    }
}

impl Encodable for TopicRequest {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.name.encode(buf)?;
        TaggedFields.encode(buf)
    }
}

impl Decodable for TopicRequest {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let name = CompactString::decode(buf)?;
        TaggedFields::decode(buf)?;
        Ok(Self { name })
    }
}

impl Encodable for Cursor {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.topic_name.encode(buf)?;
        self.partition_index.encode(buf)?;
        TaggedFields.encode(buf)
    }
}

impl Decodable for Cursor {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let topic_name = CompactString::decode(buf)?;
        let partition_index = i32::decode(buf)?;
        TaggedFields::decode(buf)?;
        Ok(Self {
            topic_name,
            partition_index,
        })
    }
}

/// DescribeTopicPartitions Response (v0)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeTopicPartitionsResponse {
    pub throttle_time_ms: i32,
    pub topics: CompactArray<DescribeTopicPartitionsResponseTopic>,
    /// Always null: every partition is returned in one response.
    pub next_cursor: Option<Cursor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeTopicPartitionsResponseTopic {
    pub error_code: i16,
    pub name: CompactNullableString,
    pub topic_id: Uuid,
    pub is_internal: KafkaBool,
    pub partitions: CompactArray<DescribeTopicPartitionsResponsePartition>,
    pub topic_authorized_operations: i32,
}

impl DescribeTopicPartitionsResponseTopic {
    /// Entry for a topic the metadata log does not contain.
    pub fn unknown(name: &str) -> Self {
        Self {
            error_code: ErrorCode::UnknownTopicOrPartition.code(),
            name: CompactNullableString::from(name),
            topic_id: Uuid::nil(),
            is_internal: KafkaBool(false),
            partitions: CompactArray::default(),
            topic_authorized_operations: DEFAULT_TOPIC_AUTHORIZED_OPERATIONS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeTopicPartitionsResponsePartition {
    pub error_code: i16,
    pub partition_index: i32,
    pub leader_id: i32,
    pub leader_epoch: i32,
    pub replica_nodes: CompactArray<i32>,
    pub isr_nodes: CompactArray<i32>,
    pub eligible_leader_replicas: CompactArray<i32>,
    pub last_known_elr: CompactArray<i32>,
    pub offline_replicas: CompactArray<i32>,
}

impl Encodable for DescribeTopicPartitionsResponse {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.throttle_time_ms.encode(buf)?;
        self.topics.encode(buf)?;
        encode_nullable_cursor(&self.next_cursor, buf)?;
        TaggedFields.encode(buf)
    }
}

impl Decodable for DescribeTopicPartitionsResponse {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let throttle_time_ms = i32::decode(buf)?;
        let topics = CompactArray::decode(buf)?;
        let next_cursor = decode_nullable_cursor(buf)?;
        TaggedFields::decode(buf)?;
        Ok(Self {
            throttle_time_ms,
            topics,
            next_cursor,
        })
    }
}

impl Encodable for DescribeTopicPartitionsResponseTopic {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.error_code.encode(buf)?;
        self.name.encode(buf)?;
        self.topic_id.encode(buf)?;
        self.is_internal.encode(buf)?;
        self.partitions.encode(buf)?;
        self.topic_authorized_operations.encode(buf)?;
        TaggedFields.encode(buf)
    }
}

impl Decodable for DescribeTopicPartitionsResponseTopic {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let error_code = i16::decode(buf)?;
        let name = CompactNullableString::decode(buf)?;
        let topic_id = Uuid::decode(buf)?;
        let is_internal = KafkaBool::decode(buf)?;
        let partitions = CompactArray::decode(buf)?;
        let topic_authorized_operations = i32::decode(buf)?;
        TaggedFields::decode(buf)?;
        Ok(Self {
            error_code,
            name,
            topic_id,
            is_internal,
            partitions,
            topic_authorized_operations,
        })
    }
}

impl Encodable for DescribeTopicPartitionsResponsePartition {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.error_code.encode(buf)?;
        self.partition_index.encode(buf)?;
        self.leader_id.encode(buf)?;
        self.leader_epoch.encode(buf)?;
        self.replica_nodes.encode(buf)?;
        self.isr_nodes.encode(buf)?;
        self.eligible_leader_replicas.encode(buf)?;
        self.last_known_elr.encode(buf)?;
        self.offline_replicas.encode(buf)?;
        TaggedFields.encode(buf)
    }
}

impl Decodable for DescribeTopicPartitionsResponsePartition {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let error_code = i16::decode(buf)?;
        let partition_index = i32::decode(buf)?;
        let leader_id = i32::decode(buf)?;
        let leader_epoch = i32::decode(buf)?;
        let replica_nodes = CompactArray::decode(buf)?;
        let isr_nodes = CompactArray::decode(buf)?;
        let eligible_leader_replicas = CompactArray::decode(buf)?;
        let last_known_elr = CompactArray::decode(buf)?;
        let offline_replicas = CompactArray::decode(buf)?;
        TaggedFields::decode(buf)?;
        Ok(Self {
            error_code,
            partition_index,
            leader_id,
            leader_epoch,
            replica_nodes,
            isr_nodes,
            eligible_leader_replicas,
            last_known_elr,
            offline_replicas,
        })
    }
}

// --- Fetch ---

/// Fetch Request (v13+, topics addressed by id)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    /// Present on the wire only before v15.
    pub replica_id: Option<i32>,
    pub max_wait_ms: i32,
    pub min_bytes: i32,
    pub max_bytes: i32,
    pub isolation_level: i8,
    pub session_id: i32,
    pub session_epoch: i32,
    pub topics: CompactArray<FetchTopic>,
    pub forgotten_topics_data: CompactArray<ForgottenTopic>,
    pub rack_id: CompactString,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchTopic {
    pub topic_id: Uuid,
    pub partitions: CompactArray<FetchPartition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchPartition {
    pub partition: i32,
    pub current_leader_epoch: i32,
    pub fetch_offset: i64,
    pub last_fetched_epoch: i32,
    pub log_start_offset: i64,
    pub partition_max_bytes: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForgottenTopic {
    pub topic_id: Uuid,
    pub partitions: CompactArray<i32>,
}

impl FetchRequest {
    pub fn decode_versioned(buf: &mut impl Buf, api_version: i16) -> Result<Self> {
        let replica_id = if api_version < 15 {
            Some(i32::decode(buf)?)
        } else {
            None
        };
        let max_wait_ms = i32::decode(buf)?;
        let min_bytes = i32::decode(buf)?;
        let max_bytes = i32::decode(buf)?;
        let isolation_level = i8::decode(buf)?;
        let session_id = i32::decode(buf)?;
        let session_epoch = i32::decode(buf)?;
        let topics = CompactArray::decode(buf)?;
        let forgotten_topics_data = CompactArray::decode(buf)?;
        let rack_id = CompactString::decode(buf)?;
        TaggedFields::decode(buf)?;
        Ok(Self {
            replica_id,
            max_wait_ms,
            min_bytes,
            max_bytes,
            isolation_level,
            session_id,
            session_epoch,
            topics,
            forgotten_topics_data,
            rack_id,
        })
    }
}

impl Encodable for FetchRequest {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        if let Some(replica_id) = self.replica_id {
            replica_id.encode(buf)?;
        }
        self.max_wait_ms.encode(buf)?;
        self.min_bytes.encode(buf)?;
        self.max_bytes.encode(buf)?;
        self.isolation_level.encode(buf)?;
        self.session_id.encode(buf)?;
        self.session_epoch.encode(buf)?;
        self.topics.encode(buf)?;
        self.forgotten_topics_data.encode(buf)?;
        self.rack_id.encode(buf)?;
        TaggedFields.encode(buf)
    }
}

impl Encodable for FetchTopic {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.topic_id.encode(buf)?;
        self.partitions.encode(buf)?;
        TaggedFields.encode(buf)
    }
}

impl Decodable for FetchTopic {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let topic_id = Uuid::decode(buf)?;
        let partitions = CompactArray::decode(buf)?;
        TaggedFields::decode(buf)?;
        Ok(Self {
            topic_id,
            partitions,
        })
    }
}

impl Encodable for FetchPartition {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.partition.encode(buf)?;
        self.current_leader_epoch.encode(buf)?;
        self.fetch_offset.encode(buf)?;
        self.last_fetched_epoch.encode(buf)?;
        self.log_start_offset.encode(buf)?;
        self.partition_max_bytes.encode(buf)?;
        TaggedFields.encode(buf)
    }
}

impl Decodable for FetchPartition {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let partition = i32::decode(buf)?;
        let current_leader_epoch = i32::decode(buf)?;
        let fetch_offset = i64::decode(buf)?;
        let last_fetched_epoch = i32::decode(buf)?;
        let log_start_offset = i64::decode(buf)?;
        let partition_max_bytes = i32::decode(buf)?;
        TaggedFields::decode(buf)?;
        Ok(Self {
            partition,
            current_leader_epoch,
            fetch_offset,
            last_fetched_epoch,
            log_start_offset,
            partition_max_bytes,
        })
    }
}

impl Encodable for ForgottenTopic {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.topic_id.encode(buf)?;
        self.partitions.encode(buf)?;
        TaggedFields.encode(buf)
    }
}

impl Decodable for ForgottenTopic {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let topic_id = Uuid::decode(buf)?;
        let partitions = CompactArray::decode(buf)?;
        TaggedFields::decode(buf)?;
        Ok(Self {
            topic_id,
            partitions,
        })
    }
}

/// Fetch Response (v13+)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
    pub throttle_time_ms: i32,
    pub error_code: i16,
    pub session_id: i32,
    pub responses: CompactArray<FetchableTopicResponse>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchableTopicResponse {
    pub topic_id: Uuid,
    pub partitions: CompactArray<PartitionData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionData {
    pub partition_index: i32,
    pub error_code: i16,
    pub high_watermark: i64,
    pub last_stable_offset: i64,
    pub log_start_offset: i64,
    pub aborted_transactions: CompactArray<AbortedTransaction>,
    pub preferred_read_replica: i32,
    /// Record batches for the partition; null when nothing is returned.
    pub records: CompactNullableBytes,
}

impl PartitionData {
    /// A partition entry carrying no records.
    pub fn empty(partition_index: i32, error_code: ErrorCode) -> Self {
        Self {
            partition_index,
            error_code: error_code.code(),
            high_watermark: 0,
            last_stable_offset: 0,
            log_start_offset: 0,
            aborted_transactions: CompactArray::default(),
            preferred_read_replica: -1,
            records: CompactNullableBytes(None),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AbortedTransaction {
    pub producer_id: i64,
    pub first_offset: i64,
}

impl Encodable for FetchResponse {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.throttle_time_ms.encode(buf)?;
        self.error_code.encode(buf)?;
        self.session_id.encode(buf)?;
        self.responses.encode(buf)?;
        TaggedFields.encode(buf)
    }
}

impl Decodable for FetchResponse {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let throttle_time_ms = i32::decode(buf)?;
        let error_code = i16::decode(buf)?;
        let session_id = i32::decode(buf)?;
        let responses = CompactArray::decode(buf)?;
        TaggedFields::decode(buf)?;
        Ok(Self {
            throttle_time_ms,
            error_code,
            session_id,
            responses,
        })
    }
}

impl Encodable for FetchableTopicResponse {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.topic_id.encode(buf)?;
        self.partitions.encode(buf)?;
        TaggedFields.encode(buf)
    }
}

impl Decodable for FetchableTopicResponse {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let topic_id = Uuid::decode(buf)?;
        let partitions = CompactArray::decode(buf)?;
        TaggedFields::decode(buf)?;
        Ok(Self {
            topic_id,
            partitions,
        })
    }
}

impl Encodable for PartitionData {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.partition_index.encode(buf)?;
        self.error_code.encode(buf)?;
        self.high_watermark.encode(buf)?;
        self.last_stable_offset.encode(buf)?;
        self.log_start_offset.encode(buf)?;
        self.aborted_transactions.encode(buf)?;
        self.preferred_read_replica.encode(buf)?;
        self.records.encode(buf)?;
        TaggedFields.encode(buf)
    }
}

impl Decodable for PartitionData {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let partition_index = i32::decode(buf)?;
        let error_code = i16::decode(buf)?;
        let high_watermark = i64::decode(buf)?;
        let last_stable_offset = i64::decode(buf)?;
        let log_start_offset = i64::decode(buf)?;
        let aborted_transactions = CompactArray::decode(buf)?;
        let preferred_read_replica = i32::decode(buf)?;
        let records = CompactNullableBytes::decode(buf)?;
        TaggedFields::decode(buf)?;
        Ok(Self {
            partition_index,
            error_code,
            high_watermark,
            last_stable_offset,
            log_start_offset,
            aborted_transactions,
            preferred_read_replica,
            records,
        })
    }
}

impl Encodable for AbortedTransaction {
    fn encode(&self, buf: &mut impl BufMut) -> Result<()> {
        self.producer_id.encode(buf)?;
        self.first_offset.encode(buf)?;
        TaggedFields.encode(buf)
    }
}

impl Decodable for AbortedTransaction {
    fn decode(buf: &mut impl Buf) -> Result<Self> {
        let producer_id = i64::decode(buf)?;
        let first_offset = i64::decode(buf)?;
        TaggedFields::decode(buf)?;
        Ok(Self {
            producer_id,
            first_offset,
        })
    }
}
