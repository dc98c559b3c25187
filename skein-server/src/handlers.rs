//! Request handlers, one per supported API

use skein_metadata::{PartitionSummary, TopicCatalog};
use skein_protocol::messages::*;
use skein_protocol::primitives::{CompactArray, KafkaBool};
use skein_protocol::ErrorCode;
use tracing::debug;

use crate::config::ApiSupport;

pub fn handle_api_versions(apis: &ApiSupport, api_version: i16) -> ApiVersionsResponse {
    let error_code = apis.check(skein_protocol::ApiKey::ApiVersions, api_version);
    ApiVersionsResponse {
        error_code: error_code.code(),
        api_keys: CompactArray::new(apis.advertised().to_vec()),
        throttle_time_ms: 0,
    }
}

pub fn handle_describe_topic_partitions(
    catalog: &TopicCatalog,
    request: &DescribeTopicPartitionsRequest,
) -> DescribeTopicPartitionsResponse {
    let mut topics: Vec<_> = request
        .topics
        .items()
        .iter()
        .map(|topic| describe_topic(catalog, &topic.name.0))
        .collect();
    topics.sort_by(|a, b| a.name.0.cmp(&b.name.0));

    DescribeTopicPartitionsResponse {
        throttle_time_ms: 0,
        topics: CompactArray::new(topics),
        next_cursor: None,
    }
}

fn describe_topic(catalog: &TopicCatalog, name: &str) -> DescribeTopicPartitionsResponseTopic {
    let Some(topic) = catalog.topic_by_name(name) else {
        debug!(topic = name, "describe for unknown topic");
        return DescribeTopicPartitionsResponseTopic::unknown(name);
    };

    DescribeTopicPartitionsResponseTopic {
        error_code: ErrorCode::None.code(),
        name: name.into(),
        topic_id: topic.id,
        is_internal: KafkaBool(false),
        partitions: CompactArray::new(topic.partitions.iter().map(describe_partition).collect()),
        topic_authorized_operations: DEFAULT_TOPIC_AUTHORIZED_OPERATIONS,
    }
}

fn describe_partition(partition: &PartitionSummary) -> DescribeTopicPartitionsResponsePartition {
    DescribeTopicPartitionsResponsePartition {
        error_code: ErrorCode::None.code(),
        partition_index: partition.index,
        leader_id: partition.leader,
        leader_epoch: partition.leader_epoch,
        replica_nodes: CompactArray::new(partition.replicas.clone()),
        isr_nodes: CompactArray::new(partition.isr.clone()),
        eligible_leader_replicas: CompactArray::default(),
        last_known_elr: CompactArray::default(),
        offline_replicas: CompactArray::default(),
    }
}

/// Answers every requested partition with no records. The error code of each
/// partition is the outcome of looking up its topic id.
pub fn handle_fetch(catalog: &TopicCatalog, request: &FetchRequest) -> FetchResponse {
    let responses = request
        .topics
        .items()
        .iter()
        .map(|topic| {
            let error_code = match catalog.topic_by_id(&topic.topic_id) {
                Some(_) => ErrorCode::None,
                None => ErrorCode::UnknownTopicOrPartition,
            };
            FetchableTopicResponse {
                topic_id: topic.topic_id,
                partitions: CompactArray::new(
                    topic
                        .partitions
                        .items()
                        .iter()
                        .map(|partition| PartitionData::empty(partition.partition, error_code))
                        .collect(),
                ),
            }
        })
        .collect();

    FetchResponse {
        throttle_time_ms: 0,
        error_code: ErrorCode::None.code(),
        session_id: request.session_id,
        responses: CompactArray::new(responses),
    }
}

/// Fetch response for a version outside the supported range.
pub fn fetch_unsupported_version() -> FetchResponse {
    FetchResponse {
        throttle_time_ms: 0,
        error_code: ErrorCode::UnsupportedVersion.code(),
        session_id: 0,
        responses: CompactArray::default(),
    }
}
