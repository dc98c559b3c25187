//! Routes decoded requests to their handlers

use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use skein_metadata::{TopicCatalog, TopicRegistry};
use skein_protocol::codec::Encodable;
use skein_protocol::messages::*;
use skein_protocol::{ApiKey, ErrorCode};
use tracing::{debug, warn};

use crate::config::ApiSupport;
use crate::error::ServerError;
use crate::handlers;
use crate::Result;

pub enum ResponseBody {
    ApiVersions(ApiVersionsResponse),
    DescribeTopicPartitions(DescribeTopicPartitionsResponse),
    Fetch(FetchResponse),
}

impl ResponseBody {
    pub fn api_key(&self) -> ApiKey {
        match self {
            ResponseBody::ApiVersions(_) => ApiKey::ApiVersions,
            ResponseBody::DescribeTopicPartitions(_) => ApiKey::DescribeTopicPartitions,
            ResponseBody::Fetch(_) => ApiKey::Fetch,
        }
    }
}

impl Encodable for ResponseBody {
    fn encode(&self, buf: &mut impl BufMut) -> anyhow::Result<()> {
        match self {
            ResponseBody::ApiVersions(res) => res.encode(buf),
            ResponseBody::DescribeTopicPartitions(res) => res.encode(buf),
            ResponseBody::Fetch(res) => res.encode(buf),
        }
    }
}

/// Turns request frames into response payloads.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<TopicRegistry>,
    apis: ApiSupport,
}

impl Dispatcher {
    pub fn new(registry: Arc<TopicRegistry>, apis: ApiSupport) -> Self {
        Self { registry, apis }
    }

    /// Handles one request frame. Returns the response payload (header and body,
    /// without the length prefix), or `None` when the request gets no reply.
    pub async fn dispatch(&self, frame: &[u8]) -> Result<Option<BytesMut>> {
        let (header, body_offset) = RequestHeader::parse(frame)?;
        debug!(
            api_key = header.api_key,
            api_version = header.api_version,
            correlation_id = header.correlation_id,
            client_id = ?header.client_id.0,
            "received request"
        );

        let served = header.api().filter(|key| self.apis.is_supported(*key));
        if let Some(api_key) = served {
            if self.apis.check(api_key, header.api_version) != ErrorCode::None {
                warn!(?api_key, api_version = header.api_version, "unsupported version");
                return self
                    .unsupported_version(api_key, header.api_version)
                    .map(|body| encode_response(&header, &body))
                    .transpose();
            }
        }

        let request = match (header.api(), served) {
            // Known to the protocol but switched off in the API table.
            (Some(_), None) => Request::Unsupported {
                api_key: header.api_key,
            },
            _ => {
                let mut body = &frame[body_offset..];
                Request::decode(&header, &mut body).map_err(|e| {
                    ServerError::DecodingError(format!(
                        "api key {} v{}: {e:#}",
                        header.api_key, header.api_version
                    ))
                })?
            }
        };

        match self.handle_request(request, &header).await? {
            Some(body) => encode_response(&header, &body).map(Some),
            None => Ok(None),
        }
    }

    async fn handle_request(
        &self,
        request: Request,
        header: &RequestHeader,
    ) -> Result<Option<ResponseBody>> {
        let body = match request {
            Request::ApiVersions(_) => ResponseBody::ApiVersions(handlers::handle_api_versions(
                &self.apis,
                header.api_version,
            )),
            Request::DescribeTopicPartitions(request) => {
                let catalog = self
                    .registry
                    .catalog_covering(|catalog| describes_known_topics(catalog, &request))
                    .await?;
                ResponseBody::DescribeTopicPartitions(handlers::handle_describe_topic_partitions(
                    &catalog, &request,
                ))
            }
            Request::Fetch(request) => {
                let catalog = self
                    .registry
                    .catalog_covering(|catalog| fetches_known_topics(catalog, &request))
                    .await?;
                ResponseBody::Fetch(handlers::handle_fetch(&catalog, &request))
            }
            Request::Unsupported { api_key } => {
                warn!(api_key, "unsupported API key, not replying");
                return Ok(None);
            }
        };
        Ok(Some(body))
    }

    fn unsupported_version(&self, api_key: ApiKey, api_version: i16) -> Option<ResponseBody> {
        match api_key {
            ApiKey::ApiVersions => Some(ResponseBody::ApiVersions(handlers::handle_api_versions(
                &self.apis,
                api_version,
            ))),
            // No top-level error code to carry the failure.
            ApiKey::DescribeTopicPartitions => Some(ResponseBody::DescribeTopicPartitions(
                DescribeTopicPartitionsResponse::default(),
            )),
            ApiKey::Fetch => Some(ResponseBody::Fetch(handlers::fetch_unsupported_version())),
            _ => None,
        }
    }
}

fn describes_known_topics(catalog: &TopicCatalog, request: &DescribeTopicPartitionsRequest) -> bool {
    request
        .topics
        .items()
        .iter()
        .all(|topic| catalog.topic_by_name(&topic.name.0).is_some())
}

fn fetches_known_topics(catalog: &TopicCatalog, request: &FetchRequest) -> bool {
    request
        .topics
        .items()
        .iter()
        .all(|topic| catalog.topic_by_id(&topic.topic_id).is_some())
}

fn encode_response(header: &RequestHeader, body: &ResponseBody) -> Result<BytesMut> {
    let mut buf = BytesMut::new();
    ResponseHeader::for_api(body.api_key(), header.correlation_id).encode(&mut buf)?;
    body.encode(&mut buf)?;
    Ok(buf)
}
