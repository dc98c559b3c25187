use anyhow::{ensure, Result};
use bytes::{Bytes, BytesMut};
use skein_protocol::{
    api_keys::ApiKey,
    codec::{Decodable, Encodable},
    messages::*,
    primitives::CompactArray,
    RequestHeader, ResponseHeader,
};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};
use uuid::Uuid;

const CLIENT_ID: &str = "skein-client";
/// Fetch version the client speaks.
pub const FETCH_VERSION: i16 = 16;

#[derive(Debug)]
pub struct Client {
    stream: TcpStream,
    correlation_id: i32,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        info!("Connected to broker at {}", addr);
        Ok(Self {
            stream,
            correlation_id: 0,
        })
    }

    pub async fn api_versions(&mut self, api_version: i16) -> Result<ApiVersionsResponse> {
        debug!("Sending ApiVersions v{} request...", api_version);
        self.send_request(ApiKey::ApiVersions, api_version, &ApiVersionsRequest::default())
            .await
    }

    pub async fn describe_topic_partitions(
        &mut self,
        topics: &[&str],
    ) -> Result<DescribeTopicPartitionsResponse> {
        debug!("Sending DescribeTopicPartitions request for {:?}...", topics);
        let request = DescribeTopicPartitionsRequest {
            topics: CompactArray::new(
                topics
                    .iter()
                    .map(|name| TopicRequest { name: (*name).into() })
                    .collect(),
            ),
            response_partition_limit: 100,
            cursor: None,
        };
        self.send_request(ApiKey::DescribeTopicPartitions, 0, &request)
            .await
    }

    /// Fetches from offset 0 of each listed partition.
    pub async fn fetch(&mut self, topics: &[(Uuid, Vec<i32>)]) -> Result<FetchResponse> {
        let request = FetchRequest {
            replica_id: None,
            max_wait_ms: 500,
            min_bytes: 1,
            max_bytes: 1024 * 1024,
            isolation_level: 0,
            session_id: 0,
            session_epoch: -1,
            topics: CompactArray::new(
                topics
                    .iter()
                    .map(|(topic_id, partitions)| FetchTopic {
                        topic_id: *topic_id,
                        partitions: CompactArray::new(
                            partitions
                                .iter()
                                .map(|&partition| FetchPartition {
                                    partition,
                                    current_leader_epoch: -1,
                                    fetch_offset: 0,
                                    last_fetched_epoch: -1,
                                    log_start_offset: -1,
                                    partition_max_bytes: 1024 * 1024,
                                })
                                .collect(),
                        ),
                    })
                    .collect(),
            ),
            forgotten_topics_data: CompactArray::default(),
            rack_id: "".into(),
        };
        self.send_request(ApiKey::Fetch, FETCH_VERSION, &request)
            .await
    }

    /// Sends a request and waits for the response to it.
    pub async fn send_request<R: Encodable, T: Decodable + std::fmt::Debug>(
        &mut self,
        api_key: ApiKey,
        api_version: i16,
        request: &R,
    ) -> Result<T> {
        let correlation_id = self.send(api_key as i16, api_version, request).await?;
        let (header, response) = self.read_response::<T>(api_key).await?;
        ensure!(
            header.correlation_id() == correlation_id,
            "response correlation id {} does not match request {}",
            header.correlation_id(),
            correlation_id
        );
        Ok(response)
    }

    /// Writes one request frame and returns its correlation id. The key is raw so
    /// that keys the broker does not know can be sent too.
    pub async fn send<R: Encodable>(
        &mut self,
        api_key: i16,
        api_version: i16,
        request: &R,
    ) -> Result<i32> {
        let correlation_id = self.correlation_id;
        self.correlation_id += 1;

        let header = RequestHeader {
            api_key,
            api_version,
            correlation_id,
            client_id: Some(CLIENT_ID.to_string()).into(),
        };

        let mut buf = BytesMut::new();
        header.encode(&mut buf)?;
        request.encode(&mut buf)?;

        let mut size_buf = BytesMut::with_capacity(4);
        (buf.len() as i32).encode(&mut size_buf)?;

        self.stream.write_all(&size_buf).await?;
        self.stream.write_all(&buf).await?;
        Ok(correlation_id)
    }

    /// Reads the next response frame, decoding the header layout of `api_key`.
    pub async fn read_response<T: Decodable + std::fmt::Debug>(
        &mut self,
        api_key: ApiKey,
    ) -> Result<(ResponseHeader, T)> {
        let response_size = self.stream.read_u32().await?;
        let mut response_buf = vec![0; response_size as usize];
        self.stream.read_exact(&mut response_buf).await?;
        let mut response_buf = Bytes::from(response_buf);

        let header = ResponseHeader::decode_for_api(&mut response_buf, api_key)?;
        let response = T::decode(&mut response_buf)?;
        ensure!(
            response_buf.is_empty(),
            "{} trailing bytes after {:?} response",
            response_buf.len(),
            api_key
        );

        debug!("Received response: {:?}", response);
        Ok((header, response))
    }
}
