//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use skein_protocol::{ApiKey, ApiVersion, ErrorCode};

use crate::error::ServerError;

/// Where KRaft writes the first metadata log segment.
pub const DEFAULT_METADATA_LOG: &str =
    "/tmp/kraft-combined-logs/__cluster_metadata-0/00000000000000000000.log";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9092";
pub const DEFAULT_MAX_CONNECTIONS: usize = 1024;
pub const DEFAULT_MAX_FRAME_BYTES: usize = 100 * 1024 * 1024;

/// The APIs this broker answers and the version range of each.
///
/// Only the advertised ranges are listed in ApiVersions responses. Unlisted
/// ranges are still served and version-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSupport {
    advertised: Vec<ApiVersion>,
    unlisted: Vec<ApiVersion>,
}

impl ApiSupport {
    pub fn new(advertised: Vec<ApiVersion>, unlisted: Vec<ApiVersion>) -> Self {
        Self {
            advertised,
            unlisted,
        }
    }

    /// The ranges reported to clients by ApiVersions.
    pub fn advertised(&self) -> &[ApiVersion] {
        &self.advertised
    }

    pub fn range(&self, api_key: ApiKey) -> Option<&ApiVersion> {
        self.advertised
            .iter()
            .chain(&self.unlisted)
            .find(|version| version.api_key == api_key as i16)
    }

    pub fn is_supported(&self, api_key: ApiKey) -> bool {
        self.range(api_key).is_some()
    }

    /// `ErrorCode::None` when `api_version` is in range for `api_key`.
    pub fn check(&self, api_key: ApiKey, api_version: i16) -> ErrorCode {
        match self.range(api_key) {
            Some(range) if range.supports(api_version) => ErrorCode::None,
            _ => ErrorCode::UnsupportedVersion,
        }
    }
}

impl Default for ApiSupport {
    fn default() -> Self {
        Self::new(
            vec![
                ApiVersion::new(ApiKey::ApiVersions, 0, 4),
                ApiVersion::new(ApiKey::DescribeTopicPartitions, 0, 0),
            ],
            vec![ApiVersion::new(ApiKey::Fetch, 13, 16)],
        )
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Connections served at once; further accepts wait for a free slot.
    pub max_connections: usize,
    /// Close connections that send nothing for this long.
    pub idle_timeout: Option<Duration>,
    /// Largest request frame accepted, in bytes.
    pub max_frame_bytes: usize,
    pub metadata_log: PathBuf,
    pub supported_apis: ApiSupport,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9092)),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            idle_timeout: None,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            metadata_log: PathBuf::from(DEFAULT_METADATA_LOG),
            supported_apis: ApiSupport::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.max_connections == 0 {
            return Err(ServerError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.max_frame_bytes < 8 {
            return Err(ServerError::Config(format!(
                "max_frame_bytes {} cannot hold a request header",
                self.max_frame_bytes
            )));
        }
        if self.idle_timeout == Some(Duration::ZERO) {
            return Err(ServerError::Config(
                "idle_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_api_table() {
        let apis = ApiSupport::default();
        let listed: Vec<_> = apis.advertised().iter().map(|v| v.api_key).collect();
        assert_eq!(listed, vec![18, 75]);
        assert!(apis.is_supported(ApiKey::Fetch));
        assert_eq!(apis.check(ApiKey::ApiVersions, 4), ErrorCode::None);
        assert_eq!(apis.check(ApiKey::ApiVersions, 5), ErrorCode::UnsupportedVersion);
        assert_eq!(apis.check(ApiKey::ApiVersions, -1), ErrorCode::UnsupportedVersion);
        assert_eq!(apis.check(ApiKey::Fetch, 12), ErrorCode::UnsupportedVersion);
        assert_eq!(apis.check(ApiKey::Fetch, 16), ErrorCode::None);
        assert_eq!(apis.check(ApiKey::Produce, 0), ErrorCode::UnsupportedVersion);
        assert!(!apis.is_supported(ApiKey::Metadata));
    }

    #[test]
    fn test_defaults_validate() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let config = ServerConfig {
            max_connections: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ServerError::Config(_))));

        let config = ServerConfig {
            idle_timeout: Some(Duration::ZERO),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
