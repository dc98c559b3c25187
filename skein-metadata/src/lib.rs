//! Reads the KRaft `__cluster_metadata` log and answers topic lookups from it.

pub mod batch;
pub mod log;
pub mod records;
pub mod registry;
pub mod source;

pub use log::{MetadataLog, MetadataLogWriter, MetadataRecords};
pub use records::{FeatureLevelRecord, MetadataRecord, PartitionRecord, TopicRecord};
pub use registry::{PartitionSummary, Topic, TopicCatalog, TopicRegistry};
pub use source::{FileLogSource, LogSource, MemoryLogSource};
