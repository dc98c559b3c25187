//! Topic lookups backed by the metadata log.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use skein_common::{Error, Result};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::log::{MetadataLog, MetadataRecords};
use crate::records::{FeatureLevelRecord, PartitionRecord};
use crate::source::LogSource;

/// A partition as clients see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSummary {
    /// Position among the topic's partition records in file order.
    pub index: i32,
    /// The id stored in the partition record.
    pub partition_id: i32,
    pub leader: i32,
    pub leader_epoch: i32,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub name: String,
    pub id: Uuid,
    pub partitions: Vec<PartitionSummary>,
}

/// The parsed view of the metadata log.
#[derive(Debug, Default)]
pub struct TopicCatalog {
    topics: Vec<Topic>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<Uuid, usize>,
    feature_levels: Vec<FeatureLevelRecord>,
}

impl TopicCatalog {
    pub fn from_records(records: MetadataRecords) -> Self {
        let mut catalog = TopicCatalog {
            feature_levels: records.feature_levels,
            ..Default::default()
        };

        for record in records.topics {
            if catalog.by_id.contains_key(&record.topic_id) {
                debug!(topic = %record.name, id = %record.topic_id, "duplicate topic record");
                continue;
            }
            let idx = catalog.topics.len();
            catalog.by_name.insert(record.name.clone(), idx);
            catalog.by_id.insert(record.topic_id, idx);
            catalog.topics.push(Topic {
                name: record.name,
                id: record.topic_id,
                partitions: Vec::new(),
            });
        }

        for record in records.partitions {
            catalog.add_partition(record);
        }
        catalog
    }

    fn add_partition(&mut self, record: PartitionRecord) {
        let Some(&idx) = self.by_id.get(&record.topic_id) else {
            warn!(
                topic_id = %record.topic_id,
                partition_id = record.partition_id,
                "partition record for unknown topic"
            );
            return;
        };
        let topic = &mut self.topics[idx];
        topic.partitions.push(PartitionSummary {
            index: topic.partitions.len() as i32,
            partition_id: record.partition_id,
            leader: record.leader,
            leader_epoch: record.leader_epoch,
            replicas: record.replicas,
            isr: record.isr,
        });
    }

    pub fn resolve(&self, name: &str) -> Option<Uuid> {
        self.topic_by_name(name).map(|topic| topic.id)
    }

    pub fn topic_by_name(&self, name: &str) -> Option<&Topic> {
        self.by_name.get(name).map(|&idx| &self.topics[idx])
    }

    pub fn topic_by_id(&self, id: &Uuid) -> Option<&Topic> {
        self.by_id.get(id).map(|&idx| &self.topics[idx])
    }

    /// Partitions of the topic with `id`; empty for unknown ids.
    pub fn partitions_for(&self, id: &Uuid) -> &[PartitionSummary] {
        self.topic_by_id(id)
            .map(|topic| topic.partitions.as_slice())
            .unwrap_or(&[])
    }

    /// All topics in file order.
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn feature_levels(&self) -> &[FeatureLevelRecord] {
        &self.feature_levels
    }
}

/// Process-wide topic registry shared by every connection.
///
/// The log is parsed on first use. A lookup that misses the cached catalog
/// re-reads the log once, so topics created after startup become visible.
#[derive(Debug)]
pub struct TopicRegistry {
    source: Arc<dyn LogSource>,
    catalog: RwLock<Option<Arc<TopicCatalog>>>,
    loads: AtomicUsize,
}

impl TopicRegistry {
    pub fn new(source: Arc<dyn LogSource>) -> Self {
        Self {
            source,
            catalog: RwLock::new(None),
            loads: AtomicUsize::new(0),
        }
    }

    /// Returns the cached catalog, parsing the log if no caller has yet. Concurrent
    /// first callers wait on a single parse; a failed parse is retried by the next
    /// caller.
    pub async fn ensure_loaded(&self) -> Result<Arc<TopicCatalog>> {
        if let Some(catalog) = self.catalog.read().await.as_ref() {
            return Ok(Arc::clone(catalog));
        }
        self.reload(None).await
    }

    /// Returns a catalog for which `covers` holds if the log has one. When the
    /// cached catalog does not cover the lookup, the log is re-read once and the
    /// fresh catalog returned whether or not it covers it.
    pub async fn catalog_covering<F>(&self, covers: F) -> Result<Arc<TopicCatalog>>
    where
        F: Fn(&TopicCatalog) -> bool,
    {
        let current = self.ensure_loaded().await?;
        if covers(&current) {
            return Ok(current);
        }
        debug!("lookup missed the cached catalog, re-reading metadata log");
        self.reload(Some(&current)).await
    }

    /// Replaces the cached catalog unless another caller already replaced
    /// `stale` while this one waited for the lock.
    async fn reload(&self, stale: Option<&Arc<TopicCatalog>>) -> Result<Arc<TopicCatalog>> {
        let mut slot = self.catalog.write().await;
        if let Some(current) = slot.as_ref() {
            let replaced = stale.map_or(true, |stale| !Arc::ptr_eq(current, stale));
            if replaced {
                return Ok(Arc::clone(current));
            }
        }

        let catalog = Arc::new(self.load().await?);
        *slot = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    async fn load(&self) -> Result<TopicCatalog> {
        let source = Arc::clone(&self.source);
        let data = tokio::task::spawn_blocking(move || source.read_all())
            .await
            .map_err(|e| Error::Internal(format!("metadata log read task failed: {e}")))??;
        let records = MetadataLog::parse(data)?;
        let catalog = TopicCatalog::from_records(records);
        self.loads.fetch_add(1, Ordering::Relaxed);
        info!(
            topics = catalog.topics().len(),
            feature_levels = catalog.feature_levels().len(),
            "loaded topic registry"
        );
        Ok(catalog)
    }

    pub async fn is_loaded(&self) -> bool {
        self.catalog.read().await.is_some()
    }

    /// Number of successful parses of the log so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    pub async fn resolve(&self, name: &str) -> Result<Option<Uuid>> {
        let catalog = self
            .catalog_covering(|catalog| catalog.resolve(name).is_some())
            .await?;
        Ok(catalog.resolve(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MetadataLogWriter;
    use crate::records::{MetadataRecord, TopicRecord};
    use crate::source::MemoryLogSource;
    use bytes::Bytes;

    fn topic(name: &str, id: u128) -> MetadataRecord {
        MetadataRecord::Topic(TopicRecord {
            version: 0,
            name: name.to_string(),
            topic_id: Uuid::from_u128(id),
        })
    }

    fn partition(topic_id: u128, partition_id: i32, leader: i32) -> MetadataRecord {
        MetadataRecord::Partition(PartitionRecord {
            version: 1,
            partition_id,
            topic_id: Uuid::from_u128(topic_id),
            replicas: vec![leader],
            isr: vec![leader],
            leader,
            ..Default::default()
        })
    }

    #[derive(Debug)]
    struct CountingSource {
        data: Bytes,
        reads: AtomicUsize,
    }

    impl LogSource for CountingSource {
        fn read_all(&self) -> Result<Bytes> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.data.clone())
        }
    }

    /// Serves whatever log bytes were last stored.
    #[derive(Debug, Default)]
    struct GrowingSource {
        data: std::sync::Mutex<Bytes>,
    }

    impl GrowingSource {
        fn store(&self, data: Bytes) {
            *self.data.lock().unwrap() = data;
        }
    }

    impl LogSource for GrowingSource {
        fn read_all(&self) -> Result<Bytes> {
            Ok(self.data.lock().unwrap().clone())
        }
    }

    #[derive(Debug)]
    struct BrokenSource;

    impl LogSource for BrokenSource {
        fn read_all(&self) -> Result<Bytes> {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "metadata log",
            )))
        }
    }

    fn sample_log() -> Bytes {
        let mut writer = MetadataLogWriter::new();
        writer
            .batch(&[topic("saz", 0x91)])
            .unwrap()
            .batch(&[partition(0x91, 7, 1), topic("foo", 0x22), partition(0x22, 0, 2)])
            .unwrap()
            .batch(&[partition(0x91, 3, 1)])
            .unwrap();
        writer.finish()
    }

    #[test]
    fn test_partition_index_is_file_order_ordinal() {
        let records = MetadataLog::parse(sample_log()).unwrap();
        let catalog = TopicCatalog::from_records(records);

        let saz = catalog.topic_by_name("saz").unwrap();
        assert_eq!(saz.id, Uuid::from_u128(0x91));
        let indexes: Vec<_> = saz.partitions.iter().map(|p| p.index).collect();
        let stored: Vec<_> = saz.partitions.iter().map(|p| p.partition_id).collect();
        assert_eq!(indexes, vec![0, 1]);
        assert_eq!(stored, vec![7, 3]);

        assert_eq!(catalog.partitions_for(&Uuid::from_u128(0x22)).len(), 1);
        assert!(catalog.partitions_for(&Uuid::nil()).is_empty());
        assert_eq!(catalog.resolve("missing"), None);
    }

    #[test]
    fn test_orphan_partitions_are_dropped() {
        let mut writer = MetadataLogWriter::new();
        writer.batch(&[partition(0x55, 0, 1), topic("t", 1)]).unwrap();
        let catalog = TopicCatalog::from_records(MetadataLog::parse(writer.finish()).unwrap());
        assert!(catalog.topic_by_name("t").unwrap().partitions.is_empty());
        assert!(catalog.topic_by_id(&Uuid::from_u128(0x55)).is_none());
    }

    #[tokio::test]
    async fn test_registry_parses_log_once() {
        let source = Arc::new(CountingSource {
            data: sample_log(),
            reads: AtomicUsize::new(0),
        });
        let registry = Arc::new(TopicRegistry::new(source.clone()));
        assert!(!registry.is_loaded().await);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.resolve("saz").await.unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(Uuid::from_u128(0x91)));
        }

        assert_eq!(registry.resolve("foo").await.unwrap(), Some(Uuid::from_u128(0x22)));
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
        assert_eq!(registry.load_count(), 1);
        assert!(registry.is_loaded().await);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let registry = TopicRegistry::new(Arc::new(BrokenSource));
        assert!(registry.ensure_loaded().await.is_err());
        assert!(!registry.is_loaded().await);
        assert!(matches!(
            registry.resolve("saz").await,
            Err(Error::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_miss_rereads_grown_log() {
        let source = Arc::new(GrowingSource::default());
        let mut writer = MetadataLogWriter::new();
        writer.batch(&[topic("a", 1)]).unwrap();
        source.store(writer.finish());

        let registry = TopicRegistry::new(source.clone());
        assert_eq!(registry.resolve("a").await.unwrap(), Some(Uuid::from_u128(1)));

        let mut writer = MetadataLogWriter::new();
        writer
            .batch(&[topic("a", 1)])
            .unwrap()
            .batch(&[topic("b", 2), partition(2, 0, 1)])
            .unwrap();
        source.store(writer.finish());

        assert_eq!(registry.resolve("b").await.unwrap(), Some(Uuid::from_u128(2)));
        assert_eq!(registry.load_count(), 2);
        let catalog = registry.ensure_loaded().await.unwrap();
        assert_eq!(catalog.partitions_for(&Uuid::from_u128(2)).len(), 1);

        // a hit does not touch the log
        assert!(registry.resolve("a").await.unwrap().is_some());
        assert_eq!(registry.load_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_reload() {
        let source = Arc::new(CountingSource {
            data: sample_log(),
            reads: AtomicUsize::new(0),
        });
        let registry = Arc::new(TopicRegistry::new(source.clone()));
        registry.ensure_loaded().await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.resolve("missing").await.unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), None);
        }
        // every miss re-reads unless another caller's reload already landed
        let reads = source.reads.load(Ordering::SeqCst);
        assert!((2..=5).contains(&reads), "{reads} reads");
    }

    #[tokio::test]
    async fn test_corrupt_log_surfaces_as_error() {
        let registry = TopicRegistry::new(Arc::new(MemoryLogSource::new(vec![0u8; 20])));
        let err = registry.ensure_loaded().await.unwrap_err();
        assert!(err.is_corrupt_log());
    }
}
