use std::sync::Arc;

use skein_metadata::{
    FileLogSource, MetadataLogWriter, MetadataRecord, PartitionRecord, TopicRecord, TopicRegistry,
};
use uuid::Uuid;

const SAZ_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0091);

fn write_log(dir: &std::path::Path) -> std::path::PathBuf {
    let mut writer = MetadataLogWriter::new();
    writer
        .batch(&[MetadataRecord::Topic(TopicRecord {
            version: 0,
            name: "saz".into(),
            topic_id: SAZ_ID,
        })])
        .unwrap();
    for partition_id in [0, 1] {
        writer
            .batch(&[MetadataRecord::Partition(PartitionRecord {
                version: 1,
                partition_id,
                topic_id: SAZ_ID,
                replicas: vec![1],
                isr: vec![1],
                leader: 1,
                leader_epoch: 0,
                ..Default::default()
            })])
            .unwrap();
    }

    let segment_dir = dir.join("__cluster_metadata-0");
    std::fs::create_dir_all(&segment_dir).unwrap();
    let path = segment_dir.join("00000000000000000000.log");
    std::fs::write(&path, writer.finish()).unwrap();
    path
}

#[tokio::test]
async fn test_registry_from_segment_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(dir.path());

    let registry = TopicRegistry::new(Arc::new(FileLogSource::new(path)));
    let catalog = registry.ensure_loaded().await.unwrap();

    assert_eq!(catalog.resolve("saz"), Some(SAZ_ID));
    let partitions = catalog.partitions_for(&SAZ_ID);
    assert_eq!(partitions.len(), 2);
    assert_eq!(partitions[0].index, 0);
    assert_eq!(partitions[1].index, 1);
    assert_eq!(partitions[1].leader, 1);
    assert_eq!(catalog.resolve("missing"), None);
}

#[tokio::test]
async fn test_registry_with_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let registry = TopicRegistry::new(Arc::new(FileLogSource::new(dir.path().join("absent.log"))));
    let err = registry.ensure_loaded().await.unwrap_err();
    assert!(matches!(err, skein_common::Error::Io(_)));
}

#[tokio::test]
async fn test_topic_appended_after_first_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_log(dir.path());
    let registry = TopicRegistry::new(Arc::new(FileLogSource::new(&path)));
    assert_eq!(registry.resolve("saz").await.unwrap(), Some(SAZ_ID));

    let new_id = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0092);
    let mut writer = MetadataLogWriter::new();
    writer
        .batch(&[MetadataRecord::Topic(TopicRecord {
            version: 0,
            name: "baz".into(),
            topic_id: new_id,
        })])
        .unwrap();
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    std::io::Write::write_all(&mut file, &writer.finish()).unwrap();

    assert_eq!(registry.resolve("baz").await.unwrap(), Some(new_id));
    let catalog = registry.ensure_loaded().await.unwrap();
    assert_eq!(catalog.partitions_for(&SAZ_ID).len(), 2);
}
