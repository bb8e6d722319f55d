use std::sync::Arc;

use gallerist::gallery::{AddOutcome, GalleryRegistry};
use gallerist::store::{ConfigStore, SqliteConfigStore};
use tempfile::TempDir;

async fn open(tmp: &TempDir) -> Arc<dyn ConfigStore> {
    Arc::new(
        SqliteConfigStore::open(&tmp.path().join("gallerist.db"))
            .await
            .unwrap(),
    )
}

#[tokio::test]
async fn galleries_persist_across_reopen() {
    let tmp = TempDir::new().unwrap();
    {
        let registry = GalleryRegistry::new(open(&tmp).await, "gallery_channels", 8);
        registry.add("1").await.unwrap();
        registry.add("2").await.unwrap();
    }

    let registry = GalleryRegistry::new(open(&tmp).await, "gallery_channels", 8);
    assert_eq!(registry.list().await.unwrap(), vec!["1", "2"]);
    assert_eq!(registry.add("2").await.unwrap(), AddOutcome::AlreadyPresent);
}

#[tokio::test]
async fn concurrent_adds_against_sqlite_are_all_kept() {
    let tmp = TempDir::new().unwrap();
    let registry = Arc::new(GalleryRegistry::new(open(&tmp).await, "gallery_channels", 64));

    let mut handles = Vec::new();
    for i in 0..8 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move { registry.add(&format!("{i}")).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(registry.list().await.unwrap().len(), 8);
}
