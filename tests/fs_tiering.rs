//! End-to-end tiering over the filesystem adapters.

mod helpers;

use frostbit::store::{FsColdStore, FsHotStore};
use frostbit::{ColdKeyScheme, MigrationEngine, PassControl, ReadResolver, Tier};
use helpers::{aged, test_settings};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn sharded_compressed_archive_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let hot = Arc::new(FsHotStore::new(dir.path().join("hot")));
    let cold = Arc::new(FsColdStore::new(dir.path().join("cold")));

    for (id, days) in [("inv/2023/001", 400), ("inv/2023/002", 380), ("inv/2024/100", 3)] {
        hot.insert(&aged(id, days, json!({"total": days, "lines": ["a", "b"]})))
            .await
            .unwrap();
    }

    let scheme = ColdKeyScheme::Sharded {
        prefix: "invoices".to_string(),
        shards: 16,
    };
    let mut settings = test_settings(100);
    settings.compress = true;
    settings.verify_read_back = true;
    settings.key_scheme = scheme.clone();

    let engine = MigrationEngine::new(hot.clone(), cold.clone(), settings).unwrap();
    let report = engine.run_configured_pass(&PassControl::new()).await.unwrap();
    assert_eq!(report.migrated, 2, "{:?}", report);

    // Blobs live at the sharded path and nothing else was written.
    for id in ["inv/2023/001", "inv/2023/002"] {
        let path = scheme
            .key_for(id)
            .split('/')
            .fold(dir.path().join("cold"), |p, seg| p.join(seg));
        assert!(path.is_file(), "missing {}", path.display());
    }

    let resolver = ReadResolver::new(hot.clone(), cold.clone(), scheme);
    let old = resolver
        .resolve("inv/2023/001", "tenant-1")
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(old.tier, Tier::Cold);
    assert_eq!(old.record.payload["total"], 400);

    let recent = resolver
        .resolve("inv/2024/100", "tenant-1")
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(recent.tier, Tier::Hot);

    let rerun = engine.run_configured_pass(&PassControl::new()).await.unwrap();
    assert_eq!(rerun.selected, 0);
}

#[tokio::test]
async fn toggling_compression_keeps_records_reachable() {
    let dir = tempfile::tempdir().unwrap();
    let hot = Arc::new(FsHotStore::new(dir.path().join("hot")));
    let cold = Arc::new(FsColdStore::new(dir.path().join("cold")));
    hot.insert(&aged("plain", 200, json!({}))).await.unwrap();

    MigrationEngine::new(hot.clone(), cold.clone(), test_settings(10))
        .unwrap()
        .run_configured_pass(&PassControl::new())
        .await
        .unwrap();

    hot.insert(&aged("packed", 200, json!({}))).await.unwrap();
    let mut settings = test_settings(10);
    settings.compress = true;
    MigrationEngine::new(hot.clone(), cold.clone(), settings)
        .unwrap()
        .run_configured_pass(&PassControl::new())
        .await
        .unwrap();

    let resolver = ReadResolver::new(hot, cold, ColdKeyScheme::default());
    for id in ["plain", "packed"] {
        let resolved = resolver.resolve(id, "tenant-1").await.unwrap().found().unwrap();
        assert_eq!(resolved.tier, Tier::Cold);
    }
}
