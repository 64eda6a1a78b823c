//! Integration tests for the fetch coordinator
//!
//! These tests drive `Coordinator::fetch_all` end to end against a mock
//! gateway and a temporary cache directory.

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use param_fetcher::app::cache::CacheLock;
use param_fetcher::app::{
    CacheConfig, ClientConfig, ContentDigest, Coordinator, CoordinatorConfig, FetchSession,
};
use param_fetcher::errors::{AppError, FetchError};

const SIZE_2K: u64 = 2048;
const SIZE_8M: u64 = 8 << 20;

/// Mock gateway plus a cache directory shared by every coordinator it builds
struct Harness {
    server: MockServer,
    cache: TempDir,
}

impl Harness {
    async fn new() -> Self {
        Self {
            server: MockServer::start_async().await,
            cache: TempDir::new().unwrap(),
        }
    }

    /// A coordinator with a fresh session, as a separate process would have
    fn coordinator(&self, trust_params: bool) -> Coordinator {
        self.coordinator_in(Arc::new(FetchSession::new()), trust_params)
    }

    fn coordinator_in(&self, session: Arc<FetchSession>, trust_params: bool) -> Coordinator {
        Coordinator::new(
            CoordinatorConfig::default().with_lock_retry_interval(Duration::from_millis(20)),
            CacheConfig::with_cache_root(self.cache.path().to_path_buf())
                .with_trust_params(trust_params),
            ClientConfig::default().with_gateway(self.server.url("/ipfs/")),
            session,
        )
        .unwrap()
    }

    fn cached(&self, name: &str) -> std::path::PathBuf {
        self.cache.path().join(name)
    }
}

fn digest_of(content: &[u8]) -> String {
    ContentDigest::of_bytes(content).to_hex()
}

fn manifest(entries: &[(&str, &str, &str, u64)]) -> Vec<u8> {
    let body: Vec<String> = entries
        .iter()
        .map(|(name, cid, digest, size)| {
            format!(
                r#""{}": {{"cid": "{}", "digest": "{}", "sector_size": {}}}"#,
                name, cid, digest, size
            )
        })
        .collect();
    format!("{{{}}}", body.join(", ")).into_bytes()
}

/// Test that size-specific parameters for other sizes are never requested
#[tokio::test]
async fn test_params_for_other_sizes_are_skipped() {
    let harness = Harness::new().await;
    let any = harness
        .server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200).body("unexpected");
        })
        .await;

    let params = manifest(&[
        ("v28-stacked-8m.params", "QmBig", "00", SIZE_8M),
        ("v28-stacked-unsized.params", "QmZero", "00", 0),
    ]);

    harness
        .coordinator(false)
        .fetch_all(&params, b"{}", SIZE_2K, &CancellationToken::new())
        .await
        .unwrap();

    any.assert_hits_async(0).await;
    assert!(!harness.cached("v28-stacked-8m.params").exists());
    assert!(!harness.cached("v28-stacked-unsized.params").exists());
}

/// Test that a verifying key with size 0 is fetched for any storage size
#[tokio::test]
async fn test_verifying_key_is_fetched_and_matches_digest() {
    let harness = Harness::new().await;
    let body = b"verifying key for a 2KiB sector".to_vec();
    let digest = digest_of(&body);
    let mock = harness
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/ipfs/X");
            then.status(200).body(body.clone());
        })
        .await;

    let params = manifest(&[("a.vk", "X", &digest, 0)]);
    harness
        .coordinator(false)
        .fetch_all(&params, b"{}", SIZE_2K, &CancellationToken::new())
        .await
        .unwrap();

    mock.assert_async().await;
    let fetched = ContentDigest::of_file(&harness.cached("a.vk")).unwrap();
    assert_eq!(fetched.to_hex(), digest);
}

/// Test that a verified cache triggers no requests on later calls
#[tokio::test]
async fn test_second_fetch_makes_no_requests() {
    let harness = Harness::new().await;
    let params_body = b"groth params".to_vec();
    let srs_body = b"inner product srs".to_vec();
    let params_mock = harness
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/ipfs/QmParams");
            then.status(200).body(params_body.clone());
        })
        .await;
    let srs_mock = harness
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/ipfs/QmSrs");
            then.status(200).body(srs_body.clone());
        })
        .await;

    let params = manifest(&[(
        "v28-stacked-2k.params",
        "QmParams",
        &digest_of(&params_body),
        SIZE_2K,
    )]);
    let srs = manifest(&[(
        "v28-fil-inner-product-v1.srs",
        "QmSrs",
        &digest_of(&srs_body),
        0,
    )]);

    let session = Arc::new(FetchSession::new());
    let coordinator = harness.coordinator_in(Arc::clone(&session), false);
    let cancel = CancellationToken::new();

    coordinator.fetch_all(&params, &srs, SIZE_2K, &cancel).await.unwrap();
    coordinator.fetch_all(&params, &srs, SIZE_2K, &cancel).await.unwrap();
    // A fresh session still finds the files valid on disk
    harness
        .coordinator(false)
        .fetch_all(&params, &srs, SIZE_2K, &cancel)
        .await
        .unwrap();

    params_mock.assert_hits_async(1).await;
    srs_mock.assert_hits_async(1).await;
}

/// Test that concurrent calls on one session fetch each artifact once
#[tokio::test]
async fn test_concurrent_calls_fetch_each_artifact_once() {
    let harness = Harness::new().await;
    let mut mocks = Vec::new();
    let mut entries = Vec::new();
    for i in 0..4 {
        let body = format!("artifact body {}", i).into_bytes();
        let cid = format!("QmArtifact{}", i);
        let path = format!("/ipfs/{}", cid);
        mocks.push(
            harness
                .server
                .mock_async(|when, then| {
                    when.method(GET).path(path);
                    then.status(200)
                        .body(body.clone())
                        .delay(Duration::from_millis(50));
                })
                .await,
        );
        entries.push((format!("artifact-{}.vk", i), cid, digest_of(&body)));
    }
    let borrowed: Vec<(&str, &str, &str, u64)> = entries
        .iter()
        .map(|(name, cid, digest)| (name.as_str(), cid.as_str(), digest.as_str(), 0))
        .collect();
    let params = manifest(&borrowed);

    let coordinator = harness.coordinator_in(Arc::new(FetchSession::new()), false);
    let cancel = CancellationToken::new();
    let calls = (0..8).map(|_| coordinator.fetch_all(&params, b"{}", SIZE_2K, &cancel));
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(|r| r.is_ok()));
    for mock in &mocks {
        mock.assert_hits_async(1).await;
    }
}

/// Test that a corrupted cached file is removed and fetched again
#[tokio::test]
async fn test_corrupted_file_is_repaired() {
    let harness = Harness::new().await;
    let body = b"the real parameter bytes".to_vec();
    let corrupted = b"the real parameter byteX".to_vec();
    std::fs::write(harness.cached("v28-stacked-2k.params"), &corrupted).unwrap();

    // The corrupted copy is already full length, so resuming appends nothing
    let resume = harness
        .server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/ipfs/QmParams")
                .header("range", format!("bytes={}-", corrupted.len()));
            then.status(416);
        })
        .await;
    let full = harness
        .server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/ipfs/QmParams")
                .header("range", "bytes=0-");
            then.status(200).body(body.clone());
        })
        .await;

    let params = manifest(&[("v28-stacked-2k.params", "QmParams", &digest_of(&body), SIZE_2K)]);
    harness
        .coordinator(false)
        .fetch_all(&params, b"{}", SIZE_2K, &CancellationToken::new())
        .await
        .unwrap();

    resume.assert_hits_async(1).await;
    full.assert_hits_async(1).await;
    assert_eq!(std::fs::read(harness.cached("v28-stacked-2k.params")).unwrap(), body);
}

/// Test that a partially downloaded file is resumed with a range request
#[tokio::test]
async fn test_partial_file_is_resumed() {
    let harness = Harness::new().await;
    let body = b"first half|second half".to_vec();
    let (head, tail) = body.split_at(11);
    std::fs::write(harness.cached("a.vk"), head).unwrap();
    let tail = tail.to_vec();

    let mock = harness
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/ipfs/QmKey").header("range", "bytes=11-");
            then.status(206).body(tail.clone());
        })
        .await;

    let params = manifest(&[("a.vk", "QmKey", &digest_of(&body), 0)]);
    harness
        .coordinator(false)
        .fetch_all(&params, b"{}", SIZE_2K, &CancellationToken::new())
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(std::fs::read(harness.cached("a.vk")).unwrap(), body);
}

/// Test that TRUST_PARAMS skips verification of `.params` files only
#[tokio::test]
async fn test_trust_bypass_keeps_corrupted_params() {
    let harness = Harness::new().await;
    std::fs::write(harness.cached("v28-stacked-2k.params"), b"corrupt").unwrap();
    let good_update = b"empty sector update params".to_vec();
    std::fs::write(
        harness.cached("v28-empty-sector-update-2k.params"),
        b"corrupt",
    )
    .unwrap();

    let trusted = harness
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/ipfs/QmTrusted");
            then.status(200).body("replacement");
        })
        .await;
    let update = harness
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/ipfs/QmUpdate");
            then.status(200).body(good_update.clone());
        })
        .await;

    let params = manifest(&[
        (
            "v28-stacked-2k.params",
            "QmTrusted",
            &digest_of(b"replacement"),
            SIZE_2K,
        ),
        (
            "v28-empty-sector-update-2k.params",
            "QmUpdate",
            &digest_of(&good_update),
            SIZE_2K,
        ),
    ]);

    harness
        .coordinator(true)
        .fetch_all(&params, b"{}", SIZE_2K, &CancellationToken::new())
        .await
        .unwrap();

    trusted.assert_hits_async(0).await;
    assert_eq!(
        std::fs::read(harness.cached("v28-stacked-2k.params")).unwrap(),
        b"corrupt"
    );
    assert!(update.hits_async().await >= 1);
    assert_eq!(
        std::fs::read(harness.cached("v28-empty-sector-update-2k.params")).unwrap(),
        good_update
    );
}

/// Test that a task waiting on another fetcher's lock re-checks before downloading
#[tokio::test]
async fn test_waiting_for_lock_rechecks_file() {
    let harness = Harness::new().await;
    let body = b"fetched by another process".to_vec();
    let mock = harness
        .server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200).body(body.clone());
        })
        .await;

    let held = CacheLock::new(harness.cache.path(), "a.vk")
        .try_acquire()
        .unwrap();
    let path = harness.cached("a.vk");
    let other_process = {
        let body = body.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            std::fs::write(&path, &body).unwrap();
            drop(held);
        })
    };

    let params = manifest(&[("a.vk", "QmKey", &digest_of(&body), 0)]);
    harness
        .coordinator(false)
        .fetch_all(&params, b"{}", SIZE_2K, &CancellationToken::new())
        .await
        .unwrap();
    other_process.await.unwrap();

    mock.assert_hits_async(0).await;
}

/// Test that cancellation interrupts a task stuck waiting for a lock
#[tokio::test]
async fn test_cancellation_returns_promptly() {
    let harness = Harness::new().await;
    let _held = CacheLock::new(harness.cache.path(), "a.vk")
        .try_acquire()
        .unwrap();

    let coordinator = Coordinator::new(
        CoordinatorConfig::default().with_lock_retry_interval(Duration::from_secs(60)),
        CacheConfig::with_cache_root(harness.cache.path().to_path_buf()),
        ClientConfig::default().with_gateway(harness.server.url("/ipfs/")),
        Arc::new(FetchSession::new()),
    )
    .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let params = manifest(&[("a.vk", "QmKey", "00", 0)]);
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        coordinator.fetch_all(&params, b"{}", SIZE_2K, &cancel),
    )
    .await
    .expect("fetch_all should return after cancellation");

    assert!(result.is_ok());
}

/// Test that a name claimed by a cancelled task stays claimed for its session
#[tokio::test]
async fn test_cancelled_claim_is_kept_by_session() {
    let harness = Harness::new().await;
    let body = b"late key".to_vec();
    let mock = harness
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/ipfs/QmLate");
            then.status(200).body(body.clone());
        })
        .await;
    let params = manifest(&[("a.vk", "QmLate", &digest_of(&body), 0)]);

    let session = Arc::new(FetchSession::new());
    let held = CacheLock::new(harness.cache.path(), "a.vk")
        .try_acquire()
        .unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });
    harness
        .coordinator_in(Arc::clone(&session), false)
        .fetch_all(&params, b"{}", SIZE_2K, &cancel)
        .await
        .unwrap();
    drop(held);

    harness
        .coordinator_in(Arc::clone(&session), false)
        .fetch_all(&params, b"{}", SIZE_2K, &CancellationToken::new())
        .await
        .unwrap();
    mock.assert_hits_async(0).await;
    assert!(!harness.cached("a.vk").exists());

    harness
        .coordinator(false)
        .fetch_all(&params, b"{}", SIZE_2K, &CancellationToken::new())
        .await
        .unwrap();
    mock.assert_hits_async(1).await;
    assert_eq!(std::fs::read(harness.cached("a.vk")).unwrap(), body);
}

/// Test that one failing artifact neither aborts nor hides its siblings
#[tokio::test]
async fn test_failures_are_aggregated() {
    let harness = Harness::new().await;
    let good = b"good key".to_vec();
    harness
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/ipfs/QmGood");
            then.status(200).body(good.clone());
        })
        .await;
    harness
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/ipfs/QmMissing");
            then.status(404);
        })
        .await;

    let params = manifest(&[
        ("good.vk", "QmGood", &digest_of(&good), 0),
        ("missing.vk", "QmMissing", "00", 0),
    ]);
    let err = harness
        .coordinator(false)
        .fetch_all(&params, b"{}", SIZE_2K, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        AppError::Incomplete(failures) => {
            assert_eq!(failures.len(), 1);
            assert!(matches!(
                failures.iter().next(),
                Some(FetchError::Download { .. })
            ));
        }
        other => panic!("Expected incomplete fetch, got {:?}", other),
    }
    assert_eq!(std::fs::read(harness.cached("good.vk")).unwrap(), good);
}

/// Test that a corrupted file that cannot be removed fails only its own artifact
#[tokio::test]
async fn test_unremovable_corrupted_file_is_permanent_failure() {
    let harness = Harness::new().await;
    let good = b"good key".to_vec();
    harness
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/ipfs/QmGood");
            then.status(200).body(good.clone());
        })
        .await;
    let slow = harness
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/ipfs/QmSlow");
            then.status(200)
                .delay(Duration::from_millis(500))
                .body("never checked");
        })
        .await;

    let params = manifest(&[
        ("good.vk", "QmGood", &digest_of(&good), 0),
        ("stuck.vk", "QmSlow", &digest_of(b"expected"), 0),
    ]);
    let stuck = harness.cached("stuck.vk");
    let coordinator = harness.coordinator(false);
    let cancel = CancellationToken::new();
    let fetch = coordinator.fetch_all(&params, b"{}", SIZE_2K, &cancel);

    // Swap the partial file for a directory while the response is delayed;
    // the post-check then fails and the directory cannot be unlinked.
    let swap = async {
        for _ in 0..200 {
            if stuck.is_file() {
                std::fs::remove_file(&stuck).unwrap();
                std::fs::create_dir(&stuck).unwrap();
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("download never created {}", stuck.display());
    };
    let (result, ()) = tokio::join!(fetch, swap);

    match result.unwrap_err() {
        AppError::Incomplete(failures) => {
            assert_eq!(failures.len(), 1);
            match failures.iter().next() {
                Some(FetchError::Remove { path, .. }) => assert_eq!(path, &stuck),
                other => panic!("Expected remove failure, got {:?}", other),
            }
        }
        other => panic!("Expected incomplete fetch, got {:?}", other),
    }
    slow.assert_hits_async(1).await;
    assert!(stuck.is_dir());
    assert_eq!(std::fs::read(harness.cached("good.vk")).unwrap(), good);
}

/// Test that lock errors are reported even when the artifact arrives later
#[tokio::test]
async fn test_lock_error_is_recorded_while_task_retries() {
    let harness = Harness::new().await;
    let body = b"locked key".to_vec();
    let mock = harness
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/ipfs/QmLocked");
            then.status(200).body(body.clone());
        })
        .await;

    // A directory where the lock file belongs makes every open fail
    let lock_path = harness.cached("a.vk.fetch.lock");
    std::fs::create_dir(&lock_path).unwrap();

    let params = manifest(&[("a.vk", "QmLocked", &digest_of(&body), 0)]);
    let coordinator = harness.coordinator(false);
    let cancel = CancellationToken::new();
    let fetch = coordinator.fetch_all(&params, b"{}", SIZE_2K, &cancel);
    let unblock = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::remove_dir(&lock_path).unwrap();
    };
    let (result, ()) = tokio::join!(fetch, unblock);

    match result.unwrap_err() {
        AppError::Incomplete(failures) => {
            assert!(!failures.is_empty());
            assert!(failures
                .iter()
                .all(|f| matches!(f, FetchError::Lock { name, .. } if name == "a.vk")));
        }
        other => panic!("Expected incomplete fetch, got {:?}", other),
    }
    mock.assert_hits_async(1).await;
    assert_eq!(std::fs::read(harness.cached("a.vk")).unwrap(), body);
    assert!(lock_path.is_file());
}

/// Test that a bad manifest fails before any request is made
#[tokio::test]
async fn test_manifest_decode_error_is_fatal() {
    let harness = Harness::new().await;
    let any = harness
        .server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(200);
        })
        .await;

    let srs = manifest(&[("v28-fil-inner-product-v1.srs", "QmSrs", "00", 0)]);
    let err = harness
        .coordinator(false)
        .fetch_all(b"[1, 2, 3]", &srs, SIZE_2K, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Manifest(_)));
    assert!(err.is_fatal_setup());
    any.assert_hits_async(0).await;
}

/// Test that an unusable cache directory fails the whole call
#[tokio::test]
async fn test_cache_path_that_is_a_file_is_fatal() {
    let harness = Harness::new().await;
    let not_a_dir = harness.cached("plain-file");
    std::fs::write(&not_a_dir, b"").unwrap();

    let coordinator = Coordinator::new(
        CoordinatorConfig::default(),
        CacheConfig::with_cache_root(not_a_dir),
        ClientConfig::default().with_gateway(harness.server.url("/ipfs/")),
        Arc::new(FetchSession::new()),
    )
    .unwrap();

    let err = coordinator
        .fetch_all(b"{}", b"{}", SIZE_2K, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Cache(_)));
}

/// Test that an artifact listed in both manifests is fetched once
#[tokio::test]
async fn test_artifact_in_both_manifests_fetched_once() {
    let harness = Harness::new().await;
    let body = b"shared srs".to_vec();
    let mock = harness
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/ipfs/QmShared");
            then.status(200).body(body.clone());
        })
        .await;

    let entry = manifest(&[("shared.srs", "QmShared", &digest_of(&body), 0)]);
    harness
        .coordinator(false)
        .fetch_all(&entry, &entry, SIZE_2K, &CancellationToken::new())
        .await
        .unwrap();

    mock.assert_hits_async(1).await;
}
