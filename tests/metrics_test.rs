//! Telemetry tests — hit/miss counters observed through a debugging
//! recorder, including the disk-hit-promotion scenario.

use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};

use stratum::{CacheConfig, CacheKey, ResponseCache, StratumError, telemetry};
use tempfile::TempDir;

fn key(byte: u8) -> CacheKey {
    CacheKey::from_bytes([byte; 32])
}

fn config_in(tmp: &TempDir) -> CacheConfig {
    CacheConfig::new()
        .disk_cache_dir(tmp.path())
        .disk_size_limit_bytes(1_000_000)
        .memory_max_entries(100)
}

/// Sum a counter by name, optionally requiring a label pair.
fn counter_value(snapshotter: &Snapshotter, name: &str, label: Option<(&str, &str)>) -> u64 {
    snapshotter
        .snapshot()
        .into_vec()
        .iter()
        .filter(|(ck, _, _, _)| ck.kind() == MetricKind::Counter && ck.key().name() == name)
        .filter(|(ck, _, _, _)| match label {
            None => true,
            Some((k, v)) => ck
                .key()
                .labels()
                .any(|l| l.key() == k && l.value() == v),
        })
        .map(|(_, _, _, val)| match val {
            DebugValue::Counter(c) => *c,
            _ => 0,
        })
        .sum()
}

/// Runs async cache operations within a local recorder scope.
///
/// Uses `block_in_place` + `block_on` pattern to keep `with_local_recorder`
/// on the same thread (it's a thread-local recorder).
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn miss_then_memory_hit_counters() {
    let tmp = TempDir::new().unwrap();
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let cache: ResponseCache<String> =
                    ResponseCache::new(config_in(&tmp)).unwrap();

                // Full miss: fallback computes.
                cache
                    .get_or_compute(&key(1), || async {
                        Ok::<_, StratumError>("value".to_string())
                    })
                    .await
                    .unwrap();

                // Memory hit.
                cache
                    .get_or_compute::<_, _, StratumError>(&key(1), || async {
                        panic!("fallback must not run on a hit")
                    })
                    .await
                    .unwrap();
            })
        })
    });

    assert_eq!(
        counter_value(&snapshotter, telemetry::CACHE_MISSES_TOTAL, None),
        1,
        "expected exactly one computed call"
    );
    assert_eq!(
        counter_value(
            &snapshotter,
            telemetry::CACHE_HITS_TOTAL,
            Some(("tier", "memory"))
        ),
        1,
        "expected exactly one memory hit"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn disk_hit_then_promotion_visible_in_counters() {
    let tmp = TempDir::new().unwrap();

    // Seed the disk tier outside the recorder scope, memory-cold.
    {
        let seeder: ResponseCache<String> =
            ResponseCache::new(config_in(&tmp).enable_memory_cache(false)).unwrap();
        seeder.put(&key(1), "promoted".to_string()).await;
    }

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let cache: ResponseCache<String> =
                    ResponseCache::new(config_in(&tmp)).unwrap();

                // First lookup: memory cold, disk answers.
                assert_eq!(cache.get(&key(1)).await, Some("promoted".to_string()));
                // Second lookup: the promoted copy answers without disk I/O.
                assert_eq!(cache.get(&key(1)).await, Some("promoted".to_string()));
            })
        })
    });

    assert_eq!(
        counter_value(
            &snapshotter,
            telemetry::CACHE_HITS_TOTAL,
            Some(("tier", "disk"))
        ),
        1,
        "expected exactly one disk hit"
    );
    assert_eq!(
        counter_value(
            &snapshotter,
            telemetry::CACHE_HITS_TOTAL,
            Some(("tier", "memory"))
        ),
        1,
        "expected the second lookup to be served from memory"
    );
    assert_eq!(
        counter_value(&snapshotter, telemetry::CACHE_MISSES_TOTAL, None),
        0,
        "no lookup should have fallen through to a miss"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn metrics_are_no_ops_without_a_recorder() {
    // Without a recorder installed, all metric calls must be silent no-ops.
    let tmp = TempDir::new().unwrap();
    let cache: ResponseCache<String> = ResponseCache::new(config_in(&tmp)).unwrap();

    cache.get(&key(1)).await;
    cache.put(&key(1), "value".to_string()).await;
    cache.get(&key(1)).await;
    cache.reset();
}
