use crate::{
    Error, Generator, GeneratorConfig, HealthStatus, ThreadRandom,
    entropy::mock::{FlakySource, ToggleSource},
};
use core::time::Duration;
use std::{collections::HashSet, sync::Arc};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use uuid::{Uuid, Variant, Version};

const SHORT: Duration = Duration::from_millis(100);

fn config(capacity: usize, workers: usize) -> GeneratorConfig {
    GeneratorConfig::default()
        .with_buffer_capacity(capacity)
        .with_workers(workers)
}

fn generator(capacity: usize, workers: usize) -> Generator {
    Generator::with_source(config(capacity, workers), ThreadRandom).unwrap()
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn full_buffer_serves_capacity_then_blocks_until_refilled() {
    let generator = generator(10, 2);
    wait_for(|| generator.buffered() == 10).await;

    // Freeze production so the buffer content is exactly what was prefilled.
    generator.decrease_workers_by(2).await.unwrap();
    assert_eq!(generator.worker_count(), 0);

    for _ in 0..10 {
        generator.generate_random_timeout(SHORT).await.unwrap();
    }
    assert_eq!(
        generator.generate_random_timeout(SHORT).await,
        Err(Error::Timeout(SHORT))
    );

    generator.increase_workers_by(1).await.unwrap();
    let id = generator
        .generate_random_timeout(Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(id.get_version(), Some(Version::Random));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deterministic_generation_is_stable() {
    let namespace = "6ba7b810-9dad-11d1-80b4-00c04fd430c8";
    let first = Generator::new(config(4, 1).with_namespace(namespace)).unwrap();
    let second = Generator::new(config(4, 0).with_namespace(namespace)).unwrap();

    let a = first.generate_deterministic("example.com");
    let b = first.generate_deterministic("example.com");
    let c = second.generate_deterministic("example.com");
    assert_eq!(a, b);
    assert_eq!(a, c);
    assert_eq!(a, Uuid::new_v5(&Uuid::NAMESPACE_DNS, b"example.com"));
    assert_eq!(a.get_version(), Some(Version::Sha1));
    assert_ne!(a, first.generate_deterministic("example.org"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn zero_interval_is_rejected_and_status_stays_unknown() {
    let generator = generator(4, 1);
    assert_eq!(
        generator.start_health_monitor(Duration::ZERO),
        Err(Error::InvalidInterval)
    );
    assert_eq!(generator.health_status(), HealthStatus::Unknown);
    assert_eq!(generator.health_check_interval(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn second_monitor_start_keeps_first_interval() {
    let generator = generator(4, 1);
    generator.start_health_monitor(Duration::from_secs(5)).unwrap();
    assert_eq!(
        generator.start_health_monitor(Duration::from_secs(10)),
        Err(Error::MonitorAlreadyStarted)
    );
    assert_eq!(
        generator.health_check_interval(),
        Some(Duration::from_secs(5))
    );
    wait_for(|| generator.health_status() == HealthStatus::Healthy).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn zero_capacity_blocks_until_capacity_returns() {
    let generator = Arc::new(generator(4, 2));
    generator.set_buffer_size(0).await.unwrap();
    assert_eq!(generator.buffer_capacity(), 0);
    assert_eq!(generator.buffered(), 0);

    assert_eq!(
        generator.generate_random_timeout(SHORT).await,
        Err(Error::Timeout(SHORT))
    );

    let waiter = {
        let generator = Arc::clone(&generator);
        tokio::spawn(async move { generator.generate_random().await })
    };
    sleep(SHORT).await;
    assert!(!waiter.is_finished());

    generator.increase_buffer_size_by(1).await.unwrap();
    let id = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("waiter not served after capacity was restored")
        .unwrap()
        .unwrap();
    assert_eq!(id.get_version(), Some(Version::Random));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn invalid_namespace_starts_nothing() {
    let source = Arc::new(ToggleSource::default());
    let err = Generator::with_shared_source(
        config(4, 3)
            .with_namespace("not-a-namespace")
            .with_health_check_interval(Duration::from_millis(1)),
        source.clone(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidNamespace { .. }));

    sleep(Duration::from_millis(50)).await;
    assert_eq!(source.reads(), 0);
}

#[test]
fn construction_outside_runtime_fails() {
    assert_eq!(
        Generator::new(GeneratorConfig::default()).unwrap_err(),
        Error::RuntimeUnavailable
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn buffer_never_exceeds_capacity() {
    let generator = generator(8, 6);
    for _ in 0..200 {
        assert!(generator.buffered() <= 8);
        tokio::task::yield_now().await;
    }
    wait_for(|| generator.buffered() == 8).await;
    sleep(Duration::from_millis(20)).await;
    assert_eq!(generator.buffered(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn random_ids_are_tagged_and_distinct() {
    let generator = generator(32, 4);
    let mut seen = HashSet::new();
    for _ in 0..256 {
        let id = generator.generate_random().await.unwrap();
        assert_eq!(id.get_version(), Some(Version::Random));
        assert_eq!(id.get_variant(), Variant::RFC4122);
        assert!(seen.insert(id));
    }
    assert!(generator.stats().ids_produced >= 256);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scaling_up_and_down_restores_worker_count() {
    let generator = generator(4, 2);
    generator.increase_workers_by(5).await.unwrap();
    assert_eq!(generator.worker_count(), 7);
    generator.decrease_workers_by(5).await.unwrap();
    assert_eq!(generator.worker_count(), 2);

    generator.decrease_workers_by(10).await.unwrap();
    assert_eq!(generator.worker_count(), 0);

    generator.set_worker_count(3).await.unwrap();
    assert_eq!(generator.worker_count(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn oversized_worker_counts_are_rejected() {
    let err = Generator::with_source(config(4, usize::MAX), ThreadRandom).unwrap_err();
    assert!(matches!(err, Error::TooManyWorkers { requested: usize::MAX, .. }));

    let generator = generator(4, 0);
    assert!(matches!(
        generator.increase_workers_by(usize::MAX).await,
        Err(Error::TooManyWorkers { .. })
    ));
    assert!(matches!(
        generator.set_worker_count(GeneratorConfig::MAX_WORKERS + 1).await,
        Err(Error::TooManyWorkers { .. })
    ));
    assert_eq!(generator.worker_count(), 0);

    generator.increase_workers_by(2).await.unwrap();
    assert!(matches!(
        generator.increase_workers_by(GeneratorConfig::MAX_WORKERS - 1).await,
        Err(Error::TooManyWorkers { .. })
    ));
    assert_eq!(generator.worker_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn monitor_cannot_outlive_shutdown() {
    let generator = Arc::new(generator(2, 1));
    let starter = {
        let generator = Arc::clone(&generator);
        tokio::spawn(async move {
            loop {
                match generator.start_health_monitor(Duration::from_millis(5)) {
                    Err(Error::Shutdown) => break,
                    _ => tokio::task::yield_now().await,
                }
            }
        })
    };
    tokio::task::yield_now().await;

    generator.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), starter)
        .await
        .expect("monitor start kept succeeding after shutdown")
        .unwrap();

    assert_eq!(generator.health_check_interval(), None);
    assert_eq!(
        generator.stop_health_monitor(),
        Err(Error::MonitorAlreadyStopped)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resize_leaves_exact_capacity_and_empty_buffer() {
    let generator = generator(16, 0);
    generator.set_buffer_size(5).await.unwrap();
    assert_eq!(generator.buffer_capacity(), 5);
    assert_eq!(generator.buffered(), 0);

    generator.decrease_buffer_size_by(2).await.unwrap();
    assert_eq!(generator.buffer_capacity(), 3);
    generator.increase_buffer_size_by(7).await.unwrap();
    assert_eq!(generator.buffer_capacity(), 10);

    assert!(matches!(
        generator.increase_buffer_size_by(usize::MAX).await,
        Err(Error::CapacityTooLarge { .. })
    ));
    assert_eq!(generator.buffer_capacity(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn waiting_consumer_survives_resize() {
    let generator = Arc::new(generator(2, 0));
    let waiter = {
        let generator = Arc::clone(&generator);
        tokio::spawn(async move { generator.generate_random().await })
    };
    sleep(Duration::from_millis(20)).await;

    generator.set_buffer_size(4).await.unwrap();
    generator.increase_workers_by(1).await.unwrap();

    let id = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("waiter not served from the new buffer")
        .unwrap()
        .unwrap();
    assert_eq!(id.get_version(), Some(Version::Random));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn entropy_failures_never_reach_callers() {
    let generator = Generator::with_source(
        config(4, 1).with_retry_backoff(Duration::from_millis(1), Duration::from_millis(4)),
        FlakySource::new(3),
    )
    .unwrap();

    let id = generator
        .generate_random_timeout(Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(id.get_version(), Some(Version::Random));
    assert_eq!(generator.stats().entropy_failures, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn monitor_reports_degraded_source() {
    let source = Arc::new(ToggleSource::failing());
    let generator = Generator::with_shared_source(
        config(4, 0).with_health_check_interval(Duration::from_millis(5)),
        source.clone(),
    )
    .unwrap();
    assert_eq!(
        generator.health_check_interval(),
        Some(Duration::from_millis(5))
    );

    wait_for(|| generator.health_status().is_degraded()).await;
    source.set_failing(false);
    wait_for(|| generator.health_status() == HealthStatus::Healthy).await;

    generator
        .set_health_check_interval(Duration::from_millis(20))
        .unwrap();
    generator.stop_health_monitor().unwrap();
    assert_eq!(
        generator.stop_health_monitor(),
        Err(Error::MonitorAlreadyStopped)
    );
    assert_eq!(
        generator.set_health_check_interval(Duration::from_secs(1)),
        Err(Error::MonitorAlreadyStopped)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancellable_dequeue_honours_token() {
    let generator = generator(4, 0);
    let token = CancellationToken::new();
    token.cancel();
    assert_eq!(
        generator.generate_random_cancellable(&token).await,
        Err(Error::Cancelled)
    );
    assert_eq!(generator.try_generate_random(), Ok(None));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shutdown_releases_waiters_and_rejects_requests() {
    let generator = Arc::new(generator(2, 0));
    let waiter = {
        let generator = Arc::clone(&generator);
        tokio::spawn(async move { generator.generate_random().await })
    };
    generator.start_health_monitor(Duration::from_secs(1)).unwrap();
    sleep(Duration::from_millis(20)).await;

    generator.shutdown().await.unwrap();
    assert_eq!(waiter.await.unwrap(), Err(Error::Shutdown));

    assert_eq!(generator.generate_random().await, Err(Error::Shutdown));
    assert_eq!(generator.try_generate_random(), Err(Error::Shutdown));
    assert_eq!(generator.increase_workers_by(1).await, Err(Error::Shutdown));
    assert_eq!(generator.set_buffer_size(8).await, Err(Error::Shutdown));
    assert_eq!(
        generator.start_health_monitor(Duration::from_secs(1)),
        Err(Error::Shutdown)
    );
    assert_eq!(generator.health_check_interval(), None);
    assert_eq!(generator.worker_count(), 0);
    assert_eq!(generator.shutdown().await, Err(Error::Shutdown));

    // Deterministic generation is unaffected.
    assert_eq!(
        generator.generate_deterministic("a"),
        generator.generate_deterministic("a")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn drop_stops_background_tasks() {
    let source = Arc::new(ToggleSource::default());
    let generator = Generator::with_shared_source(
        config(1, 2).with_health_check_interval(Duration::from_millis(5)),
        source.clone(),
    )
    .unwrap();
    wait_for(|| generator.health_status() == HealthStatus::Healthy).await;
    drop(generator);

    sleep(Duration::from_millis(20)).await;
    let reads = source.reads();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(source.reads(), reads);
}
