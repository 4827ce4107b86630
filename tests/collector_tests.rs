mod common;

use async_trait::async_trait;
use common::{cpu_stat, disk, FakeSource};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use system_stats::{
    AgentConfig, AgentError, Collector, CpuResource, DiskResource, MemoryResource, MemoryStat,
    MetricSink, RecordingSink, ResourceConfig, ResourceHandle, Result,
};
use tokio::time::{sleep, timeout, Instant};
use tokio_test::{assert_err, assert_ok};

fn every_second(extended: bool) -> ResourceConfig {
    ResourceConfig::new(Duration::from_secs(1), extended)
}

fn memory_stat() -> MemoryStat {
    MemoryStat {
        total: 8000,
        free: 2000,
        ..MemoryStat::default()
    }
}

/// Sink that rejects everything but counts the attempts.
#[derive(Default)]
struct RejectingSink {
    attempts: AtomicUsize,
}

#[async_trait]
impl MetricSink for RejectingSink {
    async fn gauge(&self, _name: &str, _value: i64) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AgentError::sink_error("collector unreachable"))
    }

    async fn incr_by(&self, _name: &str, _delta: i64) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AgentError::sink_error("collector unreachable"))
    }
}

#[tokio::test(start_paused = true)]
async fn test_cpu_usage_across_ticks() {
    let source = Arc::new(FakeSource::with_cpu(vec![
        Some(cpu_stat(50, 50)),
        Some(cpu_stat(100, 100)),
        Some(cpu_stat(175, 125)),
    ]));
    let sink = Arc::new(RecordingSink::new());
    let mut collector = Collector::new(sink.clone());
    collector.add(CpuResource::new(every_second(false), source));

    assert_ok!(collector.start().await);
    sleep(Duration::from_millis(3500)).await;
    assert_ok!(collector.stop().await);

    // first tick measures since boot against the zero baseline
    assert_eq!(sink.values("cpu.usage"), vec![50, 50, 75]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_snapshot_leaves_gap() {
    let source = Arc::new(FakeSource::with_cpu(vec![
        Some(cpu_stat(50, 50)),
        None,
        Some(cpu_stat(100, 100)),
    ]));
    let sink = Arc::new(RecordingSink::new());
    let mut collector = Collector::new(sink.clone());
    collector.add(CpuResource::new(every_second(false), source));

    assert_ok!(collector.start().await);
    sleep(Duration::from_millis(3500)).await;
    assert_ok!(collector.stop().await);

    assert_eq!(sink.values("cpu.usage"), vec![50, 50]);
}

#[tokio::test(start_paused = true)]
async fn test_extended_counters_through_loop() {
    let mut first = cpu_stat(10, 10);
    first.interrupts = 1000;
    first.context_switches = 400;
    first.procs_blocked = 2;
    let mut second = cpu_stat(20, 20);
    second.interrupts = 1300;
    second.context_switches = 450;
    second.procs_blocked = 1;

    let source = Arc::new(FakeSource::with_cpu(vec![Some(first), Some(second)]));
    let sink = Arc::new(RecordingSink::new());
    let mut collector = Collector::new(sink.clone());
    collector.add(CpuResource::new(every_second(true), source));

    assert_ok!(collector.start().await);
    sleep(Duration::from_millis(2500)).await;
    assert_ok!(collector.stop().await);

    assert_eq!(sink.values("cpu.interrupts"), vec![1000, 300]);
    assert_eq!(sink.values("cpu.switches"), vec![400, 50]);
    assert_eq!(sink.values("cpu.blocked"), vec![2, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_waits_for_in_flight_fetch() {
    let source = Arc::new(FakeSource {
        cpu: Mutex::new(vec![Some(cpu_stat(50, 50))].into()),
        memory: Mutex::new(vec![Some(memory_stat())].into()),
        disks: vec![disk("/", 100, 40)],
        fetch_delay: Some(Duration::from_secs(5)),
        ..FakeSource::default()
    });
    let sink = Arc::new(RecordingSink::new());
    let config = AgentConfig::default()
        .with_cpu_interval(Duration::from_secs(1))
        .with_memory_interval(Duration::from_secs(1))
        .with_disk_interval(Duration::from_secs(1));
    let mut collector = Collector::with_defaults(sink.clone(), source, &config);
    assert_eq!(collector.names(), vec!["memory", "cpu", "disk"]);

    let started = Instant::now();
    assert_ok!(collector.start().await);
    sleep(Duration::from_millis(1500)).await;

    let stopped = timeout(Duration::from_secs(60), collector.stop())
        .await
        .expect("stop should return once every loop has exited");
    assert_ok!(stopped);
    assert!(started.elapsed() >= Duration::from_secs(6));

    // the in-flight tick still completes and emits
    assert_eq!(sink.values("memory.percent"), vec![75]);
    assert_eq!(sink.values("cpu.usage"), vec![50]);
    assert_eq!(sink.values("disk./.percent"), vec![40]);
}

#[tokio::test]
async fn test_stop_before_start_is_safe() {
    let source = Arc::new(FakeSource::default());
    let mut collector = Collector::new(Arc::new(RecordingSink::new()));
    collector.add(MemoryResource::new(every_second(false), source.clone()));
    collector.add(CpuResource::new(every_second(false), source));

    assert_ok!(collector.stop().await);
    assert_ok!(collector.stop().await);
}

#[tokio::test(start_paused = true)]
async fn test_resource_cannot_restart() {
    let source = Arc::new(FakeSource::default());
    let sink: Arc<dyn MetricSink> = Arc::new(RecordingSink::new());
    let mut handle = ResourceHandle::new(MemoryResource::new(every_second(false), source));

    assert_ok!(handle.start(sink.clone()).await);
    assert!(handle.is_running());

    let err = assert_err!(handle.start(sink.clone()).await);
    assert!(matches!(err, AgentError::AlreadyStarted { resource: "memory" }));
    assert!(handle.is_running());

    assert_ok!(handle.stop().await);
    assert!(!handle.is_running());
    assert_err!(handle.start(sink).await);
}

#[tokio::test(start_paused = true)]
async fn test_discovery_failure_fails_start() {
    let source = Arc::new(FakeSource {
        memory: Mutex::new(vec![Some(memory_stat())].into()),
        mounts_fail: true,
        ..FakeSource::default()
    });
    let sink = Arc::new(RecordingSink::new());
    let mut collector = Collector::new(sink.clone());
    collector.add(MemoryResource::new(every_second(false), source.clone()));
    collector.add(DiskResource::new(every_second(false), source));

    let err = assert_err!(collector.start().await);
    assert!(matches!(err, AgentError::Discovery(_)));

    // memory was started before the failure and keeps reporting until stopped
    sleep(Duration::from_millis(1500)).await;
    assert_ok!(collector.stop().await);
    assert_eq!(sink.values("memory.percent"), vec![75]);
}

/// Test that the disk resource monitors exactly the discovered mount points
#[tokio::test]
async fn test_disk_discovers_mount_points() {
    use system_stats::Resource;

    let source = Arc::new(FakeSource {
        disks: vec![disk("/", 200, 50), disk("/data", 100, 10)],
        ..FakeSource::default()
    });
    let mut resource = DiskResource::new(every_second(false), source);
    assert!(resource.paths().is_empty());

    assert_ok!(resource.prepare().await);
    assert_eq!(
        resource.paths(),
        [PathBuf::from("/"), PathBuf::from("/data")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_disk_path_failure_is_isolated() {
    let source = Arc::new(FakeSource {
        disks: vec![disk("/", 200, 50), disk("/data", 0, 30)],
        broken_paths: vec!["/mnt/usb".into()],
        ..FakeSource::default()
    });
    let sink = Arc::new(RecordingSink::new());
    let mut collector = Collector::new(sink.clone());
    collector.add(DiskResource::new(every_second(false), source));

    assert_ok!(collector.start().await);
    sleep(Duration::from_millis(1500)).await;
    assert_ok!(collector.stop().await);

    assert_eq!(sink.values("disk./.percent"), vec![25]);
    assert_eq!(sink.values("disk./.free"), vec![150]);
    assert_eq!(sink.values("disk./data.percent"), vec![0]);
    assert_eq!(sink.values("disk./data.used"), vec![30]);
    assert!(sink.values("disk./mnt/usb.percent").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_sink_errors_do_not_stop_loop() {
    let source = Arc::new(FakeSource {
        memory: Mutex::new(vec![Some(memory_stat())].into()),
        ..FakeSource::default()
    });
    let sink = Arc::new(RejectingSink::default());
    let mut collector = Collector::new(sink.clone());
    collector.add(MemoryResource::new(every_second(false), source));

    assert_ok!(collector.start().await);
    sleep(Duration::from_millis(3500)).await;
    assert_ok!(collector.stop().await);

    // percent and swap.percent on each of three ticks
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 6);
}

#[tokio::test(start_paused = true)]
async fn test_resources_poll_independently() {
    let source = Arc::new(FakeSource {
        cpu: Mutex::new(vec![Some(cpu_stat(50, 50))].into()),
        memory: Mutex::new(vec![Some(memory_stat())].into()),
        ..FakeSource::default()
    });
    let sink = Arc::new(RecordingSink::new());
    let mut collector = Collector::new(sink.clone());
    collector.add(MemoryResource::new(
        ResourceConfig::new(Duration::from_secs(3), false),
        source.clone(),
    ));
    collector.add(CpuResource::new(every_second(false), source));

    assert_ok!(collector.start().await);
    sleep(Duration::from_millis(6500)).await;
    assert_ok!(collector.stop().await);

    assert_eq!(sink.values("memory.percent").len(), 2);
    assert_eq!(sink.values("cpu.usage").len(), 6);
}
