// Sampler test suite - polls the real host, so expect real (and occasionally boring) numbers.

use std::time::{Duration, Instant};

use anyhow::Result;
use system_guardian::monitoring::sampler::{self, SHUTDOWN_TIMEOUT};
use system_guardian::monitoring::session::Session;
use system_guardian::SystemProbe;
use tokio::time::timeout;

const RECV_TIMEOUT: Duration = Duration::from_secs(10);

#[test]
fn probe_produces_plausible_readings() {
    let mut probe = SystemProbe::new();
    let sample = probe.sample();

    assert!(sample.timestamp > 0.0);
    assert!(sample.cpu_percent >= 0.0, "CPU percent should not be negative");
    assert!(
        sample.ram_percent >= 0.0 && sample.ram_percent <= 100.0,
        "RAM percent should be a percentage"
    );
    // Disk may legitimately be NaN on hosts with no mounted disks.
    assert!(sample.disk_percent.is_nan() || (0.0..=100.0).contains(&sample.disk_percent));
    assert!(sample.network_kbps >= 0.0);
}

#[test]
fn probe_timestamps_are_monotonic() {
    let mut probe = SystemProbe::new();
    let first = probe.sample();
    let second = probe.sample();
    assert!(second.timestamp >= first.timestamp);
}

#[tokio::test]
async fn sampler_delivers_samples_then_closes_on_stop() -> Result<()> {
    // Interval below the floor gets clamped to 0.2s, so three samples
    // arrive in under a second.
    let (handle, mut rx) = sampler::spawn(0.0, 8);

    let mut last_ts = 0.0;
    for _ in 0..3 {
        let sample = timeout(RECV_TIMEOUT, rx.recv())
            .await?
            .expect("sampler should keep producing while running");
        assert!(sample.timestamp >= last_ts);
        last_ts = sample.timestamp;
    }

    handle.stop().await;

    // Drain whatever was buffered; the channel must then report closed.
    loop {
        match timeout(RECV_TIMEOUT, rx.recv()).await? {
            Some(_) => continue,
            None => break,
        }
    }
    Ok(())
}

#[tokio::test]
async fn stop_completes_within_the_shutdown_bound() -> Result<()> {
    let (handle, mut rx) = sampler::spawn(0.0, 4);

    // Make sure the task is actually up before stopping it.
    timeout(RECV_TIMEOUT, rx.recv())
        .await?
        .expect("first sample");

    let started = Instant::now();
    handle.stop().await;
    assert!(
        started.elapsed() < SHUTDOWN_TIMEOUT + Duration::from_secs(1),
        "stop must be bounded even if the task misbehaves"
    );
    Ok(())
}

#[tokio::test]
async fn sampled_stream_feeds_a_trainable_session() -> Result<()> {
    let (handle, mut rx) = sampler::spawn(0.0, 16);

    // The single-consumer discipline in miniature: this loop is the only
    // place the session gets touched.
    let mut session = Session::new();
    while session.sample_count() < 5 {
        let sample = timeout(RECV_TIMEOUT, rx.recv())
            .await?
            .expect("sampler should keep producing while running");
        session.add_sample(sample);
    }

    handle.stop().await;

    let baseline = session.train(None)?;
    assert_eq!(baseline.sample_count, 5);
    // CPU, RAM and net readings are always finite; disk may be NaN on
    // hosts with nothing mounted, which trains through as NaN.
    for i in [0, 1, 3] {
        assert!(baseline.mean[i].is_finite());
        assert!(baseline.std_dev[i].is_finite());
    }

    assert!(session.can_detect());
    // Whatever the verdict, detection on live data must not panic.
    let _ = session.detect_last(3.0);
    Ok(())
}
