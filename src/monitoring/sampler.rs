/*
* Background system sampler. One tokio task polls the host on a fixed
* interval and hands immutable Sample values to the consumer through a
* bounded channel. The task never touches the Session - whoever owns the
* receiving end does all the mutating, which is what keeps the session
* lock-free.
*
* Shutdown is cooperative: flip the stop flag, wait up to 1.5s for the
* task to notice, then move on either way.
*/

use std::time::{Duration, Instant};

use chrono::Utc;
use sysinfo::{Disks, Networks, System};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::session::Sample;

/// Sampling faster than this just burns CPU on refresh calls.
const MIN_INTERVAL_SECS: f64 = 0.2;

/// How long `SamplerHandle::stop` waits for the task to wind down before
/// giving up and proceeding with shutdown anyway.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(1500);

/// Reads the four tracked metrics from the host.
///
/// Keeps one reusable `sysinfo` handle per subsystem so successive samples
/// only pay for a refresh, and so CPU and network readings have a previous
/// observation to diff against.
pub struct SystemProbe {
    sys: System,
    disks: Disks,
    networks: Networks,
    last_refresh: Instant,
}

impl SystemProbe {
    pub fn new() -> Self {
        // Prime every counter so the first real sample has a stable delta
        // behind it - the first CPU and network readings are garbage
        // otherwise.
        let mut sys = System::new_all();
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let disks = Disks::new_with_refreshed_list();
        let networks = Networks::new_with_refreshed_list();

        Self {
            sys,
            disks,
            networks,
            last_refresh: Instant::now(),
        }
    }

    /// Refresh and read one sample.
    pub fn sample(&mut self) -> Sample {
        let elapsed = self.last_refresh.elapsed().as_secs_f64().max(1e-6);
        self.last_refresh = Instant::now();

        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        self.disks.refresh(true);
        self.networks.refresh(true);

        let cpu_percent = f64::from(self.sys.global_cpu_usage());

        let total_memory = self.sys.total_memory();
        let ram_percent = if total_memory > 0 {
            self.sys.used_memory() as f64 / total_memory as f64 * 100.0
        } else {
            0.0
        };

        // Aggregate usage over every listed disk; NaN when nothing is
        // mounted, the consumer treats that as "reading unavailable".
        let (used_bytes, total_bytes) =
            self.disks
                .list()
                .iter()
                .fold((0u128, 0u128), |(used, total), disk| {
                    let space = u128::from(disk.total_space());
                    let available = u128::from(disk.available_space());
                    (used + space.saturating_sub(available), total + space)
                });
        let disk_percent = if total_bytes > 0 {
            used_bytes as f64 / total_bytes as f64 * 100.0
        } else {
            f64::NAN
        };

        // received()/transmitted() are deltas since the previous refresh,
        // so dividing by the elapsed wall time gives the rate directly.
        let (rx_bytes, tx_bytes) = self
            .networks
            .iter()
            .fold((0u64, 0u64), |(rx, tx), (_, data)| {
                (rx + data.received(), tx + data.transmitted())
            });
        let network_kbps = (rx_bytes + tx_bytes) as f64 / 1024.0 / elapsed;

        Sample {
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
            cpu_percent,
            ram_percent,
            disk_percent,
            network_kbps,
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Controls a running sampler task.
pub struct SamplerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SamplerHandle {
    /// Signal the task to stop and wait for it, bounded by
    /// `SHUTDOWN_TIMEOUT`. A task that does not wind down in time is left
    /// behind rather than force-killed.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        match time::timeout(SHUTDOWN_TIMEOUT, self.task).await {
            Ok(_) => debug!("sampler task joined"),
            Err(_) => warn!(
                "sampler did not stop within {}ms, proceeding with shutdown",
                SHUTDOWN_TIMEOUT.as_millis()
            ),
        }
    }
}

/// Spawn the background sampler.
///
/// Produces one `Sample` per interval into the returned bounded channel.
/// When the consumer falls behind and the channel fills up, samples are
/// dropped with a warning instead of stalling the timer.
pub fn spawn(interval_secs: f64, channel_capacity: usize) -> (SamplerHandle, mpsc::Receiver<Sample>) {
    let interval = Duration::from_secs_f64(interval_secs.max(MIN_INTERVAL_SECS));
    let (tx, rx) = mpsc::channel(channel_capacity.max(1));
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut probe = SystemProbe::new();
        let mut timer = time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_ms = interval.as_millis() as u64, "sampler started");

        loop {
            tokio::select! {
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
                _ = timer.tick() => {
                    let sample = probe.sample();
                    match tx.try_send(sample) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            warn!("sample channel full, dropping sample");
                        }
                        Err(TrySendError::Closed(_)) => {
                            debug!("sample channel closed, stopping sampler");
                            break;
                        }
                    }
                }
            }
        }

        info!("sampler stopped");
    });

    (SamplerHandle { stop_tx, task }, rx)
}
