/*
* System Guardian Command Line Interface
* --------------------------------------
* @project: system-guardian
* @status: it-aint-much-but-its-honest-work
*
* Command structure:
*
* system-guardian
* ├── watch [--samples N] [--threshold Z] [--json]
* │        // Live monitoring: sample the host, warm up, train a baseline,
* │        // flag anomalies until Ctrl-C (or after N samples)
* └── init [--force]
*          // Generates config/default.toml so you can tweak the knobs
*
* Built on clap with colored output, because staring at a wall of gray
* log lines is how anomalies sneak past you in the first place.
*
* Threading discipline: the sampler task only produces Sample values; the
* watch loop below is the ONE place the Session gets mutated. Keep it
* that way and the session never needs a lock.
*/

use std::path::PathBuf;

use chrono::DateTime;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{debug, error, info};

use crate::config::Settings;
use crate::monitoring::sampler;
use crate::monitoring::session::{Anomaly, Session};

#[derive(Parser)]
#[command(name = "system-guardian")]
#[command(about = "System Guardian - live metrics anomaly watcher", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch live system metrics and flag anomalies
    Watch {
        /// Stop after this many samples (default: run until Ctrl-C)
        #[arg(short, long)]
        samples: Option<u64>,
        /// Override the configured z-score threshold
        #[arg(short = 't', long)]
        threshold: Option<f64>,
        /// Emit anomalies as JSON lines instead of colored text
        #[arg(long)]
        json: bool,
    },
    /// Generate default configuration
    Init {
        #[arg(short, long)]
        force: bool,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::new_from_file(path)?,
        None => Settings::new()?,
    };

    match cli.command {
        Commands::Watch {
            samples,
            threshold,
            json,
        } => handle_watch(&settings, samples, threshold, json).await?,
        Commands::Init { force } => handle_init(force)?,
    }

    Ok(())
}

async fn handle_watch(
    settings: &Settings,
    limit: Option<u64>,
    threshold: Option<f64>,
    json: bool,
) -> anyhow::Result<()> {
    let detection = &settings.detection;
    let z_threshold = threshold.unwrap_or(detection.z_threshold);

    let (handle, mut rx) = sampler::spawn(
        settings.monitoring.sample_interval_secs,
        settings.monitoring.channel_capacity,
    );

    println!(
        "{} watching system metrics (interval {:.1}s, warm-up {} samples, threshold z={:.1})",
        "✓".green(),
        settings.monitoring.sample_interval_secs,
        detection.min_samples,
        z_threshold
    );

    let mut session = Session::new();
    let mut seen: u64 = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
            received = rx.recv() => {
                let Some(sample) = received else { break };
                session.add_sample(sample);
                seen += 1;

                if session.baseline().is_none() {
                    if session.can_train(detection.min_samples) {
                        let baseline = session.train(Some(detection.train_window))?;
                        info!(samples = baseline.sample_count, "baseline trained");
                        println!("{} baseline ready (n={})", "✓".green(), baseline.sample_count);
                    }
                } else {
                    if detection.retrain_every_samples > 0
                        && seen % detection.retrain_every_samples as u64 == 0
                    {
                        let baseline = session.train(Some(detection.train_window))?;
                        debug!(samples = baseline.sample_count, "baseline retrained");
                    }

                    if let Some(anomaly) = session.detect_last(z_threshold) {
                        report_anomaly(&anomaly, json)?;
                    }
                }

                if let Some(max) = limit {
                    if seen >= max {
                        break;
                    }
                }
            }
        }
    }

    drop(rx);
    handle.stop().await;

    println!(
        "{} session finished: {} samples, {} anomalies",
        "✓".green(),
        session.sample_count(),
        session.anomalies().len()
    );

    Ok(())
}

fn report_anomaly(anomaly: &Anomaly, json: bool) -> anyhow::Result<()> {
    error!(score = anomaly.score, reason = %anomaly.reason, "anomaly detected");

    if json {
        println!("{}", serde_json::to_string(anomaly)?);
        return Ok(());
    }

    let when = DateTime::from_timestamp_millis((anomaly.timestamp * 1000.0) as i64)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());

    println!(
        "{} [{}] {} (score {:.2}) cpu={:.1}% ram={:.1}% disk={:.1}% net={:.1}KB/s",
        "⚠".red().bold(),
        when,
        anomaly.reason.red(),
        anomaly.score,
        anomaly.cpu_percent,
        anomaly.ram_percent,
        anomaly.disk_percent,
        anomaly.network_kbps,
    );

    Ok(())
}

fn handle_init(force: bool) -> anyhow::Result<()> {
    let config_dir = PathBuf::from("config");
    let target = config_dir.join("default.toml");

    if target.exists() && !force {
        error!("Configuration file already exists. Use --force to overwrite.");
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    let default_config = crate::config::generate_default_config();
    let config_str = toml::to_string_pretty(&default_config)?;
    std::fs::write(&target, config_str)?;

    println!("{} Default configuration generated", "✓".green());
    Ok(())
}
