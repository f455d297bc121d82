//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{SyncBlueprint, SyncState};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    latency_window: WindowInfo,
    session: SessionInfo,
    sample_rate_hz: f64,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    timers: Vec<TimerInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct WindowInfo {
    min_latency_us: i64,
    max_latency_us: i64,
    min_visual_blink_us: i64,
}

#[derive(Serialize)]
struct SessionInfo {
    timeout_secs: u64,
    quality_grace_secs: u64,
    max_retries: u32,
    on_exhausted: String,
}

#[derive(Serialize)]
struct TimerInfo {
    state: &'static str,
    timer: &'static str,
    duration_ms: u128,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint, args);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &SyncBlueprint, args: &InfoArgs) -> ConfigInfo {
    let timing = &blueprint.timing;

    let timers = if args.timers {
        SyncState::ALL
            .iter()
            .filter_map(|state| {
                state.timer_kind().map(|kind| TimerInfo {
                    state: state.as_str(),
                    timer: kind.as_str(),
                    duration_ms: timing.timer_duration(kind).as_millis(),
                })
            })
            .collect()
    } else {
        Vec::new()
    };

    let sinks = if args.sinks {
        blueprint
            .effective_sinks()
            .into_iter()
            .map(|s| SinkInfo {
                path: s.params.get("path").cloned(),
                name: s.name,
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        latency_window: WindowInfo {
            min_latency_us: timing.min_latency_us,
            max_latency_us: timing.max_latency_us,
            min_visual_blink_us: timing.min_visual_blink_us,
        },
        session: SessionInfo {
            timeout_secs: timing.session_timeout_secs,
            quality_grace_secs: timing.quality_grace_secs,
            max_retries: blueprint.session.max_retries,
            on_exhausted: format!("{:?}", blueprint.session.on_exhausted),
        },
        sample_rate_hz: blueprint.recorder.sample_rate_hz,
        queue_capacity: blueprint.host.queue_capacity,
        timers,
        sinks,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Blink Sync Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let window = &info.latency_window;
    println!("👁  Latency Window");
    println!("   ├─ Version: {}", info.version);
    println!(
        "   ├─ Accepted: {}..={} us",
        window.min_latency_us, window.max_latency_us
    );
    println!("   └─ Min visual blink: {} us", window.min_visual_blink_us);

    let session = &info.session;
    println!("\n⚙️  Session");
    println!("   ├─ Timeout: {}s", session.timeout_secs);
    println!("   ├─ Quality grace: {}s", session.quality_grace_secs);
    println!("   ├─ Max retries: {}", session.max_retries);
    println!("   └─ On exhausted: {}", session.on_exhausted);

    println!("\n🧠 Recorder");
    println!("   ├─ Sample rate: {} Hz", info.sample_rate_hz);
    println!("   └─ Host queue: {}", info.queue_capacity);

    if !info.timers.is_empty() {
        println!("\n⏱  State Timers ({})", info.timers.len());
        for (i, timer) in info.timers.iter().enumerate() {
            let prefix = if i == info.timers.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {} {} -> {} ({} ms)",
                prefix, timer.state, timer.timer, timer.duration_ms
            );
        }
    }

    if !info.sinks.is_empty() {
        println!("\n📤 Sinks ({})", info.sinks.len());
        for (i, sink) in info.sinks.iter().enumerate() {
            let prefix = if i == info.sinks.len() - 1 { "└─" } else { "├─" };
            match &sink.path {
                Some(path) => println!("   {} {} ({}, {})", prefix, sink.name, sink.sink_type, path),
                None => println!("   {} {} ({})", prefix, sink.name, sink.sink_type),
            }
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_timer_table_lists_timed_states() {
        let args = InfoArgs {
            config: PathBuf::from("unused.toml"),
            json: true,
            timers: true,
            sinks: true,
        };
        let info = build_config_info(&SyncBlueprint::default(), &args);

        // 7 timed states: face_detected, face_lost, waiting_for_device_blink,
        // blink_detected, blink_timeout, blink_aborted, blink_aborted_restart
        assert_eq!(info.timers.len(), 7);
        let device = info
            .timers
            .iter()
            .find(|t| t.state == "waiting_for_device_blink")
            .unwrap();
        assert_eq!(device.duration_ms, 1_000);

        assert_eq!(info.sinks.len(), 1);
        assert_eq!(info.sinks[0].name, "log");
    }
}
