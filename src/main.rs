//! Panic Gesture Agent CLI
//!
//! Runs the gesture engine over a recorded or piped signal stream.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use panic_gesture_agent::{
    config::{Config, GestureSelection},
    sink::{DeliveryError, DeliverySink, FnSink, JsonLinesSink},
    source::ReplaySource,
    transparency::create_shared_log_with_persistence,
    EmergencyDelivery, GestureEngine, GESTURE_GUIDE, VERSION,
};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "panic-gesture")]
#[command(version = VERSION)]
#[command(about = "Detects triple power-press and triple chop panic gestures", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for gestures in a JSON Lines signal stream
    Run {
        /// Read signals from this file instead of stdin
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Gestures to detect (power, chop, or all); defaults to the config
        #[arg(long)]
        gestures: Option<String>,

        /// Print each trigger as a JSON line on stdout
        #[arg(long)]
        json: bool,

        /// Replay at the pace given by the event timestamps
        #[arg(long)]
        realtime: bool,
    },

    /// Enable gestures in the saved configuration
    Enable {
        /// Gestures to enable (power, chop, or all)
        gestures: String,
    },

    /// Disable gestures in the saved configuration
    Disable {
        /// Gestures to disable (power, chop, or all)
        gestures: String,
    },

    /// Show configuration and cumulative statistics
    Status,

    /// Explain how to perform each gesture
    Guide,

    /// Show configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            input,
            gestures,
            json,
            realtime,
        } => cmd_run(input, gestures, json, realtime),
        Commands::Enable { gestures } => cmd_toggle(&gestures, true),
        Commands::Disable { gestures } => cmd_toggle(&gestures, false),
        Commands::Status => {
            cmd_status();
            Ok(())
        }
        Commands::Guide => {
            cmd_guide();
            Ok(())
        }
        Commands::Config => {
            cmd_config();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Persisted counters shown by `status`, with their labels.
const STATUS_COUNTERS: &[(&str, &str)] = &[
    ("screen_toggles", "Screen toggles"),
    ("motion_samples", "Motion samples"),
    ("power_press_triggers", "Power-press triggers"),
    ("chop_triggers", "Chop triggers"),
    ("deliveries", "Deliveries"),
    ("delivery_failures", "Delivery failures"),
    ("rate_limited", "Rate-limited triggers"),
];

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        tracing::warn!("using default configuration: {e}");
        Config::default()
    })
}

fn cmd_run(
    input: Option<PathBuf>,
    gestures: Option<String>,
    json: bool,
    realtime: bool,
) -> anyhow::Result<()> {
    let mut config = load_config();
    if let Some(gestures) = gestures {
        config.gestures = GestureSelection::from_csv(&gestures);
    }
    if !config.gestures.any_enabled() {
        bail!("At least one gesture must be enabled (power or chop)");
    }
    if let Err(e) = config.ensure_directories() {
        tracing::warn!("could not create data directory: {e}");
    }

    // Status output goes to stderr so stdout carries only triggers.
    eprintln!("Panic Gesture Agent v{VERSION}");
    eprintln!(
        "  Power press: {}",
        if config.gestures.power_press {
            "enabled"
        } else {
            "disabled"
        }
    );
    eprintln!(
        "  Chop: {}",
        if config.gestures.chop {
            "enabled"
        } else {
            "disabled"
        }
    );
    eprintln!(
        "  Reset window: {}ms, refractory period: {}ms, chop threshold: {}",
        config.detectors.reset_window_ms,
        config.detectors.refractory_period_ms,
        config.detectors.chop_threshold
    );
    eprintln!();

    let transparency_log = create_shared_log_with_persistence(config.transparency_path());
    let mut replay = ReplaySource::new().realtime(realtime);

    let sink: Arc<dyn DeliverySink> = if json {
        Arc::new(JsonLinesSink::new(std::io::stdout()))
    } else {
        Arc::new(FnSink::new(|d: &EmergencyDelivery| -> Result<(), DeliveryError> {
            println!(
                "[{}] EMERGENCY: {} gesture at t={}ms (id {})",
                d.issued_at.format("%H:%M:%S"),
                d.trigger.source,
                d.trigger.at,
                d.id
            );
            Ok(())
        }))
    };

    let engine = GestureEngine::with_transparency_log(
        &config,
        replay.screen_source(),
        replay.motion_source(),
        sink,
        transparency_log.clone(),
    )?;
    engine.start().context("could not start gesture detection")?;

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let reader: Box<dyn BufRead + Send> = match input {
        Some(path) => Box::new(BufReader::new(
            File::open(&path).with_context(|| format!("could not open {path:?}"))?,
        )),
        None => {
            eprintln!("Reading signals from stdin, press Ctrl+C to stop");
            Box::new(BufReader::new(std::io::stdin()))
        }
    };
    replay.start(reader)?;

    while running.load(Ordering::SeqCst) && replay.is_running() {
        thread::sleep(Duration::from_millis(50));
    }

    let replay_stats = replay.stop();
    engine.stop();
    // Dropping the engine drains any queued deliveries.
    drop(engine);

    if let Some(stats) = replay_stats {
        if stats.malformed > 0 {
            eprintln!("Skipped {} malformed line(s)", stats.malformed);
        }
    }

    if let Err(e) = transparency_log.save() {
        tracing::warn!("could not save transparency log: {e}");
    }

    eprintln!();
    eprintln!("{}", transparency_log.summary());
    Ok(())
}

fn cmd_toggle(gestures: &str, enable: bool) -> anyhow::Result<()> {
    let selection = GestureSelection::from_csv(gestures);
    if !selection.any_enabled() {
        bail!("Unknown gesture list '{gestures}' (expected power, chop, or all)");
    }

    // A broken file must be reported, not overwritten with defaults.
    let mut config = Config::load().context("could not load configuration")?;
    config.gestures = if enable {
        config.gestures.union(selection)
    } else {
        config.gestures.without(selection)
    };
    config.save()?;

    println!(
        "Power press: {}, chop: {}",
        if config.gestures.power_press { "on" } else { "off" },
        if config.gestures.chop { "on" } else { "off" }
    );
    if !config.gestures.any_enabled() {
        println!("All gestures are disabled. Use 'panic-gesture enable all' to turn them back on.");
    }
    Ok(())
}

fn cmd_status() {
    let config = load_config();

    println!("Panic Gesture Agent Status");
    println!("==========================");
    println!();

    println!("Configuration:");
    println!(
        "  Power press: {}",
        if config.gestures.power_press {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "  Chop: {}",
        if config.gestures.chop {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "  Trigger threshold: {}",
        config.detectors.trigger_threshold
    );
    println!(
        "  Minimum delivery interval: {}ms",
        config.min_delivery_interval.as_millis()
    );
    println!();

    let stats_path = config.transparency_path();
    if stats_path.exists() {
        if let Ok(content) = std::fs::read_to_string(&stats_path) {
            if let Ok(stats) = serde_json::from_str::<serde_json::Value>(&content) {
                println!("Cumulative Statistics:");
                for (key, label) in STATUS_COUNTERS {
                    if let Some(value) = stats.get(key) {
                        println!("  {label}: {value}");
                    }
                }

                if let Some(recent) = stats.get("recent_deliveries").and_then(|v| v.as_array()) {
                    if let Some(last) = recent.last() {
                        println!(
                            "  Last trigger: {} at {}",
                            last["trigger"]["source"].as_str().unwrap_or("unknown"),
                            last["issued_at"].as_str().unwrap_or("unknown")
                        );
                    }
                }
            }
        }
    } else {
        println!("No previous session data found.");
    }
}

fn cmd_guide() {
    println!("{GESTURE_GUIDE}");
}

fn cmd_config() {
    let config = load_config();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("could not set Ctrl+C handler")
}

#[cfg(test)]
mod tests {
    use super::*;
    use panic_gesture_agent::TransparencyLog;

    #[test]
    fn test_status_lists_every_counter() {
        let stats = serde_json::to_value(TransparencyLog::new().stats()).unwrap();
        let counters = stats
            .as_object()
            .unwrap()
            .keys()
            .filter(|k| !k.starts_with("session_"));
        for key in counters {
            assert!(
                STATUS_COUNTERS.iter().any(|(k, _)| *k == key.as_str()),
                "status does not print {key}"
            );
        }
    }
}
