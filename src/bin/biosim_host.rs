// src/bin/biosim_host.rs
//! Run one signal on the host for a few seconds against a simulated DAC and
//! print a JSON report.
//!
//! ```text
//! biosim-host <ecg|emg|ppg> [seconds] [--condition NAME] [--config PATH]
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use biosim_core::hal::{SimulatedDac, ThreadTimer};
use biosim_core::models::{EcgParameters, EmgParameters, PpgParameters};
use biosim_core::{
    ConfigLoader, ModelMetrics, ParameterSet, PerformanceStats, SignalEngine, SignalKind,
    SignalSnapshot,
};

const DEFAULT_SECONDS: f64 = 5.0;

#[derive(Debug)]
struct HostArgs {
    kind: SignalKind,
    seconds: f64,
    condition: Option<String>,
    config: Option<PathBuf>,
}

#[derive(Serialize)]
struct RunReport {
    version: &'static str,
    kind: SignalKind,
    seconds: f64,
    snapshot: SignalSnapshot,
    metrics: ModelMetrics,
    stats: PerformanceStats,
    captured_samples: usize,
    /// CRC-32 over the captured DAC codes
    checksum: u32,
}

fn usage() -> String {
    "usage: biosim-host <ecg|emg|ppg> [seconds] [--condition NAME] [--config PATH]".to_string()
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<HostArgs, String> {
    let kind = match args.next().as_deref() {
        Some("ecg") => SignalKind::Ecg,
        Some("emg") => SignalKind::Emg,
        Some("ppg") => SignalKind::Ppg,
        Some(other) => return Err(format!("unknown signal kind '{}'\n{}", other, usage())),
        None => return Err(usage()),
    };

    let mut parsed = HostArgs {
        kind,
        seconds: DEFAULT_SECONDS,
        condition: None,
        config: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--condition" => {
                parsed.condition = Some(args.next().ok_or("--condition needs a value")?);
            }
            "--config" => {
                parsed.config = Some(PathBuf::from(args.next().ok_or("--config needs a path")?));
            }
            value => {
                parsed.seconds = value
                    .parse::<f64>()
                    .ok()
                    .filter(|s| s.is_finite() && *s > 0.0)
                    .ok_or_else(|| format!("invalid duration '{}'\n{}", value, usage()))?;
            }
        }
    }
    Ok(parsed)
}

/// Parameter set for `kind`, switched to the condition named in snake case
fn initial_parameters(kind: SignalKind, condition: Option<&str>) -> Result<ParameterSet, String> {
    let Some(name) = condition else {
        return ParameterSet::defaults_for(kind).ok_or_else(usage);
    };
    let tag = Value::String(name.to_string());
    let unknown = |e: serde_json::Error| format!("unknown {:?} condition '{}': {}", kind, name, e);

    Ok(match kind {
        SignalKind::Ecg => {
            ParameterSet::Ecg(EcgParameters::for_condition(serde_json::from_value(tag).map_err(unknown)?))
        }
        SignalKind::Emg => {
            ParameterSet::Emg(EmgParameters::for_condition(serde_json::from_value(tag).map_err(unknown)?))
        }
        SignalKind::Ppg => {
            ParameterSet::Ppg(PpgParameters::for_condition(serde_json::from_value(tag).map_err(unknown)?))
        }
        SignalKind::None => return Err(usage()),
    })
}

fn run(args: HostArgs) -> Result<RunReport, Box<dyn std::error::Error>> {
    let mut loader = match &args.config {
        Some(path) => ConfigLoader::with_paths(vec![path.clone()]),
        None => ConfigLoader::new(),
    };
    let config = loader.load_system_config()?;

    let expected = (args.seconds * config.engine.sample_rate_hz as f64).ceil() as usize;
    let dac = Arc::new(SimulatedDac::with_capture(expected + config.engine.buffer_capacity));
    let engine = SignalEngine::new(config, Box::new(ThreadTimer::new()), dac.clone())?;

    let params = initial_parameters(args.kind, args.condition.as_deref())?;
    engine.start_with(params)?;
    info!(kind = ?args.kind, seconds = args.seconds, "running");

    std::thread::sleep(Duration::from_secs_f64(args.seconds));

    let snapshot = engine.current_signal_data();
    let metrics = engine.model_metrics();
    engine.stop()?;
    let stats = engine.performance_stats();
    if stats.underruns > 0 {
        warn!(underruns = stats.underruns, "output ran dry during the run");
    }

    let captured = dac.captured();
    Ok(RunReport {
        version: biosim_core::VERSION,
        kind: args.kind,
        seconds: args.seconds,
        snapshot,
        metrics,
        stats,
        captured_samples: captured.len(),
        checksum: crc32fast::hash(&captured),
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("biosim_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };

    match run(args).and_then(|report| Ok(serde_json::to_string_pretty(&report)?)) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("biosim-host: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<HostArgs, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(&["ppg", "2.5", "--condition", "low_sp_o2"]).unwrap();
        assert_eq!(parsed.kind, SignalKind::Ppg);
        assert_eq!(parsed.seconds, 2.5);
        assert_eq!(parsed.condition.as_deref(), Some("low_sp_o2"));

        assert!(args(&[]).is_err());
        assert!(args(&["eeg"]).is_err());
        assert!(args(&["ecg", "-1"]).is_err());
        assert!(args(&["ecg", "--config"]).is_err());
    }

    #[test]
    fn test_condition_lookup() {
        let params = initial_parameters(SignalKind::Ecg, Some("st_elevation")).unwrap();
        assert!(matches!(params, ParameterSet::Ecg(p) if p.st_shift_mv > 0.0));
        assert!(initial_parameters(SignalKind::Emg, Some("st_elevation")).is_err());
        assert_eq!(
            initial_parameters(SignalKind::Emg, None).unwrap().kind(),
            SignalKind::Emg
        );
    }
}
