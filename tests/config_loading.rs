// tests/config_loading.rs
//! Configuration layering through real files and process environment

use serial_test::serial;
use std::io::Write;
use std::sync::Arc;

use biosim_core::config::{ConfigError, ConfigLoader, SystemConfig};
use biosim_core::hal::{ManualTimer, SimulatedDac};
use biosim_core::{ErrorCategory, SignalEngine, SignalKind, SimError};

struct EnvGuard(Vec<&'static str>);

impl EnvGuard {
    fn set(pairs: &[(&'static str, &str)]) -> Self {
        for (key, value) in pairs {
            std::env::set_var(key, value);
        }
        Self(pairs.iter().map(|(key, _)| *key).collect())
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.0 {
            std::env::remove_var(key);
        }
    }
}

fn config_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let file = config_file(
        r#"
[engine]
buffer_capacity = 8192
block_size = 256
seed = 3

[monitor]
enabled = true
"#,
    );
    let _env = EnvGuard::set(&[
        ("BIOSIM_ENGINE__SEED", "99"),
        ("BIOSIM_PRODUCER__BACKGROUND", "false"),
        ("BIOSIM_FILTERS__MAINS_FREQUENCY_HZ", "60"),
    ]);

    let mut loader = ConfigLoader::with_paths(vec![file.path().to_path_buf()]);
    let config = loader.load_system_config().unwrap();

    assert_eq!(config.engine.buffer_capacity, 8192);
    assert_eq!(config.engine.block_size, 256);
    assert_eq!(config.engine.seed, Some(99));
    assert!(!config.producer.background);
    assert!(config.monitor.enabled);
    assert_eq!(config.filters.mains_frequency_hz, 60.0);
    assert_eq!(loader.get_current_config(), config);
}

#[test]
#[serial]
fn test_rejected_environment_keeps_last_good_config() {
    let mut loader = ConfigLoader::with_paths(Vec::new());
    let good = loader.load_system_config().unwrap();
    assert_eq!(good, SystemConfig::default());

    let _env = EnvGuard::set(&[("BIOSIM_ENGINE__BLOCK_SIZE", "100000")]);
    match loader.load_system_config() {
        Err(ConfigError::ValidationError(errors)) => {
            assert!(errors.iter().any(|e| e.contains("Block size")), "{:?}", errors);
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
    assert_eq!(loader.get_current_config(), good);
}

#[test]
#[serial]
fn test_loaded_config_drives_engine() {
    let file = config_file(
        r#"
[engine]
sample_rate_hz = 500
buffer_capacity = 1024
block_size = 64
seed = 12

[filters]
enabled = false
"#,
    );
    let _env = EnvGuard::set(&[("BIOSIM_PRODUCER__BACKGROUND", "false")]);
    let config = ConfigLoader::with_paths(vec![file.path().to_path_buf()])
        .load_system_config()
        .unwrap();

    let (timer, handle) = ManualTimer::new();
    let engine = SignalEngine::new(config, Box::new(timer), Arc::new(SimulatedDac::new())).unwrap();
    engine.start(SignalKind::Ppg).unwrap();

    let stats = engine.performance_stats();
    assert_eq!(stats.buffer_capacity, 1024);
    assert_eq!(stats.buffer_occupancy, 512);
    assert_eq!(handle.fire(64), 64);
    engine.stop().unwrap();
}

#[test]
fn test_invalid_config_rejected_by_engine() {
    let mut config = SystemConfig::default();
    config.engine.buffer_capacity = 3000;

    let (timer, _handle) = ManualTimer::new();
    let err = SignalEngine::new(config, Box::new(timer), Arc::new(SimulatedDac::new()))
        .err()
        .expect("invalid capacity accepted");
    assert!(matches!(err, SimError::Config(ConfigError::ValidationError(_))));
    assert_eq!(err.category(), ErrorCategory::Configuration);
}

#[test]
fn test_validate_config_file() {
    let loader = ConfigLoader::with_paths(Vec::new());
    let good = config_file("[engine]\nblock_size = 32\n");
    let bad = config_file("[filters]\nnotch_q = -1.0\n");

    assert!(loader.validate_config_file(good.path()).is_ok());
    assert!(matches!(
        loader.validate_config_file(bad.path()),
        Err(ConfigError::ValidationError(_))
    ));
}
