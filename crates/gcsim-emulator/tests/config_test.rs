//! Configuration loading tests.
//!
//! These exercise the YAML surface end to end: parsing, defaults for absent
//! keys, validation errors and file loading.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use gcsim_emulator::{EmulatorConfig, EmulatorError};
use gcsim_packet::PacketKind;
use gcsim_uart_protocol::InterfaceMode;

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_empty_document_gives_defaults() {
    let config = EmulatorConfig::from_yaml_str("").unwrap();
    assert_eq!(config, EmulatorConfig::default());
}

#[test]
fn test_full_document() {
    let yaml = r#"
noise_coefficient: 0.25
packet_loss: 0.05
interface_mode: TEXT_UART
device_path: /tmp/gcsim-rocket
experimental: true
corruption:
  enabled: true
  chance: 0.5
  max_intensity: 0.1
packets: [AV_TO_GCS_DATA_2, GSE_TO_GCS_DATA_1, GCS_TO_AV_STATE_CMD]
inter_packet_delay_ms: 25
locks:
  av_response: /tmp/av_response.lock
  warn_after_secs: 2
seed: 42
run_for_secs: 1.5
"#;
    let config = EmulatorConfig::from_yaml_str(yaml).unwrap();

    assert_eq!(config.noise_coefficient, 0.25);
    assert_eq!(config.packet_loss, 0.05);
    assert_eq!(config.interface_mode, InterfaceMode::TextUart);
    assert_eq!(config.require_device_path().unwrap(), Path::new("/tmp/gcsim-rocket"));
    assert!(config.experimental);
    assert!(config.corruption.enabled);
    assert_eq!(config.corruption_config().unwrap().unwrap().chance(), 0.5);
    assert_eq!(
        config.packets,
        vec![
            PacketKind::AvToGcsData2,
            PacketKind::GseToGcsData1,
            PacketKind::GcsToAvStateCmd
        ]
    );
    assert_eq!(config.inter_packet_delay(), Duration::from_millis(25));
    assert_eq!(
        config.locks.av_response.as_deref(),
        Some(Path::new("/tmp/av_response.lock"))
    );
    assert_eq!(config.locks.gse_response, None);
    assert_eq!(config.lock_warn_after(), Duration::from_secs(2));
    // Unset keys inside a section keep their defaults.
    assert_eq!(config.lock_warn_interval(), Duration::from_secs(3));
    assert_eq!(config.seed, Some(42));
    assert_eq!(config.run_for(), Some(Duration::from_millis(1500)));
}

#[test]
fn test_yaml_survives_reserialization() {
    let config = EmulatorConfig {
        packet_loss: 0.2,
        interface_mode: InterfaceMode::TextUart,
        packets: vec![PacketKind::GseToGcsData2],
        seed: Some(3),
        ..Default::default()
    };
    let yaml = config.to_yaml().unwrap();
    assert!(yaml.contains("TEXT_UART"));
    assert!(yaml.contains("GSE_TO_GCS_DATA_2"));
    assert_eq!(EmulatorConfig::from_yaml_str(&yaml).unwrap(), config);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_out_of_range_coefficients_rejected() {
    for yaml in [
        "noise_coefficient: 1.5",
        "noise_coefficient: -0.1",
        "packet_loss: 2.0",
        "corruption: {chance: 1.1}",
        "corruption: {max_intensity: -1}",
    ] {
        let err = EmulatorConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, EmulatorError::Telemetry(_)), "{}: {:?}", yaml, err);
    }
}

#[test]
fn test_invalid_values_rejected() {
    for yaml in [
        "packets: []",
        "run_for_secs: 0",
        "locks: {warn_interval_secs: -3}",
    ] {
        let err = EmulatorConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, EmulatorError::InvalidConfig(_)), "{}: {:?}", yaml, err);
    }
}

#[test]
fn test_unknown_keys_rejected() {
    assert!(matches!(
        EmulatorConfig::from_yaml_str("nosie_coefficient: 0.2").unwrap_err(),
        EmulatorError::ConfigParse(_)
    ));
    assert!(matches!(
        EmulatorConfig::from_yaml_str("packets: [AV_TO_GCS_DATA_9]").unwrap_err(),
        EmulatorError::ConfigParse(_)
    ));
    assert!(matches!(
        EmulatorConfig::from_yaml_str("interface_mode: SPI").unwrap_err(),
        EmulatorError::ConfigParse(_)
    ));
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "seed: 7").unwrap();
    writeln!(file, "packets: [GCS_TO_GSE_MANUAL_CONTROL]").unwrap();

    let config = EmulatorConfig::load(file.path()).unwrap();
    assert_eq!(config.seed, Some(7));
    assert_eq!(config.packets, vec![PacketKind::GcsToGseManualControl]);
}

#[test]
fn test_missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.yaml");

    match EmulatorConfig::load(&path).unwrap_err() {
        EmulatorError::ConfigIo { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("expected ConfigIo, got {:?}", other),
    }
}

#[test]
fn test_unbounded_durations_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gcsim.yaml");
    for yaml in [
        "run_for_secs: 1.0e20\n",
        "locks:\n  warn_after_secs: 1.0e20\n",
        "locks:\n  warn_interval_secs: 1.0e300\n",
        "inter_packet_delay_ms: 100000000000\n",
    ] {
        std::fs::write(&path, yaml).unwrap();
        let err = EmulatorConfig::load(&path).unwrap_err();
        assert!(matches!(err, EmulatorError::InvalidConfig(_)), "{}: {:?}", yaml, err);
    }
}
