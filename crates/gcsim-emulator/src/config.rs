//! Emulator configuration.
//!
//! Loaded from YAML; every key has a default so an empty document is a valid
//! config. CLI flags are layered on top with [`ConfigOverrides`].
//!
//! ```yaml
//! noise_coefficient: 0.1
//! packet_loss: 0.0
//! interface_mode: TEXT_UART
//! device_path: /tmp/gcsim-rocket
//! experimental: false
//! corruption:
//!   enabled: true
//!   chance: 0.01
//!   max_intensity: 0.3
//! packets: [AV_TO_GCS_DATA_1, GSE_TO_GCS_DATA_2]
//! inter_packet_delay_ms: 10
//! locks:
//!   av_response: /tmp/av_response.lock
//!   gse_response: /tmp/gse_response.lock
//!   warn_after_secs: 5
//!   warn_interval_secs: 3
//! seed: 42
//! run_for_secs: 60
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gcsim_packet::{Device, PacketKind};
use gcsim_telemetry::{check_unit, CorruptionConfig, SynthConfig};
use gcsim_uart_protocol::InterfaceMode;
use serde::{Deserialize, Serialize};

use crate::{EmulatorError, Result};

/// Longest accepted run length or lock warning setting, in seconds.
pub const MAX_DURATION_SECS: f64 = 365.0 * 24.0 * 3600.0;

/// Longest accepted inter-packet delay, in milliseconds.
pub const MAX_INTER_PACKET_DELAY_MS: u64 = 60 * 60 * 1000;

/// Complete emulator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmulatorConfig {
    /// Jitter coefficient for synthesized signals, `[0, 1]`.
    pub noise_coefficient: f64,
    /// Probability that a generated packet is dropped before the transport.
    pub packet_loss: f64,
    /// Wire framing.
    pub interface_mode: InterfaceMode,
    /// Device (pty) the frames are written to.
    pub device_path: Option<PathBuf>,
    /// Cycle normally-constant fields through their edge states.
    pub experimental: bool,
    /// Bit-flip corruption.
    pub corruption: CorruptionSettings,
    /// Kinds to emit.
    pub packets: Vec<PacketKind>,
    /// Delay after each written frame, per device.
    pub inter_packet_delay_ms: u64,
    /// Sequence lock files.
    pub locks: LockSettings,
    /// Seed for deterministic runs. Random when absent.
    pub seed: Option<u64>,
    /// Stop after this many seconds. Runs until interrupted when absent.
    pub run_for_secs: Option<f64>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        EmulatorConfig {
            noise_coefficient: 0.1,
            packet_loss: 0.0,
            interface_mode: InterfaceMode::Raw,
            device_path: None,
            experimental: false,
            corruption: CorruptionSettings::default(),
            packets: PacketKind::TELEMETRY.to_vec(),
            inter_packet_delay_ms: 10,
            locks: LockSettings::default(),
            seed: None,
            run_for_secs: None,
        }
    }
}

/// Corruption section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorruptionSettings {
    /// Whether synthesized values are corrupted at all.
    pub enabled: bool,
    /// Probability in [0, 1] that a packet is corrupted.
    pub chance: f64,
    /// Upper bound in [0, 1] of the per-bit flip probability.
    pub max_intensity: f64,
}

impl Default for CorruptionSettings {
    fn default() -> Self {
        let defaults = CorruptionConfig::default();
        CorruptionSettings {
            enabled: false,
            chance: defaults.chance(),
            max_intensity: defaults.max_intensity(),
        }
    }
}

/// Sequence lock section. A device without a lock path is never gated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LockSettings {
    /// AV frames are written only while this file exists.
    pub av_response: Option<PathBuf>,
    /// GSE frames are written only while this file exists.
    pub gse_response: Option<PathBuf>,
    /// Start warning after a gated device has waited this long.
    pub warn_after_secs: f64,
    /// Minimum spacing between repeated warnings.
    pub warn_interval_secs: f64,
}

impl Default for LockSettings {
    fn default() -> Self {
        LockSettings {
            av_response: None,
            gse_response: None,
            warn_after_secs: 5.0,
            warn_interval_secs: 3.0,
        }
    }
}

impl LockSettings {
    /// Lock path gating `device`, if any.
    pub fn path_for(&self, device: Device) -> Option<&Path> {
        match device {
            Device::Av => self.av_response.as_deref(),
            Device::Gse => self.gse_response.as_deref(),
            Device::Gcs => None,
        }
    }
}

impl EmulatorConfig {
    /// Parses and validates a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: EmulatorConfig = if yaml.trim().is_empty() {
            EmulatorConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path).map_err(|source| EmulatorError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Serializes to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Checks every coefficient and duration.
    pub fn validate(&self) -> Result<()> {
        check_unit("noise_coefficient", self.noise_coefficient)?;
        check_unit("packet_loss", self.packet_loss)?;
        CorruptionConfig::new(self.corruption.chance, self.corruption.max_intensity)?;

        if self.packets.is_empty() {
            return Err(EmulatorError::invalid_config("packets must name at least one kind"));
        }
        if self.inter_packet_delay_ms > MAX_INTER_PACKET_DELAY_MS {
            return Err(EmulatorError::invalid_config(format!(
                "inter_packet_delay_ms must be at most {}, got {}",
                MAX_INTER_PACKET_DELAY_MS, self.inter_packet_delay_ms
            )));
        }
        for (name, secs) in [
            ("locks.warn_after_secs", self.locks.warn_after_secs),
            ("locks.warn_interval_secs", self.locks.warn_interval_secs),
        ] {
            if !(0.0..=MAX_DURATION_SECS).contains(&secs) {
                return Err(EmulatorError::invalid_config(format!(
                    "{} must be within [0, {}], got {}",
                    name, MAX_DURATION_SECS, secs
                )));
            }
        }
        if let Some(secs) = self.run_for_secs {
            if !(secs > 0.0 && secs <= MAX_DURATION_SECS) {
                return Err(EmulatorError::invalid_config(format!(
                    "run_for_secs must be within (0, {}], got {}",
                    MAX_DURATION_SECS, secs
                )));
            }
        }
        Ok(())
    }

    /// The device path, required for a run.
    pub fn require_device_path(&self) -> Result<&Path> {
        self.device_path
            .as_deref()
            .ok_or_else(|| EmulatorError::invalid_config("device_path is required (or pass --device)"))
    }

    /// Synthesizer settings.
    pub fn synth_config(&self) -> SynthConfig {
        SynthConfig {
            noise_coefficient: self.noise_coefficient,
            experimental: self.experimental,
        }
    }

    /// Validated corruption parameters, or `None` when disabled.
    pub fn corruption_config(&self) -> Result<Option<CorruptionConfig>> {
        if !self.corruption.enabled {
            return Ok(None);
        }
        Ok(Some(CorruptionConfig::new(
            self.corruption.chance,
            self.corruption.max_intensity,
        )?))
    }

    /// Configured kinds originating from `device`, in config order.
    pub fn packets_for(&self, device: Device) -> Vec<PacketKind> {
        let mut kinds: Vec<PacketKind> = Vec::new();
        for kind in &self.packets {
            if kind.origin() == device && !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        kinds
    }

    /// Delay after each written frame.
    pub fn inter_packet_delay(&self) -> Duration {
        Duration::from_millis(self.inter_packet_delay_ms)
    }

    /// Lock-wait warning threshold. Out-of-range values saturate.
    pub fn lock_warn_after(&self) -> Duration {
        secs_to_duration(self.locks.warn_after_secs)
    }

    /// Spacing between lock-wait warnings. Out-of-range values saturate.
    pub fn lock_warn_interval(&self) -> Duration {
        secs_to_duration(self.locks.warn_interval_secs)
    }

    /// Run length, if bounded.
    pub fn run_for(&self) -> Option<Duration> {
        self.run_for_secs.map(secs_to_duration)
    }
}

/// Seconds to a duration clamped to `[0, MAX_DURATION_SECS]`; NaN reads as 0.
fn secs_to_duration(secs: f64) -> Duration {
    let secs = if secs.is_nan() { 0.0 } else { secs.clamp(0.0, MAX_DURATION_SECS) };
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

/// Command-line overrides. Flags only ever switch features on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    /// Replaces `device_path`.
    pub device_path: Option<PathBuf>,
    /// Replaces `interface_mode`.
    pub interface_mode: Option<InterfaceMode>,
    /// Turns experimental variations on.
    pub experimental: bool,
    /// Turns corruption on with the configured chance and intensity.
    pub corruption: bool,
    /// Replaces `seed`.
    pub seed: Option<u64>,
    /// Replaces `run_for_secs`.
    pub run_for_secs: Option<f64>,
}

impl ConfigOverrides {
    /// Applies the overrides and revalidates.
    pub fn apply(&self, config: &mut EmulatorConfig) -> Result<()> {
        if let Some(path) = &self.device_path {
            config.device_path = Some(path.clone());
        }
        if let Some(mode) = self.interface_mode {
            config.interface_mode = mode;
        }
        config.experimental |= self.experimental;
        config.corruption.enabled |= self.corruption;
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.run_for_secs.is_some() {
            config.run_for_secs = self.run_for_secs;
        }
        config.validate()
    }
}
