//! Simulated telemetry for every packet kind.
//!
//! Each channel is an independently phased generator so that multi-axis
//! signals (accelerometer, gyroscope, quaternion) do not move in lockstep.
//! In experimental mode the fields that are constant in normal operation are
//! driven by step and alternating generators instead.

use gcsim_packet::field::format_coordinate;
use gcsim_packet::{
    FieldValue, FieldValues, PacketKind, COORDINATE_LEN, LATITUDE_KEY, LONGITUDE_KEY,
    NAVIGATION_STATUSES, RSSI_KEY, SNR_KEY,
};
use rand::Rng;
use serde::Deserialize;
use std::f64::consts::PI;

use crate::error::check_unit;
use crate::waveform::{changing_bool, changing_int, noisy_sinusoid};
use crate::TelemetryError;

/// Launch site latitude in decimal degrees.
pub const SITE_LATITUDE: f64 = -37.808085;
/// Launch site longitude in decimal degrees.
pub const SITE_LONGITUDE: f64 = 144.965078;

const ACCEL_LOW_SCALE: f64 = 2048.0;
const ACCEL_HIGH_SCALE: f64 = 1024.0;
const GYRO_RESOLUTION: f64 = 0.00875;

/// Synthesizer settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Jitter coefficient in `[0, 1]`. Zero gives clean sinusoids.
    pub noise_coefficient: f64,
    /// Exercise edge states by cycling fields that are normally constant.
    pub experimental: bool,
}

impl Default for SynthConfig {
    fn default() -> Self {
        SynthConfig {
            noise_coefficient: 0.1,
            experimental: false,
        }
    }
}

/// Produces named values for each packet kind at a point in time.
#[derive(Debug, Clone)]
pub struct TelemetrySynthesizer {
    config: SynthConfig,
}

impl TelemetrySynthesizer {
    /// Create a synthesizer, validating the noise coefficient.
    pub fn new(config: SynthConfig) -> Result<Self, TelemetryError> {
        check_unit("noise_coefficient", config.noise_coefficient)?;
        Ok(TelemetrySynthesizer { config })
    }

    /// The settings in use.
    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Values for `kind` at `t` seconds.
    pub fn values_for<R: Rng + ?Sized>(&self, kind: PacketKind, t: f64, rng: &mut R) -> FieldValues {
        let mut gen = Channels {
            t,
            noise: self.config.noise_coefficient,
            experimental: self.config.experimental,
            rng,
            values: FieldValues::new(),
        };

        gen.float(RSSI_KEY, -50.0, 0.0, 10.0, 0.0);
        gen.float(SNR_KEY, 0.0, 10.0, 10.0, PI / 2.0);

        match kind {
            PacketKind::AvToGcsData1 => {
                gen.av_state();
                gen.av_motion();
            }
            PacketKind::AvToGcsData2 => {
                gen.av_state();
                gen.av_navigation();
            }
            PacketKind::AvToGcsData3 => gen.av_state(),
            PacketKind::GseToGcsData1 => {
                gen.gse_state();
                gen.gse_sensors();
            }
            PacketKind::GseToGcsData2 => {
                gen.gse_state();
                gen.gse_environment();
            }
            PacketKind::GcsToAvStateCmd => gen.av_command(),
            PacketKind::GcsToGseStateCmd | PacketKind::GcsToGseManualControl => gen.gse_command(),
        }

        gen.values
    }
}

struct Channels<'a, R: Rng + ?Sized> {
    t: f64,
    noise: f64,
    experimental: bool,
    rng: &'a mut R,
    values: FieldValues,
}

impl<R: Rng + ?Sized> Channels<'_, R> {
    fn signal(&mut self, min: f64, max: f64, period: f64, phase: f64) -> f64 {
        noisy_sinusoid(self.t, min, max, period, phase, self.noise, &mut *self.rng)
    }

    fn set(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    fn float(&mut self, name: &str, min: f64, max: f64, period: f64, phase: f64) {
        let v = self.signal(min, max, period, phase);
        self.set(name, v);
    }

    /// Scaled sensor count, truncated toward zero.
    fn counts(&mut self, name: &str, scale: f64, min: f64, max: f64, phase: f64) {
        let v = self.signal(min, max, 5.0, phase);
        self.set(name, (v * scale) as i64);
    }

    /// Alternates in experimental mode, otherwise `normal`.
    fn flag(&mut self, name: &str, offset: f64, normal: bool) {
        let v = if self.experimental {
            changing_bool(self.t + offset, 1.0)
        } else {
            normal
        };
        self.set(name, v);
    }

    fn av_state(&mut self) {
        let state = if self.experimental {
            changing_int(self.t, 0, 0b111, 1.0)
        } else {
            0
        };
        self.set("flight_state", state);
        self.flag("dual_board_connectivity_state_flag", 0.0, true);
        self.flag("recovery_checks_complete_and_flight_ready", 0.0, false);
        self.flag("gps_fix_flag", 0.0, true);
        self.flag("payload_connection_flag", 0.0, true);
        self.flag("camera_controller_connection_flag", 0.0, true);
    }

    fn av_motion(&mut self) {
        let phases = [2.0 * PI / 3.0, 4.0 * PI / 3.0, 2.0 * PI];

        self.counts("accel_low_x", ACCEL_LOW_SCALE, -15.9, 15.9, phases[0]);
        self.counts("accel_low_y", ACCEL_LOW_SCALE, -15.9, 15.9, phases[1]);
        self.counts("accel_low_z", -ACCEL_LOW_SCALE, -15.9, 15.9, phases[2]);
        // high-g axes are mounted inverted on x and y
        self.counts("accel_high_x", -ACCEL_HIGH_SCALE, -31.9, 31.9, phases[0]);
        self.counts("accel_high_y", -ACCEL_HIGH_SCALE, -31.9, 31.9, phases[1]);
        self.counts("accel_high_z", ACCEL_HIGH_SCALE, -31.9, 31.9, phases[2]);
        for (name, phase) in ["gyro_x", "gyro_y", "gyro_z"].into_iter().zip(phases) {
            self.counts(name, 1.0 / GYRO_RESOLUTION, -245.0, 245.0, phase);
        }

        self.float("altitude", 0.0, 3000.0, 40.0, 0.0);
        self.float("velocity", 0.0, 350.0, 20.0, 0.0);

        for name in [
            "apogee_primary_test_complete",
            "apogee_secondary_test_complete",
            "apogee_primary_test_results",
            "apogee_secondary_test_results",
            "main_primary_test_complete",
            "main_secondary_test_complete",
            "main_primary_test_results",
            "main_secondary_test_results",
            "move_to_broadcast",
        ] {
            self.flag(name, 0.0, false);
        }
    }

    fn av_navigation(&mut self) {
        let latitude = self.signal(SITE_LATITUDE - 0.1, SITE_LATITUDE + 0.1, 10.0, 0.0);
        let longitude = self.signal(SITE_LONGITUDE - 0.1, SITE_LONGITUDE + 0.1, 10.0, 0.0);
        self.coordinate(LATITUDE_KEY, latitude);
        self.coordinate(LONGITUDE_KEY, longitude);

        let status = if self.experimental {
            let index = (self.t.floor() as i64).rem_euclid(NAVIGATION_STATUSES.len() as i64);
            NAVIGATION_STATUSES[index as usize]
        } else {
            "G2"
        };
        self.set("navigation_status", status);

        for (i, name) in ["quaternion_w", "quaternion_x", "quaternion_y", "quaternion_z"]
            .into_iter()
            .enumerate()
        {
            let k = (i + 1) as f64;
            self.float(name, -1.0, 1.0, 2.0 + k, k * PI / 2.0);
        }
    }

    /// Coordinates travel as fixed-width text; unformattable values are left
    /// to the packet default.
    fn coordinate(&mut self, name: &str, degrees: f64) {
        match format_coordinate(degrees, COORDINATE_LEN) {
            Ok(text) => self.set(name, text),
            Err(e) => tracing::warn!("{}: cannot format {}: {}", name, degrees, e),
        }
    }

    fn gse_state(&mut self) {
        self.flag("manual_purge_activated", 0.25, false);
        self.flag("o2_fill_activated", 0.5, false);
        self.flag("selector_switch_neutral_position", 0.0, false);
        self.flag("n2o_fill_activated", 0.75, false);
        self.flag("ignition_fired", 1.0, false);
        self.flag("ignition_selected", 0.0, false);
        self.flag("gas_fill_selected", 0.0, false);
        self.flag("system_activated", 0.0, false);

        for name in [
            "ignition_error",
            "relay_3_error",
            "relay_2_error",
            "relay_1_error",
            "thermocouple_4_error",
            "thermocouple_3_error",
            "thermocouple_2_error",
            "thermocouple_1_error",
            "load_cell_4_error",
            "load_cell_3_error",
            "load_cell_2_error",
            "load_cell_1_error",
            "transducer_4_error",
            "transducer_3_error",
            "transducer_2_error",
            "transducer_1_error",
        ] {
            self.flag(name, 0.0, false);
        }
    }

    fn gse_sensors(&mut self) {
        for k in 1..=3 {
            let phase = k as f64 * 2.0 * PI / 3.0;
            self.float(&format!("transducer_{}", k), 1.0, 30.0, 10.0, phase);
        }
        for k in 1..=4 {
            let phase = k as f64 * PI / 2.0;
            self.float(&format!("thermocouple_{}", k), 10.0, 40.0, 20.0, phase);
        }
    }

    fn gse_environment(&mut self) {
        self.float("internal_temperature", 15.0, 60.0, 30.0, 0.0);
        self.float("wind_speed", 15.0, 20.0, 30.0, 0.0);
        for (name, phase) in [("gas_bottle_weight_1", 0.0), ("gas_bottle_weight_2", PI / 2.0)] {
            let kg = self.signal(12.0, 18.0, 30.0, phase);
            self.set(name, kg as i64);
        }
        self.float("analog_voltage_input_1", 15.0, 60.0, 30.0, 0.0);
        self.float("analog_voltage_input_2", 2.0, 5.0, 10.0, 0.0);
        self.float("additional_current_input_1", 1.0, 5.0, 10.0, 0.0);
        self.float("additional_current_input_2", 2.0, 5.0, 10.0, 0.0);
    }

    fn av_command(&mut self) {
        if !self.experimental {
            return;
        }
        self.flag("main_secondary_test", 0.0, false);
        self.flag("main_primary_test", 0.25, false);
        self.flag("apogee_secondary_test", 0.5, false);
        self.flag("apogee_primary_test", 0.75, false);
        self.flag("begin_broadcast", 0.0, false);
    }

    fn gse_command(&mut self) {
        if !self.experimental {
            return;
        }
        for (i, name) in [
            "manual_purge_activate",
            "o2_fill_activate",
            "selector_switch_neutral_position",
            "n2o_fill_activate",
            "ignition_fire",
            "ignition_selected",
            "gas_fill_selected",
            "system_activate",
        ]
        .into_iter()
        .enumerate()
        {
            self.flag(name, i as f64 / 4.0, false);
        }
    }
}
