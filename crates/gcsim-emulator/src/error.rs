//! Error types for gcsim-emulator.

use std::io;
use std::path::PathBuf;

use gcsim_packet::{Device, PacketError};
use gcsim_telemetry::TelemetryError;
use gcsim_uart_protocol::FrameError;
use thiserror::Error;

/// Errors raised while configuring or running the emulator.
#[derive(Debug, Error)]
pub enum EmulatorError {
    /// Config file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Config file is not valid YAML for the config schema.
    #[error("invalid config YAML: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// A config value is out of range or missing.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Invalid synthesizer or corruption parameters.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// Packet values could not be encoded.
    #[error(transparent)]
    Packet(#[from] PacketError),

    /// Frame rendering failed.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Transport or thread setup IO failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The Ctrl-C handler could not be installed.
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    /// A producer thread panicked.
    #[error("producer thread for {0} panicked")]
    ProducerPanicked(Device),
}

impl EmulatorError {
    /// Creates an invalid config error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        EmulatorError::InvalidConfig(msg.into())
    }
}

/// Result type for emulator operations.
pub type Result<T> = std::result::Result<T, EmulatorError>;
