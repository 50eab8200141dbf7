//! Error types for the framing layer.

use gcsim_packet::PacketError;
use thiserror::Error;

/// Errors that can occur while producing a wire frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The packet could not be built.
    #[error(transparent)]
    Packet(#[from] PacketError),

    /// Unrecognised interface mode name.
    #[error("unknown interface mode: {0}")]
    UnknownMode(String),
}

/// Result type alias for framing operations.
pub type FrameResult<T> = Result<T, FrameError>;
