//! Error types for the telemetry link

/// Result type alias
pub type Result<T> = std::result::Result<T, LinkError>;

/// Errors visible to the owner of a link.
///
/// Only construction and [`crate::Link::start`] report errors, steady state faults
/// are absorbed by the workers and show up as missing data.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
  /// Socket creation, configuration or bind failed
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  /// Frame length cannot carry whole 16-bit channel words
  #[error("invalid frame length {0}: need an even length of at least 4 bytes")]
  InvalidFrameLength(usize),

  /// `start` called on a running link
  #[error("link is already running")]
  AlreadyRunning,

  /// `start` called while a disconnect is in progress
  #[error("link is stopping")]
  Stopping,

  /// Rejected configuration value
  #[error("invalid configuration: {0}")]
  Config(String),
}

/// A single frame failed to decode. The frame is dropped, scanning continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
  /// Payload does not match the configured frame layout
  #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
  PayloadLength { expected: usize, actual: usize },

  /// Number of channel codes does not match the configured frame layout
  #[error("channel count mismatch: expected {expected}, got {actual}")]
  ChannelCount { expected: usize, actual: usize },
}

/// Hand-off queue failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
  /// The queue is at capacity, the chunk was not enqueued
  #[error("queue full")]
  Full,

  /// The queue was marked complete and holds nothing more
  #[error("queue completed")]
  Completed,

  /// The wait was interrupted by cancellation
  #[error("cancelled")]
  Cancelled,
}
