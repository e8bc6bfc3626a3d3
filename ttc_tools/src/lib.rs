/// Append drained sample batches to a CSV file
mod csv_sink;
pub use csv_sink::CsvSink;

/// Sensor front-end stand-in: produces frames and serves them over TCP or UDP
pub mod emulator;
pub use emulator::{FrameEmulator, Waveform};

/// Utilities for CLI, console text style
pub mod cli_util;
