/// ports, frame layout, buffer sizes and timeouts
pub mod common;

/// error types of the link and its building blocks
mod error;
pub use error::{FrameError, LinkError, QueueError, Result};

/// one-shot broadcast signal, used for cancellation and queue completion
mod signal;
pub use signal::{CancelToken, Signal, SignalWatch};

/// bounded hand-off queue between the receiver and the decoder
mod queue;
pub use queue::{Chunk, ChunkQueue, ChunkReceiver, ChunkSender};

/// frame layout and ADC code conversion
mod frame;
pub use frame::{code_to_volts, FrameFormat, SampleRow};

/// growable byte buffer with a persistent scan cursor
mod accumulator;
pub use accumulator::ByteAccumulator;

/// thread safe decoded sample storage and channel-major batches
mod samples;
pub use samples::{SampleBatch, SampleBuffer};

/// link counters
mod stats;
pub use stats::{LinkStats, StatsSnapshot};

/// link and transport settings
mod config;
pub use config::{LinkConfig, TcpConfig, UdpConfig};

/// frame resynchronization and the decoder worker
mod decoder;
pub use decoder::{Decoded, FrameDecoder};

/// TCP and UDP chunk sources, the receiver worker
pub mod transport;
pub use transport::{TcpTransport, UdpTransport};

/// link controller: start, drain, disconnect
mod link;
pub use link::{Link, LinkPhase, TcpLink, TeardownOutcome, UdpLink};
