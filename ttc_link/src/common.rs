use std::time::Duration;

/// Port on which the sensor bridge serves frames, for both TCP and UDP
pub const DEFAULT_PORT: u16 = 4321;

/// marker(1) + 6 channel words(12) + trailer(1)
pub const DEFAULT_FRAME_LEN: usize = 14;

/// First byte of every frame
pub const FRAME_MARKER: u8 = 0xAA;

/// Last byte of every frame
pub const FRAME_TRAILER: u8 = 0xBB;

/// ADC input range is +/- this many volts
pub const FULL_SCALE_VOLTS: f64 = 5.0;

/// Number of codes on each side of zero for a 16-bit two's complement ADC
pub const CODE_SPAN: f64 = 32768.0;

/// Byte accumulator size above which the already-scanned prefix is dropped
pub const ACCUMULATOR_CEILING: usize = 1024 * 1024;

/// Maximum number of raw chunks waiting between receiver and decoder
pub const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// Scratch buffer for a single TCP receive call
pub const TCP_SCRATCH_SIZE: usize = 4096;

/// Scratch buffer for a single UDP datagram
pub const UDP_SCRATCH_SIZE: usize = 8192;

/// Kernel receive buffer for TCP: about 1.5s of data at 10kHz x 15 bytes
pub const TCP_RECV_BUFFER: usize = 256 * 1024;

/// Kernel send buffer for TCP
pub const TCP_SEND_BUFFER: usize = 64 * 1024;

/// Kernel receive buffer for UDP, absorbs bursts
pub const UDP_RECV_BUFFER: usize = 4 * 1024 * 1024;

/// A TCP peer silent for this long is considered dead
pub const TCP_RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Timeout for establishing the TCP connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// UDP receive wake-up interval, used to observe cancellation
pub const UDP_POLL_TIMEOUT: Duration = Duration::from_millis(200);

/// Sleep after a transient UDP receive error
pub const UDP_ERROR_BACKOFF: Duration = Duration::from_millis(5);

/// Default bound on waiting for worker threads during disconnect
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(2);
