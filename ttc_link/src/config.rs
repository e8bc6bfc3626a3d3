use crate::{
  common::*,
  error::{LinkError, Result},
  frame::FrameFormat,
};
use std::{
  net::{Ipv4Addr, SocketAddrV4},
  time::Duration,
};

/// Settings shared by both transports: framing, queueing and drain policy.
#[derive(Clone, Debug)]
pub struct LinkConfig {
  pub format: FrameFormat,
  /// capacity of the hand-off queue, in chunks
  pub queue_capacity: usize,
  /// accumulator size which triggers compaction
  pub accumulator_ceiling: usize,
  /// `drain` reports no data until this many rows are buffered
  pub min_drain_rows: usize,
}

impl Default for LinkConfig {
  fn default() -> Self {
    Self {
      format: FrameFormat::default(),
      queue_capacity: DEFAULT_QUEUE_CAPACITY,
      accumulator_ceiling: ACCUMULATOR_CEILING,
      min_drain_rows: 1,
    }
  }
}

impl LinkConfig {
  pub fn with_frame_len(mut self, frame_len: usize) -> Result<Self> {
    self.format = FrameFormat::new(frame_len)?;
    Ok(self)
  }

  pub fn with_min_drain_rows(mut self, rows: usize) -> Self {
    self.min_drain_rows = rows;
    self
  }

  pub fn validate(&self) -> Result<()> {
    if self.queue_capacity == 0 {
      return Err(LinkError::Config("queue capacity must be positive".to_string()));
    }
    if self.accumulator_ceiling < self.format.frame_len() {
      return Err(LinkError::Config(format!(
        "accumulator ceiling {} is smaller than a frame ({} bytes)",
        self.accumulator_ceiling,
        self.format.frame_len()
      )));
    }
    Ok(())
  }
}

/// Stream transport: connect to the sensor bridge
#[derive(Clone, Debug)]
pub struct TcpConfig {
  pub peer: SocketAddrV4,
  pub connect_timeout: Duration,
  /// a silent peer is given up after this long
  pub recv_timeout: Duration,
  pub recv_buffer_size: usize,
  pub send_buffer_size: usize,
  pub keepalive: bool,
  pub link: LinkConfig,
}

impl TcpConfig {
  /// Connect to `ip` on the default port
  pub fn new(ip: Ipv4Addr) -> Self {
    Self {
      peer: SocketAddrV4::new(ip, DEFAULT_PORT),
      connect_timeout: DEFAULT_CONNECT_TIMEOUT,
      recv_timeout: TCP_RECV_TIMEOUT,
      recv_buffer_size: TCP_RECV_BUFFER,
      send_buffer_size: TCP_SEND_BUFFER,
      keepalive: true,
      link: LinkConfig::default(),
    }
  }

  pub fn with_port(mut self, port: u16) -> Self {
    self.peer.set_port(port);
    self
  }

  pub fn with_link(mut self, link: LinkConfig) -> Self {
    self.link = link;
    self
  }
}

/// Datagram transport: bind the wildcard address and accept frames
/// from any sender, or only from `source_filter`
#[derive(Clone, Debug)]
pub struct UdpConfig {
  pub port: u16,
  pub source_filter: Option<Ipv4Addr>,
  pub recv_buffer_size: usize,
  /// wake-up interval of the blocking receive
  pub poll_timeout: Duration,
  /// pause after a transient receive error
  pub error_backoff: Duration,
  pub link: LinkConfig,
}

impl UdpConfig {
  pub fn new() -> Self {
    Self {
      port: DEFAULT_PORT,
      source_filter: None,
      recv_buffer_size: UDP_RECV_BUFFER,
      poll_timeout: UDP_POLL_TIMEOUT,
      error_backoff: UDP_ERROR_BACKOFF,
      link: LinkConfig::default(),
    }
  }

  pub fn with_port(mut self, port: u16) -> Self {
    self.port = port;
    self
  }

  pub fn with_source(mut self, source: Ipv4Addr) -> Self {
    self.source_filter = Some(source);
    self
  }

  pub fn with_link(mut self, link: LinkConfig) -> Self {
    self.link = link;
    self
  }
}

impl Default for UdpConfig {
  fn default() -> Self {
    Self::new()
  }
}
