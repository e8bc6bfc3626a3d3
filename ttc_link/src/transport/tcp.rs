use super::{ChunkSource, ErrorAction, Received, SocketHandle, Transport};
use crate::{
  common::TCP_SCRATCH_SIZE,
  config::{LinkConfig, TcpConfig},
};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::{
  io::{self, ErrorKind, Read},
  net::SocketAddrV4,
  time::Duration,
};

/// Connects to the sensor bridge over TCP.
/// Every start creates a brand new socket: a socket which has been shut down cannot be reused.
pub struct TcpTransport {
  config: TcpConfig,
}

/// Receive side of one TCP connection
pub struct TcpSource {
  socket: Socket,
  peer: SocketAddrV4,
  connect_timeout: Duration,
}

impl TcpTransport {
  pub fn new(config: TcpConfig) -> Self {
    Self { config }
  }
}

impl From<TcpConfig> for TcpTransport {
  fn from(config: TcpConfig) -> Self {
    Self::new(config)
  }
}

/// socket tuning is best effort, the link still works with OS defaults
fn tune(what: &str, result: io::Result<()>) {
  if let Err(e) = result {
    log::warn!("tcp socket option {} not applied: {}", what, e);
  }
}

impl Transport for TcpTransport {
  type Source = TcpSource;

  fn link_config(&self) -> &LinkConfig {
    &self.config.link
  }

  fn open(&self) -> io::Result<(TcpSource, SocketHandle)> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    // payload bytes must not wait for coalescing
    tune("TCP_NODELAY", socket.set_nodelay(true));
    tune("SO_RCVBUF", socket.set_recv_buffer_size(self.config.recv_buffer_size));
    tune("SO_SNDBUF", socket.set_send_buffer_size(self.config.send_buffer_size));
    tune("SO_KEEPALIVE", socket.set_keepalive(self.config.keepalive));
    // a dead peer must end the receive call
    socket.set_read_timeout(Some(self.config.recv_timeout))?;

    let handle = SocketHandle::new(socket.try_clone()?, TcpSource::KIND);
    let source = TcpSource {
      socket,
      peer: self.config.peer,
      connect_timeout: self.config.connect_timeout,
    };
    Ok((source, handle))
  }
}

impl ChunkSource for TcpSource {
  const KIND: &'static str = "tcp";
  const SCRATCH_SIZE: usize = TCP_SCRATCH_SIZE;

  fn establish(&mut self) -> io::Result<()> {
    log::debug!("tcp connecting to {}", self.peer);
    self
      .socket
      .connect_timeout(&SockAddr::from(self.peer), self.connect_timeout)?;
    log::info!("tcp connected to {}", self.peer);
    Ok(())
  }

  fn recv_chunk(&mut self, scratch: &mut [u8]) -> io::Result<Received> {
    match self.socket.read(scratch) {
      Ok(0) => Ok(Received::Closed),
      Ok(n) => Ok(Received::Bytes(n)),
      Err(e) if e.kind() == ErrorKind::Interrupted => Ok(Received::Idle),
      Err(e) => Err(e),
    }
  }

  /// Peer reset, timeout or any other socket error ends the stream.
  fn on_error(&self, err: &io::Error) -> ErrorAction {
    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) {
      log::warn!("tcp peer {} silent for more than the receive timeout", self.peer);
    }
    ErrorAction::Stop
  }
}
