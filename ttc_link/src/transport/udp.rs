use super::{ChunkSource, ErrorAction, Received, SocketHandle, Transport};
use crate::{
  common::UDP_SCRATCH_SIZE,
  config::{LinkConfig, UdpConfig},
};
use socket2::{Domain, Protocol, Socket, Type};
use std::{
  io::{self, ErrorKind},
  net::{IpAddr, Ipv4Addr, SocketAddrV4, UdpSocket},
  time::Duration,
};

/// Receives frames as UDP datagrams on the wildcard address.
/// UDP is connectionless: there is no peer to connect to and no close to observe.
pub struct UdpTransport {
  config: UdpConfig,
}

/// Receive side of a bound UDP socket
pub struct UdpSource {
  socket: UdpSocket,
  source_filter: Option<Ipv4Addr>,
  error_backoff: Duration,
}

impl UdpTransport {
  pub fn new(config: UdpConfig) -> Self {
    Self { config }
  }
}

impl From<UdpConfig> for UdpTransport {
  fn from(config: UdpConfig) -> Self {
    Self::new(config)
  }
}

impl Transport for UdpTransport {
  type Source = UdpSource;

  fn link_config(&self) -> &LinkConfig {
    &self.config.link
  }

  fn open(&self) -> io::Result<(UdpSource, SocketHandle)> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    if let Err(e) = socket.set_reuse_address(true) {
      log::warn!("udp socket option SO_REUSEADDR not applied: {}", e);
    }
    if let Err(e) = socket.set_recv_buffer_size(self.config.recv_buffer_size) {
      log::warn!("udp socket option SO_RCVBUF not applied: {}", e);
    }
    let local = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, self.config.port);
    socket.bind(&local.into())?;
    // wake up periodically to observe cancellation
    socket.set_read_timeout(Some(self.config.poll_timeout))?;
    log::info!("udp bound on {}", local);

    let handle = SocketHandle::new(socket.try_clone()?, UdpSource::KIND);
    let source = UdpSource {
      socket: socket.into(),
      source_filter: self.config.source_filter,
      error_backoff: self.config.error_backoff,
    };
    Ok((source, handle))
  }
}

impl ChunkSource for UdpSource {
  const KIND: &'static str = "udp";
  const SCRATCH_SIZE: usize = UDP_SCRATCH_SIZE;

  fn establish(&mut self) -> io::Result<()> {
    match self.source_filter {
      Some(ip) => log::info!("udp accepting datagrams from {} only", ip),
      None => log::info!("udp accepting datagrams from any sender"),
    }
    Ok(())
  }

  fn recv_chunk(&mut self, scratch: &mut [u8]) -> io::Result<Received> {
    match self.socket.recv_from(scratch) {
      Ok((0, _)) => Ok(Received::Idle),
      Ok((n, from)) => match self.source_filter {
        // address-only filter, the payload is not inspected
        Some(ip) if from.ip() != IpAddr::V4(ip) => {
          log::trace!("udp datagram from {} rejected", from);
          Ok(Received::Rejected)
        }
        _ => Ok(Received::Bytes(n)),
      },
      Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(Received::Idle),
      Err(e) => Err(e),
    }
  }

  /// Datagram receive errors are usually transient.
  fn on_error(&self, _: &io::Error) -> ErrorAction {
    ErrorAction::Backoff(self.error_backoff)
  }
}
