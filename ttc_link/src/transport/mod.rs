use crate::{
  config::LinkConfig,
  error::QueueError,
  queue::ChunkSender,
  signal::CancelToken,
  stats::LinkStats,
};
use socket2::Socket;
use std::{
  io,
  net::{Shutdown, SocketAddr},
  sync::Arc,
  thread,
  time::Duration,
};

mod tcp;
pub use tcp::{TcpSource, TcpTransport};

mod udp;
pub use udp::{UdpSource, UdpTransport};

/// Outcome of one receive call on a [`ChunkSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
  /// this many bytes were written at the start of the scratch buffer
  Bytes(usize),
  /// a datagram arrived but was discarded by the source filter
  Rejected,
  /// nothing arrived before the poll interval elapsed
  Idle,
  /// orderly close by the remote end
  Closed,
}

/// What the receiver loop does after a receive error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
  /// the link is dead, leave the receive loop
  Stop,
  /// transient, sleep and try again
  Backoff(Duration),
}

/// A byte chunk source: the part of a transport that pulls bytes off the wire.
/// The receiver loop, the hand-off queue and the decoder are shared by all sources.
pub trait ChunkSource: Send + 'static {
  /// short transport name for logging
  const KIND: &'static str;
  /// size of the reusable scratch buffer
  const SCRATCH_SIZE: usize;

  /// Make the source ready to receive, e.g. connect to the peer.
  /// Called on the receiver thread.
  fn establish(&mut self) -> io::Result<()>;

  /// Block for the next run of bytes and write it into `scratch`.
  fn recv_chunk(&mut self, scratch: &mut [u8]) -> io::Result<Received>;

  /// Classify a receive error.
  fn on_error(&self, err: &io::Error) -> ErrorAction;
}

/// Factory of fresh chunk sources, one per link start.
pub trait Transport: Send + Sync + 'static {
  type Source: ChunkSource;

  fn link_config(&self) -> &LinkConfig;

  /// Create and configure a new socket.
  /// Return the source which the receiver thread will own, and a handle to the same socket
  /// for the controller to tear it down.
  fn open(&self) -> io::Result<(Self::Source, SocketHandle)>;
}

/// The controller's handle on a receiver's socket.
/// Shutting it down wakes a receive call blocked on the same socket.
pub struct SocketHandle {
  socket: Socket,
  kind: &'static str,
}

impl SocketHandle {
  pub(crate) fn new(socket: Socket, kind: &'static str) -> Self {
    Self { socket, kind }
  }

  /// local address the socket is bound to, if any
  pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
    self.socket.local_addr().ok().and_then(|addr| addr.as_socket())
  }

  /// Shut down both directions, optionally force an abortive close (linger 0)
  /// to release the local port at once, then close the handle.
  /// Errors are logged, a socket already shut down is not a failure here.
  pub(crate) fn close(self, fast_release: bool) {
    if let Err(e) = self.socket.shutdown(Shutdown::Both) {
      log::debug!("{} socket shutdown: {}", self.kind, e);
    }
    if fast_release {
      if let Err(e) = self.socket.set_linger(Some(Duration::ZERO)) {
        log::debug!("{} socket linger: {}", self.kind, e);
      }
    }
    drop(self.socket);
    log::debug!("{} socket closed", self.kind);
  }
}

/// Receiver worker main function:
/// pull chunks from `source` and push owned copies into the hand-off queue
/// until cancellation, remote close, or a fatal receive error.
///
/// The receiver never reconnects, a restart of the link is needed for that.
pub(crate) fn run_receiver<S: ChunkSource>(mut source: S, queue: ChunkSender, cancel: CancelToken, stats: Arc<LinkStats>) {
  if let Err(e) = source.establish() {
    log::error!("{} link could not be established: {}", S::KIND, e);
    return;
  }
  log::info!("{} receiver started", S::KIND);

  let mut scratch = vec![0; S::SCRATCH_SIZE];
  while !cancel.is_raised() {
    match source.recv_chunk(&mut scratch) {
      Ok(Received::Bytes(n)) => {
        stats.on_received(n);
        match queue.add(scratch[..n].to_vec()) {
          Ok(()) => stats.on_enqueued(),
          Err(QueueError::Full) => {
            stats.on_dropped();
            log::warn!("{} hand-off queue full, {} bytes dropped", S::KIND, n);
          }
          Err(e) => {
            log::debug!("{} hand-off queue closed: {}", S::KIND, e);
            break;
          }
        }
      }
      Ok(Received::Rejected) => stats.on_rejected_datagram(),
      Ok(Received::Idle) => continue,
      Ok(Received::Closed) => {
        log::info!("{} connection closed by remote", S::KIND);
        break;
      }
      // socket torn down by disconnect
      Err(_) if cancel.is_raised() => break,
      Err(e) => match source.on_error(&e) {
        ErrorAction::Stop => {
          log::warn!("{} receive failed, receiver exits: {}", S::KIND, e);
          break;
        }
        ErrorAction::Backoff(pause) => {
          log::debug!("{} receive error, retry in {:?}: {}", S::KIND, pause, e);
          thread::sleep(pause);
        }
      },
    }
  }
  log::info!("{} receiver stopped", S::KIND);
}
