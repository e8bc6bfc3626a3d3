use crate::{
  common::DEFAULT_JOIN_TIMEOUT,
  decoder::FrameDecoder,
  error::{LinkError, Result},
  queue::ChunkQueue,
  samples::{SampleBatch, SampleBuffer},
  signal::Signal,
  stats::{LinkStats, StatsSnapshot},
  transport::{run_receiver, ChunkSource, SocketHandle, TcpTransport, Transport, UdpTransport},
};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use std::{
  io,
  net::SocketAddr,
  sync::Arc,
  thread::{self, JoinHandle},
  time::{Duration, Instant},
};

/// Lifecycle of a [`Link`].
///
/// `Idle` -> `Running` on start, `Running` -> `Stopping` on disconnect,
/// `Stopping` -> `Stopped` once the workers have joined or the join timeout elapsed.
/// A stopped link may be started again, with all resources allocated afresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkPhase {
  Idle,
  Running,
  Stopping,
  Stopped,
}

/// How a call to [`Link::disconnect`] ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeardownOutcome {
  /// nothing to tear down: never started, already stopped, or another caller is tearing down
  AlreadyStopped,
  /// both workers finished within the join timeout
  Joined,
  /// a worker did not finish in time and was left behind, everything else was released
  TimedOut,
}

/// Receiver and decoder threads of one run
struct Workers {
  receiver: JoinHandle<()>,
  decoder: JoinHandle<()>,
  /// disconnected once every worker has returned (or unwound)
  done: Receiver<()>,
}

impl Workers {
  /// wait for both workers, bounded by `timeout`.
  /// Return `false` if the timeout elapsed first, the threads are then detached.
  fn join_timeout(self, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
      match self.done.recv_deadline(deadline) {
        Ok(()) => continue,
        Err(RecvTimeoutError::Disconnected) => break,
        Err(RecvTimeoutError::Timeout) => return false,
      }
    }
    join_worker("receiver", self.receiver);
    join_worker("decoder", self.decoder);
    true
  }
}

/// join a finished worker, a panic is logged.
/// Return `true` if the worker returned normally.
fn join_worker(name: &str, handle: JoinHandle<()>) -> bool {
  let clean = handle.join().is_ok();
  if !clean {
    log::error!("{} worker panicked", name);
  }
  clean
}

/// Everything owned by a running link.
/// Moved out as a whole under the lifecycle lock, so teardown happens exactly once.
struct Running {
  socket: SocketHandle,
  queue: ChunkQueue,
  cancel: Signal,
  workers: Workers,
  local_addr: Option<SocketAddr>,
}

struct Lifecycle {
  phase: LinkPhase,
  running: Option<Running>,
  samples: SampleBuffer,
  stats: Arc<LinkStats>,
}

/// Link controller: owns the transport socket, the hand-off queue,
/// the cancellation signal and the two worker threads.
///
/// ```text
/// socket -> [receiver thread] -> chunk queue -> [decoder thread] -> sample buffer -> drain()
/// ```
///
/// Nothing is reported to the consumer during normal operation:
/// a link in trouble simply stops producing data, and `drain` returning `None`
/// over and over is the signal to disconnect or start again.
pub struct Link<T: Transport> {
  transport: T,
  state: Mutex<Lifecycle>,
}

/// Link to a sensor bridge serving frames over TCP
pub type TcpLink = Link<TcpTransport>;

/// Link receiving frames as UDP datagrams
pub type UdpLink = Link<UdpTransport>;

fn spawn_worker<F>(name: String, work: F) -> io::Result<JoinHandle<()>>
where
  F: FnOnce() + Send + 'static,
{
  thread::Builder::new().name(name).spawn(work)
}

impl<T: Transport> Link<T> {
  const KIND: &'static str = <T::Source as ChunkSource>::KIND;

  /// Prepare a link, nothing is opened until [`Link::start`].
  pub fn new(transport: impl Into<T>) -> Result<Self> {
    let transport = transport.into();
    transport.link_config().validate()?;
    Ok(Self {
      transport,
      state: Mutex::new(Lifecycle {
        phase: LinkPhase::Idle,
        running: None,
        samples: SampleBuffer::new(),
        stats: Arc::new(LinkStats::new()),
      }),
    })
  }

  /// Prepare and start a link in one step
  pub fn connect(transport: impl Into<T>) -> Result<Self> {
    let link = Self::new(transport)?;
    link.start()?;
    Ok(link)
  }

  pub fn phase(&self) -> LinkPhase {
    self.state.lock().phase
  }

  /// counters of the current (or last) run
  pub fn stats(&self) -> StatsSnapshot {
    self.state.lock().stats.snapshot()
  }

  /// local address of the running socket
  pub fn local_addr(&self) -> Option<SocketAddr> {
    self.state.lock().running.as_ref().and_then(|r| r.local_addr)
  }

  /// Open the transport and launch the receiver and decoder workers.
  ///
  /// The queue, the cancellation signal, the sample buffer and the socket are all new,
  /// nothing from a previous run is reused.
  /// Fails if the socket cannot be created or bound, or if the link is not idle/stopped.
  pub fn start(&self) -> Result<()> {
    let mut state = self.state.lock();
    match state.phase {
      LinkPhase::Running => return Err(LinkError::AlreadyRunning),
      LinkPhase::Stopping => return Err(LinkError::Stopping),
      LinkPhase::Idle | LinkPhase::Stopped => {}
    }

    let config = self.transport.link_config();
    let (source, socket) = self.transport.open()?;
    let local_addr = socket.local_addr();
    let queue = ChunkQueue::bounded(config.queue_capacity);
    let cancel = Signal::new();
    let samples = SampleBuffer::new();
    let stats = Arc::new(LinkStats::new());
    let (done_tx, done) = bounded::<()>(0);

    let decoder = {
      let decoder = FrameDecoder::new(config.format, config.accumulator_ceiling);
      let (rx, cancel, samples, stats, done) = (
        queue.receiver(),
        cancel.watch(),
        samples.clone(),
        stats.clone(),
        done_tx.clone(),
      );
      spawn_worker(format!("ttc-{}-decode", Self::KIND), move || {
        let _done = done;
        decoder.run(rx, cancel, samples, stats);
      })
    };
    let decoder = match decoder {
      Ok(handle) => handle,
      Err(e) => {
        socket.close(true);
        return Err(e.into());
      }
    };

    let receiver = {
      let (tx, cancel, stats) = (queue.sender(), cancel.watch(), stats.clone());
      spawn_worker(format!("ttc-{}-recv", Self::KIND), move || {
        let _done = done_tx;
        run_receiver(source, tx, cancel, stats);
      })
    };
    let receiver = match receiver {
      Ok(handle) => handle,
      Err(e) => {
        cancel.raise();
        socket.close(true);
        join_worker("decoder", decoder);
        return Err(e.into());
      }
    };

    state.samples = samples;
    state.stats = stats;
    state.running = Some(Running {
      socket,
      queue,
      cancel,
      workers: Workers {
        receiver,
        decoder,
        done,
      },
      local_addr,
    });
    state.phase = LinkPhase::Running;
    log::info!("{} link started", Self::KIND);
    Ok(())
  }

  /// Stop the link and release everything it owns.
  ///
  /// 1. raise cancellation (unblocks the decoder's queue wait)
  /// 2. shut down and close the socket, abortively if `fast_release`
  /// 3. wait at most `join_timeout` for both workers
  /// 4. complete the queue and discard leftover chunks
  /// 5. drop the cancellation signal
  ///
  /// Never fails. Repeated or concurrent calls are harmless: only the caller
  /// which takes the resources out of the lifecycle tears them down.
  /// Rows decoded before the stop remain available to [`Link::drain`].
  pub fn disconnect(&self, fast_release: bool, join_timeout: Duration) -> TeardownOutcome {
    let (running, stats) = {
      let mut state = self.state.lock();
      match state.running.take() {
        Some(running) => {
          state.phase = LinkPhase::Stopping;
          (running, state.stats.clone())
        }
        None => return TeardownOutcome::AlreadyStopped,
      }
    };
    log::debug!("{} link stopping", Self::KIND);

    let Running {
      socket,
      queue,
      cancel,
      workers,
      ..
    } = running;
    cancel.raise();
    socket.close(fast_release);
    let outcome = if workers.join_timeout(join_timeout) {
      TeardownOutcome::Joined
    } else {
      log::warn!("{} link workers still running after {:?}, left behind", Self::KIND, join_timeout);
      TeardownOutcome::TimedOut
    };
    let discarded = queue.close();
    if discarded > 0 {
      log::debug!("{} queued chunks discarded", discarded);
    }
    drop(cancel);

    log::info!("{} link stopped: {}", Self::KIND, stats.snapshot());
    self.state.lock().phase = LinkPhase::Stopped;
    outcome
  }

  /// Take everything decoded since the previous call, one sequence per channel.
  /// `None` means no data (or fewer rows than the configured minimum) yet.
  pub fn drain(&self) -> Option<SampleBatch> {
    let samples = self.state.lock().samples.clone();
    let config = self.transport.link_config();
    samples.drain(config.format.channels(), config.min_drain_rows)
  }
}

impl<T: Transport> Drop for Link<T> {
  /// stop the workers and release the socket
  fn drop(&mut self) {
    if self.state.get_mut().running.is_some() {
      self.disconnect(true, DEFAULT_JOIN_TIMEOUT);
    }
  }
}
