use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

/// A one-shot broadcast latch.
///
/// Raising the signal drops the only sender of an internal channel,
/// so every watcher blocked in a `select!` on [`SignalWatch::receiver`] wakes up
/// and all later waits return immediately.
/// Used for cancellation of the link workers and for marking the hand-off queue complete.
pub struct Signal {
  trigger: Mutex<Option<Sender<()>>>,
  watch: SignalWatch,
}

/// Read side of a [`Signal`], cheap to clone and hand to worker threads.
#[derive(Clone, Debug)]
pub struct SignalWatch {
  rx: Receiver<()>,
  raised: Arc<AtomicBool>,
}

/// Cancellation as seen by the link workers
pub type CancelToken = SignalWatch;

impl Signal {
  pub fn new() -> Self {
    let (tx, rx) = bounded(0);
    Self {
      trigger: Mutex::new(Some(tx)),
      watch: SignalWatch {
        rx,
        raised: Arc::new(AtomicBool::new(false)),
      },
    }
  }

  /// Raise the signal.
  /// Return `true` for the call which actually raised it, `false` if it was already raised.
  pub fn raise(&self) -> bool {
    let trigger = self.trigger.lock().take();
    match trigger {
      Some(tx) => {
        self.watch.raised.store(true, Ordering::Release);
        drop(tx);
        true
      }
      None => false,
    }
  }

  pub fn is_raised(&self) -> bool {
    self.watch.is_raised()
  }

  pub fn watch(&self) -> SignalWatch {
    self.watch.clone()
  }
}

impl Default for Signal {
  fn default() -> Self {
    Self::new()
  }
}

impl SignalWatch {
  pub fn is_raised(&self) -> bool {
    self.raised.load(Ordering::Acquire)
  }

  /// Channel which becomes ready (disconnected) once the signal is raised.
  /// Meant for `crossbeam_channel::select!`.
  pub fn receiver(&self) -> &Receiver<()> {
    &self.rx
  }
}

#[cfg(test)]
mod tests {
  use super::Signal;
  use crossbeam_channel::RecvTimeoutError;
  use std::{
    thread,
    time::{Duration, Instant},
  };

  #[test]
  fn raise_once() {
    let signal = Signal::new();
    assert!(!signal.is_raised());
    assert!(signal.raise());
    assert!(!signal.raise());
    assert!(signal.is_raised());
    assert!(signal.watch().is_raised());
  }

  #[test]
  fn receiver_stays_pending_without_raise() {
    let signal = Signal::new();
    let watch = signal.watch();
    let start = Instant::now();
    assert_eq!(
      watch.receiver().recv_timeout(Duration::from_millis(30)),
      Err(RecvTimeoutError::Timeout)
    );
    assert!(start.elapsed() >= Duration::from_millis(30));
  }

  #[test]
  fn raise_wakes_blocked_watchers() {
    let signal = Signal::new();
    let watchers: Vec<_> = (0..3)
      .map(|_| {
        let watch = signal.watch();
        thread::spawn(move || watch.receiver().recv_timeout(Duration::from_secs(10)))
      })
      .collect();
    thread::sleep(Duration::from_millis(20));
    let start = Instant::now();
    signal.raise();
    for watcher in watchers {
      assert_eq!(watcher.join().unwrap(), Err(RecvTimeoutError::Disconnected));
    }
    assert!(start.elapsed() < Duration::from_secs(5));
  }
}
