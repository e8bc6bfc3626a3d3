use std::{
  fmt,
  sync::atomic::{AtomicU64, Ordering},
};

/// Counters shared by the receiver and decoder workers of one link
#[derive(Debug, Default)]
pub struct LinkStats {
  bytes_received: AtomicU64,
  chunks_enqueued: AtomicU64,
  chunks_dropped: AtomicU64,
  datagrams_rejected: AtomicU64,
  frames_decoded: AtomicU64,
  frames_rejected: AtomicU64,
  bytes_compacted: AtomicU64,
}

/// Point-in-time copy of [`LinkStats`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
  pub bytes_received: u64,
  pub chunks_enqueued: u64,
  /// chunks lost because the hand-off queue was full
  pub chunks_dropped: u64,
  /// datagrams from a sender other than the configured source
  pub datagrams_rejected: u64,
  pub frames_decoded: u64,
  /// frames with valid marker and trailer which failed to decode
  pub frames_rejected: u64,
  /// scanned bytes discarded when the accumulator hit its ceiling
  pub bytes_compacted: u64,
}

fn bump(counter: &AtomicU64, n: u64) {
  counter.fetch_add(n, Ordering::Relaxed);
}

impl LinkStats {
  pub fn new() -> Self {
    Self::default()
  }

  pub(crate) fn on_received(&self, bytes: usize) {
    bump(&self.bytes_received, bytes as u64);
  }
  pub(crate) fn on_enqueued(&self) {
    bump(&self.chunks_enqueued, 1);
  }
  pub(crate) fn on_dropped(&self) {
    bump(&self.chunks_dropped, 1);
  }
  pub(crate) fn on_rejected_datagram(&self) {
    bump(&self.datagrams_rejected, 1);
  }
  pub(crate) fn on_decoded(&self, frames: usize) {
    bump(&self.frames_decoded, frames as u64);
  }
  pub(crate) fn on_rejected_frame(&self) {
    bump(&self.frames_rejected, 1);
  }
  pub(crate) fn on_compacted(&self, bytes: usize) {
    bump(&self.bytes_compacted, bytes as u64);
  }

  pub fn snapshot(&self) -> StatsSnapshot {
    StatsSnapshot {
      bytes_received: self.bytes_received.load(Ordering::Relaxed),
      chunks_enqueued: self.chunks_enqueued.load(Ordering::Relaxed),
      chunks_dropped: self.chunks_dropped.load(Ordering::Relaxed),
      datagrams_rejected: self.datagrams_rejected.load(Ordering::Relaxed),
      frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
      frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
      bytes_compacted: self.bytes_compacted.load(Ordering::Relaxed),
    }
  }
}

impl fmt::Display for StatsSnapshot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "rx={}B chunks={} dropped={} filtered={} frames={} bad_frames={} compacted={}B",
      self.bytes_received,
      self.chunks_enqueued,
      self.chunks_dropped,
      self.datagrams_rejected,
      self.frames_decoded,
      self.frames_rejected,
      self.bytes_compacted
    )
  }
}
