use crate::{
  error::QueueError,
  signal::{CancelToken, Signal, SignalWatch},
};
use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};

/// An owned run of raw bytes, as returned by one socket receive call
pub type Chunk = Vec<u8>;

/// Bounded FIFO of byte chunks between the transport receiver and the frame decoder.
///
/// - [`ChunkSender::add`] never blocks, a full queue rejects the chunk.
/// - [`ChunkReceiver::take`] blocks until a chunk arrives, the queue is completed,
///   or the caller's cancellation is raised.
/// - [`ChunkQueue::mark_complete`] wakes a blocked taker; chunks still queued
///   are handed out before `take` reports [`QueueError::Completed`].
pub struct ChunkQueue {
  tx: Sender<Chunk>,
  rx: Receiver<Chunk>,
  complete: Signal,
}

/// Producer handle, owned by the receiver worker
pub struct ChunkSender {
  tx: Sender<Chunk>,
  complete: SignalWatch,
}

/// Consumer handle, owned by the decoder worker
pub struct ChunkReceiver {
  rx: Receiver<Chunk>,
  complete: SignalWatch,
}

impl ChunkQueue {
  pub fn bounded(capacity: usize) -> Self {
    let (tx, rx) = bounded(capacity);
    Self {
      tx,
      rx,
      complete: Signal::new(),
    }
  }

  pub fn sender(&self) -> ChunkSender {
    ChunkSender {
      tx: self.tx.clone(),
      complete: self.complete.watch(),
    }
  }

  pub fn receiver(&self) -> ChunkReceiver {
    ChunkReceiver {
      rx: self.rx.clone(),
      complete: self.complete.watch(),
    }
  }

  /// No more input will be accepted.
  /// Return `true` for the call that completed the queue.
  pub fn mark_complete(&self) -> bool {
    self.complete.raise()
  }

  /// number of chunks waiting to be taken
  pub fn len(&self) -> usize {
    self.rx.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rx.is_empty()
  }

  /// Complete the queue and throw away whatever is still queued.
  /// Return the number of discarded chunks.
  pub fn close(self) -> usize {
    self.mark_complete();
    self.rx.try_iter().count()
  }
}

impl ChunkSender {
  /// Enqueue a chunk without waiting.
  pub fn add(&self, chunk: Chunk) -> Result<(), QueueError> {
    if self.complete.is_raised() {
      return Err(QueueError::Completed);
    }
    self.tx.try_send(chunk).map_err(|e| match e {
      TrySendError::Full(_) => QueueError::Full,
      TrySendError::Disconnected(_) => QueueError::Completed,
    })
  }
}

impl ChunkReceiver {
  /// Wait for the next chunk.
  pub fn take(&self, cancel: &CancelToken) -> Result<Chunk, QueueError> {
    if cancel.is_raised() {
      return Err(QueueError::Cancelled);
    }
    select! {
      recv(self.rx) -> chunk => chunk.map_err(|_| QueueError::Completed),
      recv(cancel.receiver()) -> _ => Err(QueueError::Cancelled),
      recv(self.complete.receiver()) -> _ => self.rx.try_recv().map_err(|_| QueueError::Completed),
    }
  }

  /// Fetch a chunk if one is immediately available
  pub fn try_take(&self) -> Option<Chunk> {
    self.rx.try_recv().ok()
  }
}
