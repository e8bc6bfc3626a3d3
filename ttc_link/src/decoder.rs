use crate::{
  accumulator::ByteAccumulator,
  error::QueueError,
  frame::{FrameFormat, SampleRow},
  queue::ChunkReceiver,
  samples::SampleBuffer,
  signal::CancelToken,
  stats::LinkStats,
};
use std::sync::Arc;

/// Result of feeding one chunk into a [`FrameDecoder`]
#[derive(Debug, Default)]
pub struct Decoded {
  /// decoded rows in stream order
  pub rows: Vec<SampleRow>,
  /// frames with marker and trailer in place that failed to decode
  pub rejected: usize,
  /// stale bytes dropped by accumulator compaction
  pub compacted: usize,
}

/// Turns an unaligned byte stream into decoded sample rows.
/// Shared by every transport, the accumulator is private to the decoder.
pub struct FrameDecoder {
  format: FrameFormat,
  accumulator: ByteAccumulator,
}

impl FrameDecoder {
  pub fn new(format: FrameFormat, ceiling: usize) -> Self {
    Self {
      format,
      accumulator: ByteAccumulator::new(ceiling),
    }
  }

  /// bytes held back waiting for the rest of a frame, or not yet compacted
  pub fn pending_bytes(&self) -> usize {
    self.accumulator.len()
  }

  /// Append a chunk and decode every frame which is now complete.
  pub fn feed(&mut self, chunk: &[u8]) -> Decoded {
    let mut decoded = Decoded {
      compacted: self.accumulator.extend(chunk),
      ..Default::default()
    };
    if decoded.compacted > 0 {
      log::debug!("accumulator compacted, {} stale bytes dropped", decoded.compacted);
    }
    let format = self.format;
    self.accumulator.scan(
      format.frame_len(),
      FrameFormat::MARKER,
      FrameFormat::TRAILER,
      |payload| match format.decode_payload(payload) {
        Ok(row) => decoded.rows.push(row),
        Err(e) => {
          log::warn!("frame dropped: {}", e);
          decoded.rejected += 1;
        }
      },
    );
    decoded
  }

  /// Decoder worker main function:
  /// repeatedly take chunks from the hand-off queue, decode them and publish the rows.
  /// Return when cancelled or when the queue is completed and empty.
  pub(crate) fn run(mut self, queue: ChunkReceiver, cancel: CancelToken, samples: SampleBuffer, stats: Arc<LinkStats>) {
    log::debug!("frame decoder started, {} byte frames", self.format.frame_len());
    loop {
      match queue.take(&cancel) {
        Ok(chunk) => {
          let Decoded {
            rows,
            rejected,
            compacted,
          } = self.feed(&chunk);
          stats.on_decoded(rows.len());
          (0..rejected).for_each(|_| stats.on_rejected_frame());
          stats.on_compacted(compacted);
          samples.append(rows);
        }
        Err(QueueError::Cancelled) => break,
        Err(e) => {
          log::debug!("frame decoder input ended: {}", e);
          break;
        }
      }
    }
    log::debug!("frame decoder stopped, {} bytes left unframed", self.pending_bytes());
  }
}
