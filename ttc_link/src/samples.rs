use crate::frame::SampleRow;
use parking_lot::Mutex;
use std::{mem, sync::Arc};

/// Decoded rows accumulated since the last drain.
/// Thread-safe wrapper: the decoder appends, the consumer drains.
#[derive(Clone, Debug, Default)]
pub struct SampleBuffer(Arc<Mutex<Vec<SampleRow>>>);

/// Channel-major view of a drained run of frames:
/// `channel(i)[k]` is channel `i` of the `k`-th frame, in arrival order.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBatch {
  channels: Vec<Vec<f64>>,
}

impl SampleBuffer {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append decoded rows in arrival order
  pub fn append(&self, rows: Vec<SampleRow>) {
    if rows.is_empty() {
      return;
    }
    self.0.lock().extend(rows);
  }

  /// number of rows waiting for the next drain
  pub fn len(&self) -> usize {
    self.0.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Hand over everything decoded since the previous drain.
  ///
  /// Return `None` while fewer than `min_rows` (at least one) rows are buffered,
  /// those rows stay for a later call.
  /// Otherwise the buffer is swapped for an empty one under the lock,
  /// so each row is delivered by exactly one drain.
  pub fn drain(&self, channels: usize, min_rows: usize) -> Option<SampleBatch> {
    let rows = {
      let mut rows = self.0.lock();
      if rows.len() < min_rows.max(1) {
        return None;
      }
      mem::take(&mut *rows)
    };
    Some(SampleBatch::from_rows(channels, rows))
  }
}

impl SampleBatch {
  /// transpose row-major samples into one sequence per channel
  pub fn from_rows(channels: usize, rows: Vec<SampleRow>) -> Self {
    let mut series: Vec<Vec<f64>> = (0..channels).map(|_| Vec::with_capacity(rows.len())).collect();
    for row in rows {
      series.iter_mut().zip(row).for_each(|(s, v)| s.push(v));
    }
    Self { channels: series }
  }

  pub fn channel_count(&self) -> usize {
    self.channels.len()
  }

  /// number of frames in the batch
  pub fn len(&self) -> usize {
    self.channels.first().map_or(0, |c| c.len())
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn channel(&self, index: usize) -> Option<&[f64]> {
    self.channels.get(index).map(|c| c.as_slice())
  }

  pub fn channels(&self) -> &[Vec<f64>] {
    &self.channels
  }

  /// Iterate the batch frame by frame, each item is one value per channel
  pub fn rows(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
    (0..self.len()).map(move |k| self.channels.iter().map(|c| c[k]).collect())
  }
}
