use std::collections::VecDeque;

/// Not-yet-framed bytes plus the position up to which they have been scanned.
///
/// Every byte before the cursor was either part of a consumed frame or
/// was tested as a frame start with the whole candidate frame present and rejected,
/// so it can never be the head of a future frame.
/// Those bytes are only dropped once the buffer grows past the ceiling.
pub struct ByteAccumulator {
  bytes: VecDeque<u8>,
  cursor: usize,
  ceiling: usize,
}

impl ByteAccumulator {
  pub fn new(ceiling: usize) -> Self {
    Self {
      bytes: VecDeque::new(),
      cursor: 0,
      ceiling,
    }
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  pub fn cursor(&self) -> usize {
    self.cursor
  }

  /// Append a chunk, compacting if the ceiling is exceeded.
  /// Return the number of scanned bytes discarded by compaction.
  pub fn extend(&mut self, chunk: &[u8]) -> usize {
    self.bytes.extend(chunk);
    if self.bytes.len() > self.ceiling {
      self.compact()
    } else {
      0
    }
  }

  /// drop the scanned prefix, the cursor moves to 0
  fn compact(&mut self) -> usize {
    let stale = self.cursor.min(self.bytes.len());
    self.bytes.drain(..stale);
    self.cursor = 0;
    stale
  }

  /// Greedy forward scan for `marker .. trailer` frames of `frame_len` bytes,
  /// starting at the cursor.
  ///
  /// A match hands the bytes between marker and trailer to `on_payload` and skips the whole frame,
  /// a miss slides one byte. The cursor stops at the first position where a full frame
  /// no longer fits, so a frame split across chunks is found once its tail arrives.
  /// Return the number of frames found.
  pub fn scan<F>(&mut self, frame_len: usize, marker: u8, trailer: u8, mut on_payload: F) -> usize
  where
    F: FnMut(&[u8]),
  {
    let bytes = self.bytes.make_contiguous();
    let mut i = self.cursor;
    let mut found = 0;
    while i + frame_len <= bytes.len() {
      if bytes[i] == marker && bytes[i + frame_len - 1] == trailer {
        on_payload(&bytes[i + 1..i + frame_len - 1]);
        found += 1;
        i += frame_len;
      } else {
        i += 1;
      }
    }
    self.cursor = i;
    found
  }
}

#[cfg(test)]
mod tests {
  use super::ByteAccumulator;

  const LEN: usize = 6;

  fn frame(a: u8, b: u8, c: u8, d: u8) -> Vec<u8> {
    vec![0xAA, a, b, c, d, 0xBB]
  }

  fn scan_all(acc: &mut ByteAccumulator) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    acc.scan(LEN, 0xAA, 0xBB, |p| out.push(p.to_vec()));
    out
  }

  #[test]
  fn back_to_back_frames() {
    let mut acc = ByteAccumulator::new(1024);
    let mut data = frame(1, 2, 3, 4);
    data.extend(frame(5, 6, 7, 8));
    acc.extend(&data);
    assert_eq!(scan_all(&mut acc), vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]]);
    assert_eq!(acc.cursor(), 12);
  }

  #[test]
  fn resync_after_noise() {
    let mut acc = ByteAccumulator::new(1024);
    acc.extend(&[0x00, 0xAA, 0x13, 0xBB, 0x42]);
    acc.extend(&frame(9, 9, 9, 9));
    assert_eq!(scan_all(&mut acc), vec![vec![9, 9, 9, 9]]);
  }

  #[test]
  fn split_frame_completes_later() {
    let mut acc = ByteAccumulator::new(1024);
    let data = frame(1, 2, 3, 4);
    acc.extend(&data[..4]);
    assert!(scan_all(&mut acc).is_empty());
    assert_eq!(acc.cursor(), 0);
    acc.extend(&data[4..]);
    assert_eq!(scan_all(&mut acc), vec![vec![1, 2, 3, 4]]);
  }

  #[test]
  fn cursor_stops_where_a_frame_no_longer_fits() {
    let mut acc = ByteAccumulator::new(1024);
    acc.extend(&[0u8; 10]);
    assert!(scan_all(&mut acc).is_empty());
    assert_eq!(acc.cursor(), 10 - LEN + 1);
  }

  #[test]
  fn compaction_keeps_unscanned_tail() {
    let mut acc = ByteAccumulator::new(16);
    acc.extend(&[0u8; 14]);
    scan_all(&mut acc);
    assert_eq!(acc.cursor(), 9);
    let data = frame(1, 2, 3, 4);
    // 14 + 3 > 16: the 9 scanned bytes go, the 5 unscanned and the frame head stay
    assert_eq!(acc.extend(&data[..3]), 9);
    assert_eq!(acc.cursor(), 0);
    assert_eq!(acc.len(), 8);
    acc.extend(&data[3..]);
    assert_eq!(scan_all(&mut acc), vec![vec![1, 2, 3, 4]]);
  }

  #[test]
  fn bounded_under_persistent_desync() {
    let mut acc = ByteAccumulator::new(64);
    for _ in 0..1000 {
      acc.extend(&[0x11; 7]);
      scan_all(&mut acc);
      assert!(acc.len() <= 64 + 7);
    }
  }
}
