#![allow(dead_code)]

use std::{
  thread,
  time::{Duration, Instant},
};
use ttc_link::{code_to_volts, transport::Transport, FrameFormat, Link, SampleRow};

pub const WAIT: Duration = Duration::from_secs(5);

/// poll `drain` until `count` rows have been collected or `timeout` elapses
pub fn collect_rows<T: Transport>(link: &Link<T>, count: usize, timeout: Duration) -> Vec<SampleRow> {
  let deadline = Instant::now() + timeout;
  let mut rows = Vec::new();
  while rows.len() < count && Instant::now() < deadline {
    match link.drain() {
      Some(batch) => rows.extend(batch.rows()),
      None => thread::sleep(Duration::from_millis(5)),
    }
  }
  rows
}

/// poll `cond` until it holds or `timeout` elapses
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
  let deadline = Instant::now() + timeout;
  while Instant::now() < deadline {
    if cond() {
      return true;
    }
    thread::sleep(Duration::from_millis(5));
  }
  cond()
}

/// `count` frames where frame `k` carries code `k * 7 - channel` on each channel
pub fn numbered_frames(format: FrameFormat, count: usize) -> (Vec<u8>, Vec<SampleRow>) {
  let mut stream = Vec::new();
  let mut rows = Vec::new();
  for k in 0..count {
    let codes: Vec<i16> = (0..format.channels())
      .map(|ch| (k as i16).wrapping_mul(7).wrapping_sub(ch as i16))
      .collect();
    stream.extend(format.encode(&codes).unwrap());
    rows.push(codes.iter().map(|&c| code_to_volts(c)).collect());
  }
  (stream, rows)
}
