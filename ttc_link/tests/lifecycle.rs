mod common;

use common::*;
use std::{
  net::{Ipv4Addr, UdpSocket},
  sync::{Arc, Barrier},
  thread,
  time::Duration,
};
use ttc_link::{FrameFormat, LinkConfig, LinkError, LinkPhase, TeardownOutcome, UdpConfig, UdpLink};

const JOIN: Duration = Duration::from_secs(2);

fn link() -> UdpLink {
  UdpLink::new(UdpConfig::new().with_port(0)).unwrap()
}

#[test]
fn phases() {
  let link = link();
  assert_eq!(link.phase(), LinkPhase::Idle);
  assert!(link.local_addr().is_none());
  link.start().unwrap();
  assert_eq!(link.phase(), LinkPhase::Running);
  assert!(link.local_addr().is_some());
  link.disconnect(true, JOIN);
  assert_eq!(link.phase(), LinkPhase::Stopped);
  assert!(link.local_addr().is_none());
}

#[test]
fn disconnect_before_start() {
  let link = link();
  assert_eq!(link.disconnect(true, JOIN), TeardownOutcome::AlreadyStopped);
  assert_eq!(link.phase(), LinkPhase::Idle);
  assert!(link.drain().is_none());
}

#[test]
fn start_twice_is_rejected() {
  let link = link();
  link.start().unwrap();
  assert!(matches!(link.start(), Err(LinkError::AlreadyRunning)));
  assert_eq!(link.phase(), LinkPhase::Running);
}

#[test]
fn double_disconnect() {
  let link = link();
  link.start().unwrap();
  assert_eq!(link.disconnect(true, JOIN), TeardownOutcome::Joined);
  assert_eq!(link.disconnect(true, JOIN), TeardownOutcome::AlreadyStopped);
  assert_eq!(link.disconnect(false, JOIN), TeardownOutcome::AlreadyStopped);
  assert_eq!(link.phase(), LinkPhase::Stopped);
}

#[test]
fn concurrent_disconnect_tears_down_once() {
  const CALLERS: usize = 8;
  let link = Arc::new(link());
  link.start().unwrap();
  let barrier = Arc::new(Barrier::new(CALLERS));
  let outcomes: Vec<TeardownOutcome> = (0..CALLERS)
    .map(|i| {
      let (link, barrier) = (link.clone(), barrier.clone());
      thread::spawn(move || {
        barrier.wait();
        link.disconnect(i % 2 == 0, JOIN)
      })
    })
    .collect::<Vec<_>>()
    .into_iter()
    .map(|h| h.join().unwrap())
    .collect();

  let joined = outcomes.iter().filter(|&&o| o == TeardownOutcome::Joined).count();
  let skipped = outcomes
    .iter()
    .filter(|&&o| o == TeardownOutcome::AlreadyStopped)
    .count();
  assert_eq!((joined, skipped), (1, CALLERS - 1));
  assert_eq!(link.phase(), LinkPhase::Stopped);
}

#[test]
fn restart_after_stop() {
  let link = link();
  let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
  let format = FrameFormat::default();
  for round in 0..3i16 {
    link.start().unwrap();
    let port = link.local_addr().unwrap().port();
    let frame = format.encode(&[round; 6]).unwrap();
    sender.send_to(&frame, (Ipv4Addr::LOCALHOST, port)).unwrap();
    let rows = collect_rows(&link, 1, WAIT);
    assert_eq!(rows.len(), 1, "round {}", round);
    // counters start over with each run
    assert_eq!(link.stats().frames_decoded, 1);
    assert_eq!(link.disconnect(true, JOIN), TeardownOutcome::Joined);
  }
}

#[test]
fn rows_survive_disconnect() {
  let link = link();
  link.start().unwrap();
  let port = link.local_addr().unwrap().port();
  let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
  let (frames, expected) = numbered_frames(FrameFormat::default(), 4);
  sender.send_to(&frames, (Ipv4Addr::LOCALHOST, port)).unwrap();
  assert!(wait_until(WAIT, || link.stats().frames_decoded == 4));

  link.disconnect(true, JOIN);
  let batch = link.drain().unwrap();
  assert_eq!(batch.rows().collect::<Vec<_>>(), expected);
  assert!(link.drain().is_none());
}

#[test]
fn invalid_frame_length() {
  assert!(matches!(
    LinkConfig::default().with_frame_len(7),
    Err(LinkError::InvalidFrameLength(7))
  ));
  assert!(matches!(
    LinkConfig::default().with_frame_len(2),
    Err(LinkError::InvalidFrameLength(2))
  ));
}

#[test]
fn invalid_queue_capacity() {
  let link_config = LinkConfig {
    queue_capacity: 0,
    ..LinkConfig::default()
  };
  assert!(matches!(
    UdpLink::new(UdpConfig::new().with_link(link_config)),
    Err(LinkError::Config(_))
  ));
}

#[test]
fn drop_while_running() {
  let link = link();
  link.start().unwrap();
  drop(link);
}
