use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{
  f64::consts::PI,
  io::{Error, ErrorKind, Result, Write},
  net::{SocketAddr, TcpListener, UdpSocket},
  thread,
  time::{Duration, Instant},
};
use ttc_link::{FrameError, FrameFormat};

/// Frames per UDP datagram, keeps datagrams around 1KB for 6 channels
const FRAMES_PER_DATAGRAM: usize = 64;

/// Sine period in frames
const SINE_PERIOD: f64 = 200.0;

/// Sine amplitude in ADC codes, about 3.7V
const SINE_AMPLITUDE: f64 = 24000.0;

/// Upper bound on garbage bytes inserted at once
const MAX_GARBAGE: usize = 7;

/// Channel codes carried by emulated frames
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
  /// phase shifted sines, channel `i` lags by `i * 60` degrees
  Sine,
  /// uniformly random codes
  Random,
}

/// Plays the sensor front-end: a paced stream of valid frames,
/// optionally interleaved with marker-free garbage to exercise resynchronization.
pub struct FrameEmulator {
  format: FrameFormat,
  waveform: Waveform,
  garbage_every: Option<usize>,
  tick: u64,
  rng: StdRng,
}

/// Keep `sent` on schedule for `rate_hz` frames per second
struct Pacer {
  rate_hz: f64,
  begin: Instant,
}

impl Pacer {
  /// a rate must be a positive, finite number of frames per second
  fn new(rate_hz: f64) -> Result<Self> {
    if !(rate_hz.is_finite() && rate_hz > 0.0) {
      return Err(Error::new(ErrorKind::InvalidInput, format!("invalid frame rate {rate_hz}")));
    }
    Ok(Self {
      rate_hz,
      begin: Instant::now(),
    })
  }

  /// frames which should have been sent by now
  fn due(&self) -> u64 {
    (self.begin.elapsed().as_secs_f64() * self.rate_hz) as u64
  }
}

impl FrameEmulator {
  pub fn new(format: FrameFormat) -> Self {
    Self {
      format,
      waveform: Waveform::Sine,
      garbage_every: None,
      tick: 0,
      rng: StdRng::from_entropy(),
    }
  }

  pub fn with_waveform(mut self, waveform: Waveform) -> Self {
    self.waveform = waveform;
    self
  }

  /// insert a short run of garbage before every `n`-th frame
  pub fn with_garbage_every(mut self, n: usize) -> Self {
    self.garbage_every = Some(n).filter(|&n| n > 0);
    self
  }

  /// make random codes and garbage reproducible
  pub fn with_seed(mut self, seed: u64) -> Self {
    self.rng = StdRng::seed_from_u64(seed);
    self
  }

  pub fn format(&self) -> FrameFormat {
    self.format
  }

  /// number of frames produced so far
  pub fn frames(&self) -> u64 {
    self.tick
  }

  /// Codes of the next frame, one per channel
  pub fn next_codes(&mut self) -> Vec<i16> {
    let tick = self.tick;
    self.tick += 1;
    match self.waveform {
      Waveform::Sine => (0..self.format.channels())
        .map(|ch| {
          let phase = 2.0 * PI * tick as f64 / SINE_PERIOD - ch as f64 * PI / 3.0;
          (SINE_AMPLITUDE * phase.sin()).round() as i16
        })
        .collect(),
      Waveform::Random => (0..self.format.channels()).map(|_| self.rng.gen()).collect(),
    }
  }

  /// Append the next frame, preceded by garbage when it is due, to `out`.
  /// Return the codes carried by the frame.
  pub fn push_frame(&mut self, out: &mut Vec<u8>) -> std::result::Result<Vec<i16>, FrameError> {
    if let Some(n) = self.garbage_every {
      if self.tick % n as u64 == n as u64 - 1 {
        let len = self.rng.gen_range(1..=MAX_GARBAGE);
        out.extend((0..len).map(|_| match self.rng.gen::<u8>() {
          FrameFormat::MARKER => 0,
          b => b,
        }));
      }
    }
    let codes = self.next_codes();
    out.extend(self.format.encode(&codes)?);
    Ok(codes)
  }

  /// `count` consecutive frames as one byte run
  pub fn burst(&mut self, count: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(count * self.format.frame_len());
    for _ in 0..count {
      self
        .push_frame(&mut out)
        .map_err(|e| Error::new(ErrorKind::InvalidData, e))?;
    }
    Ok(out)
  }

  /// Accept one connection on `listener` and stream frames at `rate_hz`
  /// until `limit` frames are sent or the peer goes away.
  /// Return the number of frames sent.
  pub fn serve_tcp(&mut self, listener: &TcpListener, rate_hz: f64, limit: Option<u64>) -> Result<u64> {
    let pacer = Pacer::new(rate_hz)?;
    let (mut stream, peer) = listener.accept()?;
    stream.set_nodelay(true)?;
    log::info!("emulator serving {}", peer);

    let mut sent = 0;
    while limit.map_or(true, |limit| sent < limit) {
      let due = limit.map_or(pacer.due(), |limit| pacer.due().min(limit));
      if due <= sent {
        thread::sleep(Duration::from_millis(1));
        continue;
      }
      let bytes = self.burst((due - sent) as usize)?;
      if let Err(e) = stream.write_all(&bytes) {
        log::info!("emulator peer {} gone: {}", peer, e);
        break;
      }
      sent = due;
    }
    Ok(sent)
  }

  /// Send frames as datagrams to `target` at `rate_hz` until `limit` frames are sent.
  /// Return the number of frames sent.
  pub fn send_udp(&mut self, socket: &UdpSocket, target: SocketAddr, rate_hz: f64, limit: Option<u64>) -> Result<u64> {
    let pacer = Pacer::new(rate_hz)?;
    log::info!("emulator sending to {}", target);
    let mut sent = 0;
    while limit.map_or(true, |limit| sent < limit) {
      let due = limit.map_or(pacer.due(), |limit| pacer.due().min(limit));
      if due <= sent {
        thread::sleep(Duration::from_millis(1));
        continue;
      }
      let count = ((due - sent) as usize).min(FRAMES_PER_DATAGRAM);
      socket.send_to(&self.burst(count)?, target)?;
      sent += count as u64;
    }
    Ok(sent)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::{
    io::Read,
    net::{Ipv4Addr, TcpStream},
  };
  use ttc_link::{code_to_volts, FrameDecoder};

  fn volts(codes: &[i16]) -> Vec<f64> {
    codes.iter().map(|&c| code_to_volts(c)).collect()
  }

  #[test]
  fn sine_stays_in_range() {
    let mut emulator = FrameEmulator::new(FrameFormat::default());
    for _ in 0..1000 {
      let codes = emulator.next_codes();
      assert_eq!(codes.len(), 6);
      assert!(codes.iter().all(|c| c.unsigned_abs() <= SINE_AMPLITUDE as u16));
    }
    assert_eq!(emulator.frames(), 1000);
  }

  #[test]
  fn garbage_is_skipped_by_the_decoder() {
    let format = FrameFormat::with_channels(4).unwrap();
    let mut emulator = FrameEmulator::new(format)
      .with_waveform(Waveform::Random)
      .with_garbage_every(3)
      .with_seed(7);
    let mut stream = Vec::new();
    let expected: Vec<_> = (0..300)
      .map(|_| volts(&emulator.push_frame(&mut stream).unwrap()))
      .collect();
    assert!(stream.len() > 300 * format.frame_len());

    let mut decoder = FrameDecoder::new(format, 1 << 16);
    let rows: Vec<_> = stream.chunks(17).flat_map(|c| decoder.feed(c).rows).collect();
    assert_eq!(rows, expected);
  }

  #[test]
  fn same_seed_same_stream() {
    let make = || {
      FrameEmulator::new(FrameFormat::default())
        .with_waveform(Waveform::Random)
        .with_garbage_every(2)
        .with_seed(42)
        .burst(50)
        .unwrap()
    };
    assert_eq!(make(), make());
  }

  #[test]
  fn tcp_server_sends_limit() {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
      FrameEmulator::new(FrameFormat::default())
        .serve_tcp(&listener, 5000.0, Some(100))
        .unwrap()
    });
    let mut client = TcpStream::connect(addr).unwrap();
    let mut bytes = Vec::new();
    client.read_to_end(&mut bytes).unwrap();
    assert_eq!(server.join().unwrap(), 100);
    assert_eq!(bytes.len(), 100 * 14);
  }

  #[test]
  fn udp_datagrams_carry_whole_frames() {
    let receiver = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    receiver.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let target = receiver.local_addr().unwrap();
    let sent = FrameEmulator::new(FrameFormat::default())
      .send_udp(&sender, target, 100_000.0, Some(10))
      .unwrap();
    assert_eq!(sent, 10);

    let mut total = 0;
    let mut buf = [0; 2048];
    while total < 10 * 14 {
      let (n, _) = receiver.recv_from(&mut buf).unwrap();
      assert_eq!(n % 14, 0);
      total += n;
    }
    assert_eq!(total, 140);
  }

  #[test]
  fn non_positive_rate_is_rejected() {
    let sender = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let target = sender.local_addr().unwrap();
    let mut emulator = FrameEmulator::new(FrameFormat::default());
    for rate in [0.0, -10.0, f64::NAN, f64::INFINITY] {
      let err = emulator.send_udp(&sender, target, rate, Some(1)).unwrap_err();
      assert_eq!(err.kind(), ErrorKind::InvalidInput, "rate {}", rate);
    }
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    // rejected before accept, so this returns without a client
    let err = emulator.serve_tcp(&listener, 0.0, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(emulator.frames(), 0);
  }
}
