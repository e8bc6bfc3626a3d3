use clap::{Parser, Subcommand};
use std::{
  io::{Error, ErrorKind, Result},
  net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener, UdpSocket},
};
use ttc_link::{common::DEFAULT_PORT, FrameFormat};
use ttc_tools::{
  cli_util::{head_prompt, note_prompt},
  FrameEmulator, Waveform,
};

/// Play the sensor front-end: stream telemetry frames over TCP or UDP
#[derive(Parser)]
struct Emulator {
  #[command(subcommand)]
  mode: Mode,

  #[arg(long, default_value_t = DEFAULT_PORT)]
  /// TCP listen port, or UDP destination port
  port: u16,

  #[arg(long, default_value_t = 1000.0)]
  /// frames per second
  rate_hz: f64,

  #[arg(long, default_value_t = 6)]
  /// channels per frame
  channels: usize,

  #[arg(long)]
  /// insert garbage bytes before every n-th frame
  garbage_every: Option<usize>,

  #[arg(long)]
  /// random codes instead of sines
  random: bool,

  #[arg(long)]
  /// stop after this many frames
  frames: Option<u64>,
}

#[derive(Subcommand, Clone)]
enum Mode {
  /// Serve frames to one TCP client at a time
  TcpServer {
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    /// listen address
    bind: Ipv4Addr,
  },
  /// Send frames as UDP datagrams
  Udp {
    /// destination IPv4 address
    target: Ipv4Addr,
  },
}

fn main() -> Result<()> {
  env_logger::init();
  let opts = Emulator::parse();
  if !(opts.rate_hz.is_finite() && opts.rate_hz > 0.0) {
    return Err(Error::new(
      ErrorKind::InvalidInput,
      format!("--rate-hz must be positive, got {}", opts.rate_hz),
    ));
  }
  let format = FrameFormat::with_channels(opts.channels).map_err(|e| Error::new(ErrorKind::InvalidInput, e))?;

  let mut emulator = FrameEmulator::new(format).with_waveform(if opts.random {
    Waveform::Random
  } else {
    Waveform::Sine
  });
  if let Some(n) = opts.garbage_every {
    emulator = emulator.with_garbage_every(n);
  }

  match opts.mode {
    Mode::TcpServer { bind } => {
      let listener = TcpListener::bind(SocketAddrV4::new(bind, opts.port))?;
      println!("{} {:?}", head_prompt("listening on"), listener.local_addr()?);
      loop {
        let sent = emulator.serve_tcp(&listener, opts.rate_hz, opts.frames)?;
        println!("{} {} frames", note_prompt("client done,"), sent);
        if opts.frames.is_some() {
          break;
        }
      }
    }
    Mode::Udp { target } => {
      let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
      let target = SocketAddr::from((target, opts.port));
      println!("{} {}", head_prompt("sending to"), target);
      let sent = emulator.send_udp(&socket, target, opts.rate_hz, opts.frames)?;
      println!("{} {} frames", note_prompt("done,"), sent);
    }
  }
  Ok(())
}
