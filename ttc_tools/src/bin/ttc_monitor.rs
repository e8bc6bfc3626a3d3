use clap::{Parser, Subcommand};
use std::{
  net::Ipv4Addr,
  path::PathBuf,
  thread,
  time::{Duration, Instant},
};
use ttc_link::{
  common::{DEFAULT_FRAME_LEN, DEFAULT_PORT},
  transport::Transport,
  Link, LinkConfig, Result, TcpConfig, TcpLink, UdpConfig, UdpLink,
};
use ttc_tools::{
  cli_util::{batch_summary, head_prompt, note_prompt, warn_prompt},
  CsvSink,
};

/// Wait for the workers this long when shutting down
const JOIN_TIMEOUT: Duration = Duration::from_secs(3);

/// Receive telemetry frames and print what every drain returns
#[derive(Parser)]
struct Monitor {
  #[command(subcommand)]
  transport: Via,

  #[arg(long, default_value_t = DEFAULT_PORT)]
  /// TCP port of the sensor bridge, or local UDP port
  port: u16,

  #[arg(long, default_value_t = DEFAULT_FRAME_LEN)]
  /// frame length in bytes, marker and trailer included
  frame_len: usize,

  #[arg(long, default_value_t = 50)]
  /// drain period in milliseconds
  interval_ms: u64,

  #[arg(long, default_value_t = 1)]
  /// drain reports nothing until this many rows are buffered
  min_rows: usize,

  #[arg(long)]
  /// append every drained row to this CSV file
  csv: Option<PathBuf>,

  #[arg(long)]
  /// stop after this many seconds, run until killed otherwise
  duration_secs: Option<u64>,
}

#[derive(Subcommand, Clone)]
enum Via {
  /// Connect to the sensor bridge over TCP
  Tcp {
    /// IPv4 address of the sensor bridge
    ip: Ipv4Addr,
  },
  /// Receive UDP datagrams
  Udp {
    #[arg(long)]
    /// only accept datagrams from this address
    source: Option<Ipv4Addr>,
  },
}

fn monitor<T: Transport>(link: Link<T>, opts: &Monitor) -> Result<()> {
  let mut sink = opts.csv.as_ref().map(CsvSink::open).transpose()?;
  let interval = Duration::from_millis(opts.interval_ms);
  let deadline = opts.duration_secs.map(|secs| Instant::now() + Duration::from_secs(secs));

  let mut last = Instant::now();
  while deadline.map_or(true, |deadline| Instant::now() < deadline) {
    thread::sleep(interval);
    match link.drain() {
      Some(batch) => {
        println!("{} {}", head_prompt("drain"), batch_summary(&batch, last.elapsed()));
        last = Instant::now();
        // stop writing after the first error, keep monitoring
        if let Some(Err(e)) = sink.as_mut().map(|sink| sink.write_batch(&batch)) {
          println!("{} {}", warn_prompt("csv write failed:"), e);
          sink = None;
        }
      }
      None if last.elapsed() > Duration::from_secs(1) => {
        println!("{}", note_prompt(format!("no data for {:.1}s", last.elapsed().as_secs_f64())));
      }
      None => {}
    }
  }

  let outcome = link.disconnect(true, JOIN_TIMEOUT);
  println!("{} {:?}, {}", head_prompt("stopped"), outcome, link.stats());
  if let Some(sink) = sink {
    println!("{} {} rows in {:?}", head_prompt("csv"), sink.rows_written(), sink.path());
  }
  Ok(())
}

fn main() -> Result<()> {
  env_logger::init();
  let opts = Monitor::parse();
  let link_config = LinkConfig::default()
    .with_frame_len(opts.frame_len)?
    .with_min_drain_rows(opts.min_rows);

  match opts.transport.clone() {
    Via::Tcp { ip } => {
      let config = TcpConfig::new(ip).with_port(opts.port).with_link(link_config);
      println!("{} tcp {}", head_prompt("connect"), config.peer);
      monitor(TcpLink::connect(config)?, &opts)
    }
    Via::Udp { source } => {
      let mut config = UdpConfig::new().with_port(opts.port).with_link(link_config);
      config.source_filter = source;
      println!("{} udp port {}", head_prompt("listen"), config.port);
      monitor(UdpLink::connect(config)?, &opts)
    }
  }
}
