use console::{style, StyledObject};
use std::{fmt::Write, time::Duration};
use ttc_link::SampleBatch;

pub fn head_prompt<D>(prompt: D) -> StyledObject<D> {
  style(prompt).green().bold()
}
pub fn warn_prompt<D>(prompt: D) -> StyledObject<D> {
  style(prompt).red().bold()
}
pub fn note_prompt<D>(prompt: D) -> StyledObject<D> {
  style(prompt).yellow().dim()
}

/// One drain in a line: row count, last value of each channel, approximate frame rate.
pub fn batch_summary(batch: &SampleBatch, since_last: Duration) -> String {
  let mut line = format!("{:>6} rows", batch.len());
  for (idx, channel) in batch.channels().iter().enumerate() {
    if let Some(last) = channel.last() {
      let _ = write!(line, " ch{idx}={last:+.4}V");
    }
  }
  let secs = since_last.as_secs_f64();
  if secs > 0.0 {
    let _ = write!(line, " ~{:.2}kHz", batch.len() as f64 / secs / 1000.0);
  }
  line
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn summary_line() {
    let mut rows = vec![vec![0.0, 1.0]; 100];
    rows.push(vec![-2.5, 0.125]);
    let batch = SampleBatch::from_rows(2, rows);
    let line = batch_summary(&batch, Duration::from_millis(101));
    assert_eq!(line, "   101 rows ch0=-2.5000V ch1=+0.1250V ~1.00kHz");
  }

  #[test]
  fn summary_without_rate() {
    let batch = SampleBatch::from_rows(1, vec![vec![5.0]]);
    assert_eq!(batch_summary(&batch, Duration::ZERO), "     1 rows ch0=+5.0000V");
  }
}
