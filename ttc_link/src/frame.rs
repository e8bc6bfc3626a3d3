//! Wire frame layout and sample conversion.
//!
//! ```text
//! ┌────────┬──────────────────────────────────────┬─────────┐
//! │ 0xAA   │ C x i16 big-endian channel words     │ 0xBB    │
//! │ 1 byte │ 2*C bytes, C = (frame_len - 2) / 2   │ 1 byte  │
//! └────────┴──────────────────────────────────────┴─────────┘
//! ```
//!
//! There is no checksum: marker and trailer at the right distance are the only
//! evidence of alignment, so random bytes may occasionally pass as a frame.

use crate::{
  common::{CODE_SPAN, DEFAULT_FRAME_LEN, FRAME_MARKER, FRAME_TRAILER, FULL_SCALE_VOLTS},
  error::{FrameError, LinkError},
};

/// One physical-unit value per channel, decoded from a single frame
pub type SampleRow = Vec<f64>;

/// bytes per channel word
pub const WORD_BYTES: usize = 2;

/// Convert a raw ADC code to volts: [-32768, 32767] maps onto [-5.0, +5.0).
pub fn code_to_volts(code: i16) -> f64 {
  (code as f64 * FULL_SCALE_VOLTS) / CODE_SPAN
}

/// Fixed frame layout of one deployment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameFormat {
  frame_len: usize,
}

impl FrameFormat {
  pub const MARKER: u8 = FRAME_MARKER;
  pub const TRAILER: u8 = FRAME_TRAILER;

  /// A frame must hold marker, trailer and at least one whole channel word.
  pub fn new(frame_len: usize) -> Result<Self, LinkError> {
    if frame_len < 2 + WORD_BYTES || frame_len % WORD_BYTES != 0 {
      return Err(LinkError::InvalidFrameLength(frame_len));
    }
    Ok(Self { frame_len })
  }

  /// Frame layout carrying `channels` channel words
  pub fn with_channels(channels: usize) -> Result<Self, LinkError> {
    Self::new(channels * WORD_BYTES + 2)
  }

  pub fn frame_len(&self) -> usize {
    self.frame_len
  }

  pub fn payload_len(&self) -> usize {
    self.frame_len - 2
  }

  pub fn channels(&self) -> usize {
    self.payload_len() / WORD_BYTES
  }

  /// Decode the bytes between marker and trailer into a row of volts.
  pub fn decode_payload(&self, payload: &[u8]) -> Result<SampleRow, FrameError> {
    if payload.len() != self.payload_len() {
      return Err(FrameError::PayloadLength {
        expected: self.payload_len(),
        actual: payload.len(),
      });
    }
    Ok(
      payload
        .chunks_exact(WORD_BYTES)
        .map(|word| code_to_volts(i16::from_be_bytes([word[0], word[1]])))
        .collect(),
    )
  }

  /// Build a complete frame from raw channel codes.
  pub fn encode(&self, codes: &[i16]) -> Result<Vec<u8>, FrameError> {
    if codes.len() != self.channels() {
      return Err(FrameError::ChannelCount {
        expected: self.channels(),
        actual: codes.len(),
      });
    }
    let mut frame = Vec::with_capacity(self.frame_len);
    frame.push(Self::MARKER);
    codes.iter().for_each(|code| frame.extend_from_slice(&code.to_be_bytes()));
    frame.push(Self::TRAILER);
    Ok(frame)
  }
}

impl Default for FrameFormat {
  fn default() -> Self {
    Self {
      frame_len: DEFAULT_FRAME_LEN,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn conversion_boundaries() {
    assert_eq!(code_to_volts(0x0000), 0.0);
    assert_eq!(code_to_volts(i16::MIN), -5.0);
    let top = code_to_volts(i16::MAX);
    assert!(top < 5.0);
    assert!(5.0 - top < 2e-4);
    assert_eq!(code_to_volts(i16::from_be_bytes([0x80, 0x00])), -5.0);
    assert_eq!(code_to_volts(16384), 2.5);
  }

  #[test]
  fn default_layout() {
    let format = FrameFormat::default();
    assert_eq!(format.frame_len(), 14);
    assert_eq!(format.payload_len(), 12);
    assert_eq!(format.channels(), 6);
  }

  #[test]
  fn reject_bad_lengths() {
    assert!(FrameFormat::new(3).is_err());
    assert!(FrameFormat::new(15).is_err());
    assert!(FrameFormat::new(2).is_err());
    assert_eq!(FrameFormat::new(4).unwrap().channels(), 1);
    assert_eq!(FrameFormat::with_channels(8).unwrap().frame_len(), 18);
  }

  #[test]
  fn encode_layout() {
    let format = FrameFormat::with_channels(2).unwrap();
    let frame = format.encode(&[0x1234, -1]).unwrap();
    assert_eq!(frame, vec![0xAA, 0x12, 0x34, 0xFF, 0xFF, 0xBB]);
    assert_eq!(
      format.encode(&[1]),
      Err(FrameError::ChannelCount { expected: 2, actual: 1 })
    );
  }

  #[test]
  fn decode_big_endian_signed() {
    let format = FrameFormat::with_channels(3).unwrap();
    let row = format.decode_payload(&[0x00, 0x00, 0x7F, 0xFF, 0x80, 0x00]).unwrap();
    assert_eq!(row.len(), 3);
    assert_eq!(row[0], 0.0);
    assert_eq!(row[1], code_to_volts(i16::MAX));
    assert_eq!(row[2], -5.0);
    assert_eq!(
      format.decode_payload(&[0x00; 4]),
      Err(FrameError::PayloadLength { expected: 6, actual: 4 })
    );
  }
}
