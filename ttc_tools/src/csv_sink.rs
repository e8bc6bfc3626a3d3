use std::{
  fs::{self, File, OpenOptions},
  io::{BufWriter, Result, Write},
  path::{Path, PathBuf},
};
use ttc_link::SampleBatch;

/// Row sink writing one line per frame, channel values joined by `,`.
/// Only sees rows the link has already decoded.
pub struct CsvSink {
  path: PathBuf,
  writer: BufWriter<File>,
  rows: u64,
}

impl CsvSink {
  /// Open `path` for appending, creating it and its parent directories as needed.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
      fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    log::debug!("csv sink opened at {:?}", path);
    Ok(Self {
      path,
      writer: BufWriter::new(file),
      rows: 0,
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// rows written since open
  pub fn rows_written(&self) -> u64 {
    self.rows
  }

  /// Write every row of `batch` in arrival order, then flush.
  pub fn write_batch(&mut self, batch: &SampleBatch) -> Result<usize> {
    let mut line = String::new();
    for row in batch.rows() {
      line.clear();
      for (i, value) in row.iter().enumerate() {
        if i > 0 {
          line.push(',');
        }
        line.push_str(&value.to_string());
      }
      line.push('\n');
      self.writer.write_all(line.as_bytes())?;
    }
    self.writer.flush()?;
    self.rows += batch.len() as u64;
    Ok(batch.len())
  }
}
