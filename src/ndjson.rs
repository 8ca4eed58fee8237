//! Line-delimited JSON I/O shared by the collection files, dump imports and the stream.

use crate::util::{append_with_backoff, create_with_backoff, open_with_backoff, replace_file_atomic};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const MIN_BUF: usize = 8 * 1024;

/// Buffered line reader over any byte source: a collection file, a zstd decoder or an
/// HTTP response body.
pub struct NdjsonReader<R: Read> {
    inner: BufReader<R>,
}

impl NdjsonReader<File> {
    pub fn open(path: &Path, buf_bytes: usize) -> io::Result<Self> {
        open_with_backoff(path).map(|f| Self::new(f, buf_bytes))
    }
}

impl<R: Read> NdjsonReader<R> {
    pub fn new(source: R, buf_bytes: usize) -> Self {
        Self { inner: BufReader::with_capacity(buf_bytes.max(MIN_BUF), source) }
    }

    /// Next line into `line`, line terminator stripped. Returns bytes consumed; 0 at EOF.
    pub fn read_line(&mut self, line: &mut String) -> io::Result<usize> {
        line.clear();
        let consumed = self.inner.read_line(line)?;
        let kept = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(kept);
        Ok(consumed)
    }

    /// Feed every non-blank line to `on_line`, stopping at the first error.
    pub fn for_each_line(&mut self, mut on_line: impl FnMut(&str) -> Result<()>) -> Result<()> {
        let mut line = String::with_capacity(16 * 1024);
        loop {
            if self.read_line(&mut line)? == 0 {
                return Ok(());
            }
            if !line.trim().is_empty() {
                on_line(&line)?;
            }
        }
    }
}

/// Buffered writer producing one JSON document per line.
pub struct NdjsonWriter {
    path: PathBuf,
    out: Option<BufWriter<File>>,
    lines: u64,
}

impl NdjsonWriter {
    fn with_file(path: &Path, file: File, buf_bytes: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            out: Some(BufWriter::with_capacity(buf_bytes.max(MIN_BUF), file)),
            lines: 0,
        }
    }

    /// Truncate-or-create `path`.
    pub fn create(path: &Path, buf_bytes: usize) -> io::Result<Self> {
        Ok(Self::with_file(path, create_with_backoff(path)?, buf_bytes))
    }

    /// Append to `path`, creating it when missing.
    pub fn append(path: &Path, buf_bytes: usize) -> io::Result<Self> {
        Ok(Self::with_file(path, append_with_backoff(path)?, buf_bytes))
    }

    /// Write `raw` as-is followed by a newline.
    pub fn write_line(&mut self, raw: &str) -> io::Result<()> {
        if let Some(out) = self.out.as_mut() {
            out.write_all(raw.as_bytes())?;
            out.write_all(b"\n")?;
            self.lines += 1;
        }
        Ok(())
    }

    pub fn write_json<T: Serialize>(&mut self, value: &T) -> Result<()> {
        if let Some(out) = self.out.as_mut() {
            serde_json::to_writer(&mut *out, value)
                .with_context(|| format!("serialize into {}", self.path.display()))?;
            out.write_all(b"\n")?;
            self.lines += 1;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match self.out.as_mut() {
            Some(out) => out.flush(),
            None => Ok(()),
        }
    }

    /// Lines written through this writer.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn finish(mut self) -> io::Result<()> {
        self.flush()?;
        self.out = None;
        Ok(())
    }

    /// Flush, then move this (temp) file over `final_path`.
    pub fn finish_atomic(mut self, final_path: &Path) -> Result<()> {
        self.flush().with_context(|| format!("flush {}", self.path.display()))?;
        // close the handle before the rename
        self.out = None;
        replace_file_atomic(&self.path, final_path)
    }
}
