//! Per-source file of rejected lines.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Suffix appended to the source name.
pub const BAD_SUFFIX: &str = ".BAD";

/// Appends raw lines that failed to parse to `<dir>/<source>.BAD`.
pub struct BadRowSink {
    path: PathBuf,
    writer: BufWriter<File>,
    lines: u64,
}

impl BadRowSink {
    /// Create (or truncate) the sink for `source` inside `dir`.
    ///
    /// # Errors
    /// Returns the error from creating the file.
    pub fn create(dir: impl AsRef<Path>, source: &str) -> io::Result<Self> {
        let path = Self::path_for(dir, source);
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    pub fn path_for(dir: impl AsRef<Path>, source: &str) -> PathBuf {
        dir.as_ref().join(format!("{source}{BAD_SUFFIX}"))
    }

    /// Append one line verbatim, in whatever encoding it arrived.
    ///
    /// # Errors
    /// Returns the write error.
    pub fn append(&mut self, line: &[u8]) -> io::Result<()> {
        self.writer.write_all(line)?;
        self.writer.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Flush and close.
    ///
    /// # Errors
    /// Returns the flush error.
    pub fn close(mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
