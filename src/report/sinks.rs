use super::result_line;
use crate::analyzer::FileReport;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Per-file feature log: one line of comma-separated bins per chunk
pub struct FeatureLog<W: Write> {
    writer: W,
    lines: usize,
}

impl<W: Write> FeatureLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    /// Append one chunk's features with six decimal places
    pub fn write_chunk(&mut self, values: &[f64]) -> io::Result<()> {
        for (i, v) in values.iter().enumerate() {
            if i > 0 {
                self.writer.write_all(b", ")?;
            }
            write!(self.writer, "{:.6}", v)?;
        }
        self.writer.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Flush and hand back the writer
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Corpus-wide result log. Append-only; never read back.
pub struct ResultLog<W: Write> {
    writer: W,
}

impl ResultLog<BufWriter<File>> {
    /// Open `path` for appending, creating it if needed
    pub fn append_to<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> ResultLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one file's line and flush it through
    pub fn record(&mut self, report: &FileReport) -> io::Result<()> {
        writeln!(self.writer, "{}", result_line(report))?;
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
