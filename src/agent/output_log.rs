use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::error::LoggerError;
use crate::transport::Payload;

pub const DEFAULT_OUTPUT_PATH: &str = "data.csv";

/// Append-only CSV file holding one received payload per line.
#[derive(Debug, Clone)]
pub struct OutputLog {
    path: PathBuf,
}

impl OutputLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `payload` as a single-field record and return the number of
    /// bytes written. The file handle is opened for this call only and is
    /// released on return, whether or not the write succeeded.
    pub fn append(&self, payload: &Payload) -> Result<usize, LoggerError> {
        let line = encode_record(payload).map_err(|source| self.persistence(source))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.persistence(e.into()))?;

        file.write_all(&line)
            .and_then(|()| file.flush())
            .map_err(|e| self.persistence(e.into()))?;
        Ok(line.len())
    }

    fn persistence(&self, source: csv::Error) -> LoggerError {
        LoggerError::Persistence {
            path: self.path.clone(),
            source,
        }
    }
}

/// Serialize one payload as a headerless CSV line terminated by `\n`.
fn encode_record(payload: &Payload) -> Result<Vec<u8>, csv::Error> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(payload.len() + 1));
    writer.write_record([payload.as_bytes()])?;
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
