use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::error::{Result, TrackerError};

/// Lifecycle of a [`LogReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Closed,
    Opening,
    Active,
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Nothing new has been appended yet
    NoData,
}

/// Tails one log file, one complete line per call.
pub struct LogReader {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    position: u64,
    /// Bytes of a line whose newline has not been written yet
    pending: Vec<u8>,
    state: ReaderState,
}

impl LogReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            reader: None,
            position: 0,
            pending: Vec::new(),
            state: ReaderState::Closed,
        }
    }

    /// Open the file, starting at its end (live tail) or its start (replay).
    pub fn open(&mut self, seek_to_end: bool) -> Result<()> {
        self.close();
        self.state = ReaderState::Opening;

        let opened = File::open(&self.path).and_then(|mut file| {
            let position = if seek_to_end {
                file.seek(SeekFrom::End(0))?
            } else {
                file.seek(SeekFrom::Start(0))?
            };
            Ok((file, position))
        });

        match opened {
            Ok((file, position)) => {
                self.reader = Some(BufReader::new(file));
                self.position = position;
                self.state = ReaderState::Active;
                Ok(())
            }
            Err(source) => {
                self.state = ReaderState::Closed;
                Err(TrackerError::Open {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    /// Return the next complete line, or `NoData` without blocking.
    pub fn read_line(&mut self) -> Result<ReadOutcome> {
        if self.state != ReaderState::Active {
            return Err(TrackerError::ReaderClosed);
        }
        let reader = self.reader.as_mut().ok_or(TrackerError::ReaderClosed)?;

        let bytes_read = reader.read_until(b'\n', &mut self.pending)?;
        if bytes_read == 0 {
            return Ok(ReadOutcome::NoData);
        }
        self.position += bytes_read as u64;

        if self.pending.last() != Some(&b'\n') {
            // Writer is mid-line; hold the fragment until the rest arrives
            return Ok(ReadOutcome::NoData);
        }

        // Logs are not guaranteed UTF-8; stray bytes become U+FFFD
        let line = std::mem::take(&mut self.pending);
        Ok(ReadOutcome::Line(
            String::from_utf8_lossy(&line)
                .trim_end_matches(&['\r', '\n'][..])
                .to_string(),
        ))
    }

    pub fn close(&mut self) {
        self.reader = None;
        self.pending.clear();
        self.state = ReaderState::Closed;
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == ReaderState::Active
    }

    /// Byte offset of the next unread byte.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
