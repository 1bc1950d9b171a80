use std::time::Instant;

use super::config::Settings;
use super::error::{Result, TrackerError};
use super::heartbeat::{HeartbeatMonitor, StallWarning};
use super::log_io::{LogReader, ReadOutcome};
use super::model::{Event, LogLine};
use super::reference::{ReferenceLists, ReferenceRepository};
use super::roster;
use super::state::CharacterState;
use super::triggers::{TriggerClassifier, TriggerContext};

/// Outcome of one poll of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A line was read; at most one event came out of it
    Line(Option<Event>),
    /// No new data; carries a stall warning when the heartbeat tripped
    Idle(Option<StallWarning>),
    /// The reader is closed and nothing was processed
    Closed,
}

/// One parsing session over a character log, from `open` to `close`.
pub struct ParserSession {
    reader: LogReader,
    seek_to_end: bool,
    state: CharacterState,
    heartbeat: HeartbeatMonitor,
    lists: ReferenceLists,
    repo: Box<dyn ReferenceRepository + Send>,
    classifier: TriggerClassifier,
    lines_read: u64,
}

impl ParserSession {
    /// Build a session and load the reference lists. The log is not opened yet.
    pub fn new(settings: &Settings, repo: Box<dyn ReferenceRepository + Send>) -> Result<Self> {
        let lists = ReferenceLists::load(repo.as_ref())?;
        let (path, seek_to_end) = settings.log_source();

        Ok(Self {
            reader: LogReader::new(path),
            seek_to_end,
            state: CharacterState::new(settings.character_name.clone()),
            heartbeat: HeartbeatMonitor::new(
                settings.character_name.clone(),
                settings.heartbeat_threshold(),
                Instant::now(),
            ),
            lists,
            repo,
            classifier: TriggerClassifier::new(settings.guild_tag.clone()),
            lines_read: 0,
        })
    }

    pub fn open(&mut self) -> Result<()> {
        self.reader.open(self.seek_to_end)?;
        self.heartbeat.record_activity(Instant::now());
        log::info!(
            "Now parsing character log for [{}]: {:?}",
            self.state.name,
            self.reader.path()
        );
        Ok(())
    }

    pub fn close(&mut self) {
        if self.reader.is_active() {
            log::info!("Parsing stopped after {} lines", self.lines_read);
        }
        self.reader.close();
    }

    pub fn is_active(&self) -> bool {
        self.reader.is_active()
    }

    /// Read at most one line and classify it.
    pub fn step(&mut self, now: Instant) -> Step {
        match self.reader.read_line() {
            Ok(ReadOutcome::Line(line)) => {
                self.heartbeat.record_activity(now);
                self.lines_read += 1;
                Step::Line(self.process_line(&line))
            }
            Ok(ReadOutcome::NoData) => Step::Idle(self.heartbeat.check(now)),
            Err(TrackerError::ReaderClosed) => Step::Closed,
            Err(e) => {
                log::warn!("Error reading {:?}: {}", self.reader.path(), e);
                Step::Idle(self.heartbeat.check(now))
            }
        }
    }

    /// Classify one raw line. Lines shorter than the timestamp are skipped.
    pub fn process_line(&mut self, raw: &str) -> Option<Event> {
        let line = LogLine::parse(raw)?;
        let join_date = roster::today();
        let mut ctx = TriggerContext {
            state: &mut self.state,
            lists: &mut self.lists,
            repo: self.repo.as_mut(),
            join_date: &join_date,
        };

        match self.classifier.classify(line.payload, &mut ctx) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Failed to handle line {:?}: {}", line.payload, e);
                None
            }
        }
    }

    pub fn state(&self) -> &CharacterState {
        &self.state
    }

    pub fn lists(&self) -> &ReferenceLists {
        &self.lists
    }

    pub fn repo_mut(&mut self) -> &mut dyn ReferenceRepository {
        self.repo.as_mut()
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}
