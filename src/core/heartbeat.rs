use std::time::{Duration, Instant};

/// Raised when the log has been silent for longer than the threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct StallWarning {
    pub character: String,
    pub threshold_minutes: f64,
}

impl StallWarning {
    pub fn message(&self) -> String {
        format!(
            "Heartbeat Warning: Tracker [{}] logfile has had no new entries in last {} minutes. Is {} still online?",
            self.character, self.threshold_minutes, self.character
        )
    }
}

/// Stall detector driven by the polling loop.
pub struct HeartbeatMonitor {
    character: String,
    last_activity: Instant,
    threshold: Duration,
}

impl HeartbeatMonitor {
    pub fn new(character: impl Into<String>, threshold: Duration, now: Instant) -> Self {
        Self {
            character: character.into(),
            last_activity: now,
            threshold,
        }
    }

    /// A line was read.
    pub fn record_activity(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// Called on every idle poll. Fires at most once per threshold interval.
    pub fn check(&mut self, now: Instant) -> Option<StallWarning> {
        let idle = now.saturating_duration_since(self.last_activity);
        if idle <= self.threshold {
            return None;
        }
        self.last_activity = now;
        Some(StallWarning {
            character: self.character.clone(),
            threshold_minutes: self.threshold.as_secs_f64() / 60.0,
        })
    }
}
