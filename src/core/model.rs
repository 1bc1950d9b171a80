use serde::{Deserialize, Serialize};

pub type CharacterName = String;

/// Width of the `[Sun Jan 01 00:00:00 2023] ` stamp every log line starts with.
pub const TIMESTAMP_PREFIX_LEN: usize = 27;

/// A raw log line with its timestamp stamp split off.
#[derive(Clone, Debug, PartialEq)]
pub struct LogLine<'a> {
    pub payload: &'a str,
}

impl<'a> LogLine<'a> {
    /// Returns `None` for lines too short to carry a payload.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let trimmed = raw.trim_end_matches(&['\r', '\n'][..]);
        let (offset, _) = trimmed.char_indices().nth(TIMESTAMP_PREFIX_LEN)?;
        Some(Self {
            payload: &trimmed[offset..],
        })
    }
}

/// Typed events emitted by the classifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    SelfDeath { killer: String },
    LevelUp { character: CharacterName, level: u32 },
    Kill { actor: CharacterName, target: String },
    Loot { actor: CharacterName, item: String },
    Trade { skill: String, level: u32 },
    RosterNew { name: CharacterName },
    RosterUpdate { name: CharacterName },
}

/// One row of the guild roster table, keyed by `name`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: CharacterName,
    pub class: String,
    pub level: u32,
    pub zone: String,
    pub join_date: String,
    #[serde(default)]
    pub tradeskills: Option<String>,
}

/// Fields overwritten on an existing roster row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterUpdate {
    pub class: String,
    pub level: u32,
    pub zone: String,
    /// Left untouched when `None`
    pub tradeskills: Option<String>,
}

impl From<&RosterEntry> for RosterUpdate {
    fn from(entry: &RosterEntry) -> Self {
        Self {
            class: entry.class.clone(),
            level: entry.level,
            zone: entry.zone.clone(),
            tradeskills: entry.tradeskills.clone(),
        }
    }
}

impl RosterEntry {
    pub fn apply(&mut self, update: &RosterUpdate) {
        self.class = update.class.clone();
        self.level = update.level;
        self.zone = update.zone.clone();
        if let Some(tradeskills) = &update.tradeskills {
            self.tradeskills = Some(tradeskills.clone());
        }
    }
}
