//! Reference word-lists and the roster table.
//!
//! The classifier only ever reads the cached [`ReferenceLists`]; the backing
//! [`ReferenceRepository`] is consulted at startup, on roster snapshots, and
//! when roster rows are written.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{Result, TrackerError};
use super::model::{RosterEntry, RosterUpdate};

/// External store of targets, items, tradeskills, taunts and the roster table.
pub trait ReferenceRepository {
    fn list_targets(&self) -> Result<Vec<String>>;
    fn list_items(&self) -> Result<Vec<String>>;
    fn list_tradeskills(&self) -> Result<Vec<String>>;
    fn list_roster_names(&self) -> Result<Vec<String>>;
    /// Re-read the roster table from its source and return the fresh names.
    fn refresh_roster_names(&mut self) -> Result<Vec<String>>;
    fn get_roster_row(&self, name: &str) -> Result<Option<RosterEntry>>;
    fn append_roster_row(&mut self, entry: RosterEntry) -> Result<()>;
    fn update_roster_row(&mut self, name: &str, fields: &RosterUpdate) -> Result<()>;
    /// The `"Skill (N) / Skill (M)"` summary stored for a character, if any.
    fn get_tradeskill_summary(&self, name: &str) -> Result<Option<String>>;
    fn get_trade_message(&self, skill: &str) -> Result<String>;
    fn get_death_taunt(&mut self) -> Result<String>;
    fn get_join_taunt(&mut self) -> Result<String>;
}

/// Substring lookup over a reference list.
///
/// Matching is plain containment in list order: the first entry that occurs
/// anywhere in the text wins, so an entry embedded in a longer one can shadow it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainmentMatcher {
    entries: Vec<String>,
}

impl ContainmentMatcher {
    pub fn new(entries: Vec<String>) -> Self {
        // Blank cells would match every line
        let entries = entries
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        Self { entries }
    }

    pub fn first_in(&self, text: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| text.contains(entry.as_str()))
            .map(String::as_str)
    }

    /// Exact membership, used for roster reconciliation.
    pub fn contains_exact(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Session-local copy of the reference lists.
#[derive(Debug, Clone, Default)]
pub struct ReferenceLists {
    pub targets: ContainmentMatcher,
    pub items: ContainmentMatcher,
    pub tradeskills: ContainmentMatcher,
    pub roster: ContainmentMatcher,
}

impl ReferenceLists {
    pub fn load(repo: &dyn ReferenceRepository) -> Result<Self> {
        Ok(Self {
            targets: ContainmentMatcher::new(repo.list_targets()?),
            items: ContainmentMatcher::new(repo.list_items()?),
            tradeskills: ContainmentMatcher::new(repo.list_tradeskills()?),
            roster: ContainmentMatcher::new(repo.list_roster_names()?),
        })
    }

    /// Re-fetch every list, re-reading the roster table from its source.
    pub fn refresh(&mut self, repo: &mut dyn ReferenceRepository) -> Result<()> {
        let roster = repo.refresh_roster_names()?;
        *self = Self {
            targets: ContainmentMatcher::new(repo.list_targets()?),
            items: ContainmentMatcher::new(repo.list_items()?),
            tradeskills: ContainmentMatcher::new(repo.list_tradeskills()?),
            roster: ContainmentMatcher::new(roster),
        };
        Ok(())
    }

    pub fn refresh_roster(&mut self, repo: &dyn ReferenceRepository) -> Result<()> {
        self.roster = ContainmentMatcher::new(repo.list_roster_names()?);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeskillInfo {
    pub name: String,
    /// Appended to milestone announcements
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Taunts {
    #[serde(default)]
    pub death: Vec<String>,
    #[serde(default)]
    pub join: Vec<String>,
}

/// On-disk layout of the reference store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub tradeskills: Vec<TradeskillInfo>,
    #[serde(default)]
    pub roster: Vec<RosterEntry>,
    #[serde(default)]
    pub taunts: Taunts,
}

/// Reference store backed by a single JSON document.
///
/// Roster writes are persisted immediately when the store has a path.
pub struct JsonReferenceStore {
    path: Option<PathBuf>,
    data: ReferenceData,
    death_cursor: usize,
    join_cursor: usize,
}

impl JsonReferenceStore {
    /// Load the store from disk; a missing file yields an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = Self::read_data(&path)?;
        Ok(Self {
            path: Some(path),
            data,
            death_cursor: 0,
            join_cursor: 0,
        })
    }

    pub fn in_memory(data: ReferenceData) -> Self {
        Self {
            path: None,
            data,
            death_cursor: 0,
            join_cursor: 0,
        }
    }

    pub fn data(&self) -> &ReferenceData {
        &self.data
    }

    fn read_data(path: &Path) -> Result<ReferenceData> {
        if !path.exists() {
            log::warn!("Reference store {:?} not found, starting empty", path);
            return Ok(ReferenceData::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self) -> Result<()> {
        let path = match &self.path {
            Some(p) => p,
            None => return Ok(()), // Nothing to save
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.data)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn roster_names(&self) -> Vec<String> {
        self.data.roster.iter().map(|r| r.name.clone()).collect()
    }

    fn next_taunt(list: &[String], cursor: &mut usize) -> String {
        if list.is_empty() {
            return String::new();
        }
        let taunt = list[*cursor % list.len()].clone();
        *cursor = (*cursor + 1) % list.len();
        taunt
    }
}

impl ReferenceRepository for JsonReferenceStore {
    fn list_targets(&self) -> Result<Vec<String>> {
        Ok(self.data.targets.clone())
    }

    fn list_items(&self) -> Result<Vec<String>> {
        Ok(self.data.items.clone())
    }

    fn list_tradeskills(&self) -> Result<Vec<String>> {
        Ok(self.data.tradeskills.iter().map(|t| t.name.clone()).collect())
    }

    fn list_roster_names(&self) -> Result<Vec<String>> {
        Ok(self.roster_names())
    }

    fn refresh_roster_names(&mut self) -> Result<Vec<String>> {
        if let Some(path) = &self.path {
            self.data = Self::read_data(path)?;
        }
        Ok(self.roster_names())
    }

    fn get_roster_row(&self, name: &str) -> Result<Option<RosterEntry>> {
        Ok(self.data.roster.iter().find(|r| r.name == name).cloned())
    }

    fn append_roster_row(&mut self, entry: RosterEntry) -> Result<()> {
        if self.data.roster.iter().any(|r| r.name == entry.name) {
            return Err(TrackerError::Reference(format!(
                "roster already has a row for {}",
                entry.name
            )));
        }
        self.data.roster.push(entry);
        self.save()
    }

    fn update_roster_row(&mut self, name: &str, fields: &RosterUpdate) -> Result<()> {
        let row = self
            .data
            .roster
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| TrackerError::Reference(format!("no roster row for {}", name)))?;
        row.apply(fields);
        self.save()
    }

    fn get_tradeskill_summary(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .data
            .roster
            .iter()
            .find(|r| r.name == name)
            .and_then(|r| r.tradeskills.clone())
            .filter(|s| !s.trim().is_empty()))
    }

    fn get_trade_message(&self, skill: &str) -> Result<String> {
        Ok(self
            .data
            .tradeskills
            .iter()
            .find(|t| t.name == skill)
            .map(|t| t.message.clone())
            .unwrap_or_default())
    }

    fn get_death_taunt(&mut self) -> Result<String> {
        Ok(Self::next_taunt(&self.data.taunts.death, &mut self.death_cursor))
    }

    fn get_join_taunt(&mut self) -> Result<String> {
        Ok(Self::next_taunt(&self.data.taunts.join, &mut self.join_cursor))
    }
}
