use super::model::CharacterName;

/// Tradeskill levels for the tracked character.
///
/// The book starts empty and is hydrated once from the stored roster summary
/// the first time a tracked skill-up needs it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeskillBook {
    skills: Vec<(String, u32)>,
    hydrated: bool,
}

impl TradeskillBook {
    /// Parse `"Baking (12) / Brewing (30)"`; malformed segments are skipped.
    pub fn parse_summary(summary: &str) -> Self {
        let mut book = Self::default();
        for segment in summary.split(" / ") {
            let segment = segment.trim();
            let Some((name, level)) = segment.rsplit_once(' ') else {
                continue;
            };
            let level = level.trim_start_matches('(').trim_end_matches(')');
            if let Ok(level) = level.parse::<u32>() {
                book.set(name.trim(), level);
            }
        }
        book
    }

    pub fn summary(&self) -> String {
        self.skills
            .iter()
            .map(|(name, level)| format!("{} ({})", name, level))
            .collect::<Vec<_>>()
            .join(" / ")
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// One-time load from an external summary. `None` leaves the book empty.
    pub fn hydrate(&mut self, summary: Option<&str>) {
        if self.hydrated {
            return;
        }
        if let Some(summary) = summary {
            let parsed = Self::parse_summary(summary);
            for (name, level) in parsed.skills {
                if self.get(&name).is_none() {
                    self.skills.push((name, level));
                }
            }
        }
        self.hydrated = true;
    }

    pub fn set(&mut self, skill: &str, level: u32) {
        match self.skills.iter_mut().find(|(name, _)| name == skill) {
            Some(entry) => entry.1 = level,
            None => self.skills.push((skill.to_string(), level)),
        }
    }

    pub fn get(&self, skill: &str) -> Option<u32> {
        self.skills
            .iter()
            .find(|(name, _)| name == skill)
            .map(|(_, level)| *level)
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

/// Mutable state of the character whose log is being parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterState {
    pub name: CharacterName,
    pub zone: String,
    pub level: u32,
    pub pet: Option<String>,
    pub tradeskills: TradeskillBook,
}

impl CharacterState {
    pub fn new(name: impl Into<CharacterName>) -> Self {
        Self {
            name: name.into(),
            zone: "Unknown".to_string(),
            level: 1,
            pet: None,
            tradeskills: TradeskillBook::default(),
        }
    }

    /// Summary to attach to the character's roster row, if any skills are known.
    pub fn tradeskill_summary(&self) -> Option<String> {
        if self.tradeskills.is_empty() {
            None
        } else {
            Some(self.tradeskills.summary())
        }
    }
}
