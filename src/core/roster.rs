//! Guild roster maintenance from `/who` output.
//!
//! A guild-tagged who line looks like
//! `[60 Ranger] Zaela (Wood Elf) <Legacy of Ik> ZONE: kael`.

use chrono::{DateTime, Utc};
use chrono_tz::US::Central;

use super::error::Result;
use super::model::{Event, RosterEntry, RosterUpdate};
use super::reference::{ReferenceLists, ReferenceRepository};
use super::state::CharacterState;

/// Fields read straight off a who line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoEntry {
    pub name: String,
    pub class: String,
    pub level: u32,
    /// Present only when the line carries `ZONE:`
    pub zone: Option<String>,
}

/// Parse a who line; anonymous or malformed entries yield `None`.
pub fn parse_who_line(payload: &str) -> Option<WhoEntry> {
    let open = payload.find('[')?;
    let close = open + payload[open..].find("] ")?;
    let bracket = &payload[open + 1..close];
    let (level, class) = bracket.split_once(' ')?;
    let level = level.trim().parse::<u32>().ok()?;

    let rest = &payload[close + 2..];
    let name = &rest[..rest.find(" (")?];
    if name.is_empty() || class.trim().is_empty() {
        return None;
    }

    let zone = payload
        .find("ZONE:")
        .map(|idx| payload[idx + "ZONE:".len()..].trim().to_string())
        .filter(|z| !z.is_empty());

    Some(WhoEntry {
        name: name.trim().to_string(),
        class: class.trim().to_string(),
        level,
        zone,
    })
}

/// Turn a who entry into a roster row, folding it into local state when it
/// describes the tracked character.
pub fn build_candidate(who: WhoEntry, state: &mut CharacterState, join_date: &str) -> RosterEntry {
    let zone = who.zone.clone().unwrap_or_else(|| state.zone.clone());
    let mut tradeskills = None;

    if who.name == state.name {
        state.level = who.level;
        if let Some(explicit) = &who.zone {
            state.zone = explicit.clone();
        }
        tradeskills = state.tradeskill_summary();
    }

    RosterEntry {
        name: who.name,
        class: who.class,
        level: who.level,
        zone,
        join_date: join_date.to_string(),
        tradeskills,
    }
}

/// Insert or update the candidate's roster row.
pub fn reconcile(
    candidate: RosterEntry,
    lists: &mut ReferenceLists,
    repo: &mut dyn ReferenceRepository,
) -> Result<Event> {
    let name = candidate.name.clone();

    let known = lists.roster.contains_exact(&name) || repo.get_roster_row(&name)?.is_some();
    if known {
        repo.update_roster_row(&name, &RosterUpdate::from(&candidate))?;
        if !lists.roster.contains_exact(&name) {
            lists.refresh_roster(repo)?;
        }
        log::debug!("Updated roster row for {}", name);
        return Ok(Event::RosterUpdate { name });
    }

    repo.append_roster_row(candidate)?;
    lists.refresh_roster(repo)?;
    log::info!("Added {} to the roster", name);
    Ok(Event::RosterNew { name })
}

/// Join dates are recorded on guild time (US Central), whatever the host zone.
pub fn join_date_at(now: DateTime<Utc>) -> String {
    now.with_timezone(&Central).format("%m/%d/%Y").to_string()
}

pub fn today() -> String {
    join_date_at(Utc::now())
}
