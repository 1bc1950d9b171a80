// Trigger evaluation for EverQuest log lines.
//
// Each trigger owns one family of lines. Triggers are evaluated in the fixed
// order of `Trigger::all()`; the first one whose pattern matches handles the
// line and no later trigger sees it.

use lazy_static::lazy_static;
use regex::Regex;

use super::error::Result;
use super::model::Event;
use super::reference::{ContainmentMatcher, ReferenceLists, ReferenceRepository};
use super::roster;
use super::state::CharacterState;

lazy_static! {
    static ref ROSTER_SNAPSHOT: Regex =
        Regex::new(r"^Players (on|in) EverQuest:").expect("Invalid roster snapshot regex");
    static ref PET_ATTACK: Regex =
        Regex::new(r"^(\w+) tells you, 'Attacking (.+) Master\.'").expect("Invalid pet regex");
    static ref NEW_LEVEL: Regex =
        Regex::new(r"Welcome to level (\d+)").expect("Invalid level regex");
    static ref SKILL_LEVEL: Regex =
        Regex::new(r"\((\d+)\)\s*$").expect("Invalid skill level regex");
}

const SELF_DEATH: &str = "You have been slain by";
const LEVEL_UP: &str = "You have gained a level! Welcome to level";
const ZONE_ENTRY: &str = "You have entered ";
const ARENA_ENTRY: &str = "You have entered an Arena";
const SELF_KILL: &str = "You have slain ";
const OTHER_KILL: &str = " has been slain by ";
const SELF_LOOT: &str = "You have looted a";
const OTHER_LOOT: &str = "has looted a";
const SKILL_UP: &str = "You have become better at ";

/// Line families, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    SelfDeath,
    RosterSnapshot,
    GuildPresence,
    LevelUp,
    ZoneEntry,
    PetAttack,
    SelfKill,
    OtherKill,
    SelfLoot,
    OtherLoot,
    SkillUp,
}

impl Trigger {
    pub fn all() -> &'static [Trigger] {
        &[
            Self::SelfDeath,
            Self::RosterSnapshot,
            Self::GuildPresence,
            Self::LevelUp,
            Self::ZoneEntry,
            Self::PetAttack,
            Self::SelfKill,
            Self::OtherKill,
            Self::SelfLoot,
            Self::OtherLoot,
            Self::SkillUp,
        ]
    }

    pub fn matches(&self, payload: &str, guild_tag: &str) -> bool {
        match self {
            Self::SelfDeath => payload.contains(SELF_DEATH),
            Self::RosterSnapshot => ROSTER_SNAPSHOT.is_match(payload),
            Self::GuildPresence => !guild_tag.is_empty() && payload.contains(guild_tag),
            Self::LevelUp => payload.contains(LEVEL_UP),
            Self::ZoneEntry => payload.starts_with(ZONE_ENTRY) && !payload.starts_with(ARENA_ENTRY),
            Self::PetAttack => PET_ATTACK.is_match(payload),
            Self::SelfKill => payload.contains(SELF_KILL),
            Self::OtherKill => payload.contains(OTHER_KILL),
            Self::SelfLoot => payload.contains(SELF_LOOT),
            Self::OtherLoot => payload.contains(OTHER_LOOT),
            Self::SkillUp => payload.contains(SKILL_UP),
        }
    }

    /// Level-ups are announced from level 10 on, every fifth level.
    pub fn is_level_milestone(level: u32) -> bool {
        level > 9 && level % 5 == 0
    }

    /// Tradeskills are announced every 50 points once past 24.
    pub fn is_trade_milestone(level: u32) -> bool {
        level > 24 && level % 50 == 0
    }
}

/// Everything a trigger may read or update while handling a line.
pub struct TriggerContext<'a> {
    pub state: &'a mut CharacterState,
    pub lists: &'a mut ReferenceLists,
    pub repo: &'a mut dyn ReferenceRepository,
    pub join_date: &'a str,
}

/// Matches payloads against the ordered trigger table.
pub struct TriggerClassifier {
    guild_tag: String,
}

impl TriggerClassifier {
    pub fn new(guild_tag: impl Into<String>) -> Self {
        Self {
            guild_tag: guild_tag.into(),
        }
    }

    /// First trigger that owns this payload, if any.
    pub fn match_trigger(&self, payload: &str) -> Option<Trigger> {
        Trigger::all()
            .iter()
            .copied()
            .find(|trigger| trigger.matches(payload, &self.guild_tag))
    }

    /// Classify one payload (timestamp already stripped).
    ///
    /// State updates happen even when no event comes out.
    pub fn classify(&self, payload: &str, ctx: &mut TriggerContext) -> Result<Option<Event>> {
        let trigger = match self.match_trigger(payload) {
            Some(t) => t,
            None => return Ok(None),
        };
        log::debug!("{:?} matched: {}", trigger, payload);
        handle(trigger, payload, ctx)
    }
}

fn handle(trigger: Trigger, payload: &str, ctx: &mut TriggerContext) -> Result<Option<Event>> {
    match trigger {
        Trigger::SelfDeath => Ok(handle_self_death(payload)),
        Trigger::RosterSnapshot => {
            ctx.lists.refresh(ctx.repo)?;
            log::info!("Roster snapshot seen, reference lists refreshed ({} members)", ctx.lists.roster.len());
            Ok(None)
        }
        Trigger::GuildPresence => handle_guild_presence(payload, ctx),
        Trigger::LevelUp => Ok(handle_level_up(payload, ctx.state)),
        Trigger::ZoneEntry => {
            handle_zone_entry(payload, ctx.state);
            Ok(None)
        }
        Trigger::PetAttack => {
            handle_pet_attack(payload, ctx.state);
            Ok(None)
        }
        Trigger::SelfKill => Ok(ctx.lists.targets.first_in(payload).map(|target| Event::Kill {
            actor: ctx.state.name.clone(),
            target: target.to_string(),
        })),
        Trigger::OtherKill => Ok(handle_other_kill(payload, ctx.state, ctx.lists)),
        Trigger::SelfLoot => Ok(ctx.lists.items.first_in(payload).map(|item| Event::Loot {
            actor: ctx.state.name.clone(),
            item: item.to_string(),
        })),
        Trigger::OtherLoot => Ok(first_member_match(&ctx.lists.roster, &ctx.lists.items, payload)
            .map(|(actor, item)| Event::Loot {
                actor: actor.to_string(),
                item: item.to_string(),
            })),
        Trigger::SkillUp => Ok(handle_skill_up(payload, ctx)),
    }
}

fn handle_self_death(payload: &str) -> Option<Event> {
    let idx = payload.find(SELF_DEATH)?;
    let killer = payload[idx + SELF_DEATH.len()..]
        .trim()
        .trim_end_matches(&['!', '.'][..])
        .trim()
        .to_string();
    Some(Event::SelfDeath { killer })
}

fn handle_guild_presence(payload: &str, ctx: &mut TriggerContext) -> Result<Option<Event>> {
    let who = match roster::parse_who_line(payload) {
        Some(who) => who,
        None => {
            log::debug!("Skipping unparseable who line: {}", payload);
            return Ok(None);
        }
    };
    let candidate = roster::build_candidate(who, ctx.state, ctx.join_date);
    roster::reconcile(candidate, ctx.lists, ctx.repo).map(Some)
}

fn handle_level_up(payload: &str, state: &mut CharacterState) -> Option<Event> {
    let level = NEW_LEVEL
        .captures(payload)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())?;
    state.level = level;

    if Trigger::is_level_milestone(level) {
        Some(Event::LevelUp {
            character: state.name.clone(),
            level,
        })
    } else {
        None
    }
}

fn handle_zone_entry(payload: &str, state: &mut CharacterState) {
    let rest = &payload[ZONE_ENTRY.len()..];
    let zone = rest.split('.').next().unwrap_or(rest).trim();
    if !zone.is_empty() {
        state.zone = zone.to_string();
    }
}

fn handle_pet_attack(payload: &str, state: &mut CharacterState) {
    if let Some(name) = PET_ATTACK.captures(payload).and_then(|caps| caps.get(1)) {
        state.pet = Some(name.as_str().to_string());
    }
}

fn handle_other_kill(payload: &str, state: &CharacterState, lists: &ReferenceLists) -> Option<Event> {
    let target = lists.targets.first_in(payload)?;

    // Our pet's kills count as our own
    if let Some(pet) = &state.pet {
        if payload.contains(pet.as_str()) {
            return Some(Event::Kill {
                actor: state.name.clone(),
                target: target.to_string(),
            });
        }
    }

    first_member_match(&lists.roster, &lists.targets, payload).map(|(actor, target)| Event::Kill {
        actor: actor.to_string(),
        target: target.to_string(),
    })
}

/// First roster member in the payload paired with the first listed thing in it.
fn first_member_match<'l>(
    members: &'l ContainmentMatcher,
    things: &'l ContainmentMatcher,
    payload: &str,
) -> Option<(&'l str, &'l str)> {
    let thing = things.first_in(payload)?;
    members
        .iter()
        .find(|member| payload.contains(member))
        .map(|member| (member, thing))
}

fn handle_skill_up(payload: &str, ctx: &mut TriggerContext) -> Option<Event> {
    let level = SKILL_LEVEL
        .captures(payload)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())?;
    let skill = ctx.lists.tradeskills.first_in(payload)?.to_string();
    if level <= 24 {
        return None;
    }

    if !ctx.state.tradeskills.is_hydrated() {
        let summary = match ctx.repo.get_tradeskill_summary(&ctx.state.name) {
            Ok(summary) => summary,
            Err(e) => {
                log::warn!("Tradeskill summary unavailable for {}: {}", ctx.state.name, e);
                None
            }
        };
        ctx.state.tradeskills.hydrate(summary.as_deref());
    }
    ctx.state.tradeskills.set(&skill, level);

    if Trigger::is_trade_milestone(level) {
        Some(Event::Trade { skill, level })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::TrackerError;
    use crate::core::model::{RosterEntry, RosterUpdate};
    use crate::core::reference::{JsonReferenceStore, ReferenceData, TradeskillInfo};

    const GUILD: &str = "<Legacy of Ik>";

    fn member(name: &str) -> RosterEntry {
        RosterEntry {
            name: name.to_string(),
            class: "Ranger".to_string(),
            level: 50,
            zone: "Kael".to_string(),
            join_date: "01/01/2023".to_string(),
            tradeskills: None,
        }
    }

    fn store() -> JsonReferenceStore {
        JsonReferenceStore::in_memory(ReferenceData {
            targets: vec!["Lord Nagafen".to_string(), "Lady Vox".to_string()],
            items: vec!["Fungus Covered Scale Tunic".to_string()],
            tradeskills: vec![
                TradeskillInfo { name: "Baking".to_string(), message: String::new() },
                TradeskillInfo { name: "Fletching".to_string(), message: String::new() },
            ],
            roster: vec![member("Zaela"), member("Ikthar")],
            ..ReferenceData::default()
        })
    }

    struct Fixture {
        classifier: TriggerClassifier,
        state: CharacterState,
        lists: ReferenceLists,
        repo: JsonReferenceStore,
    }

    impl Fixture {
        fn new() -> Self {
            let repo = store();
            let lists = ReferenceLists::load(&repo).unwrap();
            Self {
                classifier: TriggerClassifier::new(GUILD),
                state: CharacterState::new("Ikthar"),
                lists,
                repo,
            }
        }

        fn classify(&mut self, payload: &str) -> Option<Event> {
            let mut ctx = TriggerContext {
                state: &mut self.state,
                lists: &mut self.lists,
                repo: &mut self.repo,
                join_date: "01/02/2023",
            };
            self.classifier.classify(payload, &mut ctx).unwrap()
        }
    }

    #[test]
    fn test_level_up_milestones() {
        for (level, announced) in [(9, false), (10, true), (11, false), (14, false), (15, true), (24, false), (25, true)] {
            let mut fx = Fixture::new();
            let event = fx.classify(&format!("You have gained a level! Welcome to level {}!", level));
            assert_eq!(fx.state.level, level);
            assert_eq!(event.is_some(), announced, "level {}", level);
            if announced {
                assert_eq!(event, Some(Event::LevelUp { character: "Ikthar".to_string(), level }));
            }
        }
    }

    #[test]
    fn test_trade_milestones() {
        for (level, announced) in [(20, false), (24, false), (25, false), (49, false), (50, true), (99, false), (100, true)] {
            let mut fx = Fixture::new();
            let event = fx.classify(&format!("You have become better at Baking! ({})", level));
            assert_eq!(event.is_some(), announced, "skill {}", level);
            if announced {
                assert_eq!(event, Some(Event::Trade { skill: "Baking".to_string(), level }));
            }
            if level > 24 {
                assert_eq!(fx.state.tradeskills.get("Baking"), Some(level));
            } else {
                assert_eq!(fx.state.tradeskills.get("Baking"), None);
            }
        }
    }

    #[test]
    fn test_untracked_skill_ignored() {
        let mut fx = Fixture::new();
        assert!(fx.classify("You have become better at Swimming! (100)").is_none());
        assert!(fx.state.tradeskills.is_empty());
    }

    #[test]
    fn test_skill_up_hydrates_from_roster_summary() {
        let mut fx = Fixture::new();
        fx.repo
            .update_roster_row(
                "Ikthar",
                &RosterUpdate {
                    class: "Ranger".to_string(),
                    level: 50,
                    zone: "Kael".to_string(),
                    tradeskills: Some("Fletching (130) / Baking (40)".to_string()),
                },
            )
            .unwrap();

        fx.classify("You have become better at Baking! (41)");
        assert_eq!(fx.state.tradeskills.summary(), "Fletching (130) / Baking (41)");
    }

    #[test]
    fn test_pet_assignment() {
        let mut fx = Fixture::new();
        let event = fx.classify("Foo tells you, 'Attacking Bar Master.'");
        assert!(event.is_none());
        assert_eq!(fx.state.pet.as_deref(), Some("Foo"));
    }

    #[test]
    fn test_zone_entry() {
        let mut fx = Fixture::new();
        assert!(fx.classify("You have entered The Plane of Sky.").is_none());
        assert_eq!(fx.state.zone, "The Plane of Sky");

        assert!(fx.classify("You have entered an Arena (PvP) area.").is_none());
        assert_eq!(fx.state.zone, "The Plane of Sky");
    }

    #[test]
    fn test_roster_member_kill() {
        let mut fx = Fixture::new();
        let event = fx.classify("Lord Nagafen has been slain by Zaela!");
        assert_eq!(
            event,
            Some(Event::Kill { actor: "Zaela".to_string(), target: "Lord Nagafen".to_string() })
        );
    }

    #[test]
    fn test_pet_kill_credited_to_owner() {
        let mut fx = Fixture::new();
        fx.classify("Gobaner tells you, 'Attacking Lady Vox Master.'");
        let event = fx.classify("Lady Vox has been slain by Gobaner!");
        assert_eq!(
            event,
            Some(Event::Kill { actor: "Ikthar".to_string(), target: "Lady Vox".to_string() })
        );
    }

    #[test]
    fn test_self_kill_and_unknown_target() {
        let mut fx = Fixture::new();
        assert_eq!(
            fx.classify("You have slain Lady Vox!"),
            Some(Event::Kill { actor: "Ikthar".to_string(), target: "Lady Vox".to_string() })
        );
        assert!(fx.classify("You have slain a decaying skeleton!").is_none());
        assert!(fx.classify("a decaying skeleton has been slain by Stranger!").is_none());
    }

    #[test]
    fn test_loot() {
        let mut fx = Fixture::new();
        assert_eq!(
            fx.classify("--You have looted a Fungus Covered Scale Tunic.--"),
            Some(Event::Loot { actor: "Ikthar".to_string(), item: "Fungus Covered Scale Tunic".to_string() })
        );
        assert_eq!(
            fx.classify("--Zaela has looted a Fungus Covered Scale Tunic.--"),
            Some(Event::Loot { actor: "Zaela".to_string(), item: "Fungus Covered Scale Tunic".to_string() })
        );
        assert!(fx.classify("--Stranger has looted a Fungus Covered Scale Tunic.--").is_none());
        assert!(fx.classify("--You have looted a Rusty Dagger.--").is_none());
    }

    #[test]
    fn test_self_death() {
        let mut fx = Fixture::new();
        let before = fx.state.clone();
        assert_eq!(
            fx.classify("You have been slain by Lord Nagafen!"),
            Some(Event::SelfDeath { killer: "Lord Nagafen".to_string() })
        );
        assert_eq!(fx.state, before);
    }

    #[test]
    fn test_roster_snapshot_refreshes_lists() {
        let mut fx = Fixture::new();
        fx.repo.append_roster_row(member("Newbie")).unwrap();
        assert!(!fx.lists.roster.contains_exact("Newbie"));

        assert!(fx.classify("Players on EverQuest:").is_none());
        assert!(fx.lists.roster.contains_exact("Newbie"));
    }

    #[test]
    fn test_guild_line_reconciles() {
        let mut fx = Fixture::new();
        let line = "[42 Cleric] Vox (Erudite) <Legacy of Ik> ZONE: Qeynos";
        assert_eq!(fx.classify(line), Some(Event::RosterNew { name: "Vox".to_string() }));
        assert_eq!(fx.classify(line), Some(Event::RosterUpdate { name: "Vox".to_string() }));
    }

    #[test]
    fn test_priority_first_trigger_wins() {
        let fx = Fixture::new();
        // Self death outranks the generic slain pattern
        assert_eq!(
            fx.classifier.match_trigger("You have been slain by Zaela has been slain by x"),
            Some(Trigger::SelfDeath)
        );
        // Guild tag outranks kill handling
        assert_eq!(
            fx.classifier.match_trigger("[50 Ranger] Zaela (Wood Elf) <Legacy of Ik> has been slain by"),
            Some(Trigger::GuildPresence)
        );
        assert_eq!(fx.classifier.match_trigger("Hail, Guard Bixby"), None);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let line = "You have become better at Fletching! (100)";
        let mut a = Fixture::new();
        let mut b = Fixture::new();
        assert_eq!(a.classify(line), b.classify(line));
        assert_eq!(a.state, b.state);
    }

    struct FailingSummary(JsonReferenceStore);

    impl ReferenceRepository for FailingSummary {
        fn list_targets(&self) -> Result<Vec<String>> { self.0.list_targets() }
        fn list_items(&self) -> Result<Vec<String>> { self.0.list_items() }
        fn list_tradeskills(&self) -> Result<Vec<String>> { self.0.list_tradeskills() }
        fn list_roster_names(&self) -> Result<Vec<String>> { self.0.list_roster_names() }
        fn refresh_roster_names(&mut self) -> Result<Vec<String>> { self.0.refresh_roster_names() }
        fn get_roster_row(&self, name: &str) -> Result<Option<RosterEntry>> { self.0.get_roster_row(name) }
        fn append_roster_row(&mut self, entry: RosterEntry) -> Result<()> { self.0.append_roster_row(entry) }
        fn update_roster_row(&mut self, name: &str, fields: &RosterUpdate) -> Result<()> {
            self.0.update_roster_row(name, fields)
        }
        fn get_tradeskill_summary(&self, _name: &str) -> Result<Option<String>> {
            Err(TrackerError::Reference("sheet offline".to_string()))
        }
        fn get_trade_message(&self, skill: &str) -> Result<String> { self.0.get_trade_message(skill) }
        fn get_death_taunt(&mut self) -> Result<String> { self.0.get_death_taunt() }
        fn get_join_taunt(&mut self) -> Result<String> { self.0.get_join_taunt() }
    }

    #[test]
    fn test_summary_failure_uses_empty_book() {
        let mut repo = FailingSummary(store());
        let mut lists = ReferenceLists::load(&repo).unwrap();
        let mut state = CharacterState::new("Ikthar");
        let classifier = TriggerClassifier::new(GUILD);

        let mut ctx = TriggerContext {
            state: &mut state,
            lists: &mut lists,
            repo: &mut repo,
            join_date: "01/02/2023",
        };
        let event = classifier
            .classify("You have become better at Baking! (50)", &mut ctx)
            .unwrap();

        assert_eq!(event, Some(Event::Trade { skill: "Baking".to_string(), level: 50 }));
        assert!(state.tradeskills.is_hydrated());
        assert_eq!(state.tradeskills.summary(), "Baking (50)");
    }
}
