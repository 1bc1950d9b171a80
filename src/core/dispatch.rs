//! Turns classified events into chat announcements.

use super::error::Result;
use super::model::Event;
use super::reference::ReferenceRepository;

/// Sink for announcements (a chat channel in production).
pub trait Notifier {
    fn notify(&mut self, text: &str) -> Result<()>;
}

/// Writes announcements to the application log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, text: &str) -> Result<()> {
        log::info!("Alarm: {}", text);
        Ok(())
    }
}

/// Best-effort delivery of events to a [`Notifier`].
pub struct Dispatcher {
    notifier: Box<dyn Notifier + Send>,
    sent: u64,
    failed: u64,
}

impl Dispatcher {
    pub fn new(notifier: Box<dyn Notifier + Send>) -> Self {
        Self {
            notifier,
            sent: 0,
            failed: 0,
        }
    }

    /// Format and send one event. Returns whether a message was delivered.
    ///
    /// Delivery failures are logged and swallowed.
    pub fn dispatch(&mut self, event: &Event, character: &str, repo: &mut dyn ReferenceRepository) -> bool {
        let message = match format_message(event, character, repo) {
            Some(m) => m,
            None => return false,
        };

        match self.notifier.notify(&message) {
            Ok(()) => {
                self.sent += 1;
                true
            }
            Err(e) => {
                self.failed += 1;
                log::warn!("Could not deliver {:?}: {}", event, e);
                false
            }
        }
    }

    /// Deliver a plain text message, e.g. a stall warning.
    pub fn send_text(&mut self, text: &str) -> bool {
        match self.notifier.notify(text) {
            Ok(()) => {
                self.sent += 1;
                true
            }
            Err(e) => {
                self.failed += 1;
                log::warn!("Could not deliver message: {}", e);
                false
            }
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }
}

fn lookup(result: Result<String>, what: &str) -> String {
    result.unwrap_or_else(|e| {
        log::warn!("No {} available: {}", what, e);
        String::new()
    })
}

fn with_suffix(text: String, suffix: String) -> String {
    if suffix.is_empty() {
        text
    } else {
        format!("{} {}", text, suffix)
    }
}

/// Human-readable announcement for an event. Roster updates are not announced.
pub fn format_message(event: &Event, character: &str, repo: &mut dyn ReferenceRepository) -> Option<String> {
    let message = match event {
        Event::LevelUp { character, level } => {
            format!("{} has reached level {}! Now get back to work!", character, level)
        }
        Event::SelfDeath { killer } => with_suffix(
            format!("{} has fallen to {}!", character, killer),
            lookup(repo.get_death_taunt(), "death taunt"),
        ),
        Event::RosterNew { name } => with_suffix(
            format!("Bahaha! {} has pledged their life to the Legacy!", name),
            lookup(repo.get_join_taunt(), "join taunt"),
        ),
        Event::RosterUpdate { name } => {
            log::debug!("Roster row refreshed for {}", name);
            return None;
        }
        Event::Trade { skill, level } => with_suffix(
            format!("{} {}! Pretty impressive {}.", level, skill, character),
            lookup(repo.get_trade_message(skill), "trade message"),
        ),
        Event::Kill { actor, target } => {
            format!("{} just killed {}! **FOR IK!** Any good loot?", actor, target)
        }
        Event::Loot { actor, item } => format!(
            "{} just looted a {} for me! Leave it with the War Baron and he'll get it to me.",
            actor, item
        ),
    };
    Some(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::TrackerError;
    use crate::core::reference::{JsonReferenceStore, ReferenceData, Taunts, TradeskillInfo};
    use std::sync::{Arc, Mutex};

    struct Recording(Arc<Mutex<Vec<String>>>);

    impl Notifier for Recording {
        fn notify(&mut self, text: &str) -> Result<()> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn notify(&mut self, _text: &str) -> Result<()> {
            Err(TrackerError::Notify("transport down".to_string()))
        }
    }

    fn repo() -> JsonReferenceStore {
        JsonReferenceStore::in_memory(ReferenceData {
            tradeskills: vec![TradeskillInfo {
                name: "Baking".to_string(),
                message: "Save me a muffin.".to_string(),
            }],
            taunts: Taunts {
                death: vec!["Pathetic.".to_string()],
                join: vec!["Welcome, fodder.".to_string()],
            },
            ..ReferenceData::default()
        })
    }

    #[test]
    fn test_messages_include_lookups() {
        let mut repo = repo();
        let death = format_message(&Event::SelfDeath { killer: "Lord Nagafen".to_string() }, "Zaela", &mut repo);
        assert_eq!(death.as_deref(), Some("Zaela has fallen to Lord Nagafen! Pathetic."));

        let trade = format_message(&Event::Trade { skill: "Baking".to_string(), level: 100 }, "Zaela", &mut repo);
        assert_eq!(trade.as_deref(), Some("100 Baking! Pretty impressive Zaela. Save me a muffin."));

        let joined = format_message(&Event::RosterNew { name: "Vox".to_string() }, "Zaela", &mut repo).unwrap();
        assert!(joined.starts_with("Bahaha! Vox has pledged"));
        assert!(joined.ends_with("Welcome, fodder."));
    }

    #[test]
    fn test_roster_update_is_silent() {
        let mut repo = repo();
        assert!(format_message(&Event::RosterUpdate { name: "Vox".to_string() }, "Zaela", &mut repo).is_none());
    }

    #[test]
    fn test_dispatch_records_deliveries() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new(Box::new(Recording(seen.clone())));
        let mut repo = repo();

        let kill = Event::Kill { actor: "Zaela".to_string(), target: "Lady Vox".to_string() };
        assert!(dispatcher.dispatch(&kill, "Zaela", &mut repo));
        assert_eq!(dispatcher.sent(), 1);
        assert_eq!(seen.lock().unwrap()[0], "Zaela just killed Lady Vox! **FOR IK!** Any good loot?");
    }

    #[test]
    fn test_notifier_failure_is_not_fatal() {
        let mut dispatcher = Dispatcher::new(Box::new(FailingNotifier));
        let mut repo = repo();

        let loot = Event::Loot { actor: "Zaela".to_string(), item: "Cloak of Flames".to_string() };
        assert!(!dispatcher.dispatch(&loot, "Zaela", &mut repo));
        assert!(!dispatcher.dispatch(&loot, "Zaela", &mut repo));
        assert!(!dispatcher.send_text("still here"));
        assert_eq!(dispatcher.failed(), 3);
        assert_eq!(dispatcher.sent(), 0);
    }
}
