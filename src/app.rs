use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::{
    config::Settings,
    dispatch::{Dispatcher, LogNotifier, Notifier},
    error::Result,
    reference::JsonReferenceStore,
    session::{ParserSession, Step},
};

/// Open the configured log and run the parse loop until `active` is cleared.
pub async fn run(settings: Settings, active: Arc<AtomicBool>) -> Result<()> {
    run_with_notifier(settings, Box::new(LogNotifier), active).await
}

pub async fn run_with_notifier(
    settings: Settings,
    notifier: Box<dyn Notifier + Send>,
    active: Arc<AtomicBool>,
) -> Result<()> {
    let repo = JsonReferenceStore::open(&settings.reference_store)?;
    let mut session = ParserSession::new(&settings, Box::new(repo))?;

    if let Err(e) = session.open() {
        log::error!("Could not open character log for [{}]: {}", settings.character_name, e);
        return Err(e);
    }
    log::info!("Heartbeat timeout (minutes): [{}]", settings.heartbeat_minutes);
    log::info!("Make sure to turn on logging in EQ with the /log command!");

    let mut dispatcher = Dispatcher::new(notifier);
    parse_loop(&mut session, &mut dispatcher, &active, settings.poll_interval()).await;
    session.close();

    log::info!(
        "Parsing stopped: {} lines read, {} messages sent, {} failed",
        session.lines_read(),
        dispatcher.sent(),
        dispatcher.failed()
    );
    Ok(())
}

/// Single consumer loop: one line per iteration, sleep when idle.
pub async fn parse_loop(
    session: &mut ParserSession,
    dispatcher: &mut Dispatcher,
    active: &AtomicBool,
    poll_interval: Duration,
) {
    while active.load(Ordering::SeqCst) {
        match session.step(Instant::now()) {
            Step::Line(Some(event)) => {
                let character = session.state().name.clone();
                dispatcher.dispatch(&event, &character, session.repo_mut());
            }
            Step::Line(None) => {}
            Step::Idle(warning) => {
                if let Some(warning) = warning {
                    let message = warning.message();
                    log::warn!("{}", message);
                    dispatcher.send_text(&message);
                }
                tokio::time::sleep(poll_interval).await;
            }
            Step::Closed => break,
        }
    }
}
