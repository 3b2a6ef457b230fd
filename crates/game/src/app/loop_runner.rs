use std::process::ExitCode;

use echo_engine::{run_session, SessionError, SessionOutcome, SessionSummary};
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    match run_to_completion(app) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "session_failed");
            ExitCode::FAILURE
        }
    }
}

fn run_to_completion(app: AppWiring) -> Result<(SessionOutcome, SessionSummary), SessionError> {
    let AppWiring {
        session,
        mut world,
        mut pilot,
        mut mirror,
    } = app;

    let (outcome, summary) = run_session(session, &mut world, &mut pilot, &mut mirror)?;
    info!(
        outcome = ?outcome,
        ticks = summary.ticks,
        lives = world.lives(),
        echoes = world.echoes().len(),
        mirrored_events = mirror.applied(),
        mirrored_pursuers = mirror.pursuer_count(),
        visible_echoes = mirror.visible_echoes(),
        avatar = ?mirror.avatar(),
        "run_complete"
    );
    Ok((outcome, summary))
}
