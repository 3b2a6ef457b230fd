mod app;

use std::process::ExitCode;

use tracing::error;

fn main() -> ExitCode {
    app::bootstrap::init_tracing();

    match app::bootstrap::build_app() {
        Ok(app) => app::loop_runner::run(app),
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
