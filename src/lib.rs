pub mod commands;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use std::fs;
use std::path::Path;

use tracing::info;

pub use services::calendar_grid::build_month_grid;
pub use services::slot_generator::generate_slots;
pub use services::streak_calculator::{compute_streak, compute_streak_from_dates};

const DATABASE_FILE: &str = "heartnote.sqlite";
const LOG_DIR: &str = "logs";

/// Sets up logging and the database under `data_dir` and wires every service.
/// Hosts call this once at startup and keep the returned state.
pub fn bootstrap(data_dir: &Path) -> error::AppResult<commands::AppState> {
    fs::create_dir_all(data_dir)?;
    utils::logger::init_logging(&data_dir.join(LOG_DIR))?;

    let pool = db::DbPool::new(data_dir.join(DATABASE_FILE))?;
    let state = commands::AppState::new(pool)?;

    info!(
        target: "app::startup",
        db_path = %state.db().path().display(),
        "heartnote core ready"
    );
    Ok(state)
}
