mod commands;
mod data;
mod error;
mod logging;
mod models;
mod services;
mod state;

use commands::{data_commands, export_commands, history_commands, settings_commands};
use data::migrations;
use state::AppState;

use tauri::Manager;

const DB_FILE_NAME: &str = "qrledger.db";
const EXPORT_DIR_NAME: &str = "qrcodes";

fn init_state(app: &tauri::App) -> Result<AppState, Box<dyn std::error::Error>> {
    let app_dir = app.path().app_data_dir()?;
    std::fs::create_dir_all(&app_dir)?;

    if let Err(e) = logging::init(&app_dir) {
        eprintln!("logging disabled: {e:#}");
    }

    let db_path = app_dir.join(DB_FILE_NAME);
    let conn = rusqlite::Connection::open(&db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    migrations::run_migrations(&conn)?;

    let state = AppState::new(conn, app_dir.join(EXPORT_DIR_NAME))?;
    tracing::info!(
        db = %db_path.display(),
        history = state.lock_history().len(),
        "engine state ready"
    );
    Ok(state)
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let _guard = std::env::var("SENTRY_DSN")
        .ok()
        .filter(|dsn| !dsn.trim().is_empty())
        .map(|dsn| {
            sentry::init((
                dsn,
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    send_default_pii: false,
                    ..Default::default()
                },
            ))
        });

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            let state = init_state(app)?;
            app.manage(state);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            data_commands::load_data_folder,
            data_commands::query_data,
            data_commands::verify_record,
            data_commands::get_status,
            data_commands::clear_record_ledger,
            history_commands::get_history,
            history_commands::clear_history,
            history_commands::delete_history_item,
            export_commands::save_qrcode_to_data_folder,
            settings_commands::get_setting,
            settings_commands::set_setting,
            settings_commands::get_ingest_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
