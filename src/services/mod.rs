pub mod export_service;
pub mod history_service;
pub mod index_service;
pub mod ingest_service;
pub mod parser_service;
pub mod query_service;
pub mod settings_service;
pub mod verify_service;

pub(crate) fn local_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
