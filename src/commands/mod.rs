pub mod data_commands;
pub mod export_commands;
pub mod history_commands;
pub mod settings_commands;
