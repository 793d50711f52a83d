pub mod history;
pub mod query;
pub mod record;
