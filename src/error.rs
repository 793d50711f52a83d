use serde::ser::SerializeStruct;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("failed to parse '{file}': {message}")]
    Parse { file: String, message: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    General(String),
}

impl AppError {
    pub fn parse(file: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::Io(_) => "io",
            Self::Serde(_) => "serde",
            Self::Parse { .. } => "parse",
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::General(_) => "general",
        }
    }

    pub fn capture(self) -> Self {
        if matches!(self, Self::Database(_) | Self::Io(_) | Self::Serde(_)) {
            tracing::error!(kind = self.kind(), "{self}");
            sentry::capture_message(&self.to_string(), sentry::Level::Error);
        }
        self
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AppError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
