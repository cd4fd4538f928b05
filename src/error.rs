use std::process::ExitCode;

/// Errors that cause onreply to exit with a specific code.
#[derive(Debug, thiserror::Error)]
pub enum ExitError {
    #[error("config error: {0}")]
    Config(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("{0}")]
    Other(String),
}

impl ExitError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ExitError::Config(_) => ExitCode::from(2),
            ExitError::Send(_) => ExitCode::from(4),
            ExitError::Other(_) => ExitCode::from(1),
        }
    }
}

/// Structural problems in a rules document, caught before the document is
/// trusted. The messages name the offending app and rule so an editor can
/// surface them directly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    #[error("rules must be a JSON object")]
    NotAnObject,

    #[error("\"apps\" is missing or not an array")]
    AppsNotArray,

    #[error("app {app}: \"rules\" is missing or not an array")]
    RulesNotArray { app: String },

    #[error("app {app}, rule {rule}: set \"messageExactMatch\" or \"messagePattern\"")]
    MissingTrigger { app: String, rule: usize },

    #[error("app {app}, rule {rule}: \"responses\" must be a non-empty array of strings")]
    BadResponses { app: String, rule: usize },
}
