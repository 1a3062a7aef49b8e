use thiserror::Error;

#[derive(Error, Debug)]
pub enum DepbumpError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Project validation failed: {0}")]
    ProjectValidation(String),

    #[error("Manifest parsing failed: {0}")]
    ManifestParsing(String),

    #[error("Git operation failed: {0}")]
    GitOperation(String),

    #[error("Pull request creation failed: {0}")]
    PullRequest(String),

    #[error("Command '{command}' exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("Failed to execute command '{command}': {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DepbumpError>;
