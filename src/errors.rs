use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Agent connection failed: {0}")]
    AgentConnect(String),

    #[error("Invalid developer token: {0}")]
    InvalidToken(String),

    #[error("Session start failed: {0}")]
    SessionStart(String),

    #[error("Obsolete version: {0}")]
    ObsoleteVersion(String),

    #[error("{0}")]
    Sdk(String),

    #[error("Action [{class_name}] in addon [{guid}] is not installed in your account")]
    AddonNotInstalled { guid: String, class_name: String },

    #[error("Agent responded with an unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, SdkError>;

impl SdkError {
    /// True for failures that happened before the Agent could answer.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            SdkError::Http(e) => e.is_connect() || e.is_timeout(),
            SdkError::Io(_) => true,
            _ => false,
        }
    }
}
