use thiserror::Error;

/// Failures reported by the remote tracking service.
///
/// Transport failures are folded into the kind matching the call that made them.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{0}")]
    NotFound(String),
    #[error("Authorization error: {0}")]
    Authorization(String),
    #[error("Update error: {0}")]
    Update(String),
    #[error("Unable to get info: {0}")]
    GetInfo(String),
}

impl RemoteError {
    pub fn missing_credentials() -> Self {
        RemoteError::Update("Missing TVmaze username and API key".to_string())
    }
}

#[derive(Debug, Error)]
pub enum LibraryError {
    /// The library answered without the requested list or item
    #[error("Media library returned no data for {0}")]
    NoData(String),
    #[error("Media library JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Media library unreachable: {0}")]
    Transport(String),
    #[error("Unexpected media library response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for LibraryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LibraryError::Decode(err.to_string())
        } else {
            LibraryError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(err: serde_json::Error) -> Self {
        LibraryError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for LibraryError {
    fn from(err: std::io::Error) -> Self {
        LibraryError::Transport(err.to_string())
    }
}
