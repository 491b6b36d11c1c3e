use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No backend token found. Set NURSEJOBS_TOKEN or write it to {0}")]
    MissingToken(String),

    #[error("Request to {url} failed: {message}")]
    Fetch { url: String, message: String },

    #[error("Backend returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Unexpected response shape from {0}: expected a list of records")]
    ResponseShape(String),

    #[error("Database not initialized. Run 'nursejobs init' first.")]
    NotInitialized,

    #[error("Unknown view '{0}'. Available: candidates, wishlist, jobs, saved-jobs")]
    UnknownView(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, BoardError>;
