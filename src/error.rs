use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected status {1} from {0}")]
    Status(String, reqwest::StatusCode),
    #[error("manifest '{0}' is missing required key '{1}'")]
    MissingKey(String, String),
}
