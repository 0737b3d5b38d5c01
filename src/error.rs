// Error types shared by every layer of the library. The binary maps each
// variant to a documented exit code (see `Error::exit_code`).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Network failure or timeout before a response arrived.
    #[error("request to {operation} failed: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    /// The daemon answered with a non-2xx status.
    #[error("{operation} returned HTTP {status}")]
    HttpStatus { operation: String, status: u16 },

    /// The daemon answered `code == "FAIL"`.
    #[error("daemon rejected {operation}: {}", .message.as_deref().unwrap_or("request failed"))]
    Rejected {
        operation: String,
        message: Option<String>,
    },

    #[error("could not decode {operation} response: {source}")]
    Decode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not encode {operation} request: {source}")]
    Encode {
        operation: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write config {}: {source}", .path.display())]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("subscription index {index} out of range ({count} subscriptions)")]
    SubscriptionIndex { index: usize, count: usize },

    #[error("subscription {id} is no longer present")]
    SubscriptionGone { id: u64 },

    #[error("server {id} is not part of subscription {sub}")]
    UnknownServer { id: u64, sub: usize },

    #[error("invalid subscription status timestamp {0:?}")]
    StatusTimestamp(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Transport { .. } | Error::HttpStatus { .. } => 10,
            Error::Rejected { .. } => 11,
            Error::Decode { .. } | Error::Encode { .. } => 12,
            Error::ConfigWrite { .. } => 13,
            Error::SubscriptionIndex { .. }
            | Error::SubscriptionGone { .. }
            | Error::UnknownServer { .. }
            | Error::StatusTimestamp(_) => 14,
        }
    }
}
