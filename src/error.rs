//! Error taxonomy for the sprint health pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Settings are missing or malformed. Fatal before any fetch.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// The tracking backend could not produce issues. Fatal to the run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("backend returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("unexpected response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no active sprint found for board {0}")]
    NoActiveSprint(u64),
}

/// Reading or writing the persisted record file failed.
#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("record file {0} does not exist")]
    RecordFileMissing(PathBuf),

    #[error("record file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("record file is malformed: {0}")]
    Csv(#[from] csv::Error),
}

/// Delivery to a single destination failed. Never fatal to the run.
#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("destination is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("destination settings are malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned HTTP {0}")]
    Status(u16),

    #[error("invalid email address `{address}`: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("failed to build email: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}
