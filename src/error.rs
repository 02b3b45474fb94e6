//! Error types for detection and for a single refresh tick.
//!
//! Entities missing a position or route are not errors; the normalizer drops
//! them. Everything here aborts a whole tick (or a direct detector call).

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Precondition violations rejected by the bunching detector.
#[derive(Debug, Error, PartialEq)]
pub enum DetectError {
    #[error("bunching threshold must be finite and non-negative, got {0}")]
    InvalidThreshold(f64),

    #[error("report {id} has invalid coordinates ({latitude}, {longitude})")]
    InvalidCoordinate {
        id: String,
        latitude: f64,
        longitude: f64,
    },
}

/// A snapshot that cannot stand in for the fleet's current state.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("not a valid GTFS-RT feed message")]
    Decode(#[from] prost::DecodeError),

    /// Empty or truncated bodies decode as a default message with no header.
    #[error("feed message has no header")]
    MissingHeader,
}

/// Why a refresh tick produced no output.
#[derive(Debug, Error)]
pub enum TickError {
    #[error("feed source unavailable")]
    SourceUnavailable(#[source] BoxError),

    #[error("feed source did not respond within {0:?}")]
    Timeout(Duration),

    #[error("feed snapshot is invalid")]
    InvalidSnapshot(#[from] SnapshotError),

    #[error(transparent)]
    Detection(#[from] DetectError),
}

/// Coarse classification of a [`TickError`], reported to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SourceUnavailable,
    InvalidSnapshot,
    Detection,
}

impl TickError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TickError::SourceUnavailable(_) | TickError::Timeout(_) => {
                FailureKind::SourceUnavailable
            }
            TickError::InvalidSnapshot(_) => FailureKind::InvalidSnapshot,
            TickError::Detection(_) => FailureKind::Detection,
        }
    }
}

/// Renders an error together with its chain of sources.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
