//! Error types for the acceptance harness

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("{action}: no element matched {query} within {timeout_ms} ms")]
    NotFound {
        action: String,
        query: String,
        timeout_ms: u64,
    },

    #[error("{action}: {count} elements matched {query}, expected exactly one (index the query explicitly)")]
    Ambiguous {
        action: String,
        query: String,
        count: usize,
    },

    #[error("{action}: expected {expected} on {query}, last saw {actual}")]
    AssertionFailed {
        action: String,
        query: String,
        expected: String,
        actual: String,
    },

    #[error("Save state never became {expected} within {waited_ms} ms (last seen: {last_seen})")]
    SyncTimeout {
        expected: String,
        last_seen: String,
        waited_ms: u64,
        artifact: Option<PathBuf>,
    },

    #[error("Screenshot mismatch: {name} differs in {diff_pixels} pixels (ratio {diff_ratio:.5})")]
    VisualMismatch {
        name: String,
        diff_pixels: u64,
        diff_ratio: f64,
        actual: PathBuf,
        expected: PathBuf,
        diff: PathBuf,
    },

    #[error("Baseline not found: {0}")]
    BaselineNotFound(String),

    #[error("Team teardown failed for '{team}': {reason}")]
    TeardownFailure { team: String, reason: String },

    #[error("Setup failed for '{group}': {reason}")]
    SetupFailed { group: String, reason: String },

    #[error("Team name already in use: {0}")]
    TeamNameTaken(String),

    /// The create form was submitted but the team never became current;
    /// the product may still have created it.
    #[error("Team '{team}' was submitted but not confirmed: {reason}")]
    TeamUnconfirmed { team: String, reason: String },

    #[error("Product not reachable after {0} attempts")]
    ServerUnavailable(usize),

    #[error("Playwright not found. Install with: npx playwright install")]
    DriverNotFound,

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Scenario panicked: {0}")]
    Panicked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Condition kind attached to every reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Ambiguous,
    AssertionFailed,
    SyncTimeout,
    VisualMismatch,
    TeardownFailure,
    SetupFailed,
    Environment,
    Driver,
    Other,
}

impl E2eError {
    pub fn kind(&self) -> FailureKind {
        match self {
            E2eError::NotFound { .. } => FailureKind::NotFound,
            E2eError::Ambiguous { .. } => FailureKind::Ambiguous,
            E2eError::AssertionFailed { .. } => FailureKind::AssertionFailed,
            E2eError::SyncTimeout { .. } => FailureKind::SyncTimeout,
            E2eError::VisualMismatch { .. } | E2eError::BaselineNotFound(_) => {
                FailureKind::VisualMismatch
            }
            E2eError::TeardownFailure { .. } => FailureKind::TeardownFailure,
            E2eError::SetupFailed { .. } | E2eError::TeamUnconfirmed { .. } => {
                FailureKind::SetupFailed
            }
            E2eError::MissingEnv(_)
            | E2eError::Config(_)
            | E2eError::Fixture(_)
            | E2eError::ServerUnavailable(_) => FailureKind::Environment,
            E2eError::Driver(_) | E2eError::DriverNotFound => FailureKind::Driver,
            _ => FailureKind::Other,
        }
    }

    /// Files a human needs to triage the failure without re-running.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        match self {
            E2eError::VisualMismatch {
                actual,
                expected,
                diff,
                ..
            } => vec![actual.clone(), expected.clone(), diff.clone()],
            E2eError::SyncTimeout {
                artifact: Some(path),
                ..
            } => vec![path.clone()],
            _ => Vec::new(),
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
