//! Error types for the profile engine.

use thiserror::Error;

use crate::profile::ProfileId;

/// Errors from engine operations.
///
/// Unrooted paths, dangling includes and include cycles are not errors;
/// they resolve to "skip" or are reported as data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Scan of profile '{profile}' failed: {reason}")]
    ScanFailed { profile: ProfileId, reason: String },

    #[error("Unknown profile '{profile}'")]
    UnknownProfile { profile: ProfileId },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

impl EngineError {
    pub fn scan_failed(profile: &ProfileId, reason: impl Into<String>) -> Self {
        EngineError::ScanFailed {
            profile: profile.clone(),
            reason: reason.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
