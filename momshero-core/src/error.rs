use thiserror::Error;

use crate::types::CallKind;

/// Failure of one logical gateway call, after retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("{kind} call hit the model quota after {attempts} attempts: {message}")]
    QuotaExceeded {
        kind: CallKind,
        attempts: u32,
        message: String,
    },

    #[error("{kind} call failed after {attempts} attempts: {message}")]
    Transient {
        kind: CallKind,
        attempts: u32,
        message: String,
    },

    #[error("{kind} response invalid after {attempts} attempts: {message}")]
    Parse {
        kind: CallKind,
        attempts: u32,
        message: String,
    },
}

impl CallError {
    pub fn is_quota(&self) -> bool {
        matches!(self, CallError::QuotaExceeded { .. })
    }

    pub fn kind(&self) -> CallKind {
        match self {
            CallError::QuotaExceeded { kind, .. }
            | CallError::Transient { kind, .. }
            | CallError::Parse { kind, .. } => *kind,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            CallError::QuotaExceeded { attempts, .. }
            | CallError::Transient { attempts, .. }
            | CallError::Parse { attempts, .. } => *attempts,
        }
    }
}

/// Internal disk-tier failure. Never escapes the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid cache record: {0}")]
    InvalidRecord(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingEnvVar(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}
