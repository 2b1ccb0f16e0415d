//! Quota versus other failure classification.

use std::fmt;

use super::LlmError;

/// Substrings (lowercase) that mark a quota or rate-limit failure.
pub const DEFAULT_QUOTA_SIGNATURES: &[&str] = &[
    "quota",
    "429",
    "rate limit",
    "resource exhausted",
    "resource_exhausted",
    "too many requests",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Quota,
    Other,
}

pub trait ErrorClassifier: Send + Sync + fmt::Debug {
    fn classify(&self, error: &LlmError) -> ErrorClass;
}

/// Classifies by error type first, then by signature substrings in the message.
#[derive(Debug, Clone)]
pub struct SignatureClassifier {
    signatures: Vec<String>,
}

impl Default for SignatureClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_QUOTA_SIGNATURES.iter().copied())
    }
}

impl SignatureClassifier {
    pub fn new<I, S>(signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            signatures: signatures
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }
}

impl ErrorClassifier for SignatureClassifier {
    fn classify(&self, error: &LlmError) -> ErrorClass {
        match error {
            LlmError::RateLimited { .. } | LlmError::ApiError { status: 429, .. } => {
                ErrorClass::Quota
            }
            other => {
                let message = other.to_string().to_lowercase();
                if self.signatures.iter().any(|s| message.contains(s)) {
                    ErrorClass::Quota
                } else {
                    ErrorClass::Other
                }
            }
        }
    }
}
