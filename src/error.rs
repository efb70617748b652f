//! Crate-wide error type.
//!
//! Mirrors the error kinds an investigation can terminate with: bad input,
//! a transient or permanent provider failure, cancellation, a context
//! overflow, or an internal fault. Tool-level and cache-level failures are
//! deliberately *not* representable here — those degrade to textual
//! `"unavailable: <reason>"` results or cache misses and never propagate as
//! an `InvestigationError`.

use std::error::Error;
use std::fmt;

/// Top-level error for anything that can abort an investigation outright.
#[derive(Debug, Clone)]
pub enum InvestigationError {
    /// The Transaction Input failed schema or bounds validation.
    /// Never enters `Running`.
    Input(String),
    /// A provider call failed after retries were exhausted.
    Provider(ProviderErrorKind, String),
    /// The orchestrator's cancellation handle fired for this investigation.
    Cancelled,
    /// An LLM message payload exceeded the provider's context limit.
    ContextOverflow(String),
    /// Anything else: bugs, invariant violations, or unexpected internal state.
    Internal(String),
}

/// Distinguishes transient (retryable) from permanent provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Timeout, HTTP 429, or 5xx — retried per component policy before surfacing.
    Transient,
    /// Authentication failure, quota exhaustion, or schema violation — never retried.
    Permanent,
}

impl fmt::Display for InvestigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvestigationError::Input(msg) => write!(f, "invalid input: {}", msg),
            InvestigationError::Provider(kind, msg) => {
                write!(f, "provider error ({:?}): {}", kind, msg)
            }
            InvestigationError::Cancelled => write!(f, "investigation cancelled"),
            InvestigationError::ContextOverflow(msg) => {
                write!(f, "context_overflow: {}", msg)
            }
            InvestigationError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl Error for InvestigationError {}

/// Machine-readable error kind, mirrored on the wire (`Investigation.error.kind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    Transient,
    Permanent,
    Cancelled,
    ContextOverflow,
    Internal,
}

impl ErrorKind {
    /// Same mapping as [`InvestigationError::http_status`], usable once the
    /// original error has already been folded into an [`crate::domain::InvestigationFailure`]
    /// and only the kind survives (§6 non-streaming status codes).
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::Input => 400,
            ErrorKind::ContextOverflow => 413,
            ErrorKind::Transient => 429,
            ErrorKind::Permanent => 503,
            ErrorKind::Cancelled => 504,
            ErrorKind::Internal => 500,
        }
    }
}

impl InvestigationError {
    /// Classify this error for the wire-facing `error.kind` field.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvestigationError::Input(_) => ErrorKind::Input,
            InvestigationError::Provider(ProviderErrorKind::Transient, _) => ErrorKind::Transient,
            InvestigationError::Provider(ProviderErrorKind::Permanent, _) => ErrorKind::Permanent,
            InvestigationError::Cancelled => ErrorKind::Cancelled,
            InvestigationError::ContextOverflow(_) => ErrorKind::ContextOverflow,
            InvestigationError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status the ingress layer should map this onto (§6).
    pub fn http_status(&self) -> u16 {
        match self {
            InvestigationError::Input(_) => 400,
            InvestigationError::ContextOverflow(_) => 413,
            InvestigationError::Provider(ProviderErrorKind::Transient, _) => 429,
            InvestigationError::Provider(ProviderErrorKind::Permanent, _) => 503,
            InvestigationError::Cancelled => 504,
            InvestigationError::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_overflow_maps_to_413() {
        let e = InvestigationError::ContextOverflow("too many tokens".into());
        assert_eq!(e.http_status(), 413);
        assert_eq!(e.kind(), ErrorKind::ContextOverflow);
    }

    #[test]
    fn cancelled_maps_to_504() {
        assert_eq!(InvestigationError::Cancelled.http_status(), 504);
    }
}
