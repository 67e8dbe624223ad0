//! Error classification and recovery hints.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The identity provider rejected the authorization request.
    Provider,
    /// No usable token; the user has to log in again.
    Authentication,
    /// A provider answered with something the client cannot use.
    Protocol,
    RateLimit,
    Network,
    Server,
    Configuration,
    Storage,
    Serialization,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RestartLogin,
    RetryWithBackoff,
    CheckCredentials,
    CheckConfiguration,
    CheckProviderAdapter,
    CheckStorage,
}
