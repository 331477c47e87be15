//! Error types for worker pool planning
//!
//! Errors are structured with fields to aid debugging in production.
//! Planning errors are always fatal for the whole planning pass; whether the
//! caller's reconcile loop should try again is answered by [`Error::is_retryable`].

use thiserror::Error;

/// Main error type for Lattice worker operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error (collaborator I/O only, never raised by planning)
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Malformed or unparsable input (versions, provider status, budgets)
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "spec.pools[0].maxSurge")
        field: Option<String>,
    },

    /// An image or external dependency could not be resolved for a pool
    ///
    /// The message is surfaced to operators verbatim.
    #[error("{message}")]
    Resolution {
        /// Name of the pool whose resolution failed
        pool: String,
        /// Description of what could not be resolved
        message: String,
    },

    /// Required infrastructure state is missing
    #[error("precondition failed: {message}")]
    Precondition {
        /// Description of the missing state
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },
}

impl Error {
    /// Create a configuration error pointing at a specific field
    pub fn configuration_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a resolution error for a pool
    pub fn resolution_for(pool: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Resolution {
            pool: pool.into(),
            message: msg.into(),
        }
    }

    /// Create a precondition error with the given message
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition {
            message: msg.into(),
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Check if this error is retryable
    ///
    /// Configuration and serialization errors need a spec fix. Resolution and
    /// precondition errors clear up once the infrastructure or dependency
    /// controllers catch up, so the reconcile loop should come back later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => !matches!(
                source,
                kube::Error::Api(ae) if (400..500).contains(&ae.code)
            ),
            Error::Configuration { .. } => false,
            Error::Resolution { .. } => true,
            Error::Precondition { .. } => true,
            Error::Serialization { .. } => false,
        }
    }

    /// Get the pool name if this error is associated with a specific pool
    pub fn pool(&self) -> Option<&str> {
        match self {
            Error::Resolution { pool, .. } => Some(pool),
            _ => None,
        }
    }

    /// Get the field path if this error points at one
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::Configuration { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}
