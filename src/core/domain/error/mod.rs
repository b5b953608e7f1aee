use thiserror::Error;

/// The main error type for cluster synchronization and guest control.
///
/// Fetch-side variants (`Auth`, `Network`, `Api`) abort a poll tick and leave
/// the previously committed state untouched. Control-side variants (`Action`,
/// `AmbiguousTarget`, `TargetNotFound`) are returned to the caller of an action.
#[derive(Error, Debug)]
pub enum PveError {
    /// The API token was rejected (HTTP 401/403).
    ///
    /// Polling for the affected host stops until it is reconfigured.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Transport failure: connect error, timeout, reset.
    #[error("Network error: {0}")]
    Network(String),

    /// Any other non-success response, or a body that could not be decoded.
    ///
    /// # Fields
    /// * `status` - HTTP status code, when one was received
    /// * `message` - Upstream message or decoding failure
    #[error("API error ({status:?}): {message}")]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// A guest action was rejected or failed upstream.
    #[error("Action error ({status:?}): {message}")]
    Action {
        status: Option<u16>,
        message: String,
    },

    /// A bare guest tuple matched guests on more than one host.
    ///
    /// # Fields
    /// * `target` - The guest that was looked up (`node:type:vmid`)
    /// * `candidates` - Identifiers of every host that holds a match
    #[error(
        "Guest {target} exists on multiple configured hosts ({}); provide a host id to disambiguate",
        candidates.join(", ")
    )]
    AmbiguousTarget {
        target: String,
        candidates: Vec<String>,
    },

    /// Nothing matched the target specification.
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Represents validation failures of host settings or options
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl PveError {
    /// Returns `true` for errors that make further polling pointless until
    /// the host is reconfigured.
    pub fn is_fatal_for_polling(&self) -> bool {
        matches!(self, PveError::Auth(_))
    }
}

/// Specialized error type for validation failures.
///
/// This enum provides detailed context about why a validation
/// failed, including field-specific errors and format violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Represents a validation failure for a specific field
    ///
    /// # Fields
    /// * `field` - The name of the field that failed validation
    /// * `message` - A detailed message about why validation failed
    #[error("Field '{field}' validation failed: {message}")]
    Field { field: String, message: String },

    /// Represents format/syntax validation failures
    #[error("Format error: {0}")]
    Format(String),

    /// Represents violations of domain constraints
    #[error("Domain constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Type alias for Results that may fail with a PveError
pub type PveResult<T> = Result<T, PveError>;
