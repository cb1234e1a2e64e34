use thiserror::Error;

/// Errors from the session cache (primary record and auxiliary items).
///
/// Any of these is fatal to the current request. The engine never retries.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store timed out")]
    Timeout,

    #[error("session store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt session store entry: {0}")]
    Corrupt(String),
}

/// Errors raised while loading or resolving the step catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog parse error: {0}")]
    Parse(String),

    #[error("catalog validation error: {0}")]
    Validation(String),

    #[error("step '{0}' not found in catalog")]
    NotFound(String),
}

/// Errors from named business actions.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The catalog referenced an action that is not registered.
    #[error("invalid action reference: '{0}'")]
    UnknownAction(String),

    /// The action ended the session with a message that is safe to show.
    #[error("action rejected the request: {0}")]
    Rejected(String),

    /// The action failed internally; the reason is for logs only.
    #[error("action '{action}' failed: {reason}")]
    Failed { action: String, reason: String },
}

/// Errors from repository operations (used by trait definitions in ussd-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Top-level error for one USSD request.
///
/// Every variant ends the session with a generic reply, except `Validation`
/// which is rejected before the engine runs.
#[derive(Debug, Error)]
pub enum UssdError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error(transparent)]
    Action(#[from] ActionError),
}

impl From<CatalogError> for UssdError {
    fn from(e: CatalogError) -> Self {
        UssdError::Configuration(e.to_string())
    }
}

impl From<RepositoryError> for UssdError {
    fn from(e: RepositoryError) -> Self {
        UssdError::Persistence(e.to_string())
    }
}

impl UssdError {
    /// Whether this error indicates a bug in the deployed configuration
    /// rather than an operational or user problem.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            UssdError::Configuration(_) | UssdError::Action(ActionError::UnknownAction(_))
        )
    }
}
