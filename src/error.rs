use thiserror::Error;

/// Errors raised by the key-value store adapter.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Wrong value type at key: {0}")]
    WrongType(String),
    #[error("Precondition failed: {0}")]
    Conflict(String),
    #[error("Corrupt record at {key}: {reason}")]
    CorruptRecord { key: String, reason: String },
    #[error("Store backend error: {0}")]
    Backend(String),
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

/// Errors returned by the generic entity repository.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RepoError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },
    #[error("Rejected by entity hook: {0}")]
    Rejected(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("Product not found: {0}")]
    NotFound(String),
    #[error("Product already exists: {0}")]
    AlreadyExists(String),
    #[error("Product validation error: {0}")]
    ValidationError(String),
    #[error("Product storage error: {0}")]
    StorageError(StoreError),
}

impl From<RepoError> for CatalogError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound { id, .. } => CatalogError::NotFound(id),
            RepoError::AlreadyExists { id, .. } => CatalogError::AlreadyExists(id),
            RepoError::Rejected(reason) => CatalogError::ValidationError(reason),
            RepoError::Store(e) => CatalogError::StorageError(e),
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        CatalogError::StorageError(err)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Order validation error: {0}")]
    ValidationError(String),
    #[error("Order storage error: {0}")]
    StorageError(StoreError),
}

impl From<RepoError> for OrderError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound { id, .. } => OrderError::NotFound(id),
            // Generated ids collide only when the retry budget is exhausted.
            RepoError::AlreadyExists { id, .. } => {
                OrderError::StorageError(StoreError::Conflict(format!("order id {id} in use")))
            }
            RepoError::Rejected(reason) => OrderError::ValidationError(reason),
            RepoError::Store(e) => OrderError::StorageError(e),
        }
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        OrderError::StorageError(err)
    }
}

/// An outbound message could not be delivered.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("Delivery to {conversation} failed: {reason}")]
    Undeliverable { conversation: String, reason: String },
    #[error("Transport closed")]
    Closed,
}

/// Failure taxonomy shared by every conversation flow.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FlowError {
    /// Malformed input for the current step. The message is shown to the user.
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} already exists: {id}")]
    Duplicate { kind: &'static str, id: String },
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// What the controller does with the session after a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Keep the current step active so the user can try again.
    Retry,
    /// Drop back to Idle.
    Abort,
}

impl FlowError {
    pub fn validation(message: impl Into<String>) -> Self {
        FlowError::Validation(message.into())
    }

    pub fn disposition(&self) -> Disposition {
        match self {
            FlowError::Validation(_) | FlowError::Storage(_) | FlowError::Transport(_) => {
                Disposition::Retry
            }
            FlowError::NotFound { .. }
            | FlowError::Duplicate { .. }
            | FlowError::Forbidden(_)
            | FlowError::Internal(_) => Disposition::Abort,
        }
    }

    /// Short text safe to show in the conversation. Never includes error internals.
    pub fn user_message(&self) -> String {
        match self {
            FlowError::Validation(hint) => format!("⚠️ {hint}"),
            FlowError::NotFound { kind, .. } => format!("❌ {} not found.", capitalize(kind)),
            FlowError::Duplicate { kind, .. } => {
                format!("❌ A {kind} with that id already exists.")
            }
            FlowError::Forbidden(_) => "❌ You are not an admin!".to_string(),
            FlowError::Transport(_) | FlowError::Storage(_) | FlowError::Internal(_) => {
                "⚠️ Something went wrong. Please try again.".to_string()
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl From<CatalogError> for FlowError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(id) => FlowError::NotFound { kind: "product", id },
            CatalogError::AlreadyExists(id) => FlowError::Duplicate { kind: "product", id },
            CatalogError::ValidationError(msg) => FlowError::Validation(msg),
            CatalogError::StorageError(e) => FlowError::Storage(e),
        }
    }
}

impl From<OrderError> for FlowError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(id) => FlowError::NotFound { kind: "order", id },
            OrderError::ValidationError(msg) => FlowError::Validation(msg),
            OrderError::StorageError(e) => FlowError::Storage(e),
        }
    }
}

/// Errors surfaced by the conversation router client.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DispatchError {
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
    #[error(transparent)]
    Flow(#[from] FlowError),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}
