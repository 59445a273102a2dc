//! Error types for the call dispatcher.

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse {key}={value}: {reason}")]
    ParseError {
        key: String,
        value: String,
        reason: String,
    },
}

/// Execution pool errors.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Worker pool requires a running tokio runtime")]
    NoRuntime,

    #[error("Worker pool is shut down")]
    Closed,

    #[error("Worker pool capacity must be at least 1, got {capacity}")]
    ZeroCapacity { capacity: usize },
}

/// Outcomes of a dispatch attempt that did not produce an assignment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("No free worker in any tier")]
    NoFreeWorker,

    #[error("Dispatcher pool is shut down")]
    PoolClosed,
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
