// Error types for SocialSpot domain operations

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while running jobs or domain operations
#[derive(Debug, Error)]
pub enum CoreError {
    /// Persistence backend error
    #[error("Store error: {0}")]
    Store(String),

    /// Email delivery error
    #[error("Email delivery error: {0}")]
    Delivery(String),

    /// Payment provider error
    #[error("Payment error: {0}")]
    Payment(String),

    /// Realtime broadcast error
    #[error("Broadcast error: {0}")]
    Broadcast(String),

    /// Object storage error
    #[error("Object storage error: {0}")]
    ObjectStore(String),

    /// Site rebuild webhook error
    #[error("Build hook error: {0}")]
    BuildHook(String),

    /// Input failed validation
    #[error("{0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Source occurrence ends at or before it starts
    #[error("Invalid time sequence")]
    InvalidTimeSequence,

    /// Every sampled identifier collided
    #[error("Failed to allocate a free event id after {0} attempts")]
    IdSpaceExhausted(u32),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        CoreError::Store(msg.into())
    }

    /// Create an email delivery error
    pub fn delivery(msg: impl Into<String>) -> Self {
        CoreError::Delivery(msg.into())
    }

    /// Create a payment error
    pub fn payment(msg: impl Into<String>) -> Self {
        CoreError::Payment(msg.into())
    }

    /// Create a broadcast error
    pub fn broadcast(msg: impl Into<String>) -> Self {
        CoreError::Broadcast(msg.into())
    }

    /// Create an object storage error
    pub fn object_store(msg: impl Into<String>) -> Self {
        CoreError::ObjectStore(msg.into())
    }

    /// Create a build hook error
    pub fn build_hook(msg: impl Into<String>) -> Self {
        CoreError::BuildHook(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        CoreError::Configuration(msg.into())
    }
}
