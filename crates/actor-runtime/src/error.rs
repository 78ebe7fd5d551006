//! # Runtime Errors
//!
//! This module defines the error taxonomy shared by every part of the runtime.
//! Contexts, addresses, task sets, supervisors and the persistence wrapper all
//! report through [`ActorError`], so callers match on one enum no matter which
//! layer failed.
//!
//! Two of the variants are structural defects rather than runtime conditions:
//! [`ActorError::UnhandledMessage`] and [`ActorError::SupervisionFailure`].
//! They are always logged at `error` level where they are raised and are never
//! swallowed.

use std::fmt;

/// Boxed cause carried by business-level failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur within the actor runtime.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    /// The target Context is no longer running.
    #[error("Actor closed")]
    Closed,
    /// `run` was called a second time on the same Context.
    #[error("Context is already running")]
    AlreadyRunning,
    /// No handler or route exists for the dispatched message kind.
    #[error("No handler for message kind: {0}")]
    UnhandledMessage(String),
    /// A handler reported a business failure. The Context keeps running.
    #[error("Handler failed: {0}")]
    HandlerFailed(BoxError),
    /// A background task panicked or otherwise failed.
    #[error("Task failed: {0}")]
    TaskFailed(String),
    /// A background task was cancelled before it completed.
    #[error("Task cancelled")]
    Cancelled,
    /// A storage write failed. The in-memory state is still valid.
    #[error("Persist failed: {0}")]
    PersistFailed(#[source] StorageError),
    /// A supervised child terminated and could not be recovered.
    #[error("Supervision failure in role '{role}': {cause}")]
    SupervisionFailure { role: String, cause: String },
    /// The caller-side deadline expired before the handler replied.
    #[error("Request timed out")]
    TimedOut,
}

impl ActorError {
    /// Wraps a handler's business error.
    pub fn handler_failed<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ActorError::HandlerFailed(Box::new(error))
    }

    /// Returns a short stable label for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ActorError::Closed => "closed",
            ActorError::AlreadyRunning => "already_running",
            ActorError::UnhandledMessage(_) => "unhandled_message",
            ActorError::HandlerFailed(_) => "handler_failed",
            ActorError::TaskFailed(_) => "task_failed",
            ActorError::Cancelled => "cancelled",
            ActorError::PersistFailed(_) => "persist_failed",
            ActorError::SupervisionFailure { .. } => "supervision_failure",
            ActorError::TimedOut => "timed_out",
        }
    }

    /// True for the defects that must be raised loudly.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ActorError::UnhandledMessage(_) | ActorError::SupervisionFailure { .. }
        )
    }
}

/// Errors reported by a [`Storage`](crate::persistent::Storage) collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Why a Context's run loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The actor stopped itself, or a stop was requested through an Address.
    Stopped,
    /// Every Address was dropped and the queued messages were drained.
    MailboxClosed,
    /// The owning supervisor or registry tore the Context down.
    Cancelled,
    /// The actor declared its own state unsound, or its handler panicked.
    Failed(String),
}

impl ExitReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, ExitReason::Failed(_))
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Stopped => write!(f, "stopped"),
            ExitReason::MailboxClosed => write!(f, "mailbox closed"),
            ExitReason::Cancelled => write!(f, "cancelled"),
            ExitReason::Failed(cause) => write!(f, "failed: {cause}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("out of stock")]
    struct OutOfStock;

    #[test]
    fn handler_failure_keeps_its_cause() {
        let err = ActorError::handler_failed(OutOfStock);
        assert_eq!(err.to_string(), "Handler failed: out of stock");
        assert_eq!(err.as_label(), "handler_failed");
        assert!(!err.is_structural());
    }

    #[test]
    fn structural_defects_are_flagged() {
        assert!(ActorError::UnhandledMessage("Ping".into()).is_structural());
        let err = ActorError::SupervisionFailure {
            role: "source".into(),
            cause: "boom".into(),
        };
        assert!(err.is_structural());
        assert_eq!(
            err.to_string(),
            "Supervision failure in role 'source': boom"
        );
    }

    #[test]
    fn only_failed_exit_is_a_failure() {
        assert!(ExitReason::Failed("bad state".into()).is_failure());
        assert!(!ExitReason::Stopped.is_failure());
        assert!(!ExitReason::Cancelled.is_failure());
        assert!(!ExitReason::MailboxClosed.is_failure());
    }
}
