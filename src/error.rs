//! # H103 Error Handling
//!
//! This module defines the ReaderError enum, which represents the different error
//! types that can occur in the h103-rs crate.

use thiserror::Error;

/// Represents the different error types that can occur when driving the reader.
///
/// Every public operation resolves exactly once, either with a success value
/// or with one of these kinds; events never carry a `ReaderError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReaderError {
    /// The link is not connected or the notification channel is not ready yet.
    #[error("Link not ready: notifications not enabled or still settling")]
    NotReady,

    /// Another exclusive operation currently holds the single-flight lock.
    #[error("Another operation is in progress")]
    Busy,

    /// The requested address was never seen during scanning.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The transport failed to establish the connection.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The transport connected but could not enable notification delivery.
    #[error("Failed to enable notifications: {0}")]
    NotifyEnableFailed(String),

    /// All write attempts to the transport were exhausted.
    #[error("Write failed after all retries: {0}")]
    WriteFailed(String),

    /// A correlated response did not arrive before its deadline.
    #[error("Timed out waiting for {0} response")]
    Timeout(&'static str),

    /// A request field was missing or malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The link dropped while the request was outstanding.
    #[error("Disconnected while request was pending")]
    Disconnected,

    /// A catch-all for uncategorized local failures, message preserved.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
