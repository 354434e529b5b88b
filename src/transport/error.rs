//! Transport error types and handling

use std::io;
use thiserror::Error;

/// Errors raised by datagram transports
#[derive(Debug, Error)]
pub enum TransportError {
    /// Socket level failure
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
    /// Datagram exceeds the transport's buffer
    #[error("payload of {size} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },
    /// Send attempted on a transport with no destination
    #[error("transport has no send destination")]
    NoDestination,
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// What a caller should do after a failed operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecoveryStrategy {
    /// Drop this datagram and keep going
    Skip,
    /// Configuration problem, retrying will not help
    Fail,
}

impl TransportError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            TransportError::Io(_) => RecoveryStrategy::Skip,
            TransportError::PayloadTooLarge { .. } => RecoveryStrategy::Skip,
            TransportError::NoDestination => RecoveryStrategy::Fail,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        !matches!(self.recovery_strategy(), RecoveryStrategy::Fail)
    }
}

/// Receive timeouts surface as `WouldBlock` on Unix and `TimedOut` on Windows
pub(crate) fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
