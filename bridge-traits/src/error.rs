use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// Transport-level failure (DNS, connect, timeout). Distinct from an HTTP
    /// response carrying an error status, which still yields an `HttpResponse`.
    #[error("Network unreachable: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// True when the failure happened before any HTTP status was received.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, BridgeError::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
