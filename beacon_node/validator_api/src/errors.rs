use beacon_chain::{AttesterCacheError, BeaconChainError};
use types::BeaconStateError;

/// The caller-visible failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request: bad page size, wrong key length, missing filter,
    /// epoch from the future.
    InvalidArgument,
    /// Requested data does not exist: unarchived finalized epoch, unknown
    /// public key.
    NotFound,
    /// Pagination start beyond the total, validator index beyond the
    /// registry.
    OutOfRange,
    /// The chain has not started.
    FailedPrecondition,
    /// A degraded dependency; retrying may succeed.
    Unavailable,
    Internal,
    /// Deadline expired or the caller went away.
    Canceled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RpcError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OutOfRange, message)
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FailedPrecondition, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn canceled() -> Self {
        Self::new(ErrorKind::Canceled, "request canceled")
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RpcError {}

impl From<BeaconChainError> for RpcError {
    fn from(e: BeaconChainError) -> Self {
        match e {
            BeaconChainError::ChainNotStarted => {
                Self::failed_precondition("chain has not started")
            }
            BeaconChainError::ArchiveMissing => Self::not_found("epoch is not archived"),
            BeaconChainError::BeaconState(e) => e.into(),
            other => Self::internal(format!("{other:?}")),
        }
    }
}

impl From<BeaconStateError> for RpcError {
    fn from(e: BeaconStateError) -> Self {
        match e {
            BeaconStateError::UnknownValidator(index) => {
                Self::out_of_range(format!("validator index {index} beyond the registry"))
            }
            BeaconStateError::EmptyValidatorSet => {
                Self::failed_precondition("no active validators")
            }
            other => Self::internal(format!("{other:?}")),
        }
    }
}

impl From<AttesterCacheError> for RpcError {
    fn from(e: AttesterCacheError) -> Self {
        match e {
            AttesterCacheError::Canceled => Self::canceled(),
            AttesterCacheError::BuildFailed(message) => Self::internal(message),
        }
    }
}

impl From<store::Error> for RpcError {
    fn from(e: store::Error) -> Self {
        Self::internal(format!("{e:?}"))
    }
}

impl From<operation_pool::OpPoolError> for RpcError {
    fn from(e: operation_pool::OpPoolError) -> Self {
        match e {
            operation_pool::OpPoolError::PoolFull => Self::unavailable("operation pool is full"),
        }
    }
}

impl From<eth1::Error> for RpcError {
    fn from(e: eth1::Error) -> Self {
        match e {
            eth1::Error::Disconnected => Self::unavailable("eth1 backend disconnected"),
            other => Self::internal(format!("{other:?}")),
        }
    }
}
