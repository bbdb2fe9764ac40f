use thiserror::Error;

/// The exhaustive set of failure codes reported by this crate.
///
/// Every fallible operation reports one of these kinds; there are no other
/// error channels. The numeric identity of each kind is part of the binary
/// contract shared with tooling that inspects driver logs, so variants are
/// never reordered or removed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DriverError {
    #[error("the operation failed")]
    Fail = 1,

    #[error("the operation timed out")]
    Timeout,

    #[error("not enough memory to complete the operation")]
    OutOfMemory,

    #[error("the operation is not implemented for this configuration")]
    NotImplemented,

    #[error("a size or stride violates the required alignment")]
    MisalignedSize,

    #[error("a pointer or offset violates the required alignment")]
    MisalignedData,

    #[error("an input parameter is invalid")]
    BadInput,

    #[error("the memory access flag combination is invalid")]
    BadMemFlags,

    #[error("the object is in the wrong state for the operation")]
    BadState,
}

/// Result alias used by every fallible operation in the crate.
pub type DriverResult<T> = Result<T, DriverError>;
