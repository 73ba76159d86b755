//! The crate-wide error taxonomy.
//!
//! Each subsystem defines its own [`snafu`] error enum with precise variants; every such enum
//! exposes a `kind()` accessor mapping onto [`ErrorKind`] so that callers (and the CLI) can
//! react uniformly without matching subsystem-specific variants.

use derive_more::derive::Display;

/// Coarse classification shared by every error in the crate.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A parameter was out of range or a required handle was absent.
    #[display("invalid argument")]
    InvalidArgument,
    /// A referenced file does not exist.
    #[display("file not found")]
    FileNotFound,
    /// An I/O operation on an external collaborator failed.
    #[display("I/O error")]
    Io,
    /// Metadata or signal data could not be parsed, or a decoder was applied to the wrong
    /// system.
    #[display("invalid format")]
    InvalidFormat,
    /// An operation was attempted in a state that cannot serve it (closed reader, empty
    /// range, ...).
    #[display("invalid state")]
    InvalidState,
    /// An operation exceeded a caller-imposed deadline.
    #[display("timeout")]
    Timeout,
    /// The operation observed a cancellation request and stopped cooperatively.
    #[display("cancelled")]
    Cancelled,
    /// The requested functionality is a stub.
    #[display("not implemented")]
    NotImplemented,
    /// A programming defect: this should be unreachable.
    #[display("internal error")]
    Internal,
}
