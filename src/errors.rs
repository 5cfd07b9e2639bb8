use std::io;

use thiserror::Error;

/// Transport and configuration errors.
///
/// None of these are sent over the wire. On the server side they end the
/// affected session only; on the client side they are handed to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Any IO error.
    #[error("IO err: {0}")]
    Io(#[from] io::Error),
    /// The host part of an address could not be resolved.
    #[error("failed to resolve address: {0}")]
    Resolve(String),
    /// The listening socket could not be bound, typically the port is in use.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// the address that was requested
        addr: String,
        /// the underlying socket error
        source: io::Error,
    },
    /// A field contains the frame terminator and can't be framed.
    #[error("field can't be framed: {0:?}")]
    InvalidField(String),
    /// The peer closed the stream before a full response was received.
    #[error("connection closed before a full response was received")]
    UnexpectedEof,
    /// The server was unable to reply to the client within the configured timeout.
    #[error("the server was unable to reply within the configured timeout")]
    Timeout,
    /// The connection was abandoned after an earlier transport fault.
    #[error("connection is closed")]
    Closed,
    /// An operation could not be registered in the table.
    #[error("operation registration rejected: {0}")]
    Registration(String),
}

/// A request whose frames are not well formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseFault {
    /// The operation frame is empty or not alphabetic.
    #[error("Malformed request")]
    BadOperationSyntax,
    /// An operand frame is not a signed integer in range.
    #[error("Malformed request")]
    BadOperandSyntax,
}

/// A well formed request the operation table can't satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchFault {
    /// No handler is registered under the operation name.
    #[error("Unknown operation")]
    UnknownOperation,
    /// `div` with a zero divisor; the division is never attempted.
    #[error("Division by zero error")]
    DivisionByZero,
}

/// Every per-request failure. The `Display` text is the fault line sent to the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    /// see [`ParseFault`]
    #[error(transparent)]
    Parse(#[from] ParseFault),
    /// see [`DispatchFault`]
    #[error(transparent)]
    Dispatch(#[from] DispatchFault),
}
