//! Error types for the blog CRUD service.
//!
//! This module defines the central `Error` enum shared by the server and its
//! storage backends. It implements `From<Error>` for `tonic::Status` so every
//! failure reaches the client with exactly one status code.
//!
//! ## Error Cases
//! - `InvalidId`: The identifier is not a 24-character hexadecimal string.
//! - `InvalidRequest`: A required request field is missing.
//! - `NotFound`: No blog matches the identifier.
//! - `Storage`: The storage driver reported a failure.
//! - `Decode`: A stored document could not be decoded into a blog.
//! - `UnexpectedId`: The store generated an identifier of an unexpected type.
//! - `RequestCancelled`: The client went away mid-stream.
//! - `ServiceShutdown`: A list stream outlived the shutdown grace period.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the blog service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The client sent an identifier that does not parse.
    #[error("Cannot parse ID {id:?}: {reason}")]
    InvalidId { id: String, reason: String },

    /// The client request is missing a required field.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// No document matched the identifier.
    #[error("Cannot find blog with ID {id}")]
    NotFound { id: String },

    /// Storage driver failure (connection, write, cursor).
    #[error("Storage error: {context}")]
    Storage { context: String },

    /// A stored document did not match the blog layout.
    #[error("Decode error: {context}")]
    Decode { context: String },

    /// The store returned a generated identifier that is not an `ObjectId`.
    #[error("Cannot convert inserted ID {found} to an ObjectId")]
    UnexpectedId { found: String },

    /// The client aborted the request.
    #[error("Request cancelled by client")]
    RequestCancelled,

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidId { .. } => Status::invalid_argument(err.to_string()),
            Error::InvalidRequest { reason } => Status::invalid_argument(reason),
            Error::NotFound { .. } => Status::not_found(err.to_string()),
            Error::Storage { .. }
            | Error::Decode { .. }
            | Error::UnexpectedId { .. } => Status::internal(err.to_string()),
            Error::RequestCancelled => Status::cancelled("Request was cancelled"),
            Error::ServiceShutdown => Status::unavailable("Service is shutting down"),
        }
    }
}
