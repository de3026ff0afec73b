//! Server-side components of the blog CRUD service.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/environment configuration.
//! - [`model`] - Translation between wire blogs and stored documents.
//! - [`store`] - The storage seam and its MongoDB and in-memory backends.
//! - [`service`] - The `BlogService` gRPC implementation.
//! - [`streaming`] - The `ListBlog` cursor feeder.
//! - [`telemetry`] - Logging, tracing and metrics initialization.
//!
//! These components are wired together in the server's `main.rs`.

pub mod config;
pub mod model;
pub mod service;
pub mod store;
pub mod streaming;
pub mod telemetry;

#[cfg(test)]
mod tests;
