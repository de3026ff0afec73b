//! Server-streaming support for `ListBlog`.
//!
//! - [`feeder`] - drains a storage cursor into the gRPC response channel.

pub mod feeder;
