//! # Blog Identifier Types and Constants
//!
//! Blogs are stored under a MongoDB [`ObjectId`] and exchanged on the wire as
//! its 24-character lowercase hexadecimal form. Both the server and clients
//! use the helpers here so the two representations never drift apart.
//!
//! ## Constants
//!
//! - [`BLOG_ID_HEX_LEN`] - Length of a wire identifier.
//! - [`DEFAULT_DATABASE`] / [`DEFAULT_COLLECTION`] - Where blogs live by
//!   default.

use crate::{Error, Result};
pub use bson::oid::ObjectId;

/// Number of hexadecimal characters in a wire identifier (12 bytes).
pub const BLOG_ID_HEX_LEN: usize = 24;

/// Database holding the blog collection unless configured otherwise.
pub const DEFAULT_DATABASE: &str = "grpc-crud";

/// Collection holding blog documents unless configured otherwise.
pub const DEFAULT_COLLECTION: &str = "blog";

/// Parses a wire identifier into a storage identifier.
///
/// Fails with [`Error::InvalidId`] for anything that is not exactly
/// [`BLOG_ID_HEX_LEN`] hexadecimal characters.
pub fn parse_blog_id(raw: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw).map_err(|e| Error::InvalidId {
        id: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Formats a storage identifier as a wire identifier.
pub fn format_blog_id(id: &ObjectId) -> String {
    id.to_hex()
}
