pub mod error;
pub mod types;

pub use error::{Error, Result};

/// gRPC service and message definitions generated from `proto/blog.proto`.
///
/// ## Service
///
/// - `CreateBlog` - stores a new blog and returns it with its identifier.
/// - `ReadBlog` - fetches one blog by identifier.
/// - `UpdateBlog` - replaces author, title and content of an existing blog.
/// - `DeleteBlog` - removes one blog by identifier.
/// - `ListBlog` - server-streams every stored blog.
///
/// Identifiers travel as 24-character lowercase hexadecimal strings; see
/// [`types::parse_blog_id`].
pub mod proto {
    tonic::include_proto!("blog");

    /// Encoded file descriptor set for gRPC server reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("blog_descriptor");
}
