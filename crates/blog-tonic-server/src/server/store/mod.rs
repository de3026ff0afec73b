//! Storage seam for the blog collection.
//!
//! [`BlogStore`] is the only capability the service holds. It is injected at
//! construction as an `Arc<dyn BlogStore>` and shared by every concurrently
//! running call, so implementations must be safe for concurrent use.
//!
//! ## Backends
//!
//! - [`mongo::MongoBlogStore`] - a MongoDB collection.
//! - [`memory::MemoryBlogStore`] - a process-local map with the same
//!   contract, used for local runs and tests.

pub mod memory;
pub mod mongo;

use crate::server::model::BlogItem;
use blog_tonic_core::{Result, types::ObjectId};
use bson::Bson;
use futures::stream::BoxStream;

/// A lazy, finite, non-restartable sequence of stored blogs.
///
/// Dropping the stream releases the underlying cursor.
pub type BlogCursor = BoxStream<'static, Result<BlogItem>>;

/// Document-store operations used by the blog service.
///
/// Every filter is identifier equality, except [`BlogStore::find_all`] which
/// scans the whole collection.
#[async_trait::async_trait]
pub trait BlogStore: Send + Sync + 'static {
    /// Inserts `item` (whose `id` is `None`) and returns the identifier the
    /// store generated, as the store reports it.
    async fn insert_one(&self, item: &BlogItem) -> Result<Bson>;

    /// Fetches the document with identifier `id`, if any.
    async fn find_one(&self, id: ObjectId) -> Result<Option<BlogItem>>;

    /// Replaces the document with identifier `id`. Never inserts.
    async fn replace_one(&self, id: ObjectId, item: &BlogItem) -> Result<()>;

    /// Deletes the document with identifier `id`, returning how many
    /// documents were removed.
    async fn delete_one(&self, id: ObjectId) -> Result<u64>;

    /// Opens an unfiltered cursor over the collection.
    async fn find_all(&self) -> Result<BlogCursor>;

    /// Closes the connection to the backing store.
    ///
    /// Called once, after the server has stopped accepting and drained
    /// in-flight calls.
    async fn shutdown(&self);
}
