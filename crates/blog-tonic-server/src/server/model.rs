//! Translation between the wire-level [`Blog`] and the stored [`BlogItem`].
//!
//! The stored document keeps the field names of existing deployments
//! (`_id`, `author_id`, `content`, `title`). Both directions are pure: no I/O
//! and no validation beyond what the types enforce.

use blog_tonic_core::{
    proto::Blog,
    types::{ObjectId, format_blog_id},
};
use serde::{Deserialize, Serialize};

/// A blog post as persisted in the blog collection.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct BlogItem {
    /// Store-generated identifier. Absent until inserted.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub author_id: String,
    pub content: String,
    pub title: String,
}

impl BlogItem {
    /// Overwrites the editable fields with those of `blog`, keeping the
    /// stored identifier.
    pub fn apply(&mut self, blog: Blog) {
        self.author_id = blog.author_id;
        self.content = blog.content;
        self.title = blog.title;
    }
}

/// Builds a new, not yet inserted document. The wire identifier is ignored.
impl From<Blog> for BlogItem {
    fn from(blog: Blog) -> Self {
        Self {
            id: None,
            author_id: blog.author_id,
            content: blog.content,
            title: blog.title,
        }
    }
}

impl From<BlogItem> for Blog {
    fn from(item: BlogItem) -> Self {
        Self {
            id: item.id.as_ref().map(format_blog_id).unwrap_or_default(),
            author_id: item.author_id,
            title: item.title,
            content: item.content,
        }
    }
}
