//! In-process [`BlogStore`] with the same contract as the MongoDB backend.

use super::{BlogCursor, BlogStore};
use crate::server::model::BlogItem;
use blog_tonic_core::{Error, Result, types::ObjectId};
use bson::Bson;
use futures::StreamExt;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Blogs kept in a map ordered by identifier.
///
/// `ObjectId`s start with a creation timestamp, so iteration roughly follows
/// insertion order. Lists iterate over a snapshot taken when the cursor is
/// opened.
#[derive(Debug, Default)]
pub struct MemoryBlogStore {
    items: RwLock<BTreeMap<ObjectId, BlogItem>>,
}

impl MemoryBlogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blogs.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

#[async_trait::async_trait]
impl BlogStore for MemoryBlogStore {
    async fn insert_one(&self, item: &BlogItem) -> Result<Bson> {
        let id = item.id.unwrap_or_else(ObjectId::new);
        let mut items = self.items.write();
        if items.contains_key(&id) {
            return Err(Error::Storage {
                context: format!("insert: duplicate key {id}"),
            });
        }
        items.insert(
            id,
            BlogItem {
                id: Some(id),
                ..item.clone()
            },
        );
        Ok(Bson::ObjectId(id))
    }

    async fn find_one(&self, id: ObjectId) -> Result<Option<BlogItem>> {
        Ok(self.items.read().get(&id).cloned())
    }

    async fn replace_one(&self, id: ObjectId, item: &BlogItem) -> Result<()> {
        if let Some(stored) = self.items.write().get_mut(&id) {
            *stored = BlogItem {
                id: Some(id),
                ..item.clone()
            };
        }
        Ok(())
    }

    async fn delete_one(&self, id: ObjectId) -> Result<u64> {
        Ok(self.items.write().remove(&id).map_or(0, |_| 1))
    }

    async fn find_all(&self) -> Result<BlogCursor> {
        let snapshot: Vec<BlogItem> = self.items.read().values().cloned().collect();
        Ok(futures::stream::iter(snapshot.into_iter().map(Ok)).boxed())
    }

    async fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn item(title: &str) -> BlogItem {
        BlogItem {
            id: None,
            author_id: "Bruce".to_string(),
            content: "Content".to_string(),
            title: title.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_assigns_object_ids() {
        let store = MemoryBlogStore::new();
        let a = store.insert_one(&item("a")).await.unwrap();
        let b = store.insert_one(&item("b")).await.unwrap();

        let a = a.as_object_id().unwrap();
        let b = b.as_object_id().unwrap();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
        assert_eq!(store.find_one(a).await.unwrap().unwrap().id, Some(a));
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_ids() {
        let store = MemoryBlogStore::new();
        let id = ObjectId::new();
        let with_id = BlogItem {
            id: Some(id),
            ..item("a")
        };
        store.insert_one(&with_id).await.unwrap();
        assert!(matches!(
            store.insert_one(&with_id).await,
            Err(Error::Storage { .. })
        ));
    }

    #[tokio::test]
    async fn replace_never_inserts() {
        let store = MemoryBlogStore::new();
        store.replace_one(ObjectId::new(), &item("ghost")).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn replace_keeps_the_key_identifier() {
        let store = MemoryBlogStore::new();
        let id = store.insert_one(&item("a")).await.unwrap().as_object_id().unwrap();
        let stray = BlogItem {
            id: Some(ObjectId::new()),
            ..item("b")
        };
        store.replace_one(id, &stray).await.unwrap();

        let stored = store.find_one(id).await.unwrap().unwrap();
        assert_eq!(stored.id, Some(id));
        assert_eq!(stored.title, "b");
    }

    #[tokio::test]
    async fn delete_reports_count() {
        let store = MemoryBlogStore::new();
        let id = store.insert_one(&item("a")).await.unwrap().as_object_id().unwrap();
        assert_eq!(store.delete_one(id).await.unwrap(), 1);
        assert_eq!(store.delete_one(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn find_all_is_a_snapshot() {
        let store = MemoryBlogStore::new();
        store.insert_one(&item("a")).await.unwrap();
        let cursor = store.find_all().await.unwrap();
        store.insert_one(&item("b")).await.unwrap();

        let listed: Vec<BlogItem> = cursor.try_collect().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "a");
    }
}
