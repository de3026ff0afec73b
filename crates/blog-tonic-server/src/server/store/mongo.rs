//! MongoDB-backed [`BlogStore`].

use super::{BlogCursor, BlogStore};
use crate::server::{config::ServerConfig, model::BlogItem};
use blog_tonic_core::{Error, Result, types::ObjectId};
use bson::{Bson, doc};
use futures::{StreamExt, TryStreamExt};
use mongodb::{Client, Collection, error::ErrorKind, options::ClientOptions};

/// Maps a driver error onto the service taxonomy. Documents that do not
/// deserialize into a [`BlogItem`] are decode failures; everything else is a
/// storage failure.
fn map_err(op: &'static str, err: mongodb::error::Error) -> Error {
    if matches!(*err.kind, ErrorKind::BsonDeserialization(_)) {
        Error::Decode {
            context: format!("{op}: {err}"),
        }
    } else {
        Error::Storage {
            context: format!("{op}: {err}"),
        }
    }
}

/// A blog collection in a MongoDB deployment.
///
/// The driver's client pools connections internally; cloning this store is
/// cheap and every clone shares the same pool.
#[derive(Clone, Debug)]
pub struct MongoBlogStore {
    client: Client,
    collection: Collection<BlogItem>,
}

impl MongoBlogStore {
    /// Connects to the deployment named in `config`, verifies it answers a
    /// `ping`, and binds the blog collection.
    pub async fn connect(config: &ServerConfig) -> Result<Self> {
        let mut options = ClientOptions::parse(&config.mongodb_uri)
            .await
            .map_err(|e| map_err("parse MONGODB_URI", e))?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        options.connect_timeout = Some(config.connect_timeout);
        options.server_selection_timeout = Some(config.connect_timeout);

        #[cfg(feature = "tracing")]
        tracing::info!("Connecting to MongoDB at {:?}", options.hosts);

        let client = Client::with_options(options).map_err(|e| map_err("connect", e))?;
        let database = client.database(&config.mongodb_database);
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| map_err("ping", e))?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Connected to MongoDB collection '{}.{}'",
            config.mongodb_database,
            config.mongodb_collection
        );

        Ok(Self {
            collection: database.collection(&config.mongodb_collection),
            client,
        })
    }
}

#[async_trait::async_trait]
impl BlogStore for MongoBlogStore {
    async fn insert_one(&self, item: &BlogItem) -> Result<Bson> {
        let res = self
            .collection
            .insert_one(item)
            .await
            .map_err(|e| map_err("insert", e))?;
        Ok(res.inserted_id)
    }

    async fn find_one(&self, id: ObjectId) -> Result<Option<BlogItem>> {
        self.collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(|e| map_err("find", e))
    }

    async fn replace_one(&self, id: ObjectId, item: &BlogItem) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": id }, item)
            .await
            .map_err(|e| map_err("replace", e))?;
        Ok(())
    }

    async fn delete_one(&self, id: ObjectId) -> Result<u64> {
        let res = self
            .collection
            .delete_one(doc! { "_id": id })
            .await
            .map_err(|e| map_err("delete", e))?;
        Ok(res.deleted_count)
    }

    async fn find_all(&self) -> Result<BlogCursor> {
        let cursor = self
            .collection
            .find(doc! {})
            .await
            .map_err(|e| map_err("find", e))?;
        // The driver kills the server-side cursor when the stream is dropped.
        Ok(cursor.map_err(|e| map_err("cursor", e)).boxed())
    }

    async fn shutdown(&self) {
        #[cfg(feature = "tracing")]
        tracing::info!("Closing MongoDB connection");
        self.client.clone().shutdown().await;
    }
}
