//! gRPC service implementation for blog CRUD.
//!
//! This module defines [`BloggerService`], the concrete implementation of the
//! [`BlogService`] gRPC service defined in the protobuf specification. Each
//! unary call is a direct request → storage call → response pipeline; the
//! list call hands a storage cursor to a background feeder task.
//!
//! ## Responsibilities
//!
//! - Parse wire identifiers, rejecting malformed ones before touching storage.
//! - Translate between [`Blog`] messages and stored [`BlogItem`]s.
//! - Map every failure onto exactly one gRPC status code.
//! - Stream `ListBlog` results with backpressure and cancel open streams on
//!   shutdown.
//!
//! Nothing is retried here: a storage failure reaches the caller as
//! `internal` on the first attempt.

use crate::server::{
    model::BlogItem,
    store::BlogStore,
    streaming::feeder::feed_blogs,
    telemetry::{
        decrement_streams_inflight, increment_errors, increment_requests,
        increment_streams_inflight, record_stream_duration,
    },
};
use blog_tonic_core::{
    Error,
    proto::{
        Blog, CreateBlogRequest, CreateBlogResponse, DeleteBlogRequest, DeleteBlogResponse,
        ListBlogRequest, ListBlogResponse, ReadBlogRequest, ReadBlogResponse, UpdateBlogRequest,
        UpdateBlogResponse, blog_service_server::BlogService,
    },
    types::parse_blog_id,
};
use core::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};

const CREATE: &str = "CreateBlog";
const READ: &str = "ReadBlog";
const UPDATE: &str = "UpdateBlog";
const DELETE: &str = "DeleteBlog";
const LIST: &str = "ListBlog";

fn missing_blog() -> Error {
    Error::InvalidRequest {
        reason: "Request is missing the `blog` field".to_string(),
    }
}

/// Converts a handler result into a gRPC response, recording failures.
///
/// Client errors (`invalid_argument`, `not_found`) are expected traffic and
/// logged at debug level; everything else is logged as an error.
fn respond<T>(method: &'static str, res: blog_tonic_core::Result<T>) -> Result<Response<T>, Status> {
    match res {
        Ok(msg) => Ok(Response::new(msg)),
        Err(err) => {
            let status = Status::from(err);
            increment_errors(method, status.code());
            #[cfg(feature = "tracing")]
            match status.code() {
                tonic::Code::InvalidArgument | tonic::Code::NotFound => {
                    tracing::debug!("{method} rejected: {}", status.message())
                }
                _ => tracing::error!("{method} failed: {}", status.message()),
            }
            Err(status)
        }
    }
}

/// gRPC CRUD service for blog posts.
///
/// Holds the injected storage capability and nothing else that is mutable;
/// clones share the same store and the same stream shutdown token, so the
/// service can be handed to the router and kept for shutdown.
#[derive(Clone)]
pub struct BloggerService {
    store: Arc<dyn BlogStore>,
    stream_buffer_size: usize,
    shutdown_token: CancellationToken,
}

impl BloggerService {
    /// Creates a service over `store`.
    ///
    /// `stream_buffer_size` bounds how many `ListBlog` messages may be queued
    /// ahead of a slow client.
    pub fn new(store: Arc<dyn BlogStore>, stream_buffer_size: usize) -> Self {
        Self {
            store,
            stream_buffer_size: stream_buffer_size.max(1),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// The storage capability this service was built with.
    pub fn store(&self) -> &Arc<dyn BlogStore> {
        &self.store
    }

    /// Ends every open `ListBlog` stream with `unavailable`. Unary calls are
    /// unaffected and run to completion.
    pub fn cancel_streams(&self) {
        self.shutdown_token.cancel();
    }

    async fn create(&self, req: CreateBlogRequest) -> blog_tonic_core::Result<CreateBlogResponse> {
        let item = BlogItem::from(req.blog.ok_or_else(missing_blog)?);

        let inserted = self.store.insert_one(&item).await?;
        let id = inserted.as_object_id().ok_or_else(|| Error::UnexpectedId {
            found: inserted.to_string(),
        })?;

        Ok(CreateBlogResponse {
            blog: Some(Blog::from(BlogItem { id: Some(id), ..item })),
        })
    }

    async fn read(&self, req: ReadBlogRequest) -> blog_tonic_core::Result<ReadBlogResponse> {
        let id = parse_blog_id(&req.blog_id)?;

        let item = self
            .store
            .find_one(id)
            .await?
            .ok_or(Error::NotFound { id: req.blog_id })?;

        Ok(ReadBlogResponse {
            blog: Some(item.into()),
        })
    }

    /// Fetches before replacing so that a missing blog is reported as
    /// `not_found` instead of being silently recreated. The two storage calls
    /// are not atomic.
    async fn update(&self, req: UpdateBlogRequest) -> blog_tonic_core::Result<UpdateBlogResponse> {
        let blog = req.blog.ok_or_else(missing_blog)?;
        let id = parse_blog_id(&blog.id)?;

        let mut item = self
            .store
            .find_one(id)
            .await?
            .ok_or_else(|| Error::NotFound {
                id: blog.id.clone(),
            })?;

        item.apply(blog);
        self.store.replace_one(id, &item).await?;

        Ok(UpdateBlogResponse {
            blog: Some(item.into()),
        })
    }

    async fn delete(&self, req: DeleteBlogRequest) -> blog_tonic_core::Result<DeleteBlogResponse> {
        let id = parse_blog_id(&req.blog_id)?;

        if self.store.delete_one(id).await? == 0 {
            return Err(Error::NotFound { id: req.blog_id });
        }

        Ok(DeleteBlogResponse {
            blog_id: req.blog_id,
        })
    }
}

#[tonic::async_trait]
impl BlogService for BloggerService {
    type ListBlogStream = Pin<Box<dyn Stream<Item = Result<ListBlogResponse, Status>> + Send>>;

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    async fn create_blog(
        &self,
        req: Request<CreateBlogRequest>,
    ) -> Result<Response<CreateBlogResponse>, Status> {
        increment_requests(CREATE);
        respond(CREATE, self.create(req.into_inner()).await)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(blog_id = %req.get_ref().blog_id)))]
    async fn read_blog(
        &self,
        req: Request<ReadBlogRequest>,
    ) -> Result<Response<ReadBlogResponse>, Status> {
        increment_requests(READ);
        respond(READ, self.read(req.into_inner()).await)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(blog_id = req.get_ref().blog.as_ref().map(|b| b.id.as_str())))
    )]
    async fn update_blog(
        &self,
        req: Request<UpdateBlogRequest>,
    ) -> Result<Response<UpdateBlogResponse>, Status> {
        increment_requests(UPDATE);
        respond(UPDATE, self.update(req.into_inner()).await)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(blog_id = %req.get_ref().blog_id)))]
    async fn delete_blog(
        &self,
        req: Request<DeleteBlogRequest>,
    ) -> Result<Response<DeleteBlogResponse>, Status> {
        increment_requests(DELETE);
        respond(DELETE, self.delete(req.into_inner()).await)
    }

    /// Streams every stored blog.
    ///
    /// Opening the cursor happens before the response starts, so an
    /// unreachable store fails the call outright. Faults after that end the
    /// stream with `internal` once the blogs already read have been sent.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    async fn list_blog(
        &self,
        _req: Request<ListBlogRequest>,
    ) -> Result<Response<Self::ListBlogStream>, Status> {
        let start = std::time::Instant::now();
        increment_requests(LIST);

        let cursor = respond(LIST, self.store.find_all().await)?.into_inner();

        let (resp_tx, resp_rx) =
            mpsc::channel::<Result<ListBlogResponse, Status>>(self.stream_buffer_size);

        increment_streams_inflight();
        let shutdown = self.shutdown_token.clone();
        let fut = async move {
            let res = feed_blogs(cursor, resp_tx, shutdown).await;
            decrement_streams_inflight();
            record_stream_duration(start.elapsed().as_millis() as f64);
            match res {
                Ok(_sent) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Streamed {} blogs", _sent);
                }
                Err(Error::RequestCancelled) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Client left before the stream ended");
                }
                Err(e) => {
                    increment_errors(LIST, Status::from(e.clone()).code());
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Error: {}", e);
                }
            }
        };
        #[cfg(feature = "tracing")]
        let fut = {
            use tracing::Instrument;
            fut.instrument(tracing::info_span!("streaming"))
        };

        tokio::spawn(fut);

        Ok(Response::new(Box::pin(ReceiverStream::new(resp_rx))))
    }
}
