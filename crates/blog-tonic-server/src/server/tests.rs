//! End-to-end tests: `BlogService` served over loopback TCP and driven by the
//! generated client.

use crate::build_blog_service;
use crate::server::{service::handler::BloggerService, store::memory::MemoryBlogStore};
use blog_tonic_core::proto::{
    Blog, CreateBlogRequest, DeleteBlogRequest, ListBlogRequest, ReadBlogRequest,
    UpdateBlogRequest, blog_service_client::BlogServiceClient,
};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_stream::{StreamExt, wrappers::TcpListenerStream};
use tonic::{Code, codec::CompressionEncoding, transport::Channel, transport::Server};

struct TestServer {
    client: BlogServiceClient<Channel>,
    stop: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<Result<(), tonic::transport::Error>>,
}

async fn start() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let service = BloggerService::new(Arc::new(MemoryBlogStore::new()), 2);
    let (stop, stopped) = oneshot::channel::<()>();

    let handle = tokio::spawn(
        Server::builder()
            .add_service(build_blog_service(service))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                let _ = stopped.await;
            }),
    );

    let client = BlogServiceClient::connect(format!("http://{addr}"))
        .await
        .unwrap()
        .send_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Zstd);

    TestServer {
        client,
        stop,
        handle,
    }
}

impl TestServer {
    async fn stop(self) {
        drop(self.client);
        self.stop.send(()).unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

fn blog(author: &str, title: &str, content: &str) -> Blog {
    Blog {
        id: String::new(),
        author_id: author.to_string(),
        title: title.to_string(),
        content: content.to_string(),
    }
}

#[tokio::test]
async fn crud_round_trip_over_grpc() {
    let mut server = start().await;
    let client = &mut server.client;

    let created = client
        .create_blog(CreateBlogRequest {
            blog: Some(blog("Bruce", "My First Blog", "Content of the first blog")),
        })
        .await
        .unwrap()
        .into_inner()
        .blog
        .unwrap();
    assert_eq!(created.id.len(), 24);

    let read = client
        .read_blog(ReadBlogRequest {
            blog_id: created.id.clone(),
        })
        .await
        .unwrap()
        .into_inner()
        .blog
        .unwrap();
    assert_eq!(read, created);

    let edited = Blog {
        id: created.id.clone(),
        ..blog(
            "Changed Author",
            "My First Blog (edited)",
            "Content of the first blog, with some awesome additions",
        )
    };
    let updated = client
        .update_blog(UpdateBlogRequest {
            blog: Some(edited.clone()),
        })
        .await
        .unwrap()
        .into_inner()
        .blog
        .unwrap();
    assert_eq!(updated, edited);

    let deleted = client
        .delete_blog(DeleteBlogRequest {
            blog_id: created.id.clone(),
        })
        .await
        .unwrap()
        .into_inner()
        .blog_id;
    assert_eq!(deleted, created.id);

    let status = client
        .read_blog(ReadBlogRequest {
            blog_id: created.id.clone(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::NotFound);

    let status = client
        .read_blog(ReadBlogRequest {
            blog_id: "not-a-blog-id".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    server.stop().await;
}

#[tokio::test]
async fn list_streams_all_blogs_over_grpc() {
    let mut server = start().await;
    let client = &mut server.client;

    let empty: Vec<_> = client
        .list_blog(ListBlogRequest {})
        .await
        .unwrap()
        .into_inner()
        .collect()
        .await;
    assert!(empty.is_empty());

    let mut created = HashSet::new();
    for i in 0..5 {
        let blog = client
            .create_blog(CreateBlogRequest {
                blog: Some(blog("Bruce", &format!("Blog {i}"), "body")),
            })
            .await
            .unwrap()
            .into_inner()
            .blog
            .unwrap();
        created.insert(blog.id);
    }

    let mut stream = client
        .list_blog(ListBlogRequest {})
        .await
        .unwrap()
        .into_inner();
    let mut listed = HashSet::new();
    while let Some(msg) = stream.next().await {
        listed.insert(msg.unwrap().blog.unwrap().id);
    }
    assert_eq!(listed, created);

    drop(stream);
    server.stop().await;
}

#[cfg(unix)]
mod uds {
    use crate::bind_uds;
    use std::path::PathBuf;

    fn socket_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("blog-{name}-{}.sock", std::process::id()))
    }

    #[tokio::test]
    async fn rebinds_over_a_stale_socket() {
        let path = socket_path("stale");
        let _ = std::fs::remove_file(&path);
        let path_str = path.to_str().unwrap();

        // Dropping the listener leaves the socket file in place, as a crash
        // would.
        drop(tokio::net::UnixListener::bind(&path).unwrap());
        assert!(path.exists());

        let listener = bind_uds(path_str).unwrap();
        drop(listener);
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn leaves_regular_files_alone() {
        let path = socket_path("regular");
        std::fs::write(&path, b"not a socket").unwrap();

        assert!(bind_uds(path.to_str().unwrap()).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"not a socket");
        std::fs::remove_file(&path).unwrap();
    }
}
