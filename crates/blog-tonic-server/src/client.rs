//! Demo client: drives one create → read → update → delete → list round
//! against a running `blog-server`.

use blog_tonic_core::proto::{
    Blog, CreateBlogRequest, DeleteBlogRequest, ListBlogRequest, ReadBlogRequest,
    UpdateBlogRequest, blog_service_client::BlogServiceClient,
};
use clap::Parser;
use core::time::Duration;
use tokio_stream::StreamExt;
use tonic::{Request, codec::CompressionEncoding, transport::Channel};

#[derive(Parser, Debug)]
#[command(name = "blog-client", version, about = "Exercise every BlogService call once")]
struct ClientArgs {
    /// Server URI.
    ///
    /// Environment variable: `BLOG_SERVER_URI`
    #[arg(long, env = "BLOG_SERVER_URI", default_value_t = String::from("http://127.0.0.1:50051"))]
    server_addr: String,

    /// Deadline sent with every call, in milliseconds.
    #[arg(long, env = "BLOG_CLIENT_TIMEOUT_MS", default_value_t = 10_000)]
    timeout_ms: u64,
}

/// Wraps `msg` with a `grpc-timeout` so the server stops working on it once
/// the client has given up.
fn with_deadline<T>(msg: T, timeout: Duration) -> Request<T> {
    let mut req = Request::new(msg);
    req.set_timeout(timeout);
    req
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = ClientArgs::parse();
    let timeout = Duration::from_millis(args.timeout_ms);

    println!("Blog Client");
    let mut client = BlogServiceClient::connect(args.server_addr)
        .await?
        .accept_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Zstd);

    let blog = create(&mut client, timeout).await?;
    println!("Blog has been created: {blog:?}");

    match read(&mut client, &blog.id, timeout).await {
        Ok(blog) => println!("Blog was read: {blog:?}"),
        Err(e) => println!("Error happened while reading: {e}"),
    }

    let edited = Blog {
        id: blog.id.clone(),
        author_id: "Changed Author".to_string(),
        title: "My First Blog (edited)".to_string(),
        content: "Content of the first blog, with some awesome additions".to_string(),
    };
    match update(&mut client, edited, timeout).await {
        Ok(blog) => println!("Blog was updated: {blog:?}"),
        Err(e) => println!("Error happened while updating: {e}"),
    }

    match delete(&mut client, &blog.id, timeout).await {
        Ok(id) => println!("Blog was deleted: {id}"),
        Err(e) => println!("Error happened while deleting: {e}"),
    }

    list(&mut client, timeout).await
}

async fn create(client: &mut BlogServiceClient<Channel>, timeout: Duration) -> anyhow::Result<Blog> {
    println!("Creating the blog");
    let req = CreateBlogRequest {
        blog: Some(Blog {
            id: String::new(),
            author_id: "Bruce".to_string(),
            title: "My First Blog".to_string(),
            content: "Content of the first blog".to_string(),
        }),
    };
    let res = client.create_blog(with_deadline(req, timeout)).await?;
    res.into_inner()
        .blog
        .ok_or_else(|| anyhow::anyhow!("server returned no blog"))
}

async fn read(
    client: &mut BlogServiceClient<Channel>,
    id: &str,
    timeout: Duration,
) -> Result<Option<Blog>, tonic::Status> {
    println!("Reading the blog");
    let req = ReadBlogRequest {
        blog_id: id.to_string(),
    };
    Ok(client.read_blog(with_deadline(req, timeout)).await?.into_inner().blog)
}

async fn update(
    client: &mut BlogServiceClient<Channel>,
    blog: Blog,
    timeout: Duration,
) -> Result<Option<Blog>, tonic::Status> {
    println!("Updating the blog");
    let req = UpdateBlogRequest { blog: Some(blog) };
    Ok(client.update_blog(with_deadline(req, timeout)).await?.into_inner().blog)
}

async fn delete(
    client: &mut BlogServiceClient<Channel>,
    id: &str,
    timeout: Duration,
) -> Result<String, tonic::Status> {
    println!("Deleting the blog");
    let req = DeleteBlogRequest {
        blog_id: id.to_string(),
    };
    Ok(client.delete_blog(with_deadline(req, timeout)).await?.into_inner().blog_id)
}

async fn list(client: &mut BlogServiceClient<Channel>, timeout: Duration) -> anyhow::Result<()> {
    println!("Listing blogs");
    let mut stream = client
        .list_blog(with_deadline(ListBlogRequest {}, timeout))
        .await?
        .into_inner();

    while let Some(res) = stream.next().await {
        if let Some(blog) = res?.blog {
            println!("{blog:?}");
        }
    }
    Ok(())
}
