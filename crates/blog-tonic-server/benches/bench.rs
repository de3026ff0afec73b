use core::{fmt, hint::black_box};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use blog_tonic_core::proto::{
    Blog, CreateBlogRequest, ListBlogRequest, ReadBlogRequest,
    blog_service_client::BlogServiceClient,
};

use futures::stream::FuturesUnordered;
use std::{
    net::TcpStream,
    process::{Command, Stdio},
    thread,
    time::{Duration, Instant},
};
use tokio::runtime::Builder;
use tokio_stream::StreamExt;
use tonic::{
    codec::CompressionEncoding,
    transport::{Channel, Uri},
};

#[derive(Clone, Copy, Debug)]
enum Compression {
    None,
    Deflate,
    Gzip,
    Zstd,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Deflate => write!(f, "deflate"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

impl From<Compression> for Option<CompressionEncoding> {
    fn from(value: Compression) -> Self {
        match value {
            Compression::None => None,
            Compression::Deflate => Some(CompressionEncoding::Deflate),
            Compression::Gzip => Some(CompressionEncoding::Gzip),
            Compression::Zstd => Some(CompressionEncoding::Zstd),
        }
    }
}

const COMPRESSION_CASES: [Compression; 4] = [
    Compression::None,
    Compression::Zstd,
    Compression::Gzip,
    Compression::Deflate,
];

fn client(channel: &Channel, compression: Compression) -> BlogServiceClient<Channel> {
    let mut client = BlogServiceClient::new(channel.clone());
    if let Some(encoding) = compression.into() {
        client = client.accept_compressed(encoding).send_compressed(encoding);
    }
    client
}

fn sample_blog(n: u64) -> Blog {
    Blog {
        id: String::new(),
        author_id: format!("author-{n}"),
        title: format!("Benchmark blog #{n}"),
        content: "Lorem ipsum dolor sit amet, consectetur adipiscing elit. ".repeat(16),
    }
}

fn grpc_bench(c: &mut Criterion) {
    let uri = Uri::try_from("http://127.0.0.1:50051").expect("Invalid URI");
    // Start the server. This may require a full compilation so set the timeout
    // high. The in-memory store keeps the numbers about the RPC path rather
    // than a MongoDB deployment.
    let mut server = Command::new("cargo")
        .args([
            "run",
            "--bin",
            "blog-server",
            "--release",
            "--features",
            "tracing",
            "--",
            "--store",
            "memory",
            "--server-addr",
            "127.0.0.1:50051",
        ])
        .env("RUST_LOG", "warn")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("Failed to start blog-server");
    wait_for_port(uri.authority().expect("missing authority").as_str(), 300);

    let rt = Builder::new_multi_thread().enable_all().build().unwrap();
    let channel = rt.block_on(async {
        Channel::builder(uri.clone())
            .connect()
            .await
            .expect("Failed to connect to server")
    });

    bench_list_blog(c, &rt, &channel);
    bench_create_read(c, &rt, &channel);

    if server.kill().is_err() {
        eprintln!("failed to kill server");
    }
}

/// Streams the whole collection. Sizes are ascending so each case only seeds
/// the difference.
fn bench_list_blog(c: &mut Criterion, rt: &tokio::runtime::Runtime, channel: &Channel) {
    let list_size_cases = [100_u64, 1_000, 10_000];
    let mut seeded = 0;

    for &list_size in &list_size_cases {
        rt.block_on(seed(channel, seeded, list_size));
        seeded = list_size;

        let mut group = c.benchmark_group("grpc/list_blog");
        group.throughput(Throughput::Elements(list_size));

        for compression in COMPRESSION_CASES {
            group.bench_function(format!("elems/{list_size}/comp/{compression}"), |b| {
                b.to_async(rt).iter(|| async move {
                    let mut stream = client(channel, compression)
                        .list_blog(ListBlogRequest {})
                        .await
                        .expect("stream call failed")
                        .into_inner();

                    let mut received = 0_u64;
                    while let Some(resp) = stream.next().await {
                        black_box(resp.expect("resp").blog);
                        received += 1;
                    }
                    assert!(received >= list_size, "short stream: {received}");
                });
            });
        }

        group.finish();
    }
}

/// One create followed by a read of the same blog, `concurrency` at a time.
fn bench_create_read(c: &mut Criterion, rt: &tokio::runtime::Runtime, channel: &Channel) {
    let concurrency_cases = [1_usize, 4, 16, 64];

    for &concurrency in &concurrency_cases {
        let mut group = c.benchmark_group("grpc/create_read");
        group.throughput(Throughput::Elements(concurrency as u64));

        for compression in COMPRESSION_CASES {
            group.bench_function(format!("conc/{concurrency}/comp/{compression}"), |b| {
                b.to_async(rt).iter_custom(|iters| async move {
                    let start = Instant::now();
                    for _ in 0..iters {
                        run_create_read(channel, concurrency, compression).await;
                    }
                    start.elapsed()
                });
            });
        }

        group.finish();
    }
}

async fn run_create_read(channel: &Channel, concurrency: usize, compression: Compression) {
    let mut tasks = FuturesUnordered::new();

    for n in 0..concurrency {
        let mut client = client(channel, compression);
        tasks.push(tokio::spawn(async move {
            let created = client
                .create_blog(CreateBlogRequest {
                    blog: Some(sample_blog(n as u64)),
                })
                .await
                .expect("create failed")
                .into_inner()
                .blog
                .expect("created blog");

            let read = client
                .read_blog(ReadBlogRequest {
                    blog_id: created.id.clone(),
                })
                .await
                .expect("read failed")
                .into_inner()
                .blog
                .expect("read blog");
            assert_eq!(read.id, created.id);
            black_box(read);
        }));
    }

    // Wait for all tasks to complete
    while let Some(res) = tasks.next().await {
        res.unwrap();
    }
}

async fn seed(channel: &Channel, from: u64, to: u64) {
    let mut client = client(channel, Compression::None);
    for n in from..to {
        client
            .create_blog(CreateBlogRequest {
                blog: Some(sample_blog(n)),
            })
            .await
            .expect("seed create failed");
    }
}

pub fn wait_for_port(addr: &str, timeout_secs: u64) {
    let start = Instant::now();
    while start.elapsed().as_secs() < timeout_secs {
        if TcpStream::connect(addr).is_ok() {
            return;
        }
        thread::sleep(Duration::from_millis(100));
    }
    panic!("Server did not start listening on {}", addr);
}

criterion_group!(grpc_benches, grpc_bench);
criterion_main!(grpc_benches);
