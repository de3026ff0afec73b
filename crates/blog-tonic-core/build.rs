/// Builds the gRPC client and server code for the `blog.proto` definition
/// using `tonic-prost-build`.
///
/// The generated module exposes the `BlogService` server trait, the
/// `BlogServiceClient`, and every request/response message. A file descriptor
/// set is written next to the generated code so the server can expose gRPC
/// reflection.
///
/// # Files and Paths
///
/// - Proto file: `proto/blog.proto`
/// - Includes: `proto/`
/// - Descriptor: `$OUT_DIR/blog_descriptor.bin`
///
/// # Panics
///
/// Panics if code generation fails or `OUT_DIR` is unset.
use std::env;
use std::path::PathBuf;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let descriptor_path = out_dir.join("blog_descriptor.bin");

    let mut config = tonic_prost_build::Config::new();
    config.file_descriptor_set_path(&descriptor_path);

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/blog.proto"], &["proto"])
        .unwrap();

    println!("cargo:rerun-if-changed=proto/blog.proto");
}
