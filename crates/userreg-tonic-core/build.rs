/// Builds the gRPC client and server code for the `userreg.proto` definition
/// using `tonic-prost-build`.
///
/// The client stubs back the `userreg-client` binary. The server stubs are
/// only exercised by tests, which stand up an in-process service to play the
/// remote side of each call shape.
///
/// # Files and Paths
///
/// - Proto file: `proto/userreg.proto`
/// - Includes: `proto/`
///
/// # Panics
///
/// This function will `panic!` if code generation fails (for example when
/// `protoc` is not installed).
///
/// # Output
///
/// Generated code will be accessible in Rust via:
///
/// ```rust
/// pub mod proto {
///     tonic::include_proto!("userreg");
/// }
/// ```
fn main() {
    println!("cargo:rerun-if-changed=proto/userreg.proto");

    let config = tonic_prost_build::Config::new();

    tonic_prost_build::configure()
        .compile_with_config(config, &["proto/userreg.proto"], &["proto"])
        .unwrap();
}
