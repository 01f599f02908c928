//! ---
//! pmig_section: "05-networking-external-interfaces"
//! pmig_subsection: "build"
//! pmig_type: "source"
//! pmig_scope: "build"
//! pmig_description: "Generates the ProcessManager gRPC bindings."
//! pmig_version: "v0.1.0"
//! pmig_owner: "tbd"
//! ---
fn main() {
    let protoc = protoc_bin_vendored::protoc_bin_path().expect("failed to locate protoc");
    std::env::set_var("PROTOC", protoc);

    println!("cargo:rerun-if-changed=proto/process.proto");
    println!("cargo:rerun-if-changed=proto");

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile(&["proto/process.proto"], &["proto"])
        .expect("failed to compile gRPC definitions");
}
