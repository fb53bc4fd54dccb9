// packages/engine/build.rs
//! Build script for compiling the LND Protocol Buffer definitions

use std::io::Result;

const PROTOS: &[&str] = &[
    "proto/lightning.proto",
    "proto/router.proto",
    "proto/chainnotifier.proto",
];

fn main() -> Result<()> {
    // The engine only talks to LND as a client
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile(PROTOS, &["proto"])?;

    // Recompile if proto files change
    for proto in PROTOS {
        println!("cargo:rerun-if-changed={}", proto);
    }

    Ok(())
}
