// build.rs

//! Stamps the binary with a build description for `--version` and the
//! startup log: the package version (or `IPPDME_VERSION` when packagers set
//! one), followed by the cargo profile and target triple.

use std::env;

const VERSION_OVERRIDE: &str = "IPPDME_VERSION";

fn cargo_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn main() {
    let version = cargo_var(VERSION_OVERRIDE)
        .or_else(|| cargo_var("CARGO_PKG_VERSION"))
        .unwrap_or_else(|| "dev".to_string());
    let profile = cargo_var("PROFILE").unwrap_or_else(|| "unknown".to_string());
    let target = cargo_var("TARGET").unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=IPPDME_BUILD_INFO={version} ({profile}, {target})");
    println!("cargo:rerun-if-env-changed={VERSION_OVERRIDE}");
    println!("cargo:rerun-if-changed=build.rs");
}
