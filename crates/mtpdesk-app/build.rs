//! Exposes the workspace `VERSION` file as `MTPDESK_VERSION`.

use std::env;
use std::fs;
use std::path::Path;

fn main() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo");
    let version_file = Path::new(&manifest_dir).join("../../VERSION");
    println!("cargo:rerun-if-changed={}", version_file.display());

    let contents = fs::read_to_string(&version_file)
        .unwrap_or_else(|error| panic!("cannot read {}: {error}", version_file.display()));
    let version = contents.trim();

    let numeric_parts = version
        .split('.')
        .filter(|part| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_digit()))
        .count();
    assert_eq!(
        numeric_parts, 3,
        "VERSION must be MAJOR.MINOR.PATCH, found {version:?}"
    );

    println!("cargo:rustc-env=MTPDESK_VERSION={version}");
}
