//! Downloaded build artifacts and the remote marker-file convention.

use std::path::PathBuf;

/// A downloaded deployment bundle.
///
/// The package name is discovered, not predicted: the remote build
/// assigns a timestamp suffix and reports it through the marker file.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub package_name: String,
    pub local_path: PathBuf,
    pub byte_size: u64,
}

/// Parse the package name out of marker-file content.
///
/// The marker is plain `KEY=value` lines; only `PACKAGE_NAME` matters.
/// The value becomes a local file name, so anything that could escape
/// the download directory (path separators, `..`) is rejected outright
/// and treated like a missing marker.
#[must_use]
pub fn parse_package_name(marker: &str) -> Option<String> {
    marker.lines().find_map(|line| {
        line.trim()
            .strip_prefix("PACKAGE_NAME=")
            .map(str::trim)
            .filter(|name| is_plain_file_name(name))
            .map(str::to_owned)
    })
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && !name.contains("..")
}
