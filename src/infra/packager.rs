//! Builds the source bundle shipped to the build host.
//!
//! Walks the declared include paths, filters the exclude patterns, and
//! writes a gzip-compressed tar with a deterministic, sorted manifest.

use std::fs::File;
use std::path::Path;

use chrono::Local;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::application::ports::SourcePackager;
use crate::domain::source::is_excluded;
use crate::domain::{DeployError, SourceArchive, SourceSpec};

/// Packages a working tree into a tar.gz under the system temp dir.
pub struct TarGzPackager;

impl SourcePackager for TarGzPackager {
    async fn pack(&self, spec: &SourceSpec) -> Result<SourceArchive, DeployError> {
        let spec = spec.clone();
        tokio::task::spawn_blocking(move || pack_blocking(&spec))
            .await
            .map_err(|e| DeployError::Packaging(format!("packaging task panicked: {e}")))?
    }
}

/// Blocking implementation, also used directly by integration tests.
pub fn pack_blocking(spec: &SourceSpec) -> Result<SourceArchive, DeployError> {
    let manifest = collect_manifest(spec)?;

    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let path = std::env::temp_dir().join(format!("hygon-dcgm-exporter-source-{timestamp}.tar.gz"));

    let file = File::create(&path)
        .map_err(|e| DeployError::Packaging(format!("cannot create {}: {e}", path.display())))?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for rel in &manifest {
        builder
            .append_path_with_name(spec.root.join(rel), rel)
            .map_err(|e| DeployError::Packaging(format!("archiving {rel}: {e}")))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| DeployError::Packaging(format!("finalizing archive: {e}")))?;
    encoder
        .finish()
        .map_err(|e| DeployError::Packaging(format!("flushing archive: {e}")))?;

    let byte_size = std::fs::metadata(&path)
        .map_err(|e| DeployError::Packaging(format!("cannot stat {}: {e}", path.display())))?
        .len();
    let sha256 = sha256_file(&path)?;

    Ok(SourceArchive {
        path,
        byte_size,
        sha256,
        manifest,
    })
}

/// Resolves the include declarations to a sorted list of relative paths.
/// Declared paths that do not exist locally are skipped, but if none of
/// them exist the working tree is clearly not the expected project.
fn collect_manifest(spec: &SourceSpec) -> Result<Vec<String>, DeployError> {
    let mut manifest = Vec::new();
    let mut declared_found = 0usize;

    for dir in &spec.include_dirs {
        let root = spec.root.join(dir);
        if !root.is_dir() {
            continue;
        }
        declared_found += 1;
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry =
                entry.map_err(|e| DeployError::Packaging(format!("walking {dir}: {e}")))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&spec.root)
                .map_err(|e| DeployError::Packaging(format!("resolving {dir}: {e}")))?
                .to_string_lossy()
                .replace('\\', "/");
            if !is_excluded(&rel, &spec.exclude) {
                manifest.push(rel);
            }
        }
    }

    for file in &spec.include_files {
        if !spec.root.join(file).is_file() {
            continue;
        }
        declared_found += 1;
        if !is_excluded(file, &spec.exclude) {
            manifest.push(file.clone());
        }
    }

    if declared_found == 0 {
        return Err(DeployError::Packaging(format!(
            "none of the declared source paths exist under {}",
            spec.root.display()
        )));
    }

    manifest.sort();
    manifest.dedup();
    Ok(manifest)
}

fn sha256_file(path: &Path) -> Result<String, DeployError> {
    let mut file = File::open(path)
        .map_err(|e| DeployError::Packaging(format!("cannot reopen {}: {e}", path.display())))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)
        .map_err(|e| DeployError::Packaging(format!("hashing {}: {e}", path.display())))?;
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
