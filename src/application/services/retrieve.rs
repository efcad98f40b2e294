//! Artifact retriever — discovers the package name from the remote marker
//! file and downloads the bundle.

use std::path::Path;

use crate::application::ports::{ProgressReporter, SessionTransport};
use crate::domain::artifact::{Artifact, parse_package_name};
use crate::domain::build::{MARKER_FILE, PACKAGE_PREFIX};
use crate::domain::error::DeployError;

/// Fetch the built package from `remote_dir` into `download_dir`.
///
/// The package name is read from the marker file written by the package
/// stage. When the marker is missing or unreadable, the retriever warns
/// loudly and degrades to guessing the un-timestamped default name; if
/// that guess is also absent the run fails — a missing artifact after a
/// reported successful build is an inconsistency, not a shrug.
///
/// # Errors
///
/// Returns `DeployError::Retrieval` when the download directory cannot be
/// created or the named archive does not exist on the remote host.
pub async fn retrieve_artifact(
    transport: &impl SessionTransport,
    reporter: &impl ProgressReporter,
    remote_dir: &str,
    download_dir: &Path,
) -> Result<Artifact, DeployError> {
    let marker = transport
        .execute(&format!("cat {remote_dir}/{MARKER_FILE}"))
        .await?;

    let package_name = if marker.success() {
        parse_package_name(&marker.stdout)
    } else {
        None
    }
    .unwrap_or_else(|| {
        reporter.warn(&format!(
            "{MARKER_FILE} missing or unreadable, guessing default package name '{PACKAGE_PREFIX}'"
        ));
        PACKAGE_PREFIX.to_string()
    });

    std::fs::create_dir_all(download_dir).map_err(|e| {
        DeployError::Retrieval(format!(
            "cannot create download directory {}: {e}",
            download_dir.display()
        ))
    })?;

    let archive_name = format!("{package_name}.tar.gz");
    let remote_file = format!("{remote_dir}/{archive_name}");
    let local_path = download_dir.join(&archive_name);

    reporter.step(&format!("downloading {archive_name}"));
    transport
        .download(&remote_file, &local_path)
        .await
        .map_err(|e| {
            DeployError::Retrieval(format!(
                "package {archive_name} missing after a successful build report: {e}"
            ))
        })?;

    let byte_size = std::fs::metadata(&local_path)
        .map_err(|e| DeployError::Retrieval(format!("downloaded file unreadable: {e}")))?
        .len();

    reporter.success(&format!(
        "downloaded {} ({} bytes)",
        local_path.display(),
        byte_size
    ));

    Ok(Artifact {
        package_name,
        local_path,
        byte_size,
    })
}
