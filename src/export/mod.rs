use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::api::{ApiClient, ApiError, ExportBlob, Resource};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("refusing to overwrite existing file {path} (use --force)")]
    Exists { path: String },

    #[error("server returned an empty export")]
    Empty,

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A target names a directory when it already is one or ends with a path
/// separator, as in `--out ./reports/`.
fn is_directory_target(path: &Path) -> bool {
    path.is_dir() || path.to_string_lossy().ends_with(std::path::is_separator)
}

/// Work out where an export should land.
///
/// `target` may be a directory (the server's file name, or a per-resource
/// default, is used inside it) or a file path. No target means the current
/// directory.
pub fn resolve_target(target: Option<&Path>, resource: Resource, blob: &ExportBlob) -> PathBuf {
    let file_name = blob
        .file_name
        .clone()
        .unwrap_or_else(|| resource.default_export_name());
    match target {
        Some(path) if is_directory_target(path) => path.join(file_name),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(file_name),
    }
}

pub async fn save_blob(blob: &ExportBlob, path: &Path, force: bool) -> Result<u64, ExportError> {
    if blob.bytes.is_empty() {
        return Err(ExportError::Empty);
    }
    let display = path.display().to_string();
    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let mut file = options.open(path).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::AlreadyExists {
            ExportError::Exists {
                path: display.clone(),
            }
        } else {
            ExportError::Write {
                path: display.clone(),
                source,
            }
        }
    })?;
    file.write_all(&blob.bytes)
        .await
        .map_err(|source| ExportError::Write {
            path: display.clone(),
            source,
        })?;
    file.flush().await.map_err(|source| ExportError::Write {
        path: display,
        source,
    })?;
    Ok(blob.bytes.len() as u64)
}

fn download_spinner(resource: Resource) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(120));
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.blue} {elapsed} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(format!("downloading {resource} export"));
    pb
}

/// Download a resource export and write it to disk.
pub async fn export_to_file(
    client: &ApiClient,
    resource: Resource,
    target: Option<&Path>,
    force: bool,
) -> Result<PathBuf, ExportError> {
    if let Some(path) = target {
        if is_directory_target(path) {
            tokio::fs::create_dir_all(path)
                .await
                .map_err(|source| ExportError::Write {
                    path: path.display().to_string(),
                    source,
                })?;
        } else if !force && path.exists() {
            // file name is fixed, refuse before downloading
            return Err(ExportError::Exists {
                path: path.display().to_string(),
            });
        }
    }

    let pb = download_spinner(resource);
    let blob = client
        .export(resource, |received| {
            pb.set_message(format!("downloading {resource} export ({received} bytes)"))
        })
        .await;
    pb.finish_and_clear();
    let blob = blob?;

    let path = resolve_target(target, resource, &blob);
    let written = save_blob(&blob, &path, force).await?;
    info!(%resource, path = %path.display(), bytes = written, "export saved");
    Ok(path)
}
