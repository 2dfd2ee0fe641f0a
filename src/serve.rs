//! Download endpoint for the produced datasets.
//!
//! A small read-only HTTP surface over the data directory: `GET /` lists
//! the CSV files available, `GET /files/:name` downloads one as an
//! attachment. Only plain `.csv` filenames directly inside the data
//! directory are served; anything with a path separator is rejected before
//! it touches the filesystem.

use axum::extract::{Path as UrlPath, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::shutdown::SharedShutdown;

/// Serve errors.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// Failed to bind the listen address
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested listen address
        addr: SocketAddr,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server terminated abnormally
    #[error("server error: {0}")]
    Server(std::io::Error),
}

#[derive(Clone)]
struct AppState {
    data_dir: Arc<PathBuf>,
}

/// One downloadable file in the listing.
#[derive(Debug, Serialize)]
struct FileEntry {
    name: String,
    size_bytes: u64,
}

/// Build the application router over `data_dir`.
pub fn router(data_dir: impl Into<PathBuf>) -> Router {
    let state = AppState {
        data_dir: Arc::new(data_dir.into()),
    };
    Router::new()
        .route("/", get(list_files))
        .route("/files/:name", get(download_file))
        .with_state(state)
}

/// Serve the data directory on `addr` until shutdown is requested.
pub async fn serve(
    data_dir: impl Into<PathBuf>,
    addr: SocketAddr,
    shutdown: SharedShutdown,
) -> Result<(), ServeError> {
    let data_dir = data_dir.into();
    info!(%addr, data_dir = %data_dir.display(), "Starting download server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;

    axum::serve(listener, router(data_dir))
        .with_graceful_shutdown(async move { shutdown.wait_for_shutdown().await })
        .await
        .map_err(ServeError::Server)?;

    info!("Download server stopped");
    Ok(())
}

/// `GET /` - sorted listing of the CSV files in the data directory.
async fn list_files(State(state): State<AppState>) -> Json<Vec<FileEntry>> {
    let mut entries = Vec::new();

    if let Ok(read_dir) = std::fs::read_dir(state.data_dir.as_ref()) {
        for entry in read_dir.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".csv") {
                continue;
            }
            let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
            entries.push(FileEntry { name, size_bytes });
        }
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Json(entries)
}

/// `GET /files/:name` - download one CSV as an attachment.
async fn download_file(
    State(state): State<AppState>,
    UrlPath(name): UrlPath<String>,
) -> Response {
    if !is_safe_name(&name) {
        warn!(%name, "Rejected unsafe download name");
        return (StatusCode::BAD_REQUEST, "invalid file name").into_response();
    }

    let path = state.data_dir.join(&name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            let disposition = format!("attachment; filename=\"{name}\"");
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response()
        }
        Err(_) => (StatusCode::NOT_FOUND, "file not found").into_response(),
    }
}

/// A servable name is a bare `.csv` filename with no path structure.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name.ends_with(".csv")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
        && !name.starts_with('.')
}
