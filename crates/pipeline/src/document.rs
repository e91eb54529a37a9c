//! Reading and writing the intermediate sync document.

use std::path::{Path, PathBuf};

use shopify_backup_core::SyncDocument;
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors reading or writing the sync document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read a sync document from disk.
///
/// # Errors
///
/// Returns `DocumentError::Io` if the file cannot be read and
/// `DocumentError::Json` if its contents are not a valid document.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn read_document(path: &Path) -> Result<SyncDocument, DocumentError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let document: SyncDocument =
        serde_json::from_slice(&bytes).map_err(|source| DocumentError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(
        products = document.products.len(),
        variants = document.variants.len(),
        locations = document.locations.len(),
        inventory = document.inventory.len(),
        sales = document.sales.len(),
        "Read sync document"
    );
    Ok(document)
}

/// Write a sync document as pretty-printed JSON.
///
/// The document is written to a sibling temp file and renamed into place,
/// so readers never see a half-written file.
///
/// # Errors
///
/// Returns `DocumentError` if serialization, the write or the rename fails.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn write_document(path: &Path, document: &SyncDocument) -> Result<(), DocumentError> {
    let json = serde_json::to_vec_pretty(document).map_err(|source| DocumentError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = temp_path(path);
    let io_err = |source: std::io::Error| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    };
    tokio::fs::write(&tmp, &json).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;

    debug!(bytes = json.len(), "Wrote sync document");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
