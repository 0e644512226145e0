//! Byte sources for document references
//!
//! Local references resolve inside the managed upload directory and are
//! borrowed as-is. Remote references are downloaded into a scratch file that
//! is removed once the materialized source is dropped.

use futures::StreamExt;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::config::StorageLocation;
use crate::error::{Error, Result};
use crate::types::DocumentReference;

/// URL prefix under which uploaded files are served
pub const LOCAL_FILES_PREFIX: &str = "/api/files/";

/// A document's bytes available at a filesystem path
#[derive(Debug)]
pub enum MaterializedSource {
    /// A file owned by the upload collaborator; never deleted here
    Borrowed(PathBuf),
    /// A scratch copy of a remote document, deleted on drop
    Scratch(NamedTempFile),
}

impl MaterializedSource {
    /// Path of the bytes
    pub fn path(&self) -> &Path {
        match self {
            Self::Borrowed(path) => path,
            Self::Scratch(file) => file.path(),
        }
    }

    /// Whether dropping this source deletes the file
    pub fn is_scratch(&self) -> bool {
        matches!(self, Self::Scratch(_))
    }
}

/// Resolves document references to readable files
pub struct SourceResolver {
    /// Managed upload directory
    upload_dir: PathBuf,
    /// Shared HTTP client for remote references
    client: reqwest::Client,
    /// Largest remote body accepted
    max_bytes: u64,
}

impl SourceResolver {
    /// Create a resolver for the given storage location
    pub fn new(location: &StorageLocation, client: reqwest::Client, max_bytes: u64) -> Self {
        Self {
            upload_dir: location.upload_dir.clone(),
            client,
            max_bytes,
        }
    }

    /// Managed upload directory
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Make the referenced bytes available on disk
    pub async fn materialize(
        &self,
        doc: &DocumentReference,
        extension: &str,
    ) -> Result<MaterializedSource> {
        let name = doc.display_name();
        let url = doc.url.trim();

        if url.starts_with("http://") || url.starts_with("https://") {
            return self.download(url, &name, extension).await;
        }
        if url.contains("://") {
            return Err(Error::source_unavailable(
                name,
                format!("unsupported URL scheme in '{}'", url),
            ));
        }

        let file_name = url.strip_prefix(LOCAL_FILES_PREFIX).unwrap_or(url);
        let path = self.resolve_local(file_name, &name).await?;
        Ok(MaterializedSource::Borrowed(path))
    }

    /// Resolve a file name inside the upload directory, rejecting anything
    /// that would escape it
    pub async fn resolve_local(&self, file_name: &str, display_name: &str) -> Result<PathBuf> {
        let relative = Path::new(file_name);
        if file_name.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::PathTraversal(file_name.to_string()));
        }

        let candidate = self.upload_dir.join(relative);
        let resolved = match tokio::fs::canonicalize(&candidate).await {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::source_unavailable(
                    display_name,
                    format!("local file not found: {}", file_name),
                ));
            }
            Err(e) => return Err(Error::source_unavailable(display_name, e.to_string())),
        };

        // Symlinks inside the upload directory may still point elsewhere
        let root = tokio::fs::canonicalize(&self.upload_dir).await?;
        if !resolved.starts_with(&root) {
            return Err(Error::PathTraversal(file_name.to_string()));
        }

        Ok(resolved)
    }

    /// Download a remote document into a scratch file
    async fn download(&self, url: &str, name: &str, extension: &str) -> Result<MaterializedSource> {
        tracing::debug!("Downloading {} from {}", name, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::source_unavailable(name, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::source_unavailable(
                name,
                format!("download failed: HTTP {}", status),
            ));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes {
                return Err(self.too_large(name, length));
            }
        }

        let file = tempfile::Builder::new()
            .prefix("session-rag-")
            .suffix(&format!(".{}", extension))
            .tempfile()?;
        let mut out = tokio::fs::File::from_std(file.reopen()?);

        let mut received: u64 = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk
                .map_err(|e| Error::source_unavailable(name, format!("download interrupted: {}", e)))?;
            received += chunk.len() as u64;
            if received > self.max_bytes {
                return Err(self.too_large(name, received));
            }
            out.write_all(&chunk).await?;
        }
        out.flush().await?;

        tracing::debug!("Downloaded {} ({} bytes)", name, received);
        Ok(MaterializedSource::Scratch(file))
    }

    fn too_large(&self, name: &str, size: u64) -> Error {
        Error::source_unavailable(
            name,
            format!("document exceeds {} bytes (got at least {})", self.max_bytes, size),
        )
    }
}
