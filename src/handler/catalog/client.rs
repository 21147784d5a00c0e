//! Catalog directory reader
//!
//! Reads catalog documents from disk. Missing documents map to
//! [`HandlerError::NotFound`], unreadable ones to `Io` and malformed ones to
//! `Parse`.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::handler::HandlerError;

/// Filesystem client for one catalog root
#[derive(Debug, Clone)]
pub struct CatalogClient {
    root: PathBuf,
}

impl CatalogClient {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn doc_path(&self, dir: &'static str, id: &str, ext: &str) -> Result<PathBuf, HandlerError> {
        // Ids name files directly, so they must stay a single path component
        if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
            return Err(HandlerError::not_found(dir, id));
        }
        Ok(self.root.join(dir).join(format!("{id}.{ext}")))
    }

    async fn read_file(&self, dir: &'static str, id: &str, ext: &str) -> Result<String, HandlerError> {
        let path = self.doc_path(dir, id, ext)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(HandlerError::not_found(dir, id)),
            Err(e) => Err(HandlerError::Io(format!("{}: {}", path.display(), e))),
        }
    }

    /// Read and decode `<root>/<dir>/<id>.json`.
    pub async fn document<T: DeserializeOwned>(
        &self,
        dir: &'static str,
        id: &str,
    ) -> Result<T, HandlerError> {
        let contents = self.read_file(dir, id, "json").await?;
        serde_json::from_str(&contents).map_err(|e| HandlerError::Parse(format!("{dir}/{id}: {e}")))
    }

    /// Read `<root>/transcript/<id>.lrc`.
    pub async fn transcript(&self, id: &str) -> Result<String, HandlerError> {
        self.read_file("transcript", id, "lrc").await
    }

    /// Every decodable document in `<root>/<dir>`, as `(id, document)`.
    ///
    /// Undecodable documents are logged and skipped.
    pub async fn documents<T: DeserializeOwned>(
        &self,
        dir: &'static str,
    ) -> Result<Vec<(String, T)>, HandlerError> {
        let path = self.root.join(dir);
        let mut entries = match tokio::fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HandlerError::Io(format!("{}: {}", path.display(), e))),
        };

        let mut docs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| HandlerError::Io(e.to_string()))?
        {
            let file = entry.path();
            if file.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = file.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            match self.document::<T>(dir, &id).await {
                Ok(doc) => docs.push((id, doc)),
                Err(e) => tracing::warn!(dir, id = %id, error = %e, "Skipping unreadable catalog document"),
            }
        }
        // Directory order is platform dependent
        docs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(docs)
    }
}
