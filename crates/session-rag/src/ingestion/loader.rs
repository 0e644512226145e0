//! Turns document references into loaded text segments

use crate::error::{Error, Result};
use crate::types::{DocumentReference, FileType, LoadedSegment};

use super::parser::FileParser;
use super::source::SourceResolver;

/// Loads one document reference at a time
pub struct DocumentLoader {
    resolver: SourceResolver,
}

impl DocumentLoader {
    /// Create a loader over the given source resolver
    pub fn new(resolver: SourceResolver) -> Self {
        Self { resolver }
    }

    /// Source resolver used by this loader
    pub fn resolver(&self) -> &SourceResolver {
        &self.resolver
    }

    /// Load a document and extract its text
    ///
    /// The extension decides the parser. Scratch copies of remote documents
    /// are removed before this returns, whatever the outcome.
    pub async fn load(&self, doc: &DocumentReference) -> Result<Vec<LoadedSegment>> {
        let name = doc.display_name();
        let extension = doc.extension().unwrap_or_default();
        let file_type = FileType::from_extension(&extension).ok_or_else(|| {
            Error::UnsupportedFormat {
                name: name.clone(),
                extension: if extension.is_empty() {
                    "(none)".to_string()
                } else {
                    extension.clone()
                },
            }
        })?;

        let source = self.resolver.materialize(doc, file_type.extension()).await?;
        let data = tokio::fs::read(source.path())
            .await
            .map_err(|e| Error::source_unavailable(&name, e.to_string()))?;
        drop(source);

        let parse_name = name.clone();
        let segments =
            tokio::task::spawn_blocking(move || FileParser::parse(file_type, &parse_name, &data))
                .await
                .map_err(|e| Error::load_failed(&name, format!("parser task failed: {}", e)))??;

        tracing::debug!(
            "Loaded {} ({}) into {} segment(s)",
            name,
            file_type.display_name(),
            segments.len()
        );

        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageLocation;

    fn loader(dir: &std::path::Path) -> DocumentLoader {
        let location = StorageLocation::under(dir);
        location.ensure().unwrap();
        DocumentLoader::new(SourceResolver::new(
            &location,
            reqwest::Client::new(),
            1024 * 1024,
        ))
    }

    #[tokio::test]
    async fn test_load_text_upload() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader(dir.path());
        std::fs::write(
            loader.resolver().upload_dir().join("1700000000-notes.txt"),
            "Paris is the capital of France.",
        )
        .unwrap();

        let doc = DocumentReference::new("/api/files/1700000000-notes.txt", "notes.txt");
        let segments = loader.load(&doc).await.unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].source_name, "notes.txt");
        assert!(segments[0].text.contains("Paris"));
    }

    #[tokio::test]
    async fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader(dir.path());

        let doc = DocumentReference::new("/api/files/sheet.xlsx", "sheet.xlsx");
        match loader.load(&doc).await.unwrap_err() {
            Error::UnsupportedFormat { name, extension } => {
                assert_eq!(name, "sheet.xlsx");
                assert_eq!(extension, "xlsx");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_extension() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader(dir.path());

        let doc = DocumentReference::new("/api/files/README", "README");
        let err = loader.load(&doc).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }
}
