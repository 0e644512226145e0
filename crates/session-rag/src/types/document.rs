//! Document references, loaded segments and chunks

use serde::{Deserialize, Serialize};

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Legacy Microsoft Word document (.doc), parsed with the .docx reader
    Doc,
    /// Plain text file
    Txt,
}

impl FileType {
    /// Detect file type from a lowercase or mixed-case extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Doc => "Word Document (.doc)",
            Self::Txt => "Text File",
        }
    }

    /// Canonical extension
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Doc => "doc",
            Self::Txt => "txt",
        }
    }
}

/// Reference to an uploaded document, produced by the upload collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
    /// `/api/files/<name>`, a file name inside the upload directory, or an
    /// `http(s)` URL
    pub url: String,
    /// Original file name
    #[serde(default)]
    pub name: Option<String>,
    /// MIME type reported at upload time
    #[serde(default, alias = "type")]
    pub mime_type: Option<String>,
    /// Size reported at upload time
    #[serde(default, alias = "size")]
    pub size_bytes: Option<u64>,
}

impl DocumentReference {
    /// Reference with a URL and a display name
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: Some(name.into()),
            mime_type: None,
            size_bytes: None,
        }
    }

    /// Name used in logs and errors: the given name, else the last URL path
    /// segment
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                let path = strip_query(&self.url);
                path.rsplit('/')
                    .find(|s| !s.is_empty())
                    .unwrap_or(path)
                    .to_string()
            }
        }
    }

    /// Lowercase extension used for loader dispatch: taken from the name when
    /// it has one, otherwise from the URL path
    pub fn extension(&self) -> Option<String> {
        self.name
            .as_deref()
            .and_then(extension_of)
            .or_else(|| extension_of(strip_query(&self.url)))
    }
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

fn extension_of(path: &str) -> Option<String> {
    let file = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Plain text extracted from one document, one per page for paginated formats
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSegment {
    /// Extracted text
    pub text: String,
    /// Display name of the source document
    pub source_name: String,
    /// Page number (1-indexed) for paginated formats
    pub page: Option<u32>,
}

impl LoadedSegment {
    /// Segment without page information
    pub fn whole(text: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_name: source_name.into(),
            page: None,
        }
    }

    /// Segment for a single page
    pub fn page(text: impl Into<String>, source_name: impl Into<String>, page: u32) -> Self {
        Self {
            text: text.into(),
            source_name: source_name.into(),
            page: Some(page),
        }
    }
}

/// Where a chunk came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkSource {
    /// Display name of the source document
    pub source_name: String,
    /// Page number (1-indexed) for paginated formats
    pub page: Option<u32>,
    /// Character offset of the chunk start within its segment
    pub char_start: usize,
    /// Character offset one past the chunk end within its segment
    pub char_end: usize,
    /// Position of the chunk in the index run
    pub chunk_index: u32,
}

/// A piece of text small enough to embed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text
    pub text: String,
    /// Source metadata
    pub source: ChunkSource,
}

impl Chunk {
    /// Number of characters in the chunk
    pub fn char_len(&self) -> usize {
        self.source.char_end - self.source.char_start
    }
}
