//! File classification and input expansion.
//!
//! Classification is extension-only (case-insensitive); there is no content
//! sniffing or magic-byte checking. Directory inputs expand one level deep,
//! files only, with a concurrent stat per entry.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures::future::join_all;

use crate::error::PreconditionError;

/// Logical file type, decided from the extension alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Paginated document formats (pdf, doc, docx, ppt, pptx)
    Document,
    /// Markup text formats (html, htm)
    Markup,
    /// Anything else; rejected at pipeline entry
    Unsupported,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf" | "doc" | "docx" | "ppt" | "pptx") => Self::Document,
            Some("html" | "htm") => Self::Markup,
            _ => Self::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Markup => "markup",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// MIME type used for the upload leg.
pub fn mime_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// A classified input file with the metadata the workflow needs up front.
#[derive(Debug, Clone)]
pub struct ClassifiedFile {
    pub path: PathBuf,
    pub kind: FileKind,
    pub size_bytes: u64,
    /// Character count of the decoded content; only read for markup files
    pub char_count: Option<usize>,
}

/// Input expansion result, keeping the file/directory distinction so the
/// caller can map output paths accordingly.
#[derive(Debug)]
pub enum ExpandedInput {
    /// The input was a single file (classified even if unsupported; the
    /// pipeline reports that as a per-item failure)
    File(ClassifiedFile),
    /// The input was a directory; only supported direct children are kept
    Directory(Vec<ClassifiedFile>),
}

/// Classify a single file, reading its size and (for markup) its text length.
pub async fn classify_file(path: &Path) -> Result<ClassifiedFile, PreconditionError> {
    let meta = stat(path).await?;
    classify_with_size(path, meta.len()).await
}

async fn classify_with_size(path: &Path, size_bytes: u64) -> Result<ClassifiedFile, PreconditionError> {
    let kind = FileKind::from_path(path);
    let char_count = match kind {
        FileKind::Markup => {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| PreconditionError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            Some(text.chars().count())
        }
        _ => None,
    };

    Ok(ClassifiedFile {
        path: path.to_path_buf(),
        kind,
        size_bytes,
        char_count,
    })
}

/// Expand an input path into classified files.
///
/// A missing path is a fatal precondition error. Directories are expanded one
/// level deep: direct children only, files only, unsupported extensions
/// skipped. A directory with no processable files is also fatal.
pub async fn expand_input(input: &Path) -> Result<ExpandedInput, PreconditionError> {
    let meta = stat(input).await?;

    if meta.is_file() {
        return Ok(ExpandedInput::File(classify_file(input).await?));
    }

    let mut reader = tokio::fs::read_dir(input)
        .await
        .map_err(|source| PreconditionError::Io {
            path: input.to_path_buf(),
            source,
        })?;

    let mut children: Vec<PathBuf> = Vec::new();
    while let Some(entry) = reader
        .next_entry()
        .await
        .map_err(|source| PreconditionError::Io {
            path: input.to_path_buf(),
            source,
        })?
    {
        children.push(entry.path());
    }
    children.sort();

    // One concurrent stat per entry; subdirectories are not recursed into.
    let stats = join_all(children.iter().map(tokio::fs::metadata)).await;

    let mut files = Vec::new();
    for (path, meta) in children.into_iter().zip(stats) {
        let meta = match meta {
            Ok(meta) if meta.is_file() => meta,
            _ => continue,
        };
        if !FileKind::from_path(&path).is_supported() {
            continue;
        }
        files.push(classify_with_size(&path, meta.len()).await?);
    }

    if files.is_empty() {
        return Err(PreconditionError::EmptyBatch(input.to_path_buf()));
    }

    Ok(ExpandedInput::Directory(files))
}

async fn stat(path: &Path) -> Result<std::fs::Metadata, PreconditionError> {
    tokio::fs::metadata(path).await.map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            PreconditionError::InputMissing(path.to_path_buf())
        } else {
            PreconditionError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}
