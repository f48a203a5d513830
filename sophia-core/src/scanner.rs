use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::frontmatter::parse_front_matter;
use crate::markdown::extract_meta;
use crate::site::{Doc, DocStore};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Invalid path: {}", .0.display())]
    InvalidPath(PathBuf),
    #[error("Invalid front matter in {}: {message}", path.display())]
    FrontMatter { path: PathBuf, message: String },
    #[error("Document id {id:?} is defined by both {} and {}", first.display(), second.display())]
    DuplicateId {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Builds the [`DocStore`] from a docs directory.
pub struct SiteScanner {
    source_dir: PathBuf,
}

impl SiteScanner {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source_dir: path.as_ref().to_path_buf(),
        }
    }

    pub fn scan(&self) -> Result<DocStore, ScanError> {
        tracing::info!(path = %self.source_dir.display(), "Scanning docs");

        let mut store = DocStore::new();
        for path in get_all_markdown_files(&self.source_dir)? {
            let doc = self.scan_doc(&path)?;
            let source = doc.source.clone();

            if let Some(previous) = store.insert(doc) {
                return Err(ScanError::DuplicateId {
                    id: previous.id,
                    first: previous.source,
                    second: source,
                });
            }
        }

        tracing::debug!(count = store.len(), "Scanned docs");
        Ok(store)
    }

    fn scan_doc(&self, path: &Path) -> Result<Doc, ScanError> {
        let relative_path = path
            .strip_prefix(&self.source_dir)
            .map_err(|_| ScanError::InvalidPath(path.to_path_buf()))?;
        let id = doc_id(relative_path).ok_or_else(|| ScanError::InvalidPath(path.to_path_buf()))?;

        let raw = std::fs::read_to_string(path)?;
        let (front_matter, body) =
            parse_front_matter(&raw).map_err(|e| ScanError::FrontMatter {
                path: relative_path.to_path_buf(),
                message: e.to_string(),
            })?;
        let meta = extract_meta(body);

        Ok(Doc {
            title: front_matter
                .title
                .or(meta.title)
                .unwrap_or_else(|| id.clone()),
            summary: front_matter.description.or(meta.summary),
            sidebar_label: front_matter.sidebar_label,
            source: relative_path.to_path_buf(),
            content: body.to_string(),
            id,
        })
    }
}

/// `search/hybrid-search.md` -> `search/hybrid-search`
fn doc_id(relative: &Path) -> Option<String> {
    let stem = relative.with_extension("");
    let parts: Vec<_> = stem
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "md" || ext == "mdx")
        .unwrap_or(false)
}

/// Files and directories starting with `_` or `.` are partials, not pages.
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('_') || name.starts_with('.'))
            .unwrap_or(false)
}

fn get_all_markdown_files<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>, ScanError> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
    {
        let entry = entry?;
        if entry.file_type().is_file() && is_markdown(entry.path()) {
            paths.push(entry.into_path());
        }
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn scans_nested_docs_by_id() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "intro.md", "# Introduction\n\nWelcome.");
        write(tmp.path(), "search/hybrid-search.md", "# Hybrid Search\n\nRRF.");
        write(tmp.path(), "_partial.md", "# Hidden");
        write(tmp.path(), ".drafts/wip.md", "# WIP");
        write(tmp.path(), "notes.txt", "ignored");

        let store = SiteScanner::new(tmp.path()).scan().unwrap();

        let ids: Vec<_> = store.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["intro", "search/hybrid-search"]);

        let hybrid = store.get("search/hybrid-search").unwrap();
        assert_eq!(hybrid.title, "Hybrid Search");
        assert_eq!(hybrid.summary.as_deref(), Some("RRF."));
        assert_eq!(hybrid.source, PathBuf::from("search/hybrid-search.md"));
    }

    #[test]
    fn front_matter_overrides_heading() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "api-reference.md",
            "---\ntitle: API\ndescription: Endpoints\nsidebar_label: Reference\n---\n# API Reference\n\nBody.",
        );

        let store = SiteScanner::new(tmp.path()).scan().unwrap();
        let doc = store.get("api-reference").unwrap();
        assert_eq!(doc.title, "API");
        assert_eq!(doc.summary.as_deref(), Some("Endpoints"));
        assert_eq!(doc.sidebar_label.as_deref(), Some("Reference"));
        assert!(doc.content.starts_with("# API Reference"));
    }

    #[test]
    fn untitled_doc_falls_back_to_id() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "python-client.md", "No heading here.");

        let store = SiteScanner::new(tmp.path()).scan().unwrap();
        assert_eq!(store.get("python-client").unwrap().title, "python-client");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "intro.md", "# A");
        write(tmp.path(), "intro.mdx", "# B");

        let err = SiteScanner::new(tmp.path()).scan().unwrap_err();
        assert!(matches!(err, ScanError::DuplicateId { ref id, .. } if id == "intro"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = TempDir::new().unwrap();
        assert!(SiteScanner::new(tmp.path().join("nope")).scan().is_err());
    }
}
