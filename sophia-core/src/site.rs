use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::Config;

/// Route prefix every document lives under.
pub const DOCS_ROUTE: &str = "docs";

/// One markdown document in the content store.
#[derive(Debug, Clone, PartialEq)]
pub struct Doc {
    /// Path relative to the docs directory, without extension, `/`-separated.
    pub id: String,
    /// First H1, falling back to the id.
    pub title: String,
    /// First paragraph as plain text.
    pub summary: Option<String>,
    /// Sidebar label set in front matter.
    pub sidebar_label: Option<String>,
    /// Source path relative to the docs directory.
    pub source: PathBuf,
    /// Markdown body with front matter removed.
    pub content: String,
}

/// All documents keyed by id. Ordered, so every walk over it is stable.
#[derive(Debug, Default, Clone)]
pub struct DocStore {
    docs: BTreeMap<String, Doc>,
}

impl DocStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a document, handing back any previous one with the same id.
    pub fn insert(&mut self, doc: Doc) -> Option<Doc> {
        self.docs.insert(doc.id.clone(), doc)
    }

    pub fn get(&self, id: &str) -> Option<&Doc> {
        self.docs.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.docs.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Doc> {
        self.docs.values()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl FromIterator<Doc> for DocStore {
    fn from_iter<T: IntoIterator<Item = Doc>>(iter: T) -> Self {
        let mut store = DocStore::new();
        for doc in iter {
            store.insert(doc);
        }
        store
    }
}

/// Maps site-relative routes such as `docs/intro` to hrefs and output files.
#[derive(Debug, Clone)]
pub struct Urls {
    base_url: String,
    trailing_slash: Option<bool>,
}

impl Urls {
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.base_url.clone(),
            trailing_slash: config.trailing_slash,
        }
    }

    /// Href of a page route. The empty route is the homepage.
    pub fn page(&self, route: &str) -> String {
        let route = route.trim_matches('/');
        if route.is_empty() {
            return self.base_url.clone();
        }

        match self.trailing_slash {
            Some(true) => format!("{}{}/", self.base_url, route),
            _ => format!("{}{}", self.base_url, route),
        }
    }

    /// Href of a static file.
    pub fn asset(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn doc_route(id: &str) -> String {
        format!("{DOCS_ROUTE}/{id}")
    }

    pub fn doc(&self, id: &str) -> String {
        self.page(&Self::doc_route(id))
    }

    /// Route of an internal `to` link (`/docs/quick-start` -> `docs/quick-start`).
    pub fn route_of(to: &str) -> String {
        let to = to.split(['#', '?']).next().unwrap_or_default();
        to.trim_matches('/').to_string()
    }

    /// Output file for a route, relative to the output directory.
    pub fn out_path(&self, route: &str) -> PathBuf {
        let route = route.trim_matches('/');
        if route.is_empty() {
            return PathBuf::from("index.html");
        }

        match self.trailing_slash {
            Some(false) => PathBuf::from(format!("{route}.html")),
            _ => PathBuf::from(route).join("index.html"),
        }
    }
}
