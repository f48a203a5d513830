use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::Datelike;
use serde::Serialize;
use tera::Context;
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::{Config, ConfigError};
use crate::homepage::HomePage;
use crate::layout::{Layout, STYLESHEET_PATH, internal_routes};
use crate::links::{BrokenLink, BrokenLinksError, LinkKind, enforce};
use crate::markdown::{Highlighter, LinkTarget, TocEntry};
use crate::scanner::{ScanError, SiteScanner};
use crate::sidebar::{GeneratedIndexPage, NavTree, SidebarError, Sidebars};
use crate::site::{Doc, DocStore, Urls};
use crate::template::{BUILTIN_STYLESHEET, TemplateError, TemplateRenderer};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Docs directory not specified")]
    MissingDocsDir,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sidebar(#[from] SidebarError),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    BrokenLinks(#[from] BrokenLinksError),
    #[error("Generated index /{route} has the same route as a document")]
    RouteConflict { route: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Static files error: {0}")]
    StaticFiles(#[from] walkdir::Error),
}

/// Directories a build reads from and writes to.
#[derive(Debug, Clone)]
pub struct SitePaths {
    pub docs: PathBuf,
    pub output: PathBuf,
    /// Templates overriding the built-in theme.
    pub theme: Option<PathBuf>,
    /// Copied verbatim into the output root.
    pub static_files: Option<PathBuf>,
}

pub struct SiteBuilder {
    config: Config,
    sidebars: Sidebars,
    docs_dir: Option<PathBuf>,
    output_dir: PathBuf,
    theme_dir: Option<PathBuf>,
    static_dir: Option<PathBuf>,
    year: Option<i32>,
}

impl Default for SiteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            sidebars: Sidebars::default(),
            docs_dir: None,
            output_dir: PathBuf::from("./build"),
            theme_dir: None,
            static_dir: None,
            year: None,
        }
    }

    // Required configuration
    pub fn docs_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.docs_dir = Some(path.as_ref().to_path_buf());
        self
    }

    // Optional paths
    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn theme_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.theme_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn static_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.static_dir = Some(path.as_ref().to_path_buf());
        self
    }

    // Site definition
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn sidebars(mut self, sidebars: Sidebars) -> Self {
        self.sidebars = sidebars;
        self
    }

    /// Year substituted into the copyright line. Defaults to the current year.
    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    // Build the site
    pub fn build(self) -> Result<Site, BuildError> {
        self.config.validate()?;
        let docs_dir = self.docs_dir.ok_or(BuildError::MissingDocsDir)?;

        let store = SiteScanner::new(&docs_dir).scan()?;
        if store.is_empty() {
            tracing::warn!(docs = %docs_dir.display(), "No markdown documents found");
        }
        let urls = Urls::new(&self.config);

        let mut navs = BTreeMap::new();
        for id in self.sidebars.ids() {
            navs.insert(id.to_string(), self.sidebars.resolve(id, &store, &urls)?);
        }

        let year = self.year.unwrap_or_else(|| chrono::Local::now().year());
        let layout = Layout::new(&self.config, &urls, &navs, year)?;

        // Create renderer with global context
        let mut renderer = TemplateRenderer::new(self.theme_dir.as_deref())?;
        renderer.add_to_context("site", &layout);

        let highlighter = Highlighter::new(&self.config.theme.prism);

        Ok(Site {
            config: self.config,
            store,
            navs,
            urls,
            renderer,
            highlighter,
            output_dir: self.output_dir,
            theme_dir: self.theme_dir,
            static_dir: self.static_dir,
        })
    }
}

/// What `doc.html` sees as `doc`.
#[derive(Serialize)]
struct DocView<'a> {
    title: &'a str,
    content: &'a str,
    toc: &'a [TocEntry],
    edit_url: Option<&'a str>,
}

/// Every output page keyed by its path under the output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSite {
    pub pages: BTreeMap<PathBuf, String>,
    /// Broken links that the configured policies let through.
    pub broken_links: Vec<BrokenLink>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub pages_written: usize,
    pub broken_links: Vec<BrokenLink>,
}

pub struct Site {
    config: Config,
    store: DocStore,
    navs: BTreeMap<String, NavTree>,
    urls: Urls,
    renderer: TemplateRenderer,
    highlighter: Highlighter,
    output_dir: PathBuf,
    theme_dir: Option<PathBuf>,
    static_dir: Option<PathBuf>,
}

impl Site {
    pub fn docs(&self) -> &DocStore {
        &self.store
    }

    pub fn navigation(&self, sidebar_id: &str) -> Option<&NavTree> {
        self.navs.get(sidebar_id)
    }

    fn known_routes(&self) -> BTreeSet<String> {
        let mut routes = BTreeSet::from([String::new()]);
        routes.extend(self.store.iter().map(|doc| Urls::doc_route(&doc.id)));
        for nav in self.navs.values() {
            routes.extend(nav.generated_indexes.iter().map(|i| i.route.clone()));
        }
        routes
    }

    /// Sidebar that lists `route`, if any. Sidebars are tried in id order.
    fn nav_for(&self, route: &str) -> Option<&NavTree> {
        self.navs.values().find(|nav| nav.contains_route(route))
    }

    fn canonical(&self, route: &str) -> String {
        format!("{}{}", self.config.url, self.urls.page(route))
    }

    fn check_site_links(&self, known: &BTreeSet<String>) -> Result<Vec<BrokenLink>, BuildError> {
        let mut broken: Vec<BrokenLink> = self
            .navs
            .values()
            .flat_map(|nav| nav.broken.iter().cloned())
            .collect();

        for (source, route) in internal_routes(&self.config) {
            if !known.contains(&route) {
                broken.push(BrokenLink {
                    source,
                    target: format!("/{route}"),
                });
            }
        }

        enforce(self.config.on_broken_links, LinkKind::Site, &broken)?;
        Ok(broken)
    }

    /// Renders every page in memory. Nothing is written.
    pub fn render_pages(&self) -> Result<RenderedSite, BuildError> {
        let known = self.known_routes();
        let mut broken_links = self.check_site_links(&known)?;
        let mut pages = BTreeMap::new();

        let home = HomePage::from_config(&self.config);
        pages.insert(
            self.urls.out_path(""),
            home.render(&self.renderer, &self.canonical(""))?,
        );

        let mut markdown_broken = Vec::new();
        for doc in self.store.iter() {
            let route = Urls::doc_route(&doc.id);
            let (html, broken) = self.render_doc(doc, &route, &known)?;
            markdown_broken.extend(broken.into_iter().map(|target| BrokenLink {
                source: format!("doc {}", doc.id),
                target,
            }));
            pages.insert(self.urls.out_path(&route), html);
        }
        enforce(
            self.config.on_broken_markdown_links,
            LinkKind::Markdown,
            &markdown_broken,
        )?;
        broken_links.extend(markdown_broken);

        for nav in self.navs.values() {
            for index in &nav.generated_indexes {
                let path = self.urls.out_path(&index.route);
                if pages.contains_key(&path) {
                    return Err(BuildError::RouteConflict {
                        route: index.route.clone(),
                    });
                }
                let html = self.render_generated_index(nav, index)?;
                pages.insert(path, html);
            }
        }

        let mut context = Context::new();
        context.insert("page_title", "Page Not Found");
        context.insert("description", "");
        context.insert("canonical", &self.canonical("404"));
        pages.insert(
            PathBuf::from("404.html"),
            self.renderer.render_with_context("404.html", &context)?,
        );

        Ok(RenderedSite {
            pages,
            broken_links,
        })
    }

    fn render_doc(
        &self,
        doc: &Doc,
        route: &str,
        known: &BTreeSet<String>,
    ) -> Result<(String, Vec<String>), BuildError> {
        let rendered = self
            .highlighter
            .render(&doc.content, |dest| self.resolve_link(doc, dest, known));

        let nav = self.nav_for(route);
        let edit_url = self.config.docs.edit_url.as_deref().map(|base| {
            format!(
                "{}/docs/{}",
                base.trim_end_matches('/'),
                source_path(&doc.source)
            )
        });

        let mut context = Context::new();
        context.insert("page_title", &doc.title);
        context.insert("description", doc.summary.as_deref().unwrap_or_default());
        context.insert("canonical", &self.canonical(route));
        context.insert(
            "doc",
            &DocView {
                title: &doc.title,
                content: &rendered.html,
                toc: &rendered.toc,
                edit_url: edit_url.as_deref(),
            },
        );
        context.insert("sidebar", &nav.map(|n| n.to_html(route)));
        context.insert(
            "pagination",
            &nav.map(|n| n.pagination(route)).unwrap_or_default(),
        );

        let html = self.renderer.render_with_context("doc.html", &context)?;
        Ok((html, rendered.broken_links))
    }

    fn render_generated_index(
        &self,
        nav: &NavTree,
        index: &GeneratedIndexPage,
    ) -> Result<String, BuildError> {
        let mut context = Context::new();
        context.insert("page_title", &index.title);
        context.insert(
            "description",
            index.description.as_deref().unwrap_or_default(),
        );
        context.insert("canonical", &self.canonical(&index.route));
        context.insert("index", index);
        context.insert("sidebar", &nav.to_html(&index.route));
        context.insert("pagination", &nav.pagination(&index.route));

        Ok(self.renderer.render_with_context("category.html", &context)?)
    }

    /// Maps a link written in `doc` to its final href.
    fn resolve_link(&self, doc: &Doc, dest: &str, known: &BTreeSet<String>) -> LinkTarget {
        if dest.starts_with('#') || dest.starts_with("//") || dest.contains(':') {
            return LinkTarget::Keep;
        }

        let (path, fragment) = match dest.find(['#', '?']) {
            Some(pos) => dest.split_at(pos),
            None => (dest, ""),
        };

        if let Some(target) = path
            .strip_suffix(".md")
            .or_else(|| path.strip_suffix(".mdx"))
        {
            let id = if let Some(absolute) = target.strip_prefix('/') {
                Some(absolute.to_string())
            } else {
                join_relative(parent_id(&doc.id), target)
            };

            return match id {
                Some(id) if self.store.contains(&id) => {
                    LinkTarget::Rewrite(format!("{}{}", self.urls.doc(&id), fragment))
                }
                _ => LinkTarget::Broken,
            };
        }

        if path.starts_with('/') {
            let route = Urls::route_of(path);
            if known.contains(&route) {
                return LinkTarget::Rewrite(format!("{}{}", self.urls.page(&route), fragment));
            }
            if Path::new(path).extension().is_some() {
                return LinkTarget::Rewrite(self.urls.asset(dest));
            }
            return LinkTarget::Broken;
        }

        LinkTarget::Keep
    }

    /// Renders the site and writes it to the output directory.
    pub fn render_all(&self) -> Result<BuildReport, BuildError> {
        let rendered = self.render_pages()?;

        std::fs::create_dir_all(&self.output_dir)?;
        for (path, html) in &rendered.pages {
            write_file(&self.output_dir.join(path), html.as_bytes())?;
        }

        let stylesheet = self
            .theme_dir
            .as_ref()
            .map(|dir| dir.join("style.css"))
            .filter(|path| path.is_file());
        let css_out = self.output_dir.join(STYLESHEET_PATH);
        match stylesheet {
            Some(path) => write_file(&css_out, &std::fs::read(path)?)?,
            None => write_file(&css_out, BUILTIN_STYLESHEET.as_bytes())?,
        }

        if let Some(dir) = self.static_dir.as_ref().filter(|d| d.is_dir()) {
            copy_dir(dir, &self.output_dir)?;
        }

        tracing::info!(
            pages = rendered.pages.len(),
            output = %self.output_dir.display(),
            "Site written"
        );

        Ok(BuildReport {
            pages_written: rendered.pages.len(),
            broken_links: rendered.broken_links,
        })
    }
}

/// Builds the site described by `config` and `sidebars` into `paths.output`.
pub fn build_site(
    config: &Config,
    sidebars: &Sidebars,
    paths: &SitePaths,
) -> Result<BuildReport, BuildError> {
    let mut builder = SiteBuilder::new()
        .config(config.clone())
        .sidebars(sidebars.clone())
        .docs_dir(&paths.docs)
        .output_dir(&paths.output);

    if let Some(theme) = &paths.theme {
        builder = builder.theme_dir(theme);
    }
    if let Some(static_files) = &paths.static_files {
        builder = builder.static_dir(static_files);
    }

    builder.build()?.render_all()
}

fn write_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)
}

fn copy_dir(from: &Path, to: &Path) -> Result<(), BuildError> {
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(from) else {
            continue;
        };
        let target = to.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(entry.path(), target)?;
    }
    Ok(())
}

/// `search/hybrid-search.md` with `/` separators on every platform.
fn source_path(source: &Path) -> String {
    source
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// `search/hybrid-search` -> `search`
fn parent_id(id: &str) -> &str {
    id.rsplit_once('/').map(|(parent, _)| parent).unwrap_or_default()
}

/// Resolves `./x` and `../x` segments of `target` against `base`.
fn join_relative(base: &str, target: &str) -> Option<String> {
    let mut parts: Vec<&str> = base.split('/').filter(|p| !p.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_ids_resolve_against_parent() {
        assert_eq!(
            join_relative("search", "./hybrid-search").as_deref(),
            Some("search/hybrid-search")
        );
        assert_eq!(join_relative("search", "../intro").as_deref(), Some("intro"));
        assert_eq!(join_relative("", "quick-start").as_deref(), Some("quick-start"));
        assert_eq!(join_relative("", "../outside"), None);
    }

    #[test]
    fn parent_of_top_level_id_is_empty() {
        assert_eq!(parent_id("intro"), "");
        assert_eq!(parent_id("sprints/sprint-8"), "sprints");
    }

    #[test]
    fn source_path_uses_forward_slashes() {
        assert_eq!(
            source_path(&PathBuf::from("search").join("hybrid-search.md")),
            "search/hybrid-search.md"
        );
    }

    #[test]
    fn build_requires_docs_dir() {
        assert!(matches!(
            SiteBuilder::new().build(),
            Err(BuildError::MissingDocsDir)
        ));
    }

    #[test]
    fn build_rejects_invalid_config() {
        let config = Config {
            base_url: "no-slashes".into(),
            ..Config::default()
        };
        assert!(matches!(
            SiteBuilder::new().config(config).docs_dir(".").build(),
            Err(BuildError::Config(_))
        ));
    }
}
