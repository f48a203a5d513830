//! Sidebar navigation trees.
//!
//! A sidebar is an ordered forest of [`SidebarItem`]s read from
//! `sidebars.toml`. Items reference documents by id; nothing here checks that
//! those ids exist until [`Sidebars::resolve`] is run against a [`DocStore`],
//! which turns the tree into [`NavEntry`]s with labels and hrefs filled in and
//! reports every dangling reference as a [`BrokenLink`].
//!
//! ```toml
//! [[tutorialSidebar]]
//! type = "doc"
//! id = "intro"
//! label = "Introduction"
//!
//! [[tutorialSidebar]]
//! type = "category"
//! label = "Sprints"
//! items = ["sprints/sprint-8-qdrant-semantic-search"]
//! link = { type = "generated-index", title = "Sprint Documentation" }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::links::BrokenLink;
use crate::markdown::slugify;
use crate::site::{DOCS_ROUTE, DocStore, Urls};

#[derive(Debug, Error)]
pub enum SidebarError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parsing(#[from] toml::de::Error),
    #[error("Unknown sidebar: {0}")]
    UnknownSidebar(String),
}

/// One node of a sidebar tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawSidebarItem")]
pub enum SidebarItem {
    Doc(DocRef),
    Category(Category),
    Link(ExternalLink),
}

/// A bare string is shorthand for `{ type = "doc", id = "..." }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSidebarItem {
    Id(String),
    Tagged(TaggedSidebarItem),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedSidebarItem {
    Doc(DocRef),
    Category(Category),
    Link(ExternalLink),
}

impl From<RawSidebarItem> for SidebarItem {
    fn from(raw: RawSidebarItem) -> Self {
        match raw {
            RawSidebarItem::Id(id) => SidebarItem::doc(&id),
            RawSidebarItem::Tagged(TaggedSidebarItem::Doc(doc)) => SidebarItem::Doc(doc),
            RawSidebarItem::Tagged(TaggedSidebarItem::Category(category)) => {
                SidebarItem::Category(category)
            }
            RawSidebarItem::Tagged(TaggedSidebarItem::Link(link)) => SidebarItem::Link(link),
        }
    }
}

impl SidebarItem {
    pub fn doc(id: &str) -> Self {
        SidebarItem::Doc(DocRef {
            id: id.into(),
            label: None,
        })
    }

    pub fn labeled_doc(id: &str, label: &str) -> Self {
        SidebarItem::Doc(DocRef {
            id: id.into(),
            label: Some(label.into()),
        })
    }

    fn collect_doc_ids<'a>(&'a self, ids: &mut Vec<&'a str>) {
        match self {
            SidebarItem::Doc(doc) => ids.push(&doc.id),
            SidebarItem::Category(category) => {
                if let Some(CategoryLink::Doc { id }) = &category.link {
                    ids.push(id);
                }
                for item in &category.items {
                    item.collect_doc_ids(ids);
                }
            }
            SidebarItem::Link(_) => {}
        }
    }
}

/// Reference to a document in the content store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DocRef {
    pub id: String,
    /// Overrides the document's own title.
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Category {
    pub label: String,
    #[serde(default)]
    pub items: Vec<SidebarItem>,
    /// What clicking the category label opens. Without one the label only
    /// toggles the children.
    #[serde(default)]
    pub link: Option<CategoryLink>,
    #[serde(default = "default_true")]
    pub collapsible: bool,
    #[serde(default = "default_true")]
    pub collapsed: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CategoryLink {
    Doc { id: String },
    GeneratedIndex(GeneratedIndex),
}

/// Listing page rendered from a category's children.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedIndex {
    /// Defaults to the category label.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Path under `docs/`. Defaults to `/category/<slugified label>`.
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExternalLink {
    pub href: String,
    pub label: String,
}

/// Every sidebar of the site, keyed by sidebar id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Sidebars(BTreeMap<String, Vec<SidebarItem>>);

impl Sidebars {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, SidebarError> {
        let data = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&data)?)
    }

    pub fn get(&self, id: &str) -> Option<&[SidebarItem]> {
        self.0.get(id).map(Vec::as_slice)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Every referenced document id in tree order, sidebars sorted by id.
    pub fn doc_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        for item in self.0.values().flatten() {
            item.collect_doc_ids(&mut ids);
        }
        ids
    }

    /// Resolves one sidebar against the content store.
    ///
    /// Dangling document references are left out of the result and listed in
    /// [`NavTree::broken`]; what happens to them is up to the caller's link
    /// policy.
    pub fn resolve(
        &self,
        sidebar_id: &str,
        store: &DocStore,
        urls: &Urls,
    ) -> Result<NavTree, SidebarError> {
        let items = self
            .get(sidebar_id)
            .ok_or_else(|| SidebarError::UnknownSidebar(sidebar_id.to_string()))?;

        let mut resolver = Resolver {
            sidebar_id,
            store,
            urls,
            pages: Vec::new(),
            generated_indexes: Vec::new(),
            broken: Vec::new(),
        };
        let entries = resolver.resolve_items(items);

        Ok(NavTree {
            sidebar_id: sidebar_id.to_string(),
            entries,
            pages: resolver.pages,
            generated_indexes: resolver.generated_indexes,
            broken: resolver.broken,
        })
    }
}

impl Default for Sidebars {
    fn default() -> Self {
        let category = |label: &str, items: &[&str], link: Option<CategoryLink>| {
            SidebarItem::Category(Category {
                label: label.into(),
                items: items.iter().map(|id| SidebarItem::doc(id)).collect(),
                link,
                collapsible: true,
                collapsed: true,
            })
        };

        let tutorial = vec![
            SidebarItem::labeled_doc("intro", "Introduction"),
            SidebarItem::labeled_doc("quick-start", "Quick Start"),
            SidebarItem::labeled_doc("api-reference", "API Reference"),
            category(
                "Integration Guides",
                &["langgraph-integration", "python-client"],
                None,
            ),
            category(
                "Search Methods",
                &[
                    "search/semantic-search",
                    "search/keyword-search",
                    "search/hybrid-search",
                ],
                None,
            ),
            category(
                "Sprints",
                &[
                    "sprints/sprint-8-qdrant-semantic-search",
                    "sprints/sprint-9-opensearch-keyword-search",
                    "sprints/sprint-10-hybrid-search-retriever",
                    "sprints/sprint-11-search-result-formatting",
                ],
                Some(CategoryLink::GeneratedIndex(GeneratedIndex {
                    title: Some("Sprint Documentation".into()),
                    description: Some(
                        "Implementation sprints for the Sophia Library API".into(),
                    ),
                    slug: None,
                })),
            ),
        ];

        Self(BTreeMap::from([("tutorialSidebar".to_string(), tutorial)]))
    }
}

struct Resolver<'a> {
    sidebar_id: &'a str,
    store: &'a DocStore,
    urls: &'a Urls,
    pages: Vec<PageLink>,
    generated_indexes: Vec<GeneratedIndexPage>,
    broken: Vec<BrokenLink>,
}

impl Resolver<'_> {
    fn resolve_items(&mut self, items: &[SidebarItem]) -> Vec<NavEntry> {
        items
            .iter()
            .filter_map(|item| self.resolve_item(item))
            .collect()
    }

    fn resolve_item(&mut self, item: &SidebarItem) -> Option<NavEntry> {
        match item {
            SidebarItem::Doc(doc_ref) => {
                let page = self.doc_page(&doc_ref.id, doc_ref.label.as_deref())?;
                self.pages.push(page.clone());
                Some(NavEntry::Doc {
                    id: doc_ref.id.clone(),
                    label: page.label,
                    href: page.href,
                    route: page.route,
                })
            }
            SidebarItem::Category(category) => Some(self.resolve_category(category)),
            SidebarItem::Link(link) => Some(NavEntry::Link {
                label: link.label.clone(),
                href: link.href.clone(),
            }),
        }
    }

    fn resolve_category(&mut self, category: &Category) -> NavEntry {
        // The category's own page comes before its children in page order.
        let generated_route = match &category.link {
            Some(CategoryLink::Doc { id }) => {
                if let Some(page) = self.doc_page(id, Some(&category.label)) {
                    self.pages.push(page);
                }
                None
            }
            Some(CategoryLink::GeneratedIndex(index)) => {
                let route = generated_index_route(&category.label, index);
                self.pages.push(PageLink {
                    label: category.label.clone(),
                    href: self.urls.page(&route),
                    route: route.clone(),
                });
                Some(route)
            }
            None => None,
        };

        let items = self.resolve_items(&category.items);

        if let (Some(route), Some(CategoryLink::GeneratedIndex(index))) =
            (&generated_route, &category.link)
        {
            let page = GeneratedIndexPage {
                route: route.clone(),
                title: index
                    .title
                    .clone()
                    .unwrap_or_else(|| category.label.clone()),
                description: index.description.clone(),
                cards: items.iter().map(|entry| self.card(entry)).collect(),
            };
            self.generated_indexes.push(page);
        }

        let route = match &category.link {
            Some(CategoryLink::Doc { id }) if self.store.contains(id) => Some(Urls::doc_route(id)),
            Some(CategoryLink::GeneratedIndex(_)) => generated_route,
            _ => None,
        };

        NavEntry::Category {
            label: category.label.clone(),
            href: route.as_deref().map(|r| self.urls.page(r)),
            route,
            collapsible: category.collapsible,
            collapsed: category.collapsed,
            items,
        }
    }

    fn doc_page(&mut self, id: &str, label: Option<&str>) -> Option<PageLink> {
        let Some(doc) = self.store.get(id) else {
            self.broken.push(BrokenLink {
                source: format!("sidebar {}", self.sidebar_id),
                target: id.to_string(),
            });
            return None;
        };

        let label = label
            .or(doc.sidebar_label.as_deref())
            .unwrap_or(&doc.title)
            .to_string();

        Some(PageLink {
            label,
            href: self.urls.doc(id),
            route: Urls::doc_route(id),
        })
    }

    fn card(&self, entry: &NavEntry) -> IndexCard {
        match entry {
            NavEntry::Doc { id, label, href, .. } => IndexCard {
                label: label.clone(),
                href: href.clone(),
                description: self.store.get(id).and_then(|d| d.summary.clone()),
            },
            NavEntry::Category {
                label, href, items, ..
            } => IndexCard {
                label: label.clone(),
                href: href.clone().unwrap_or_default(),
                description: Some(format!("{} items", items.len())),
            },
            NavEntry::Link { label, href } => IndexCard {
                label: label.clone(),
                href: href.clone(),
                description: Some(href.clone()),
            },
        }
    }
}

fn generated_index_route(label: &str, index: &GeneratedIndex) -> String {
    let slug = index
        .slug
        .clone()
        .unwrap_or_else(|| format!("category/{}", slugify(label)));
    format!("{}/{}", DOCS_ROUTE, slug.trim_matches('/'))
}

/// A sidebar entry ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavEntry {
    Doc {
        id: String,
        label: String,
        href: String,
        route: String,
    },
    Category {
        label: String,
        href: Option<String>,
        route: Option<String>,
        collapsible: bool,
        collapsed: bool,
        items: Vec<NavEntry>,
    },
    Link {
        label: String,
        href: String,
    },
}

impl NavEntry {
    fn contains_route(&self, active: &str) -> bool {
        match self {
            NavEntry::Doc { route, .. } => route == active,
            NavEntry::Category { route, items, .. } => {
                route.as_deref() == Some(active) || items.iter().any(|i| i.contains_route(active))
            }
            NavEntry::Link { .. } => false,
        }
    }
}

/// Label, href and route of one page reachable from a sidebar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLink {
    pub label: String,
    pub href: String,
    pub route: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexCard {
    pub label: String,
    pub href: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedIndexPage {
    pub route: String,
    pub title: String,
    pub description: Option<String>,
    pub cards: Vec<IndexCard>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Pagination {
    pub previous: Option<PageLink>,
    pub next: Option<PageLink>,
}

/// A sidebar resolved against the content store.
#[derive(Debug, Clone, PartialEq)]
pub struct NavTree {
    pub sidebar_id: String,
    pub entries: Vec<NavEntry>,
    /// Every page the sidebar links to, in reading order.
    pub pages: Vec<PageLink>,
    pub generated_indexes: Vec<GeneratedIndexPage>,
    pub broken: Vec<BrokenLink>,
}

impl NavTree {
    pub fn first_page(&self) -> Option<&PageLink> {
        self.pages.first()
    }

    pub fn contains_route(&self, route: &str) -> bool {
        self.pages.iter().any(|p| p.route == route)
    }

    /// Previous and next pages around `route` in reading order.
    pub fn pagination(&self, route: &str) -> Pagination {
        let Some(pos) = self.pages.iter().position(|p| p.route == route) else {
            return Pagination::default();
        };

        Pagination {
            previous: pos.checked_sub(1).map(|i| self.pages[i].clone()),
            next: self.pages.get(pos + 1).cloned(),
        }
    }

    /// Sidebar markup with the entry for `active_route` highlighted and its
    /// ancestors expanded.
    pub fn to_html(&self, active_route: &str) -> String {
        let mut html = String::new();
        render_entries(&self.entries, active_route, &mut html);
        html
    }
}

fn render_entries(entries: &[NavEntry], active: &str, html: &mut String) {
    html.push_str("<ul class=\"menu__list\">\n");
    for entry in entries {
        render_entry(entry, active, html);
    }
    html.push_str("</ul>\n");
}

fn render_entry(entry: &NavEntry, active: &str, html: &mut String) {
    match entry {
        NavEntry::Doc {
            label, href, route, ..
        } => {
            html.push_str(&format!(
                "<li class=\"menu__list-item\"><a class=\"{}\" href=\"{}\">{}</a></li>\n",
                link_class(route == active),
                html_escape::encode_double_quoted_attribute(href),
                html_escape::encode_text(label),
            ));
        }
        NavEntry::Category {
            label,
            href,
            route,
            collapsible,
            collapsed,
            items,
        } => {
            let is_active = route.as_deref() == Some(active);
            let title = match href {
                Some(href) => format!(
                    "<a class=\"{}\" href=\"{}\">{}</a>",
                    link_class(is_active),
                    html_escape::encode_double_quoted_attribute(href),
                    html_escape::encode_text(label),
                ),
                None => format!(
                    "<span class=\"menu__link\">{}</span>",
                    html_escape::encode_text(label)
                ),
            };

            html.push_str("<li class=\"menu__list-item menu__category\">");
            if *collapsible {
                let open = !*collapsed || entry.contains_route(active);
                html.push_str(if open { "<details open>" } else { "<details>" });
                html.push_str(&format!("<summary>{title}</summary>\n"));
                render_entries(items, active, html);
                html.push_str("</details>");
            } else {
                html.push_str(&title);
                html.push('\n');
                render_entries(items, active, html);
            }
            html.push_str("</li>\n");
        }
        NavEntry::Link { label, href } => {
            html.push_str(&format!(
                "<li class=\"menu__list-item\"><a class=\"menu__link\" href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a></li>\n",
                html_escape::encode_double_quoted_attribute(href),
                html_escape::encode_text(label),
            ));
        }
    }
}

fn link_class(active: bool) -> &'static str {
    if active {
        "menu__link menu__link--active"
    } else {
        "menu__link"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::site::Doc;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn store(ids: &[&str]) -> DocStore {
        ids.iter()
            .map(|id| Doc {
                id: id.to_string(),
                title: format!("Title of {id}"),
                summary: Some(format!("About {id}")),
                sidebar_label: None,
                source: PathBuf::from(format!("{id}.md")),
                content: String::new(),
            })
            .collect()
    }

    fn full_store() -> DocStore {
        store(&Sidebars::default().doc_ids())
    }

    fn urls() -> Urls {
        Urls::new(&Config::default())
    }

    #[test]
    fn default_tree_has_one_generated_sprints_category() {
        let sidebars = Sidebars::default();
        let top = sidebars.get("tutorialSidebar").unwrap();

        let sprints: Vec<_> = top
            .iter()
            .filter_map(|item| match item {
                SidebarItem::Category(c) if c.label == "Sprints" => Some(c),
                _ => None,
            })
            .collect();

        assert_eq!(sprints.len(), 1);
        assert!(matches!(
            sprints[0].link,
            Some(CategoryLink::GeneratedIndex(_))
        ));
    }

    #[test]
    fn parses_shorthand_and_tagged_items() {
        let sidebars: Sidebars = toml::from_str(
            r#"
            [[docs]]
            type = "doc"
            id = "intro"
            label = "Introduction"

            [[docs]]
            type = "category"
            label = "Sprints"
            items = ["sprints/a", { type = "link", label = "API", href = "http://localhost:8888/api/v1/docs" }]
            link = { type = "generated-index", title = "Sprint Documentation", description = "Sprints" }

            [[docs]]
            type = "category"
            label = "Guides"
            collapsed = false
            items = ["guide"]
            link = { type = "doc", id = "guide" }
            "#,
        )
        .unwrap();

        let items = sidebars.get("docs").unwrap();
        assert_eq!(items[0], SidebarItem::labeled_doc("intro", "Introduction"));

        let SidebarItem::Category(sprints) = &items[1] else {
            panic!("expected category");
        };
        assert_eq!(sprints.items[0], SidebarItem::doc("sprints/a"));
        assert!(matches!(sprints.items[1], SidebarItem::Link(_)));
        assert!(sprints.collapsed);

        let SidebarItem::Category(guides) = &items[2] else {
            panic!("expected category");
        };
        assert!(!guides.collapsed);
        assert_eq!(guides.link, Some(CategoryLink::Doc { id: "guide".into() }));

        assert_eq!(sidebars.doc_ids(), ["intro", "sprints/a", "guide", "guide"]);
    }

    #[test]
    fn resolves_labels_and_hrefs() {
        let tree = Sidebars::default()
            .resolve("tutorialSidebar", &full_store(), &urls())
            .unwrap();

        assert!(tree.broken.is_empty());
        assert_eq!(
            tree.entries[0],
            NavEntry::Doc {
                id: "intro".into(),
                label: "Introduction".into(),
                href: "/sophia-library-docs/docs/intro".into(),
                route: "docs/intro".into(),
            }
        );

        let NavEntry::Category { label, items, .. } = &tree.entries[3] else {
            panic!("expected category");
        };
        assert_eq!(label, "Integration Guides");
        // No explicit label: the document title is used.
        assert!(matches!(&items[0], NavEntry::Doc { label, .. } if label == "Title of langgraph-integration"));
    }

    #[test]
    fn generated_index_lists_children() {
        let tree = Sidebars::default()
            .resolve("tutorialSidebar", &full_store(), &urls())
            .unwrap();

        assert_eq!(tree.generated_indexes.len(), 1);
        let index = &tree.generated_indexes[0];
        assert_eq!(index.route, "docs/category/sprints");
        assert_eq!(index.title, "Sprint Documentation");
        assert_eq!(index.cards.len(), 4);
        assert_eq!(
            index.cards[0].description.as_deref(),
            Some("About sprints/sprint-8-qdrant-semantic-search")
        );

        let NavEntry::Category { href, .. } = &tree.entries[5] else {
            panic!("expected category");
        };
        assert_eq!(
            href.as_deref(),
            Some("/sophia-library-docs/docs/category/sprints")
        );
    }

    #[test]
    fn missing_docs_are_dropped_and_reported() {
        let store = store(&["intro", "quick-start"]);
        let tree = Sidebars::default()
            .resolve("tutorialSidebar", &store, &urls())
            .unwrap();

        assert_eq!(tree.broken.len(), 10);
        assert_eq!(tree.broken[0].target, "api-reference");
        assert_eq!(tree.broken[0].source, "sidebar tutorialSidebar");

        // Categories survive even when all their docs are gone.
        assert_eq!(tree.entries.len(), 5);
    }

    #[test]
    fn unknown_sidebar_is_an_error() {
        let err = Sidebars::default()
            .resolve("nope", &full_store(), &urls())
            .unwrap_err();
        assert!(matches!(err, SidebarError::UnknownSidebar(id) if id == "nope"));
    }

    #[test]
    fn pagination_follows_reading_order() {
        let tree = Sidebars::default()
            .resolve("tutorialSidebar", &full_store(), &urls())
            .unwrap();

        let first = tree.pagination("docs/intro");
        assert_eq!(first.previous, None);
        assert_eq!(first.next.unwrap().route, "docs/quick-start");

        // The generated index sits between the last search doc and the first sprint.
        let around = tree.pagination("docs/category/sprints");
        assert_eq!(around.previous.unwrap().route, "docs/search/hybrid-search");
        assert_eq!(
            around.next.unwrap().route,
            "docs/sprints/sprint-8-qdrant-semantic-search"
        );

        assert_eq!(tree.first_page().unwrap().label, "Introduction");
    }

    #[test]
    fn html_marks_active_entry_and_opens_its_category() {
        let tree = Sidebars::default()
            .resolve("tutorialSidebar", &full_store(), &urls())
            .unwrap();
        let html = tree.to_html("docs/search/keyword-search");

        assert!(html.contains(
            "<a class=\"menu__link menu__link--active\" href=\"/sophia-library-docs/docs/search/keyword-search\">"
        ));
        assert_eq!(html.matches("<details open>").count(), 1);
        assert_eq!(html.matches("<details>").count(), 2);
        assert_eq!(html, tree.to_html("docs/search/keyword-search"));
    }
}
