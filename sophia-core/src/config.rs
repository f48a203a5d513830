use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parsing(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Site-wide identity and theme settings.
///
/// `Config::default()` is the Sophia Library site itself, so a missing
/// `sophia.toml` still builds the real documentation site.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub tagline: String,
    pub favicon: Option<String>,
    /// Production origin, without a trailing slash.
    pub url: String,
    /// Path the site is served under. Starts and ends with `/`.
    pub base_url: String,
    pub organization_name: Option<String>,
    pub project_name: Option<String>,
    pub deployment_branch: Option<String>,
    /// `Some(false)` writes `docs/intro.html`, anything else `docs/intro/index.html`.
    pub trailing_slash: Option<bool>,
    pub on_broken_links: LinkPolicy,
    pub on_broken_markdown_links: LinkPolicy,
    pub i18n: I18nConfig,
    pub docs: DocsConfig,
    pub theme: ThemeConfig,
    pub home: HomeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Sophia Library API".into(),
            tagline: "AI-Powered Philosophical & Religious Text Search".into(),
            favicon: Some("img/favicon.ico".into()),
            url: "https://sandpalace.github.io".into(),
            base_url: "/sophia-library-docs/".into(),
            organization_name: Some("SandPalace".into()),
            project_name: Some("sophia-library-docs".into()),
            deployment_branch: Some("gh-pages".into()),
            trailing_slash: Some(false),
            on_broken_links: LinkPolicy::Warn,
            on_broken_markdown_links: LinkPolicy::Warn,
            i18n: I18nConfig::default(),
            docs: DocsConfig::default(),
            theme: ThemeConfig::default(),
            home: HomeConfig::default(),
        }
    }
}

impl Config {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&data)?;

        Ok(config)
    }

    /// Checks the fields the build engine relies on. Nothing is repaired.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.title.trim().is_empty() {
            return Err(ConfigError::Invalid("title must not be empty".into()));
        }
        if !self.base_url.starts_with('/') || !self.base_url.ends_with('/') {
            return Err(ConfigError::Invalid(format!(
                "base_url must start and end with '/', got {:?}",
                self.base_url
            )));
        }
        if self.url.ends_with('/') {
            return Err(ConfigError::Invalid(format!(
                "url must not end with '/', got {:?}",
                self.url
            )));
        }
        if !self.i18n.locales.contains(&self.i18n.default_locale) {
            return Err(ConfigError::Invalid(format!(
                "i18n.locales does not contain the default locale {:?}",
                self.i18n.default_locale
            )));
        }

        Ok(())
    }

    /// Rewrites the addressing fields so the output can be served from the
    /// dev server root.
    pub fn dev(&mut self, host: String, port: u16) {
        self.url = format!("http://{host}:{port}");
        self.base_url = "/".into();
        self.trailing_slash = None;
    }

    /// Footer copyright line with `{year}` substituted.
    pub fn copyright(&self, year: i32) -> Option<String> {
        self.theme
            .footer
            .copyright
            .as_ref()
            .map(|c| c.replace("{year}", &year.to_string()))
    }
}

/// What to do when a link target does not exist.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LinkPolicy {
    Ignore,
    Log,
    #[default]
    Warn,
    Throw,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct I18nConfig {
    pub default_locale: String,
    pub locales: Vec<String>,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_locale: "en".into(),
            locales: vec!["en".into()],
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DocsConfig {
    pub sidebar_path: String,
    /// Prefix for "Edit this page" links. `None` hides them.
    pub edit_url: Option<String>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            sidebar_path: "./sidebars.toml".into(),
            edit_url: Some(
                "https://github.com/YOUR_GITHUB_USERNAME/sophia/tree/main/docs-site/".into(),
            ),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ThemeConfig {
    /// Social card image.
    pub image: Option<String>,
    pub navbar: NavbarConfig,
    pub footer: FooterConfig,
    pub prism: PrismConfig,
    pub metadata: Vec<MetaTag>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            image: Some("img/sophia-social-card.jpg".into()),
            navbar: NavbarConfig::default(),
            footer: FooterConfig::default(),
            prism: PrismConfig::default(),
            metadata: vec![
                MetaTag {
                    name: "keywords".into(),
                    content: "api, philosophy, religious texts, ai, search, semantic search, openai, qdrant, opensearch".into(),
                },
                MetaTag {
                    name: "description".into(),
                    content: "Sophia Library API provides AI-powered search over 25,000+ philosophical and religious text chunks with semantic, keyword, and hybrid search capabilities.".into(),
                },
            ],
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct NavbarConfig {
    pub title: Option<String>,
    pub logo: Option<Logo>,
    pub items: Vec<NavbarItem>,
}

impl Default for NavbarConfig {
    fn default() -> Self {
        Self {
            title: Some("Sophia Library".into()),
            logo: Some(Logo {
                alt: "Sophia Library Logo".into(),
                src: "img/logo.svg".into(),
            }),
            items: vec![
                NavbarItem::DocSidebar {
                    sidebar_id: "tutorialSidebar".into(),
                    label: "Documentation".into(),
                    position: Position::Left,
                },
                NavbarItem::Doc {
                    to: "/docs/api-reference".into(),
                    label: "API Reference".into(),
                    position: Position::Left,
                },
                NavbarItem::Href {
                    href: "http://localhost:8888/api/v1/docs".into(),
                    label: "Try It (Swagger)".into(),
                    position: Position::Right,
                },
                NavbarItem::Href {
                    href: "https://github.com/SandPalace/sophia-library-docs".into(),
                    label: "GitHub".into(),
                    position: Position::Right,
                },
            ],
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Logo {
    pub alt: String,
    pub src: String,
}

/// Navbar entry. The variant is picked by which target field is present:
/// `sidebar_id`, `to` or `href`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum NavbarItem {
    /// Links to the first document of a sidebar.
    DocSidebar {
        sidebar_id: String,
        label: String,
        #[serde(default)]
        position: Position,
    },
    /// Internal route such as `/docs/api-reference`.
    Doc {
        to: String,
        label: String,
        #[serde(default)]
        position: Position,
    },
    /// External URL.
    Href {
        href: String,
        label: String,
        #[serde(default)]
        position: Position,
    },
}

impl NavbarItem {
    pub fn label(&self) -> &str {
        match self {
            NavbarItem::DocSidebar { label, .. }
            | NavbarItem::Doc { label, .. }
            | NavbarItem::Href { label, .. } => label,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            NavbarItem::DocSidebar { position, .. }
            | NavbarItem::Doc { position, .. }
            | NavbarItem::Href { position, .. } => *position,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    #[default]
    Left,
    Right,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FooterConfig {
    pub style: FooterStyle,
    pub links: Vec<FooterLinkGroup>,
    /// May contain `{year}`.
    pub copyright: Option<String>,
}

impl Default for FooterConfig {
    fn default() -> Self {
        Self {
            style: FooterStyle::Dark,
            links: vec![
                FooterLinkGroup {
                    title: "Docs".into(),
                    items: vec![
                        FooterItem::doc("Quick Start", "/docs/quick-start"),
                        FooterItem::doc("API Reference", "/docs/api-reference"),
                        FooterItem::doc("LangGraph Integration", "/docs/langgraph-integration"),
                    ],
                },
                FooterLinkGroup {
                    title: "Resources".into(),
                    items: vec![
                        FooterItem::doc("Sprint Documentation", "/docs/category/sprints"),
                        FooterItem::href("OpenAPI Spec", "http://localhost:8888/api/v1/openapi.json"),
                        FooterItem::href("Swagger UI", "http://localhost:8888/api/v1/docs"),
                    ],
                },
                FooterLinkGroup {
                    title: "More".into(),
                    items: vec![FooterItem::href(
                        "GitHub",
                        "https://github.com/SandPalace/sophia-library-docs",
                    )],
                },
            ],
            copyright: Some(
                "Copyright © {year} Sophia Library. Built with sophia-docs.".into(),
            ),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FooterStyle {
    #[default]
    Dark,
    Light,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct FooterLinkGroup {
    pub title: String,
    #[serde(default)]
    pub items: Vec<FooterItem>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum FooterItem {
    Doc { label: String, to: String },
    Href { label: String, href: String },
}

impl FooterItem {
    fn doc(label: &str, to: &str) -> Self {
        FooterItem::Doc {
            label: label.into(),
            to: to.into(),
        }
    }

    fn href(label: &str, href: &str) -> Self {
        FooterItem::Href {
            label: label.into(),
            href: href.into(),
        }
    }
}

/// Code block highlighting. Theme names follow the prism names used by the
/// docs site and are mapped onto bundled syntect themes.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PrismConfig {
    pub theme: String,
    pub dark_theme: String,
    pub additional_languages: Vec<String>,
}

impl Default for PrismConfig {
    fn default() -> Self {
        Self {
            theme: "github".into(),
            dark_theme: "dracula".into(),
            additional_languages: vec![
                "bash".into(),
                "python".into(),
                "javascript".into(),
                "json".into(),
            ],
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct MetaTag {
    pub name: String,
    pub content: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HomeConfig {
    /// `<meta name="description">` of the homepage.
    pub description: String,
    pub primary_action: Option<Link>,
    pub secondary_action: Option<Link>,
    pub features: Vec<Feature>,
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            description: "AI-Powered Philosophical & Religious Text Search API".into(),
            primary_action: Some(Link {
                text: "Get Started →".into(),
                link: "/docs/intro".into(),
            }),
            secondary_action: Some(Link {
                text: "Quick Start Guide".into(),
                link: "/docs/quick-start".into(),
            }),
            features: default_features(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Link {
    pub text: String,
    pub link: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Feature {
    #[serde(default)]
    pub icon: String,
    pub title: String,
    pub description: String,
}

fn default_features() -> Vec<Feature> {
    let feature = |icon: &str, title: &str, description: &str| Feature {
        icon: icon.into(),
        title: title.into(),
        description: description.into(),
    };

    vec![
        feature(
            "🔍",
            "Semantic Search",
            "AI-powered search using OpenAI embeddings and Qdrant vector database for conceptual understanding and meaning-based retrieval.",
        ),
        feature(
            "📝",
            "Keyword Search",
            "Traditional full-text search with BM25 scoring via OpenSearch for exact term matching and fast lookups.",
        ),
        feature(
            "🔄",
            "Hybrid Search",
            "Best of both worlds using Reciprocal Rank Fusion (RRF) to combine semantic and keyword results for optimal relevance.",
        ),
        feature(
            "📚",
            "Rich Catalog",
            "Access 25,552 philosophical and religious text chunks from 97 books by 1,067 authors.",
        ),
        feature(
            "🤖",
            "AI-Ready",
            "Built for AI agents and LLMs with context building, structured responses, and LangGraph integration.",
        ),
        feature(
            "🔐",
            "Secure",
            "Role-based API key authentication with usage quotas and rate limiting for production use.",
        ),
    ]
}
