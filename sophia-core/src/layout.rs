use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{Config, FooterItem, FooterStyle, MetaTag, NavbarItem, Position};
use crate::sidebar::{NavTree, SidebarError};
use crate::site::Urls;

/// Where the built-in stylesheet is written.
pub const STYLESHEET_PATH: &str = "assets/css/style.css";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavLink {
    pub label: String,
    pub href: String,
    pub external: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogoView {
    pub alt: String,
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Navbar {
    pub title: Option<String>,
    pub logo: Option<LogoView>,
    pub home_href: String,
    pub left: Vec<NavLink>,
    pub right: Vec<NavLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FooterGroup {
    pub title: String,
    pub items: Vec<NavLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Footer {
    pub style: FooterStyle,
    pub groups: Vec<FooterGroup>,
    pub copyright: Option<String>,
}

/// Site-wide values every page template sees as `site`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: String,
    pub tagline: String,
    pub lang: String,
    pub url: String,
    pub base_url: String,
    pub favicon: Option<String>,
    /// Absolute URL of the social card.
    pub image: Option<String>,
    pub metadata: Vec<MetaTag>,
    pub stylesheet: String,
    pub navbar: Navbar,
    pub footer: Footer,
}

impl Layout {
    /// `navs` must hold every sidebar a navbar item points at.
    pub fn new(
        config: &Config,
        urls: &Urls,
        navs: &BTreeMap<String, NavTree>,
        year: i32,
    ) -> Result<Self, SidebarError> {
        let mut left = Vec::new();
        let mut right = Vec::new();

        for item in &config.theme.navbar.items {
            let link = navbar_link(item, urls, navs)?;
            match item.position() {
                Position::Left => left.push(link),
                Position::Right => right.push(link),
            }
        }

        let groups = config
            .theme
            .footer
            .links
            .iter()
            .map(|group| FooterGroup {
                title: group.title.clone(),
                items: group
                    .items
                    .iter()
                    .map(|item| footer_link(item, urls))
                    .collect(),
            })
            .collect();

        Ok(Self {
            title: config.title.clone(),
            tagline: config.tagline.clone(),
            lang: config.i18n.default_locale.clone(),
            url: config.url.clone(),
            base_url: config.base_url.clone(),
            favicon: config.favicon.as_deref().map(|f| urls.asset(f)),
            image: config
                .theme
                .image
                .as_deref()
                .map(|i| format!("{}{}", config.url, urls.asset(i))),
            metadata: config.theme.metadata.clone(),
            stylesheet: urls.asset(STYLESHEET_PATH),
            navbar: Navbar {
                title: config.theme.navbar.title.clone(),
                logo: config.theme.navbar.logo.as_ref().map(|logo| LogoView {
                    alt: logo.alt.clone(),
                    src: urls.asset(&logo.src),
                }),
                home_href: urls.page(""),
                left,
                right,
            },
            footer: Footer {
                style: config.theme.footer.style,
                groups,
                copyright: config.copyright(year),
            },
        })
    }
}

fn navbar_link(
    item: &NavbarItem,
    urls: &Urls,
    navs: &BTreeMap<String, NavTree>,
) -> Result<NavLink, SidebarError> {
    let (href, external) = match item {
        NavbarItem::DocSidebar { sidebar_id, .. } => {
            let nav = navs
                .get(sidebar_id)
                .ok_or_else(|| SidebarError::UnknownSidebar(sidebar_id.clone()))?;
            let href = match nav.first_page() {
                Some(page) => page.href.clone(),
                None => {
                    tracing::warn!(sidebar = %sidebar_id, "Sidebar has no pages, navbar item points at the homepage");
                    urls.page("")
                }
            };
            (href, false)
        }
        NavbarItem::Doc { to, .. } => (urls.page(&Urls::route_of(to)), false),
        NavbarItem::Href { href, .. } => (href.clone(), true),
    };

    Ok(NavLink {
        label: item.label().to_string(),
        href,
        external,
    })
}

fn footer_link(item: &FooterItem, urls: &Urls) -> NavLink {
    match item {
        FooterItem::Doc { label, to } => NavLink {
            label: label.clone(),
            href: urls.page(&Urls::route_of(to)),
            external: false,
        },
        FooterItem::Href { label, href } => NavLink {
            label: label.clone(),
            href: href.clone(),
            external: true,
        },
    }
}

/// Internal `to` links from the navbar, footer and homepage, as
/// `(where, route)` pairs for link checking.
pub fn internal_routes(config: &Config) -> Vec<(String, String)> {
    let mut routes = Vec::new();

    for item in &config.theme.navbar.items {
        if let NavbarItem::Doc { to, label, .. } = item {
            routes.push((format!("navbar item {label:?}"), Urls::route_of(to)));
        }
    }

    for group in &config.theme.footer.links {
        for item in &group.items {
            if let FooterItem::Doc { to, label } = item {
                routes.push((format!("footer link {label:?}"), Urls::route_of(to)));
            }
        }
    }

    let home = &config.home;
    for action in home.primary_action.iter().chain(home.secondary_action.iter()) {
        if action.link.starts_with('/') {
            routes.push((
                format!("homepage action {:?}", action.text),
                Urls::route_of(&action.link),
            ));
        }
    }

    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sidebar::Sidebars;
    use crate::site::{Doc, DocStore};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn navs(config: &Config) -> BTreeMap<String, NavTree> {
        let sidebars = Sidebars::default();
        let store: DocStore = sidebars
            .doc_ids()
            .into_iter()
            .map(|id| Doc {
                id: id.to_string(),
                title: id.to_string(),
                summary: None,
                sidebar_label: None,
                source: PathBuf::from(format!("{id}.md")),
                content: String::new(),
            })
            .collect();
        let urls = Urls::new(config);

        BTreeMap::from([(
            "tutorialSidebar".to_string(),
            sidebars.resolve("tutorialSidebar", &store, &urls).unwrap(),
        )])
    }

    #[test]
    fn navbar_splits_by_position() {
        let config = Config::default();
        let layout = Layout::new(&config, &Urls::new(&config), &navs(&config), 2025).unwrap();

        assert_eq!(
            layout.navbar.left,
            vec![
                NavLink {
                    label: "Documentation".into(),
                    href: "/sophia-library-docs/docs/intro".into(),
                    external: false,
                },
                NavLink {
                    label: "API Reference".into(),
                    href: "/sophia-library-docs/docs/api-reference".into(),
                    external: false,
                },
            ]
        );
        let right: Vec<_> = layout.navbar.right.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(right, ["Try It (Swagger)", "GitHub"]);
        assert!(layout.navbar.right.iter().all(|l| l.external));
    }

    #[test]
    fn assets_and_footer_resolve_against_base_url() {
        let config = Config::default();
        let layout = Layout::new(&config, &Urls::new(&config), &navs(&config), 2025).unwrap();

        assert_eq!(layout.favicon.as_deref(), Some("/sophia-library-docs/img/favicon.ico"));
        assert_eq!(
            layout.image.as_deref(),
            Some("https://sandpalace.github.io/sophia-library-docs/img/sophia-social-card.jpg")
        );
        assert_eq!(layout.stylesheet, "/sophia-library-docs/assets/css/style.css");
        assert_eq!(
            layout.footer.groups[1].items[0].href,
            "/sophia-library-docs/docs/category/sprints"
        );
        assert_eq!(
            layout.footer.copyright.as_deref(),
            Some("Copyright © 2025 Sophia Library. Built with sophia-docs.")
        );
    }

    #[test]
    fn unknown_navbar_sidebar_is_an_error() {
        let mut config = Config::default();
        config.theme.navbar.items.push(NavbarItem::DocSidebar {
            sidebar_id: "apiSidebar".into(),
            label: "API".into(),
            position: Position::Left,
        });

        let err = Layout::new(&config, &Urls::new(&config), &navs(&config), 2025).unwrap_err();
        assert!(matches!(err, SidebarError::UnknownSidebar(id) if id == "apiSidebar"));
    }

    #[test]
    fn internal_routes_cover_navbar_footer_and_home() {
        let routes: Vec<_> = internal_routes(&Config::default())
            .into_iter()
            .map(|(_, route)| route)
            .collect();

        assert_eq!(
            routes,
            [
                "docs/api-reference",
                "docs/quick-start",
                "docs/api-reference",
                "docs/langgraph-integration",
                "docs/category/sprints",
                "docs/intro",
                "docs/quick-start",
            ]
        );
    }
}
