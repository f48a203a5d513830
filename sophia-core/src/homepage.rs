use serde::Serialize;
use tera::Context;

use crate::config::{Config, Feature, Link};
use crate::site::Urls;
use crate::template::{TemplateError, TemplateRenderer};

const FEATURES_PER_ROW: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub text: String,
    pub href: String,
}

/// Landing page: hero header plus the feature grid.
///
/// Built only from the [`Config`]; the same config always yields the same
/// page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomePage {
    pub title: String,
    pub tagline: String,
    pub description: String,
    pub actions: Vec<Action>,
    /// Configured features split into grid rows.
    pub rows: Vec<Vec<Feature>>,
}

impl HomePage {
    pub fn from_config(config: &Config) -> Self {
        let urls = Urls::new(config);
        let home = &config.home;

        let actions = home
            .primary_action
            .iter()
            .chain(home.secondary_action.iter())
            .map(|link| action(link, &urls))
            .collect();

        Self {
            title: config.title.clone(),
            tagline: config.tagline.clone(),
            description: home.description.clone(),
            actions,
            rows: home
                .features
                .chunks(FEATURES_PER_ROW)
                .map(<[Feature]>::to_vec)
                .collect(),
        }
    }

    /// Renders `home.html`. The renderer must already carry the `site` layout.
    pub fn render(&self, renderer: &TemplateRenderer, canonical: &str) -> Result<String, TemplateError> {
        let mut context = Context::new();
        context.insert("home", self);
        context.insert("page_title", "");
        context.insert("description", &self.description);
        context.insert("canonical", canonical);

        renderer.render_with_context("home.html", &context)
    }
}

fn action(link: &Link, urls: &Urls) -> Action {
    let href = if link.link.starts_with('/') {
        urls.page(&Urls::route_of(&link.link))
    } else {
        link.link.clone()
    };

    Action {
        text: link.text.clone(),
        href,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;
    use crate::sidebar::Sidebars;
    use crate::site::{Doc, DocStore};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn renderer(config: &Config) -> TemplateRenderer {
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
        let navs = BTreeMap::from([(
            "tutorialSidebar".to_string(),
            sidebars.resolve("tutorialSidebar", &store, &urls).unwrap(),
        )]);

        let mut renderer = TemplateRenderer::new(None).unwrap();
        renderer.add_to_context("site", &Layout::new(config, &urls, &navs, 2025).unwrap());
        renderer
    }

    #[test]
    fn header_shows_title_and_tagline_verbatim() {
        let config = Config {
            title: "Sophia Library".into(),
            ..Config::default()
        };
        let html = HomePage::from_config(&config)
            .render(&renderer(&config), "https://sandpalace.github.io/sophia-library-docs/")
            .unwrap();

        assert!(html.contains("<h1 class=\"hero__title\">Sophia Library</h1>"));
        assert!(html.contains(
            "<p class=\"hero__subtitle\">AI-Powered Philosophical & Religious Text Search</p>"
        ));
    }

    #[test]
    fn six_features_in_fixed_order() {
        let config = Config::default();
        let html = HomePage::from_config(&config)
            .render(&renderer(&config), "/")
            .unwrap();

        let titles = [
            "🔍 Semantic Search",
            "📝 Keyword Search",
            "🔄 Hybrid Search",
            "📚 Rich Catalog",
            "🤖 AI-Ready",
            "🔐 Secure",
        ];
        assert_eq!(html.matches("<div class=\"col col--4\">").count(), 6);

        let positions: Vec<_> = titles
            .iter()
            .map(|t| html.find(&format!("<h3>{t}</h3>")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn features_are_laid_out_in_rows_of_three() {
        let page = HomePage::from_config(&Config::default());
        assert_eq!(page.rows.len(), 2);
        assert!(page.rows.iter().all(|r| r.len() == 3));
    }

    #[test]
    fn rows_hold_every_feature_once() {
        let config = Config::default();
        let page = HomePage::from_config(&config);
        assert_eq!(page.rows.concat(), config.home.features);
    }

    #[test]
    fn actions_are_prefixed_with_base_url() {
        let page = HomePage::from_config(&Config::default());
        assert_eq!(
            page.actions,
            vec![
                Action {
                    text: "Get Started →".into(),
                    href: "/sophia-library-docs/docs/intro".into(),
                },
                Action {
                    text: "Quick Start Guide".into(),
                    href: "/sophia-library-docs/docs/quick-start".into(),
                },
            ]
        );
    }

    #[test]
    fn same_config_renders_same_page() {
        let config = Config::default();
        let renderer = renderer(&config);
        let first = HomePage::from_config(&config).render(&renderer, "/").unwrap();
        let second = HomePage::from_config(&config).render(&renderer, "/").unwrap();
        assert_eq!(first, second);
    }
}
