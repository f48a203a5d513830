use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template error: {0}")]
    TeraError(#[from] tera::Error),
    #[error("Theme directory error: {0}")]
    Theme(#[from] walkdir::Error),
}

/// Templates compiled into the binary. A theme directory may override any of
/// them by providing a file with the same name.
const BUILTIN_TEMPLATES: [(&str, &str); 5] = [
    ("base.html", include_str!("../theme/base.html")),
    ("home.html", include_str!("../theme/home.html")),
    ("doc.html", include_str!("../theme/doc.html")),
    ("category.html", include_str!("../theme/category.html")),
    ("404.html", include_str!("../theme/404.html")),
];

/// Stylesheet written to `assets/css/style.css` unless the theme ships one.
pub const BUILTIN_STYLESHEET: &str = include_str!("../theme/style.css");

pub struct TemplateRenderer {
    tera: Tera,
    context: Context,
}

impl TemplateRenderer {
    /// Built-in theme with `*.html` files from `theme_dir` taking precedence.
    ///
    /// Theme templates may extend or include built-in ones; inheritance is
    /// resolved once every template is loaded.
    pub fn new(theme_dir: Option<&Path>) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(BUILTIN_TEMPLATES)?;

        if let Some(dir) = theme_dir.filter(|d| d.is_dir()) {
            let files = theme_templates(dir)?;
            tracing::debug!(theme = %dir.display(), templates = files.len(), "Loaded theme");
            // Same name as a built-in replaces it.
            tera.add_template_files(files)?;
        }
        tera.set_escape_fn(escape_html);

        Ok(Self {
            tera,
            context: Context::new(),
        })
    }

    /// Add a value visible to every render
    pub fn add_to_context<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        self.context.insert(key, value);
    }

    /// Render a template with page values layered over the global context
    pub fn render_with_context(
        &self,
        template: &str,
        context: &Context,
    ) -> Result<String, TemplateError> {
        let mut merged = self.context.clone();
        merged.extend(context.clone());
        Ok(self.tera.render(template, &merged)?)
    }
}

/// `(path, name)` for every `*.html` under `dir`, named relative to it.
fn theme_templates(dir: &Path) -> Result<Vec<(PathBuf, Option<String>)>, TemplateError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "html") {
            continue;
        }
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((path.to_path_buf(), Some(name)));
    }
    Ok(files)
}

/// Same as the tera default escaper, but leaves `/` alone.
fn escape_html(input: &str) -> String {
    html_escape::encode_quoted_attribute(input).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn render(renderer: &TemplateRenderer, template: &str) -> String {
        renderer
            .render_with_context(template, &Context::new())
            .unwrap()
    }

    #[test]
    fn builtin_templates_are_registered() {
        let renderer = TemplateRenderer::new(None).unwrap();
        let names: Vec<_> = renderer.tera.get_template_names().collect();
        for (name, _) in BUILTIN_TEMPLATES {
            assert!(names.contains(&name), "missing {name}");
        }
    }

    #[test]
    fn page_context_overrides_global() {
        let mut renderer = TemplateRenderer::new(None).unwrap();
        renderer
            .tera
            .add_raw_template("pair.txt", "{{ a }}-{{ b }}")
            .unwrap();
        renderer.add_to_context("a", "global");
        renderer.add_to_context("b", "global");

        let mut page = Context::new();
        page.insert("b", "page");

        assert_eq!(
            renderer.render_with_context("pair.txt", &page).unwrap(),
            "global-page"
        );
        assert_eq!(render(&renderer, "pair.txt"), "global-global");
    }

    #[test]
    fn escaping_keeps_slashes() {
        let mut renderer = TemplateRenderer::new(None).unwrap();
        renderer
            .tera
            .add_raw_template("link.html", "<a href=\"{{ href }}\">{{ text }}</a>")
            .unwrap();
        renderer.add_to_context("href", "/docs/intro");
        renderer.add_to_context("text", "Q&A <b>");

        assert_eq!(
            render(&renderer, "link.html"),
            "<a href=\"/docs/intro\">Q&amp;A &lt;b&gt;</a>"
        );
    }

    #[test]
    fn theme_directory_overrides_builtin() {
        let theme = TempDir::new().unwrap();
        fs::write(theme.path().join("404.html"), "custom not found").unwrap();

        let renderer = TemplateRenderer::new(Some(theme.path())).unwrap();
        assert_eq!(render(&renderer, "404.html"), "custom not found");
        assert!(renderer.tera.get_template_names().any(|n| n == "home.html"));
    }

    #[test]
    fn theme_template_can_extend_builtin_base() {
        let theme = TempDir::new().unwrap();
        fs::write(
            theme.path().join("doc.html"),
            "{% extends \"base.html\" %}{% block content %}custom{% endblock content %}",
        )
        .unwrap();

        let renderer = TemplateRenderer::new(Some(theme.path())).unwrap();
        let doc = renderer.tera.get_template("doc.html").unwrap();
        assert_eq!(doc.parents, vec!["base.html".to_string()]);
    }

    #[test]
    fn nested_theme_templates_keep_their_relative_name() {
        let theme = TempDir::new().unwrap();
        fs::create_dir_all(theme.path().join("partials")).unwrap();
        fs::write(theme.path().join("partials/banner.html"), "banner").unwrap();
        fs::write(theme.path().join("style.css"), "body {}").unwrap();

        let renderer = TemplateRenderer::new(Some(theme.path())).unwrap();
        assert_eq!(render(&renderer, "partials/banner.html"), "banner");
        assert!(!renderer.tera.get_template_names().any(|n| n.ends_with(".css")));
    }

    #[test]
    fn missing_theme_directory_uses_builtin() {
        let theme = TempDir::new().unwrap();
        let missing = theme.path().join("none");
        let renderer = TemplateRenderer::new(Some(missing.as_path())).unwrap();
        assert!(renderer.tera.get_template_names().any(|n| n == "doc.html"));
    }
}
