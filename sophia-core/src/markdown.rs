use std::collections::HashSet;
use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};
use serde::Serialize;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::{SyntaxReference, SyntaxSet};

use crate::config::PrismConfig;

// Initialize syntax highlighting resources once
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const FALLBACK_THEME: &str = "InspiredGitHub";

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
        | Options::ENABLE_GFM
}

/// Title and summary pulled from a markdown body.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DocMeta {
    pub title: Option<String>,
    pub summary: Option<String>,
}

/// Reads the first H1 and the first paragraph of `source`.
pub fn extract_meta(source: &str) -> DocMeta {
    let mut meta = DocMeta::default();
    let mut buf = String::new();
    let mut in_h1 = false;
    let mut in_paragraph = false;

    for event in Parser::new_ext(source, options()) {
        match event {
            Event::Start(Tag::Heading { level, .. }) if level as u8 == 1 => {
                in_h1 = meta.title.is_none();
                buf.clear();
            }
            Event::End(TagEnd::Heading(_)) if in_h1 => {
                meta.title = Some(buf.trim().to_string());
                in_h1 = false;
            }
            Event::Start(Tag::Paragraph) if meta.summary.is_none() => {
                in_paragraph = true;
                buf.clear();
            }
            Event::End(TagEnd::Paragraph) if in_paragraph => {
                let text = buf.trim();
                if !text.is_empty() {
                    meta.summary = Some(text.to_string());
                }
                in_paragraph = false;
            }
            Event::Text(text) | Event::Code(text) if in_h1 || in_paragraph => buf.push_str(&text),
            Event::SoftBreak | Event::HardBreak if in_paragraph => buf.push(' '),
            _ => {}
        }

        if meta.title.is_some() && meta.summary.is_some() {
            break;
        }
    }

    meta
}

/// Lowercase, dash-separated anchor text.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut dash = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c);
            dash = false;
        } else {
            dash = true;
        }
    }

    slug
}

/// "On this page" entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TocEntry {
    pub level: u8,
    pub text: String,
    pub anchor: String,
}

/// How the caller wants a link destination handled.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    /// Leave the destination untouched.
    Keep,
    /// Replace the destination with this href.
    Rewrite(String),
    /// Destination points at nothing. Kept as written and reported.
    Broken,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderedMarkdown {
    pub html: String,
    pub toc: Vec<TocEntry>,
    pub broken_links: Vec<String>,
}

/// Code block highlighter bound to one theme.
pub struct Highlighter {
    theme: Option<&'static Theme>,
}

impl Highlighter {
    pub fn new(prism: &PrismConfig) -> Self {
        for lang in &prism.additional_languages {
            if find_syntax(lang).is_none() {
                tracing::warn!(language = %lang, "No syntax definition for language, code will not be highlighted");
            }
        }

        let name = syntect_theme_name(&prism.theme);
        let theme = THEME_SET.themes.get(name).or_else(|| {
            tracing::warn!(theme = %prism.theme, "Unknown highlighting theme, using {FALLBACK_THEME}");
            THEME_SET.themes.get(FALLBACK_THEME)
        });

        Self { theme }
    }

    pub fn highlight(&self, code: &str, lang: &str) -> String {
        let highlighted = match (find_syntax(lang), self.theme) {
            (Some(syntax), Some(theme)) => {
                highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme).ok()
            }
            _ => None,
        };

        highlighted.unwrap_or_else(|| {
            let class = if lang.is_empty() {
                String::new()
            } else {
                format!(" class=\"language-{}\"", html_escape::encode_double_quoted_attribute(lang))
            };
            format!("<pre><code{}>{}</code></pre>\n", class, html_escape::encode_text(code))
        })
    }

    /// Renders `source` to HTML.
    ///
    /// Every link destination is passed through `resolve`; headings get
    /// stable `id` anchors and h2/h3 become TOC entries.
    pub fn render<F>(&self, source: &str, resolve: F) -> RenderedMarkdown
    where
        F: Fn(&str) -> LinkTarget,
    {
        let events: Vec<Event> = Parser::new_ext(source, options()).collect();
        let mut processed = Vec::with_capacity(events.len());
        let mut toc = Vec::new();
        let mut broken_links = Vec::new();
        let mut anchors: HashSet<String> = HashSet::new();
        let mut i = 0;

        while i < events.len() {
            match &events[i] {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => {
                            info.split_whitespace().next().unwrap_or_default().to_string()
                        }
                        CodeBlockKind::Indented => String::new(),
                    };

                    let mut code = String::new();
                    i += 1;
                    while i < events.len() {
                        match &events[i] {
                            Event::End(TagEnd::CodeBlock) => break,
                            Event::Text(text) => code.push_str(text),
                            _ => {}
                        }
                        i += 1;
                    }

                    processed.push(Event::Html(self.highlight(&code, &lang).into()));
                }
                Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                }) => {
                    let text = heading_text(&events[i + 1..]);
                    let anchor = match id {
                        Some(id) => {
                            anchors.insert(id.to_string());
                            id.to_string()
                        }
                        None => unique_anchor(&mut anchors, slugify(&text)),
                    };

                    let depth = *level as u8;
                    if (2..=3).contains(&depth) {
                        toc.push(TocEntry {
                            level: depth,
                            text,
                            anchor: anchor.clone(),
                        });
                    }

                    processed.push(Event::Start(Tag::Heading {
                        level: *level,
                        id: Some(CowStr::from(anchor)),
                        classes: classes.clone(),
                        attrs: attrs.clone(),
                    }));
                }
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => {
                    let dest_url = match resolve(dest_url) {
                        LinkTarget::Keep => dest_url.clone(),
                        LinkTarget::Rewrite(href) => CowStr::from(href),
                        LinkTarget::Broken => {
                            broken_links.push(dest_url.to_string());
                            dest_url.clone()
                        }
                    };

                    processed.push(Event::Start(Tag::Link {
                        link_type: *link_type,
                        dest_url,
                        title: title.clone(),
                        id: id.clone(),
                    }));
                }
                event => processed.push(event.clone()),
            }
            i += 1;
        }

        let mut html = String::new();
        html::push_html(&mut html, processed.into_iter());

        RenderedMarkdown {
            html,
            toc,
            broken_links,
        }
    }
}

fn heading_text(events: &[Event]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            _ => {}
        }
    }
    text.trim().to_string()
}

/// First of `slug`, `slug-1`, `slug-2`, ... not already taken on the page.
fn unique_anchor(taken: &mut HashSet<String>, slug: String) -> String {
    let slug = if slug.is_empty() { "section".to_string() } else { slug };
    let mut anchor = slug.clone();
    let mut n = 1;
    while taken.contains(&anchor) {
        anchor = format!("{slug}-{n}");
        n += 1;
    }
    taken.insert(anchor.clone());
    anchor
}

fn find_syntax(lang: &str) -> Option<&'static SyntaxReference> {
    if lang.is_empty() {
        return None;
    }

    SYNTAX_SET.find_syntax_by_token(lang).or_else(|| match lang {
        "sh" | "shell" | "console" | "zsh" => SYNTAX_SET.find_syntax_by_token("bash"),
        "toml" => SYNTAX_SET.find_syntax_by_name("YAML"),
        _ => None,
    })
}

fn syntect_theme_name(prism: &str) -> &str {
    match prism {
        "github" | "vsLight" => "InspiredGitHub",
        "dracula" | "oceanicNext" | "vsDark" => "base16-ocean.dark",
        "solarizedlight" => "Solarized (light)",
        "solarizedDark" => "Solarized (dark)",
        other => other,
    }
}
