use std::fmt;

use thiserror::Error;

use crate::config::LinkPolicy;

/// Which check found the link. Each kind has its own policy in the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Sidebar, navbar and footer targets (`on_broken_links`).
    Site,
    /// Links written inside markdown documents (`on_broken_markdown_links`).
    Markdown,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkKind::Site => write!(f, "links"),
            LinkKind::Markdown => write!(f, "markdown links"),
        }
    }
}

/// A link whose target does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokenLink {
    /// Where the link was found, e.g. `sidebar tutorialSidebar` or a doc id.
    pub source: String,
    pub target: String,
}

#[derive(Debug, Error)]
#[error("{count} broken {kind} found (first: {first_target} in {first_source})")]
pub struct BrokenLinksError {
    pub kind: LinkKind,
    pub count: usize,
    pub first_source: String,
    pub first_target: String,
}

/// Reports `broken` at the level `policy` asks for. Only `throw` fails.
pub fn enforce(
    policy: LinkPolicy,
    kind: LinkKind,
    broken: &[BrokenLink],
) -> Result<(), BrokenLinksError> {
    for link in broken {
        match policy {
            LinkPolicy::Ignore => {}
            LinkPolicy::Log => {
                tracing::info!(source = %link.source, target = %link.target, "Broken {kind}")
            }
            LinkPolicy::Warn => {
                tracing::warn!(source = %link.source, target = %link.target, "Broken {kind}")
            }
            LinkPolicy::Throw => {
                tracing::error!(source = %link.source, target = %link.target, "Broken {kind}")
            }
        }
    }

    match (policy, broken.first()) {
        (LinkPolicy::Throw, Some(first)) => Err(BrokenLinksError {
            kind,
            count: broken.len(),
            first_source: first.source.clone(),
            first_target: first.target.clone(),
        }),
        _ => Ok(()),
    }
}
