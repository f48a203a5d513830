pub mod builder;
pub mod config;
pub mod frontmatter;
pub mod homepage;
pub mod layout;
pub mod links;
pub mod markdown;
pub mod scanner;
pub mod sidebar;
pub mod site;
pub mod template;

// Re-export main types
pub use builder::{BuildError, BuildReport, RenderedSite, Site, SiteBuilder, SitePaths, build_site};
pub use config::{Config, ConfigError, LinkPolicy};
pub use links::{BrokenLink, BrokenLinksError};
pub use sidebar::{NavTree, SidebarError, SidebarItem, Sidebars};
pub use site::{Doc, DocStore, Urls};
pub use template::{TemplateError, TemplateRenderer};
