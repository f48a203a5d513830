use anyhow::{Context, Result};
use clap::ArgMatches;
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use sophia_core::{SitePaths, sidebar::Sidebars};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "./sophia.toml";

/// Complete configuration that merges CLI args, env vars, config files, and defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SophiaConfig {
    /// Where to read from and write to
    pub build: BuildConfig,
    /// Site configuration (from sophia-core)
    #[serde(flatten)]
    pub site: sophia_core::Config,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Directory containing the markdown docs
    pub source: String,
    /// Output directory for generated site
    pub output: String,
    /// Templates overriding the built-in theme
    pub theme: String,
    /// Files copied as-is into the output
    pub static_dir: String,
    /// Configuration file path
    pub config: String,
    /// Host for dev server
    pub host: String,
    /// Port for dev server
    pub port: u16,
    /// Open browser automatically
    pub open: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source: "./docs".to_string(),
            output: "./build".to_string(),
            theme: "./theme".to_string(),
            static_dir: "./static".to_string(),
            config: DEFAULT_CONFIG_FILE.to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: false,
        }
    }
}

impl SophiaConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (SOPHIA_*, `__` between nested keys)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        Self::load_with_env(args, None)
    }

    /// [`SophiaConfig::load`] reading `SOPHIA_*` values from `env` instead of
    /// the process environment when given.
    fn load_with_env(args: &ArgMatches, env: Option<HashMap<String, String>>) -> Result<Self> {
        let explicit_file = args.try_get_one::<String>("config").ok().flatten().cloned();
        let config_file = explicit_file
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        // Defaults come from the serde attributes.
        let mut builder = ConfigBuilder::builder();

        let path = Path::new(&config_file);
        if path.exists() {
            builder = builder.add_source(File::from(path));
        } else if explicit_file.is_some() {
            anyhow::bail!("Config file not found: {config_file}");
        }

        builder = builder.add_source(
            Environment::with_prefix("SOPHIA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        for key in ["source", "output", "theme", "static_dir", "host"] {
            if let Some(value) = args.try_get_one::<String>(key).unwrap_or(None) {
                builder = builder.set_override(format!("build.{key}"), value.as_str())?;
            }
        }
        builder = builder.set_override("build.config", config_file.as_str())?;
        if let Some(port) = args.try_get_one::<u16>("port").unwrap_or(None) {
            builder = builder.set_override("build.port", i64::from(*port))?;
        }
        if args.try_get_one::<bool>("open").unwrap_or(None) == Some(&true) {
            builder = builder.set_override("build.open", true)?;
        }

        let config = builder
            .build()?
            .try_deserialize::<SophiaConfig>()
            .with_context(|| format!("Invalid configuration in {config_file}"))?;

        Ok(config)
    }

    pub fn paths(&self) -> SitePaths {
        SitePaths {
            docs: PathBuf::from(&self.build.source),
            output: PathBuf::from(&self.build.output),
            theme: Some(PathBuf::from(&self.build.theme)),
            static_files: Some(PathBuf::from(&self.build.static_dir)),
        }
    }

    /// Sidebars from `docs.sidebar_path`, or the built-in tree when that
    /// file does not exist.
    pub fn load_sidebars(&self) -> Result<Sidebars> {
        let path = Path::new(&self.site.docs.sidebar_path);
        if path.exists() {
            Sidebars::read(path)
                .with_context(|| format!("Failed to read sidebars from {}", path.display()))
        } else {
            tracing::debug!(path = %path.display(), "No sidebar file, using the built-in sidebar");
            Ok(Sidebars::default())
        }
    }
}

/// Load configuration specifically for build commands
pub fn load_build_config(args: &ArgMatches) -> Result<SophiaConfig> {
    SophiaConfig::load(args)
}

/// Load configuration for serve commands, switched to dev mode
pub fn load_serve_config(args: &ArgMatches) -> Result<SophiaConfig> {
    let mut config = SophiaConfig::load(args)?;
    config
        .site
        .dev(config.build.host.clone(), config.build.port);
    Ok(config)
}
