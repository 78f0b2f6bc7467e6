use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context};
use homedir::my_home;
use serde::{Deserialize, Serialize};

use crate::search::SearchOptions;

const CONFIG_FILE_NAME: &str = "config.yaml";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// Snippets longer than this are not supported by the index.
const MAX_SNIPPET_SIZE: u32 = 64;

/// Defaults for search requests that don't set their own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_snippet_size")]
    pub snippet_size: u32,

    #[serde(default = "default_max_count")]
    pub max_count: usize,

    #[serde(default)]
    pub highlight: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let opts = SearchOptions::default();
        Self {
            snippet_size: opts.snippet_size,
            max_count: opts.max_count,
            highlight: opts.highlight,
        }
    }
}

impl SearchConfig {
    pub fn options(&self) -> SearchOptions {
        SearchOptions {
            highlight: self.highlight,
            snippet_size: self.snippet_size,
            max_count: self.max_count,
        }
    }
}

fn default_snippet_size() -> u32 {
    SearchOptions::default().snippet_size
}

fn default_max_count() -> usize {
    SearchOptions::default().max_count
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding snapshot archives and the index.
    /// Defaults to `<base path>/library`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_root: Option<PathBuf>,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            library_root: None,
            search: SearchConfig::default(),
            listen_addr: default_listen_addr(),
            base_path: PathBuf::new(),
        }
    }
}

/// `$HOARD_BASE_PATH`, else `~/.local/share/hoard`.
pub fn base_path() -> anyhow::Result<PathBuf> {
    if let Ok(base_path) = std::env::var("HOARD_BASE_PATH") {
        return Ok(PathBuf::from(base_path));
    }

    let home = my_home()
        .map_err(|err| anyhow!("couldn't find home dir: {err:?}"))?
        .ok_or_else(|| anyhow!("couldn't find home dir"))?;

    Ok(home.join(".local/share/hoard"))
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        let snippet_size = self.search.snippet_size;
        if !(1..=MAX_SNIPPET_SIZE).contains(&snippet_size) {
            bail!("search.snippet_size must be between 1 and {MAX_SNIPPET_SIZE}, got {snippet_size}");
        }

        self.listen_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("listen_addr {:?} is not a socket address", self.listen_addr))?;

        Ok(())
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(&base_path()?)
    }

    pub fn load_with(base_path: &Path) -> anyhow::Result<Self> {
        let config_path = base_path.join(CONFIG_FILE_NAME);

        // create new if does not exist
        if !config_path.exists() {
            let config = Self {
                base_path: base_path.to_path_buf(),
                ..Default::default()
            };
            config.save()?;
        }

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("couldn't read {}", config_path.display()))?;
        let mut config: Self = serde_yml::from_str(&config_str)
            .with_context(|| format!("{} is malformed", config_path.display()))?;

        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.base_path)
            .with_context(|| format!("couldn't create {}", self.base_path.display()))?;

        let config_str = serde_yml::to_string(&self)?;
        std::fs::write(self.base_path.join(CONFIG_FILE_NAME), config_str)?;
        Ok(())
    }

    pub fn library_root(&self) -> PathBuf {
        match &self.library_root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => self.base_path.join(root),
            None => self.base_path.join("library"),
        }
    }
}
