use crate::error::FolioError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

/// Default name of the configuration file looked up in the content root.
pub const CONFIG_NAME: &str = "folio.toml";

/// Environment variable overriding [`SiteConfig::site_url`].
pub const SITE_URL_ENV: &str = "FOLIO_SITE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Base URL every non-external link is qualified against. Empty keeps links site-relative.
    pub site_url: String,
    /// Content sub-roots that are scanned for records.
    pub page_paths: Vec<String>,
    /// Synthesize the top-level menu from folders when no hand-authored menu exists.
    pub auto_menu: bool,
    /// Glob patterns of file names skipped during discovery.
    pub ignore_files: Vec<String>,
    pub output_path: Option<PathBuf>,
    /// Page that fallback menu links point at.
    pub not_found_page: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            site_url: String::new(),
            page_paths: vec!["pages".to_string()],
            auto_menu: false,
            ignore_files: vec![
                "_raw_*.*".to_string(),
                ".#*".to_string(),
                "_navmenu_auto_.yml".to_string(),
                ".DS_Store".to_string(),
            ],
            output_path: None,
            not_found_page: "404.html".to_string(),
        }
    }
}

impl SiteConfig {
    /// Read a TOML config file. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<SiteConfig, FolioError> {
        let path = path.as_ref();
        tracing::debug!("Attempting to read site config from: {:?}", path);
        let config = if path.exists() {
            let content = read_to_string(path)?;
            toml::from_str::<SiteConfig>(&content)?
        } else {
            tracing::debug!("Config file not found, using defaults.");
            SiteConfig::default()
        };
        config.with_env_overrides().validated()
    }

    /// Apply [`SITE_URL_ENV`] when set.
    pub fn with_env_overrides(mut self) -> SiteConfig {
        if let Ok(site_url) = std::env::var(SITE_URL_ENV) {
            tracing::debug!("{} overrides site_url with {}", SITE_URL_ENV, site_url);
            self.site_url = site_url;
        }
        self
    }

    pub fn validated(self) -> Result<SiteConfig, FolioError> {
        if !self.site_url.is_empty() {
            url::Url::parse(&self.site_url)?;
        }
        if self.page_paths.is_empty() {
            return Err(FolioError::Config(
                "page_paths must name at least one directory".to_string(),
            ));
        }
        self.ignore_matcher()?;
        Ok(self)
    }

    /// Compile `ignore_files` into one glob set, matched against file names.
    pub fn ignore_matcher(&self) -> Result<Option<GlobSet>, FolioError> {
        if self.ignore_files.is_empty() {
            return Ok(None);
        }
        let globs = self
            .ignore_files
            .iter()
            .map(|pattern| Glob::new(pattern))
            .collect::<Result<Vec<Glob>, _>>()?;
        let set = globs
            .into_iter()
            .fold(&mut GlobSetBuilder::new(), |builder, glob| builder.add(glob))
            .build()?;
        Ok(Some(set))
    }
}
