//! Session-owned registry of opened fonts.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::error::FontError;
use crate::font::FontFile;

/// Resolves a font name to a file on disk.
pub trait FontLocator {
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

/// Tries the name as given, then each search directory in order.
#[derive(Clone, Debug, Default)]
pub struct SearchPathLocator {
    paths: Vec<PathBuf>,
}

impl SearchPathLocator {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        SearchPathLocator { paths }
    }
}

impl FontLocator for SearchPathLocator {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        let given = Path::new(name);
        if given.is_file() {
            return Some(given.to_path_buf());
        }
        self.paths
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

/// Fonts keyed by the name they were requested under. Dropping the cache (or
/// calling [`FontCache::clear`]) releases every font with its glyphs.
pub struct FontCache {
    config: Config,
    locator: Box<dyn FontLocator>,
    fonts: HashMap<String, FontFile>,
}

impl FontCache {
    pub fn new(config: Config) -> Self {
        let locator = SearchPathLocator::new(config.font_paths.clone());
        Self::with_locator(config, Box::new(locator))
    }

    pub fn with_locator(config: Config, locator: Box<dyn FontLocator>) -> Self {
        FontCache {
            config,
            locator,
            fonts: HashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The font registered under `name`, loading it on first use. A cached
    /// font whose stream was closed is reopened. Nothing is registered when
    /// loading fails.
    pub fn font(&mut self, name: &str) -> Result<&mut FontFile, FontError> {
        match self.fonts.entry(name.to_string()) {
            Entry::Occupied(entry) => {
                debug!("font cache hit: {name}");
                let font = entry.into_mut();
                font.reopen()?;
                Ok(font)
            }
            Entry::Vacant(entry) => {
                let path = self
                    .locator
                    .locate(name)
                    .ok_or_else(|| FontError::FontNotFound(name.to_string()))?;
                debug!("loading font {name} from {path:?}");
                let font = FontFile::open(&path, self.config.encoding)?;
                Ok(entry.insert(font))
            }
        }
    }

    /// Register a font held in memory under `name`, replacing any previous
    /// font of that name.
    pub fn insert_bytes(
        &mut self,
        name: &str,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<&mut FontFile, FontError> {
        let font = FontFile::from_bytes(name, bytes, self.config.encoding)?;
        match self.fonts.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.insert(font);
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => Ok(entry.insert(font)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fonts.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Release every font.
    pub fn clear(&mut self) {
        debug!("releasing {} fonts", self.fonts.len());
        self.fonts.clear();
    }
}

impl Default for FontCache {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
