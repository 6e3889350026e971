//! Page storage backends.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use wikitrans_wikitext::interwiki_links;

const PAGE_EXTENSION: &str = "wiki";

/// Content model of a saved page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentModel {
    Wikitext,
    Json,
}

/// A wiki, local or remote
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Current text of `title`, `None` when the page does not exist
    async fn fetch_wikitext(&self, title: &str) -> Result<Option<String>>;

    async fn page_exists(&self, title: &str) -> Result<bool>;

    /// Language code → title of the page's interlanguage links
    async fn langlinks(&self, title: &str) -> Result<BTreeMap<String, String>>;

    async fn save_page(
        &self,
        title: &str,
        text: &str,
        summary: &str,
        model: ContentModel,
    ) -> Result<()>;

    /// Where this store lives, for logging
    fn location(&self) -> String;
}

/// Pages stored as `<dir>/<title>.wiki`; subpage titles map to subdirectories.
///
/// Interlanguage links are read from the `[[lang:Title]]` markers in the
/// page text.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path for `title`; rejects titles that would escape the root
    pub fn page_path(&self, title: &str) -> Result<PathBuf> {
        let title = title.trim();
        if title.is_empty() {
            bail!("Empty page title");
        }
        let relative = PathBuf::from(format!("{title}.{PAGE_EXTENSION}"));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            bail!("Page title '{title}' is not a plain relative path");
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl PageStore for DirectoryStore {
    async fn fetch_wikitext(&self, title: &str) -> Result<Option<String>> {
        let path = self.page_path(title)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn page_exists(&self, title: &str) -> Result<bool> {
        let path = self.page_path(title)?;
        tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("Failed to stat {}", path.display()))
    }

    async fn langlinks(&self, title: &str) -> Result<BTreeMap<String, String>> {
        Ok(self
            .fetch_wikitext(title)
            .await?
            .map(|text| interwiki_links(&text))
            .unwrap_or_default())
    }

    async fn save_page(
        &self,
        title: &str,
        text: &str,
        summary: &str,
        _model: ContentModel,
    ) -> Result<()> {
        let path = self.page_path(title)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&path, text)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::debug!("Saved {} ({summary})", path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}
