//! Configured sources and the registry that builds them.
//!
//! Every `[sources.<url_name>]` table in the configuration names a source
//! type with its `type` key. The [`SourceRegistry`] maps type names to
//! constructors; [`SourceRegistry::with_defaults`] knows the built-in ones:
//!
//! | `type` | Content | Type-specific keys |
//! |--------|---------|--------------------|
//! | `folder` | [`FolderSource`] | `path`, `sort`, `tags` |
//! | `combine` | [`CombineSource`] | `internal_paths`, `tags` |
//! | `tags` | [`TagsSource`] | `internal_paths` |
//!
//! `path` and `internal_paths` are required. All types accept `name`
//! (defaults to the url_name), `hidden` and `home`.
//! Unknown keys are rejected so typos surface as a logged, skipped entry
//! rather than a silently ignored setting.
//!
//! ```toml
//! [sources.photos]
//! type = "folder"
//! name = "Photos"
//! path = "/srv/photos"
//! home = true
//! tags = "By tag"
//!
//! [sources.highlights]
//! type = "combine"
//! internal_paths = ["/photos/2019", "/photos/2020/best"]
//! ```

pub mod combine;
pub mod folder;
pub mod tags;

pub use combine::CombineSource;
pub use folder::{FolderImage, FolderSource, SortOrder, hash_file_state};
pub use tags::{TAGS_INDEX_URL_NAME, TagsIndex, TagsSource};

use crate::cache::Cache;
use crate::element::{Content, Element};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceConfigError {
    #[error("missing source type")]
    MissingType,
    #[error("unknown source type '{0}'")]
    UnknownType(String),
    #[error("source entry is not a table")]
    NotATable,
    #[error("invalid source settings: {0}")]
    Invalid(#[from] toml::de::Error),
    #[error("cannot resolve source path {path}: {source}")]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Shared services handed to every source constructor.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub cache: Arc<Cache>,
}

/// Build a detached element from its url_name and configuration table.
pub type SourceConstructor =
    fn(&SourceContext, &str, &toml::Table) -> Result<Element, SourceConfigError>;

/// Source type name → constructor.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    constructors: HashMap<String, SourceConstructor>,
}

impl SourceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the `folder`, `combine` and `tags` types.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("folder", build_folder);
        registry.register("combine", build_combine);
        registry.register("tags", build_tags);
        registry
    }

    /// Register (or replace) the constructor for `type_name`.
    pub fn register(&mut self, type_name: impl Into<String>, constructor: SourceConstructor) {
        self.constructors.insert(type_name.into(), constructor);
    }

    pub fn knows(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    /// Build the source configured as `[sources.<url_name>]`.
    pub fn build(
        &self,
        context: &SourceContext,
        url_name: &str,
        config: &toml::Value,
    ) -> Result<Element, SourceConfigError> {
        let table = config.as_table().ok_or(SourceConfigError::NotATable)?;
        let type_name = table
            .get("type")
            .and_then(toml::Value::as_str)
            .ok_or(SourceConfigError::MissingType)?;
        let constructor = self
            .constructors
            .get(type_name)
            .ok_or_else(|| SourceConfigError::UnknownType(type_name.to_string()))?;
        constructor(context, url_name, table)
    }
}

/// The `tags` key of folder and combine sources.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TagsOption {
    /// `true` embeds a hidden index named "Tags".
    Enabled(bool),
    /// A label embeds a visible index under that name.
    Named(String),
}

impl Default for TagsOption {
    fn default() -> Self {
        TagsOption::Enabled(false)
    }
}

impl TagsOption {
    pub fn index(&self) -> Option<TagsIndex> {
        match self {
            TagsOption::Enabled(false) => None,
            TagsOption::Enabled(true) => Some(TagsIndex::new("Tags", true)),
            TagsOption::Named(label) if label.trim().is_empty() => {
                Some(TagsIndex::new("Tags", false))
            }
            TagsOption::Named(label) => Some(TagsIndex::new(label.as_str(), false)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FolderConfig {
    name: Option<String>,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    home: bool,
    path: PathBuf,
    #[serde(default)]
    sort: SortOrder,
    #[serde(default)]
    tags: TagsOption,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CombineConfig {
    name: Option<String>,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    home: bool,
    internal_paths: Vec<String>,
    #[serde(default)]
    tags: TagsOption,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TagsConfig {
    name: Option<String>,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    home: bool,
    internal_paths: Vec<String>,
}

/// Deserialize a source table, minus its `type` key.
fn parse<T: DeserializeOwned>(table: &toml::Table) -> Result<T, SourceConfigError> {
    let mut settings = table.clone();
    settings.remove("type");
    Ok(toml::Value::Table(settings).try_into()?)
}

fn element(
    url_name: &str,
    name: Option<String>,
    hidden: bool,
    home: bool,
    content: impl Content + 'static,
) -> Element {
    Element::new(name.unwrap_or_else(|| url_name.to_string()), url_name, content)
        .with_hidden(hidden)
        .with_home(home)
}

fn build_folder(
    context: &SourceContext,
    url_name: &str,
    table: &toml::Table,
) -> Result<Element, SourceConfigError> {
    let config: FolderConfig = parse(table)?;
    let dir = std::path::absolute(&config.path).map_err(|source| SourceConfigError::Path {
        path: config.path.clone(),
        source,
    })?;
    let folder = FolderSource::new(dir, config.sort, Arc::clone(&context.cache))
        .with_tags(config.tags.index());
    Ok(element(url_name, config.name, config.hidden, config.home, folder))
}

fn build_combine(
    _context: &SourceContext,
    url_name: &str,
    table: &toml::Table,
) -> Result<Element, SourceConfigError> {
    let config: CombineConfig = parse(table)?;
    let combine = CombineSource::new(config.internal_paths).with_tags(config.tags.index());
    Ok(element(url_name, config.name, config.hidden, config.home, combine))
}

fn build_tags(
    _context: &SourceContext,
    url_name: &str,
    table: &toml::Table,
) -> Result<Element, SourceConfigError> {
    let config: TagsConfig = parse(table)?;
    let tags = TagsSource::new(config.internal_paths);
    Ok(element(url_name, config.name, config.hidden, config.home, tags))
}
