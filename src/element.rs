//! The virtual element tree.
//!
//! Every node a gallery can show, whether a configured source, a directory
//! on disk, a computed tag view or a single photo, is an [`Element`]. An
//! element carries the attributes common to all nodes (names, flags, its
//! position under a parent) and a shared [`Content`] object supplying the
//! kind-specific behaviour: how to list children, whether it is an image.
//!
//! ## Ownership
//!
//! Children are produced on demand by [`Element::children`] and hold a
//! strong, upward-only reference to their parent. No element stores its
//! materialized children, so the reference graph is acyclic and a tree that
//! is no longer the current root is freed once the last reader drops it.
//!
//! ## Clones
//!
//! [`Element::clone_with`] copies an element's attributes and shares its
//! content under a new parent and index. Combine sources and tag views use
//! this to present the same folder or photo in several places; the clone
//! keeps the original's [`Identity`] and cache entry.
//!
//! ## Paths
//!
//! The root has an empty `url_name` and the path `""`. Every other node's
//! path is its parent's path, a `/`, and its own `url_name`, recomputed on
//! each call:
//!
//! ```text
//! ""                         root
//! "/photos"                  configured folder source
//! "/photos/2019"             sub-folder
//! "/photos/2019/beach.jpg"   image
//! ```

use crate::cache::CacheError;
use crate::media::Image;
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::warn;

/// Shared handle to an attached element.
pub type ElementRef = Arc<Element>;

#[derive(Error, Debug)]
pub enum TreeError {
    /// `path` is relative to the element the lookup started from and ends
    /// with the first segment that could not be resolved.
    #[error("not found: {path}")]
    NotFound { path: String },
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl TreeError {
    /// Prefix a not-found path with the segment of the enclosing level.
    /// Other errors pass through unchanged.
    pub fn prepend(self, segment: &str) -> Self {
        match self {
            TreeError::NotFound { path } => TreeError::NotFound {
                path: format!("{segment}/{path}"),
            },
            other => other,
        }
    }
}

/// Stable identity of an element's content, shared by all of its clones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Directory(PathBuf),
    File(PathBuf),
    Virtual(u64),
}

static NEXT_VIRTUAL_ID: AtomicU64 = AtomicU64::new(1);

impl Identity {
    /// Allocate a process-unique id for content with no filesystem anchor.
    pub fn next_virtual_id() -> u64 {
        NEXT_VIRTUAL_ID.fetch_add(1, Ordering::Relaxed)
    }
}

/// What an element is, for display and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Album,
    Folder,
    Combine,
    Tags,
    Image,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Album => "album",
            Kind::Folder => "folder",
            Kind::Combine => "combine",
            Kind::Tags => "tags",
            Kind::Image => "image",
        };
        f.write_str(s)
    }
}

/// Kind-specific behaviour behind an [`Element`].
pub trait Content: Send + Sync + fmt::Debug {
    /// List the children of `this`, an element wrapping this content.
    ///
    /// Returned elements must be attached to `this` with indices matching
    /// their positions.
    fn children(&self, this: &ElementRef) -> Result<Vec<ElementRef>, TreeError>;

    fn is_container(&self) -> bool;

    fn identity(&self) -> Identity;

    fn kind(&self) -> Kind;

    /// The image capability, for displayable leaves.
    fn image(&self) -> Option<&dyn Image> {
        None
    }
}

/// A node of the tree.
pub struct Element {
    parent: Option<ElementRef>,
    index: usize,
    name: String,
    url_name: String,
    hidden: bool,
    home: bool,
    content: Arc<dyn Content>,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("path", &self.path())
            .field("index", &self.index)
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("hidden", &self.hidden)
            .field("home", &self.home)
            .finish()
    }
}

impl Element {
    /// A detached element (no parent, index 0).
    pub fn new(
        name: impl Into<String>,
        url_name: impl Into<String>,
        content: impl Content + 'static,
    ) -> Self {
        Self {
            parent: None,
            index: 0,
            name: name.into(),
            url_name: url_name.into(),
            hidden: false,
            home: false,
            content: Arc::new(content),
        }
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_home(mut self, home: bool) -> Self {
        self.home = home;
        self
    }

    /// Copy this element under a new parent and index. Content, identity
    /// and cache state are shared with the original.
    pub fn clone_with(&self, parent: Option<ElementRef>, index: usize) -> ElementRef {
        Arc::new(self.copy_to(parent, index))
    }

    /// A parentless copy, for use as a template that is attached later.
    pub fn detached(&self) -> Element {
        self.copy_to(None, 0)
    }

    /// Attach a copy of this element as child `index` of `parent`.
    pub fn attach(&self, parent: &ElementRef, index: usize) -> ElementRef {
        self.clone_with(Some(Arc::clone(parent)), index)
    }

    fn copy_to(&self, parent: Option<ElementRef>, index: usize) -> Element {
        Element {
            parent,
            index,
            name: self.name.clone(),
            url_name: self.url_name.clone(),
            hidden: self.hidden,
            home: self.home,
            content: Arc::clone(&self.content),
        }
    }

    pub fn parent(&self) -> Option<&ElementRef> {
        self.parent.as_ref()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Name given by the source: the file name of an image, the folder
    /// heading, or the configured name. Embedded titles are not consulted;
    /// see [`Element::display_name`].
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url_name(&self) -> &str {
        &self.url_name
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_home(&self) -> bool {
        self.home
    }

    pub fn is_container(&self) -> bool {
        self.content.is_container()
    }

    pub fn identity(&self) -> Identity {
        self.content.identity()
    }

    pub fn kind(&self) -> Kind {
        self.content.kind()
    }

    pub fn image(&self) -> Option<&dyn Image> {
        self.content.image()
    }

    /// Slash-separated path from the root; `""` for the root itself.
    pub fn path(&self) -> String {
        let mut segments = Vec::new();
        let mut current = self;
        while let Some(parent) = &current.parent {
            segments.push(current.url_name.as_str());
            current = parent;
        }
        segments
            .iter()
            .rev()
            .fold(String::new(), |mut path, segment| {
                path.push('/');
                path.push_str(segment);
                path
            })
    }

    /// The topmost ancestor.
    pub fn root(self: &Arc<Self>) -> ElementRef {
        let mut current = self;
        while let Some(parent) = &current.parent {
            current = parent;
        }
        Arc::clone(current)
    }

    pub fn children(self: &Arc<Self>) -> Result<Vec<ElementRef>, TreeError> {
        self.content.children(self)
    }

    /// Resolve a relative path below this element.
    pub fn traverse(self: &Arc<Self>, path: &str) -> Result<ElementRef, TreeError> {
        traverse_elements(self, path)
    }

    /// Embedded title of an image, if it has one and its cache entry can be
    /// built.
    pub fn title(&self) -> Option<String> {
        let image = self.image()?;
        match image.cache_entry() {
            Ok(entry) => entry.title.clone(),
            Err(e) => {
                warn!(path = %self.path(), error = %e, "cannot read image title");
                None
            }
        }
    }

    /// Heading to show for this element: an image's embedded title when it
    /// has one, otherwise [`Element::name`].
    pub fn display_name(&self) -> String {
        self.title().unwrap_or_else(|| self.name.clone())
    }
}

/// Resolve `path` (`/`-separated `url_name` segments) starting at `origin`.
///
/// An empty path yields `origin` itself. Empty segments are ignored, so
/// `"/a//b/"` resolves like `"a/b"`. Among siblings the first match in
/// child order wins. A missing segment yields [`TreeError::NotFound`] whose
/// path runs from `origin` down to the failing segment; listing errors are
/// returned unchanged.
pub fn traverse_elements(origin: &ElementRef, path: &str) -> Result<ElementRef, TreeError> {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return Ok(Arc::clone(origin));
    }
    let (segment, rest) = path.split_once('/').unwrap_or((path, ""));

    let child = origin
        .children()?
        .into_iter()
        .find(|child| child.url_name == segment)
        .ok_or_else(|| TreeError::NotFound {
            path: segment.to_string(),
        })?;

    traverse_elements(&child, rest).map_err(|e| e.prepend(segment))
}

/// The sibling before `element` in its parent's full child list.
pub fn previous_element(element: &ElementRef) -> Result<Option<ElementRef>, TreeError> {
    let Some(parent) = element.parent() else {
        return Ok(None);
    };
    let Some(index) = element.index().checked_sub(1) else {
        return Ok(None);
    };
    Ok(parent.children()?.into_iter().nth(index))
}

/// The sibling after `element` in its parent's full child list.
pub fn next_element(element: &ElementRef) -> Result<Option<ElementRef>, TreeError> {
    let Some(parent) = element.parent() else {
        return Ok(None);
    };
    Ok(parent.children()?.into_iter().nth(element.index() + 1))
}

// ============================================================================
// Filters
// ============================================================================

pub fn filter_non_hidden(elements: &[ElementRef]) -> Vec<ElementRef> {
    elements.iter().filter(|e| !e.is_hidden()).cloned().collect()
}

pub fn filter_containers(elements: &[ElementRef]) -> Vec<ElementRef> {
    elements.iter().filter(|e| e.is_container()).cloned().collect()
}

pub fn filter_images(elements: &[ElementRef]) -> Vec<ElementRef> {
    elements
        .iter()
        .filter(|e| e.image().is_some())
        .cloned()
        .collect()
}

/// Plain grouping nodes only.
pub fn filter_albums(elements: &[ElementRef]) -> Vec<ElementRef> {
    elements
        .iter()
        .filter(|e| e.kind() == Kind::Album)
        .cloned()
        .collect()
}

pub fn filter_home(elements: &[ElementRef]) -> Vec<ElementRef> {
    elements.iter().filter(|e| e.is_home()).cloned().collect()
}

/// Elements with at least one child. Elements whose listing fails are
/// logged and dropped.
pub fn filter_non_empty(elements: &[ElementRef]) -> Vec<ElementRef> {
    elements
        .iter()
        .filter(|e| match e.children() {
            Ok(children) => !children.is_empty(),
            Err(err) => {
                warn!(path = %e.path(), error = %err, "cannot list children");
                false
            }
        })
        .cloned()
        .collect()
}

// ============================================================================
// Walks
// ============================================================================

/// Depth-first walk over the non-hidden descendants of `origin`, calling
/// `visit` once per distinct [`Identity`].
///
/// Identities already in `visited` are skipped along with their subtrees,
/// which keeps the walk finite when combine sources reference their own
/// ancestors.
pub fn walk_unique(
    origin: &ElementRef,
    visited: &mut HashSet<Identity>,
    visit: &mut dyn FnMut(&ElementRef) -> Result<(), TreeError>,
) -> Result<(), TreeError> {
    for child in filter_non_hidden(&origin.children()?) {
        if !visited.insert(child.identity()) {
            continue;
        }
        visit(&child)?;
        if child.is_container() {
            walk_unique(&child, visited, visit)?;
        }
    }
    Ok(())
}

/// Up to `limit` images to represent `container`.
///
/// Non-hidden direct images come first; when there are not enough, the
/// non-hidden child containers are searched in order, depth first. Each
/// image and container is considered once, so clones do not repeat.
pub fn get_preview_images(
    container: &ElementRef,
    limit: usize,
) -> Result<Vec<ElementRef>, TreeError> {
    let mut visited = HashSet::from([container.identity()]);
    let mut previews = Vec::new();
    collect_previews(container, limit, &mut visited, &mut previews)?;
    Ok(previews)
}

fn collect_previews(
    container: &ElementRef,
    limit: usize,
    visited: &mut HashSet<Identity>,
    previews: &mut Vec<ElementRef>,
) -> Result<(), TreeError> {
    let children = filter_non_hidden(&container.children()?);

    for image in filter_images(&children) {
        if previews.len() >= limit {
            return Ok(());
        }
        if visited.insert(image.identity()) {
            previews.push(image);
        }
    }

    for child in filter_containers(&children) {
        if previews.len() >= limit {
            break;
        }
        if visited.insert(child.identity()) {
            collect_previews(&child, limit, visited, previews)?;
        }
    }
    Ok(())
}
