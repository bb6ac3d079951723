//! Tag views.
//!
//! A tags source walks the non-hidden subtrees below its configured paths,
//! reads each image's tags through the derivative cache and presents one
//! synthetic album per tag. Albums are ordered by how many images carry the
//! tag (most first), ties broken by tag name.
//!
//! Tag views are computed on every listing; nothing is stored between calls.

use crate::album::Album;
use crate::element::{
    Content, Element, ElementRef, Identity, Kind, TreeError, traverse_elements, walk_unique,
};
use crate::naming::slug;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// `url_name` of the tags index embedded in folder and combine sources.
pub const TAGS_INDEX_URL_NAME: &str = "_tags_";

/// Content of a tags element.
#[derive(Debug)]
pub struct TagsSource {
    id: u64,
    paths: Vec<String>,
}

impl TagsSource {
    /// A tag view over the given absolute tree paths.
    pub fn new(paths: Vec<String>) -> Self {
        Self::with_id(Identity::next_virtual_id(), paths)
    }

    fn with_id(id: u64, paths: Vec<String>) -> Self {
        Self { id, paths }
    }

    fn collect_groups(&self, this: &ElementRef) -> Result<Vec<(String, Vec<ElementRef>)>, TreeError> {
        let root = this.root();
        // Seeding with our own identity keeps the walk out of this view
        let mut visited = HashSet::from([self.identity()]);
        let mut groups: HashMap<String, Vec<ElementRef>> = HashMap::new();

        for path in &self.paths {
            let start = match traverse_elements(&root, path) {
                Ok(start) => start,
                Err(TreeError::NotFound { path: missing }) => {
                    warn!(view = %this.path(), path = %path, missing = %missing, "tags path not found, skipping");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if !visited.insert(start.identity()) {
                continue;
            }
            walk_unique(&start, &mut visited, &mut |element| {
                let Some(image) = element.image() else {
                    return Ok(());
                };
                match image.cache_entry() {
                    Ok(entry) => {
                        let mut seen = HashSet::new();
                        for tag in entry.tags.iter().filter(|t| seen.insert(t.as_str())) {
                            groups.entry(tag.clone()).or_default().push(element.clone());
                        }
                    }
                    Err(e) => {
                        warn!(path = %element.path(), error = %e, "cannot read image tags, skipping");
                    }
                }
                Ok(())
            })?;
        }

        let mut groups: Vec<(String, Vec<ElementRef>)> = groups.into_iter().collect();
        groups.sort_by(|(tag_a, images_a), (tag_b, images_b)| {
            images_b
                .len()
                .cmp(&images_a.len())
                .then_with(|| tag_a.cmp(tag_b))
        });
        Ok(groups)
    }
}

thread_local! {
    /// Tag views being listed on this thread.
    static ACTIVE_VIEWS: RefCell<HashSet<u64>> = RefCell::new(HashSet::new());
}

/// Marks a tag view as being listed until dropped.
struct ActiveView(u64);

impl ActiveView {
    /// `None` when the view is already being listed further up the stack.
    fn enter(id: u64) -> Option<Self> {
        ACTIVE_VIEWS
            .with(|active| active.borrow_mut().insert(id))
            .then_some(ActiveView(id))
    }
}

impl Drop for ActiveView {
    fn drop(&mut self) {
        ACTIVE_VIEWS.with(|active| active.borrow_mut().remove(&self.0));
    }
}

/// URL segment of the album for `tag` at position `index`.
fn tag_url_name(tag: &str, index: usize) -> String {
    let name = slug(tag);
    if name.is_empty() {
        format!("tag-{index}")
    } else {
        name
    }
}

/// `base`, or the first free `base-2`, `base-3`, ... when a sibling has it.
///
/// Distinct tags can share a slug ("Cat" and "cat"); each album still needs
/// its own path segment.
fn claim_url_name(base: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

impl Content for TagsSource {
    fn children(&self, this: &ElementRef) -> Result<Vec<ElementRef>, TreeError> {
        // Two tag views whose paths reach each other would otherwise list
        // one another forever.
        let Some(_active) = ActiveView::enter(self.id) else {
            debug!(view = %this.path(), "tags view reached itself, listing empty");
            return Ok(Vec::new());
        };

        let groups = self.collect_groups(this)?;
        let mut taken = HashSet::new();
        Ok(groups
            .into_iter()
            .enumerate()
            .map(|(index, (tag, images))| {
                let members = images.iter().map(|image| image.detached()).collect();
                let url_name = claim_url_name(tag_url_name(&tag, index), &mut taken);
                Element::new(tag.as_str(), url_name, Album::new(members)).attach(this, index)
            })
            .collect())
    }

    fn is_container(&self) -> bool {
        true
    }

    fn identity(&self) -> Identity {
        Identity::Virtual(self.id)
    }

    fn kind(&self) -> Kind {
        Kind::Tags
    }
}

/// A tags view a source embeds over its own subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagsIndex {
    name: String,
    hidden: bool,
    id: u64,
}

impl TagsIndex {
    pub fn new(name: impl Into<String>, hidden: bool) -> Self {
        Self {
            name: name.into(),
            hidden,
            id: Identity::next_virtual_id(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// The index element for `owner`, detached. Every listing shares one
    /// identity so walks over the owner never re-enter the index.
    pub fn template(&self, owner: &ElementRef) -> Element {
        let source = TagsSource::with_id(self.id, vec![owner.path()]);
        Element::new(self.name.as_str(), TAGS_INDEX_URL_NAME, source).with_hidden(self.hidden)
    }
}
