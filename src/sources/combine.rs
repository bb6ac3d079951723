//! Merged views over other parts of the tree.
//!
//! A combine source lists the nodes found at its configured paths, resolved
//! from the root of the tree it lives in, re-parented under itself in
//! declaration order. Paths that do not resolve are logged and left out.

use super::tags::TagsIndex;
use crate::element::{Content, ElementRef, Identity, Kind, TreeError, traverse_elements};
use tracing::warn;

/// Content of a combine element.
#[derive(Debug)]
pub struct CombineSource {
    id: u64,
    paths: Vec<String>,
    tags: Option<TagsIndex>,
}

impl CombineSource {
    pub fn new(paths: Vec<String>) -> Self {
        Self {
            id: Identity::next_virtual_id(),
            paths,
            tags: None,
        }
    }

    /// Embed a tags index over this combine as its first child.
    pub fn with_tags(mut self, tags: Option<TagsIndex>) -> Self {
        self.tags = tags;
        self
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

impl Content for CombineSource {
    fn children(&self, this: &ElementRef) -> Result<Vec<ElementRef>, TreeError> {
        let mut children = Vec::new();
        if let Some(index) = &self.tags {
            children.push(index.template(this).attach(this, 0));
        }

        let root = this.root();
        for path in &self.paths {
            match traverse_elements(&root, path) {
                Ok(found) => {
                    let index = children.len();
                    children.push(found.clone_with(Some(this.clone()), index));
                }
                Err(e) => {
                    warn!(combine = %this.path(), path = %path, error = %e, "cannot resolve combined path, skipping");
                }
            }
        }
        Ok(children)
    }

    fn is_container(&self) -> bool {
        true
    }

    fn identity(&self) -> Identity {
        Identity::Virtual(self.id)
    }

    fn kind(&self) -> Kind {
        Kind::Combine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::album::Album;
    use crate::element::{Element, get_preview_images, walk_unique};
    use crate::test_helpers::{FailingContainer, assert_children, child_names, image_leaf};
    use std::collections::HashSet;
    use std::sync::Arc;

    /// root
    /// ├── summer (album): beach.jpg, dunes.jpg
    /// ├── winter (album): snow.jpg
    /// └── best (combine over the given paths)
    fn tree_with(paths: &[&str]) -> ElementRef {
        let summer = Element::new(
            "Summer",
            "summer",
            Album::new(vec![image_leaf("beach.jpg", "h1"), image_leaf("dunes.jpg", "h2")]),
        );
        let winter = Element::new("Winter", "winter", Album::new(vec![image_leaf("snow.jpg", "h3")]));
        let best = Element::new(
            "Best",
            "best",
            CombineSource::new(paths.iter().map(|p| p.to_string()).collect()),
        );
        Arc::new(Element::new("", "", Album::new(vec![summer, winter, best])))
    }

    #[test]
    fn children_follow_declaration_order() {
        let root = tree_with(&["/winter", "/summer/dunes.jpg", "/summer"]);
        assert_children(&root, "best", &["winter", "dunes.jpg", "summer"]);
    }

    #[test]
    fn combined_nodes_are_reparented() {
        let root = tree_with(&["/winter", "/summer"]);
        let best = root.traverse("best").unwrap();
        let children = best.children().unwrap();

        for (i, child) in children.iter().enumerate() {
            assert_eq!(child.index(), i);
            assert!(Arc::ptr_eq(child.parent().unwrap(), &best));
        }
        let beach = root.traverse("best/summer/beach.jpg").unwrap();
        assert_eq!(beach.path(), "/best/summer/beach.jpg");
        assert_eq!(
            beach.identity(),
            root.traverse("summer/beach.jpg").unwrap().identity()
        );
    }

    #[test]
    fn unresolvable_paths_are_skipped_with_contiguous_indices() {
        let root = tree_with(&["/missing", "/winter", "/summer/nope.jpg", "/summer"]);
        let children = root.traverse("best").unwrap().children().unwrap();

        assert_eq!(child_names(&children), ["winter", "summer"]);
        assert_eq!(children[1].index(), 1);
    }

    #[test]
    fn failing_listings_are_skipped() {
        let broken = Element::new("Broken", "broken", FailingContainer);
        let best = Element::new(
            "Best",
            "best",
            CombineSource::new(vec!["/broken/x".into(), "/ok".into()]),
        );
        let ok = Element::new("Ok", "ok", Album::new(vec![]));
        let root = Arc::new(Element::new("", "", Album::new(vec![broken, best, ok])));

        assert_children(&root, "best", &["ok"]);
    }

    #[test]
    fn paths_resolve_from_the_tree_root() {
        let root = tree_with(&["winter"]);
        // Listed from a nested position, the combine still resolves from the root
        let nested = root.traverse("best/winter").unwrap();
        assert_eq!(nested.path(), "/best/winter");
        assert_children(&root, "best/winter", &["snow.jpg"]);
    }

    // =========================================================================
    // Cycles
    // =========================================================================

    #[test]
    fn self_including_combine_resolves_finite_paths() {
        let root = tree_with(&["/best", "/winter"]);
        assert_children(&root, "best", &["best", "winter"]);
        assert_children(&root, "best/best/best", &["best", "winter"]);
    }

    #[test]
    fn walks_over_cycles_terminate() {
        let root = tree_with(&["/", "/summer"]);
        let mut visited = HashSet::new();
        let mut images = Vec::new();
        walk_unique(&root, &mut visited, &mut |e| {
            if e.image().is_some() {
                images.push(e.url_name().to_string());
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(images, ["beach.jpg", "dunes.jpg", "snow.jpg"]);
    }

    #[test]
    fn previews_over_cycles_terminate() {
        let root = tree_with(&["/", "/winter"]);
        let best = root.traverse("best").unwrap();

        let previews = get_preview_images(&best, 10).unwrap();
        assert_eq!(child_names(&previews), ["beach.jpg", "dunes.jpg", "snow.jpg"]);
    }

    #[test]
    fn embedded_index_comes_first() {
        let best = Element::new(
            "Best",
            "best",
            CombineSource::new(vec!["/summer".into()]).with_tags(Some(TagsIndex::new("Tags", true))),
        );
        let summer = Element::new("Summer", "summer", Album::new(vec![image_leaf("a.jpg", "h1")]));
        let root = Arc::new(Element::new("", "", Album::new(vec![summer, best])));

        let children = root.traverse("best").unwrap().children().unwrap();
        assert_eq!(child_names(&children), ["_tags_", "summer"]);
        assert_eq!(children[1].index(), 1);
        assert!(children[0].is_hidden());
    }
}
