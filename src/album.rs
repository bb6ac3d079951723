//! Plain grouping node.
//!
//! An album owns detached child templates and attaches fresh copies of them
//! on every listing. The tree root is an album of the configured sources;
//! tag views are albums of cloned images.

use crate::element::{Content, Element, ElementRef, Identity, Kind, TreeError};

#[derive(Debug)]
pub struct Album {
    id: u64,
    templates: Vec<Element>,
}

impl Album {
    /// Group `children` in order. Their current parents are dropped.
    pub fn new(children: Vec<Element>) -> Self {
        Self {
            id: Identity::next_virtual_id(),
            templates: children.iter().map(Element::detached).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Content for Album {
    fn children(&self, this: &ElementRef) -> Result<Vec<ElementRef>, TreeError> {
        Ok(self
            .templates
            .iter()
            .enumerate()
            .map(|(index, template)| template.attach(this, index))
            .collect())
    }

    fn is_container(&self) -> bool {
        true
    }

    fn identity(&self) -> Identity {
        Identity::Virtual(self.id)
    }

    fn kind(&self) -> Kind {
        Kind::Album
    }
}
