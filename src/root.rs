//! Root assembly and the swappable current tree.
//!
//! The root is an album of the configured sources in declaration order.
//! [`Tree`] holds the current root behind a lock that is only taken to clone
//! or replace the handle; readers keep working on the root they captured
//! while a reload installs a new one.

use crate::album::Album;
use crate::element::{Element, ElementRef, TreeError, traverse_elements};
use crate::sources::{SourceContext, SourceRegistry};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{error, info};

/// Build a root album from a `sources` table. Entries that fail to build are
/// logged and left out.
pub fn assemble_root(
    registry: &SourceRegistry,
    context: &SourceContext,
    sources: &toml::Table,
) -> ElementRef {
    let mut children = Vec::with_capacity(sources.len());
    for (url_name, config) in sources {
        match registry.build(context, url_name, config) {
            Ok(element) => children.push(element),
            Err(e) => error!(source = %url_name, error = %e, "skipping source"),
        }
    }
    info!(
        sources = children.len(),
        rejected = sources.len() - children.len(),
        "tree assembled"
    );
    Arc::new(Element::new("", "", Album::new(children)))
}

/// The current tree.
#[derive(Debug)]
pub struct Tree {
    root: RwLock<ElementRef>,
    registry: SourceRegistry,
    context: SourceContext,
}

impl Tree {
    pub fn new(registry: SourceRegistry, context: SourceContext, sources: &toml::Table) -> Self {
        let root = assemble_root(&registry, &context, sources);
        Self {
            root: RwLock::new(root),
            registry,
            context,
        }
    }

    /// Assemble a new root from `sources` and make it current.
    pub fn reload(&self, sources: &toml::Table) {
        // Built before taking the lock so readers are never blocked on I/O
        let root = assemble_root(&self.registry, &self.context, sources);
        *self.root.write().unwrap_or_else(PoisonError::into_inner) = root;
    }

    /// Owned handle to the current root.
    pub fn root(&self) -> ElementRef {
        Arc::clone(&self.root.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn traverse(&self, path: &str) -> Result<ElementRef, TreeError> {
        traverse_elements(&self.root(), path)
    }

    /// The first non-hidden source flagged `home`.
    pub fn home(&self) -> Result<Option<ElementRef>, TreeError> {
        Ok(self
            .root()
            .children()?
            .into_iter()
            .find(|e| e.is_home() && !e.is_hidden()))
    }

    pub fn context(&self) -> &SourceContext {
        &self.context
    }
}
