//! CLI output formatting.
//!
//! Every entity leads with its positional index and display name; details
//! follow as indented context lines. Format functions return `Vec<String>`
//! so tests can check them line by line; the binary prints them.
//!
//! # Output Format
//!
//! ## Tree
//!
//! ```text
//! / (album)
//!     001 Photos (folder, home)
//!         001 Tags (tags, hidden)
//!         002 Summer Trip (folder)
//!             001 beach.jpg
//!     002 Highlights (combine)
//! ```
//!
//! ## Show
//!
//! ```text
//! beach.jpg (image)
//!     Path: /photos/summer/beach.jpg
//!     Previous: /photos/summer/dunes.jpg
//!     Title: Low tide
//!     Tags: sea, sand
//!     Size: 4000x3000
//! ```
//!
//! ## Warm
//!
//! ```text
//! 001 /photos/summer/beach.jpg: built
//! 002 /photos/summer/dunes.jpg: cached
//! ```

use crate::cache::Origin;
use crate::element::{
    ElementRef, Identity, get_preview_images, next_element, previous_element,
};
use crate::warm::WarmEvent;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Kind plus the flags that are set, e.g. `(folder, hidden, home)`.
fn kind_label(element: &ElementRef) -> String {
    let mut parts = vec![element.kind().to_string()];
    if element.is_hidden() {
        parts.push("hidden".into());
    }
    if element.is_home() {
        parts.push("home".into());
    }
    format!("({})", parts.join(", "))
}

fn display_name(element: &ElementRef) -> &str {
    if element.parent().is_none() {
        "/"
    } else {
        element.name()
    }
}

// ============================================================================
// Tree
// ============================================================================

/// Indented listing of `origin` and its descendants.
///
/// Images are listed by name only; their titles need a cache entry. Hidden
/// elements are skipped unless `show_hidden`. A container that also appears
/// among its own ancestors (a combine including itself) is listed but not
/// expanded again.
pub fn format_tree(origin: &ElementRef, max_depth: Option<usize>, show_hidden: bool) -> Vec<String> {
    let mut lines = vec![format!("{} {}", display_name(origin), kind_label(origin))];
    let mut ancestors = vec![origin.identity()];
    tree_lines(origin, 1, max_depth, show_hidden, &mut ancestors, &mut lines);
    lines
}

fn tree_lines(
    container: &ElementRef,
    depth: usize,
    max_depth: Option<usize>,
    show_hidden: bool,
    ancestors: &mut Vec<Identity>,
    lines: &mut Vec<String>,
) {
    if max_depth.is_some_and(|max| depth > max) {
        return;
    }
    let children = match container.children() {
        Ok(children) => children,
        Err(e) => {
            lines.push(format!("{}Error: {}", indent(depth), e));
            return;
        }
    };

    for child in children.iter().filter(|c| show_hidden || !c.is_hidden()) {
        let position = format_index(child.index() + 1);
        if child.image().is_some() {
            lines.push(format!("{}{} {}", indent(depth), position, child.name()));
            continue;
        }
        let identity = child.identity();
        if ancestors.contains(&identity) {
            lines.push(format!(
                "{}{} {} {} (repeats {})",
                indent(depth),
                position,
                child.name(),
                kind_label(child),
                child.url_name()
            ));
            continue;
        }
        lines.push(format!(
            "{}{} {} {}",
            indent(depth),
            position,
            child.name(),
            kind_label(child)
        ));
        ancestors.push(identity);
        tree_lines(child, depth + 1, max_depth, show_hidden, ancestors, lines);
        ancestors.pop();
    }
}

// ============================================================================
// Show
// ============================================================================

/// Details of one element: position, siblings, previews and, for images,
/// the cache entry. Lookup failures become `Error:` lines.
pub fn format_details(element: &ElementRef, preview_limit: usize) -> Vec<String> {
    let mut lines = vec![format!("{} {}", display_name(element), kind_label(element))];
    let context = indent(1);

    lines.push(format!("{context}Path: {}", element.path()));
    if element.name() != element.url_name() {
        lines.push(format!("{context}URL name: {}", element.url_name()));
    }

    match previous_element(element) {
        Ok(Some(previous)) => lines.push(format!("{context}Previous: {}", previous.path())),
        Ok(None) => {}
        Err(e) => lines.push(format!("{context}Error: {e}")),
    }
    match next_element(element) {
        Ok(Some(next)) => lines.push(format!("{context}Next: {}", next.path())),
        Ok(None) => {}
        Err(e) => lines.push(format!("{context}Error: {e}")),
    }

    if element.is_container() {
        match element.children() {
            Ok(children) => lines.push(format!("{context}Children: {}", children.len())),
            Err(e) => lines.push(format!("{context}Error: {e}")),
        }
        match get_preview_images(element, preview_limit) {
            Ok(previews) if !previews.is_empty() => {
                let paths: Vec<String> = previews.iter().map(|p| p.path()).collect();
                lines.push(format!("{context}Previews: {}", paths.join(", ")));
            }
            Ok(_) => {}
            Err(e) => lines.push(format!("{context}Error: {e}")),
        }
    }

    if let Some(image) = element.image() {
        match image.cache_entry() {
            Ok(entry) => {
                let title = entry.title.as_deref().unwrap_or(element.name());
                lines.push(format!("{context}Title: {title}"));
                if entry.rating != 0 {
                    lines.push(format!("{context}Rating: {}", entry.rating));
                }
                if !entry.tags.is_empty() {
                    lines.push(format!("{context}Tags: {}", entry.tags.join(", ")));
                }
                lines.push(format!("{context}Size: {}x{}", entry.width, entry.height));
                lines.push(format!("{context}Hash: {}", image.hash()));
                lines.push(format!(
                    "{context}Reduced: {}",
                    entry.reduced_path().display()
                ));
            }
            Err(e) => lines.push(format!("{context}Error: {e}")),
        }
    }
    lines
}

// ============================================================================
// Warm
// ============================================================================

/// Format a single warm progress event as display lines.
pub fn format_warm_event(event: &WarmEvent) -> Vec<String> {
    let status = match &event.outcome {
        Ok(Origin::Stored) => "cached".to_string(),
        Ok(Origin::Built) => "built".to_string(),
        Ok(Origin::Shared) => "shared".to_string(),
        Err(e) => format!("failed ({e})"),
    };
    vec![format!(
        "{} {}: {}",
        format_index(event.position),
        event.path,
        status
    )]
}
