//! # Vitrine
//!
//! The core of a self-hosted photo gallery: a virtual element tree assembled
//! from configured sources, and a persistent cache of the derivatives a web
//! front end needs to show each photo quickly.
//!
//! # Architecture
//!
//! ```text
//! config.toml ──► SourceRegistry ──► root Album ──► Tree (swappable)
//!                                        │
//!                     folder / combine / tags / album elements
//!                                        │
//!                                  image leaves ──► Cache ──► <hash>.json
//!                                                         └─► <hash>.jpg
//! ```
//!
//! Elements are produced on demand. Listing a folder reads its directory;
//! listing a tag view walks the subtrees it covers and reads each photo's
//! tags through the cache. Nothing but the root handle is kept between
//! requests, so a reload simply installs a new root.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`element`] | `Element`, the `Content` trait, path resolution, sibling and preview helpers, filters |
//! | [`album`] | Plain grouping node; the root is one |
//! | [`sources`] | Folder, combine and tags sources, plus the registry that builds them from TOML |
//! | [`root`] | Root assembly and the atomically swappable `Tree` |
//! | [`media`] | The `Image` capability of displayable leaves |
//! | [`cache`] | Derivative cache: reduced JPEG, nano thumbnail, metadata; single-flight builds |
//! | [`imaging`] | Pure-Rust decode, resize and encode behind the `ImageBackend` seam; IPTC and XMP readers |
//! | [`warm`] | Parallel cache warming over a subtree |
//! | [`naming`] | Folder display names and tag slugs |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//! | [`logging`] | `tracing` subscriber setup for the binary |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Upward-Only Parent Links
//!
//! A child holds a strong reference to its parent and no element stores its
//! children. The graph is acyclic even when a combine source includes one of
//! its own ancestors, so reference counting frees an old tree once the last
//! request that captured it finishes.
//!
//! ## Identity-Based Cycle Safety
//!
//! Clones made by combine sources and tag views share their original's
//! [`element::Identity`]. Walks that must terminate (tag collection, preview
//! search, cache warming) record visited identities instead of paths.
//!
//! ## Keys From File State
//!
//! A folder image's cache key is a SHA-256 of its absolute path and
//! modification time. Editing or touching a file changes its key; no
//! invalidation pass is needed and a stale entry is never served.
//!
//! ## Image Seam
//!
//! All pixel work goes through [`imaging::ImageBackend`]. The production
//! [`imaging::RustBackend`] uses the `image` crate; tests use a recording
//! mock that counts decodes, so cache behaviour is tested without encoding
//! real images.

pub mod album;
pub mod cache;
pub mod config;
pub mod element;
pub mod imaging;
pub mod logging;
pub mod media;
pub mod naming;
pub mod output;
pub mod root;
pub mod sources;
pub mod warm;

#[cfg(test)]
pub(crate) mod test_helpers;
