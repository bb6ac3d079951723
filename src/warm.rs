//! Cache warming.
//!
//! Builds the derivative cache entries for every image below a tree node
//! ahead of the first request. Images are resolved in parallel on the
//! current [rayon](https://docs.rs/rayon) pool; the caller sizes the pool.
//!
//! Progress is reported per image through an optional channel so the CLI can
//! print while work continues:
//!
//! ```text
//! 001 /photos/2019/harbour.jpg: built
//! 002 /photos/2019/beach.jpg: cached
//! 003 /photos/2020/broken.jpg: failed (cannot decode ...)
//! ```

use crate::cache::{Cache, CacheError, CacheStats, Origin};
use crate::element::{ElementRef, TreeError, walk_unique};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::mpsc::Sender;
use tracing::{info, warn};

/// Outcome of warming one image.
#[derive(Debug)]
pub struct WarmEvent {
    /// 1-based position in the warm order.
    pub position: usize,
    pub path: String,
    pub outcome: Result<Origin, CacheError>,
}

/// Every distinct non-hidden image below `origin`, or `origin` itself when
/// it is an image.
pub fn collect_images(origin: &ElementRef) -> Result<Vec<ElementRef>, TreeError> {
    if origin.image().is_some() {
        return Ok(vec![origin.clone()]);
    }
    let mut visited = HashSet::from([origin.identity()]);
    let mut images = Vec::new();
    walk_unique(origin, &mut visited, &mut |element| {
        if element.image().is_some() {
            images.push(element.clone());
        }
        Ok(())
    })?;
    Ok(images)
}

/// Resolve the cache entry of each image, building missing ones.
///
/// Failures are counted and reported, never fatal.
pub fn warm(
    cache: &Cache,
    images: &[ElementRef],
    progress: Option<Sender<WarmEvent>>,
) -> CacheStats {
    info!(images = images.len(), "warming cache");
    let outcomes: Vec<Option<Origin>> = images
        .par_iter()
        .enumerate()
        .filter_map(|(i, element)| {
            let image = element.image()?;
            let outcome = cache.resolve(image).map(|(_, origin)| origin);
            if let Err(e) = &outcome {
                warn!(path = %element.path(), error = %e, "cannot build cache entry");
            }
            let origin = outcome.as_ref().ok().copied();
            if let Some(tx) = &progress {
                // A closed channel only means nobody is listening
                let _ = tx.send(WarmEvent {
                    position: i + 1,
                    path: element.path(),
                    outcome,
                });
            }
            Some(origin)
        })
        .collect();

    let mut stats = CacheStats::default();
    for outcome in outcomes {
        match outcome {
            Some(Origin::Stored) => stats.stored += 1,
            Some(Origin::Built) => stats.built += 1,
            Some(Origin::Shared) => stats.shared += 1,
            None => stats.failed += 1,
        }
    }
    stats
}
