//! Directory-backed sources.
//!
//! A folder lists one directory: sub-directories become nested folders,
//! files with a decodable image extension become [`FolderImage`] leaves.
//! Entries are sorted by file name (descending by default, so dated folder
//! names list newest first) with sub-folders ahead of images. Symlinked
//! photos are listed; symlinked directories are skipped.

use super::tags::TagsIndex;
use crate::cache::{Cache, CacheEntry, CacheError};
use crate::element::{Content, Element, ElementRef, Identity, Kind, TreeError};
use crate::imaging::supported_input_extensions;
use crate::media::{FileContent, Image, mime_for_path};
use crate::naming::display_name;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Order of folder entries by file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Content of a folder element.
#[derive(Debug)]
pub struct FolderSource {
    dir: PathBuf,
    sort: SortOrder,
    tags: Option<TagsIndex>,
    cache: Arc<Cache>,
}

impl FolderSource {
    /// `dir` should be absolute: image cache keys are derived from it.
    pub fn new(dir: PathBuf, sort: SortOrder, cache: Arc<Cache>) -> Self {
        Self {
            dir,
            sort,
            tags: None,
            cache,
        }
    }

    /// Embed a tags index over this folder as its first child.
    pub fn with_tags(mut self, tags: Option<TagsIndex>) -> Self {
        self.tags = tags;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn is_image_name(name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                supported_input_extensions()
                    .iter()
                    .any(|supported| ext.eq_ignore_ascii_case(supported))
            })
    }

    /// Build detached templates for the directory entries, sub-folders
    /// first.
    fn entry_templates(&self) -> Result<Vec<Element>, TreeError> {
        let read_dir = fs::read_dir(&self.dir).map_err(|source| TreeError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut names: Vec<String> = Vec::new();
        for entry in read_dir {
            match entry {
                Ok(entry) => match entry.file_name().into_string() {
                    Ok(name) => names.push(name),
                    Err(raw) => debug!(dir = %self.dir.display(), name = ?raw, "skipping non-UTF-8 entry"),
                },
                Err(e) => warn!(dir = %self.dir.display(), error = %e, "cannot read directory entry"),
            }
        }
        names.sort();
        if self.sort == SortOrder::Descending {
            names.reverse();
        }

        let mut folders = Vec::new();
        let mut images = Vec::new();
        for name in names {
            let path = self.dir.join(&name);
            let link = match fs::symlink_metadata(&path) {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            // Linked photos are listed; linked directories are not, since a
            // link to an ancestor would nest the folder in itself.
            let metadata = if link.file_type().is_symlink() {
                match fs::metadata(&path) {
                    Ok(m) if m.is_dir() => {
                        debug!(path = %path.display(), "skipping directory symlink");
                        continue;
                    }
                    Ok(m) => m,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping broken symlink");
                        continue;
                    }
                }
            } else {
                link
            };
            let hidden = name.starts_with('.');
            let url_name = name.to_lowercase();

            if metadata.is_dir() {
                let folder = FolderSource::new(path, self.sort, Arc::clone(&self.cache));
                folders.push(Element::new(display_name(&name), url_name, folder).with_hidden(hidden));
            } else if metadata.is_file() && Self::is_image_name(&name) {
                let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
                let image = FolderImage::new(path, modified, Arc::clone(&self.cache));
                images.push(Element::new(name, url_name, image).with_hidden(hidden));
            }
        }

        folders.append(&mut images);
        Ok(folders)
    }
}

impl Content for FolderSource {
    fn children(&self, this: &ElementRef) -> Result<Vec<ElementRef>, TreeError> {
        let mut templates = Vec::new();
        if let Some(index) = &self.tags {
            templates.push(index.template(this));
        }
        templates.extend(self.entry_templates()?);

        Ok(templates
            .iter()
            .enumerate()
            .map(|(i, template)| template.attach(this, i))
            .collect())
    }

    fn is_container(&self) -> bool {
        true
    }

    fn identity(&self) -> Identity {
        Identity::Directory(self.dir.clone())
    }

    fn kind(&self) -> Kind {
        Kind::Folder
    }
}

/// Cache key for a file at `path` last modified at `modified`.
///
/// SHA-256 over the absolute path and the modification time in nanoseconds,
/// hex encoded. Touching or replacing the file yields a new key.
pub fn hash_file_state(path: &Path, modified: SystemTime) -> String {
    let nanos = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let mut hasher = Sha256::new();
    hasher.update(b"folder-image\0");
    hasher.update(path.as_os_str().as_encoded_bytes());
    hasher.update(b"\0");
    hasher.update(nanos.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// An image file inside a folder source.
pub struct FolderImage {
    path: PathBuf,
    hash: String,
    cache: Arc<Cache>,
    entry: OnceLock<Arc<CacheEntry>>,
}

impl fmt::Debug for FolderImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FolderImage")
            .field("path", &self.path)
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

impl FolderImage {
    pub fn new(path: PathBuf, modified: SystemTime, cache: Arc<Cache>) -> Self {
        Self {
            hash: hash_file_state(&path, modified),
            path,
            cache,
            entry: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Image for FolderImage {
    fn hash(&self) -> &str {
        &self.hash
    }

    fn open(&self) -> io::Result<FileContent> {
        let file = File::open(&self.path)?;
        let size = file.metadata()?.len();
        Ok(FileContent {
            reader: Box::new(file),
            size,
            mime: mime_for_path(&self.path),
        })
    }

    fn cache_entry(&self) -> Result<Arc<CacheEntry>, CacheError> {
        if let Some(entry) = self.entry.get() {
            return Ok(Arc::clone(entry));
        }
        let entry = self.cache.query_or_build(self)?;
        Ok(Arc::clone(self.entry.get_or_init(|| entry)))
    }
}

impl Content for FolderImage {
    fn children(&self, _this: &ElementRef) -> Result<Vec<ElementRef>, TreeError> {
        Ok(Vec::new())
    }

    fn is_container(&self) -> bool {
        false
    }

    fn identity(&self) -> Identity {
        Identity::File(self.path.clone())
    }

    fn kind(&self) -> Kind {
        Kind::Image
    }

    fn image(&self) -> Option<&dyn Image> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::album::Album;
    use crate::imaging::backend::tests::MockBackend;
    use crate::sources::TagsSource;
    use crate::test_helpers::{assert_children, display_names, mock_cache, write_file};
    use std::time::Duration;
    use tempfile::TempDir;

    fn folder_root(dir: &Path, sort: SortOrder, cache: Arc<Cache>) -> ElementRef {
        let folder = Element::new("Photos", "photos", FolderSource::new(dir.to_path_buf(), sort, cache));
        Arc::new(Element::new("", "", Album::new(vec![folder])))
    }

    struct Fixture {
        content: TempDir,
        _cache_dir: TempDir,
        backend: Arc<MockBackend>,
        cache: Arc<Cache>,
    }

    fn fixture() -> Fixture {
        let content = TempDir::new().unwrap();
        let cache_dir = TempDir::new().unwrap();
        let backend = Arc::new(MockBackend::new());
        let cache = mock_cache(cache_dir.path(), &backend);
        Fixture {
            content,
            _cache_dir: cache_dir,
            backend,
            cache,
        }
    }

    // =========================================================================
    // Listing
    // =========================================================================

    #[test]
    fn lists_subfolders_first_in_descending_order() {
        let f = fixture();
        let dir = f.content.path();
        write_file(dir, "a.jpg", b"a");
        write_file(dir, "c.JPG", b"c");
        write_file(dir, "b.png", b"b");
        write_file(dir, "2018/x.jpg", b"x");
        write_file(dir, "2019/y.jpg", b"y");
        write_file(dir, "notes.txt", b"not an image");

        let root = folder_root(dir, SortOrder::Descending, f.cache.clone());
        assert_children(&root, "photos", &["2019", "2018", "c.jpg", "b.png", "a.jpg"]);
    }

    #[test]
    fn ascending_order_is_configurable() {
        let f = fixture();
        let dir = f.content.path();
        write_file(dir, "b.jpg", b"b");
        write_file(dir, "a.jpg", b"a");
        write_file(dir, "z/x.jpg", b"x");

        let root = folder_root(dir, SortOrder::Ascending, f.cache.clone());
        assert_children(&root, "photos", &["z", "a.jpg", "b.jpg"]);
        // Sub-folders inherit the order
        write_file(dir, "z/w.jpg", b"w");
        assert_children(&root, "photos/z", &["w.jpg", "x.jpg"]);
    }

    #[test]
    fn url_names_are_lowercased_and_resolvable() {
        let f = fixture();
        let dir = f.content.path();
        write_file(dir, "Summer/IMG_01.JPG", b"img");

        let root = folder_root(dir, SortOrder::Descending, f.cache.clone());
        let image = root.traverse("photos/summer/img_01.jpg").unwrap();
        assert_eq!(image.name(), "IMG_01.JPG");
        assert_eq!(image.path(), "/photos/summer/img_01.jpg");
    }

    #[test]
    fn subfolder_display_names_drop_number_prefix() {
        let f = fixture();
        let dir = f.content.path();
        write_file(dir, "020-Summer-Trip/a.jpg", b"a");
        write_file(dir, "010-Spring/b.jpg", b"b");

        let root = folder_root(dir, SortOrder::Descending, f.cache.clone());
        let children = root.traverse("photos").unwrap().children().unwrap();
        assert_eq!(display_names(&children), ["Summer Trip", "Spring"]);
    }

    #[test]
    fn dot_entries_are_hidden_but_reachable() {
        let f = fixture();
        let dir = f.content.path();
        write_file(dir, ".drafts/a.jpg", b"a");
        write_file(dir, "b.jpg", b"b");

        let root = folder_root(dir, SortOrder::Descending, f.cache.clone());
        let drafts = root.traverse("photos/.drafts").unwrap();
        assert!(drafts.is_hidden());
        assert_children(&root, "photos/.drafts", &["a.jpg"]);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let f = fixture();
        let root = folder_root(&f.content.path().join("gone"), SortOrder::Descending, f.cache.clone());

        let err = root.traverse("photos/anything").unwrap_err();
        assert!(matches!(err, TreeError::Io { .. }));
    }

    #[test]
    fn folder_identity_is_the_directory() {
        let f = fixture();
        let dir = f.content.path();
        write_file(dir, "sub/a.jpg", b"a");

        let root = folder_root(dir, SortOrder::Descending, f.cache.clone());
        let sub = root.traverse("photos/sub").unwrap();
        assert_eq!(sub.identity(), Identity::Directory(dir.join("sub")));
        assert_eq!(sub.kind(), Kind::Folder);
    }

    #[cfg(unix)]
    #[test]
    fn directory_symlinks_are_not_followed() {
        let f = fixture();
        let dir = f.content.path();
        write_file(dir, "x.jpg", b"x");
        f.backend.tag(b"x", &["sea"]);
        std::os::unix::fs::symlink(dir, dir.join("loop")).unwrap();

        let root = folder_root(dir, SortOrder::Descending, f.cache.clone());
        assert_children(&root, "photos", &["x.jpg"]);
        assert!(matches!(
            root.traverse("photos/loop").unwrap_err(),
            TreeError::NotFound { .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn tags_over_a_looping_folder_see_each_photo_once() {
        let f = fixture();
        let dir = f.content.path();
        write_file(dir, "x.jpg", b"x");
        f.backend.tag(b"x", &["sea"]);
        std::os::unix::fs::symlink(dir, dir.join("loop")).unwrap();

        let folder = FolderSource::new(dir.to_path_buf(), SortOrder::Descending, f.cache.clone());
        let root: ElementRef = Arc::new(Element::new(
            "",
            "",
            Album::new(vec![
                Element::new("Photos", "photos", folder),
                Element::new("Tags", "tags", TagsSource::new(vec!["/photos".into()])),
            ]),
        ));

        assert_children(&root, "tags", &["sea"]);
        assert_children(&root, "tags/sea", &["x.jpg"]);
        assert_eq!(f.backend.decode_count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn linked_photos_are_listed() {
        let f = fixture();
        let dir = f.content.path();
        let target = write_file(dir, "originals/a.jpg", b"a");
        write_file(dir, "album/b.jpg", b"b");
        std::os::unix::fs::symlink(&target, dir.join("album/a.jpg")).unwrap();
        std::os::unix::fs::symlink(dir.join("gone.jpg"), dir.join("album/dangling.jpg")).unwrap();

        let root = folder_root(&dir.join("album"), SortOrder::Descending, f.cache.clone());
        assert_children(&root, "photos", &["b.jpg", "a.jpg"]);
    }

    // =========================================================================
    // Images
    // =========================================================================

    #[test]
    fn image_open_streams_original() {
        let f = fixture();
        let dir = f.content.path();
        write_file(dir, "a.jpg", b"original bytes");

        let root = folder_root(dir, SortOrder::Descending, f.cache.clone());
        let element = root.traverse("photos/a.jpg").unwrap();
        let mut content = element.image().unwrap().open().unwrap();
        let mut body = Vec::new();
        io::Read::read_to_end(&mut content.reader, &mut body).unwrap();

        assert_eq!(body, b"original bytes");
        assert_eq!(content.size, 14);
        assert_eq!(content.mime, "image/jpeg");
    }

    #[test]
    fn cache_entry_is_shared_by_clones() {
        let f = fixture();
        let dir = f.content.path();
        write_file(dir, "a.jpg", b"a");

        let root = folder_root(dir, SortOrder::Descending, f.cache.clone());
        let element = root.traverse("photos/a.jpg").unwrap();
        let clone = element.clone_with(Some(root.clone()), 3);

        let first = element.image().unwrap().cache_entry().unwrap();
        let second = clone.image().unwrap().cache_entry().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(f.backend.decode_count(), 1);
        assert_eq!(clone.image().unwrap().width().unwrap(), 1600);
    }

    #[test]
    fn hash_changes_with_modification_time() {
        let path = Path::new("/photos/a.jpg");
        let t0 = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let t1 = t0 + Duration::from_nanos(1);

        assert_eq!(hash_file_state(path, t0), hash_file_state(path, t0));
        assert_ne!(hash_file_state(path, t0), hash_file_state(path, t1));
        assert_ne!(
            hash_file_state(path, t0),
            hash_file_state(Path::new("/photos/b.jpg"), t0)
        );
        assert_eq!(hash_file_state(path, t0).len(), 64);
    }

    #[test]
    fn touching_a_file_rebuilds_its_entry() {
        let f = fixture();
        let dir = f.content.path();
        let path = write_file(dir, "a.jpg", b"a");
        let root = folder_root(dir, SortOrder::Descending, f.cache.clone());

        let before = root.traverse("photos/a.jpg").unwrap();
        before.image().unwrap().cache_entry().unwrap();

        let later = SystemTime::now() + Duration::from_secs(60);
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(later)
            .unwrap();

        let after = root.traverse("photos/a.jpg").unwrap();
        assert_ne!(before.image().unwrap().hash(), after.image().unwrap().hash());
        after.image().unwrap().cache_entry().unwrap();
        assert_eq!(f.backend.decode_count(), 2);

        // Re-listing with unchanged state hits the stored entry
        let again = root.traverse("photos/a.jpg").unwrap();
        again.image().unwrap().cache_entry().unwrap();
        assert_eq!(f.backend.decode_count(), 2);
    }
}
