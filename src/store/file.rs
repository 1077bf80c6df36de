//! File-based asset store
//!
//! Stores assets as flat files named by content digest.

use super::{validate_extension, AssetStore, StoreError, StoreResult, StoredAsset};
use crate::digest::{Digest, DigestAlgorithm};
use rand::Rng;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File-based asset store
///
/// Directory structure:
/// ```text
/// web_root/
///   media/
///     5289df737df57326fcdd22597afb1fac.png
///     5eb63bbbe01eeed093cb22bb8f5acdc3.jpg
/// ```
///
/// The media directory is created on the first write, not on construction.
#[derive(Debug, Clone)]
pub struct FileAssetStore {
    /// Directory holding the assets
    dir: PathBuf,
    /// URL segment the directory is served under
    media_subdir: String,
    /// Public path of the default asset
    default_path: String,
    algorithm: DigestAlgorithm,
}

impl FileAssetStore {
    /// Create a store for `{web_root}/{media_subdir}`
    pub fn new<P: AsRef<Path>>(
        web_root: P,
        media_subdir: &str,
        default_asset: &str,
        algorithm: DigestAlgorithm,
    ) -> Self {
        Self {
            dir: web_root.as_ref().join(media_subdir),
            media_subdir: media_subdir.to_string(),
            default_path: format!("/{}/{}", media_subdir, default_asset),
            algorithm,
        }
    }

    /// Directory holding the assets
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the file path for a canonical file name
    fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Write data to a temp file, then rename into place.
    ///
    /// Temp names start with a dot and carry a random suffix, so concurrent
    /// writers of the same digest never share one and the sweep never sees them.
    fn write_atomic(&self, path: &Path, digest: &Digest, data: &[u8]) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let nonce: u64 = rand::thread_rng().gen();
        let tmp_path = self.dir.join(format!(".{}.{:016x}.tmp", digest, nonce));

        let result = write_then_rename(&tmp_path, path, data);
        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        result
    }

    /// Delete every file for `digest` except `keep`.
    ///
    /// Matches the full digest followed by nothing or by `.ext`, never a loose
    /// prefix. Failures are logged and do not affect the caller.
    /// Two concurrent puts of the same content with different extensions may
    /// each delete the other's file; the last sweep decides which one remains.
    fn remove_duplicates(&self, digest: &Digest, keep: &str) -> usize {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Cannot scan {} for duplicates: {}", self.dir.display(), e);
                return 0;
            }
        };

        let hex = digest.to_hex();
        let mut removed = 0;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Error listing {}: {}", self.dir.display(), e);
                    continue;
                }
            };
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name == keep || !is_same_digest(name, &hex) {
                continue;
            }

            let path = entry.path();
            match fs::remove_file(&path) {
                Ok(()) => {
                    log::info!("Duplicate file deleted: {}", path.display());
                    removed += 1;
                }
                // Another request got there first
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log::debug!("Duplicate already gone: {}", path.display());
                }
                Err(e) => {
                    log::warn!("Failed to delete duplicate {}: {}", path.display(), e);
                }
            }
        }
        removed
    }
}

fn write_then_rename(tmp_path: &Path, path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(tmp_path, path)
}

/// Whether `name` is `hex` alone or `hex` followed by an extension
fn is_same_digest(name: &str, hex: &str) -> bool {
    match name.strip_prefix(hex) {
        Some("") => true,
        Some(rest) => rest.starts_with('.'),
        None => false,
    }
}

impl AssetStore for FileAssetStore {
    fn store(&self, content: &[u8], extension: &str) -> StoreResult<StoredAsset> {
        if content.is_empty() {
            return Err(StoreError::Empty);
        }
        validate_extension(extension)?;

        let digest = Digest::compute(self.algorithm, content);
        let file_name = format!("{}{}", digest, extension);
        let path = self.path_for(&file_name);

        // Skip if already exists (deduplication)
        let written = if path.is_file() {
            log::debug!("Asset already stored: {}", path.display());
            false
        } else {
            self.write_atomic(&path, &digest, content)?;
            log::info!("Avatar uploaded and saved at: {}", path.display());
            true
        };

        self.remove_duplicates(&digest, &file_name);

        Ok(StoredAsset {
            public_path: format!("/{}/{}", self.media_subdir, file_name),
            digest,
            file_name,
            written,
        })
    }

    fn default_path(&self) -> &str {
        &self.default_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AssetPath;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn new_store(temp: &TempDir) -> FileAssetStore {
        FileAssetStore::new(
            temp.path(),
            "media",
            "default_avatar.png",
            DigestAlgorithm::Md5,
        )
    }

    fn media_files(store: &FileAssetStore) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(store.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_put_scenario() {
        let temp = TempDir::new().unwrap();
        let store = new_store(&temp);

        let path = store.put(&[0x01, 0x02, 0x03], ".png");
        assert_eq!(path.as_str(), "/media/5289df737df57326fcdd22597afb1fac.png");

        let on_disk = temp.path().join("media/5289df737df57326fcdd22597afb1fac.png");
        assert_eq!(fs::read(on_disk).unwrap(), vec![0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_put_deterministic() {
        let temp = TempDir::new().unwrap();
        let store = new_store(&temp);

        let first = store.put(b"same picture", ".jpg");
        let second = store.put(b"same picture", ".jpg");
        assert_eq!(first.as_str(), second.as_str());
    }

    #[test]
    fn test_dedup_second_put_does_not_write() {
        let temp = TempDir::new().unwrap();
        let store = new_store(&temp);

        let first = store.store(b"avatar", ".png").unwrap();
        let second = store.store(b"avatar", ".png").unwrap();
        assert!(first.written);
        assert!(!second.written);
        assert_eq!(media_files(&store), vec![first.file_name]);
    }

    #[test]
    fn test_duplicate_cleanup_keeps_canonical() {
        let temp = TempDir::new().unwrap();
        let store = new_store(&temp);
        let content = b"photo bytes";
        let hex = Digest::compute(DigestAlgorithm::Md5, content).to_hex();

        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.dir().join(format!("{hex}.png")), content).unwrap();
        fs::write(store.dir().join(format!("{hex}.jpg")), content).unwrap();
        fs::write(store.dir().join(&hex), content).unwrap();

        let path = store.put(content, ".jpg");
        assert_eq!(path.as_str(), format!("/media/{hex}.jpg"));
        assert_eq!(media_files(&store), vec![format!("{hex}.jpg")]);
    }

    #[test]
    fn test_cleanup_ignores_loose_prefix_and_other_digests() {
        let temp = TempDir::new().unwrap();
        let store = new_store(&temp);
        let content = b"photo bytes";
        let hex = Digest::compute(DigestAlgorithm::Md5, content).to_hex();

        fs::create_dir_all(store.dir()).unwrap();
        let unrelated = [
            format!("{hex}extra.png"),
            "default_avatar.png".to_string(),
            format!("{}.png", &hex[..8]),
        ];
        for name in &unrelated {
            fs::write(store.dir().join(name), b"other").unwrap();
        }

        store.put(content, ".png");

        let mut expected: Vec<String> = unrelated.to_vec();
        expected.push(format!("{hex}.png"));
        expected.sort();
        assert_eq!(media_files(&store), expected);
    }

    #[test]
    fn test_put_empty_is_noop() {
        let temp = TempDir::new().unwrap();
        let store = new_store(&temp);

        let path = store.put(&[], ".png");
        assert_eq!(path, AssetPath::Default("/media/default_avatar.png".to_string()));
        assert!(!store.dir().exists());
        assert!(matches!(store.store(&[], ".png"), Err(StoreError::Empty)));
    }

    #[test]
    fn test_undeletable_duplicate_is_not_fatal() {
        let temp = TempDir::new().unwrap();
        let store = new_store(&temp);
        let content = b"x";
        let hex = Digest::compute(DigestAlgorithm::Md5, content).to_hex();

        // remove_file cannot delete a directory
        let stray = store.dir().join(format!("{hex}.gif"));
        fs::create_dir_all(&stray).unwrap();

        let path = store.put(content, ".png");
        assert_eq!(path.as_str(), format!("/media/{hex}.png"));
        assert!(stray.is_dir());
        assert!(store.dir().join(format!("{hex}.png")).is_file());
    }

    #[test]
    fn test_put_unwritable_root_falls_back() {
        let temp = TempDir::new().unwrap();
        // A regular file where the media directory should be
        fs::write(temp.path().join("media"), b"not a directory").unwrap();
        let store = new_store(&temp);

        let path = store.put(b"avatar", ".png");
        assert!(path.is_default());
        assert_eq!(path.as_str(), "/media/default_avatar.png");
        assert!(matches!(store.store(b"avatar", ".png"), Err(StoreError::Io(_))));
    }

    #[test]
    fn test_put_invalid_extension_falls_back() {
        let temp = TempDir::new().unwrap();
        let store = new_store(&temp);

        let path = store.put(b"avatar", "./../x");
        assert!(path.is_default());
        assert!(!store.dir().exists());
    }

    #[test]
    fn test_put_without_extension() {
        let temp = TempDir::new().unwrap();
        let store = new_store(&temp);

        let asset = store.store(b"raw", "").unwrap();
        assert_eq!(asset.file_name, asset.digest.to_hex());
        assert_eq!(asset.public_path, format!("/media/{}", asset.digest));
    }

    #[test]
    fn test_clear_returns_default() {
        let temp = TempDir::new().unwrap();
        let store = new_store(&temp);

        assert_eq!(store.clear(), "/media/default_avatar.png");
        store.put(b"avatar", ".png");
        assert_eq!(store.clear(), "/media/default_avatar.png");
    }

    #[test]
    fn test_custom_media_subdir_and_algorithm() {
        let temp = TempDir::new().unwrap();
        let store =
            FileAssetStore::new(temp.path(), "avatars", "none.svg", DigestAlgorithm::Blake3);

        let asset = store.store(b"avatar", ".webp").unwrap();
        assert_eq!(asset.digest.algorithm(), DigestAlgorithm::Blake3);
        assert_eq!(
            asset.file_name.len(),
            DigestAlgorithm::Blake3.hex_len() + ".webp".len()
        );
        assert!(asset.public_path.starts_with("/avatars/"));
        assert!(temp.path().join("avatars").join(&asset.file_name).is_file());
        assert_eq!(store.clear(), "/avatars/none.svg");
    }

    #[test]
    fn test_concurrent_same_digest() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(new_store(&temp));
        let content = vec![7u8; 64 * 1024];

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let content = content.clone();
                thread::spawn(move || store.put(&content, ".png").into_string())
            })
            .collect();

        let paths: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(paths.iter().all(|p| p == &paths[0]));

        let files = media_files(&store);
        assert_eq!(files.len(), 1);
        assert_eq!(fs::read(store.dir().join(&files[0])).unwrap(), content);
    }

    #[test]
    fn test_is_same_digest() {
        assert!(is_same_digest("abc123.png", "abc123"));
        assert!(is_same_digest("abc123", "abc123"));
        assert!(is_same_digest("abc123.tar.gz", "abc123"));
        assert!(!is_same_digest("abc1234.png", "abc123"));
        assert!(!is_same_digest(".abc123.00ff.tmp", "abc123"));
        assert!(!is_same_digest("abc12.png", "abc123"));
    }
}
