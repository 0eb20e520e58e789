//! On-disk storage for generated images. The directory is write-shared by
//! concurrent attempts, so filenames carry a microsecond timestamp on top
//! of the caller's per-item prefix.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Utc;

use crate::error::EngineError;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: PathBuf) -> Result<Self, EngineError> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Re-create the output directory if it vanished since startup.
    pub fn ensure_dir(&self) -> Result<(), EngineError> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Decode raw backend bytes and persist them as a PNG. Returns the
    /// filename of the stored artifact.
    pub fn save(&self, bytes: &[u8], prefix: &str) -> Result<String, EngineError> {
        let image = image::load_from_memory(bytes)?;
        let filename = format!("{prefix}_{}.png", Utc::now().format("%Y%m%d_%H%M%S_%6f"));
        image.save(self.dir.join(&filename))?;
        Ok(filename)
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Best-effort delete of one artifact.
    pub fn delete(&self, filename: &str) {
        let _ = fs::remove_file(self.dir.join(filename));
    }

    /// Delete images whose modification time is older than `max_age`.
    /// Returns how many files were removed; per-file errors are skipped.
    pub fn remove_older_than(&self, max_age: Duration) -> usize {
        let now = SystemTime::now();
        let mut deleted = 0;

        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !has_image_extension(&path) {
                continue;
            }
            let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
                continue;
            };
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age > max_age && fs::remove_file(&path).is_ok() {
                deleted += 1;
            }
        }
        deleted
    }

    /// Total count and byte size of stored images.
    pub fn stats(&self) -> (usize, u64) {
        let mut files = 0;
        let mut bytes = 0;

        let Ok(entries) = fs::read_dir(&self.dir) else {
            return (0, 0);
        };
        for entry in entries.flatten() {
            if !has_image_extension(&entry.path()) {
                continue;
            }
            if let Ok(meta) = entry.metadata() {
                files += 1;
                bytes += meta.len();
            }
        }
        (files, bytes)
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn temp_store() -> ArtifactStore {
        let dir = std::env::temp_dir().join(format!("bb-artifact-test-{}", uuid::Uuid::new_v4()));
        ArtifactStore::new(dir).unwrap()
    }

    fn png_bytes() -> Vec<u8> {
        let image = image::DynamicImage::ImageRgba8(image::RgbaImage::new(2, 2));
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_save_produces_unique_names() {
        let store = temp_store();
        let a = store.save(&png_bytes(), "batch_1").unwrap();
        let b = store.save(&png_bytes(), "batch_1").unwrap();
        assert_ne!(a, b);
        assert!(store.path_for(&a).exists());
        assert!(store.path_for(&b).exists());
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_save_rejects_non_image_bytes() {
        let store = temp_store();
        assert!(store.save(b"not an image", "batch_1").is_err());
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_remove_older_than_sweeps_stale_files() {
        let store = temp_store();
        let name = store.save(&png_bytes(), "batch_1").unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(store.remove_older_than(Duration::from_secs(3600)), 0);
        assert_eq!(store.remove_older_than(Duration::ZERO), 1);
        assert!(!store.path_for(&name).exists());
        let _ = fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_stats_counts_images_only() {
        let store = temp_store();
        store.save(&png_bytes(), "batch_1").unwrap();
        fs::write(store.dir().join("notes.txt"), b"skip me").unwrap();

        let (files, bytes) = store.stats();
        assert_eq!(files, 1);
        assert!(bytes > 0);
        let _ = fs::remove_dir_all(store.dir());
    }
}
