//! Filesystem operation service
//!
//! The execution engine applies plan operations through [`FileOperations`].
//! Each call is independently atomic from the engine's point of view and
//! either completes or fails with a message that is shown to the user as-is.

use async_trait::async_trait;
use std::fs;
use std::path::Path;

/// Filesystem primitives used by the execution engine
#[async_trait]
pub trait FileOperations: Send + Sync {
    async fn create_directory(&self, path: &str) -> Result<(), String>;
    async fn move_path(&self, source: &str, destination: &str) -> Result<(), String>;
    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), String>;
    async fn delete_to_trash(&self, path: &str) -> Result<(), String>;
    async fn copy(&self, source: &str, destination: &str) -> Result<(), String>;
}

/// Local disk implementation.
///
/// Blocking std::fs calls run on the blocking pool.
#[derive(Debug, Default, Clone)]
pub struct LocalFileOperations;

impl LocalFileOperations {
    pub fn new() -> Self {
        Self
    }
}

async fn run_blocking<F>(f: F) -> Result<(), String>
where
    F: FnOnce() -> Result<(), String> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| format!("Task failed: {}", e))?
}

#[async_trait]
impl FileOperations for LocalFileOperations {
    async fn create_directory(&self, path: &str) -> Result<(), String> {
        let path = path.to_string();
        run_blocking(move || {
            let path = Path::new(&path);
            if path.is_dir() {
                return Ok(());
            }
            fs::create_dir_all(path)
                .map_err(|e| format!("Failed to create folder {}: {}", path.display(), e))
        })
        .await
    }

    async fn move_path(&self, source: &str, destination: &str) -> Result<(), String> {
        let (source, destination) = (source.to_string(), destination.to_string());
        run_blocking(move || {
            let (source, destination) = (Path::new(&source), Path::new(&destination));
            if !source.exists() {
                return Err(format!("Source not found: {}", source.display()));
            }
            if destination.exists() {
                return Err(format!("Destination already exists: {}", destination.display()));
            }
            perform_move(source, destination)
        })
        .await
    }

    async fn rename(&self, old_path: &str, new_path: &str) -> Result<(), String> {
        let (old_path, new_path) = (old_path.to_string(), new_path.to_string());
        run_blocking(move || {
            let (old_path, new_path) = (Path::new(&old_path), Path::new(&new_path));
            if !old_path.exists() {
                return Err(format!("Path not found: {}", old_path.display()));
            }
            if new_path.exists() {
                return Err(format!("Target already exists: {}", new_path.display()));
            }
            fs::rename(old_path, new_path).map_err(|e| {
                format!(
                    "Failed to rename {} to {}: {}",
                    old_path.display(),
                    new_path.display(),
                    e
                )
            })
        })
        .await
    }

    async fn delete_to_trash(&self, path: &str) -> Result<(), String> {
        let path = path.to_string();
        run_blocking(move || {
            let path = Path::new(&path);
            if !path.exists() {
                return Err(format!("Path not found: {}", path.display()));
            }
            trash::delete(path)
                .map_err(|e| format!("Failed to move {} to trash: {}", path.display(), e))
        })
        .await
    }

    async fn copy(&self, source: &str, destination: &str) -> Result<(), String> {
        let (source, destination) = (source.to_string(), destination.to_string());
        run_blocking(move || {
            let (source, destination) = (Path::new(&source), Path::new(&destination));
            if !source.exists() {
                return Err(format!("Source not found: {}", source.display()));
            }
            if destination.exists() {
                return Err(format!("Destination already exists: {}", destination.display()));
            }
            perform_copy(source, destination)
        })
        .await
    }
}

fn ensure_parent(destination: &Path) -> Result<(), String> {
    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create destination directory: {}", e))?;
        }
    }
    Ok(())
}

fn perform_move(source: &Path, destination: &Path) -> Result<(), String> {
    ensure_parent(destination)?;

    // Try rename first (same filesystem), fall back to copy+delete
    if fs::rename(source, destination).is_err() {
        if source.is_dir() {
            copy_dir_all(source, destination)?;
            fs::remove_dir_all(source).map_err(|e| format!("Failed to remove source: {}", e))?;
        } else {
            fs::copy(source, destination).map_err(|e| format!("Failed to copy: {}", e))?;
            fs::remove_file(source).map_err(|e| format!("Failed to remove source: {}", e))?;
        }
    }
    Ok(())
}

fn perform_copy(source: &Path, destination: &Path) -> Result<(), String> {
    ensure_parent(destination)?;

    if source.is_dir() {
        copy_dir_all(source, destination)
    } else {
        fs::copy(source, destination)
            .map_err(|e| format!("Failed to copy: {}", e))
            .map(|_| ())
    }
}

fn copy_dir_all(src: &Path, dst: &Path) -> Result<(), String> {
    fs::create_dir_all(dst).map_err(|e| format!("Failed to create directory: {}", e))?;

    for entry in fs::read_dir(src).map_err(|e| format!("Failed to read directory: {}", e))? {
        let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
        let ty = entry
            .file_type()
            .map_err(|e| format!("Failed to get file type: {}", e))?;

        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path).map_err(|e| format!("Failed to copy file: {}", e))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn p(path: &Path) -> String {
        path.to_string_lossy().to_string()
    }

    #[tokio::test]
    async fn test_create_directory_is_idempotent() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("Docs");
        let ops = LocalFileOperations::new();

        ops.create_directory(&p(&folder)).await.unwrap();
        ops.create_directory(&p(&folder)).await.unwrap();
        assert!(folder.is_dir());
    }

    #[tokio::test]
    async fn test_move_creates_missing_parent() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.pdf");
        let dest = dir.path().join("Docs").join("a.pdf");
        fs::write(&source, "pdf").unwrap();

        LocalFileOperations::new()
            .move_path(&p(&source), &p(&dest))
            .await
            .unwrap();
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "pdf");
    }

    #[tokio::test]
    async fn test_move_refuses_existing_destination() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.txt");
        let dest = dir.path().join("b.txt");
        fs::write(&source, "a").unwrap();
        fs::write(&dest, "b").unwrap();

        let err = LocalFileOperations::new()
            .move_path(&p(&source), &p(&dest))
            .await
            .unwrap_err();
        assert!(err.contains("already exists"));
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_rename_and_missing_source() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("IMG_1.jpg");
        let new = dir.path().join("beach.jpg");
        fs::write(&old, "jpg").unwrap();

        let ops = LocalFileOperations::new();
        ops.rename(&p(&old), &p(&new)).await.unwrap();
        assert!(new.exists());

        let err = ops.rename(&p(&old), &p(&new)).await.unwrap_err();
        assert!(err.starts_with("Path not found"));
    }

    #[tokio::test]
    async fn test_copy_directory_recursively() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        fs::create_dir_all(source.join("nested")).unwrap();
        fs::write(source.join("nested").join("f.txt"), "x").unwrap();
        let dest = dir.path().join("Backup").join("src");

        LocalFileOperations::new()
            .copy(&p(&source), &p(&dest))
            .await
            .unwrap();
        assert!(source.join("nested").join("f.txt").exists());
        assert!(dest.join("nested").join("f.txt").exists());
    }

    #[tokio::test]
    async fn test_trash_missing_path_fails() {
        let dir = tempdir().unwrap();
        let err = LocalFileOperations::new()
            .delete_to_trash(&p(&dir.path().join("ghost.txt")))
            .await
            .unwrap_err();
        assert!(err.starts_with("Path not found"));
    }
}
