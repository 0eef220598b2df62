//! Storage Handle Accessor
//!
//! Thin wrapper over the application-private storage area. Exposes the root
//! directory handle, resolves child handles by name, and hands out opaque
//! file capabilities. All I/O is asynchronous and may suspend for
//! host-dependent durations; no timeout is imposed at this layer.

use crate::error::StoreError;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// The private storage root.
///
/// Availability is checked exactly once, when the root is opened. Dependents
/// treat `StorageUnavailable` as fatal to the feature, not to the process.
#[derive(Debug, Clone)]
pub struct StoreRoot {
    root: PathBuf,
}

impl StoreRoot {
    /// Open (creating if needed) the private storage area rooted at `base`.
    pub async fn open(base: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base = base.into();
        tokio::fs::create_dir_all(&base)
            .await
            .map_err(|e| StoreError::StorageUnavailable(format!("{}: {e}", base.display())))?;
        let root = dunce::canonicalize(&base)
            .map_err(|e| StoreError::StorageUnavailable(format!("{}: {e}", base.display())))?;
        let meta = tokio::fs::metadata(&root)
            .await
            .map_err(|e| StoreError::StorageUnavailable(format!("{}: {e}", root.display())))?;
        if !meta.is_dir() {
            return Err(StoreError::StorageUnavailable(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// Handle to the storage root directory.
    pub fn root(&self) -> DirHandle {
        DirHandle {
            path: self.root.clone(),
        }
    }

    /// Resolve a file handle to its path segments relative to the root.
    ///
    /// Fails with `EntryNotFound` for handles that do not point inside this
    /// store.
    pub fn resolve(&self, handle: &FileHandle) -> Result<Vec<String>, StoreError> {
        let relative = handle
            .path
            .strip_prefix(&self.root)
            .map_err(|_| StoreError::EntryNotFound(handle.name().to_string()))?;
        Ok(relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect())
    }
}

/// Opaque capability to a directory inside the store.
#[derive(Debug, Clone)]
pub struct DirHandle {
    path: PathBuf,
}

impl DirHandle {
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .map(|n| n.to_str().unwrap_or_default())
            .unwrap_or_default()
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve an existing child directory by name. Never creates.
    pub async fn subdirectory(&self, name: &str) -> Result<DirHandle, StoreError> {
        let path = self.path.join(validate_entry_name(name)?);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => Ok(DirHandle { path }),
            Ok(_) => Err(StoreError::EntryNotFound(name.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::EntryNotFound(name.to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Resolve an existing child file by name.
    pub async fn file(&self, name: &str) -> Result<FileHandle, StoreError> {
        let path = self.path.join(validate_entry_name(name)?);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(FileHandle { path }),
            Ok(_) => Err(StoreError::EntryNotFound(name.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::EntryNotFound(name.to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Get a file handle by name, creating an empty entry if absent.
    pub async fn get_or_create_file(&self, name: &str) -> Result<FileHandle, StoreError> {
        let path = self.path.join(validate_entry_name(name)?);
        if tokio::fs::metadata(&path).await.is_err() {
            tokio::fs::File::create(&path).await?;
        }
        Ok(FileHandle { path })
    }

    /// Remove every entry under this directory, recursively. The directory
    /// itself survives.
    pub async fn remove_entries(&self) -> Result<(), StoreError> {
        let mut entries = tokio::fs::read_dir(&self.path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                tokio::fs::remove_dir_all(entry.path()).await?;
            } else {
                tokio::fs::remove_file(entry.path()).await?;
            }
        }
        Ok(())
    }
}

/// Opaque capability to a file inside the store.
///
/// Held in memory for the lifetime of a session; never serialized to
/// persistent state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    path: PathBuf,
}

impl FileHandle {
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .map(|n| n.to_str().unwrap_or_default())
            .unwrap_or_default()
    }

    pub(crate) fn from_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub async fn exists(&self) -> bool {
        tokio::fs::metadata(&self.path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Read the full contents of the entry.
    pub async fn read(&self) -> Result<Vec<u8>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::EntryNotFound(self.name().to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Replace the full contents of the entry and flush to the host.
    pub async fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let mut file = tokio::fs::File::create(&self.path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        Ok(())
    }
}

/// Only the entry name crosses a serialization boundary; the capability
/// itself stays in memory.
impl serde::Serialize for FileHandle {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

/// A raw in-memory file: a name plus full byte contents. The drag-and-drop
/// input shape.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Capability to a source file outside the store, as handed out by a host
/// file picker.
#[derive(Debug, Clone)]
pub struct ImportHandle {
    path: PathBuf,
}

impl ImportHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .map(|n| n.to_str().unwrap_or_default())
            .unwrap_or_default()
    }

    pub async fn read(&self) -> Result<Vec<u8>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::EntryNotFound(self.path.display().to_string()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// Entry names are single path components.
fn validate_entry_name(name: &str) -> Result<&str, StoreError> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(name)
}
