//! Mutation Operations
//!
//! The write side of the store: bulk-add from raw files, bulk-add from
//! picked handles, duplicate-single-file, and clear-all. Each bulk operation
//! is a sequence of single-file transactions with 1-based, input-order
//! progress counters; cancellation is checked between transactions, never
//! mid-write of one file. Failures are converted to `*-error` events at this
//! boundary and the operation aborts cleanly.

use crate::error::StoreError;
use crate::store::{FileHandle, ImportHandle, SourceFile, StoreRoot};
use crate::worker::{CancelFlag, EventSender, WorkerEvent};
use chrono::Utc;
use tracing::{debug, info, warn};

/// Write raw files into the store.
///
/// Each entry is named `{name}_{millis}` to avoid colliding with an existing
/// entry of the same name. One progress event per file, then a payload-free
/// complete.
pub async fn add_files(
    store: &StoreRoot,
    files: Vec<SourceFile>,
    events: &EventSender,
    cancel: &CancelFlag,
) -> Result<usize, StoreError> {
    let root = store.root();
    let mut count = 0usize;

    let result: Result<(), StoreError> = async {
        for file in &files {
            if cancel.is_requested() {
                return Err(StoreError::Cancelled);
            }

            let entry_name = format!("{}_{}", file.name, Utc::now().timestamp_millis());
            let handle = root.get_or_create_file(&entry_name).await?;
            handle.write(&file.bytes).await?;

            count += 1;
            events.emit(WorkerEvent::AddFilesProgress {
                count,
                total: None,
                name: file.name.clone(),
            });
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => {
            debug!(count, "added files");
            events.emit(WorkerEvent::AddFilesComplete { total: None });
            Ok(count)
        }
        Err(StoreError::Cancelled) => {
            debug!(count, "add files aborted");
            events.emit(WorkerEvent::Aborted);
            Err(StoreError::Cancelled)
        }
        Err(e) => {
            warn!(error = %e, "failed to add files");
            events.emit(WorkerEvent::AddFilesError {
                error: e.to_string(),
            });
            Err(e)
        }
    }
}

/// Copy picked source files into the store.
///
/// Entries keep the exact source name, overwriting same-named entries.
/// Emits `start` with the total count up front, then per-file progress, then
/// `complete` with the processed count.
pub async fn add_file_handles(
    store: &StoreRoot,
    handles: Vec<ImportHandle>,
    events: &EventSender,
    cancel: &CancelFlag,
) -> Result<usize, StoreError> {
    let root = store.root();
    let total = handles.len();
    let mut count = 0usize;

    events.emit(WorkerEvent::AddFilesStart { total });

    let result: Result<(), StoreError> = async {
        for handle in &handles {
            if cancel.is_requested() {
                return Err(StoreError::Cancelled);
            }

            let bytes = handle.read().await?;
            let entry = root.get_or_create_file(handle.name()).await?;
            entry.write(&bytes).await?;

            count += 1;
            events.emit(WorkerEvent::AddFilesProgress {
                count,
                total: Some(total),
                name: handle.name().to_string(),
            });
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => {
            debug!(count, "imported file handles");
            events.emit(WorkerEvent::AddFilesComplete { total: Some(count) });
            Ok(count)
        }
        Err(StoreError::Cancelled) => {
            debug!(count, "import aborted; completed files stand");
            events.emit(WorkerEvent::Aborted);
            Err(StoreError::Cancelled)
        }
        Err(e) => {
            warn!(error = %e, "failed to import file handles");
            events.emit(WorkerEvent::AddFilesError {
                error: e.to_string(),
            });
            Err(e)
        }
    }
}

/// Duplicate one store entry under a fresh, non-colliding name.
///
/// A single-file transaction; there is no cancellation point inside it.
pub async fn duplicate_file(
    store: &StoreRoot,
    handle: &FileHandle,
    events: &EventSender,
) -> Result<FileHandle, StoreError> {
    events.emit(WorkerEvent::DuplicateFileStarted);

    match duplicate(store, handle).await {
        Ok(new_handle) => {
            debug!(name = new_handle.name(), "duplicated file");
            events.emit(WorkerEvent::DuplicateFileComplete {
                file_handle: new_handle.clone(),
            });
            Ok(new_handle)
        }
        Err(e) => {
            warn!(error = %e, "failed to duplicate file");
            events.emit(WorkerEvent::DuplicateFileError {
                error: e.to_string(),
            });
            Err(e)
        }
    }
}

async fn duplicate(store: &StoreRoot, handle: &FileHandle) -> Result<FileHandle, StoreError> {
    let bytes = handle.read().await?;
    let root = store.root();

    let base = copy_name(handle.name(), Utc::now().timestamp_millis());
    let mut candidate = base.clone();
    let mut attempt = 1u32;
    while root.file(&candidate).await.is_ok() {
        attempt += 1;
        candidate = copy_name(&base, i64::from(attempt));
    }

    let new_handle = root.get_or_create_file(&candidate).await?;
    new_handle.write(&bytes).await?;
    Ok(new_handle)
}

/// `a.jpg` -> `a_{suffix}.jpg`, keeping the extension viewable.
fn copy_name(name: &str, suffix: i64) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{suffix}.{ext}"),
        _ => format!("{name}_{suffix}"),
    }
}

/// Recursively remove every entry under the storage root.
///
/// Invoked directly from the calling context; not routed through the worker
/// message protocol. Callers must unset any current selection and trigger a
/// full resync afterward.
pub async fn clear_directory(store: &StoreRoot) -> Result<(), StoreError> {
    store.root().remove_entries().await?;
    info!("cleared storage root");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::event_channel;
    use tempfile::TempDir;

    async fn open_store(temp: &TempDir) -> StoreRoot {
        StoreRoot::open(temp.path().join("store")).await.unwrap()
    }

    #[tokio::test]
    async fn add_files_suffixes_names_with_a_timestamp() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp).await;
        let (events, mut rx) = event_channel();

        let count = add_files(
            &store,
            vec![SourceFile::new("a.jpg", b"aaa".to_vec())],
            &events,
            &CancelFlag::new(),
        )
        .await
        .unwrap();
        assert_eq!(count, 1);

        let entries: Vec<String> = std::fs::read_dir(temp.path().join("store"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].starts_with("a.jpg_"), "got {entries:?}");

        // progress carries the original name, not the suffixed entry name
        match rx.try_recv().unwrap() {
            WorkerEvent::AddFilesProgress { count, total, name } => {
                assert_eq!(count, 1);
                assert_eq!(total, None);
                assert_eq!(name, "a.jpg");
            }
            other => panic!("unexpected event {}", other.kind()),
        }
        assert_eq!(rx.try_recv().unwrap().kind(), "add-files-complete");
    }

    #[tokio::test]
    async fn add_file_handles_keeps_names_and_overwrites() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp).await;
        let (events, _rx) = event_channel();

        let source = temp.path().join("photo.png");
        std::fs::write(&source, b"v1").unwrap();
        add_file_handles(
            &store,
            vec![ImportHandle::new(&source)],
            &events,
            &CancelFlag::new(),
        )
        .await
        .unwrap();

        std::fs::write(&source, b"v2-longer").unwrap();
        add_file_handles(
            &store,
            vec![ImportHandle::new(&source)],
            &events,
            &CancelFlag::new(),
        )
        .await
        .unwrap();

        let entry = store.root().file("photo.png").await.unwrap();
        assert_eq!(entry.read().await.unwrap(), b"v2-longer");
        assert_eq!(std::fs::read_dir(temp.path().join("store")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn add_file_handles_failure_keeps_prior_progress() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp).await;
        let (events, mut rx) = event_channel();

        let good = temp.path().join("good.jpg");
        std::fs::write(&good, b"ok").unwrap();
        let missing = temp.path().join("missing.jpg");

        let err = add_file_handles(
            &store,
            vec![ImportHandle::new(&good), ImportHandle::new(&missing)],
            &events,
            &CancelFlag::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::EntryNotFound(_)));

        // start, one progress for the good file, then the error; no complete
        assert_eq!(rx.try_recv().unwrap().kind(), "add-files-start");
        assert_eq!(rx.try_recv().unwrap().kind(), "add-files-progress");
        assert_eq!(rx.try_recv().unwrap().kind(), "add-files-error");
        assert!(rx.try_recv().is_err());

        // the first write stands
        assert!(store.root().file("good.jpg").await.is_ok());
    }

    #[tokio::test]
    async fn cancel_between_file_transactions_aborts_cleanly() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp).await;
        let (events, mut rx) = event_channel();
        let cancel = CancelFlag::new();
        cancel.request();

        let err = add_files(
            &store,
            vec![SourceFile::new("a.jpg", b"a".to_vec())],
            &events,
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(err.is_cancellation());

        // no writes happened and no progress was emitted
        assert_eq!(std::fs::read_dir(temp.path().join("store")).unwrap().count(), 0);
        assert_eq!(rx.try_recv().unwrap().kind(), "aborted");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn duplicate_creates_a_distinct_entry_with_equal_contents() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp).await;
        let (events, mut rx) = event_channel();

        let original = store.root().get_or_create_file("a.jpg").await.unwrap();
        original.write(b"pixels").await.unwrap();

        let copy = duplicate_file(&store, &original, &events).await.unwrap();
        assert_ne!(copy.name(), "a.jpg");
        assert!(copy.name().ends_with(".jpg"));
        assert_eq!(copy.read().await.unwrap(), b"pixels");
        assert_eq!(std::fs::read_dir(temp.path().join("store")).unwrap().count(), 2);

        assert_eq!(rx.try_recv().unwrap().kind(), "duplicate-file-started");
        assert_eq!(rx.try_recv().unwrap().kind(), "duplicate-file-complete");
    }

    #[tokio::test]
    async fn duplicate_of_missing_entry_errors() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp).await;
        let (events, mut rx) = event_channel();

        let ghost = store.root().get_or_create_file("ghost.png").await.unwrap();
        std::fs::remove_file(temp.path().join("store").join("ghost.png")).unwrap();

        let err = duplicate_file(&store, &ghost, &events).await.unwrap_err();
        assert!(matches!(err, StoreError::EntryNotFound(_)));
        assert_eq!(rx.try_recv().unwrap().kind(), "duplicate-file-started");
        assert_eq!(rx.try_recv().unwrap().kind(), "duplicate-file-error");
    }

    #[tokio::test]
    async fn clear_directory_empties_the_root() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp).await;
        store.root().get_or_create_file("a.txt").await.unwrap();
        store.root().get_or_create_file("b.txt").await.unwrap();

        clear_directory(&store).await.unwrap();
        assert_eq!(std::fs::read_dir(temp.path().join("store")).unwrap().count(), 0);
    }

    #[test]
    fn copy_names_keep_the_extension() {
        assert_eq!(copy_name("a.jpg", 17), "a_17.jpg");
        assert_eq!(copy_name("noext", 17), "noext_17");
        assert_eq!(copy_name(".hidden", 17), ".hidden_17");
    }
}
