//! Tree Enumerator
//!
//! Recursive depth-first walk over the storage hierarchy, producing a flat
//! list of node descriptors. Emits `started` before any I/O, one `progress`
//! event per discovered file, and one `complete` event with the accumulated
//! sequence. Any I/O failure aborts the walk with a single `error` event and
//! no `complete`; progress already emitted stands.

use crate::error::StoreError;
use crate::store::{DirHandle, FileHandle, StoreRoot};
use crate::tree::{content_type_for, TreeNode, TreeNodeData};
use crate::worker::{CancelFlag, EventSender, WorkerEvent};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Enumerate the store (or one of its subdirectories) into a flat tree.
///
/// Cancellation is cooperative: the flag is checked between enumeration
/// steps, and an observed request surfaces as an `aborted` event rather than
/// an error.
pub async fn get_directory_tree(
    store: &StoreRoot,
    starting_directory: Option<&str>,
    events: &EventSender,
    cancel: &CancelFlag,
) -> Result<Vec<TreeNode<TreeNodeData>>, StoreError> {
    events.emit(WorkerEvent::GetDirectoryTreeStarted);

    match enumerate(store, starting_directory, events, cancel).await {
        Ok(tree) => {
            debug!(file_count = tree.len(), "directory tree enumerated");
            events.emit(WorkerEvent::GetDirectoryTreeComplete { tree: tree.clone() });
            Ok(tree)
        }
        Err(StoreError::Cancelled) => {
            debug!("enumeration aborted");
            events.emit(WorkerEvent::Aborted);
            Err(StoreError::Cancelled)
        }
        Err(e) => {
            warn!(error = %e, "failed to get directory tree");
            events.emit(WorkerEvent::GetDirectoryTreeError {
                error: e.to_string(),
            });
            Err(e)
        }
    }
}

async fn enumerate(
    store: &StoreRoot,
    starting_directory: Option<&str>,
    events: &EventSender,
    cancel: &CancelFlag,
) -> Result<Vec<TreeNode<TreeNodeData>>, StoreError> {
    let start = match starting_directory {
        Some(name) => store.root().subdirectory(name).await?,
        None => store.root(),
    };

    let events = events.clone();
    let cancel = cancel.clone();
    tokio::task::spawn_blocking(move || walk(&start, &events, &cancel))
        .await
        .map_err(|e| {
            StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
        })?
}

/// Depth-first descent. One node and one progress event per leaf file, in
/// walk order.
fn walk(
    start: &DirHandle,
    events: &EventSender,
    cancel: &CancelFlag,
) -> Result<Vec<TreeNode<TreeNodeData>>, StoreError> {
    let mut tree = Vec::new();

    for entry in WalkDir::new(start.path()).min_depth(1).follow_links(false) {
        if cancel.is_requested() {
            return Err(StoreError::Cancelled);
        }

        let entry = entry.map_err(walk_error)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let metadata = entry.metadata().map_err(walk_error)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let node = TreeNode {
            id: name.clone(),
            name: name.clone(),
            data: TreeNodeData {
                file_size: metadata.len(),
                file_type: content_type_for(&name).to_string(),
                handle: FileHandle::from_path(entry.path().to_path_buf()),
                last_modified: modified_millis(&metadata),
            },
            children: None,
        };

        events.emit(WorkerEvent::GetDirectoryTreeProgress { file: node.clone() });
        tree.push(node);
    }

    Ok(tree)
}

fn walk_error(e: walkdir::Error) -> StoreError {
    StoreError::Io(
        e.into_io_error()
            .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk failed")),
    )
}

fn modified_millis(metadata: &std::fs::Metadata) -> i64 {
    metadata
        .modified()
        .map(|t| DateTime::<Utc>::from(t).timestamp_millis())
        .unwrap_or_default()
}
