//! Worker message protocol.
//!
//! A closed set of message variants dispatched by a `type` discriminant.
//! Events are the fire-and-forget stream the worker pushes to its consumer;
//! commands are the call channel, each carrying a oneshot reply slot. The
//! two channels share one worker and are correlated only by the caller-side
//! one-call-in-flight convention, not by request ids.

pub mod transport;

pub use transport::{spawn, WorkerHandle};

use crate::error::StoreError;
use crate::store::{FileHandle, ImportHandle, SourceFile};
use crate::tree::{TreeNode, TreeNodeData};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Events emitted by worker operations, in emission order.
///
/// The serialized form is the wire protocol:
/// `{ "type": "<kebab-case>", "payload": { ... } }`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum WorkerEvent {
    GetDirectoryTreeStarted,
    GetDirectoryTreeProgress {
        file: TreeNode<TreeNodeData>,
    },
    GetDirectoryTreeComplete {
        tree: Vec<TreeNode<TreeNodeData>>,
    },
    GetDirectoryTreeError {
        error: String,
    },
    /// Emitted by the handle-import operation only; the raw-file operation
    /// starts straight into progress.
    AddFilesStart {
        total: usize,
    },
    AddFilesProgress {
        count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        total: Option<usize>,
        name: String,
    },
    AddFilesComplete {
        #[serde(skip_serializing_if = "Option::is_none")]
        total: Option<usize>,
    },
    AddFilesError {
        error: String,
    },
    DuplicateFileStarted,
    DuplicateFileComplete {
        #[serde(rename = "fileHandle")]
        file_handle: FileHandle,
    },
    DuplicateFileError {
        error: String,
    },
    /// Cooperative cancellation was observed. Not an error.
    Aborted,
}

impl WorkerEvent {
    /// Wire name of the discriminant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerEvent::GetDirectoryTreeStarted => "get-directory-tree-started",
            WorkerEvent::GetDirectoryTreeProgress { .. } => "get-directory-tree-progress",
            WorkerEvent::GetDirectoryTreeComplete { .. } => "get-directory-tree-complete",
            WorkerEvent::GetDirectoryTreeError { .. } => "get-directory-tree-error",
            WorkerEvent::AddFilesStart { .. } => "add-files-start",
            WorkerEvent::AddFilesProgress { .. } => "add-files-progress",
            WorkerEvent::AddFilesComplete { .. } => "add-files-complete",
            WorkerEvent::AddFilesError { .. } => "add-files-error",
            WorkerEvent::DuplicateFileStarted => "duplicate-file-started",
            WorkerEvent::DuplicateFileComplete { .. } => "duplicate-file-complete",
            WorkerEvent::DuplicateFileError { .. } => "duplicate-file-error",
            WorkerEvent::Aborted => "aborted",
        }
    }
}

/// Calls the consumer can dispatch into the worker.
pub(crate) enum Command {
    GetDirectoryTree {
        starting_directory: Option<String>,
        reply: oneshot::Sender<Result<Vec<TreeNode<TreeNodeData>>, StoreError>>,
    },
    AddFiles {
        files: Vec<SourceFile>,
        reply: oneshot::Sender<Result<usize, StoreError>>,
    },
    AddFileHandles {
        handles: Vec<ImportHandle>,
        reply: oneshot::Sender<Result<usize, StoreError>>,
    },
    DuplicateFile {
        handle: FileHandle,
        reply: oneshot::Sender<Result<FileHandle, StoreError>>,
    },
}

/// Sending half of the event channel. Sends never block and never fail
/// visibly; a departed consumer simply stops listening.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<WorkerEvent>,
}

impl EventSender {
    pub fn emit(&self, event: WorkerEvent) {
        tracing::trace!(event = event.kind(), "worker event");
        let _ = self.tx.send(event);
    }
}

/// Receiving half of the event channel. Ordered, at-least-once.
pub type EventReceiver = mpsc::UnboundedReceiver<WorkerEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, rx)
}

/// Advisory cancellation signal, shared between the consumer and a running
/// operation. Checked cooperatively between enumeration steps and between
/// single-file write transactions, never mid-write; cleared by the worker
/// when a new operation starts.
#[derive(Clone, Default)]
pub struct CancelFlag {
    requested: Arc<RwLock<bool>>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        *self.requested.write() = true;
    }

    pub fn clear(&self) {
        *self.requested.write() = false;
    }

    pub fn is_requested(&self) -> bool {
        *self.requested.read()
    }
}
