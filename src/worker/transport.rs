//! Worker Transport
//!
//! Runs the enumerator and the mutation operations on a background task and
//! exposes them as call/response functions plus the fire-and-forget event
//! stream. One worker is spawned per consumer and owned as an explicit
//! resource: dropping the handle closes the command channel and the worker
//! drains and exits. Termination does not guarantee an in-flight write is
//! flushed.

use crate::error::StoreError;
use crate::ops;
use crate::store::{FileHandle, ImportHandle, SourceFile, StoreRoot};
use crate::tree::{enumerate, TreeNode, TreeNodeData};
use crate::worker::{event_channel, CancelFlag, Command, EventReceiver, EventSender};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Owning handle to one background worker.
pub struct WorkerHandle {
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancelFlag,
    task: tokio::task::JoinHandle<()>,
}

/// Spawn a worker over the given store. Returns the handle and the event
/// stream; the caller keeps both for the lifetime of the consumer.
pub fn spawn(store: StoreRoot) -> (WorkerHandle, EventReceiver) {
    let (events, event_rx) = event_channel();
    let (commands, command_rx) = mpsc::unbounded_channel();
    let cancel = CancelFlag::new();
    let task = tokio::spawn(run(store, command_rx, events, cancel.clone()));

    (
        WorkerHandle {
            commands,
            cancel,
            task,
        },
        event_rx,
    )
}

impl WorkerHandle {
    /// Enumerate the store into a flat tree.
    pub async fn get_directory_tree(
        &self,
        starting_directory: Option<String>,
    ) -> Result<Vec<TreeNode<TreeNodeData>>, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.call(
            Command::GetDirectoryTree {
                starting_directory,
                reply,
            },
            rx,
        )
        .await
    }

    /// Write raw files into the store.
    pub async fn add_files(&self, files: Vec<SourceFile>) -> Result<usize, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.call(Command::AddFiles { files, reply }, rx).await
    }

    /// Copy picked source files into the store.
    pub async fn add_file_handles(&self, handles: Vec<ImportHandle>) -> Result<usize, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.call(Command::AddFileHandles { handles, reply }, rx)
            .await
    }

    /// Duplicate one store entry.
    pub async fn duplicate_file(&self, handle: FileHandle) -> Result<FileHandle, StoreError> {
        let (reply, rx) = oneshot::channel();
        self.call(Command::DuplicateFile { handle, reply }, rx).await
    }

    /// Request cancellation of an in-flight operation. Advisory: the
    /// running operation checks between steps and replies with an `aborted`
    /// event when it observes the request.
    pub fn cancel(&self) {
        self.cancel.request();
    }

    /// Close the command channel and wait for the worker to drain and exit.
    pub async fn shutdown(self) {
        drop(self.commands);
        let _ = self.task.await;
    }

    async fn call<T>(
        &self,
        command: Command,
        rx: oneshot::Receiver<Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        self.commands
            .send(command)
            .map_err(|_| StoreError::TransportClosed)?;
        rx.await.map_err(|_| StoreError::TransportClosed)?
    }
}

/// Sequential command loop. One operation at a time; events interleave on
/// the shared stream in emission order.
async fn run(
    store: StoreRoot,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: EventSender,
    cancel: CancelFlag,
) {
    debug!("worker started");

    while let Some(command) = commands.recv().await {
        // A stale cancel request must not poison the next invocation.
        cancel.clear();

        match command {
            Command::GetDirectoryTree {
                starting_directory,
                reply,
            } => {
                let result = enumerate::get_directory_tree(
                    &store,
                    starting_directory.as_deref(),
                    &events,
                    &cancel,
                )
                .await;
                let _ = reply.send(result);
            }
            Command::AddFiles { files, reply } => {
                let _ = reply.send(ops::add_files(&store, files, &events, &cancel).await);
            }
            Command::AddFileHandles { handles, reply } => {
                let _ =
                    reply.send(ops::add_file_handles(&store, handles, &events, &cancel).await);
            }
            Command::DuplicateFile { handle, reply } => {
                let _ = reply.send(ops::duplicate_file(&store, &handle, &events).await);
            }
        }
    }

    debug!("worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn shutdown_drains_and_exits() {
        let temp = TempDir::new().unwrap();
        let store = StoreRoot::open(temp.path().join("store")).await.unwrap();
        let (worker, _events) = spawn(store);
        worker.get_directory_tree(None).await.unwrap();
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn rpc_reply_matches_the_event_stream_result() {
        let temp = TempDir::new().unwrap();
        let store = StoreRoot::open(temp.path().join("store")).await.unwrap();
        store.root().get_or_create_file("a.jpg").await.unwrap();

        let (worker, mut events) = spawn(store);
        let tree = worker.get_directory_tree(None).await.unwrap();
        assert_eq!(tree.len(), 1);

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(event.kind());
        }
        assert_eq!(
            kinds,
            vec![
                "get-directory-tree-started",
                "get-directory-tree-progress",
                "get-directory-tree-complete",
            ]
        );
        worker.shutdown().await;
    }
}
