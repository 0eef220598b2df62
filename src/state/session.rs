//! Consumer session over one worker.
//!
//! Owns the worker as an explicit scoped resource: spawned on construction,
//! shut down on teardown. Folds the worker's event stream into the tree
//! state while call-channel replies are in flight.

use crate::error::StoreError;
use crate::ops;
use crate::state::{reduce, Action, FileTreeState, Status, TreeState};
use crate::store::{FileHandle, ImportHandle, SourceFile, StoreRoot};
use crate::tree::{TreeNode, TreeNodeData};
use crate::worker::{self, EventReceiver, WorkerEvent, WorkerHandle};
use std::future::Future;
use tracing::{debug, info, warn};

pub struct Session {
    store: StoreRoot,
    worker: WorkerHandle,
    events: EventReceiver,
    state: FileTreeState,
}

impl Session {
    /// Spawn a worker over the store. The session starts `Initializing` and
    /// becomes `Idle` once the worker is up.
    pub fn new(store: StoreRoot) -> Self {
        let (worker, events) = worker::spawn(store.clone());
        let mut session = Self {
            store,
            worker,
            events,
            state: TreeState::new(),
        };
        session.dispatch(Action::SetStatus {
            status: Status::Idle,
        });
        session
    }

    pub fn state(&self) -> &FileTreeState {
        &self.state
    }

    pub fn store(&self) -> &StoreRoot {
        &self.store
    }

    /// Apply any events the worker has pushed since the last call.
    pub fn pump(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            apply_event(&mut self.state, event);
        }
    }

    /// Re-sync the tree from storage truth.
    ///
    /// If a previous enumeration is still in flight, cancellation is
    /// requested first (best effort, cooperative) before the new call
    /// starts.
    pub async fn refresh(&mut self) -> Result<Vec<TreeNode<TreeNodeData>>, StoreError> {
        self.refresh_from(None).await
    }

    /// Re-sync starting from a subdirectory of the store root.
    pub async fn refresh_from(
        &mut self,
        starting_directory: Option<String>,
    ) -> Result<Vec<TreeNode<TreeNodeData>>, StoreError> {
        if self.state.status == Status::Loading {
            self.worker.cancel();
        }

        let Self {
            worker,
            events,
            state,
            ..
        } = self;
        drive_call(worker.get_directory_tree(starting_directory), events, state).await
    }

    /// Write raw files into the store, then re-sync.
    pub async fn add_files(&mut self, files: Vec<SourceFile>) -> Result<usize, StoreError> {
        self.dispatch(Action::SetStatus {
            status: Status::Loading,
        });
        let count = {
            let Self {
                worker,
                events,
                state,
                ..
            } = self;
            drive_call(worker.add_files(files), events, state).await?
        };
        self.refresh().await?;
        Ok(count)
    }

    /// Copy picked source files into the store, then re-sync.
    pub async fn add_file_handles(
        &mut self,
        handles: Vec<ImportHandle>,
    ) -> Result<usize, StoreError> {
        self.dispatch(Action::SetStatus {
            status: Status::Loading,
        });
        let count = {
            let Self {
                worker,
                events,
                state,
                ..
            } = self;
            drive_call(worker.add_file_handles(handles), events, state).await?
        };
        self.refresh().await?;
        Ok(count)
    }

    /// Duplicate one store entry, then re-sync.
    pub async fn duplicate(&mut self, handle: FileHandle) -> Result<FileHandle, StoreError> {
        let new_handle = {
            let Self {
                worker,
                events,
                state,
                ..
            } = self;
            drive_call(worker.duplicate_file(handle), events, state).await?
        };
        self.refresh().await?;
        Ok(new_handle)
    }

    /// Remove every entry in the store.
    ///
    /// Runs directly against the storage accessor on the calling context,
    /// not through the worker protocol, then unsets the selection and
    /// triggers a full resync.
    pub async fn clear_all(&mut self) -> Result<(), StoreError> {
        self.dispatch(Action::SetStatus {
            status: Status::Loading,
        });

        match ops::clear_directory(&self.store).await {
            Ok(()) => {
                self.refresh().await?;
                self.dispatch(Action::UnsetSelected);
                self.dispatch(Action::SetStatus {
                    status: Status::Idle,
                });
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to clear store");
                self.dispatch(Action::SetStatus {
                    status: Status::Idle,
                });
                Err(e)
            }
        }
    }

    /// Select a node by id. On duplicate ids the last entry wins.
    pub fn select(&mut self, id: &str) -> bool {
        let found = self.state.tree.iter().rev().find(|n| n.id == id).cloned();
        match found {
            Some(node) => {
                self.dispatch(Action::SetSelected { selected: node });
                true
            }
            None => false,
        }
    }

    pub fn deselect(&mut self) {
        self.dispatch(Action::UnsetSelected);
    }

    pub fn set_dragging(&mut self, is_dragging: bool) {
        self.dispatch(Action::IsDragging { is_dragging });
    }

    /// Tear the worker down, draining its command channel first.
    pub async fn shutdown(self) {
        self.worker.shutdown().await;
    }

    fn dispatch(&mut self, action: Action<TreeNodeData>) {
        dispatch(&mut self.state, action);
    }
}

fn dispatch(state: &mut FileTreeState, action: Action<TreeNodeData>) {
    *state = reduce(std::mem::take(state), action);
}

/// Await a call-channel reply while folding the parallel event stream into
/// the state. The reply does not imply the stream is finished; events
/// already queued when the reply lands are applied before returning.
async fn drive_call<T>(
    call: impl Future<Output = Result<T, StoreError>>,
    events: &mut EventReceiver,
    state: &mut FileTreeState,
) -> Result<T, StoreError> {
    tokio::pin!(call);
    loop {
        tokio::select! {
            result = &mut call => {
                while let Ok(event) = events.try_recv() {
                    apply_event(state, event);
                }
                return result;
            }
            maybe = events.recv() => match maybe {
                Some(event) => apply_event(state, event),
                // Worker gone; the call itself will surface the failure.
                None => return call.await,
            },
        }
    }
}

/// The transport event handler: the one place payloads are inspected before
/// actions reach the reducer.
fn apply_event(state: &mut FileTreeState, event: WorkerEvent) {
    match event {
        WorkerEvent::GetDirectoryTreeStarted => dispatch(
            state,
            Action::SetStatus {
                status: Status::Loading,
            },
        ),
        WorkerEvent::GetDirectoryTreeProgress { file } => {
            dispatch(state, Action::MergeTreeStructure { tree: vec![file] })
        }
        WorkerEvent::GetDirectoryTreeComplete { tree } => {
            dispatch(
                state,
                Action::SetStatus {
                    status: Status::Idle,
                },
            );
            dispatch(state, Action::SetTreeStructure { tree });
        }
        WorkerEvent::GetDirectoryTreeError { error } => {
            warn!(error = %error, "directory tree sync failed");
            fail_transiently(state);
        }
        WorkerEvent::Aborted => debug!("enumeration aborted"),
        WorkerEvent::AddFilesStart { total } => {
            debug!(total, "adding files");
            dispatch(
                state,
                Action::SetStatus {
                    status: Status::Loading,
                },
            );
        }
        WorkerEvent::AddFilesProgress { count, total, name } => {
            debug!(count, total, name = %name, "file added");
        }
        WorkerEvent::AddFilesComplete { total } => {
            debug!(total, "files added");
            dispatch(
                state,
                Action::SetStatus {
                    status: Status::Idle,
                },
            );
        }
        WorkerEvent::AddFilesError { error } => {
            warn!(error = %error, "add files failed");
            fail_transiently(state);
        }
        WorkerEvent::DuplicateFileStarted => dispatch(
            state,
            Action::SetStatus {
                status: Status::Loading,
            },
        ),
        WorkerEvent::DuplicateFileComplete { file_handle } => {
            info!(name = file_handle.name(), "duplicate created");
            dispatch(
                state,
                Action::SetStatus {
                    status: Status::Idle,
                },
            );
        }
        WorkerEvent::DuplicateFileError { error } => {
            warn!(error = %error, "duplicate failed");
            fail_transiently(state);
        }
    }
}

/// Errors pass through `Error` only transiently; the store never leaves a
/// consumer stuck there.
fn fail_transiently(state: &mut FileTreeState) {
    dispatch(
        state,
        Action::SetStatus {
            status: Status::Error,
        },
    );
    dispatch(
        state,
        Action::SetStatus {
            status: Status::Idle,
        },
    );
}
