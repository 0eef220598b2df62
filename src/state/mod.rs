//! Tree State Store
//!
//! Consumer-side cache of the last-known tree, current status, selection,
//! and drag state, updated solely through a pure reducer. The reducer
//! assumes well-formed input; payload filtering happens upstream in the
//! session's event handler, never here.

pub mod session;

pub use session::Session;

use crate::tree::{TreeNode, TreeNodeData};
use serde::Serialize;

/// Consumer-visible lifecycle of the worker-backed tree.
///
/// `Error` is transient: the event handler always follows it with a reset
/// to `Idle`, so operations stay retryable by re-invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Initializing,
    Loading,
    Idle,
    Error,
}

/// The cached mirror. Never the source of truth; reconstructed from storage
/// on every enumeration.
#[derive(Debug, Clone)]
pub struct TreeState<T> {
    /// Flat listing in enumeration order. Not guaranteed sorted.
    pub tree: Vec<TreeNode<T>>,
    pub status: Status,
    pub is_dragging: bool,
    pub selected: Option<TreeNode<T>>,
}

impl<T> TreeState<T> {
    pub fn new() -> Self {
        Self {
            tree: Vec::new(),
            status: Status::Initializing,
            is_dragging: false,
            selected: None,
        }
    }
}

impl<T> Default for TreeState<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub type FileTreeState = TreeState<TreeNodeData>;

/// The six action kinds the store understands.
#[derive(Debug, Clone)]
pub enum Action<T> {
    SetStatus { status: Status },
    /// Replace the tree wholesale.
    SetTreeStructure { tree: Vec<TreeNode<T>> },
    /// Append to the tree. No deduplication: duplicate ids may coexist
    /// until the next full resync replaces the tree.
    MergeTreeStructure { tree: Vec<TreeNode<T>> },
    IsDragging { is_dragging: bool },
    SetSelected { selected: TreeNode<T> },
    UnsetSelected,
}

/// Total, synchronous, side-effect-free function of (state, action).
pub fn reduce<T>(state: TreeState<T>, action: Action<T>) -> TreeState<T> {
    match action {
        Action::SetStatus { status } => TreeState { status, ..state },
        Action::SetTreeStructure { tree } => TreeState { tree, ..state },
        Action::MergeTreeStructure { tree } => {
            let mut merged = state.tree;
            merged.extend(tree);
            TreeState {
                tree: merged,
                ..state
            }
        }
        Action::IsDragging { is_dragging } => TreeState {
            is_dragging,
            ..state
        },
        Action::SetSelected { selected } => TreeState {
            selected: Some(selected),
            ..state
        },
        Action::UnsetSelected => TreeState {
            selected: None,
            ..state
        },
    }
}
