//! Virtual file tree: node types and the enumeration walk.

pub mod enumerate;

use crate::store::FileHandle;
use serde::Serialize;

/// A node in the mirrored tree.
///
/// `id` is derived from the storage entry name and is unique within one
/// enumeration result; on a name collision the last entry wins at lookup
/// time.
#[derive(Debug, Clone, Serialize)]
pub struct TreeNode<T> {
    pub id: String,
    pub name: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode<T>>>,
}

/// Per-file payload of a tree node.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNodeData {
    pub file_size: u64,
    pub file_type: String,
    /// In-memory capability into the store. Lives only for the session;
    /// skipped on serialization.
    #[serde(skip)]
    pub handle: FileHandle,
    /// Unix epoch milliseconds.
    pub last_modified: i64,
}

/// Content type derived from the entry name, the way the host would report
/// it for a picked file.
pub fn content_type_for(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "heic" => "image/heic",
        "tif" | "tiff" => "image/tiff",
        "bmp" => "image/bmp",
        "mp4" => "video/mp4",
        "txt" => "text/plain",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}
