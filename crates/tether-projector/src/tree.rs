//! File tree derived from the file-activity log.
//!
//! Nodes live in an arena; parents hold child indices and an auxiliary
//! path map gives O(1) lookup by full path. Directory nodes are
//! synthesized on demand from path segments as activity arrives.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use tether_core::constants::FILE_ACTIVE_WINDOW_MS;
use tether_core::model::FileActivityEvent;

/// Whether a node names a file or a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Leaf path touched by an activity event.
    File,
    /// Intermediate path segment.
    Directory,
}

#[derive(Debug)]
struct Node {
    name: String,
    path: String,
    kind: NodeKind,
    children: Vec<usize>,
    last_activity: Option<FileActivityEvent>,
    last_mutation: Option<DateTime<Utc>>,
    is_active: bool,
}

/// Owned, serializable snapshot of one tree node.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTreeNode {
    /// Final path segment.
    pub name: String,
    /// Full path from the root.
    pub path: String,
    /// File or directory.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Child nodes, directories first, each group sorted by name.
    pub children: Vec<FileTreeNode>,
    /// Whether the file was mutated within the activity window.
    pub is_active: bool,
    /// Most recent activity event recorded for this path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<FileActivityEvent>,
}

/// Incrementally built file tree with a 10-second activity window.
///
/// A file is active iff its most recent non-read action is less than
/// [`FILE_ACTIVE_WINDOW_MS`] old. Reads never mark a file active.
#[derive(Debug, Default)]
pub struct FileTree {
    nodes: Vec<Node>,
    roots: Vec<usize>,
    by_path: HashMap<String, usize>,
}

impl FileTree {
    /// Empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one activity event, synthesizing directory nodes for
    /// every missing path segment.
    pub fn record(&mut self, event: &FileActivityEvent, now: DateTime<Utc>) {
        let segments: Vec<&str> = event.file.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return;
        }
        let mut parent: Option<usize> = None;
        let mut path = String::new();
        let last = segments.len() - 1;
        for (depth, segment) in segments.iter().enumerate() {
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(segment);
            let kind = if depth == last {
                NodeKind::File
            } else {
                NodeKind::Directory
            };
            let index = self.intern(&path, segment, kind, parent);
            parent = Some(index);
        }
        let leaf = &mut self.nodes[parent.expect("non-empty path has a leaf")];
        leaf.last_activity = Some(event.clone());
        if event.action.is_mutation() {
            leaf.last_mutation = Some(event.timestamp);
        }
        leaf.is_active = is_active(leaf.last_mutation, now);
    }

    /// Recomputes every node's activity flag against `now`.
    ///
    /// Called on a periodic sweep so files fade to inactive even when
    /// no new events arrive.
    pub fn refresh_activity(&mut self, now: DateTime<Utc>) {
        for node in &mut self.nodes {
            node.is_active = is_active(node.last_mutation, now);
        }
    }

    /// Whether the file at `path` is currently active.
    #[must_use]
    pub fn is_active(&self, path: &str) -> bool {
        self.by_path
            .get(path)
            .is_some_and(|&i| self.nodes[i].is_active)
    }

    /// The most recent activity recorded at `path`, if the node exists.
    #[must_use]
    pub fn last_activity(&self, path: &str) -> Option<&FileActivityEvent> {
        self.by_path
            .get(path)
            .and_then(|&i| self.nodes[i].last_activity.as_ref())
    }

    /// Number of nodes, directories included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no activity has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Owned snapshot of the whole tree, for rendering.
    #[must_use]
    pub fn snapshot(&self) -> Vec<FileTreeNode> {
        let mut roots: Vec<FileTreeNode> = self.roots.iter().map(|&i| self.clone_node(i)).collect();
        sort_siblings(&mut roots);
        roots
    }

    fn clone_node(&self, index: usize) -> FileTreeNode {
        let node = &self.nodes[index];
        let mut children: Vec<FileTreeNode> =
            node.children.iter().map(|&c| self.clone_node(c)).collect();
        sort_siblings(&mut children);
        FileTreeNode {
            name: node.name.clone(),
            path: node.path.clone(),
            kind: node.kind,
            children,
            is_active: node.is_active,
            last_activity: node.last_activity.clone(),
        }
    }

    fn intern(&mut self, path: &str, name: &str, kind: NodeKind, parent: Option<usize>) -> usize {
        if let Some(&existing) = self.by_path.get(path) {
            return existing;
        }
        let index = self.nodes.len();
        self.nodes.push(Node {
            name: name.to_owned(),
            path: path.to_owned(),
            kind,
            children: Vec::new(),
            last_activity: None,
            last_mutation: None,
            is_active: false,
        });
        let _ = self.by_path.insert(path.to_owned(), index);
        match parent {
            Some(p) => self.nodes[p].children.push(index),
            None => self.roots.push(index),
        }
        index
    }
}

fn is_active(last_mutation: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    last_mutation
        .is_some_and(|at| now.signed_duration_since(at) < Duration::milliseconds(FILE_ACTIVE_WINDOW_MS))
}

fn sort_siblings(nodes: &mut [FileTreeNode]) {
    nodes.sort_by(|a, b| match (a.kind, b.kind) {
        (NodeKind::Directory, NodeKind::File) => std::cmp::Ordering::Less,
        (NodeKind::File, NodeKind::Directory) => std::cmp::Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });
}
