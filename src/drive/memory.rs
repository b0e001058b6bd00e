//! Process-local storage provider.
//!
//! Keeps a folder tree in memory. Used by the `memory` backend for local
//! development and by tests, which can also make individual operations fail.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};

use super::{DriveProvider, FolderRef, NewRemoteFile, PermissionRole, RemoteFile, FOLDER_MIME_TYPE};
use crate::{Result, StudioError};

/// Provider operations, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveOp {
    CreateFolder,
    CreateFile,
    GrantPublic,
    List,
    Delete,
    Get,
}

#[derive(Debug, Clone)]
struct Node {
    meta: RemoteFile,
    parent: Option<String>,
    seq: u64,
    content: Bytes,
    public_role: Option<PermissionRole>,
}

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<String, Node>,
    next_seq: u64,
    failing: HashSet<DriveOp>,
    failing_folder_names: HashSet<String>,
    calls: HashMap<DriveOp, usize>,
}

impl State {
    fn record(&mut self, op: DriveOp) -> Result<()> {
        *self.calls.entry(op).or_default() += 1;
        if self.failing.contains(&op) {
            return Err(StudioError::Provider(format!("injected failure: {op:?}")));
        }
        Ok(())
    }

    fn require(&self, id: &str) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| StudioError::Provider(format!("File not found: {id}.")))
    }

    fn insert(&mut self, mut meta: RemoteFile, parent: &str, content: Bytes) -> RemoteFile {
        self.next_seq += 1;
        let seq = self.next_seq;
        meta.id = format!("mem-{seq}");
        // Strictly increasing creation times keep newest-first ordering stable
        let base = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default();
        meta.created_time = (base + ChronoDuration::seconds(seq as i64)).to_rfc3339();
        meta.modified_time = Some(meta.created_time.clone());

        self.nodes.insert(
            meta.id.clone(),
            Node {
                meta: meta.clone(),
                parent: Some(parent.to_string()),
                seq,
                content,
                public_role: None,
            },
        );
        meta
    }

    fn descendants(&self, id: &str) -> Vec<String> {
        let mut out = vec![id.to_string()];
        let mut i = 0;
        while i < out.len() {
            let current = out[i].clone();
            out.extend(
                self.nodes
                    .iter()
                    .filter(|(_, n)| n.parent.as_deref() == Some(current.as_str()))
                    .map(|(k, _)| k.clone()),
            );
            i += 1;
        }
        out
    }
}

/// In-memory [`DriveProvider`].
#[derive(Debug)]
pub struct MemoryDrive {
    root_id: String,
    state: Mutex<State>,
}

impl MemoryDrive {
    /// Create a drive holding a single root folder with the given id.
    pub fn new(root_id: impl Into<String>) -> Self {
        let root_id = root_id.into();
        let mut state = State::default();
        state.nodes.insert(
            root_id.clone(),
            Node {
                meta: RemoteFile {
                    id: root_id.clone(),
                    name: "root".to_string(),
                    mime_type: FOLDER_MIME_TYPE.to_string(),
                    size: None,
                    created_time: String::new(),
                    modified_time: None,
                    thumbnail_link: None,
                    web_view_link: None,
                    web_content_link: None,
                },
                parent: None,
                seq: 0,
                content: Bytes::new(),
                public_role: None,
            },
        );

        Self {
            root_id,
            state: Mutex::new(state),
        }
    }

    /// Id of the root folder.
    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every call of `op` fail until [`MemoryDrive::recover`].
    pub fn fail(&self, op: DriveOp) {
        self.lock().failing.insert(op);
    }

    /// Stop failing `op`.
    pub fn recover(&self, op: DriveOp) {
        self.lock().failing.remove(&op);
    }

    /// Make folder creation fail for this exact name.
    pub fn fail_folder_named(&self, name: &str) {
        self.lock().failing_folder_names.insert(name.to_string());
    }

    /// Number of calls made for `op`, including failed ones.
    pub fn calls(&self, op: DriveOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Whether a file or folder exists.
    pub fn exists(&self, id: &str) -> bool {
        self.lock().nodes.contains_key(id)
    }

    /// Role granted to anyone with the link, if any.
    pub fn public_role(&self, id: &str) -> Option<PermissionRole> {
        self.lock().nodes.get(id).and_then(|n| n.public_role)
    }

    /// Stored content of a file.
    pub fn content(&self, id: &str) -> Option<Bytes> {
        self.lock().nodes.get(id).map(|n| n.content.clone())
    }

    /// Names of the direct children of a folder, newest first.
    pub fn child_names(&self, folder_id: &str) -> Vec<String> {
        let state = self.lock();
        let mut children: Vec<&Node> = state
            .nodes
            .values()
            .filter(|n| n.parent.as_deref() == Some(folder_id))
            .collect();
        children.sort_by(|a, b| b.seq.cmp(&a.seq));
        children.into_iter().map(|n| n.meta.name.clone()).collect()
    }
}

#[async_trait]
impl DriveProvider for MemoryDrive {
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<FolderRef> {
        let mut state = self.lock();
        state.record(DriveOp::CreateFolder)?;
        if state.failing_folder_names.contains(name) {
            return Err(StudioError::Provider(format!(
                "injected failure: folder {name}"
            )));
        }
        state.require(parent_id)?;

        let meta = RemoteFile {
            id: String::new(),
            name: name.to_string(),
            mime_type: FOLDER_MIME_TYPE.to_string(),
            size: None,
            created_time: String::new(),
            modified_time: None,
            thumbnail_link: None,
            web_view_link: None,
            web_content_link: None,
        };
        let created = state.insert(meta, parent_id, Bytes::new());
        Ok(FolderRef {
            id: created.id,
            name: created.name,
        })
    }

    async fn create_file(&self, file: NewRemoteFile) -> Result<RemoteFile> {
        let mut state = self.lock();
        state.record(DriveOp::CreateFile)?;
        state.require(&file.parent_id)?;

        let meta = RemoteFile {
            id: String::new(),
            name: file.name,
            mime_type: file.mime_type,
            size: Some(file.content.len().to_string()),
            created_time: String::new(),
            modified_time: None,
            thumbnail_link: None,
            web_view_link: None,
            web_content_link: None,
        };
        let mut created = state.insert(meta, &file.parent_id, file.content);
        created.web_view_link = Some(format!("memory://{}/view", created.id));
        created.web_content_link = Some(format!("memory://{}/content", created.id));
        if let Some(node) = state.nodes.get_mut(&created.id) {
            node.meta = created.clone();
        }
        Ok(created)
    }

    async fn grant_public(&self, file_id: &str, role: PermissionRole) -> Result<()> {
        let mut state = self.lock();
        state.record(DriveOp::GrantPublic)?;
        state.require(file_id)?;
        if let Some(node) = state.nodes.get_mut(file_id) {
            node.public_role = Some(role);
        }
        Ok(())
    }

    async fn list_children(&self, folder_id: &str) -> Result<Vec<RemoteFile>> {
        let mut state = self.lock();
        state.record(DriveOp::List)?;
        state.require(folder_id)?;

        let mut children: Vec<&Node> = state
            .nodes
            .values()
            .filter(|n| n.parent.as_deref() == Some(folder_id))
            .collect();
        children.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(children.into_iter().map(|n| n.meta.clone()).collect())
    }

    async fn delete(&self, file_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.record(DriveOp::Delete)?;
        state.require(file_id)?;

        for id in state.descendants(file_id) {
            state.nodes.remove(&id);
        }
        Ok(())
    }

    async fn get(&self, file_id: &str) -> Result<RemoteFile> {
        let mut state = self.lock();
        state.record(DriveOp::Get)?;
        Ok(state.require(file_id)?.meta.clone())
    }
}
