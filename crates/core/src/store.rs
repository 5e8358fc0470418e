use std::{collections::HashMap, io::ErrorKind, path::Path};

use tokio::fs;
use tracing::{debug, warn};

use crate::{
    error::StoreError,
    types::{MessageId, Segment, SegmentId},
};

struct Entry {
    message_id: MessageId,
    segment: Segment,
}

/// Ordered, message-addressable collection of the clips of one reel.
///
/// Segments live in a handle-keyed table; `order` holds the handles in the
/// order they were added and `by_message` maps a chat message to its handle.
/// Removing a segment never invalidates the handles of the others.
///
/// The store owns every staged file it holds: `remove_segment` and `cleanup`
/// delete them from disk.
pub struct SegmentStore {
    max_clips: usize,
    entries: HashMap<SegmentId, Entry>,
    order: Vec<SegmentId>,
    by_message: HashMap<MessageId, SegmentId>,
}

impl SegmentStore {
    pub fn new(max_clips: usize) -> Self {
        Self {
            max_clips,
            entries: HashMap::new(),
            order: Vec::new(),
            by_message: HashMap::new(),
        }
    }

    pub fn max_clips(&self) -> usize {
        self.max_clips
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.order.len() >= self.max_clips
    }

    pub fn add_segment(
        &mut self,
        message_id: MessageId,
        file: impl Into<std::path::PathBuf>,
        caption: Option<String>,
    ) -> Result<SegmentId, StoreError> {
        if self.is_full() {
            return Err(StoreError::Capacity {
                max: self.max_clips,
            });
        }
        if self.by_message.contains_key(&message_id) {
            return Err(StoreError::DuplicateMessage { message_id });
        }

        let id = SegmentId::new();
        self.entries.insert(
            id,
            Entry {
                message_id,
                segment: Segment::new(file, caption),
            },
        );
        self.order.push(id);
        self.by_message.insert(message_id, id);
        Ok(id)
    }

    pub fn edit_caption(
        &mut self,
        message_id: MessageId,
        caption: Option<String>,
    ) -> Result<(), StoreError> {
        let entry = self
            .by_message
            .get(&message_id)
            .and_then(|id| self.entries.get_mut(id))
            .ok_or(StoreError::NotFound { message_id })?;
        entry.segment.caption = caption;
        Ok(())
    }

    /// Drops the segment added by `message_id` and deletes its staged file.
    pub async fn remove_segment(&mut self, message_id: MessageId) -> Result<Segment, StoreError> {
        let id = self
            .by_message
            .remove(&message_id)
            .ok_or(StoreError::NotFound { message_id })?;
        self.order.retain(|other| *other != id);
        let entry = self
            .entries
            .remove(&id)
            .ok_or(StoreError::NotFound { message_id })?;

        remove_staged(&entry.segment.file).await;
        Ok(entry.segment)
    }

    pub fn get(&self, message_id: MessageId) -> Option<&Segment> {
        self.by_message
            .get(&message_id)
            .and_then(|id| self.entries.get(id))
            .map(|entry| &entry.segment)
    }

    pub fn last_message_id(&self) -> Option<MessageId> {
        self.order
            .last()
            .and_then(|id| self.entries.get(id))
            .map(|entry| entry.message_id)
    }

    /// Segments in output order.
    pub fn segments(&self) -> Vec<Segment> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .map(|entry| entry.segment.clone())
            .collect()
    }

    /// Deletes every staged file and empties the store. Safe to call repeatedly.
    pub async fn cleanup(&mut self) {
        for id in self.order.drain(..) {
            if let Some(entry) = self.entries.remove(&id) {
                remove_staged(&entry.segment.file).await;
            }
        }
        self.entries.clear();
        self.by_message.clear();
    }
}

async fn remove_staged(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed staged clip"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove staged clip"),
    }
}
