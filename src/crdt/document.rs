//! The RGA core: one ordered sequence of character nodes per document.
//!
//! Storage is an arena with intrusive links: a flat `Vec<Node>` plus a
//! `CharId -> index` map for O(1) lookup, with sequence order carried by
//! each node's `next` index rather than by position in the `Vec`. A plain
//! id-ordered map can't express an origin-anchored insert, since placement
//! depends on where `origin_left` currently sits, not on global id order.
//!
//! A `DocumentReplica` is never shared across threads directly: it is only
//! ever reached through the owning manager's lock, so there is no internal
//! synchronization here.

use std::collections::HashMap;

use super::id::CharId;
use super::node::Node;
use crate::error::SyncError;

#[derive(Debug, Default)]
pub struct DocumentReplica {
    arena: Vec<Node>,
    index: HashMap<CharId, usize>,
    head: Option<usize>,
}

impl DocumentReplica {
    pub fn new() -> Self {
        DocumentReplica::default()
    }

    /// Inserts `content` at the position implied by `origin_left`.
    ///
    /// Idempotent: re-applying an already-known `new_id` is a no-op.
    /// Fails with [`SyncError::UnknownOrigin`] when `origin_left` is
    /// non-sentinel and not present locally yet — the caller (the
    /// `CrdtManager`) is responsible for deferring and retrying such ops.
    pub fn apply_insert(
        &mut self,
        new_id: CharId,
        content: char,
        origin_left: CharId,
    ) -> Result<(), SyncError> {
        if self.index.contains_key(&new_id) {
            return Ok(());
        }

        let anchor_idx = if origin_left.is_sentinel() {
            None
        } else {
            Some(
                *self
                    .index
                    .get(&origin_left)
                    .ok_or(SyncError::UnknownOrigin)?,
            )
        };

        let mut prev = anchor_idx;
        let mut cur = match anchor_idx {
            Some(i) => self.arena[i].next,
            None => self.head,
        };

        while let Some(ci) = cur {
            let r = &self.arena[ci];
            if r.origin_left == origin_left && new_id.id_lt(&r.id) {
                prev = Some(ci);
                cur = r.next;
            } else {
                break;
            }
        }

        let new_idx = self.arena.len();
        let mut node = Node::new(new_id.clone(), content, origin_left);
        node.next = cur;
        self.arena.push(node);

        match prev {
            Some(p) => self.arena[p].next = Some(new_idx),
            None => self.head = Some(new_idx),
        }
        self.index.insert(new_id, new_idx);
        Ok(())
    }

    /// Tombstones `target_id`. No-op if absent or already deleted.
    pub fn apply_delete(&mut self, target_id: &CharId) {
        if let Some(&idx) = self.index.get(target_id) {
            self.arena[idx].deleted = true;
        }
    }

    /// Concatenates the content of every non-deleted node in sequence order.
    pub fn read_text(&self) -> String {
        let mut out = String::with_capacity(self.arena.len());
        let mut cur = self.head;
        while let Some(ci) = cur {
            let n = &self.arena[ci];
            if !n.deleted {
                out.push(n.content);
            }
            cur = n.next;
        }
        out
    }

    /// Id to use as `origin_left` for a local insert at visible index `i`:
    /// the sentinel when `i == 0`, otherwise the id of the `i`-th
    /// (1-indexed) visible node. `i == visible_count` appends.
    pub fn origin_for_visible_index(&self, i: usize) -> Result<CharId, SyncError> {
        if i == 0 {
            return Ok(CharId::sentinel());
        }
        let mut count = 0usize;
        let mut cur = self.head;
        while let Some(ci) = cur {
            let n = &self.arena[ci];
            if !n.deleted {
                count += 1;
                if count == i {
                    return Ok(n.id.clone());
                }
            }
            cur = n.next;
        }
        Err(SyncError::IndexOutOfRange)
    }

    /// Id of the visible node at 0-indexed position `i`, for `local_delete`.
    pub fn visible_id_at(&self, i: usize) -> Result<CharId, SyncError> {
        let mut count = 0usize;
        let mut cur = self.head;
        while let Some(ci) = cur {
            let n = &self.arena[ci];
            if !n.deleted {
                if count == i {
                    return Ok(n.id.clone());
                }
                count += 1;
            }
            cur = n.next;
        }
        Err(SyncError::IndexOutOfRange)
    }

    pub fn visible_count(&self) -> usize {
        let mut count = 0usize;
        let mut cur = self.head;
        while let Some(ci) = cur {
            let n = &self.arena[ci];
            if !n.deleted {
                count += 1;
            }
            cur = n.next;
        }
        count
    }

    pub fn total_node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn contains(&self, id: &CharId) -> bool {
        self.index.contains_key(id)
    }
}
