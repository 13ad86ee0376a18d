//! Owns the set of document replicas for one process, the site-id intern
//! table, and the single logical clock shared by every document.
//!
//! The manager is the only place the local clock advances: replicas
//! themselves are passive stores. A `parking_lot::Mutex` around the whole
//! manager state is held across the entirety of `local_insert`,
//! `local_delete`, `apply_remote`, and `read` — the RGA insertion scan is
//! not safe against concurrent mutation, and the clock bump plus apply must
//! be atomic. Per-document locks would reduce contention but aren't worth
//! the complexity at this scale; one coarse lock keeps every operation
//! trivially linearizable.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use super::document::DocumentReplica;
use super::id::CharId;
use crate::error::SyncError;
use crate::protocol::edit::Op;

/// An insert that arrived before its `origin_left`, waiting to be retried.
#[derive(Debug, Clone)]
struct PendingInsert {
    new_id: CharId,
    content: char,
    origin_left: CharId,
}

struct ManagerState {
    site_id: Arc<str>,
    clock: u32,
    docs: HashMap<String, DocumentReplica>,
    deferred: HashMap<String, VecDeque<PendingInsert>>,
    site_interner: HashMap<String, Arc<str>>,
}

impl ManagerState {
    fn intern(&mut self, site: &str) -> Arc<str> {
        if let Some(existing) = self.site_interner.get(site) {
            return existing.clone();
        }
        let interned: Arc<str> = Arc::from(site);
        self.site_interner.insert(site.to_string(), interned.clone());
        interned
    }

    fn doc_mut(&mut self, name: &str) -> &mut DocumentReplica {
        self.docs.entry(name.to_string()).or_default()
    }

    /// Applies a single insert, deferring it if its origin isn't present yet.
    fn apply_insert_or_defer(&mut self, doc: &str, pending: PendingInsert) {
        let result = self.doc_mut(doc).apply_insert(
            pending.new_id.clone(),
            pending.content,
            pending.origin_left.clone(),
        );
        match result {
            Ok(()) => self.drain_deferred(doc),
            Err(SyncError::UnknownOrigin) => {
                self.deferred.entry(doc.to_string()).or_default().push_back(pending);
            }
            Err(_) => unreachable!("apply_insert only fails with UnknownOrigin"),
        }
    }

    /// Retries every deferred op for `doc` until a full pass makes no
    /// progress. Bounded by the queue's length times itself in the worst
    /// case, which is fine at the queue sizes this system expects.
    fn drain_deferred(&mut self, doc: &str) {
        loop {
            let queue = match self.deferred.get_mut(doc) {
                Some(q) if !q.is_empty() => std::mem::take(q),
                _ => return,
            };
            let before = queue.len();
            let mut still_pending = VecDeque::new();
            for pending in queue {
                let replica = self.doc_mut(doc);
                match replica.apply_insert(
                    pending.new_id.clone(),
                    pending.content,
                    pending.origin_left.clone(),
                ) {
                    Ok(()) => {}
                    Err(SyncError::UnknownOrigin) => still_pending.push_back(pending),
                    Err(_) => unreachable!("apply_insert only fails with UnknownOrigin"),
                }
            }
            let made_progress = still_pending.len() < before;
            self.deferred.insert(doc.to_string(), still_pending);
            if !made_progress {
                return;
            }
        }
    }
}

pub struct InsertOp {
    pub new_id: CharId,
    pub origin_left: CharId,
    pub content: char,
}

pub struct DeleteOp {
    pub target_id: CharId,
}

/// Owns every document replica in the process and the single logical clock
/// used to mint new character ids.
pub struct CrdtManager {
    state: Mutex<ManagerState>,
}

impl CrdtManager {
    pub fn new(site_id: impl Into<String>) -> Self {
        let site_id = site_id.into();
        let mut interner = HashMap::new();
        let interned_site: Arc<str> = Arc::from(site_id.as_str());
        interner.insert(site_id, interned_site.clone());
        CrdtManager {
            state: Mutex::new(ManagerState {
                site_id: interned_site,
                clock: 0,
                docs: HashMap::new(),
                deferred: HashMap::new(),
                site_interner: interner,
            }),
        }
    }

    pub fn site_id(&self) -> Arc<str> {
        self.state.lock().site_id.clone()
    }

    pub fn clock(&self) -> u32 {
        self.state.lock().clock
    }

    /// Translates a user-visible insertion index into an op, applies it
    /// locally, and returns the op to broadcast.
    pub fn local_insert(
        &self,
        doc: &str,
        visible_index: usize,
        content: char,
    ) -> Result<InsertOp, SyncError> {
        let mut state = self.state.lock();
        state.clock += 1;
        let new_id = CharId::new(state.site_id.clone(), state.clock);
        let origin_left = state.doc_mut(doc).origin_for_visible_index(visible_index)?;
        state
            .doc_mut(doc)
            .apply_insert(new_id.clone(), content, origin_left.clone())?;
        state.drain_deferred(doc);
        Ok(InsertOp {
            new_id,
            origin_left,
            content,
        })
    }

    pub fn local_delete(&self, doc: &str, visible_index: usize) -> Result<DeleteOp, SyncError> {
        let mut state = self.state.lock();
        let target_id = state.doc_mut(doc).visible_id_at(visible_index)?;
        state.doc_mut(doc).apply_delete(&target_id);
        Ok(DeleteOp { target_id })
    }

    /// Applies a remote op, raising the local clock to at least the op's
    /// clock value (Lamport-style) and deferring inserts whose origin has
    /// not arrived yet.
    pub fn apply_remote(&self, doc: &str, op: Op) -> Result<(), SyncError> {
        let mut state = self.state.lock();
        match op {
            Op::Insert {
                site,
                clock,
                content,
                origin_left_site,
                origin_left_clock,
            } => {
                if content.chars().count() != 1 {
                    return Err(SyncError::MalformedOp(
                        "insert content must be exactly one codepoint".into(),
                    ));
                }
                let ch = content.chars().next().unwrap();
                state.clock = state.clock.max(clock);
                let new_site = state.intern(&site);
                let new_id = CharId::new(new_site, clock);
                let origin_left = if origin_left_site.is_empty() && origin_left_clock == 0 {
                    CharId::sentinel()
                } else {
                    let interned = state.intern(&origin_left_site);
                    CharId::new(interned, origin_left_clock)
                };
                state.apply_insert_or_defer(
                    doc,
                    PendingInsert {
                        new_id,
                        content: ch,
                        origin_left,
                    },
                );
                Ok(())
            }
            Op::Delete { target_site, target_clock } => {
                let site = state.intern(&target_site);
                let target_id = CharId::new(site, target_clock);
                state.doc_mut(doc).apply_delete(&target_id);
                Ok(())
            }
        }
    }

    pub fn read(&self, doc: &str) -> String {
        let mut state = self.state.lock();
        state.doc_mut(doc).read_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_insert_advances_clock_strictly() {
        let mgr = CrdtManager::new("A");
        let before = mgr.clock();
        mgr.local_insert("doc", 0, 'x').unwrap();
        assert!(mgr.clock() > before);
    }

    #[test]
    fn apply_remote_raises_clock_to_op_clock() {
        let mgr = CrdtManager::new("A");
        let op = Op::Insert {
            site: "B".into(),
            clock: 42,
            content: "x".into(),
            origin_left_site: String::new(),
            origin_left_clock: 0,
        };
        mgr.apply_remote("doc", op).unwrap();
        assert!(mgr.clock() >= 42);
    }

    #[test]
    fn insert_at_zero_on_empty_doc_uses_sentinel_origin() {
        let mgr = CrdtManager::new("A");
        let op = mgr.local_insert("doc", 0, 'a').unwrap();
        assert!(op.origin_left.is_sentinel());
    }

    #[test]
    fn insert_at_end_appends() {
        let mgr = CrdtManager::new("A");
        mgr.local_insert("doc", 0, 'a').unwrap();
        mgr.local_insert("doc", 1, 'b').unwrap();
        assert_eq!(mgr.read("doc"), "ab");
    }

    #[test]
    fn deferred_insert_applies_once_origin_arrives() {
        let mgr = CrdtManager::new("A");
        // Second insert references a first insert the manager hasn't seen yet.
        let second = Op::Insert {
            site: "B".into(),
            clock: 2,
            content: "y".into(),
            origin_left_site: "B".into(),
            origin_left_clock: 1,
        };
        mgr.apply_remote("doc", second).unwrap();
        assert_eq!(mgr.read("doc"), "");

        let first = Op::Insert {
            site: "B".into(),
            clock: 1,
            content: "x".into(),
            origin_left_site: String::new(),
            origin_left_clock: 0,
        };
        mgr.apply_remote("doc", first).unwrap();
        assert_eq!(mgr.read("doc"), "xy");
    }

    #[test]
    fn malformed_multi_codepoint_content_is_rejected() {
        let mgr = CrdtManager::new("A");
        let op = Op::Insert {
            site: "B".into(),
            clock: 1,
            content: "xy".into(),
            origin_left_site: String::new(),
            origin_left_clock: 0,
        };
        assert!(matches!(
            mgr.apply_remote("doc", op).unwrap_err(),
            SyncError::MalformedOp(_)
        ));
    }
}
