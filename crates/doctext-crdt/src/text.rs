//! Replicated text: an in-memory CRDT for plain UTF-8 text.
//!
//! Each character is identified by an immutable `(site, lamport, char_index)`
//! triple assigned at insertion time. `lamport` is a Lamport clock, not a
//! bare per-site sequence number: every apply (local or remote) advances it
//! past the highest value seen so far, so a character created with
//! knowledge of another one always sorts after it. Characters are linked to
//! the character they were inserted after (their "origin"); the visible
//! text is the pre-order traversal of this origin tree, with same-origin
//! children ordered by descending lamport (the most recently created child
//! lands immediately after the origin, ahead of whatever was already
//! there), falling back to ascending `site` only when two children are
//! genuinely concurrent and land on the same lamport value.
//!
//! Structurally this is the same origin-pointer RGA technique as
//! `core/privstack-crdt`'s `RGA<T>` (group by origin, sort siblings
//! descending by ID, DFS from root), generalized so identity is the
//! `(site, lamport)` pair carried by every `Operation` rather than a
//! `HybridTimestamp`, with the teacher's descending-ID comparator kept for
//! recency and only the concurrent tie-break flipped to ascending `site`,
//! matching the tie-break rule this data type is required to honor.

use crate::operation::{CrdtError, CrdtResult, Operation, OperationKind};
use crate::vector_clock::VectorClock;
use doctext_types::{OperationId, SiteId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Identifies a single character slot, immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharId {
    pub site: SiteId,
    pub lamport: u64,
    pub char_index: u32,
}

impl CharId {
    #[must_use]
    pub const fn new(site: SiteId, lamport: u64, char_index: u32) -> Self {
        Self {
            site,
            lamport,
            char_index,
        }
    }
}

impl fmt::Display for CharId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.site, self.lamport, self.char_index)
    }
}

/// Orders two children of the same origin: higher lamport (more recently
/// created) first. Falls back to ascending `site` only when both lamports
/// are equal, which happens only between mutually concurrent inserts that
/// neither observed the other's lamport bump.
fn sibling_order(a: &CharId, b: &CharId) -> std::cmp::Ordering {
    b.lamport.cmp(&a.lamport).then_with(|| a.site.cmp(&b.site))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CharSlot {
    id: CharId,
    origin: Option<CharId>,
    value: Option<char>,
}

/// An in-memory, causally ordered, convergent replicated text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicatedText {
    chars: HashMap<CharId, CharSlot>,
    vclock: VectorClock,
    applied_ops: HashSet<OperationId>,
    op_log: Vec<Operation>,
    local_site: SiteId,
    /// Highest lamport value observed from any op, local or remote. Every
    /// newly allocated lamport advances past this, turning the per-site
    /// counter into a true Lamport clock so sibling recency is comparable
    /// across sites.
    max_lamport: u64,
}

/// The full state needed to reconstruct a `ReplicatedText` elsewhere,
/// produced by `snapshot()` and consumed by `restore()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    ops: Vec<Operation>,
}

/// Result of `apply_remote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub applied: bool,
}

impl ReplicatedText {
    /// Creates a new, empty replicated text owned by `local_site`.
    #[must_use]
    pub fn new(local_site: SiteId) -> Self {
        Self {
            chars: HashMap::new(),
            vclock: VectorClock::new(),
            applied_ops: HashSet::new(),
            op_log: Vec::new(),
            local_site,
            max_lamport: 0,
        }
    }

    /// Allocates the next lamport value for `site`: one past the highest
    /// value this replica has seen anywhere, so a freshly created character
    /// always outranks every character it could have observed.
    fn next_lamport(&mut self, site: SiteId) -> u64 {
        let lamport = self.max_lamport.max(self.vclock.get(&site)) + 1;
        self.max_lamport = lamport;
        self.vclock.update(site, lamport);
        lamport
    }

    /// Generates a new op stamped with the local site and the next lamport
    /// value, applies it, and returns it for broadcast. Out-of-range
    /// positions/lengths are clamped rather than rejected.
    pub fn apply_local(
        &mut self,
        kind: OperationKind,
        position: u32,
        content: Option<String>,
        length: Option<u32>,
    ) -> CrdtResult<Operation> {
        let site = self.local_site;
        let (op, _applied) = self.apply_for_site(site, None, kind, position, content, length)?;
        Ok(op)
    }

    /// Like `apply_local`, but stamps the op with an arbitrary `site` and an
    /// optional caller-supplied `op_id`, returning whether it was newly
    /// applied (`false` if `op_id` was already seen — idempotent resubmit).
    ///
    /// A session coordinator holds exactly one `ReplicatedText` per document
    /// but must allocate a distinct lamport sequence per connected peer, so
    /// it calls this once per submitted op using that peer's `SiteId`
    /// instead of `apply_local`'s fixed `local_site`. Passing the client's
    /// own operation id lets resubmission of the same id be detected for
    /// ops the SC originates on a peer's behalf, without consuming a new
    /// lamport tick for the duplicate.
    pub fn apply_for_site(
        &mut self,
        site: SiteId,
        op_id: Option<OperationId>,
        kind: OperationKind,
        position: u32,
        content: Option<String>,
        length: Option<u32>,
    ) -> CrdtResult<(Operation, bool)> {
        if let Some(op_id) = op_id {
            if let Some(existing) = self.op_log.iter().find(|o| o.op_id == op_id) {
                return Ok((existing.clone(), false));
            }
        }

        // Validate before consuming a lamport tick: a rejected op must not
        // advance the site's causal time.
        match kind {
            OperationKind::Insert if content.is_none() => {
                return Err(CrdtError::MalformedOperation("insert without content".into()));
            }
            OperationKind::Delete if length.is_none_or(|l| l == 0) => {
                return Err(CrdtError::MalformedOperation(
                    "delete with missing or zero length".into(),
                ));
            }
            _ => {}
        }

        let lamport = self.next_lamport(site);
        let mut op = match kind {
            OperationKind::Insert => Operation::insert(position, content.unwrap(), site, lamport),
            OperationKind::Delete => Operation::delete(position, length.unwrap(), site, lamport),
            OperationKind::Retain => Operation::retain(position, site, lamport),
        };
        if let Some(op_id) = op_id {
            op.op_id = op_id;
        }

        self.apply_internal(&op)?;
        self.applied_ops.insert(op.op_id);
        self.op_log.push(op.clone());
        Ok((op, true))
    }

    /// Applies a remote operation. Idempotent: returns `applied=false` if
    /// `op.op_id` was already seen, or if `(op.site, op.lamport)` is not
    /// newer than the last lamport value recorded for that site.
    pub fn apply_remote(&mut self, op: Operation) -> CrdtResult<ApplyOutcome> {
        if self.applied_ops.contains(&op.op_id) {
            return Ok(ApplyOutcome { applied: false });
        }
        if op.lamport <= self.vclock.get(&op.site) {
            return Ok(ApplyOutcome { applied: false });
        }

        self.apply_internal(&op)?;
        self.vclock.update(op.site, op.lamport);
        self.max_lamport = self.max_lamport.max(op.lamport);
        self.applied_ops.insert(op.op_id);
        self.op_log.push(op);
        Ok(ApplyOutcome { applied: true })
    }

    fn apply_internal(&mut self, op: &Operation) -> CrdtResult<()> {
        match op.kind {
            OperationKind::Insert => {
                let content = op.content.as_deref().ok_or_else(|| {
                    CrdtError::MalformedOperation("insert without content".into())
                })?;
                let visible_len = self.visible_len();
                let position = (op.position as usize).min(visible_len);
                let mut origin = self.origin_before(position);
                for (i, c) in content.chars().enumerate() {
                    let id = CharId::new(op.site, op.lamport, i as u32);
                    self.chars.insert(
                        id,
                        CharSlot {
                            id,
                            origin,
                            value: Some(c),
                        },
                    );
                    origin = Some(id);
                }
            }
            OperationKind::Delete => {
                let length = op.length.ok_or_else(|| {
                    CrdtError::MalformedOperation("delete with missing length".into())
                })?;
                let visible_len = self.visible_len();
                let start = (op.position as usize).min(visible_len);
                let end = start.saturating_add(length as usize).min(visible_len);
                let ids: Vec<CharId> = self
                    .visible_order()
                    .into_iter()
                    .skip(start)
                    .take(end.saturating_sub(start))
                    .collect();
                for id in ids {
                    if let Some(slot) = self.chars.get_mut(&id) {
                        slot.value = None;
                    }
                }
            }
            OperationKind::Retain => {
                // No observable effect; the lamport tick was already consumed
                // by the caller (apply_for_site's next_lamport / apply_remote's
                // vclock.update).
            }
        }
        Ok(())
    }

    /// Builds the full visible-and-tombstoned traversal order by grouping
    /// characters under their origin and walking the tree depth-first,
    /// siblings ordered by `sibling_order` (recency, concurrent ties broken
    /// by site).
    fn full_order(&self) -> Vec<CharId> {
        let mut children: HashMap<Option<CharId>, Vec<CharId>> = HashMap::new();
        for slot in self.chars.values() {
            children.entry(slot.origin).or_default().push(slot.id);
        }
        for siblings in children.values_mut() {
            siblings.sort_by(sibling_order);
        }

        let mut order = Vec::with_capacity(self.chars.len());
        let mut stack: Vec<Option<CharId>> = vec![None];
        while let Some(current) = stack.pop() {
            if let Some(id) = current {
                order.push(id);
            }
            if let Some(kids) = children.get(&current) {
                for &child in kids.iter().rev() {
                    stack.push(Some(child));
                }
            }
        }
        order
    }

    /// The traversal order restricted to non-tombstoned characters.
    fn visible_order(&self) -> Vec<CharId> {
        self.full_order()
            .into_iter()
            .filter(|id| self.chars.get(id).is_some_and(|s| s.value.is_some()))
            .collect()
    }

    fn visible_len(&self) -> usize {
        self.chars.values().filter(|s| s.value.is_some()).count()
    }

    /// The `CharId` of the visible character immediately before `position`
    /// (or `None` for the root anchor, when `position == 0`).
    fn origin_before(&self, position: usize) -> Option<CharId> {
        if position == 0 {
            return None;
        }
        self.visible_order().into_iter().nth(position - 1)
    }

    /// Current materialization of the text.
    #[must_use]
    pub fn content(&self) -> String {
        self.visible_order()
            .into_iter()
            .filter_map(|id| self.chars.get(&id).and_then(|s| s.value))
            .collect()
    }

    /// Number of visible characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.visible_len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The causally ordered operation log, as applied locally (useful for
    /// late joiners who need every op that contributed to the current
    /// content).
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.op_log
    }

    #[must_use]
    pub fn vector_clock(&self) -> &VectorClock {
        &self.vclock
    }

    /// Removes tombstones whose origin is dominated by `min_vclock` — safe
    /// once every live peer has observed the delete.
    pub fn garbage_collect(&mut self, min_vclock: &VectorClock) {
        self.chars.retain(|id, slot| {
            slot.value.is_some() || id.lamport > min_vclock.get(&id.site)
        });
    }

    /// Serializes enough state to reconstruct this text elsewhere: the full
    /// causal operation log. `restore` replays it from scratch, so the
    /// snapshot is self-sufficient without external state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            ops: self.op_log.clone(),
        }
    }

    /// Rebuilds a `ReplicatedText` from a snapshot taken by `snapshot()`.
    /// Only valid on a freshly constructed instance.
    pub fn restore(local_site: SiteId, snapshot: Snapshot) -> CrdtResult<Self> {
        let mut text = Self::new(local_site);
        for op in snapshot.ops {
            text.apply_internal(&op)?;
            text.vclock.update(op.site, op.lamport);
            text.max_lamport = text.max_lamport.max(op.lamport);
            text.applied_ops.insert(op.op_id);
            text.op_log.push(op);
        }
        Ok(text)
    }
}
