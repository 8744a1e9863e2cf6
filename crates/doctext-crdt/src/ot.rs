//! Operational transformation: rebases a position-based op against a
//! concurrent op so its effect on the rebased state matches its intent
//! against the original state.
//!
//! This is a secondary, advisory path: `ReplicatedText` (the CRDT) is the
//! authoritative merge, and nothing in this module mutates or consults it.
//! `transform` is used when a client composed an op against a view that has
//! since been overtaken by a concurrent op it never saw, and the op's
//! positional parameters need rebasing before the caller re-derives intent
//! from it (e.g. for an external client library that wants OT semantics
//! rather than raw CRDT application).
//!
//! Grounded in spirit (not dependency) on `operational_transform`-style
//! transform usage seen in comparable collaborative editors — implemented
//! here directly against char-position Insert/Delete/Retain ops rather than
//! a component-run `OperationSeq`.

use crate::operation::{Operation, OperationKind};

/// Rebases `op` against each op in `concurrent`, in order, returning the
/// transformed op. Pure and total: every position/length arithmetic path is
/// saturating, never panics.
#[must_use]
pub fn transform(op: &Operation, concurrent: &[Operation]) -> Operation {
    let mut result = op.clone();
    for against in concurrent {
        result = transform_one(&result, against);
    }
    result
}

fn transform_one(op: &Operation, against: &Operation) -> Operation {
    match (op.kind, against.kind) {
        (OperationKind::Insert, OperationKind::Insert) => {
            transform_insert_vs_insert(op, against)
        }
        (OperationKind::Insert, OperationKind::Delete) => {
            transform_insert_vs_delete(op, against)
        }
        (OperationKind::Delete, OperationKind::Insert) => {
            transform_delete_vs_insert(op, against)
        }
        (OperationKind::Delete, OperationKind::Delete) => {
            transform_delete_vs_delete(op, against)
        }
        // Retain carries a position but has no observable effect; it is
        // never rebased and never shifts another op.
        (OperationKind::Retain, _) | (_, OperationKind::Retain) => op.clone(),
    }
}

/// Insert at `p` against a concurrent Insert at `p'` len `L'`.
fn transform_insert_vs_insert(op: &Operation, against: &Operation) -> Operation {
    let p = op.position;
    let p_prime = against.position;
    let l_prime = against_insert_len(against);

    let shifts = if p_prime < p {
        true
    } else if p_prime > p {
        false
    } else {
        // Tie: break by (site, lamport), smaller stays left. The remote op
        // only pushes ours right if it sorts before ours.
        (against.site, against.lamport) < (op.site, op.lamport)
    };

    let mut result = op.clone();
    if shifts {
        result.position = p.saturating_add(l_prime);
    }
    result
}

/// Insert at `p` against a concurrent Delete at `p'` len `L'`.
fn transform_insert_vs_delete(op: &Operation, against: &Operation) -> Operation {
    let p = op.position;
    let p_prime = against.position;
    let l_prime = against.length.unwrap_or(0);

    let mut result = op.clone();
    if p_prime < p {
        result.position = p.saturating_sub(l_prime.min(p - p_prime));
    }
    result
}

/// Delete at `p` len `L` against a concurrent Insert at `p'` len `L'`.
fn transform_delete_vs_insert(op: &Operation, against: &Operation) -> Operation {
    let p = op.position;
    let l = op.length.unwrap_or(0);
    let p_prime = against.position;
    let l_prime = against_insert_len(against);

    let mut result = op.clone();
    if p_prime <= p {
        result.position = p.saturating_add(l_prime);
    } else if p_prime < p.saturating_add(l) {
        result.length = Some(l.saturating_add(l_prime));
    }
    result
}

/// Delete at `p` len `L` against a concurrent Delete at `p'` len `L'`:
/// reduce `L` by the overlap between `[p, p+L)` and `[p', p'+L')`, and shift
/// `p` left by the portion of the remote delete strictly before `p`.
fn transform_delete_vs_delete(op: &Operation, against: &Operation) -> Operation {
    let p = op.position;
    let l = op.length.unwrap_or(0);
    let p_prime = against.position;
    let l_prime = against.length.unwrap_or(0);

    let self_start = p;
    let self_end = p.saturating_add(l);
    let other_start = p_prime;
    let other_end = p_prime.saturating_add(l_prime);

    let overlap_start = self_start.max(other_start);
    let overlap_end = self_end.min(other_end);
    let overlap = overlap_end.saturating_sub(overlap_start);

    // Portion of the remote delete strictly before our start.
    let shift = other_end.min(p).saturating_sub(other_start);

    let mut result = op.clone();
    result.position = p.saturating_sub(shift);
    result.length = Some(l.saturating_sub(overlap));
    result
}

fn against_insert_len(against: &Operation) -> u32 {
    against
        .content
        .as_ref()
        .map_or(0, |s| s.chars().count() as u32)
}
