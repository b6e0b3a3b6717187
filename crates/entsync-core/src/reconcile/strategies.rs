//! Ranked branch-matching strategies.
//!
//! Each strategy is a pure function of a discovered branch and the persisted
//! snapshot. [`evaluate`] tries them in declaration order and the first one
//! that returns an outcome wins.

use tracing::debug;

use crate::models::NewObjectNode;
use crate::reconcile::snapshot::{SnapshotNode, StructureSnapshot};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchOutcome<'s> {
    /// The whole branch already exists. `aligned[i]` pairs with the i-th
    /// discovered node; `surplus` is what the persisted branch has beyond it.
    Present {
        aligned: Vec<&'s SnapshotNode>,
        surplus: Vec<&'s SnapshotNode>,
    },
    /// Persisted prefixes of the branch, one per candidate branch.
    Partial(Vec<Vec<&'s SnapshotNode>>),
    /// Nothing matched, but the branch head belongs under this object.
    Anchored(String),
    Unmatched,
}

pub type Strategy = for<'s> fn(&[NewObjectNode], &'s StructureSnapshot) -> Option<MatchOutcome<'s>>;

pub const STRATEGIES: &[(&str, Strategy)] = &[
    ("exact", exact),
    ("forward_partial", forward_partial),
    ("tail_partial", tail_partial),
    ("device_anchor", device_anchor),
    ("ancestor_anchor", ancestor_anchor),
];

pub fn evaluate<'s>(branch: &[NewObjectNode], snapshot: &'s StructureSnapshot) -> MatchOutcome<'s> {
    let Some(head) = branch.first() else {
        return MatchOutcome::Unmatched;
    };
    for (name, strategy) in STRATEGIES {
        if let Some(outcome) = strategy(branch, snapshot) {
            debug!(
                "Branch of {} node(s) at {} [{}] resolved by {}",
                branch.len(),
                head.name(),
                head.class_name,
                name
            );
            return outcome;
        }
    }
    MatchOutcome::Unmatched
}

/// First candidate of maximal length.
pub fn longest<'s>(candidates: Vec<Vec<&'s SnapshotNode>>) -> Vec<&'s SnapshotNode> {
    let mut best = Vec::new();
    for candidate in candidates {
        if candidate.len() > best.len() {
            best = candidate;
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Node comparison
// ---------------------------------------------------------------------------

/// Same name, class and parent. The device is named differently in the
/// discovery data and the inventory, so a device parent on both sides
/// compares by class alone.
pub fn node_matches(new: &NewObjectNode, old: &SnapshotNode, device_class: &str) -> bool {
    if new.class_name == device_class {
        return false;
    }
    if new.name() != old.object.name || new.class_name != old.object.class_name {
        return false;
    }
    if new.parent_class != old.parent.class_name {
        return false;
    }
    new.parent_class == device_class || new.parent_name == old.parent.name
}

fn forward_prefix<'s>(
    branch: &[NewObjectNode],
    old: &'s [SnapshotNode],
    device_class: &str,
) -> Vec<&'s SnapshotNode> {
    branch
        .iter()
        .zip(old)
        .take_while(|(new, old)| node_matches(new, old, device_class))
        .map(|(_, old)| old)
        .collect()
}

/// Matches counted while stepping down from both ends together.
fn backward_hits(branch: &[NewObjectNode], old: &[SnapshotNode], device_class: &str) -> usize {
    branch
        .iter()
        .rev()
        .zip(old.iter().rev())
        .filter(|(new, old)| node_matches(new, old, device_class))
        .count()
}

/// Some persisted branch shares no forward prefix with the discovered one
/// but matches it from the end.
fn has_backward_hits(branch: &[NewObjectNode], snapshot: &StructureSnapshot) -> bool {
    let device_class = &snapshot.device().class_name;
    snapshot.branches().values().any(|old| {
        forward_prefix(branch, old, device_class).is_empty()
            && backward_hits(branch, old, device_class) > 0
    })
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Full positional match, forward first and then, for branches sharing no
/// prefix, from the end (agents do not report siblings in a stable order).
fn exact<'s>(branch: &[NewObjectNode], snapshot: &'s StructureSnapshot) -> Option<MatchOutcome<'s>> {
    let device_class = &snapshot.device().class_name;
    for old in snapshot.branches().values() {
        let prefix = forward_prefix(branch, old, device_class);
        if prefix.len() == branch.len() {
            return Some(MatchOutcome::Present {
                aligned: prefix,
                surplus: old[branch.len()..].iter().collect(),
            });
        }
        if prefix.is_empty()
            && old.len() >= branch.len()
            && backward_hits(branch, old, device_class) == branch.len()
        {
            return Some(MatchOutcome::Present {
                aligned: old[old.len() - branch.len()..].iter().collect(),
                surplus: Vec::new(),
            });
        }
    }
    None
}

fn forward_partial<'s>(
    branch: &[NewObjectNode],
    snapshot: &'s StructureSnapshot,
) -> Option<MatchOutcome<'s>> {
    let device_class = &snapshot.device().class_name;
    let candidates: Vec<Vec<&SnapshotNode>> = snapshot
        .branches()
        .values()
        .map(|old| forward_prefix(branch, old, device_class))
        .filter(|prefix| !prefix.is_empty() && prefix.len() < branch.len())
        .collect();
    (!candidates.is_empty()).then_some(MatchOutcome::Partial(candidates))
}

/// The branch head continues a persisted branch whose last node is the head.
fn tail_partial<'s>(branch: &[NewObjectNode], snapshot: &'s StructureSnapshot) -> Option<MatchOutcome<'s>> {
    let device_class = &snapshot.device().class_name;
    let head = branch.first()?;
    snapshot
        .branches()
        .values()
        .filter_map(|old| old.last())
        .find(|last| node_matches(head, last, device_class))
        .map(|last| MatchOutcome::Partial(vec![vec![last]]))
}

fn device_anchor<'s>(branch: &[NewObjectNode], snapshot: &'s StructureSnapshot) -> Option<MatchOutcome<'s>> {
    let head = branch.first()?;
    if has_backward_hits(branch, snapshot) || head.parent_class != snapshot.device().class_name {
        return None;
    }
    Some(MatchOutcome::Anchored(snapshot.device().id.clone()))
}

/// Least precise fallback: find the head's stated parent among the
/// next-to-last nodes of persisted branches, then among their second nodes.
///
/// A next-to-last hit takes precedence; a second-node hit is only used when
/// no next-to-last node names the parent.
fn ancestor_anchor<'s>(
    branch: &[NewObjectNode],
    snapshot: &'s StructureSnapshot,
) -> Option<MatchOutcome<'s>> {
    let head = branch.first()?;
    if has_backward_hits(branch, snapshot) {
        return None;
    }
    let is_parent = |node: &SnapshotNode| {
        node.object.name == head.parent_name && node.object.class_name == head.parent_class
    };
    let branches = snapshot.branches();
    let next_to_last = branches
        .values()
        .filter(|old| old.len() > 2)
        .map(|old| &old[old.len() - 2])
        .find(|&node| is_parent(node));
    let second = || {
        branches
            .values()
            .filter(|old| old.len() > 1)
            .map(|old| &old[1])
            .find(|&node| is_parent(node))
    };
    next_to_last
        .or_else(second)
        .map(|node| MatchOutcome::Anchored(node.object.id.clone()))
}
