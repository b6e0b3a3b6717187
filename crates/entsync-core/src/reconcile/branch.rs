//! Depth-first walk of the discovery tree that cuts it into branches and
//! reconciles each branch against the persisted snapshot.

use crate::errors::SyncResult;
use crate::findings::SyncFinding;
use crate::models::{attributes, is_physical_port_class, is_port_class, Branch, NewObjectNode};
use crate::reconcile::attributes::{build_attributes, diff_attributes, previous_values};
use crate::reconcile::session::{ReconciliationSession, RunContext};
use crate::reconcile::snapshot::{SnapshotNode, StructureSnapshot};
use crate::reconcile::strategies::{evaluate, longest, MatchOutcome};

/// The discovered parent as seen by its children.
#[derive(Clone, Debug)]
struct ParentInfo {
    id: String,
    name: String,
    class_name: String,
}

enum Frame {
    Visit { id: String, parent: ParentInfo },
    Leave { id: String },
}

pub struct BranchReconciler<'r, 'a> {
    ctx: &'r RunContext<'a>,
    snapshot: &'r StructureSnapshot,
}

impl<'r, 'a> BranchReconciler<'r, 'a> {
    pub fn new(ctx: &'r RunContext<'a>, snapshot: &'r StructureSnapshot) -> Self {
        Self { ctx, snapshot }
    }

    /// Walk the whole tree, recording NEW/UPDATE/ERROR findings and filling
    /// the session's port queues.
    pub fn run(&self, session: &mut ReconciliationSession) -> SyncResult<()> {
        let ctx = self.ctx;
        let device = ctx.device_light();
        let root_parent = ParentInfo {
            id: device.id.clone(),
            name: device.name.clone(),
            class_name: device.class_name.clone(),
        };

        let mut builder = Branch::new();
        let mut stack: Vec<Frame> = Vec::new();
        push_children(&mut stack, ctx.tree.children(ctx.tree.root_id()), &root_parent);

        while let Some(frame) = stack.pop() {
            let (id, parent) = match frame {
                Frame::Leave { id } => {
                    // Everything below this node failed to map; close its branch.
                    if builder.last().is_some_and(|n| n.discovered_id == id) {
                        self.flush(&mut builder, session);
                    }
                    continue;
                }
                Frame::Visit { id, parent } => (id, parent),
            };
            let Some(row) = ctx.table.get(&id) else {
                continue;
            };

            let Some(class_name) = ctx.mapper.map_row(row) else {
                session.push(SyncFinding::unmappable_row(&row.class_code, &row.instance_id, &row.name));
                session.stats.rows_errored += 1;
                session.stats.rows_skipped += ctx.tree.descendant_count(&id);
                continue;
            };
            let name = ctx.mapper.display_name(row);
            let mut attrs = build_attributes(ctx, session, row, &class_name, &name)?;
            let children = ctx.tree.children(&id);

            if class_name == ctx.device_class() {
                // The device itself is only ever updated, never renamed.
                attrs.shift_remove(attributes::NAME);
                let changes = diff_attributes(&ctx.device.attributes, &attrs);
                if !changes.is_empty() {
                    let previous = previous_values(&ctx.device.attributes, &changes);
                    session.push(SyncFinding::update(device.clone(), changes, previous));
                }
                session.stats.rows_matched += 1;
                let device_parent = ParentInfo {
                    id: device.id.clone(),
                    name,
                    class_name,
                };
                push_children(&mut stack, children, &device_parent);
                continue;
            }

            let node = NewObjectNode {
                discovered_id: id.clone(),
                discovered_parent_id: parent.id,
                parent_name: parent.name,
                parent_class: parent.class_name,
                class_name: class_name.clone(),
                attributes: attrs,
                anchor_id: None,
            };
            session.consume_by_name(self.snapshot.first_level(), &class_name, &name);
            if node.is_physical_port() {
                session.queue_new_port(node.clone());
            }
            builder.push(node);

            // Ports end a branch even when the agent reports children below them.
            if is_port_class(&class_name) || children.is_empty() {
                self.flush(&mut builder, session);
            }
            if !children.is_empty() {
                stack.push(Frame::Leave { id: id.clone() });
                let this = ParentInfo {
                    id,
                    name,
                    class_name,
                };
                push_children(&mut stack, children, &this);
            }
        }

        self.flush(&mut builder, session);
        Ok(())
    }

    fn flush(&self, builder: &mut Branch, session: &mut ReconciliationSession) {
        let branch = std::mem::take(builder);
        if !branch.is_empty() {
            self.reconcile_branch(branch, session);
        }
    }

    /// Align one completed branch and record the outcome.
    pub fn reconcile_branch(
        &self,
        mut branch: Branch,
        session: &mut ReconciliationSession,
    ) {
        match evaluate(&branch, self.snapshot) {
            MatchOutcome::Present { aligned, surplus } => {
                apply_in_place(&branch, &aligned, session);
                queue_surplus(surplus, session);
            }
            MatchOutcome::Partial(candidates) => {
                let matched = longest(candidates);
                self.complete_partial(branch, matched, session);
            }
            MatchOutcome::Anchored(anchor) => {
                branch[0].anchor_id = Some(anchor);
                emit_new(branch, session);
            }
            MatchOutcome::Unmatched => emit_new(branch, session),
        }
    }

    /// Extend a persisted prefix as far as the snapshot allows. Whatever
    /// remains unmatched is emitted alone, hung under the last matched node
    /// when that node is its parent.
    fn complete_partial(
        &self,
        branch: Branch,
        mut matched: Vec<&'r SnapshotNode>,
        session: &mut ReconciliationSession,
    ) {
        loop {
            if matched.len() >= branch.len() {
                matched.truncate(branch.len());
                apply_in_place(&branch, &matched, session);
                return;
            }
            let split = matched.len();
            match evaluate(&branch[split..], self.snapshot) {
                MatchOutcome::Partial(candidates) => {
                    let extension = longest(candidates);
                    if extension.is_empty() {
                        break;
                    }
                    matched.extend(extension);
                }
                MatchOutcome::Present { aligned, surplus } => {
                    matched.extend(aligned);
                    apply_in_place(&branch, &matched, session);
                    queue_surplus(surplus, session);
                    return;
                }
                outcome => {
                    let mut tail = branch[split..].to_vec();
                    if let MatchOutcome::Anchored(anchor) = outcome {
                        tail[0].anchor_id = Some(anchor);
                    }
                    if let Some(last) = matched.last() {
                        if tail[0].parent_name == last.object.name
                            && tail[0].parent_class == last.object.class_name
                        {
                            tail[0].anchor_id = Some(last.object.id.clone());
                        }
                    }
                    apply_in_place(&branch[..split], &matched, session);
                    emit_new(tail, session);
                    return;
                }
            }
        }
        let split = matched.len();
        apply_in_place(&branch[..split], &matched, session);
        emit_new(branch[split..].to_vec(), session);
    }
}

fn push_children(stack: &mut Vec<Frame>, children: &[String], parent: &ParentInfo) {
    for child in children.iter().rev() {
        stack.push(Frame::Visit {
            id: child.clone(),
            parent: parent.clone(),
        });
    }
}

/// Reconcile discovered nodes with their persisted counterparts.
fn apply_in_place(nodes: &[NewObjectNode], aligned: &[&SnapshotNode], session: &mut ReconciliationSession) {
    for (node, old) in nodes.iter().zip(aligned) {
        session.consume(&old.object.id);
        if node.is_physical_port() {
            session.remove_new_port(&node.discovered_id);
        }
        let changes = diff_attributes(&old.attributes, &node.attributes);
        if !changes.is_empty() {
            let previous = previous_values(&old.attributes, &changes);
            session.push(SyncFinding::update(old.object.clone(), changes, previous));
        }
        session.stats.rows_matched += 1;
    }
}

/// Persisted nodes beyond a shrunk branch. Physical ports are left to the
/// port matcher.
fn queue_surplus(surplus: Vec<&SnapshotNode>, session: &mut ReconciliationSession) {
    for node in surplus {
        if !is_physical_port_class(&node.object.class_name) {
            session.queue_tail(node.clone());
        }
    }
}

fn emit_new(branch: Branch, session: &mut ReconciliationSession) {
    if let Some(head) = branch.first().filter(|head| head.is_physical_port()) {
        if let Some(anchor) = &head.anchor_id {
            session.set_new_port_anchor(&head.discovered_id, anchor);
        }
    }
    session.stats.rows_created += branch.len();
    session.push(SyncFinding::new_branch(branch));
}
