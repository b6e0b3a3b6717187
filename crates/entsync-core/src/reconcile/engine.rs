//! Top-level reconciliation entry point.
//!
//! A run reads the discovery table of one device, compares it with what the
//! inventory holds below that device, and returns the proposed changes. The
//! only side effect is the creation of missing list-type catalog entries.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use crate::collaborators::{CatalogRepository, InventoryGraph, MetadataRepository};
use crate::config::EngineConfig;
use crate::discovery::class_mapper::ClassMapper;
use crate::discovery::table::DiscoveryTable;
use crate::discovery::tree::DiscoveryTree;
use crate::errors::SyncResult;
use crate::findings::{findings_to_json, FindingKind, SyncFinding};
use crate::models::ObjectLight;
use crate::reconcile::branch::BranchReconciler;
use crate::reconcile::deletion::detect_deletions;
use crate::reconcile::hierarchy::audit_hierarchy;
use crate::reconcile::ports::migrate_ports;
use crate::reconcile::session::{ReconciliationSession, RunContext, RunStats};
use crate::reconcile::snapshot::StructureSnapshot;

/// Outcome of one run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub device: ObjectLight,
    /// SHA-256 of the discovery table the run consumed.
    pub table_fingerprint: String,
    pub findings: Vec<SyncFinding>,
    pub stats: RunStats,
}

impl ReconciliationReport {
    pub fn count(&self, kind: FindingKind) -> usize {
        self.findings.iter().filter(|f| f.kind == kind).count()
    }

    pub fn findings_json(&self) -> SyncResult<String> {
        findings_to_json(&self.findings)
    }

    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct ReconciliationEngine<'a> {
    metadata: &'a dyn MetadataRepository,
    graph: &'a dyn InventoryGraph,
    catalog: &'a dyn CatalogRepository,
    config: EngineConfig,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(
        metadata: &'a dyn MetadataRepository,
        graph: &'a dyn InventoryGraph,
        catalog: &'a dyn CatalogRepository,
    ) -> Self {
        Self {
            metadata,
            graph,
            catalog,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reconcile `device` against its discovery table.
    ///
    /// Phases run in a fixed order over one session: hierarchy audit,
    /// snapshot capture, branch walk, port migration, deletion detection.
    /// Fails when the table has no chassis row or a collaborator fails.
    pub fn reconcile(&self, device: &ObjectLight, table: &DiscoveryTable) -> SyncResult<ReconciliationReport> {
        let fingerprint = table.fingerprint();
        let span = info_span!("reconcile", device = %device.id, fingerprint = %fingerprint);
        let _guard = span.enter();

        let tree = DiscoveryTree::build(table, &self.config)?;
        let device_object = self.graph.object(&device.class_name, &device.id)?;
        let ctx = RunContext {
            device: &device_object,
            table,
            tree: &tree,
            mapper: ClassMapper::new(&device_object.class_name, &self.config),
            metadata: self.metadata,
            graph: self.graph,
            catalog: self.catalog,
            config: &self.config,
        };

        let mut session = ReconciliationSession::new();
        session.stats.rows_in_tree = tree.node_count();

        if let Some(finding) = audit_hierarchy(table, &tree, &ctx.mapper, self.metadata)? {
            session.push(finding);
        }
        debug!("Hierarchy audit done");

        let snapshot = StructureSnapshot::capture(
            device,
            self.metadata,
            self.graph,
            &self.config.logical_port_class,
        )?;

        BranchReconciler::new(&ctx, &snapshot).run(&mut session)?;
        debug!(
            "Branch walk done: {} created, {} matched, {} errored, {} skipped",
            session.stats.rows_created,
            session.stats.rows_matched,
            session.stats.rows_errored,
            session.stats.rows_skipped
        );

        migrate_ports(&snapshot, &mut session);
        detect_deletions(self.graph, &snapshot, &mut session)?;

        info!(
            "Reconciled {} [{}]: {} new, {} update, {} move, {} delete, {} error",
            device.name,
            device.class_name,
            session.count(FindingKind::New),
            session.count(FindingKind::Update),
            session.count(FindingKind::Move),
            session.count(FindingKind::Delete),
            session.count(FindingKind::Error)
        );

        let stats = session.stats.clone();
        Ok(ReconciliationReport {
            device: device.clone(),
            table_fingerprint: fingerprint,
            findings: session.into_findings(),
            stats,
        })
    }
}
