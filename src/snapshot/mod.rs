//! The fixed-phase snapshot orchestrator.
//!
//! A snapshot runs as a fixed sequence of scan phases, one per object kind,
//! ordered so that every phase can rely on the objects earlier phases
//! produced: relations exist before their columns, primary keys before the
//! column phase flags key columns, constraints before the index phase
//! reconciles backing indexes. The orchestrator owns phase order and
//! recovery policy; what happens inside a phase is the selected generator's
//! business.

pub mod context;

pub use context::{ObjectFilter, SnapshotContext, SnapshotOptions};

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Result, SnapshotError};
use crate::meta::MetadataProvider;
use crate::model::Snapshot;
use crate::registry::{GeneratorRegistry, ObjectKind};

/// Scan phases in execution order.
///
/// Tables and views are one phase; the relation generator handles both.
const PHASES: [ObjectKind; 7] = [
    ObjectKind::Table,
    ObjectKind::PrimaryKey,
    ObjectKind::Column,
    ObjectKind::ForeignKey,
    ObjectKind::UniqueConstraint,
    ObjectKind::Index,
    ObjectKind::Sequence,
];

/// Builds snapshots by running the scan phases against a provider.
///
/// Holds only the registry; all per-invocation state lives in the
/// [`SnapshotContext`], so one builder can serve concurrent snapshots.
pub struct SnapshotBuilder {
    registry: Arc<GeneratorRegistry>,
}

impl SnapshotBuilder {
    /// A builder with the generic generators and all built-in vendor
    /// overrides.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(GeneratorRegistry::with_builtins()))
    }

    /// A builder over a caller-assembled registry.
    pub fn with_registry(registry: Arc<GeneratorRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<GeneratorRegistry> {
        &self.registry
    }

    /// Take a snapshot of the schemas named in `options`.
    ///
    /// Connectivity failures abort; everything else is recovered in place
    /// and surfaced through [`Snapshot::warnings`].
    pub async fn snapshot(
        &self,
        provider: Arc<dyn MetadataProvider>,
        options: &SnapshotOptions,
    ) -> Result<Snapshot> {
        if options.schemas.is_empty() {
            return Err(SnapshotError::Config(
                "snapshot requires at least one schema".to_string(),
            ));
        }

        let vendor = provider.vendor();
        info!(%vendor, schemas = ?options.schemas, "starting schema snapshot");

        let mut ctx = SnapshotContext::new(Arc::clone(&self.registry), provider, options);
        for kind in PHASES {
            let wanted = match kind {
                // The relation phase covers both tables and views.
                ObjectKind::Table => options.filter.tables || options.filter.views,
                other => options.filter.includes(other),
            };
            if !wanted {
                debug!(phase = kind.phase_name(), "phase excluded by filter");
                continue;
            }
            if kind == ObjectKind::Sequence && !vendor.supports_sequences() {
                debug!(%vendor, "vendor has no sequences, skipping phase");
                continue;
            }
            let generator = self.registry.require_generator(kind, &vendor)?;
            debug!(phase = kind.phase_name(), "running scan phase");
            generator.snapshot(&mut ctx).await?;
        }

        let mut snapshot = ctx.snapshot;
        snapshot.finalize_ordering();
        info!(
            tables = snapshot.tables.len(),
            views = snapshot.views.len(),
            foreign_keys = snapshot.foreign_keys.len(),
            warnings = snapshot.warnings.len(),
            "snapshot complete"
        );
        Ok(snapshot)
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}
