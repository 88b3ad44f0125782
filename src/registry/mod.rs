//! The dialect adapter registry.
//!
//! Extraction behavior is composed from small strategy objects: one
//! [`SnapshotGenerator`] per object kind drives a scan phase, and
//! fine-grained concerns ([`TypeTranslator`], [`DefaultValueParser`],
//! [`AutoIncrementDetector`]) cover the places vendors disagree the most.
//! The registry holds one generic implementation of each plus any number of
//! vendor overrides; selection picks the highest priority whose
//! applicability matches the active vendor. An override fully replaces the
//! generic handler for its concern — it is selected instead of it, never
//! chained after it.
//!
//! Supporting a new vendor means adding registrations, not branching inside
//! the generic implementations.

pub mod generic;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SnapshotError};
use crate::meta::ColumnRow;
use crate::model::{AutoIncrementInfo, DataType, DefaultValue};
use crate::snapshot::SnapshotContext;
use crate::vendor::VendorId;

/// The kinds of schema objects a snapshot can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Table,
    View,
    Column,
    PrimaryKey,
    ForeignKey,
    UniqueConstraint,
    Index,
    Sequence,
}

impl ObjectKind {
    /// Phase name used in logs and warnings.
    pub fn phase_name(&self) -> &'static str {
        match self {
            ObjectKind::Table => "tables",
            ObjectKind::View => "views",
            ObjectKind::Column => "columns",
            ObjectKind::PrimaryKey => "primary_keys",
            ObjectKind::ForeignKey => "foreign_keys",
            ObjectKind::UniqueConstraint => "unique_constraints",
            ObjectKind::Index => "indexes",
            ObjectKind::Sequence => "sequences",
        }
    }
}

/// Selection score for a registration against a vendor.
///
/// `NONE` means "does not apply"; ties go to the latest registration so
/// callers can shadow built-ins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(pub i32);

impl Priority {
    /// Not applicable to this vendor.
    pub const NONE: Priority = Priority(-1);
    /// The vendor-agnostic generic implementation.
    pub const DEFAULT: Priority = Priority(1);
    /// A vendor-specific override.
    pub const VENDOR: Priority = Priority(5);

    pub fn applies(&self) -> bool {
        self.0 >= 0
    }
}

/// Drives one scan phase for one object kind.
#[async_trait]
pub trait SnapshotGenerator: Send + Sync {
    /// The object kind this generator produces.
    fn kind(&self) -> ObjectKind;

    /// Applicability score for the given vendor.
    fn priority(&self, vendor: &VendorId) -> Priority;

    /// Run the phase, reading metadata through the context's cache and
    /// appending entities to the context's snapshot.
    async fn snapshot(&self, ctx: &mut SnapshotContext<'_>) -> Result<()>;
}

/// Translates a raw column type into the canonical descriptor.
#[async_trait]
pub trait TypeTranslator: Send + Sync {
    fn priority(&self, vendor: &VendorId) -> Priority;

    /// Translate one column's raw type. Receives the context for vendors
    /// that need secondary queries (enum definitions and the like).
    async fn translate(
        &self,
        schema: &str,
        row: &ColumnRow,
        ctx: &mut SnapshotContext<'_>,
    ) -> Result<DataType>;
}

/// Extracts a column's default value from raw metadata.
pub trait DefaultValueParser: Send + Sync {
    fn priority(&self, vendor: &VendorId) -> Priority;

    /// Classify the raw default text. `None` means "no user default" —
    /// including vendor encodings that must be suppressed (identity
    /// sequence references and the like).
    fn parse(&self, row: &ColumnRow, data_type: &DataType) -> Option<DefaultValue>;
}

/// Detects identity/serial columns.
#[async_trait]
pub trait AutoIncrementDetector: Send + Sync {
    fn priority(&self, vendor: &VendorId) -> Priority;

    /// Detect auto-increment attributes, possibly issuing a probe query
    /// through the context's provider.
    async fn detect(
        &self,
        schema: &str,
        row: &ColumnRow,
        ctx: &mut SnapshotContext<'_>,
    ) -> Result<Option<AutoIncrementInfo>>;
}

/// Registry of snapshot generators and extraction concerns.
///
/// Explicitly constructed and injected into the snapshot builder — no
/// global state, deterministic registration order, easy to extend with
/// custom vendors in tests or downstream crates.
#[derive(Default)]
pub struct GeneratorRegistry {
    generators: HashMap<ObjectKind, Vec<Arc<dyn SnapshotGenerator>>>,
    type_translators: Vec<Arc<dyn TypeTranslator>>,
    default_parsers: Vec<Arc<dyn DefaultValueParser>>,
    auto_increment_detectors: Vec<Arc<dyn AutoIncrementDetector>>,
}

impl GeneratorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the generic generators and all built-in
    /// vendor overrides registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        generic::register(&mut registry);
        crate::drivers::register_builtins(&mut registry);
        registry
    }

    /// Register a generator for its object kind.
    pub fn register_generator(&mut self, generator: impl SnapshotGenerator + 'static) {
        self.register_generator_arc(Arc::new(generator));
    }

    pub fn register_generator_arc(&mut self, generator: Arc<dyn SnapshotGenerator>) {
        self.generators
            .entry(generator.kind())
            .or_default()
            .push(generator);
    }

    /// Register a type translator.
    pub fn register_type_translator(&mut self, translator: impl TypeTranslator + 'static) {
        self.type_translators.push(Arc::new(translator));
    }

    /// Register a default-value parser.
    pub fn register_default_parser(&mut self, parser: impl DefaultValueParser + 'static) {
        self.default_parsers.push(Arc::new(parser));
    }

    /// Register an auto-increment detector.
    pub fn register_auto_increment_detector(
        &mut self,
        detector: impl AutoIncrementDetector + 'static,
    ) {
        self.auto_increment_detectors.push(Arc::new(detector));
    }

    /// Select the generator for an object kind and vendor.
    ///
    /// Highest priority wins; among equals, the latest registration.
    pub fn generator(
        &self,
        kind: ObjectKind,
        vendor: &VendorId,
    ) -> Option<Arc<dyn SnapshotGenerator>> {
        let candidates = self.generators.get(&kind)?;
        select(candidates.iter(), |g| g.priority(vendor))
    }

    /// Select the generator, erroring when none applies.
    pub fn require_generator(
        &self,
        kind: ObjectKind,
        vendor: &VendorId,
    ) -> Result<Arc<dyn SnapshotGenerator>> {
        self.generator(kind, vendor).ok_or_else(|| {
            SnapshotError::UnsupportedVendor(format!(
                "no {} generator applies to {}",
                kind.phase_name(),
                vendor
            ))
        })
    }

    /// Select the type translator for a vendor.
    pub fn type_translator(&self, vendor: &VendorId) -> Option<Arc<dyn TypeTranslator>> {
        select(self.type_translators.iter(), |t| t.priority(vendor))
    }

    pub fn require_type_translator(&self, vendor: &VendorId) -> Result<Arc<dyn TypeTranslator>> {
        self.type_translator(vendor).ok_or_else(|| {
            SnapshotError::UnsupportedVendor(format!("no type translator applies to {}", vendor))
        })
    }

    /// Select the default-value parser for a vendor.
    pub fn default_parser(&self, vendor: &VendorId) -> Option<Arc<dyn DefaultValueParser>> {
        select(self.default_parsers.iter(), |p| p.priority(vendor))
    }

    pub fn require_default_parser(&self, vendor: &VendorId) -> Result<Arc<dyn DefaultValueParser>> {
        self.default_parser(vendor).ok_or_else(|| {
            SnapshotError::UnsupportedVendor(format!(
                "no default-value parser applies to {}",
                vendor
            ))
        })
    }

    /// Select the auto-increment detector for a vendor.
    pub fn auto_increment_detector(
        &self,
        vendor: &VendorId,
    ) -> Option<Arc<dyn AutoIncrementDetector>> {
        select(self.auto_increment_detectors.iter(), |d| d.priority(vendor))
    }

    pub fn require_auto_increment_detector(
        &self,
        vendor: &VendorId,
    ) -> Result<Arc<dyn AutoIncrementDetector>> {
        self.auto_increment_detector(vendor).ok_or_else(|| {
            SnapshotError::UnsupportedVendor(format!(
                "no auto-increment detector applies to {}",
                vendor
            ))
        })
    }

    /// Kinds that have at least one registration.
    pub fn registered_kinds(&self) -> Vec<ObjectKind> {
        self.generators.keys().copied().collect()
    }
}

fn select<'a, T: ?Sized, I>(
    candidates: I,
    priority_of: impl Fn(&Arc<T>) -> Priority,
) -> Option<Arc<T>>
where
    I: Iterator<Item = &'a Arc<T>>,
    T: 'a,
{
    let mut best: Option<(&Arc<T>, Priority)> = None;
    for candidate in candidates {
        let priority = priority_of(candidate);
        if !priority.applies() {
            continue;
        }
        match best {
            // Later registrations shadow earlier ones at equal priority.
            Some((_, best_priority)) if priority < best_priority => {}
            _ => best = Some((candidate, priority)),
        }
    }
    best.map(|(candidate, _)| Arc::clone(candidate))
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field(
                "generators",
                &self
                    .generators
                    .iter()
                    .map(|(kind, v)| (kind.phase_name(), v.len()))
                    .collect::<Vec<_>>(),
            )
            .field("type_translators", &self.type_translators.len())
            .field("default_parsers", &self.default_parsers.len())
            .field(
                "auto_increment_detectors",
                &self.auto_increment_detectors.len(),
            )
            .finish()
    }
}
