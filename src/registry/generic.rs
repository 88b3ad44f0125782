//! Vendor-agnostic generators and extraction concerns.
//!
//! These run for every vendor at [`Priority::DEFAULT`] and express the
//! common shape of relational metadata; the modules under `crate::drivers`
//! override them only where a vendor genuinely deviates.

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::meta::{ColumnRow, ForeignKeyRow, IndexRow, UniqueConstraintRow};
use crate::model::{
    AssociatedWith, AutoIncrementInfo, Column, DataType, DefaultValue, ForeignKey, Index,
    NameMatcher, PrimaryKey, ReferentialAction, RelationKind, RelationRef, Sequence, Table,
    UniqueConstraint, View, VIEW_DEFINITION_UNAVAILABLE,
};
use crate::normalize;
use crate::snapshot::SnapshotContext;
use crate::vendor::VendorId;

use super::{
    AutoIncrementDetector, DefaultValueParser, GeneratorRegistry, ObjectKind, Priority,
    SnapshotGenerator, TypeTranslator,
};

/// Register every generic generator and concern.
pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(RelationGenerator);
    registry.register_generator(PrimaryKeyGenerator);
    registry.register_generator(ColumnGenerator);
    registry.register_generator(ForeignKeyGenerator);
    registry.register_generator(UniqueConstraintGenerator);
    registry.register_generator(IndexGenerator);
    registry.register_generator(SequenceGenerator);
    registry.register_type_translator(GenericTypeTranslator);
    registry.register_default_parser(GenericDefaultParser);
    registry.register_auto_increment_detector(GenericAutoIncrementDetector);
}

/// Map a standard FK rule code to its action. `None` input (vendor reported
/// no rule) means RESTRICT; an unrecognized code returns `None` so the
/// caller can warn.
pub fn referential_action_for_code(code: Option<i32>) -> Option<ReferentialAction> {
    match code {
        None => Some(ReferentialAction::Restrict),
        Some(0) => Some(ReferentialAction::Cascade),
        Some(1) => Some(ReferentialAction::Restrict),
        Some(2) => Some(ReferentialAction::SetNull),
        Some(3) => Some(ReferentialAction::NoAction),
        Some(4) => Some(ReferentialAction::SetDefault),
        Some(_) => None,
    }
}

/// Map a legacy sp_fkeys ordinal to its action. Old SQL Server drivers
/// report this scheme instead of the standard one.
pub fn referential_action_for_sp_fkeys_code(code: Option<i32>) -> Option<ReferentialAction> {
    match code {
        None => Some(ReferentialAction::Restrict),
        Some(0) => Some(ReferentialAction::Cascade),
        Some(1) => Some(ReferentialAction::NoAction),
        Some(2) => Some(ReferentialAction::SetNull),
        Some(3) => Some(ReferentialAction::SetDefault),
        Some(_) => None,
    }
}

fn column_lists_equal(a: &[String], b: &[String], matcher: NameMatcher) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| matcher.eq(x, y))
}

fn table_refs(ctx: &SnapshotContext<'_>) -> Vec<RelationRef> {
    ctx.snapshot.tables.iter().map(Table::relation_ref).collect()
}

/// Phase 1: enumerate tables and views.
///
/// Applies scope exclusions (system relations, the change-tracking ledger)
/// and fetches view definitions, substituting the sentinel when the
/// database withholds the text.
pub struct RelationGenerator;

#[async_trait]
impl SnapshotGenerator for RelationGenerator {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Table
    }

    fn priority(&self, _vendor: &VendorId) -> Priority {
        Priority::DEFAULT
    }

    async fn snapshot(&self, ctx: &mut SnapshotContext<'_>) -> Result<()> {
        let catalog = ctx.options.catalog.clone();
        let include_tables = ctx.options.filter.tables;
        let include_views = ctx.options.filter.views;

        for schema in ctx.options.schemas.clone() {
            let rows = ctx.cache.relations(catalog.as_deref(), &schema, None).await?;
            for row in rows {
                if ctx.vendor.is_system_relation(&row.schema, &row.name) {
                    debug!(schema = %row.schema, name = %row.name, "skipping system relation");
                    continue;
                }
                if ctx.is_excluded_table(&row.name) {
                    debug!(name = %row.name, "skipping excluded table");
                    continue;
                }
                match row.kind {
                    RelationKind::Table if include_tables => {
                        let mut table = Table::new(row.schema, row.name);
                        table.remarks = row.remarks;
                        table.tablespace = row.tablespace;
                        ctx.snapshot.tables.push(table);
                    }
                    RelationKind::View if include_views => {
                        let mut view = View::new(row.schema.clone(), row.name.clone());
                        view.remarks = row.remarks;
                        view.definition = match ctx
                            .provider()
                            .view_definition(catalog.as_deref(), &row.schema, &row.name)
                            .await
                        {
                            Ok(text) => text,
                            Err(err) if !err.is_fatal() => {
                                ctx.warn(
                                    ObjectKind::View,
                                    format!("{}.{}", row.schema, row.name),
                                    format!("definition unavailable: {}", err),
                                );
                                VIEW_DEFINITION_UNAVAILABLE.to_string()
                            }
                            Err(err) => return Err(err),
                        };
                        ctx.snapshot.views.push(view);
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

/// Phase 2: assemble primary keys from per-column key rows.
pub struct PrimaryKeyGenerator;

#[async_trait]
impl SnapshotGenerator for PrimaryKeyGenerator {
    fn kind(&self) -> ObjectKind {
        ObjectKind::PrimaryKey
    }

    fn priority(&self, _vendor: &VendorId) -> Priority {
        Priority::DEFAULT
    }

    async fn snapshot(&self, ctx: &mut SnapshotContext<'_>) -> Result<()> {
        let catalog = ctx.options.catalog.clone();
        for table in table_refs(ctx) {
            let mut rows = ctx
                .cache
                .primary_keys(catalog.as_deref(), &table.schema, Some(&table.name))
                .await?;
            if rows.is_empty() {
                continue;
            }
            rows.sort_by_key(|r| r.key_seq);
            let name = rows[0]
                .pk_name
                .clone()
                .unwrap_or_else(|| format!("pk_{}", table.name));
            let mut pk = PrimaryKey::new(table.clone(), name);
            pk.tablespace = rows[0].tablespace.clone();
            pk.columns = rows.into_iter().map(|r| r.column).collect();
            ctx.snapshot.primary_keys.push(pk);
        }
        Ok(())
    }
}

/// Phase 3: populate columns on every table and view.
///
/// Delegates type translation, default parsing, and auto-increment
/// detection to the registry's per-vendor concerns, repairs ordinal gaps
/// left by dropped columns, and flags primary key membership.
pub struct ColumnGenerator;

#[async_trait]
impl SnapshotGenerator for ColumnGenerator {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Column
    }

    fn priority(&self, _vendor: &VendorId) -> Priority {
        Priority::DEFAULT
    }

    async fn snapshot(&self, ctx: &mut SnapshotContext<'_>) -> Result<()> {
        let catalog = ctx.options.catalog.clone();
        let matcher = ctx.matcher();
        let translator = ctx.registry.require_type_translator(&ctx.vendor)?;
        let parser = ctx.registry.require_default_parser(&ctx.vendor)?;
        let detector = ctx.registry.require_auto_increment_detector(&ctx.vendor)?;

        let mut relations: Vec<(RelationRef, RelationKind)> = ctx
            .snapshot
            .tables
            .iter()
            .map(|t| (t.relation_ref(), RelationKind::Table))
            .collect();
        relations.extend(
            ctx.snapshot
                .views
                .iter()
                .map(|v| (v.relation_ref(), RelationKind::View)),
        );

        for (relation, kind) in relations {
            let mut rows = ctx
                .cache
                .columns(catalog.as_deref(), &relation.schema, Some(&relation.name))
                .await?;
            // Reported ordinals may have gaps (dropped columns); keep the
            // reported order but renumber densely from 1.
            rows.sort_by_key(|r| r.ordinal);

            let pk_columns: Vec<String> = ctx
                .snapshot
                .find_primary_key(&relation)
                .map(|pk| pk.columns.clone())
                .unwrap_or_default();

            let mut columns = Vec::with_capacity(rows.len());
            for (position, row) in rows.iter().enumerate() {
                let data_type = translator.translate(&relation.schema, row, ctx).await?;
                let default_value = parser.parse(row, &data_type);
                let auto_increment = match detector.detect(&relation.schema, row, ctx).await {
                    Ok(info) => info,
                    Err(err) if !err.is_fatal() => {
                        ctx.warn(
                            ObjectKind::Column,
                            format!("{}.{}", relation, row.name),
                            format!("auto-increment detection failed: {}", err),
                        );
                        None
                    }
                    Err(err) => return Err(err),
                };
                columns.push(Column {
                    name: row.name.clone(),
                    data_type,
                    nullable: row.nullable,
                    default_value,
                    remarks: row.remarks.clone(),
                    auto_increment,
                    is_primary_key: pk_columns.iter().any(|c| matcher.eq(c, &row.name)),
                    ordinal: (position + 1) as u32,
                });
            }

            match kind {
                RelationKind::Table => {
                    if let Some(table) = ctx.snapshot.tables.iter_mut().find(|t| {
                        matcher.eq(&t.schema, &relation.schema) && matcher.eq(&t.name, &relation.name)
                    }) {
                        table.columns = columns;
                    }
                }
                RelationKind::View => {
                    if let Some(view) = ctx.snapshot.views.iter_mut().find(|v| {
                        matcher.eq(&v.schema, &relation.schema) && matcher.eq(&v.name, &relation.name)
                    }) {
                        view.columns = columns;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Group per-column constraint rows by constraint name, preserving
/// first-seen order.
fn group_by_name<R>(
    rows: Vec<R>,
    matcher: NameMatcher,
    name_of: impl Fn(&R) -> &str,
) -> Vec<(String, Vec<R>)> {
    let mut groups: Vec<(String, Vec<R>)> = Vec::new();
    for row in rows {
        let name = name_of(&row).to_string();
        match groups.iter_mut().find(|(n, _)| matcher.eq(n, &name)) {
            Some((_, members)) => members.push(row),
            None => groups.push((name, vec![row])),
        }
    }
    groups
}

/// Shared FK assembly, parameterized over the vendor's rule-code scheme.
///
/// `map_rule` returns `None` for codes it does not recognize; those are
/// recorded as warnings and treated as NO ACTION.
pub async fn scan_foreign_keys(
    ctx: &mut SnapshotContext<'_>,
    map_rule: fn(Option<i32>) -> Option<ReferentialAction>,
) -> Result<()> {
    let catalog = ctx.options.catalog.clone();
    let matcher = ctx.matcher();

    for table in table_refs(ctx) {
        let rows = ctx
            .cache
            .foreign_keys(catalog.as_deref(), &table.schema, Some(&table.name))
            .await?;
        for (name, mut members) in group_by_name(rows, matcher, |r: &ForeignKeyRow| &r.name) {
            members.sort_by_key(|r| r.key_seq);
            let first = &members[0];

            let referenced_schema = first
                .referenced_schema
                .clone()
                .unwrap_or_else(|| table.schema.clone());
            let referenced = RelationRef::new(referenced_schema, first.referenced_table.clone());

            let resolved = ctx
                .snapshot
                .find_table(&referenced.schema, &referenced.name)
                .is_some();
            if !resolved {
                // Referenced table is out of scope: register a stub so the
                // reference still resolves to an object.
                let already_stubbed = ctx.snapshot.stub_tables.iter().any(|t| {
                    matcher.eq(&t.schema, &referenced.schema) && matcher.eq(&t.name, &referenced.name)
                });
                if !already_stubbed {
                    debug!(target = %referenced, "creating stub for out-of-scope FK target");
                    ctx.snapshot
                        .stub_tables
                        .push(Table::stub(referenced.schema.clone(), referenced.name.clone()));
                }
            }

            let update_code = first.update_rule;
            let delete_code = first.delete_rule;
            let deferrable = first.deferrable;
            let initially_deferred = first.initially_deferred;

            let update_rule = match map_rule(update_code) {
                Some(rule) => rule,
                None => {
                    ctx.warn(
                        ObjectKind::ForeignKey,
                        format!("{}.{}", table, name),
                        format!("unrecognized update rule code {:?}, using NO ACTION", update_code),
                    );
                    ReferentialAction::NoAction
                }
            };
            let delete_rule = match map_rule(delete_code) {
                Some(rule) => rule,
                None => {
                    ctx.warn(
                        ObjectKind::ForeignKey,
                        format!("{}.{}", table, name),
                        format!("unrecognized delete rule code {:?}, using NO ACTION", delete_code),
                    );
                    ReferentialAction::NoAction
                }
            };

            ctx.snapshot.foreign_keys.push(ForeignKey {
                name,
                table: table.clone(),
                columns: members.iter().map(|r| r.column.clone()).collect(),
                referenced_table: referenced,
                referenced_columns: members
                    .iter()
                    .map(|r| r.referenced_column.clone())
                    .collect(),
                update_rule,
                delete_rule,
                deferrable,
                initially_deferred,
                resolved,
            });
        }
    }
    Ok(())
}

/// Phase 4: assemble foreign keys, creating stubs for out-of-scope targets.
pub struct ForeignKeyGenerator;

#[async_trait]
impl SnapshotGenerator for ForeignKeyGenerator {
    fn kind(&self) -> ObjectKind {
        ObjectKind::ForeignKey
    }

    fn priority(&self, _vendor: &VendorId) -> Priority {
        Priority::DEFAULT
    }

    async fn snapshot(&self, ctx: &mut SnapshotContext<'_>) -> Result<()> {
        scan_foreign_keys(ctx, referential_action_for_code).await
    }
}

/// Phase 5: assemble unique constraints.
pub struct UniqueConstraintGenerator;

#[async_trait]
impl SnapshotGenerator for UniqueConstraintGenerator {
    fn kind(&self) -> ObjectKind {
        ObjectKind::UniqueConstraint
    }

    fn priority(&self, _vendor: &VendorId) -> Priority {
        Priority::DEFAULT
    }

    async fn snapshot(&self, ctx: &mut SnapshotContext<'_>) -> Result<()> {
        let catalog = ctx.options.catalog.clone();
        let matcher = ctx.matcher();
        for table in table_refs(ctx) {
            let rows = ctx
                .cache
                .unique_constraints(catalog.as_deref(), &table.schema, Some(&table.name))
                .await?;
            for (name, mut members) in
                group_by_name(rows, matcher, |r: &UniqueConstraintRow| &r.name)
            {
                members.sort_by_key(|r| r.position);
                let first = &members[0];
                let mut uc = UniqueConstraint::new(table.clone(), name);
                uc.deferrable = first.deferrable;
                uc.initially_deferred = first.initially_deferred;
                uc.disabled = first.disabled;
                uc.backing_index_name = first.backing_index.clone();
                uc.columns = members.into_iter().map(|r| r.column).collect();
                ctx.snapshot.unique_constraints.push(uc);
            }
        }
        Ok(())
    }
}

/// Phase 6: assemble indexes and reconcile them with constraints.
///
/// An index that merely enforces a primary key or unique constraint is
/// attached to that constraint as its backing index and excluded from the
/// free-standing set; an index shadowing a foreign key's column list is
/// excluded outright.
pub struct IndexGenerator;

#[async_trait]
impl SnapshotGenerator for IndexGenerator {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Index
    }

    fn priority(&self, _vendor: &VendorId) -> Priority {
        Priority::DEFAULT
    }

    async fn snapshot(&self, ctx: &mut SnapshotContext<'_>) -> Result<()> {
        let catalog = ctx.options.catalog.clone();
        let matcher = ctx.matcher();
        for table in table_refs(ctx) {
            let rows = ctx
                .cache
                .indexes(catalog.as_deref(), &table.schema, Some(&table.name))
                .await?;
            for (name, mut members) in group_by_name(rows, matcher, |r: &IndexRow| &r.index_name) {
                members.sort_by_key(|r| r.position);
                let first = &members[0];
                let mut index = Index::named(table.clone(), name);
                index.unique = first.unique;
                index.predicate = first.predicate.clone();
                index.columns = members.iter().map(|r| r.column.clone()).collect();

                if let Some(pk) = ctx.snapshot.primary_keys.iter_mut().find(|pk| {
                    matcher.eq(&pk.table.schema, &table.schema)
                        && matcher.eq(&pk.table.name, &table.name)
                        && column_lists_equal(&pk.columns, &index.columns, matcher)
                }) {
                    index.associated_with = Some(AssociatedWith::PrimaryKey);
                    pk.backing_index = Some(index);
                    continue;
                }

                if let Some(uc) = ctx.snapshot.unique_constraints.iter_mut().find(|uc| {
                    matcher.eq(&uc.table.schema, &table.schema)
                        && matcher.eq(&uc.table.name, &table.name)
                        && (uc
                            .backing_index_name
                            .as_deref()
                            .is_some_and(|n| matcher.eq(n, &index.name))
                            || column_lists_equal(&uc.columns, &index.columns, matcher))
                }) {
                    index.associated_with = Some(AssociatedWith::UniqueConstraint);
                    uc.backing_index = Some(index);
                    continue;
                }

                let backs_foreign_key = ctx.snapshot.foreign_keys.iter().any(|fk| {
                    matcher.eq(&fk.table.schema, &table.schema)
                        && matcher.eq(&fk.table.name, &table.name)
                        && column_lists_equal(&fk.columns, &index.columns, matcher)
                });
                if backs_foreign_key {
                    debug!(index = %index.name, table = %table, "index backs a foreign key, excluding");
                    continue;
                }

                ctx.snapshot.indexes.push(index);
            }
        }
        Ok(())
    }
}

/// Phase 7: enumerate sequences, verbatim.
///
/// Vendor overrides add default-value suppression and identity-sequence
/// filtering on top of this.
pub struct SequenceGenerator;

/// Parse raw sequence rows into model sequences. Shared with the vendor
/// sequence generators.
pub fn sequences_from_rows(
    schema: &str,
    rows: Vec<crate::meta::SequenceRow>,
) -> Vec<Sequence> {
    rows.into_iter()
        .map(|row| Sequence {
            schema: if row.schema.is_empty() {
                schema.to_string()
            } else {
                row.schema
            },
            name: row.name,
            start_value: row.start_value.and_then(|v| v.trim().parse().ok()),
            min_value: row.min_value.and_then(|v| v.trim().parse().ok()),
            max_value: row.max_value.and_then(|v| v.trim().parse().ok()),
            increment_by: row.increment_by.and_then(|v| v.trim().parse().ok()),
            cache_size: row.cache_size.and_then(|v| v.trim().parse().ok()),
            cycle: row.cycle,
            ordered: row.ordered,
            data_type: row.data_type,
        })
        .collect()
}

#[async_trait]
impl SnapshotGenerator for SequenceGenerator {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Sequence
    }

    fn priority(&self, _vendor: &VendorId) -> Priority {
        Priority::DEFAULT
    }

    async fn snapshot(&self, ctx: &mut SnapshotContext<'_>) -> Result<()> {
        let catalog = ctx.options.catalog.clone();
        for schema in ctx.options.schemas.clone() {
            let rows = ctx.cache.sequences(catalog.as_deref(), &schema).await?;
            ctx.snapshot
                .sequences
                .extend(sequences_from_rows(&schema, rows));
        }
        Ok(())
    }
}

/// Generic type translation: straight through the normalizer.
pub struct GenericTypeTranslator;

#[async_trait]
impl TypeTranslator for GenericTypeTranslator {
    fn priority(&self, _vendor: &VendorId) -> Priority {
        Priority::DEFAULT
    }

    async fn translate(
        &self,
        _schema: &str,
        row: &ColumnRow,
        _ctx: &mut SnapshotContext<'_>,
    ) -> Result<DataType> {
        Ok(normalize::normalize_type(row))
    }
}

/// Generic default classification.
pub struct GenericDefaultParser;

impl DefaultValueParser for GenericDefaultParser {
    fn priority(&self, _vendor: &VendorId) -> Priority {
        Priority::DEFAULT
    }

    fn parse(&self, row: &ColumnRow, data_type: &DataType) -> Option<DefaultValue> {
        // A computed column's expression is its whole default.
        if let Some(expr) = &row.generation_expression {
            return Some(DefaultValue::Function(expr.clone()));
        }
        let text = row.default_value.as_deref()?;
        normalize::classify_default(text, data_type)
    }
}

/// Generic auto-increment detection: trust the vendor flag, fall back to
/// the provider's probe when the vendor gives no signal.
pub struct GenericAutoIncrementDetector;

#[async_trait]
impl AutoIncrementDetector for GenericAutoIncrementDetector {
    fn priority(&self, _vendor: &VendorId) -> Priority {
        Priority::DEFAULT
    }

    async fn detect(
        &self,
        schema: &str,
        row: &ColumnRow,
        ctx: &mut SnapshotContext<'_>,
    ) -> Result<Option<AutoIncrementInfo>> {
        match row.auto_increment {
            Some(true) => Ok(Some(AutoIncrementInfo::default())),
            Some(false) => Ok(None),
            None => {
                let catalog = ctx.options.catalog.clone();
                let probed = ctx
                    .provider()
                    .probe_auto_increment(catalog.as_deref(), schema, &row.table, &row.name)
                    .await?;
                Ok(match probed {
                    Some(true) => Some(AutoIncrementInfo::default()),
                    _ => None,
                })
            }
        }
    }
}
