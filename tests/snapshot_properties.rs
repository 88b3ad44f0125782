//! End-to-end snapshot behavior over an in-memory metadata provider.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use schemasnap::meta::{
    ColumnRow, ForeignKeyRow, IndexRow, MetadataProvider, PrimaryKeyRow, RelationRow, SequenceRow,
    SqlRow, UniqueConstraintRow,
};
use schemasnap::model::{DefaultValue, RelationKind, RelationRef};
use schemasnap::snapshot::{ObjectFilter, SnapshotBuilder, SnapshotOptions};
use schemasnap::{Engine, ObjectKind, Result, SnapshotError, VendorId};

/// In-memory provider with per-method call counting.
struct FakeProvider {
    vendor: VendorId,
    relations: Vec<RelationRow>,
    columns: Vec<ColumnRow>,
    primary_keys: Vec<PrimaryKeyRow>,
    foreign_keys: Vec<ForeignKeyRow>,
    unique_constraints: Vec<UniqueConstraintRow>,
    indexes: Vec<IndexRow>,
    sequences: Vec<SequenceRow>,
    view_definitions: HashMap<String, String>,
    /// (table, column) pairs the zero-row probe reports as identity.
    probe_identity_columns: Vec<(String, String)>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl FakeProvider {
    fn count(&self, method: &'static str) {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;
    }

    fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    fn filter_by_table<R: Clone>(
        rows: &[R],
        table: Option<&str>,
        table_of: impl Fn(&R) -> &str,
    ) -> Vec<R> {
        match table {
            None => rows.to_vec(),
            Some(t) => rows
                .iter()
                .filter(|r| table_of(r).eq_ignore_ascii_case(t))
                .cloned()
                .collect(),
        }
    }
}

#[async_trait]
impl MetadataProvider for FakeProvider {
    fn vendor(&self) -> VendorId {
        self.vendor
    }

    async fn relations(
        &self,
        _catalog: Option<&str>,
        schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<RelationRow>> {
        self.count("relations");
        let in_schema: Vec<RelationRow> = self
            .relations
            .iter()
            .filter(|r| r.schema.eq_ignore_ascii_case(schema))
            .cloned()
            .collect();
        Ok(Self::filter_by_table(&in_schema, table, |r| &r.name))
    }

    async fn columns(
        &self,
        _catalog: Option<&str>,
        _schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<ColumnRow>> {
        self.count("columns");
        Ok(Self::filter_by_table(&self.columns, table, |r| &r.table))
    }

    async fn primary_keys(
        &self,
        _catalog: Option<&str>,
        _schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<PrimaryKeyRow>> {
        self.count("primary_keys");
        Ok(Self::filter_by_table(&self.primary_keys, table, |r| {
            &r.table
        }))
    }

    async fn foreign_keys(
        &self,
        _catalog: Option<&str>,
        _schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<ForeignKeyRow>> {
        self.count("foreign_keys");
        Ok(Self::filter_by_table(&self.foreign_keys, table, |r| {
            &r.table
        }))
    }

    async fn unique_constraints(
        &self,
        _catalog: Option<&str>,
        _schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<UniqueConstraintRow>> {
        self.count("unique_constraints");
        Ok(Self::filter_by_table(&self.unique_constraints, table, |r| {
            &r.table
        }))
    }

    async fn indexes(
        &self,
        _catalog: Option<&str>,
        _schema: &str,
        table: Option<&str>,
    ) -> Result<Vec<IndexRow>> {
        self.count("indexes");
        Ok(Self::filter_by_table(&self.indexes, table, |r| &r.table))
    }

    async fn sequences(&self, _catalog: Option<&str>, _schema: &str) -> Result<Vec<SequenceRow>> {
        self.count("sequences");
        Ok(self.sequences.clone())
    }

    async fn view_definition(
        &self,
        _catalog: Option<&str>,
        schema: &str,
        view: &str,
    ) -> Result<String> {
        self.count("view_definition");
        let key = format!("{}.{}", schema, view).to_lowercase();
        self.view_definitions
            .get(&key)
            .cloned()
            .ok_or_else(|| SnapshotError::permission(key, "definition withheld"))
    }

    async fn query(&self, _sql: &str) -> Result<Vec<SqlRow>> {
        self.count("query");
        Ok(Vec::new())
    }

    async fn probe_auto_increment(
        &self,
        _catalog: Option<&str>,
        _schema: &str,
        table: &str,
        column: &str,
    ) -> Result<Option<bool>> {
        self.count("probe_auto_increment");
        Ok(Some(self.probe_identity_columns.iter().any(|(t, c)| {
            t.eq_ignore_ascii_case(table) && c.eq_ignore_ascii_case(column)
        })))
    }
}

fn column(table: &str, name: &str, type_name: &str, ordinal: i32) -> ColumnRow {
    ColumnRow {
        table: table.to_string(),
        name: name.to_string(),
        type_code: None,
        type_name: type_name.to_string(),
        size: None,
        precision: None,
        scale: None,
        size_unit_hint: None,
        nullable: true,
        default_value: None,
        remarks: None,
        auto_increment: Some(false),
        generation_expression: None,
        ordinal,
    }
}

fn relation(schema: &str, name: &str, kind: RelationKind) -> RelationRow {
    RelationRow {
        schema: schema.to_string(),
        name: name.to_string(),
        kind,
        remarks: None,
        tablespace: None,
    }
}

/// A small but complete Postgres-flavored schema: five tables, two views
/// (one unreadable), keys, constraint-backing indexes, one sequence, and
/// an out-of-scope FK target.
fn pg_provider() -> FakeProvider {
    let mut relations = vec![
        relation("public", "users", RelationKind::Table),
        relation("public", "orders", RelationKind::Table),
        relation("public", "items", RelationKind::Table),
        relation("public", "tags", RelationKind::Table),
        relation("public", "logs", RelationKind::Table),
        relation("public", "v_users", RelationKind::View),
        relation("public", "v_secret", RelationKind::View),
    ];
    // The change-tracking ledger must never show up in snapshots.
    relations.push(relation("public", "schemasnap_changelog", RelationKind::Table));

    let mut users_id = column("users", "id", "int4", 1);
    users_id.nullable = false;
    users_id.auto_increment = Some(true);
    users_id.default_value = Some("nextval('users_id_seq'::regclass)".to_string());

    let mut users_name = column("users", "name", "varchar", 2);
    users_name.size = Some(50);
    users_name.nullable = false;

    let mut orders_total = column("orders", "total", "numeric", 4);
    orders_total.precision = Some(10);
    orders_total.scale = Some(2);

    let columns = vec![
        users_id,
        users_name,
        column("orders", "id", "int4", 1),
        column("orders", "user_id", "int4", 2),
        // Ordinal 3 was a dropped column; 4 and 5 must be renumbered.
        orders_total,
        column("orders", "account_id", "int4", 5),
        column("items", "id", "int4", 1),
        column("tags", "id", "int4", 1),
        column("logs", "id", "int4", 1),
        column("v_users", "user_name", "varchar", 1),
    ];

    let primary_keys = vec![
        PrimaryKeyRow {
            table: "users".to_string(),
            column: "id".to_string(),
            key_seq: 1,
            pk_name: Some("pk_users".to_string()),
            tablespace: None,
        },
        PrimaryKeyRow {
            table: "orders".to_string(),
            column: "id".to_string(),
            key_seq: 1,
            pk_name: Some("pk_orders".to_string()),
            tablespace: None,
        },
    ];

    let fk = |name: &str, column: &str, ref_schema: &str, ref_table: &str| ForeignKeyRow {
        name: name.to_string(),
        table: "orders".to_string(),
        column: column.to_string(),
        referenced_schema: Some(ref_schema.to_string()),
        referenced_table: ref_table.to_string(),
        referenced_column: "id".to_string(),
        key_seq: 1,
        update_rule: Some(3),
        delete_rule: Some(0),
        deferrable: false,
        initially_deferred: false,
    };
    let foreign_keys = vec![
        fk("fk_orders_user", "user_id", "public", "users"),
        fk("fk_orders_account", "account_id", "billing", "accounts"),
    ];

    let unique_constraints = vec![UniqueConstraintRow {
        table: "users".to_string(),
        name: "uq_users_name".to_string(),
        column: "name".to_string(),
        position: 1,
        deferrable: false,
        initially_deferred: false,
        disabled: false,
        backing_index: Some("users_name_key".to_string()),
    }];

    let index = |table: &str, name: &str, column: &str, unique: bool| IndexRow {
        table: table.to_string(),
        index_name: name.to_string(),
        column: column.to_string(),
        position: 1,
        unique,
        predicate: None,
    };
    let indexes = vec![
        index("users", "users_pkey", "id", true),
        index("users", "users_name_key", "name", true),
        index("orders", "idx_orders_total", "total", false),
        index("orders", "idx_orders_user", "user_id", false),
    ];

    let sequences = vec![SequenceRow {
        schema: "public".to_string(),
        name: "order_seq".to_string(),
        start_value: Some("1".to_string()),
        min_value: Some("1".to_string()),
        max_value: Some(i64::MAX.to_string()),
        increment_by: Some("1".to_string()),
        cache_size: Some("1".to_string()),
        cycle: Some(false),
        ordered: None,
        data_type: Some("bigint".to_string()),
    }];

    let mut view_definitions = HashMap::new();
    view_definitions.insert(
        "public.v_users".to_string(),
        "SELECT name AS user_name FROM users".to_string(),
    );

    FakeProvider {
        vendor: VendorId::with_version(Engine::Postgres, 15),
        relations,
        columns,
        primary_keys,
        foreign_keys,
        unique_constraints,
        indexes,
        sequences,
        view_definitions,
        probe_identity_columns: Vec::new(),
        calls: Mutex::new(HashMap::new()),
    }
}

async fn take_snapshot(
    provider: Arc<FakeProvider>,
    options: &SnapshotOptions,
) -> schemasnap::Snapshot {
    SnapshotBuilder::new()
        .snapshot(provider, options)
        .await
        .expect("snapshot should succeed")
}

#[tokio::test]
async fn test_full_snapshot_assembly() {
    let provider = Arc::new(pg_provider());
    let options = SnapshotOptions::for_schema("public");
    let snap = take_snapshot(Arc::clone(&provider), &options).await;

    // The tracking ledger is excluded; everything else lands.
    assert_eq!(snap.tables.len(), 5);
    assert!(snap.find_table("public", "schemasnap_changelog").is_none());
    assert_eq!(snap.views.len(), 2);

    // Unreadable view definition became the sentinel plus a warning.
    let secret = snap.find_view("public", "v_secret").unwrap();
    assert!(secret.definition_unavailable());
    assert!(snap.warnings.iter().any(|w| w.phase == "views"));

    let visible = snap.find_view("public", "v_users").unwrap();
    assert!(visible.definition.contains("user_name"));
    assert_eq!(visible.columns.len(), 1);
}

#[tokio::test]
async fn test_ordinal_repair_and_column_details() {
    let provider = Arc::new(pg_provider());
    let options = SnapshotOptions::for_schema("public");
    let snap = take_snapshot(provider, &options).await;

    let orders = snap.find_table("public", "orders").unwrap();
    let ordinals: Vec<u32> = orders.columns.iter().map(|c| c.ordinal).collect();
    assert_eq!(ordinals, vec![1, 2, 3, 4]);

    let total = snap
        .find_column(&RelationRef::new("public", "orders"), "total")
        .unwrap();
    assert_eq!(total.data_type.name, "numeric");
    assert_eq!(total.data_type.precision, Some(10));
    assert_eq!(total.data_type.scale, Some(2));

    // Serial column: flagged as the key, identity detected with its backing
    // sequence, and the implementing nextval default suppressed.
    let id = snap
        .find_column(&RelationRef::new("public", "users"), "ID")
        .unwrap();
    assert!(id.is_primary_key);
    assert_eq!(id.data_type.name, "integer");
    let auto = id.auto_increment.as_ref().unwrap();
    assert_eq!(auto.sequence_name.as_deref(), Some("users_id_seq"));
    assert_eq!(id.default_value, None);
}

#[tokio::test]
async fn test_foreign_keys_and_stub_targets() {
    let provider = Arc::new(pg_provider());
    let options = SnapshotOptions::for_schema("public");
    let snap = take_snapshot(provider, &options).await;

    let resolved = snap.find_foreign_key("fk_orders_user").unwrap();
    assert!(resolved.resolved);
    assert_eq!(
        resolved.update_rule,
        schemasnap::model::ReferentialAction::NoAction
    );
    assert_eq!(
        resolved.delete_rule,
        schemasnap::model::ReferentialAction::Cascade
    );

    let dangling = snap.find_foreign_key("fk_orders_account").unwrap();
    assert!(!dangling.resolved);
    let target = snap.referenced_table(dangling).unwrap();
    assert!(target.is_stub);
    assert_eq!(target.schema, "billing");
    assert_eq!(snap.stub_tables.len(), 1);
}

#[tokio::test]
async fn test_backing_indexes_are_reconciled() {
    let provider = Arc::new(pg_provider());
    let options = SnapshotOptions::for_schema("public");
    let snap = take_snapshot(provider, &options).await;

    let users = RelationRef::new("public", "users");
    let pk = snap.find_primary_key(&users).unwrap();
    assert_eq!(
        pk.backing_index.as_ref().map(|i| i.name.as_str()),
        Some("users_pkey")
    );

    let uc = snap.find_unique_constraint("uq_users_name").unwrap();
    assert_eq!(
        uc.backing_index.as_ref().map(|i| i.name.as_str()),
        Some("users_name_key")
    );

    // Free-standing set: the total index survives, the FK-shadowing and
    // constraint-backing indexes do not.
    let names: Vec<&str> = snap.indexes.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["idx_orders_total"]);
}

#[tokio::test]
async fn test_sequence_defaults_are_suppressed() {
    let provider = Arc::new(pg_provider());
    let options = SnapshotOptions::for_schema("public");
    let snap = take_snapshot(provider, &options).await;

    let seq = snap.find_sequence("public", "order_seq").unwrap();
    assert_eq!(seq.start_value, None);
    assert_eq!(seq.increment_by, None);
    assert_eq!(seq.min_value, None);
    assert_eq!(seq.max_value, None);
    assert_eq!(seq.cache_size, None);
    assert_eq!(seq.cycle, None);
    assert_eq!(seq.data_type.as_deref(), Some("bigint"));
}

#[tokio::test]
async fn test_snapshots_serialize_identically() {
    let options = SnapshotOptions::for_schema("public");
    let first = take_snapshot(Arc::new(pg_provider()), &options).await;
    let second = take_snapshot(Arc::new(pg_provider()), &options).await;

    let a = serde_json::to_string(&first).unwrap();
    let b = serde_json::to_string(&second).unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_adaptive_bulk_fetching() {
    let provider = Arc::new(pg_provider());
    let options = SnapshotOptions::for_schema("public");
    let snap = take_snapshot(Arc::clone(&provider), &options).await;
    assert_eq!(snap.tables.len(), 5);

    // Seven relations need columns; with a threshold of three the cache
    // issues three single fetches and one whole-schema fetch, then serves
    // the rest from cache.
    assert_eq!(provider.calls("columns"), 4);
    // Five tables need keys and indexes: three singles plus one bulk each.
    assert_eq!(provider.calls("primary_keys"), 4);
    assert_eq!(provider.calls("foreign_keys"), 4);
    assert_eq!(provider.calls("indexes"), 4);
    // Relations and sequences are whole-schema fetches.
    assert_eq!(provider.calls("relations"), 1);
    assert_eq!(provider.calls("sequences"), 1);
}

#[tokio::test]
async fn test_filter_skips_phases_entirely() {
    let provider = Arc::new(pg_provider());
    let options = SnapshotOptions::for_schema("public").with_filter(
        ObjectFilter::all()
            .without(ObjectKind::Index)
            .without(ObjectKind::Sequence)
            .without(ObjectKind::View),
    );
    let snap = take_snapshot(Arc::clone(&provider), &options).await;

    assert!(snap.indexes.is_empty());
    assert!(snap.sequences.is_empty());
    assert!(snap.views.is_empty());
    assert_eq!(provider.calls("indexes"), 0);
    assert_eq!(provider.calls("sequences"), 0);
    assert_eq!(provider.calls("view_definition"), 0);
}

#[tokio::test]
async fn test_concurrent_snapshots_are_isolated() {
    // Two providers expose a same-named table with different columns; the
    // caches are per-invocation, so neither scan can see the other's rows.
    let mut provider_a = pg_provider();
    provider_a.relations = vec![relation("public", "users", RelationKind::Table)];
    provider_a.columns = vec![column("users", "a_only", "int4", 1)];
    provider_a.primary_keys.clear();
    provider_a.foreign_keys.clear();
    provider_a.unique_constraints.clear();
    provider_a.indexes.clear();
    provider_a.sequences.clear();

    let mut provider_b = pg_provider();
    provider_b.relations = vec![relation("public", "users", RelationKind::Table)];
    provider_b.columns = vec![column("users", "b_only", "int4", 1)];
    provider_b.primary_keys.clear();
    provider_b.foreign_keys.clear();
    provider_b.unique_constraints.clear();
    provider_b.indexes.clear();
    provider_b.sequences.clear();

    let options = SnapshotOptions::for_schema("public");
    let task_a = {
        let options = options.clone();
        tokio::spawn(async move { take_snapshot(Arc::new(provider_a), &options).await })
    };
    let task_b = {
        let options = options.clone();
        tokio::spawn(async move { take_snapshot(Arc::new(provider_b), &options).await })
    };

    let snap_a = task_a.await.unwrap();
    let snap_b = task_b.await.unwrap();

    let users = RelationRef::new("public", "users");
    assert!(snap_a.find_column(&users, "a_only").is_some());
    assert!(snap_a.find_column(&users, "b_only").is_none());
    assert!(snap_b.find_column(&users, "b_only").is_some());
    assert!(snap_b.find_column(&users, "a_only").is_none());
}

#[tokio::test]
async fn test_empty_schema_list_is_a_config_error() {
    let provider = Arc::new(pg_provider());
    let options = SnapshotOptions {
        schemas: Vec::new(),
        ..SnapshotOptions::default()
    };
    let err = SnapshotBuilder::new()
        .snapshot(provider, &options)
        .await
        .unwrap_err();
    assert!(matches!(err, SnapshotError::Config(_)));
}

#[tokio::test]
async fn test_plain_literal_defaults_survive() {
    let mut provider = pg_provider();
    for row in &mut provider.columns {
        if row.table == "users" && row.name == "name" {
            row.default_value = Some("'guest'::character varying".to_string());
        }
    }
    let options = SnapshotOptions::for_schema("public");
    let snap = take_snapshot(Arc::new(provider), &options).await;

    let name = snap
        .find_column(&RelationRef::new("public", "users"), "name")
        .unwrap();
    assert_eq!(
        name.default_value,
        Some(DefaultValue::Literal(schemasnap::model::LiteralValue::Text(
            "guest".to_string()
        )))
    );
}

#[tokio::test]
async fn test_identity_probe_runs_when_vendor_gives_no_signal() {
    // A driver stack with no identity flag in its column metadata: the
    // detector falls back to the provider's zero-row descriptor probe.
    let mut provider = pg_provider();
    provider.vendor = VendorId::with_version(Engine::Mssql, 15);
    provider.relations = vec![relation("dbo", "orders", RelationKind::Table)];
    let mut id = column("orders", "id", "int", 1);
    id.auto_increment = None;
    let mut total = column("orders", "total", "int", 2);
    total.auto_increment = None;
    provider.columns = vec![id, total];
    provider.primary_keys.clear();
    provider.foreign_keys.clear();
    provider.unique_constraints.clear();
    provider.indexes.clear();
    provider.sequences.clear();
    provider.probe_identity_columns = vec![("orders".to_string(), "id".to_string())];

    let provider = Arc::new(provider);
    let options = SnapshotOptions::for_schema("dbo");
    let snap = take_snapshot(Arc::clone(&provider), &options).await;

    let orders = RelationRef::new("dbo", "orders");
    assert!(snap
        .find_column(&orders, "id")
        .unwrap()
        .auto_increment
        .is_some());
    assert!(snap
        .find_column(&orders, "total")
        .unwrap()
        .auto_increment
        .is_none());
    // Both unflagged columns were probed exactly once.
    assert_eq!(provider.calls("probe_auto_increment"), 2);
}
